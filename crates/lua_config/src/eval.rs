//! Executes parsed configuration files and freezes the result.
//!
//! Tables have reference semantics while a configuration runs, so an
//! included file can define `TRAJECTORY_BUILDER = { ... }` and the including
//! file can both store it in its options and adjust single fields
//! afterwards. Once the top-level file returns, its table is frozen into an
//! immutable [`ParameterDictionary`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::ast::{BinaryOp, Chunk, Expr, Field, Path, Statement, TableEntry, UnaryOp};
use crate::dictionary::{Key, ParameterDictionary, Value};
use crate::error::{ConfigError, Result};
use crate::lexer::Position;
use crate::parser::{MAX_NESTING, parse};
use crate::resolver::FileResolver;

type TableRef = Rc<RefCell<BTreeMap<Key, RtValue>>>;
type Scope = HashMap<String, RtValue, ahash::RandomState>;

#[derive(Debug, Clone)]
enum RtValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Str(Rc<str>),
    Table(TableRef),
}

impl RtValue {
    fn type_name(&self) -> &'static str {
        match self {
            RtValue::Nil => "nil",
            RtValue::Boolean(_) => "boolean",
            RtValue::Integer(_) => "integer",
            RtValue::Number(_) => "number",
            RtValue::Str(_) => "string",
            RtValue::Table(_) => "table",
        }
    }

    fn is_truthy(&self) -> bool {
        !matches!(self, RtValue::Nil | RtValue::Boolean(false))
    }
}

/// Resolves `basename`, executes it, and freezes the table it returns.
pub fn load_dictionary(resolver: &dyn FileResolver, basename: &str) -> Result<ParameterDictionary> {
    let mut interpreter = Interpreter::new(resolver);
    let returned = interpreter.run_file(basename)?;
    freeze_returned(returned, basename)
}

/// Executes `source` as if it were a file called `name`. Includes still go
/// through `resolver`.
pub fn load_source(
    resolver: &dyn FileResolver,
    name: &str,
    source: &str,
) -> Result<ParameterDictionary> {
    let mut interpreter = Interpreter::new(resolver);
    let returned = interpreter.run_source(name, source)?;
    freeze_returned(returned, name)
}

fn freeze_returned(returned: RtValue, name: &str) -> Result<ParameterDictionary> {
    match returned {
        RtValue::Table(table) => freeze_table(&table, name, &mut Vec::new()),
        other => Err(ConfigError::NotATable {
            what: format!("value returned by '{name}'"),
            found: other.type_name(),
        }),
    }
}

struct Interpreter<'r> {
    resolver: &'r dyn FileResolver,
    globals: Scope,
    /// Files currently executing, outermost first.
    stack: Vec<String>,
    /// Every file executed so far, in order of inclusion.
    included: Vec<String>,
}

impl<'r> Interpreter<'r> {
    fn new(resolver: &'r dyn FileResolver) -> Self {
        let math = BTreeMap::from([(Key::from("pi"), RtValue::Number(std::f64::consts::PI))]);
        let mut globals = Scope::default();
        globals.insert("math".to_owned(), RtValue::Table(Rc::new(RefCell::new(math))));

        Self {
            resolver,
            globals,
            stack: Vec::new(),
            included: Vec::new(),
        }
    }

    fn run_file(&mut self, basename: &str) -> Result<RtValue> {
        if self.stack.iter().any(|file| file == basename) {
            let mut chain = self.stack.clone();
            chain.push(basename.to_owned());
            return Err(ConfigError::IncludeCycle { chain });
        }
        if self.included.iter().any(|file| file == basename) {
            return Err(ConfigError::DuplicateInclude {
                file: basename.to_owned(),
                included: self.included.clone(),
            });
        }

        let file = self.resolver.resolve(basename)?;
        debug!(basename, path = %file.path.display(), "Executing configuration file");
        self.run_source(basename, &file.content)
    }

    fn run_source(&mut self, name: &str, source: &str) -> Result<RtValue> {
        let chunk = parse(source).map_err(|e| ConfigError::Syntax {
            file: name.to_owned(),
            line: e.position.line,
            column: e.position.column,
            message: e.message,
        })?;

        self.stack.push(name.to_owned());
        self.included.push(name.to_owned());
        let result = self.execute(&chunk);
        self.stack.pop();
        result
    }

    fn current_file(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or("<config>")
    }

    fn error(&self, position: Position, message: impl std::fmt::Display) -> ConfigError {
        ConfigError::Eval {
            file: self.current_file().to_owned(),
            message: format!("{}:{}: {message}", position.line, position.column),
        }
    }

    fn execute(&mut self, chunk: &Chunk) -> Result<RtValue> {
        let mut locals = Scope::default();

        for statement in &chunk.statements {
            match statement {
                Statement::Include { basename, .. } => {
                    self.run_file(basename)?;
                }
                Statement::Local { name, value, .. } => {
                    let value = self.eval(value, &locals)?;
                    locals.insert(name.clone(), value);
                }
                Statement::Assign { target, value, .. } => {
                    let value = self.eval(value, &locals)?;
                    self.assign(target, value, &mut locals)?;
                }
            }
        }

        match &chunk.ret {
            Some(expr) => self.eval(expr, &locals),
            None => Ok(RtValue::Nil),
        }
    }

    fn assign(
        &mut self,
        target: &Path,
        value: RtValue,
        locals: &mut Scope,
    ) -> Result<()> {
        let position = target.position;
        let Some((last, parents)) = target.fields.split_last() else {
            // A local stays bound when set to nil.
            if let Some(slot) = locals.get_mut(&target.root) {
                *slot = value;
            } else if matches!(value, RtValue::Nil) {
                self.globals.remove(&target.root);
            } else {
                self.globals.insert(target.root.clone(), value);
            }
            return Ok(());
        };

        let mut current = self.lookup(&target.root, locals);
        let mut described = target.root.clone();
        for field in parents {
            let key = self.field_key(field, locals, position)?;
            current = self.index(&current, &key, &described, position)?;
            described = format!("{described}.{key}");
        }

        let table = match current {
            RtValue::Table(table) => table,
            other => {
                return Err(self.error(
                    position,
                    format!(
                        "attempt to index a {} value '{described}'",
                        other.type_name()
                    ),
                ));
            }
        };
        let key = self.field_key(last, locals, position)?;
        let mut table = table.borrow_mut();
        match value {
            RtValue::Nil => {
                table.remove(&key);
            }
            value => {
                table.insert(key, value);
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str, locals: &Scope) -> RtValue {
        locals
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .unwrap_or(RtValue::Nil)
    }

    fn field_key(
        &self,
        field: &Field,
        locals: &Scope,
        position: Position,
    ) -> Result<Key> {
        match field {
            Field::Name(name) => Ok(Key::Name(name.clone())),
            Field::Index(expr) => {
                let value = self.eval(expr, locals)?;
                self.to_key(&value, position)
            }
        }
    }

    fn to_key(&self, value: &RtValue, position: Position) -> Result<Key> {
        match value {
            RtValue::Integer(index) => Ok(Key::Index(*index)),
            RtValue::Number(number) if number.fract() == 0.0 && number.is_finite() => {
                Ok(Key::Index(*number as i64))
            }
            RtValue::Str(name) => Ok(Key::Name(name.to_string())),
            other => Err(self.error(
                position,
                format!("a {} value cannot be used as a table key", other.type_name()),
            )),
        }
    }

    fn index(&self, value: &RtValue, key: &Key, described: &str, position: Position) -> Result<RtValue> {
        match value {
            RtValue::Table(table) => Ok(table.borrow().get(key).cloned().unwrap_or(RtValue::Nil)),
            other => Err(self.error(
                position,
                format!(
                    "attempt to index a {} value '{described}'",
                    other.type_name()
                ),
            )),
        }
    }

    fn eval(&self, expr: &Expr, locals: &Scope) -> Result<RtValue> {
        match expr {
            Expr::Nil => Ok(RtValue::Nil),
            Expr::Boolean(value) => Ok(RtValue::Boolean(*value)),
            Expr::Integer(value) => Ok(RtValue::Integer(*value)),
            Expr::Number(value) => Ok(RtValue::Number(*value)),
            Expr::Str(value) => Ok(RtValue::Str(Rc::from(value.as_str()))),
            Expr::Table { entries, position } => self.eval_table(entries, *position, locals),
            Expr::Var(path) => self.eval_path(path, locals),
            Expr::Call {
                function,
                args,
                position,
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, locals))
                    .collect::<Result<Vec<_>>>()?;
                self.call(function, &args, *position)
            }
            Expr::Unary {
                op,
                operand,
                position,
            } => {
                let operand = self.eval(operand, locals)?;
                match op {
                    UnaryOp::Not => Ok(RtValue::Boolean(!operand.is_truthy())),
                    UnaryOp::Neg => match operand {
                        RtValue::Integer(value) => Ok(RtValue::Integer(value.wrapping_neg())),
                        RtValue::Number(value) => Ok(RtValue::Number(-value)),
                        other => Err(self.error(
                            *position,
                            format!("attempt to negate a {} value", other.type_name()),
                        )),
                    },
                }
            }
            Expr::Binary {
                op,
                lhs,
                rhs,
                position,
            } => {
                let lhs = self.eval(lhs, locals)?;
                let rhs = self.eval(rhs, locals)?;
                self.binary(*op, lhs, rhs, *position)
            }
        }
    }

    fn eval_table(
        &self,
        entries: &[TableEntry],
        table_position: Position,
        locals: &Scope,
    ) -> Result<RtValue> {
        let mut table = BTreeMap::new();
        let mut next_index = 1;

        for entry in entries {
            let (key, value) = match entry {
                TableEntry::Named(name, expr) => (Key::Name(name.clone()), self.eval(expr, locals)?),
                TableEntry::Keyed(key_expr, expr) => {
                    let key = self.eval(key_expr, locals)?;
                    let position = expr_position(key_expr).unwrap_or(table_position);
                    let key = self.to_key(&key, position)?;
                    (key, self.eval(expr, locals)?)
                }
                TableEntry::Positional(expr) => {
                    let key = Key::Index(next_index);
                    next_index += 1;
                    (key, self.eval(expr, locals)?)
                }
            };
            if !matches!(value, RtValue::Nil) {
                table.insert(key, value);
            }
        }

        Ok(RtValue::Table(Rc::new(RefCell::new(table))))
    }

    fn eval_path(&self, path: &Path, locals: &Scope) -> Result<RtValue> {
        let mut current = self.lookup(&path.root, locals);
        let mut described = path.root.clone();
        for field in &path.fields {
            let key = self.field_key(field, locals, path.position)?;
            current = self.index(&current, &key, &described, path.position)?;
            described = format!("{described}.{key}");
        }
        Ok(current)
    }

    fn call(&self, function: &Path, args: &[RtValue], position: Position) -> Result<RtValue> {
        let name = function.dotted();
        let number = |args: &[RtValue]| -> Result<f64> {
            match args {
                [RtValue::Integer(value)] => Ok(*value as f64),
                [RtValue::Number(value)] => Ok(*value),
                [other] => Err(self.error(
                    position,
                    format!("bad argument to '{name}' (number expected, got {})", other.type_name()),
                )),
                _ => Err(self.error(
                    position,
                    format!("'{name}' expects exactly one argument, got {}", args.len()),
                )),
            }
        };

        match name.as_str() {
            "math.rad" => Ok(RtValue::Number(number(args)?.to_radians())),
            "math.deg" => Ok(RtValue::Number(number(args)?.to_degrees())),
            "math.sqrt" => Ok(RtValue::Number(number(args)?.sqrt())),
            "math.floor" => {
                let value = number(args)?.floor();
                if value >= i64::MIN as f64 && value <= i64::MAX as f64 {
                    Ok(RtValue::Integer(value as i64))
                } else {
                    Ok(RtValue::Number(value))
                }
            }
            "math.abs" => match args {
                [RtValue::Integer(value)] => Ok(RtValue::Integer(value.wrapping_abs())),
                _ => Ok(RtValue::Number(number(args)?.abs())),
            },
            _ => Err(self.error(position, format!("unknown function '{name}'"))),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: RtValue, rhs: RtValue, position: Position) -> Result<RtValue> {
        if op == BinaryOp::Concat {
            return match (concat_text(&lhs), concat_text(&rhs)) {
                (Some(lhs), Some(rhs)) => Ok(RtValue::Str(Rc::from(format!("{lhs}{rhs}")))),
                _ => Err(self.error(
                    position,
                    format!(
                        "attempt to concatenate a {} value with a {} value",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                )),
            };
        }

        match (&lhs, &rhs) {
            (RtValue::Integer(a), RtValue::Integer(b)) if op != BinaryOp::Div => {
                Ok(RtValue::Integer(match op {
                    BinaryOp::Add => a.wrapping_add(*b),
                    BinaryOp::Sub => a.wrapping_sub(*b),
                    _ => a.wrapping_mul(*b),
                }))
            }
            _ => {
                let (Some(a), Some(b)) = (as_float(&lhs), as_float(&rhs)) else {
                    return Err(self.error(
                        position,
                        format!(
                            "attempt to perform arithmetic on a {} value and a {} value",
                            lhs.type_name(),
                            rhs.type_name()
                        ),
                    ));
                };
                Ok(RtValue::Number(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    _ => a / b,
                }))
            }
        }
    }
}

fn as_float(value: &RtValue) -> Option<f64> {
    match value {
        RtValue::Integer(value) => Some(*value as f64),
        RtValue::Number(value) => Some(*value),
        _ => None,
    }
}

fn concat_text(value: &RtValue) -> Option<String> {
    match value {
        RtValue::Str(text) => Some(text.to_string()),
        RtValue::Integer(value) => Some(value.to_string()),
        RtValue::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn expr_position(expr: &Expr) -> Option<Position> {
    match expr {
        Expr::Call { position, .. } | Expr::Unary { position, .. } | Expr::Binary { position, .. } => {
            Some(*position)
        }
        Expr::Var(path) => Some(path.position),
        _ => None,
    }
}

fn freeze_table(
    table: &TableRef,
    file: &str,
    visiting: &mut Vec<*const RefCell<BTreeMap<Key, RtValue>>>,
) -> Result<ParameterDictionary> {
    let pointer = Rc::as_ptr(table);
    if visiting.contains(&pointer) {
        return Err(ConfigError::Eval {
            file: file.to_owned(),
            message: "returned table contains itself".to_owned(),
        });
    }
    if visiting.len() >= MAX_NESTING {
        return Err(ConfigError::Eval {
            file: file.to_owned(),
            message: format!("returned tables are nested more than {MAX_NESTING} levels deep"),
        });
    }
    visiting.push(pointer);

    let mut entries = BTreeMap::new();
    for (key, value) in table.borrow().iter() {
        let frozen = match value {
            RtValue::Nil => continue,
            RtValue::Boolean(value) => Value::Boolean(*value),
            RtValue::Integer(value) => Value::Integer(*value),
            RtValue::Number(value) => Value::Number(*value),
            RtValue::Str(value) => Value::String(value.to_string()),
            RtValue::Table(inner) => Value::Table(freeze_table(inner, file, visiting)?),
        };
        entries.insert(key.clone(), frozen);
    }

    visiting.pop();
    Ok(ParameterDictionary::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedFile;
    use std::path::PathBuf;

    /// Resolves basenames from an in-memory map.
    struct MemoryResolver(Vec<(&'static str, &'static str)>);

    impl FileResolver for MemoryResolver {
        fn resolve(&self, basename: &str) -> Result<ResolvedFile> {
            self.0
                .iter()
                .find(|(name, _)| *name == basename)
                .map(|(name, content)| ResolvedFile {
                    path: PathBuf::from(name),
                    content: (*content).to_owned(),
                })
                .ok_or_else(|| ConfigError::FileNotFound {
                    basename: basename.to_owned(),
                    searched: Vec::new(),
                })
        }
    }

    fn load(files: Vec<(&'static str, &'static str)>) -> Result<ParameterDictionary> {
        let resolver = MemoryResolver(files);
        load_dictionary(&resolver, "main.lua")
    }

    #[test]
    fn test_included_table_is_shared_by_reference() {
        let dict = load(vec![
            ("builder.lua", "TRAJECTORY_BUILDER = { use_imu_data = true, range = 30 }"),
            (
                "main.lua",
                r#"
                include "builder.lua"
                options = { trajectory_builder = TRAJECTORY_BUILDER }
                TRAJECTORY_BUILDER.use_imu_data = false
                return options
                "#,
            ),
        ])
        .unwrap();

        let builder = dict.get_dictionary("trajectory_builder").unwrap();
        assert!(!builder.get_bool("use_imu_data").unwrap());
        assert_eq!(builder.get_int("range").unwrap(), 30);
    }

    #[test]
    fn test_arithmetic_and_builtins() {
        let dict = load(vec![(
            "main.lua",
            "return { a = 1 + 2 * 3, b = 7 / 2, c = math.rad(180.), d = -(2), e = 'x' .. 1, f = not nil }",
        )])
        .unwrap();

        assert_eq!(dict.get_int("a").unwrap(), 7);
        assert_eq!(dict.get_double("b").unwrap(), 3.5);
        assert!((dict.get_double("c").unwrap() - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(dict.get_int("d").unwrap(), -2);
        assert_eq!(dict.get_string("e").unwrap(), "x1");
        assert!(dict.get_bool("f").unwrap());
    }

    #[test]
    fn test_positional_entries_and_nil_assignment() {
        let dict = load(vec![(
            "main.lua",
            "t = { 'a', 'b', gone = 1 }\nt.gone = nil\nt[3] = 'c'\nreturn t",
        )])
        .unwrap();

        assert!(!dict.has_key("gone"));
        let values: Vec<_> = dict
            .array_values()
            .into_iter()
            .map(|value| value.to_string())
            .collect();
        assert_eq!(values, ["\"a\"", "\"b\"", "\"c\""]);
    }

    #[test]
    fn test_locals_shadow_globals() {
        let dict = load(vec![(
            "main.lua",
            "x = 1\nlocal x = 2\nreturn { x = x }",
        )])
        .unwrap();
        assert_eq!(dict.get_int("x").unwrap(), 2);
    }

    #[test]
    fn test_local_set_to_nil_stays_local() {
        let resolver = MemoryResolver(vec![("reader.lua", "SEEN = x")]);
        let dict = load_source(
            &resolver,
            "main.lua",
            "local x = 1\nx = nil\nx = 2\ninclude 'reader.lua'\nreturn { x = x, seen = SEEN }",
        )
        .unwrap();
        assert_eq!(dict.get_int("x").unwrap(), 2);
        assert!(!dict.has_key("seen"));
    }

    #[test]
    fn test_deeply_nested_source_is_a_syntax_error() {
        let depth = 3000;
        let source = format!("return {{ a = {}1{} }}", "(".repeat(depth), ")".repeat(depth));
        let result = load_source(&MemoryResolver(Vec::new()), "main.lua", &source);
        assert!(matches!(
            result,
            Err(ConfigError::Syntax { message, .. }) if message.contains("nested")
        ));
    }

    #[test]
    fn test_tables_nested_by_assignment_are_bounded() {
        let mut source = String::from("t = {}\n");
        for _ in 0..MAX_NESTING + 10 {
            source.push_str("t = { t }\n");
        }
        source.push_str("return t");
        let result = load_source(&MemoryResolver(Vec::new()), "main.lua", &source);
        assert!(matches!(
            result,
            Err(ConfigError::Eval { message, .. }) if message.contains("nested")
        ));
    }

    #[test]
    fn test_missing_include_is_fatal() {
        let result = load(vec![("main.lua", "include 'absent.lua'\nreturn {}")]);
        assert!(matches!(
            result,
            Err(ConfigError::FileNotFound { basename, .. }) if basename == "absent.lua"
        ));
    }

    #[test]
    fn test_include_cycle_rejected() {
        let result = load(vec![
            ("main.lua", "include 'a.lua'\nreturn {}"),
            ("a.lua", "include 'b.lua'"),
            ("b.lua", "include 'a.lua'"),
        ]);
        match result {
            Err(ConfigError::IncludeCycle { chain }) => {
                assert_eq!(chain, ["main.lua", "a.lua", "b.lua", "a.lua"]);
            }
            other => panic!("expected IncludeCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_include_rejected() {
        let result = load(vec![
            ("main.lua", "include 'a.lua'\ninclude 'b.lua'\nreturn {}"),
            ("a.lua", "include 'common.lua'"),
            ("b.lua", "include 'common.lua'"),
            ("common.lua", "COMMON = {}"),
        ]);
        match result {
            Err(ConfigError::DuplicateInclude { file, included }) => {
                assert_eq!(file, "common.lua");
                assert_eq!(included, ["main.lua", "a.lua", "common.lua", "b.lua"]);
            }
            other => panic!("expected DuplicateInclude, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error_names_the_included_file() {
        let result = load(vec![
            ("main.lua", "include 'broken.lua'\nreturn {}"),
            ("broken.lua", "X = {\n  a = ,\n}"),
        ]);
        match result {
            Err(ConfigError::Syntax { file, line, .. }) => {
                assert_eq!(file, "broken.lua");
                assert_eq!(line, 2);
            }
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn test_indexing_nil_is_an_error() {
        let result = load(vec![("main.lua", "UNDEFINED.field = 1\nreturn {}")]);
        assert!(matches!(result, Err(ConfigError::Eval { .. })));
    }

    #[test]
    fn test_unknown_function_is_an_error() {
        let result = load(vec![("main.lua", "return { a = os.exit(1) }")]);
        assert!(matches!(result, Err(ConfigError::Eval { message, .. }) if message.contains("os.exit")));
    }

    #[test]
    fn test_must_return_a_table() {
        let result = load(vec![("main.lua", "return 42")]);
        assert!(matches!(
            result,
            Err(ConfigError::NotATable { found: "integer", .. })
        ));
    }

    #[test]
    fn test_self_referencing_table_rejected() {
        let result = load(vec![("main.lua", "t = {}\nt.me = t\nreturn t")]);
        assert!(matches!(result, Err(ConfigError::Eval { .. })));
    }

    #[test]
    fn test_load_source_uses_resolver_for_includes() {
        let resolver = MemoryResolver(vec![("defaults.lua", "DEFAULTS = { n = 4 }")]);
        let dict = load_source(
            &resolver,
            "inline",
            "include 'defaults.lua'\nreturn { n = DEFAULTS.n }",
        )
        .unwrap();
        assert_eq!(dict.get_int("n").unwrap(), 4);
    }
}
