use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigError, Result};

/// A table key. Indices order before names so iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Index(i64),
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "[{index}]"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_owned())
    }
}

/// A configuration value after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Table(ParameterDictionary),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
        }
    }

    pub fn as_dictionary(&self) -> Option<&ParameterDictionary> {
        match self {
            Value::Table(dictionary) => Some(dictionary),
            _ => None,
        }
    }
}

/// An immutable, hierarchical key/value configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDictionary {
    entries: BTreeMap<Key, Value>,
}

impl ParameterDictionary {
    pub(crate) fn from_entries(entries: BTreeMap<Key, Value>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(&Key::from(key))
    }

    /// Named keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().filter_map(|key| match key {
            Key::Name(name) => Some(name.as_str()),
            Key::Index(_) => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Key::from(key))
    }

    fn require(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_owned()))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.require(key)? {
            Value::Boolean(value) => Ok(*value),
            other => Err(mismatch(key, "boolean", other)),
        }
    }

    /// Reads an integer. Floats with no fractional part are accepted.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        match self.require(key)? {
            Value::Integer(value) => Ok(*value),
            Value::Number(value)
                if value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value <= i64::MAX as f64 =>
            {
                Ok(*value as i64)
            }
            other => Err(mismatch(key, "integer", other)),
        }
    }

    pub fn get_non_negative_int(&self, key: &str) -> Result<i64> {
        let value = self.get_int(key)?;
        if value < 0 {
            return Err(ConfigError::OutOfRange {
                key: key.to_owned(),
                message: format!("{value} is negative"),
            });
        }
        Ok(value)
    }

    pub fn get_double(&self, key: &str) -> Result<f64> {
        match self.require(key)? {
            Value::Number(value) => Ok(*value),
            Value::Integer(value) => Ok(*value as f64),
            other => Err(mismatch(key, "number", other)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<&str> {
        match self.require(key)? {
            Value::String(value) => Ok(value),
            other => Err(mismatch(key, "string", other)),
        }
    }

    pub fn get_dictionary(&self, key: &str) -> Result<&ParameterDictionary> {
        match self.require(key)? {
            Value::Table(value) => Ok(value),
            other => Err(mismatch(key, "table", other)),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        if self.has_key(key) {
            self.get_bool(key)
        } else {
            Ok(default)
        }
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        if self.has_key(key) {
            self.get_int(key)
        } else {
            Ok(default)
        }
    }

    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str> {
        if self.has_key(key) {
            self.get_string(key)
        } else {
            Ok(default)
        }
    }

    /// Values stored under the consecutive indices `1..=n`.
    pub fn array_values(&self) -> Vec<&Value> {
        (1..)
            .map_while(|index| self.entries.get(&Key::Index(index)))
            .collect()
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_owned(),
        expected,
        found: found.type_name(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

impl fmt::Display for ParameterDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_table(f, self, 0)
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, indent: usize) -> fmt::Result {
    match value {
        Value::Boolean(value) => write!(f, "{value}"),
        Value::Integer(value) => write!(f, "{value}"),
        // Keep a decimal point so the value reads back as a float.
        Value::Number(value) if value.is_finite() && value.fract() == 0.0 => {
            write!(f, "{value:.1}")
        }
        Value::Number(value) if value.is_nan() => f.write_str("(0 / 0.)"),
        Value::Number(value) if value.is_infinite() => {
            f.write_str(if *value > 0.0 { "(1 / 0.)" } else { "(-1 / 0.)" })
        }
        Value::Number(value) => write!(f, "{value}"),
        Value::String(value) => write_string(f, value),
        Value::Table(table) => write_table(f, table, indent),
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, table: &ParameterDictionary, indent: usize) -> fmt::Result {
    if table.is_empty() {
        return f.write_str("{}");
    }
    writeln!(f, "{{")?;
    for (key, value) in table.iter() {
        write!(f, "{:width$}", "", width = (indent + 1) * 2)?;
        match key {
            Key::Index(index) => write!(f, "[{index}] = ")?,
            Key::Name(name) if is_identifier(name) => write!(f, "{name} = ")?,
            Key::Name(name) => {
                f.write_str("[")?;
                write_string(f, name)?;
                f.write_str("] = ")?;
            }
        }
        write_value(f, value, indent + 1)?;
        writeln!(f, ",")?;
    }
    write!(f, "{:width$}}}", "", width = indent * 2)
}

/// Writes a double-quoted string literal the lexer reads back unchanged.
fn write_string(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_ascii_control() => write!(f, "\\{:03}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
