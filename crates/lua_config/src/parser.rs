//! Recursive-descent parser for the configuration language.
//!
//! ```text
//! chunk      := { statement [';'] } [ 'return' expr [';'] ] EOF
//! statement  := 'include' ( STRING | '(' STRING ')' )
//!             | 'local' NAME '=' expr
//!             | path '=' expr
//! expr       := additive [ '..' expr ]
//! additive   := term { ('+' | '-') term }
//! term       := unary { ('*' | '/') unary }
//! unary      := ('-' | 'not') unary | primary
//! primary    := literal | table | '(' expr ')' | path [ '(' [ expr { ',' expr } ] ')' ]
//! path       := NAME { '.' NAME | '[' expr ']' }
//! ```
//!
//! Nesting deeper than `MAX_NESTING` is a syntax error.

use crate::ast::{BinaryOp, Chunk, Expr, Field, Path, Statement, TableEntry, UnaryOp};
use crate::lexer::{Position, Spanned, SyntaxError, Token, tokenize};

const INCLUDE: &str = "include";

/// Deepest expression nesting accepted before parsing gives up.
pub(crate) const MAX_NESTING: usize = 100;

pub fn parse(source: &str) -> Result<Chunk, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser {
        tokens,
        cursor: 0,
        depth: 0,
    }
    .chunk()
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor].token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.cursor + offset).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn position(&self) -> Position {
        self.tokens[self.cursor].position
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.cursor].token.clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<(), SyntaxError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("{expected} {context}")))
        }
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        SyntaxError {
            position: self.position(),
            message: format!("expected {wanted}, found {}", self.peek()),
        }
    }

    fn name(&mut self, context: &str) -> Result<String, SyntaxError> {
        if let Token::Name(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected(&format!("name {context}")))
        }
    }

    fn chunk(mut self) -> Result<Chunk, SyntaxError> {
        let mut statements = Vec::new();
        let mut ret = None;

        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Semicolon => {
                    self.advance();
                }
                Token::Return => {
                    self.advance();
                    ret = Some(self.expr()?);
                    self.eat(&Token::Semicolon);
                    if *self.peek() != Token::Eof {
                        return Err(self.unexpected("end of file after 'return'"));
                    }
                    break;
                }
                _ => statements.push(self.statement()?),
            }
        }

        Ok(Chunk { statements, ret })
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        let position = self.position();

        if *self.peek() == Token::Local {
            self.advance();
            let name = self.name("after 'local'")?;
            self.expect(Token::Assign, "in local declaration")?;
            let value = self.expr()?;
            return Ok(Statement::Local {
                name,
                value,
                position,
            });
        }

        if matches!(self.peek(), Token::Name(name) if name == INCLUDE)
            && matches!(self.peek_at(1), Token::Str(_) | Token::LParen)
        {
            self.advance();
            let parenthesized = self.eat(&Token::LParen);
            let basename = match self.advance() {
                Token::Str(basename) => basename,
                _ => {
                    return Err(SyntaxError {
                        position,
                        message: "include expects a file name string".to_owned(),
                    });
                }
            };
            if parenthesized {
                self.expect(Token::RParen, "after include file name")?;
            }
            return Ok(Statement::Include { basename, position });
        }

        let target = self.path()?;
        self.expect(Token::Assign, "in assignment")?;
        let value = self.expr()?;
        Ok(Statement::Assign {
            target,
            value,
            position,
        })
    }

    fn path(&mut self) -> Result<Path, SyntaxError> {
        let position = self.position();
        let root = self.name("at start of statement")?;
        let mut fields = Vec::new();
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    fields.push(Field::Name(self.name("after '.'")?));
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(Token::RBracket, "to close index")?;
                    fields.push(Field::Index(index));
                }
                _ => {
                    return Ok(Path {
                        root,
                        fields,
                        position,
                    });
                }
            }
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError {
                position: self.position(),
                message: format!("expressions nested more than {MAX_NESTING} levels deep"),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::concat)
    }

    fn concat(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.additive()?;
        if *self.peek() == Token::Concat {
            let position = self.position();
            self.advance();
            let rhs = self.expr()?;
            return Ok(binary(BinaryOp::Concat, lhs, rhs, position));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let position = self.position();
            self.advance();
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs, position);
        }
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            let position = self.position();
            self.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs, position);
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            _ => return self.primary(),
        };
        let position = self.position();
        self.advance();
        let operand = self.nested(Self::unary)?;

        // Fold negative literals so `-1` stays an integer literal.
        if op == UnaryOp::Neg {
            match operand {
                Expr::Integer(value) => return Ok(Expr::Integer(-value)),
                Expr::Number(value) => return Ok(Expr::Number(-value)),
                _ => {}
            }
        }

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            position,
        })
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let position = self.position();
        let literal = match self.peek() {
            Token::Nil => Some(Expr::Nil),
            Token::True => Some(Expr::Boolean(true)),
            Token::False => Some(Expr::Boolean(false)),
            Token::Integer(value) => Some(Expr::Integer(*value)),
            Token::Number(value) => Some(Expr::Number(*value)),
            Token::Str(value) => Some(Expr::Str(value.clone())),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(literal);
        }

        match self.peek() {
            Token::LBrace => self.table(),
            Token::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(Token::RParen, "to close parenthesis")?;
                Ok(inner)
            }
            Token::Name(_) => {
                let path = self.path()?;
                if *self.peek() != Token::LParen {
                    return Ok(Expr::Var(path));
                }
                self.advance();
                let mut args = Vec::new();
                if *self.peek() != Token::RParen {
                    args.push(self.expr()?);
                    while self.eat(&Token::Comma) {
                        args.push(self.expr()?);
                    }
                }
                self.expect(Token::RParen, "to close argument list")?;
                Ok(Expr::Call {
                    function: path,
                    args,
                    position,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn table(&mut self) -> Result<Expr, SyntaxError> {
        let position = self.position();
        self.expect(Token::LBrace, "to open table")?;
        let mut entries = Vec::new();

        while !matches!(self.peek(), Token::RBrace | Token::Eof) {
            let named = matches!(self.peek(), Token::Name(_)) && *self.peek_at(1) == Token::Assign;
            let entry = if named {
                let name = self.name("as table key")?;
                self.advance();
                TableEntry::Named(name, self.expr()?)
            } else if self.eat(&Token::LBracket) {
                let key = self.expr()?;
                self.expect(Token::RBracket, "to close table key")?;
                self.expect(Token::Assign, "after table key")?;
                TableEntry::Keyed(key, self.expr()?)
            } else {
                TableEntry::Positional(self.expr()?)
            };
            entries.push(entry);

            if !self.eat(&Token::Comma) && !self.eat(&Token::Semicolon) {
                break;
            }
        }

        self.expect(Token::RBrace, "to close table")?;
        Ok(Expr::Table { entries, position })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, position: Position) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        position,
    }
}
