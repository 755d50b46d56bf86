//! Tokenizer for the configuration language.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Integer(i64),
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
    Not,
    Local,
    Return,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Concat,
    Dot,
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "'{name}'"),
            Token::Integer(value) => write!(f, "'{value}'"),
            Token::Number(value) => write!(f, "'{value}'"),
            Token::Str(value) => write!(f, "string {value:?}"),
            Token::True => f.write_str("'true'"),
            Token::False => f.write_str("'false'"),
            Token::Nil => f.write_str("'nil'"),
            Token::Not => f.write_str("'not'"),
            Token::Local => f.write_str("'local'"),
            Token::Return => f.write_str("'return'"),
            Token::Assign => f.write_str("'='"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Concat => f.write_str("'..'"),
            Token::Dot => f.write_str("'.'"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Eof => f.write_str("end of file"),
        }
    }
}

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn error(&self, position: Position, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            position,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let position = self.position();
            let Some(c) = self.peek() else {
                tokens.push(Spanned {
                    token: Token::Eof,
                    position,
                });
                return Ok(tokens);
            };

            let token = match c {
                '0'..='9' => self.number(position)?,
                '.' if self.peek_second().is_some_and(|n| n.is_ascii_digit()) => {
                    self.number(position)?
                }
                '"' | '\'' => self.string(position)?,
                c if c == '_' || c.is_ascii_alphabetic() => self.word(),
                _ => self.symbol(position)?,
            };
            tokens.push(Spanned { token, position });
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.peek_second() == Some('-') => {
                    let start = self.position();
                    self.bump();
                    self.bump();
                    if self.peek() == Some('[') && self.peek_second() == Some('[') {
                        self.bump();
                        self.bump();
                        self.block_comment(start)?;
                    } else {
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn block_comment(&mut self, start: Position) -> Result<(), SyntaxError> {
        while let Some(c) = self.bump() {
            if c == ']' && self.peek() == Some(']') {
                self.bump();
                return Ok(());
            }
        }
        Err(self.error(start, "unfinished block comment"))
    }

    fn number(&mut self, position: Position) -> Result<Token, SyntaxError> {
        let mut text = String::new();
        let mut is_float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !is_float && self.peek_second() != Some('.') {
                is_float = true;
                text.push(c);
            } else if c == 'e' || c == 'E' {
                is_float = true;
                text.push(c);
                self.bump();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.bump();
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }

        if self
            .peek()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        {
            return Err(self.error(position, format!("malformed number near '{text}'")));
        }

        if is_float {
            text.parse::<f64>()
                .map(Token::Number)
                .map_err(|_| self.error(position, format!("malformed number '{text}'")))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| self.error(position, format!("integer '{text}' is too large")))
        }
    }

    fn string(&mut self, position: Position) -> Result<Token, SyntaxError> {
        let quote = self.bump().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(position, "unfinished string")),
                Some(c) if c == quote => return Ok(Token::Str(value)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(digit) if digit.is_ascii_digit() => self.decimal_escape(digit, position)?,
                        Some(other) => {
                            return Err(
                                self.error(position, format!("invalid escape sequence '\\{other}'"))
                            );
                        }
                        None => return Err(self.error(position, "unfinished string")),
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// `\ddd`: up to three decimal digits naming an ASCII character.
    fn decimal_escape(&mut self, first: char, position: Position) -> Result<char, SyntaxError> {
        let mut code = first.to_digit(10).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(10)) {
                Some(digit) => {
                    code = code * 10 + digit;
                    self.bump();
                }
                None => break,
            }
        }
        char::from_u32(code)
            .filter(char::is_ascii)
            .ok_or_else(|| self.error(position, format!("decimal escape '\\{code}' is not ASCII")))
    }

    fn word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_ascii_alphanumeric() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match word.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "nil" => Token::Nil,
            "not" => Token::Not,
            "local" => Token::Local,
            "return" => Token::Return,
            _ => Token::Name(word),
        }
    }

    fn symbol(&mut self, position: Position) -> Result<Token, SyntaxError> {
        let c = self.bump().unwrap_or_default();
        let token = match c {
            '=' => Token::Assign,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '.' if self.peek() == Some('.') => {
                self.bump();
                Token::Concat
            }
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            other => return Err(self.error(position, format!("unexpected symbol '{other}'"))),
        };
        Ok(token)
    }
}
