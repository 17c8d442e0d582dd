//! Lexer (tokenizer) for query text.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::{ParseResult, QueryParseError};

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    pub token: Token,
    /// The byte position where the token starts (0-indexed).
    pub position: usize,
}

/// A token of query text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ==================== Literals ====================
    Ident(String),
    /// A string literal with escapes resolved.
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    New,

    // ==================== Logical ====================
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,

    // ==================== Comparison ====================
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // ==================== Arithmetic ====================
    Plus,
    Minus,
    Star,
    Slash,

    // ==================== Punctuation ====================
    Dot,
    Comma,
    /// `=>`
    Arrow,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
}

impl Token {
    /// Returns true if the token can end an operand, after which `-` is
    /// subtraction rather than a sign.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Ident(_)
                | Token::Str(_)
                | Token::Int(_)
                | Token::Float(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::CloseParen
                | Token::CloseBracket
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Str(s) => f.write_str(&crate::value::quote(s)),
            Token::Int(i) => write!(f, "{i}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::New => f.write_str("new"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Not => f.write_str("!"),
            Token::Eq => f.write_str("=="),
            Token::Ne => f.write_str("!="),
            Token::Lt => f.write_str("<"),
            Token::Le => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::Ge => f.write_str(">="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::Arrow => f.write_str("=>"),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::OpenBracket => f.write_str("["),
            Token::CloseBracket => f.write_str("]"),
        }
    }
}

/// Lexer for tokenizing query text.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current byte position in the input string.
    position: usize,
    /// Set when the previous token can end an operand.
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            after_operand: false,
        }
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Consumes and returns the next character, updating position.
    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            self.position += ch.len_utf8();
        }
        c
    }

    /// Consumes the next character if it equals `expected`.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(&expected) {
            self.next_char();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.peek() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, out: &mut String, accept: impl Fn(char) -> bool) {
        while let Some(&c) = self.peek() {
            if !accept(c) {
                break;
            }
            out.push(c);
            self.next_char();
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        self.read_while(&mut ident, |c| c.is_alphanumeric() || c == '_');
        match ident.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "new" => Token::New,
            _ => Token::Ident(ident),
        }
    }

    /// Reads a double-quoted string. `\x` stands for `x`.
    fn read_quoted_string(&mut self, start: usize) -> ParseResult<Token> {
        // Consume the opening quote
        self.next_char();

        let mut result = String::new();
        loop {
            match self.next_char() {
                Some('"') => return Ok(Token::Str(result)),
                Some('\\') => match self.next_char() {
                    Some(escaped) => result.push(escaped),
                    None => break,
                },
                Some(c) => result.push(c),
                None => break,
            }
        }
        Err(QueryParseError::UnterminatedString { position: start })
    }

    /// Reads `-? digit+ (. digit+)?`; the sign, if any, is already consumed.
    fn read_number(&mut self, negative: bool) -> ParseResult<Token> {
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        self.read_while(&mut text, |c| c.is_ascii_digit());
        if self.eat('.') {
            text.push('.');
            let before = text.len();
            self.read_while(&mut text, |c| c.is_ascii_digit());
            if text.len() == before {
                return Err(QueryParseError::invalid_number(text));
            }
            return text
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| QueryParseError::invalid_number(text));
        }
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| QueryParseError::invalid_number(text))
    }

    /// Returns the next token with its position, or None at end of input.
    pub fn next_token(&mut self) -> ParseResult<Option<PositionedToken>> {
        self.skip_whitespace();

        let Some(&c) = self.peek() else {
            return Ok(None);
        };
        let start = self.position;

        let token = match c {
            '"' => self.read_quoted_string(start)?,
            c if c.is_ascii_digit() => self.read_number(false)?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            _ => {
                self.next_char();
                match c {
                    '&' if self.eat('&') => Token::And,
                    '|' if self.eat('|') => Token::Or,
                    '!' if self.eat('=') => Token::Ne,
                    '!' => Token::Not,
                    '=' if self.eat('=') => Token::Eq,
                    '=' if self.eat('>') => Token::Arrow,
                    '<' if self.eat('=') => Token::Le,
                    '<' => Token::Lt,
                    '>' if self.eat('=') => Token::Ge,
                    '>' => Token::Gt,
                    '-' if !self.after_operand
                        && self.peek().is_some_and(|next| next.is_ascii_digit()) =>
                    {
                        self.read_number(true)?
                    }
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    '(' => Token::OpenParen,
                    ')' => Token::CloseParen,
                    '[' => Token::OpenBracket,
                    ']' => Token::CloseBracket,
                    character => {
                        return Err(QueryParseError::UnknownCharacter {
                            character,
                            position: start,
                        })
                    }
                }
            }
        };

        self.after_operand = token.ends_operand();
        Ok(Some(PositionedToken {
            token,
            position: start,
        }))
    }

    /// Tokenizes the entire input, stopping at the first error.
    pub fn tokenize(mut self) -> ParseResult<Vec<PositionedToken>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
