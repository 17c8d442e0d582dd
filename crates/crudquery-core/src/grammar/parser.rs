//! Recursive descent parser for query text.

use super::lexer::{Lexer, PositionedToken, Token};
use crate::error::{ParseResult, QueryParseError};
use crate::expr::{BinaryOp, Expr};
use crate::value::{parse_datetime, Value};

/// Parser for the filter grammar produced by [`serialize`](crate::serialize).
///
/// # Grammar
///
/// ```text
/// expr     ::= lambda | or
/// or       ::= and ("||" and)*
/// and      ::= unary ("&&" unary)*
/// unary    ::= "!" unary | cmp
/// cmp      ::= additive (("=="|"!="|"<"|"<="|">"|">=") additive)?
/// additive ::= postfix (("+"|"-"|"*"|"/") postfix)*
/// postfix  ::= primary ("." ident ("(" args? ")")?)*
/// primary  ::= "(" expr ")" | literal | ident | "new" "[" literals? "]"
/// args     ::= expr ("," expr)*
/// lambda   ::= ident "=>" expr
/// literal  ::= string | number | "true" | "false" | "null"
///            | "DateTime.Parse(" string ")"
/// ```
///
/// # Operator Precedence (highest to lowest)
///
/// 1. `.` member access and method calls
/// 2. `+ - * /` - left-associative
/// 3. `== != < <= > >=` - non-associative
/// 4. `!` (NOT) - unary, applies to a whole comparison
/// 5. `&&` (AND) - left-associative
/// 6. `||` (OR) - left-associative
///
/// # Example
///
/// ```
/// use crudquery_core::{BinaryOp, Expr, QueryParser};
///
/// let expr = QueryParser::parse("Precio > 100 && Nombre.Contains(\"ana\")").unwrap();
/// assert!(matches!(expr, Expr::Binary { op: BinaryOp::AndAlso, .. }));
/// ```
pub struct QueryParser {
    tokens: Vec<PositionedToken>,
    position: usize,
}

impl QueryParser {
    /// Parses query text into an [`Expr`].
    ///
    /// # Errors
    ///
    /// Returns `QueryParseError::EmptyExpression` if the input is blank.
    ///
    /// Returns `QueryParseError::UnexpectedToken` if a token does not fit the
    /// grammar, and `QueryParseError::UnclosedParenthesis` if the input ends
    /// inside parentheses or brackets.
    pub fn parse(input: &str) -> ParseResult<Expr> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(QueryParseError::EmptyExpression);
        }

        let tokens = Lexer::new(trimmed).tokenize()?;
        let mut parser = Self {
            tokens,
            position: 0,
        };
        let expr = parser.parse_expression()?;

        // Check that we consumed all tokens
        if let Some(remaining) = parser.tokens.get(parser.position) {
            return Err(QueryParseError::unexpected_token(
                remaining.token.to_string(),
                remaining.position,
            ));
        }

        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    /// Reports the current token as unexpected, or the end of input.
    fn unexpected(&self) -> QueryParseError {
        match self.tokens.get(self.position) {
            Some(t) => QueryParseError::unexpected_token(t.token.to_string(), t.position),
            None => QueryParseError::UnexpectedEndOfInput,
        }
    }

    /// Consumes a closing `)` or `]`.
    fn expect_close(&mut self, close: &Token) -> ParseResult<()> {
        if self.check(close) {
            self.advance();
            Ok(())
        } else if self.peek().is_none() {
            Err(QueryParseError::UnclosedParenthesis)
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        if let (Some(Token::Ident(param)), Some(Token::Arrow)) = (self.peek(), self.peek_second()) {
            let param = param.clone();
            self.position += 2;
            let body = self.parse_expression()?;
            return Ok(Expr::lambda(param, body));
        }
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance(); // consume '||'
            let right = self.parse_and_expr()?;
            left = Expr::or(left, right);
        }

        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary_expr()?;

        while self.check(&Token::And) {
            self.advance(); // consume '&&'
            let right = self.parse_unary_expr()?;
            left = Expr::and(left, right);
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        if self.check(&Token::Not) {
            self.advance(); // consume '!'
            let inner = self.parse_unary_expr()?;
            return Ok(Expr::negate(inner));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::binary(op, left, right))
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_postfix()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_postfix()?;
            left = Expr::binary(op, left, right);
        }
    }

    /// Parses member access chains and method calls.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;

        while self.check(&Token::Dot) {
            self.advance(); // consume '.'
            let name = match self.advance() {
                Some(PositionedToken {
                    token: Token::Ident(name),
                    ..
                }) => name,
                Some(t) => {
                    return Err(QueryParseError::unexpected_token(
                        t.token.to_string(),
                        t.position,
                    ))
                }
                None => return Err(QueryParseError::UnexpectedEndOfInput),
            };

            if self.check(&Token::OpenParen) {
                self.advance(); // consume '('
                let args = self.parse_arguments()?;
                expr = call_or_literal(expr, name, args)?;
            } else {
                expr = match expr {
                    Expr::Member(path) => Expr::Member(format!("{path}.{name}")),
                    _ => {
                        let at = self.tokens[self.position - 1].position;
                        return Err(QueryParseError::unexpected_token(name, at));
                    }
                };
            }
        }

        Ok(expr)
    }

    /// Parses `args? ")"` after an opening parenthesis.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.check(&Token::CloseParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.check(&Token::Comma) {
                self.advance();
                continue;
            }
            self.expect_close(&Token::CloseParen)?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance().ok_or(QueryParseError::UnexpectedEndOfInput)?;

        match token.token {
            Token::OpenParen => {
                let inner = self.parse_expression()?;
                self.expect_close(&Token::CloseParen)?;
                Ok(inner)
            }
            Token::New => self.parse_array(),
            Token::Ident(name) => Ok(Expr::Member(name)),
            other => match literal(&other) {
                Some(value) => Ok(Expr::Constant(value)),
                None => Err(QueryParseError::unexpected_token(
                    other.to_string(),
                    token.position,
                )),
            },
        }
    }

    /// Parses `"[" (literal ("," literal)*)? "]"` after `new`.
    fn parse_array(&mut self) -> ParseResult<Expr> {
        if !self.check(&Token::OpenBracket) {
            return Err(self.unexpected());
        }
        self.advance();

        let mut values = Vec::new();
        if self.check(&Token::CloseBracket) {
            self.advance();
            return Ok(Expr::Array(values));
        }
        loop {
            match self.parse_postfix()? {
                Expr::Constant(value) => values.push(value),
                other => {
                    return Err(QueryParseError::unexpected_token(
                        other.to_string(),
                        self.tokens[self.position - 1].position,
                    ))
                }
            }
            if self.check(&Token::Comma) {
                self.advance();
                continue;
            }
            self.expect_close(&Token::CloseBracket)?;
            return Ok(Expr::Array(values));
        }
    }
}

fn literal(token: &Token) -> Option<Value> {
    match token {
        Token::Str(s) => Some(Value::Text(s.clone())),
        Token::Int(i) => Some(Value::Int(*i)),
        Token::Float(x) => Some(Value::Float(*x)),
        Token::True => Some(Value::Bool(true)),
        Token::False => Some(Value::Bool(false)),
        Token::Null => Some(Value::Null),
        _ => None,
    }
}

/// Folds `DateTime.Parse("...")` into a date constant; any other call stays
/// a call.
fn call_or_literal(target: Expr, method: String, args: Vec<Expr>) -> ParseResult<Expr> {
    if let (Expr::Member(path), "Parse", [Expr::Constant(Value::Text(text))]) =
        (&target, method.as_str(), args.as_slice())
    {
        if path == "DateTime" {
            return parse_datetime(text)
                .map(|date| Expr::Constant(Value::DateTime(date)))
                .ok_or_else(|| QueryParseError::InvalidDate { text: text.clone() });
        }
    }
    Ok(Expr::call(target, method, args))
}
