//! Arithmetic expressions
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    → term ( ( "+" | "-" ) term )*
//! term    → unary ( ( "*" | "/" ) unary )*
//! unary   → "-" unary | primary
//! primary → NUMBER | IDENT | "(" expr ")"
//! ```
//!
//! Source text is lexed and parsed in full before anything is evaluated, so
//! attribute access, calls and stray characters are rejected up front.
//!
//! Nesting of parentheses and negations is capped at [`MAX_DEPTH`] and a single
//! expression holds at most [`MAX_OPERATORS`] binary operators, which keeps the
//! recursive parse, evaluation and drop of the tree within a small stack.

use std::fmt;

use super::error::EvalError;
use super::store::{Slot, VariableStore, is_word_char};

/// Result of evaluating an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            // Whole floats keep a fractional digit so 8 / 2 reads as 4.0
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Number),
    Variable(String),
    Negate(Box<Expr>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Ident(name) => write!(f, "name '{}'", name),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let mut is_float = false;
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    is_float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                // A literal running straight into a name (`2x`) is not arithmetic
                if i < chars.len() && is_word_char(chars[i]) {
                    let end = chars[i..]
                        .iter()
                        .position(|c| !is_word_char(*c))
                        .map_or(chars.len(), |p| i + p);
                    return Err(EvalError::InvalidNumber(chars[start..end].iter().collect()));
                }
                let text: String = chars[start..i].iter().collect();
                let number = if is_float {
                    text.parse::<f64>().map(Number::Float).ok()
                } else {
                    text.parse::<i64>().map(Number::Int).ok()
                };
                tokens.push(Token::Number(
                    number.ok_or_else(|| EvalError::InvalidNumber(text.clone()))?,
                ));
            }
            c if is_word_char(c) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();

                let mut next = i;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                match chars.get(next) {
                    Some('.') => return Err(EvalError::AttributeAccess(name)),
                    Some('(') => return Err(EvalError::Call(name)),
                    _ => tokens.push(Token::Ident(name)),
                }
            }
            '.' => {
                let owner = match tokens.last() {
                    Some(Token::RParen) => ")".to_string(),
                    Some(Token::Number(n)) => n.to_string(),
                    _ => String::new(),
                };
                return Err(EvalError::AttributeAccess(owner));
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

/// Deepest nesting of `(` and unary `-` accepted in one expression
pub const MAX_DEPTH: usize = 64;

/// Most binary operators accepted in one expression
pub const MAX_OPERATORS: usize = 1024;

/// Recursive-descent parser over the token stream
struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
            operators: 0,
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn binary(&mut self, op: BinOp, left: Expr, right: Expr) -> Result<Expr, EvalError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(EvalError::TooLong(MAX_OPERATORS));
        }
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.current += 1;
            let right = self.term()?;
            expr = self.binary(op, expr, right)?;
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.current += 1;
            let right = self.unary()?;
            expr = self.binary(op, expr, right)?;
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.peek() == Some(&Token::Minus) {
            self.current += 1;
            self.enter()?;
            let operand = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(n)),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.expression()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(EvalError::UnexpectedToken(other.to_string())),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(other) => Err(EvalError::UnexpectedToken(other.to_string())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

/// Parse `src` into an expression tree without evaluating it
pub fn parse(src: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser::new(tokens);
    let expr = parser.expression()?;
    match parser.advance() {
        None => Ok(expr),
        Some(extra) => Err(EvalError::UnexpectedToken(extra.to_string())),
    }
}

/// Parse and evaluate `src` with `vars` as the only scope
pub fn evaluate(src: &str, vars: &VariableStore) -> Result<Number, EvalError> {
    parse(src)?.eval(vars)
}

impl Expr {
    pub fn eval(&self, vars: &VariableStore) -> Result<Number, EvalError> {
        match self {
            Expr::Literal(n) => Ok(*n),
            Expr::Variable(name) => match vars.get(name) {
                Some(Slot::Int(n)) => Ok(Number::Int(n)),
                Some(Slot::Unset) => Err(EvalError::Uninitialized(name.clone())),
                None => Err(EvalError::UnknownVariable(name.clone())),
            },
            Expr::Negate(operand) => match operand.eval(vars)? {
                Number::Int(n) => n.checked_neg().map(Number::Int).ok_or(EvalError::Overflow),
                Number::Float(f) => Ok(Number::Float(-f)),
            },
            Expr::Binary { op, left, right } => {
                let lhs = left.eval(vars)?;
                let rhs = right.eval(vars)?;
                apply(*op, lhs, rhs)
            }
        }
    }
}

fn apply(op: BinOp, lhs: Number, rhs: Number) -> Result<Number, EvalError> {
    match (op, lhs, rhs) {
        (BinOp::Div, _, _) => {
            let divisor = rhs.as_f64();
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Number::Float(lhs.as_f64() / divisor))
        }
        (BinOp::Add, Number::Int(a), Number::Int(b)) => int_result(a.checked_add(b)),
        (BinOp::Sub, Number::Int(a), Number::Int(b)) => int_result(a.checked_sub(b)),
        (BinOp::Mul, Number::Int(a), Number::Int(b)) => int_result(a.checked_mul(b)),
        (BinOp::Add, _, _) => Ok(Number::Float(lhs.as_f64() + rhs.as_f64())),
        (BinOp::Sub, _, _) => Ok(Number::Float(lhs.as_f64() - rhs.as_f64())),
        (BinOp::Mul, _, _) => Ok(Number::Float(lhs.as_f64() * rhs.as_f64())),
    }
}

fn int_result(value: Option<i64>) -> Result<Number, EvalError> {
    value.map(Number::Int).ok_or(EvalError::Overflow)
}
