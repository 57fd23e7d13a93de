//! Expression parser and evaluator.
//!
//! Expressions are deliberately small: literals, namespace lookups, field and
//! index access, arithmetic, comparison and boolean logic. Nothing outside the
//! [`Lookup`] passed to [`evaluate`] is reachable.
//!
//! `and` and `or` yield whichever operand decided the result, so
//! `{{ desc or 'TBD' }}` renders `desc` when it is non-empty.
//!
//! Nesting depth, expression length and the size of `*` repetitions are
//! capped; exceeding a cap is an evaluation error rather than a crash.
//!
//! Operator precedence (lowest → highest):
//!   or  →  and  →  not  →  comparison / in  →
//!   additive  →  multiplicative  →  unary minus  →  postfix  →  primary

use std::cmp::Ordering;

use crate::{
    error::{Result, TemplateError},
    expression_tokenizer::{Token, TokenType},
    value::{Lookup, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Sequence(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
}

/// Why an expression could not produce a value.
#[derive(Debug)]
enum Fault {
    Undefined(String),
    Invalid(String),
}

impl From<String> for Fault {
    fn from(message: String) -> Self {
        Fault::Invalid(message)
    }
}

type Outcome<T> = std::result::Result<T, Fault>;

const KEYWORDS: [&str; 8] = ["and", "or", "not", "in", "true", "false", "True", "False"];

/// Deepest nesting of brackets, `not` and unary minus an expression may use
const MAX_DEPTH: usize = 64;
/// Most tokens one expression may contain; bounds the height of the tree
const MAX_TOKENS: usize = 512;
/// Largest text length or sequence length `*` may produce
const MAX_REPEAT: usize = 1 << 20;

// ── Parser ───────────────────────────────────────────────────────────────────

struct Parser<'a> {
    current: Option<Token<'a>>,
    depth: usize,
    consumed: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Outcome<Self> {
        Ok(Self {
            current: Token::first(src)?,
            depth: 0,
            consumed: 0,
        })
    }

    fn advance(&mut self) -> Outcome<Option<Token<'a>>> {
        let token = self.current.take();
        if let Some(token) = &token {
            self.consumed += 1;
            if self.consumed > MAX_TOKENS {
                return Err(format!("expression is longer than {} tokens", MAX_TOKENS).into());
            }
            self.current = token.next()?;
        }
        Ok(token)
    }

    /// Runs `parse` one nesting level deeper.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Outcome<Expr>) -> Outcome<Expr> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("expression nests deeper than {} levels", MAX_DEPTH).into());
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        self.current.as_ref().is_some_and(|t| t.is_symbol(symbol))
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.current.as_ref().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat_symbol(&mut self, symbol: &str) -> Outcome<bool> {
        if self.at_symbol(symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_symbol(&mut self, symbol: &str) -> Outcome<()> {
        if self.eat_symbol(symbol)? {
            return Ok(());
        }
        Err(match &self.current {
            Some(token) => format!("expected '{}' but found '{}'", symbol, token.value),
            None => format!("expected '{}' but reached the end", symbol),
        }
        .into())
    }

    fn parse(mut self) -> Outcome<Expr> {
        let expr = self.parse_or()?;
        match self.current {
            Some(token) => Err(format!("unexpected '{}'", token.value).into()),
            None => Ok(expr),
        }
    }

    fn parse_or(&mut self) -> Outcome<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at_keyword("or") || self.at_symbol("||") {
            self.advance()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Outcome<Expr> {
        let mut lhs = self.parse_not()?;
        while self.at_keyword("and") || self.at_symbol("&&") {
            self.advance()?;
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Outcome<Expr> {
        if self.at_keyword("not") || self.at_symbol("!") {
            self.advance()?;
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn comparison_op(&self) -> Outcome<Option<BinaryOp>> {
        let Some(token) = &self.current else {
            return Ok(None);
        };
        Ok(match (token.token_type, token.value) {
            (TokenType::Symbol, "==") => Some(BinaryOp::Eq),
            (TokenType::Symbol, "!=") => Some(BinaryOp::Ne),
            (TokenType::Symbol, "<") => Some(BinaryOp::Lt),
            (TokenType::Symbol, "<=") => Some(BinaryOp::Le),
            (TokenType::Symbol, ">") => Some(BinaryOp::Gt),
            (TokenType::Symbol, ">=") => Some(BinaryOp::Ge),
            (TokenType::Identifier, "in") => Some(BinaryOp::In),
            (TokenType::Identifier, "not") => match token.next()? {
                Some(next) if next.is_keyword("in") => Some(BinaryOp::NotIn),
                _ => None,
            },
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Outcome<Expr> {
        let lhs = self.parse_additive()?;
        let Some(op) = self.comparison_op()? else {
            return Ok(lhs);
        };
        self.advance()?;
        if op == BinaryOp::NotIn {
            self.advance()?;
        }
        let rhs = self.parse_additive()?;
        if self.comparison_op()?.is_some() {
            return Err("chained comparisons are not supported".to_string().into());
        }
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_additive(&mut self) -> Outcome<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.at_symbol("+") {
                BinaryOp::Add
            } else if self.at_symbol("-") {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_multiplicative(&mut self) -> Outcome<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.at_symbol("*") {
                BinaryOp::Mul
            } else if self.at_symbol("/") {
                BinaryOp::Div
            } else if self.at_symbol("//") {
                BinaryOp::FloorDiv
            } else if self.at_symbol("%") {
                BinaryOp::Rem
            } else {
                return Ok(lhs);
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Outcome<Expr> {
        if self.eat_symbol("-")? {
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::Unary(UnaryOp::Negate, Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Outcome<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_symbol(".")? {
                match self.advance()? {
                    Some(token) if token.token_type == TokenType::Identifier => {
                        expr = Expr::Field(Box::new(expr), token.value.to_string());
                    }
                    Some(token) => {
                        return Err(format!("expected a field name after '.' but found '{}'", token.value).into());
                    }
                    None => return Err("expected a field name after '.'".to_string().into()),
                }
            } else if self.eat_symbol("[")? {
                let index = self.nested(Self::parse_or)?;
                self.expect_symbol("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Outcome<Expr> {
        let Some(token) = self.advance()? else {
            return Err("unexpected end of expression".to_string().into());
        };
        match token.token_type {
            TokenType::Number => parse_number(token.value).map(Expr::Literal),
            TokenType::Str => Ok(Expr::Literal(Value::Text(unescape(token.value)))),
            TokenType::Identifier => match token.value {
                "true" | "True" => Ok(Expr::Literal(Value::Boolean(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Boolean(false))),
                keyword if KEYWORDS.contains(&keyword) => Err(format!("unexpected '{}'", keyword).into()),
                name => Ok(Expr::Variable(name.to_string())),
            },
            TokenType::Symbol => match token.value {
                "(" => {
                    let inner = self.nested(Self::parse_or)?;
                    self.expect_symbol(")")?;
                    Ok(inner)
                }
                "[" => {
                    let mut items = Vec::new();
                    while !self.at_symbol("]") {
                        items.push(self.nested(Self::parse_or)?);
                        if !self.eat_symbol(",")? {
                            break;
                        }
                    }
                    self.expect_symbol("]")?;
                    Ok(Expr::Sequence(items))
                }
                other => Err(format!("unexpected '{}'", other).into()),
            },
        }
    }
}

fn parse_number(src: &str) -> Outcome<Value> {
    if src.contains('.') {
        return src
            .parse()
            .map(Value::Float)
            .map_err(|_| format!("invalid number '{}'", src).into());
    }
    src.parse()
        .map(Value::Integer)
        .map_err(|_| format!("integer '{}' is too large", src).into())
}

fn unescape(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ── Evaluator ────────────────────────────────────────────────────────────────

impl Expr {
    fn eval(&self, scope: &dyn Lookup) -> Outcome<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| Fault::Undefined(name.clone())),
            Expr::Sequence(items) => items
                .iter()
                .map(|item| item.eval(scope))
                .collect::<Outcome<Vec<_>>>()
                .map(Value::Sequence),
            Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Boolean(!operand.eval(scope)?.is_truthy())),
            Expr::Unary(UnaryOp::Negate, operand) => match operand.eval(scope)? {
                Value::Integer(n) => n
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| "integer overflow".to_string().into()),
                Value::Float(x) => Ok(Value::Float(-x)),
                other => Err(format!("bad operand type for unary -: '{}'", other.type_name()).into()),
            },
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let left = lhs.eval(scope)?;
                if left.is_truthy() {
                    rhs.eval(scope)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let left = lhs.eval(scope)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    rhs.eval(scope)
                }
            }
            Expr::Binary(op, lhs, rhs) => binary(*op, lhs.eval(scope)?, rhs.eval(scope)?),
            Expr::Field(target, field) => match target.eval(scope)? {
                Value::Map(mut fields) => fields
                    .remove(field)
                    .ok_or_else(|| format!("no field '{}'", field).into()),
                other => Err(format!("'{}' has no field '{}'", other.type_name(), field).into()),
            },
            Expr::Index(target, index) => index_into(target.eval(scope)?, index.eval(scope)?),
        }
    }
}

fn unsupported(op: BinaryOp, lhs: &Value, rhs: &Value) -> Fault {
    Fault::Invalid(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn overflow() -> Fault {
    Fault::Invalid("integer overflow".to_string())
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Outcome<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Boolean(!equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs).ok_or_else(|| unsupported(op, &lhs, &rhs))?;
            Ok(Value::Boolean(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::In => contains(&rhs, &lhs).map(Value::Boolean),
        BinaryOp::NotIn => contains(&rhs, &lhs).map(|found| Value::Boolean(!found)),
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(a + &b)),
            (Value::Sequence(mut a), Value::Sequence(b)) => {
                a.extend(b);
                Ok(Value::Sequence(a))
            }
            (lhs, rhs) => float_op(op, &lhs, &rhs, |a, b| a + b),
        },
        BinaryOp::Sub => match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
            (lhs, rhs) => float_op(op, &lhs, &rhs, |a, b| a - b),
        },
        BinaryOp::Mul => match (lhs, rhs) {
            (Value::Integer(a), Value::Integer(b)) => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
            (Value::Text(s), Value::Integer(n)) | (Value::Integer(n), Value::Text(s)) => {
                let times = repetitions(s.len(), n)?;
                Ok(Value::Text(s.repeat(times)))
            }
            (Value::Sequence(items), Value::Integer(n)) | (Value::Integer(n), Value::Sequence(items)) => {
                let times = repetitions(items.len(), n)?;
                Ok(Value::Sequence(
                    std::iter::repeat_n(items, times).flatten().collect(),
                ))
            }
            (lhs, rhs) => float_op(op, &lhs, &rhs, |a, b| a * b),
        },
        BinaryOp::Div => {
            let (a, b) = numbers(op, &lhs, &rhs)?;
            if b == 0.0 {
                return Err(Fault::Invalid("division by zero".to_string()));
            }
            Ok(Value::Float(a / b))
        }
        BinaryOp::FloorDiv => match (&lhs, &rhs) {
            (_, Value::Integer(0)) => Err(Fault::Invalid("division by zero".to_string())),
            (Value::Integer(a), Value::Integer(b)) => {
                let quotient = a.checked_div(*b).ok_or_else(overflow)?;
                let floored = if a % b != 0 && ((*a < 0) != (*b < 0)) {
                    quotient - 1
                } else {
                    quotient
                };
                Ok(Value::Integer(floored))
            }
            _ => {
                let (a, b) = numbers(op, &lhs, &rhs)?;
                if b == 0.0 {
                    return Err(Fault::Invalid("division by zero".to_string()));
                }
                Ok(Value::Float((a / b).floor()))
            }
        },
        BinaryOp::Rem => match (&lhs, &rhs) {
            (_, Value::Integer(0)) => Err(Fault::Invalid("modulo by zero".to_string())),
            (Value::Integer(a), Value::Integer(b)) => {
                let remainder = a.checked_rem(*b).ok_or_else(overflow)?;
                let adjusted = if remainder != 0 && ((remainder < 0) != (*b < 0)) {
                    remainder + b
                } else {
                    remainder
                };
                Ok(Value::Integer(adjusted))
            }
            _ => {
                let (a, b) = numbers(op, &lhs, &rhs)?;
                if b == 0.0 {
                    return Err(Fault::Invalid("modulo by zero".to_string()));
                }
                Ok(Value::Float(a - b * (a / b).floor()))
            }
        },
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are evaluated in Expr::eval"),
    }
}

/// Clamps a repeat count at zero and refuses results longer than [`MAX_REPEAT`].
fn repetitions(len: usize, count: i64) -> Outcome<usize> {
    let times = usize::try_from(count).unwrap_or(0);
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT => Ok(times),
        _ => Err(Fault::Invalid("repetition too large".to_string())),
    }
}

fn numbers(op: BinaryOp, lhs: &Value, rhs: &Value) -> Outcome<(f64, f64)> {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

fn float_op(op: BinaryOp, lhs: &Value, rhs: &Value, apply: impl Fn(f64, f64) -> f64) -> Outcome<Value> {
    let (a, b) = numbers(op, lhs, rhs)?;
    Ok(Value::Float(apply(a, b)))
}

fn equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

fn contains(container: &Value, item: &Value) -> Outcome<bool> {
    match (container, item) {
        (Value::Text(haystack), Value::Text(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Sequence(items), item) => Ok(items.iter().any(|candidate| equal(candidate, item))),
        (Value::Map(fields), Value::Text(key)) => Ok(fields.contains_key(key)),
        (container, item) => Err(unsupported(BinaryOp::In, item, container)),
    }
}

fn index_into(target: Value, index: Value) -> Outcome<Value> {
    match (target, index) {
        (Value::Sequence(mut items), Value::Integer(i)) => {
            let at = position(i, items.len())?;
            Ok(items.swap_remove(at))
        }
        (Value::Text(s), Value::Integer(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let at = position(i, chars.len())?;
            Ok(Value::Text(chars[at].to_string()))
        }
        (Value::Map(mut fields), Value::Text(key)) => fields
            .remove(&key)
            .ok_or_else(|| format!("no key '{}'", key).into()),
        (target, index) => Err(format!(
            "'{}' cannot be indexed by '{}'",
            target.type_name(),
            index.type_name()
        )
        .into()),
    }
}

/// Resolves a possibly negative index against a length.
fn position(index: i64, len: usize) -> Outcome<usize> {
    let resolved = if index < 0 {
        i64::try_from(len).ok().and_then(|len| len.checked_add(index))
    } else {
        Some(index)
    };
    resolved
        .and_then(|i| usize::try_from(i).ok())
        .filter(|i| *i < len)
        .ok_or_else(|| format!("index {} out of range", index).into())
}

// ── Entry points ─────────────────────────────────────────────────────────────

fn to_error(expression: &str, fault: Fault) -> TemplateError {
    match fault {
        Fault::Undefined(name) => TemplateError::UndefinedVariable { name },
        Fault::Invalid(message) => TemplateError::Expression {
            expression: expression.to_string(),
            message,
        },
    }
}

/// Parses expression text into a tree.
pub fn parse(src: &str) -> Result<Expr> {
    Parser::new(src)
        .and_then(Parser::parse)
        .map_err(|fault| to_error(src, fault))
}

impl Expr {
    /// Evaluates the tree against `scope`; `src` is only used in error messages.
    pub fn evaluate(&self, src: &str, scope: &dyn Lookup) -> Result<Value> {
        self.eval(scope).map_err(|fault| to_error(src, fault))
    }
}

/// Parses and evaluates expression text against `scope`.
pub fn evaluate(src: &str, scope: &dyn Lookup) -> Result<Value> {
    parse(src)?.evaluate(src, scope)
}
