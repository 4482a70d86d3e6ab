//! The `${...}` expression language of attribute values.
//!
//! Expressions are lexed with [`logos`], parsed with [`chumsky`]
//! and evaluated against a frame of the parameter [`Scope`].

use chumsky::{Parser, prelude::*, select};
use logos::Logos;
use oscar_core::scope::{FrameId, Scope, ScopeError, Value};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(error = String)]
pub enum Token {
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("not")]
    Not,

    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("<")]
    Less,

    #[token("<=")]
    LessOrEqual,

    #[token("==")]
    Equal,

    #[token("!=")]
    NotEqual,

    #[token(">=")]
    GreaterOrEqual,

    #[token(">")]
    Greater,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    // Stored as bits, so that tokens can be compared and hashed.
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok().map(f64::to_bits))]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok().map(f64::to_bits))]
    Double(u64),

    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[1..].to_owned())]
    Parameter(String),

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Identifier(String),
}

/// Binary operators, in increasing order of precedence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Greater => ">",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
    Not,
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Round,
    Floor,
    Ceil,
    Sqrt,
    Abs,
    Min,
    Max,
    Pow,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "round" => Some(Function::Round),
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "pow" => Some(Function::Pow),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Function::Min | Function::Max | Function::Pow => 2,
            _ => 1,
        }
    }
}

/// Syntax tree of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// A parameter reference, without the leading `$`.
    Parameter(String),
    /// Arithmetic negation.
    Neg(Box<Expr>),
    /// Logical negation.
    Not(Box<Expr>),
    /// A binary operation.
    Binary(BinaryOp, Box<(Expr, Expr)>),
    /// A function call.
    Call(Function, Vec<Expr>),
}

/// Errors of expressions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    /// A character sequence that is not a token.
    #[error("lexer error at {0:?}")]
    Lexer(Range<usize>),
    /// The tokens do not form an expression.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// A parameter cannot be resolved.
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// An operator is applied to values of the wrong type.
    #[error("`{0}` cannot be applied to {1}")]
    Operand(String, String),
    /// A function is called with the wrong number of arguments.
    #[error("`{0:?}` expects {1} argument(s), found {2}")]
    Arity(Function, usize, usize),
    /// Integer division (or remainder) by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Integer arithmetic overflow.
    #[error("integer overflow")]
    Overflow,
}

fn parser() -> impl Parser<Token, Expr, Error = Simple<Token>> {
    recursive(|expr| {
        let literal = select! {
            Token::Integer(n) => Expr::Literal(Value::Integer(n)),
            Token::Double(bits) => Expr::Literal(Value::Double(f64::from_bits(bits))),
            Token::True => Expr::Literal(Value::Boolean(true)),
            Token::False => Expr::Literal(Value::Boolean(false)),
            Token::Parameter(name) => Expr::Parameter(name),
        };

        let call = select! { Token::Identifier(name) => name }
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .try_map(|(name, args), span| {
                Function::from_name(&name)
                    .map(|function| Expr::Call(function, args))
                    .ok_or_else(|| Simple::custom(span, format!("unknown function `{name}`")))
            });

        let atom = literal
            .or(call)
            .or(expr.delimited_by(just(Token::LParen), just(Token::RParen)));

        let unary = just(Token::Minus)
            .to(UnaryOp::Neg)
            .or(just(Token::Not).to(UnaryOp::Not))
            .repeated()
            .then(atom)
            .foldr(|op, rhs| match op {
                UnaryOp::Neg => Expr::Neg(Box::new(rhs)),
                UnaryOp::Not => Expr::Not(Box::new(rhs)),
            });

        let binary = |op: BinaryOp, lhs: Expr, rhs: Expr| Expr::Binary(op, Box::new((lhs, rhs)));

        let product = unary
            .clone()
            .then(
                just(Token::Star)
                    .to(BinaryOp::Mul)
                    .or(just(Token::Slash).to(BinaryOp::Div))
                    .or(just(Token::Percent).to(BinaryOp::Rem))
                    .then(unary)
                    .repeated(),
            )
            .foldl(move |lhs, (op, rhs)| binary(op, lhs, rhs));

        let sum = product
            .clone()
            .then(
                just(Token::Plus)
                    .to(BinaryOp::Add)
                    .or(just(Token::Minus).to(BinaryOp::Sub))
                    .then(product)
                    .repeated(),
            )
            .foldl(move |lhs, (op, rhs)| binary(op, lhs, rhs));

        let comparison = sum
            .clone()
            .then(
                just(Token::LessOrEqual)
                    .to(BinaryOp::LessOrEqual)
                    .or(just(Token::Less).to(BinaryOp::Less))
                    .or(just(Token::Equal).to(BinaryOp::Equal))
                    .or(just(Token::NotEqual).to(BinaryOp::NotEqual))
                    .or(just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual))
                    .or(just(Token::Greater).to(BinaryOp::Greater))
                    .then(sum)
                    .repeated(),
            )
            .foldl(move |lhs, (op, rhs)| binary(op, lhs, rhs));

        let conjunction = comparison
            .clone()
            .then(just(Token::And).to(BinaryOp::And).then(comparison).repeated())
            .foldl(move |lhs, (op, rhs)| binary(op, lhs, rhs));

        conjunction
            .clone()
            .then(just(Token::Or).to(BinaryOp::Or).then(conjunction).repeated())
            .foldl(move |lhs, (op, rhs)| binary(op, lhs, rhs))
    })
    .then_ignore(end())
}

/// Parses the body of a `${...}` expression.
pub fn parse_expression(input: &str) -> Result<Expr, ExpressionError> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(input).spanned() {
        match token {
            Ok(token) => tokens.push(token),
            Err(_) => return Err(ExpressionError::Lexer(span)),
        }
    }
    parser().parse(tokens).map_err(|errors| {
        let reasons = errors
            .iter()
            .map(|err| match err.found() {
                Some(token) => format!("unexpected {token:?} at token {}", err.span().start),
                None => "unexpected end of expression".to_owned(),
            })
            .collect::<Vec<_>>();
        ExpressionError::Syntax(reasons.join(", "))
    })
}

// Numeric view of a value: integers stay integers as long as possible.
#[derive(Debug, Clone, Copy)]
enum Number {
    Integer(i64),
    Double(f64),
}

impl Number {
    fn from_value(value: &Value, op: &str) -> Result<Self, ExpressionError> {
        match value {
            Value::Integer(i) => Ok(Number::Integer(*i)),
            Value::UnsignedInteger(u) => i64::try_from(*u)
                .map(Number::Integer)
                .map_err(|_| ExpressionError::Overflow),
            Value::Double(d) => Ok(Number::Double(*d)),
            Value::Boolean(_) | Value::String(_) => Err(ExpressionError::Operand(
                op.to_owned(),
                format!("{} `{value}`", value.parameter_type()),
            )),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Double(d) => d,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Integer(i) => Value::Integer(i),
            Number::Double(d) => Value::Double(d),
        }
    }
}

fn boolean(value: &Value, op: &str) -> Result<bool, ExpressionError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        _ => Err(ExpressionError::Operand(
            op.to_owned(),
            format!("{} `{value}`", value.parameter_type()),
        )),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    let name = op.to_string();
    let lhs = Number::from_value(lhs, &name)?;
    let rhs = Number::from_value(rhs, &name)?;
    let value = match (op, lhs, rhs) {
        // Division always yields a double.
        (BinaryOp::Div, lhs, rhs) => Number::Double(lhs.as_f64() / rhs.as_f64()),
        (op, Number::Integer(l), Number::Integer(r)) => {
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Rem if r == 0 => return Err(ExpressionError::DivisionByZero),
                BinaryOp::Rem => l.checked_rem(r),
                _ => unreachable!("not an arithmetic operator"),
            };
            Number::Integer(result.ok_or(ExpressionError::Overflow)?)
        }
        (op, lhs, rhs) => {
            let (l, r) = (lhs.as_f64(), rhs.as_f64());
            Number::Double(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Rem => l % r,
                _ => unreachable!("not an arithmetic operator"),
            })
        }
    };
    Ok(value.into_value())
}

fn comparison(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<bool, ExpressionError> {
    match (lhs, rhs) {
        (Value::Boolean(l), Value::Boolean(r)) => match op {
            BinaryOp::Equal => Ok(l == r),
            BinaryOp::NotEqual => Ok(l != r),
            _ => Err(ExpressionError::Operand(op.to_string(), "booleans".to_owned())),
        },
        (Value::String(l), Value::String(r)) => match op {
            BinaryOp::Equal => Ok(l == r),
            BinaryOp::NotEqual => Ok(l != r),
            _ => Err(ExpressionError::Operand(op.to_string(), "strings".to_owned())),
        },
        (lhs, rhs) => {
            let name = op.to_string();
            let l = Number::from_value(lhs, &name)?.as_f64();
            let r = Number::from_value(rhs, &name)?.as_f64();
            Ok(match op {
                BinaryOp::Less => l < r,
                BinaryOp::LessOrEqual => l <= r,
                BinaryOp::Equal => l == r,
                BinaryOp::NotEqual => l != r,
                BinaryOp::GreaterOrEqual => l >= r,
                BinaryOp::Greater => l > r,
                _ => unreachable!("not a comparison operator"),
            })
        }
    }
}

fn call(function: Function, args: &[Value]) -> Result<Value, ExpressionError> {
    if args.len() != function.arity() {
        return Err(ExpressionError::Arity(function, function.arity(), args.len()));
    }
    let name = format!("{function:?}").to_lowercase();
    let numbers = args
        .iter()
        .map(|arg| Number::from_value(arg, &name))
        .collect::<Result<Vec<_>, _>>()?;
    let to_integer = |d: f64| {
        if d.is_finite() && d >= i64::MIN as f64 && d <= i64::MAX as f64 {
            Ok(Value::Integer(d as i64))
        } else {
            Err(ExpressionError::Overflow)
        }
    };
    match (function, numbers.as_slice()) {
        (Function::Round, [x]) => to_integer(x.as_f64().round()),
        (Function::Floor, [x]) => to_integer(x.as_f64().floor()),
        (Function::Ceil, [x]) => to_integer(x.as_f64().ceil()),
        (Function::Sqrt, [x]) => Ok(Value::Double(x.as_f64().sqrt())),
        (Function::Abs, [Number::Integer(i)]) => {
            i.checked_abs().map(Value::Integer).ok_or(ExpressionError::Overflow)
        }
        (Function::Abs, [x]) => Ok(Value::Double(x.as_f64().abs())),
        (Function::Min, [Number::Integer(a), Number::Integer(b)]) => Ok(Value::Integer(*a.min(b))),
        (Function::Min, [a, b]) => Ok(Value::Double(a.as_f64().min(b.as_f64()))),
        (Function::Max, [Number::Integer(a), Number::Integer(b)]) => Ok(Value::Integer(*a.max(b))),
        (Function::Max, [a, b]) => Ok(Value::Double(a.as_f64().max(b.as_f64()))),
        (Function::Pow, [a, b]) => Ok(Value::Double(a.as_f64().powf(b.as_f64()))),
        (function, args) => Err(ExpressionError::Arity(function, function.arity(), args.len())),
    }
}

impl Expr {
    /// Evaluates the expression, resolving parameters from the given frame.
    pub fn evaluate(&self, scope: &Scope, frame: FrameId) -> Result<Value, ExpressionError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Parameter(name) => Ok(scope.resolve(frame, name)?.clone()),
            Expr::Neg(expr) => match Number::from_value(&expr.evaluate(scope, frame)?, "-")? {
                Number::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or(ExpressionError::Overflow),
                Number::Double(d) => Ok(Value::Double(-d)),
            },
            Expr::Not(expr) => Ok(Value::Boolean(!boolean(
                &expr.evaluate(scope, frame)?,
                "not",
            )?)),
            Expr::Binary(op, args) => {
                let (lhs, rhs) = args.as_ref();
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        let name = op.to_string();
                        let lhs = boolean(&lhs.evaluate(scope, frame)?, &name)?;
                        let rhs = boolean(&rhs.evaluate(scope, frame)?, &name)?;
                        Ok(Value::Boolean(if *op == BinaryOp::And {
                            lhs && rhs
                        } else {
                            lhs || rhs
                        }))
                    }
                    BinaryOp::Less
                    | BinaryOp::LessOrEqual
                    | BinaryOp::Equal
                    | BinaryOp::NotEqual
                    | BinaryOp::GreaterOrEqual
                    | BinaryOp::Greater => Ok(Value::Boolean(comparison(
                        *op,
                        &lhs.evaluate(scope, frame)?,
                        &rhs.evaluate(scope, frame)?,
                    )?)),
                    BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::Rem => arithmetic(
                        *op,
                        &lhs.evaluate(scope, frame)?,
                        &rhs.evaluate(scope, frame)?,
                    ),
                }
            }
            Expr::Call(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(scope, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*function, &args)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn eval(input: &str) -> Result<Value, ExpressionError> {
        let mut scope = Scope::new();
        scope
            .declare(Scope::GLOBAL, "speed", Value::Double(10.0))
            .expect("declare");
        scope
            .declare(Scope::GLOBAL, "lanes", Value::Integer(3))
            .expect("declare");
        scope
            .declare(Scope::GLOBAL, "enabled", Value::Boolean(true))
            .expect("declare");
        parse_expression(input)?.evaluate(&scope, Scope::GLOBAL)
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Value::Integer(7)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Value::Integer(9)));
        assert_eq!(eval("-2 - -3"), Ok(Value::Integer(1)));
        assert_eq!(eval("7 % 4 + 1"), Ok(Value::Integer(4)));
    }

    #[test]
    fn parameters() {
        assert_eq!(eval("$speed / 3.6"), Ok(Value::Double(10.0 / 3.6)));
        assert_eq!(eval("$lanes - 1"), Ok(Value::Integer(2)));
        assert_eq!(eval("$speed * 2"), Ok(Value::Double(20.0)));
        assert_eq!(
            eval("$missing + 1"),
            Err(ExpressionError::Scope(ScopeError::UndefinedParameter(
                "missing".to_string()
            )))
        );
    }

    #[test]
    fn logic() {
        assert_eq!(eval("$speed > 5 and $lanes == 3"), Ok(Value::Boolean(true)));
        assert_eq!(eval("not $enabled or 1 >= 2"), Ok(Value::Boolean(false)));
        assert_eq!(eval("true != false"), Ok(Value::Boolean(true)));
        assert!(matches!(
            eval("$enabled + 1"),
            Err(ExpressionError::Operand(_, _))
        ));
    }

    #[test]
    fn functions() {
        assert_eq!(eval("round(2.5)"), Ok(Value::Integer(3)));
        assert_eq!(eval("floor(-0.5)"), Ok(Value::Integer(-1)));
        assert_eq!(eval("max($lanes, 5)"), Ok(Value::Integer(5)));
        assert_eq!(eval("min($speed, 5)"), Ok(Value::Double(5.0)));
        assert_eq!(eval("pow(2, 10)"), Ok(Value::Double(1024.0)));
        assert_eq!(eval("sqrt(16)"), Ok(Value::Double(4.0)));
        assert_eq!(eval("abs(-4)"), Ok(Value::Integer(4)));
        assert!(matches!(eval("pow(2)"), Err(ExpressionError::Arity(..))));
        assert!(matches!(eval("log(2)"), Err(ExpressionError::Syntax(_))));
    }

    #[test]
    fn errors() {
        assert_eq!(eval("1 % 0"), Err(ExpressionError::DivisionByZero));
        assert_eq!(eval("1 / 0"), Ok(Value::Double(f64::INFINITY)));
        assert!(matches!(eval("1 +"), Err(ExpressionError::Syntax(_))));
        assert!(matches!(eval("1 # 2"), Err(ExpressionError::Lexer(_))));
        assert!(matches!(
            eval("9223372036854775807 + 1"),
            Err(ExpressionError::Overflow)
        ));
    }
}
