use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rustpython_parser::ast::{self, Constant, Expr, Operator, UnaryOp};
use rustpython_parser::{Parse, ParseError};
use thiserror::Error;

use crate::calculator::number::Number;

/// Longest expression handed to the parser.
pub const MAX_EXPRESSION_LEN: usize = 500;

/// Deepest bracket nesting handed to the parser.
pub const MAX_NESTING: usize = 100;

/// Integer powers whose result would need more bits than this are refused.
const MAX_POWER_BITS: u64 = 100_000;

/// Failure raised by [`safe_eval`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// Empty input, or text that does not parse as an expression.
    #[error("{0}")]
    InvalidInput(String),

    /// The expression parsed, but contains a node outside the arithmetic whitelist.
    #[error("Unsupported operation or structure: {0}.")]
    Unsupported(&'static str),

    #[error("Division by zero.")]
    DivisionByZero,
}

impl EvaluationError {
    fn invalid(reason: &str) -> Self {
        EvaluationError::InvalidInput(format!("Invalid expression: {}", reason))
    }
}

impl From<ParseError> for EvaluationError {
    fn from(err: ParseError) -> Self {
        EvaluationError::invalid(&err.to_string())
    }
}

type BinaryFn = fn(Number, Number) -> Result<Number, EvaluationError>;
type UnaryFn = fn(Number) -> Result<Number, EvaluationError>;

/// The only binary operators the evaluator will apply.
const BINARY_OPERATORS: &[(Operator, BinaryFn)] = &[
    (Operator::Add, add),
    (Operator::Sub, sub),
    (Operator::Mult, mul),
    (Operator::Div, div),
    (Operator::Pow, pow),
];

/// The only unary operators the evaluator will apply.
const UNARY_OPERATORS: &[(UnaryOp, UnaryFn)] = &[(UnaryOp::USub, neg), (UnaryOp::UAdd, pos)];

fn binary_operator(op: &Operator) -> Option<BinaryFn> {
    BINARY_OPERATORS
        .iter()
        .find(|(candidate, _)| candidate == op)
        .map(|(_, apply)| *apply)
}

fn unary_operator(op: &UnaryOp) -> Option<UnaryFn> {
    UNARY_OPERATORS
        .iter()
        .find(|(candidate, _)| candidate == op)
        .map(|(_, apply)| *apply)
}

/// Evaluate an arithmetic expression supporting `+ - * / ^` and parentheses.
///
/// `^` is read as exponentiation. The text is parsed as a Python expression,
/// and the resulting tree is then walked by [`eval_node`], which only knows how
/// to run number literals and the operators listed in [`BINARY_OPERATORS`] and
/// [`UNARY_OPERATORS`]. Any other node fails before anything beneath it is
/// evaluated.
pub fn safe_eval(expression: &str) -> Result<Number, EvaluationError> {
    let source = expression.trim().replace('^', "**");
    if source.is_empty() {
        return Err(EvaluationError::InvalidInput(
            "Empty or invalid expression.".to_string(),
        ));
    }
    check_size(&source)?;

    let tree = Expr::parse(&source, "<expression>")?;
    let value = eval_node(&tree)?;
    debug!("Evaluated '{}' to {:?}", expression, value);
    Ok(value)
}

/// Bound the tree depth before parsing; the walker recurses once per level.
fn check_size(source: &str) -> Result<(), EvaluationError> {
    if source.chars().count() > MAX_EXPRESSION_LEN {
        return Err(EvaluationError::invalid("expression is too long"));
    }

    let mut depth = 0usize;
    for c in source.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(EvaluationError::invalid("too many nested parentheses"));
                }
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn eval_node(node: &Expr) -> Result<Number, EvaluationError> {
    match node {
        Expr::Constant(ast::ExprConstant { value, .. }) => literal(value),
        Expr::BinOp(ast::ExprBinOp {
            left, op, right, ..
        }) => {
            let apply =
                binary_operator(op).ok_or(EvaluationError::Unsupported(describe_operator(op)))?;
            apply(eval_node(left)?, eval_node(right)?)
        }
        Expr::UnaryOp(ast::ExprUnaryOp { op, operand, .. }) => {
            let apply =
                unary_operator(op).ok_or(EvaluationError::Unsupported(describe_unary(op)))?;
            apply(eval_node(operand)?)
        }
        other => Err(EvaluationError::Unsupported(describe_node(other))),
    }
}

fn literal(value: &Constant) -> Result<Number, EvaluationError> {
    match value {
        // The parser has its own bigint type; convert through the decimal form.
        Constant::Int(n) => n
            .to_string()
            .parse::<BigInt>()
            .map(Number::Int)
            .map_err(|e| EvaluationError::invalid(&e.to_string())),
        Constant::Float(f) => Ok(Number::Float(*f)),
        Constant::Str(_) => Err(EvaluationError::Unsupported("string literal")),
        Constant::Bytes(_) => Err(EvaluationError::Unsupported("bytes literal")),
        Constant::Bool(_) => Err(EvaluationError::Unsupported("boolean literal")),
        Constant::Complex { .. } => Err(EvaluationError::Unsupported("complex number")),
        _ => Err(EvaluationError::Unsupported("constant")),
    }
}

fn describe_node(node: &Expr) -> &'static str {
    match node {
        Expr::Call(_) => "function call",
        Expr::Name(_) => "name reference",
        Expr::Attribute(_) => "attribute access",
        Expr::Subscript(_) => "subscript",
        Expr::Tuple(_) => "tuple literal",
        Expr::List(_) => "list literal",
        Expr::Set(_) => "set literal",
        Expr::Dict(_) => "dict literal",
        Expr::Compare(_) => "comparison",
        Expr::BoolOp(_) => "boolean logic",
        Expr::NamedExpr(_) => "assignment expression",
        Expr::Lambda(_) => "lambda",
        Expr::IfExp(_) => "conditional expression",
        Expr::ListComp(_) | Expr::SetComp(_) | Expr::DictComp(_) | Expr::GeneratorExp(_) => {
            "comprehension"
        }
        Expr::JoinedStr(_) | Expr::FormattedValue(_) => "f-string",
        _ => "expression",
    }
}

fn describe_operator(op: &Operator) -> &'static str {
    match op {
        Operator::Mod => "modulo",
        Operator::FloorDiv => "floor division",
        Operator::MatMult => "matrix multiplication",
        Operator::LShift | Operator::RShift => "bit shift",
        Operator::BitAnd | Operator::BitOr | Operator::BitXor => "bitwise operation",
        _ => "binary operator",
    }
}

fn describe_unary(op: &UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "boolean not",
        UnaryOp::Invert => "bitwise inversion",
        _ => "unary operator",
    }
}

fn to_float(value: &Number) -> Result<f64, EvaluationError> {
    value
        .as_f64()
        .ok_or_else(|| EvaluationError::invalid("int too large to convert to float"))
}

fn out_of_range() -> EvaluationError {
    EvaluationError::invalid("numerical result out of range")
}

fn add(a: Number, b: Number) -> Result<Number, EvaluationError> {
    Ok(match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(x + y),
        (a, b) => Number::Float(to_float(&a)? + to_float(&b)?),
    })
}

fn sub(a: Number, b: Number) -> Result<Number, EvaluationError> {
    Ok(match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(x - y),
        (a, b) => Number::Float(to_float(&a)? - to_float(&b)?),
    })
}

fn mul(a: Number, b: Number) -> Result<Number, EvaluationError> {
    Ok(match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(x * y),
        (a, b) => Number::Float(to_float(&a)? * to_float(&b)?),
    })
}

/// True division: the quotient is always a float.
fn div(a: Number, b: Number) -> Result<Number, EvaluationError> {
    if b.is_zero() {
        return Err(EvaluationError::DivisionByZero);
    }
    if let (Number::Int(x), Number::Int(y)) = (&a, &b) {
        if (x % y).is_zero() {
            return to_float(&Number::Int(x / y)).map(Number::Float);
        }
    }
    Ok(Number::Float(to_float(&a)? / to_float(&b)?))
}

fn pow(base: Number, exponent: Number) -> Result<Number, EvaluationError> {
    if let (Number::Int(b), Number::Int(e)) = (&base, &exponent) {
        if !e.is_negative() {
            return int_pow(b, e).map(Number::Int);
        }
    }

    let (b, e) = (to_float(&base)?, to_float(&exponent)?);
    if b == 0.0 && e < 0.0 {
        return Err(EvaluationError::DivisionByZero);
    }
    if b < 0.0 && e.fract() != 0.0 {
        return Err(EvaluationError::invalid("result is not a real number"));
    }
    let value = b.powf(e);
    if value.is_infinite() && b.is_finite() && e.is_finite() {
        return Err(out_of_range());
    }
    Ok(Number::Float(value))
}

fn int_pow(base: &BigInt, exponent: &BigInt) -> Result<BigInt, EvaluationError> {
    if exponent.is_zero() || base.is_one() {
        return Ok(BigInt::one());
    }
    if base.is_zero() {
        return Ok(BigInt::zero());
    }
    if *base == -BigInt::one() {
        let odd = !(exponent % &BigInt::from(2)).is_zero();
        return Ok(if odd { -BigInt::one() } else { BigInt::one() });
    }

    let exponent = exponent
        .to_u32()
        .filter(|e| base.bits().saturating_mul(u64::from(*e)) <= MAX_POWER_BITS)
        .ok_or_else(out_of_range)?;
    Ok(base.pow(exponent))
}

fn neg(a: Number) -> Result<Number, EvaluationError> {
    Ok(match a {
        Number::Int(x) => Number::Int(-x),
        Number::Float(x) => Number::Float(-x),
    })
}

fn pos(a: Number) -> Result<Number, EvaluationError> {
    Ok(a)
}
