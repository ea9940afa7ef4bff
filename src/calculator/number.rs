use std::fmt;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

/// Numeric value produced by the calculator.
///
/// Integers are arbitrary precision; a float operand anywhere makes the
/// result an `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(BigInt),
    Float(f64),
}

impl Number {
    /// The value as a float, or `None` for an integer too large for `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Number::Int(n) => n.to_f64().filter(|f| f.is_finite()),
            Number::Float(f) => Some(*f),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => n.is_zero(),
            Number::Float(f) => *f == 0.0,
        }
    }

    /// Collapse a float with no fractional part into the exact integer it holds.
    pub fn normalized(&self) -> Number {
        match self {
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                BigInt::from_f64(*f).map_or(Number::Float(*f), Number::Int)
            }
            other => other.clone(),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(BigInt::from(value))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.normalized() {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}
