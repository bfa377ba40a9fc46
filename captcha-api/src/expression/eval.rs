use std::fmt;

use serde::Serialize;

use super::parser::{BinaryOp, Expr};
use crate::error::{CaptchaError, Result};

const DECIMAL_SCALE: i128 = 1_000_000;

/// Result of an evaluation, serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{value}"),
            Number::Decimal(value) => write!(f, "{value}"),
        }
    }
}

/// Reduced fraction with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rational {
    num: i128,
    den: i128,
}

/// Computed on magnitudes so `i128::MIN` operands cannot overflow.
fn gcd(a: i128, b: i128) -> Result<i128> {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    i128::try_from(a).map_err(|_| CaptchaError::ArithmeticOverflow)
}

fn overflow<T>(value: Option<T>) -> Result<T> {
    value.ok_or(CaptchaError::ArithmeticOverflow)
}

impl Rational {
    fn integer(num: i128) -> Self {
        Self { num, den: 1 }
    }

    fn new(num: i128, den: i128) -> Result<Self> {
        if den == 0 {
            return Err(CaptchaError::DivisionByZero);
        }
        if num == 0 {
            return Ok(Self::integer(0));
        }
        let divisor = gcd(num, den)?;
        let (mut num, mut den) = (num / divisor, den / divisor);
        if den < 0 {
            num = overflow(num.checked_neg())?;
            den = overflow(den.checked_neg())?;
        }
        Ok(Self { num, den })
    }

    fn neg(self) -> Result<Self> {
        Ok(Self {
            num: overflow(self.num.checked_neg())?,
            den: self.den,
        })
    }

    fn add(self, other: Self) -> Result<Self> {
        let lhs = overflow(self.num.checked_mul(other.den))?;
        let rhs = overflow(other.num.checked_mul(self.den))?;
        Self::new(
            overflow(lhs.checked_add(rhs))?,
            overflow(self.den.checked_mul(other.den))?,
        )
    }

    fn sub(self, other: Self) -> Result<Self> {
        self.add(other.neg()?)
    }

    fn mul(self, other: Self) -> Result<Self> {
        Self::new(
            overflow(self.num.checked_mul(other.num))?,
            overflow(self.den.checked_mul(other.den))?,
        )
    }

    fn div(self, other: Self) -> Result<Self> {
        if other.num == 0 {
            return Err(CaptchaError::DivisionByZero);
        }
        Self::new(
            overflow(self.num.checked_mul(other.den))?,
            overflow(self.den.checked_mul(other.num))?,
        )
    }

    /// Whole values become integers; anything else is rounded half away
    /// from zero to six decimal places.
    fn into_number(self) -> Result<Number> {
        if self.den == 1 {
            let value = i64::try_from(self.num).map_err(|_| CaptchaError::ArithmeticOverflow)?;
            return Ok(Number::Integer(value));
        }

        let scaled = overflow(self.num.checked_mul(DECIMAL_SCALE))?;
        let half = self.den / 2;
        let rounded = if scaled >= 0 {
            overflow(scaled.checked_add(half))? / self.den
        } else {
            overflow(scaled.checked_sub(half))? / self.den
        };
        Ok(Number::Decimal(rounded as f64 / DECIMAL_SCALE as f64))
    }
}

fn eval(expr: &Expr) -> Result<Rational> {
    match expr {
        Expr::Literal(value) => Ok(Rational::integer(*value)),
        Expr::Negate(operand) => eval(operand)?.neg(),
        Expr::Binary { op, lhs, rhs } => {
            let (lhs, rhs) = (eval(lhs)?, eval(rhs)?);
            match op {
                BinaryOp::Add => lhs.add(rhs),
                BinaryOp::Sub => lhs.sub(rhs),
                BinaryOp::Mul => lhs.mul(rhs),
                BinaryOp::Div => lhs.div(rhs),
            }
        }
    }
}

pub(super) fn evaluate_tree(expr: &Expr) -> Result<Number> {
    eval(expr)?.into_number()
}
