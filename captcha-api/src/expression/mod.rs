//! Arithmetic evaluation for "calculate" captchas.
//!
//! The OCR output of a calculation captcha (for example `"12+7=?"`) is
//! untrusted text. It is sanitized down to digits, the four operators and
//! parentheses, parsed into a small [`Expr`] tree by a recursive-descent
//! parser and evaluated with checked exact-rational arithmetic. There is no
//! symbol lookup and no path to general code execution.

mod eval;
mod parser;
mod sanitize;

pub use eval::Number;
pub use parser::{BinaryOp, Expr};
pub use sanitize::sanitize;

use crate::error::{CaptchaError, Result};

/// Sanitize, parse and evaluate `text`.
///
/// Whole results come back as [`Number::Integer`], everything else as
/// [`Number::Decimal`] rounded to six decimal places.
pub fn evaluate(text: &str) -> Result<Number> {
    let expression = sanitize(text);
    if expression.is_empty() {
        return Err(CaptchaError::EmptyExpression);
    }

    let tree = parser::parse(&expression)?;
    eval::evaluate_tree(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4").unwrap(), Number::Integer(14));
        assert_eq!(evaluate("(2+3)*4").unwrap(), Number::Integer(20));
        assert_eq!(evaluate("10-4-3").unwrap(), Number::Integer(3));
        assert_eq!(evaluate("100/10/5").unwrap(), Number::Integer(2));
    }

    #[test]
    fn test_ocr_noise_is_sanitized() {
        assert_eq!(evaluate("10/2=?").unwrap(), Number::Integer(5));
        assert_eq!(evaluate(" 7 + 8 = ").unwrap(), Number::Integer(15));
        // 'x' is not an operator; the digits around it merge
        assert_eq!(evaluate("2+3x4").unwrap(), Number::Integer(36));
    }

    #[test]
    fn test_whole_division_is_integer() {
        assert_eq!(evaluate("6/3").unwrap(), Number::Integer(2));
        assert_eq!(evaluate("1/3*3").unwrap(), Number::Integer(1));
    }

    #[test]
    fn test_fractional_results() {
        assert_eq!(evaluate("7/2").unwrap(), Number::Decimal(3.5));
        assert_eq!(evaluate("1/3").unwrap(), Number::Decimal(0.333333));
        assert_eq!(evaluate("2/3").unwrap(), Number::Decimal(0.666667));
        assert_eq!(evaluate("-1/8").unwrap(), Number::Decimal(-0.125));
    }

    #[test]
    fn test_negation() {
        assert_eq!(evaluate("-(2+3)*2").unwrap(), Number::Integer(-10));
        assert_eq!(evaluate("--4").unwrap(), Number::Integer(4));
        assert_eq!(evaluate("3*-2").unwrap(), Number::Integer(-6));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(evaluate("abc"), Err(CaptchaError::EmptyExpression)));
        assert!(matches!(evaluate("=12+3"), Err(CaptchaError::EmptyExpression)));
        assert!(matches!(evaluate("5/0"), Err(CaptchaError::DivisionByZero)));
        assert!(matches!(evaluate("5/(2-2)"), Err(CaptchaError::DivisionByZero)));
        assert!(matches!(
            evaluate("2++3"),
            Err(CaptchaError::UnsupportedConstruct(_))
        ));
        assert!(matches!(
            evaluate("()"),
            Err(CaptchaError::UnsupportedConstruct(_))
        ));
        assert!(matches!(
            evaluate("(1+2"),
            Err(CaptchaError::UnsupportedConstruct(_))
        ));
        assert!(matches!(
            evaluate("99999999999*99999999999"),
            Err(CaptchaError::ArithmeticOverflow)
        ));
    }

    #[test]
    fn test_extreme_literals() {
        const MIN: &str = "(-170141183460469231731687303715884105727-1)";

        assert_eq!(evaluate(&format!("0/{MIN}")).unwrap(), Number::Integer(0));
        assert_eq!(evaluate(&format!("{MIN}*0")).unwrap(), Number::Integer(0));
        for text in [
            MIN.to_string(),
            format!("1/{MIN}"),
            format!("{MIN}/{MIN}"),
            format!("{MIN}-1"),
            format!("-{MIN}"),
            "170141183460469231731687303715884105728".to_string(),
        ] {
            assert!(
                matches!(evaluate(&text), Err(CaptchaError::ArithmeticOverflow)),
                "{text}"
            );
        }
    }

    #[test]
    fn test_result_serializes_as_plain_number() {
        assert_eq!(
            serde_json::to_value(evaluate("2+3").unwrap()).unwrap(),
            serde_json::json!(5)
        );
        assert_eq!(
            serde_json::to_value(evaluate("7/2").unwrap()).unwrap(),
            serde_json::json!(3.5)
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_arbitrary_arithmetic_never_panics(text in "[0-9+*/()-]{0,64}") {
            let _ = evaluate(&text);
        }

        #[test]
        fn prop_small_sums_are_exact(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            let text = format!("{a}+({b})");
            proptest::prop_assert_eq!(evaluate(&text).unwrap(), Number::Integer(a + b));
        }
    }
}
