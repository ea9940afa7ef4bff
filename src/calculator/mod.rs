//! Arithmetic support: spotting math in free text and evaluating it safely.

pub mod detection;
pub mod evaluator;
pub mod number;

pub use detection::{extract_expression, is_math_question};
pub use evaluator::{EvaluationError, safe_eval};

/// Answer a math question end to end: extract, evaluate, format as `expr = result`.
pub fn answer(question: &str) -> Result<String, EvaluationError> {
    let expression = extract_expression(question).ok_or_else(|| {
        EvaluationError::InvalidInput("Could not extract a valid math expression.".to_string())
    })?;
    let result = safe_eval(&expression)?;
    Ok(format!("{} = {}", expression, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer() {
        assert_eq!(answer("what is 2 + 2 please").unwrap(), "2+2 = 4");
        assert_eq!(answer("10/4").unwrap(), "10/4 = 2.5");
        assert_eq!(answer("What is 128 * 46?").unwrap(), "128*46 = 5888");
        assert_eq!(answer("what is 2^64").unwrap(), "2^64 = 18446744073709551616");
    }

    #[test]
    fn test_answer_errors() {
        assert_eq!(answer("5/0"), Err(EvaluationError::DivisionByZero));
        assert_eq!(
            answer("nothing here").unwrap_err().to_string(),
            "Could not extract a valid math expression."
        );
    }
}
