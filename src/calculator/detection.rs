//! Heuristics that decide whether free text is a math question, and pull the
//! arithmetic out of it.

use lazy_static::lazy_static;
use regex::Regex;

/// Operators that make a run of digits look like arithmetic.
const OPERATORS: [char; 5] = ['+', '-', '*', '/', '^'];

lazy_static! {
    /// Text made up solely of math characters.
    static ref ONLY_MATH_CHARS: Regex = Regex::new(r"^[0-9+\-*/^().\s]*$").unwrap();

    /// `number operator number` anywhere in a sentence.
    static ref EMBEDDED_OPERATION: Regex = Regex::new(r"\d+\s*[+\-*/^]\s*\d+").unwrap();

    /// Maximal runs of characters that can appear in an expression.
    static ref EXPRESSION_RUN: Regex = Regex::new(r"[0-9.\s+\-*/^()]+").unwrap();
}

/// Check whether `text` is likely a math question.
///
/// True when the text is made only of math characters with at least one digit
/// and one operator, or when it embeds `number operator number` somewhere.
pub fn is_math_question(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let only_mathish = ONLY_MATH_CHARS.is_match(text);
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let has_operator = text.contains(OPERATORS);

    (only_mathish && has_digit && has_operator) || EMBEDDED_OPERATION.is_match(text)
}

/// Extract the longest math-looking run from `text`, with whitespace removed.
///
/// Ties go to the earliest run. Nothing is validated here; malformed
/// candidates are left for the evaluator to reject.
pub fn extract_expression(text: &str) -> Option<String> {
    let mut longest: Option<&str> = None;
    for run in EXPRESSION_RUN.find_iter(text).map(|m| m.as_str()) {
        let is_longer = longest.is_none_or(|best| run.chars().count() > best.chars().count());
        if is_longer {
            longest = Some(run);
        }
    }

    let cleaned: String = longest?.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}
