//! The condition language: lexing, parsing, evaluation and paraphrase.
//!
//! Grammar:
//!
//! ```text
//! expr         := term (("&&" | "||") term)*
//! term         := change_detect | comparison
//! change_detect:= ("*" | ">" | "<") field
//! comparison   := field op number unit?
//! op           := ">" | "<" | ">=" | "<=" | "==" | "!="
//! ```
//!
//! There is no grouping; connectives chain left to right with equal
//! precedence.

mod ast;
mod eval;
mod lexer;
mod paraphrase;
mod parser;

pub use ast::{CompareOp, Comparison, Direction, Expr};
pub use eval::evaluate;
pub use paraphrase::paraphrase;
pub use parser::parse;

use serde::Serialize;
use std::fmt;
use wxalarm_common::fields::{available_fields, FieldInfo};

/// A non-fatal issue with a condition that still parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lint {
    /// `&&` and `||` appear together and are applied strictly left to right.
    MixedConnectives,
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lint::MixedConnectives => write!(
                f,
                "condition mixes '&&' and '||'; they are applied left to right with no precedence"
            ),
        }
    }
}

/// Lints for a parsed condition.
pub fn lint(expr: &Expr) -> Vec<Lint> {
    let (mut and, mut or) = (false, false);
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node {
            Expr::And(l, r) => {
                and = true;
                stack.push(l.as_ref());
                stack.push(r.as_ref());
            }
            Expr::Or(l, r) => {
                or = true;
                stack.push(l.as_ref());
                stack.push(r.as_ref());
            }
            Expr::Comparison(_) | Expr::ChangeDetect { .. } => {}
        }
    }
    if and && or {
        vec![Lint::MixedConnectives]
    } else {
        Vec::new()
    }
}

/// Result of validating a condition for the editor preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paraphrase: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Parse `src` and report validity, paraphrase and warnings.
///
/// # Examples
///
/// ```
/// use wxalarm_alert::condition::check_condition;
///
/// let check = check_condition("rain_rate > 0 || *lightning_count");
/// assert!(check.valid);
/// assert_eq!(
///     check.paraphrase.as_deref(),
///     Some("rain_rate exceeds 0 or lightning_count changes (any direction)")
/// );
///
/// let check = check_condition("rain_rate >");
/// assert!(!check.valid);
/// assert!(check.error.is_some());
/// ```
pub fn check_condition(src: &str) -> ConditionCheck {
    match parse(src) {
        Ok(expr) => ConditionCheck {
            valid: true,
            error: None,
            paraphrase: Some(paraphrase(&expr)),
            warnings: lint(&expr).iter().map(ToString::to_string).collect(),
        },
        Err(e) => ConditionCheck {
            valid: false,
            error: Some(e.to_string()),
            paraphrase: None,
            warnings: Vec::new(),
        },
    }
}

/// Fields a condition may reference, for the editor's field picker.
pub fn fields() -> Vec<FieldInfo> {
    available_fields()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_flags_mixed_connectives_only() {
        assert!(lint(&parse("humidity > 1 && uv > 2 && lux > 3").unwrap()).is_empty());
        assert_eq!(
            lint(&parse("humidity > 1 && uv > 2 || lux > 3").unwrap()),
            vec![Lint::MixedConnectives]
        );
    }

    #[test]
    fn check_condition_serializes_for_editor() {
        let json = serde_json::to_value(check_condition("temp > 85F && uv > 3 || *lux")).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["warnings"].as_array().map(Vec::len), Some(1));
        assert!(json.get("error").is_none());

        let json = serde_json::to_value(check_condition("")).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["error"], "condition is empty");
        assert!(json.get("paraphrase").is_none());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let expr = parse("temp>85F&&  wind speed < 10mph||*lightning_count").unwrap();
        let canonical = expr.to_string();
        assert_eq!(
            canonical,
            "temperature > 85F && wind_speed < 10mph || *lightning_count"
        );
        assert_eq!(parse(&canonical).unwrap(), expr);
    }
}
