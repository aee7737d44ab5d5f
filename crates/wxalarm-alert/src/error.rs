use crate::units::accepted_suffixes;
use wxalarm_common::channel::ChannelValidationError;
use wxalarm_common::fields::UnitFamily;

/// A condition that could not be parsed.
///
/// Every variant carries the offending substring so the editor can point at
/// it. Parsing never yields a partial tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("condition is empty")]
    Empty,

    #[error("condition cannot start with '{0}'")]
    LeadingConnective(String),

    #[error("condition cannot end with '{0}'")]
    TrailingConnective(String),

    #[error("empty operand in '{0}'")]
    EmptyOperand(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("'{0}' needs a comparison (e.g. '{0} > 10') or a change-detection prefix (*, >, <)")]
    MissingComparison(String),

    #[error("'{0}' is missing a value to compare against")]
    MissingValue(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("expected {expected} but found '{found}'")]
    Unexpected {
        expected: &'static str,
        found: String,
    },

    #[error("unexpected character '{0}' at offset {1}")]
    InvalidCharacter(char, usize),
}

/// A literal whose unit suffix does not belong to the field's unit family.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unit '{suffix}' in '{literal}' is not valid for {field} (expected {})", expected_units(.family))]
pub struct UnitError {
    pub literal: String,
    pub suffix: String,
    pub field: String,
    pub family: UnitFamily,
}

/// An expression that could not be resolved against an observation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("{field} reading is not a finite number ({value})")]
    NonFiniteValue { field: String, value: f64 },
}

/// A manual evaluation that could not run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("no alarm named '{0}'")]
    UnknownAlarm(String),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// An alarm configuration that cannot be loaded or activated.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read alarm config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("alarm config is not valid JSON: {source}{}", hint_suffix(.hint))]
    Json {
        #[source]
        source: serde_json::Error,
        hint: Option<String>,
    },

    #[error("alarm at index {0}: name is required")]
    MissingName(usize),

    #[error("duplicate alarm name: {0}")]
    DuplicateName(String),

    #[error("alarm {0}: condition is required")]
    MissingCondition(String),

    #[error("alarm {alarm}: invalid condition: {source}")]
    Condition {
        alarm: String,
        #[source]
        source: ParseError,
    },

    #[error("alarm {0}: at least one channel is required")]
    NoChannels(String),

    #[error("alarm {alarm}, channel {index}: {source}")]
    Channel {
        alarm: String,
        index: usize,
        #[source]
        source: ChannelValidationError,
    },

    #[error("alarm {alarm}: invalid schedule: {reason}")]
    Schedule { alarm: String, reason: String },
}

fn expected_units(family: &UnitFamily) -> &'static str {
    accepted_suffixes(*family)
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_deref()
        .map(|h| format!("\nHint: {h}"))
        .unwrap_or_default()
}
