use super::ast::{Direction, Expr};
use crate::error::EvaluationError;
use crate::state::AlarmState;
use wxalarm_common::fields::Field;
use wxalarm_common::types::Observation;

/// Evaluate `expr` against the current observation.
///
/// Change-detection nodes compare against `state.previous_observation` and
/// are `false` while no baseline exists. The state is only read here; the
/// caller applies transitions afterwards. Connectives short-circuit left to
/// right.
///
/// # Errors
///
/// Returns [`EvaluationError::NonFiniteValue`] when a referenced reading is
/// NaN or infinite.
pub fn evaluate(
    expr: &Expr,
    obs: &Observation,
    state: &AlarmState,
) -> Result<bool, EvaluationError> {
    match expr {
        Expr::Comparison(c) => {
            let value = reading(c.field, obs)?;
            Ok(c.op.check(value, c.canonical))
        }
        Expr::ChangeDetect { field, direction } => {
            let Some(previous) = state.previous_observation.as_ref() else {
                tracing::debug!(field = %field, "No baseline yet for change detection");
                return Ok(false);
            };
            let current = reading(*field, obs)?;
            let previous = reading(*field, previous)?;
            Ok(match direction {
                Direction::Any => current != previous,
                Direction::Increase => current > previous,
                Direction::Decrease => current < previous,
            })
        }
        Expr::And(l, r) => Ok(evaluate(l, obs, state)? && evaluate(r, obs, state)?),
        Expr::Or(l, r) => Ok(evaluate(l, obs, state)? || evaluate(r, obs, state)?),
    }
}

fn reading(field: Field, obs: &Observation) -> Result<f64, EvaluationError> {
    let value = field.value(obs);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::NonFiniteValue {
            field: field.name().to_string(),
            value,
        })
    }
}
