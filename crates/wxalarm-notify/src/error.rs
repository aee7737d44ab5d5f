use std::time::Duration;
use wxalarm_common::channel::{ChannelKind, ChannelValidationError};

/// Errors raised while rendering or dispatching a notification.
///
/// Transports themselves return `anyhow::Result`; their failures are folded
/// into [`NotifyError::Transport`] once retries are exhausted.
///
/// # Examples
///
/// ```rust
/// use wxalarm_common::channel::ChannelKind;
/// use wxalarm_notify::error::NotifyError;
///
/// let err = NotifyError::NoTransport { index: 1, kind: ChannelKind::Email };
/// assert!(err.to_string().contains("channel 1"));
/// assert!(err.to_string().contains("email"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Reserved. Unknown template variables are passed through, so rendering
    /// itself does not currently fail.
    #[error("Notify: template rendering error: {0}")]
    Template(String),

    /// A channel failed structural or render-time validation.
    #[error("Notify: channel {index} ({kind}) is invalid: {source}")]
    Validation {
        index: usize,
        kind: ChannelKind,
        #[source]
        source: ChannelValidationError,
    },

    /// No transport is registered for the channel kind.
    #[error("Notify: channel {index}: no transport registered for '{kind}' channels")]
    NoTransport { index: usize, kind: ChannelKind },

    /// A single send attempt did not complete in time.
    #[error("Notify: send timed out after {0:?}")]
    Timeout(Duration),

    /// The transport reported a failure on its final attempt.
    #[error("Notify: transport error: {0}")]
    Transport(String),
}
