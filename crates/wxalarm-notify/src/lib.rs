//! Notification rendering and dispatch for fired alarms.
//!
//! A [`wxalarm_alert::Firing`] is rendered once per configured channel into a
//! [`notification::Notification`], validated, and handed to the
//! [`Transport`] registered for the channel kind. Sends run in the
//! background with a per-attempt timeout and bounded retries.

pub mod channels;
pub mod error;
pub mod manager;
pub mod notification;
pub mod template;
pub mod transport;
pub mod utils;


use anyhow::Result;
use async_trait::async_trait;
use notification::Notification;

/// Delivers a rendered notification to an external sink (log, SMTP relay,
/// SMS gateway, HTTP endpoint).
///
/// Implementations are registered per channel kind in a
/// [`transport::TransportRegistry`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one notification. Called again on retry with the same value.
    ///
    /// # Errors
    ///
    /// Returns an error if this attempt failed; the dispatcher decides
    /// whether to retry.
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// Transport name for logs (e.g. `"console"`).
    fn name(&self) -> &str;
}

pub use error::NotifyError;
pub use manager::{DispatchConfig, DispatchReport, NotificationManager};
pub use template::{render, AppInfo, RenderFormat, TemplateContext};
pub use transport::TransportRegistry;
