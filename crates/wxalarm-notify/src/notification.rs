//! A firing rendered for one channel, ready for a transport.

use crate::template::{render, AppInfo, RenderFormat, TemplateContext, DEFAULT_MESSAGE_TEMPLATE};
use chrono::{DateTime, Utc};
use serde::Serialize;
use wxalarm_alert::Firing;
use wxalarm_common::channel::{Channel, ChannelKind, ChannelValidationError};
use wxalarm_common::id;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Snowflake id, stable across retries of the same send.
    pub id: String,
    pub alarm: String,
    /// Position of the channel in the alarm's channel list.
    pub channel_index: usize,
    pub kind: ChannelKind,
    /// The channel descriptor, including recipients and webhook target.
    pub channel: Channel,
    /// Rendered email subject; `None` for other kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    pub format: RenderFormat,
    pub fired_at: DateTime<Utc>,
}

impl Notification {
    /// Render `channel` for `firing` and validate the result.
    ///
    /// The body template is picked from the type-specific body, then the
    /// channel template, then the alarm template, then a built-in default.
    /// Email, SMS and webhook channels always carry one of the first two.
    /// Rendering never fails, but the rendered body must be non-empty and a
    /// JSON webhook body must still parse after substitution.
    pub fn render(
        firing: &Firing,
        channel_index: usize,
        channel: &Channel,
        station: &str,
        app: &AppInfo,
    ) -> Result<Notification, ChannelValidationError> {
        channel.validate()?;

        let ctx = TemplateContext {
            alarm: &firing.alarm,
            observation: &firing.observation,
            previous: firing.previous.as_ref(),
            station,
            triggered_count: firing.triggered_count,
            app,
            now: firing.fired_at,
        };

        let kind = channel.kind();
        let template = channel
            .body_template()
            .or_else(|| channel.template())
            .or_else(|| firing.alarm.template.as_deref().filter(|t| !t.trim().is_empty()))
            .unwrap_or(DEFAULT_MESSAGE_TEMPLATE);

        let format = match channel {
            Channel::Webhook { webhook, .. } if webhook.is_json() => RenderFormat::Json,
            Channel::Email { email, .. } if email.html => RenderFormat::Html,
            Channel::Email { .. } => RenderFormat::detect(template),
            _ => RenderFormat::Text,
        };

        let body = render(template, &ctx, format);
        if body.trim().is_empty() {
            return Err(ChannelValidationError::EmptyBody(kind));
        }
        if let Channel::Webhook { webhook, .. } = channel {
            if webhook.is_json() {
                serde_json::from_str::<serde_json::Value>(&body).map_err(|e| {
                    ChannelValidationError::InvalidStructuredBody {
                        content_type: webhook.content_type().to_string(),
                        reason: e.to_string(),
                    }
                })?;
            }
        }

        let subject = match channel {
            Channel::Email { email, .. } => Some(render(&email.subject, &ctx, RenderFormat::Text)),
            _ => None,
        };

        Ok(Notification {
            id: id::next_id(),
            alarm: firing.alarm.name.clone(),
            channel_index,
            kind,
            channel: channel.clone(),
            subject,
            body,
            format,
            fired_at: firing.fired_at,
        })
    }
}
