//! Notification channel descriptors as persisted in the alarm config.
//!
//! A [`Channel`] is a tagged variant over the seven delivery kinds. The JSON
//! shape is owned by the external config store, so every optional field is
//! skipped on serialization and a channel round-trips unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_WEBHOOK_METHOD: &str = "POST";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
const ALLOWED_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Channel {
    Console {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Syslog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Oslog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Eventlog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default)]
        email: EmailConfig,
    },
    Sms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default)]
        sms: SmsConfig,
    },
    Webhook {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
        #[serde(default)]
        webhook: WebhookConfig,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub html: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Either a JSON object or a string holding one; both forms are
    /// accepted by the editor and preserved as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl WebhookConfig {
    /// The HTTP method, upper-cased, defaulting to `POST`.
    pub fn method(&self) -> String {
        match self.method.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_ascii_uppercase(),
            _ => DEFAULT_WEBHOOK_METHOD.to_string(),
        }
    }

    pub fn content_type(&self) -> &str {
        match self.content_type.as_deref().map(str::trim) {
            Some(ct) if !ct.is_empty() => ct,
            _ => DEFAULT_CONTENT_TYPE,
        }
    }

    /// True when the rendered body must remain valid JSON.
    pub fn is_json(&self) -> bool {
        self.content_type().to_ascii_lowercase().contains("json")
    }

    /// Headers as a flat string map.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelValidationError::InvalidHeaders`] when the value is not
    /// an object (or a string that parses to one), or when any header value
    /// is not a string.
    pub fn header_map(&self) -> Result<BTreeMap<String, String>, ChannelValidationError> {
        let parsed;
        let object = match &self.headers {
            None => return Ok(BTreeMap::new()),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(BTreeMap::new()),
            Some(Value::String(s)) => {
                parsed = serde_json::from_str::<Value>(s)
                    .map_err(|e| ChannelValidationError::InvalidHeaders(e.to_string()))?;
                &parsed
            }
            Some(v) => v,
        };
        let Value::Object(map) = object else {
            return Err(ChannelValidationError::InvalidHeaders(
                "headers must be a JSON object".to_string(),
            ));
        };
        map.iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Err(ChannelValidationError::InvalidHeaders(format!(
                    "header '{k}' must be a string, got {other}"
                ))),
            })
            .collect()
    }
}

/// Discriminant of a [`Channel`], used for transport lookup and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Console,
    Syslog,
    Oslog,
    Eventlog,
    Email,
    Sms,
    Webhook,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Console => "console",
            ChannelKind::Syslog => "syslog",
            ChannelKind::Oslog => "oslog",
            ChannelKind::Eventlog => "eventlog",
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
            ChannelKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(ChannelKind::Console),
            "syslog" => Ok(ChannelKind::Syslog),
            "oslog" => Ok(ChannelKind::Oslog),
            "eventlog" => Ok(ChannelKind::Eventlog),
            "email" => Ok(ChannelKind::Email),
            "sms" => Ok(ChannelKind::Sms),
            "webhook" => Ok(ChannelKind::Webhook),
            _ => Err(format!("unknown channel type: {s}")),
        }
    }
}

/// A channel that failed validation, naming the kind and the offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelValidationError {
    #[error("{0} channel requires at least one recipient")]
    MissingRecipients(ChannelKind),

    #[error("{kind} channel requires a non-empty '{field}'")]
    MissingField {
        kind: ChannelKind,
        field: &'static str,
    },

    #[error("webhook url '{url}' is invalid: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("webhook method '{0}' is not allowed (must be POST, PUT, or PATCH)")]
    InvalidMethod(String),

    #[error("webhook headers are invalid: {0}")]
    InvalidHeaders(String),

    #[error("{0} channel rendered an empty body")]
    EmptyBody(ChannelKind),

    #[error("webhook body is not valid {content_type} after substitution: {reason}")]
    InvalidStructuredBody {
        content_type: String,
        reason: String,
    },
}

impl Channel {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Console { .. } => ChannelKind::Console,
            Channel::Syslog { .. } => ChannelKind::Syslog,
            Channel::Oslog { .. } => ChannelKind::Oslog,
            Channel::Eventlog { .. } => ChannelKind::Eventlog,
            Channel::Email { .. } => ChannelKind::Email,
            Channel::Sms { .. } => ChannelKind::Sms,
            Channel::Webhook { .. } => ChannelKind::Webhook,
        }
    }

    /// The channel's own template override, if set and non-blank.
    pub fn template(&self) -> Option<&str> {
        let template = match self {
            Channel::Console { template }
            | Channel::Syslog { template }
            | Channel::Oslog { template }
            | Channel::Eventlog { template }
            | Channel::Email { template, .. }
            | Channel::Sms { template, .. }
            | Channel::Webhook { template, .. } => template,
        };
        template.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// The type-specific body template (email body, SMS message, webhook
    /// body), if the kind has one and it is set.
    pub fn body_template(&self) -> Option<&str> {
        let body = match self {
            Channel::Email { email, .. } => email.body.as_str(),
            Channel::Sms { sms, .. } => sms.message.as_str(),
            Channel::Webhook { webhook, .. } => webhook.body.as_str(),
            _ => return None,
        };
        Some(body).filter(|b| !b.trim().is_empty())
    }

    /// Structural validation, run when an alarm is saved and again before
    /// dispatch.
    ///
    /// The type-specific body may be left empty when the channel carries its
    /// own template; an empty rendered body is caught after expansion.
    ///
    /// # Examples
    ///
    /// ```
    /// use wxalarm_common::channel::Channel;
    ///
    /// let bad: Channel = serde_json::from_str(
    ///     r#"{"type":"webhook","webhook":{"url":"https://example.com/hook","headers":"not json"}}"#,
    /// ).unwrap();
    /// assert!(bad.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ChannelValidationError> {
        let has_template = self.template().is_some();
        match self {
            Channel::Console { .. }
            | Channel::Syslog { .. }
            | Channel::Oslog { .. }
            | Channel::Eventlog { .. } => Ok(()),
            Channel::Email { email, .. } => {
                if email.to.iter().all(|r| r.trim().is_empty()) {
                    return Err(ChannelValidationError::MissingRecipients(ChannelKind::Email));
                }
                if email.subject.trim().is_empty() {
                    return Err(ChannelValidationError::MissingField {
                        kind: ChannelKind::Email,
                        field: "subject",
                    });
                }
                if email.body.trim().is_empty() && !has_template {
                    return Err(ChannelValidationError::MissingField {
                        kind: ChannelKind::Email,
                        field: "body",
                    });
                }
                Ok(())
            }
            Channel::Sms { sms, .. } => {
                if sms.to.iter().all(|r| r.trim().is_empty()) {
                    return Err(ChannelValidationError::MissingRecipients(ChannelKind::Sms));
                }
                if sms.message.trim().is_empty() && !has_template {
                    return Err(ChannelValidationError::MissingField {
                        kind: ChannelKind::Sms,
                        field: "message",
                    });
                }
                Ok(())
            }
            Channel::Webhook { webhook, .. } => {
                validate_url(&webhook.url)?;
                let method = webhook.method();
                if !ALLOWED_METHODS.contains(&method.as_str()) {
                    return Err(ChannelValidationError::InvalidMethod(method));
                }
                webhook.header_map()?;
                if webhook.body.trim().is_empty() && !has_template {
                    return Err(ChannelValidationError::MissingField {
                        kind: ChannelKind::Webhook,
                        field: "body",
                    });
                }
                Ok(())
            }
        }
    }
}

fn validate_url(raw: &str) -> Result<(), ChannelValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ChannelValidationError::MissingField {
            kind: ChannelKind::Webhook,
            field: "url",
        });
    }
    let parsed = url::Url::parse(raw).map_err(|e| ChannelValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        "http" | "https" => Err(ChannelValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        }),
        scheme => Err(ChannelValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}
