use crate::error::NotifyError;
use crate::notification::Notification;
use crate::template::AppInfo;
use crate::transport::TransportRegistry;
use crate::utils::{body_excerpt, redact_headers};
use crate::Transport;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use wxalarm_alert::Firing;
use wxalarm_common::channel::{Channel, ChannelKind};

/// Per-send limits applied by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound on a single transport attempt.
    pub send_timeout: Duration,
    /// Attempts after the first; 0 sends exactly once.
    pub max_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(10),
            max_retries: 2,
        }
    }
}

/// A notification handed off to a background send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Queued {
    pub id: String,
    pub channel_index: usize,
    pub kind: ChannelKind,
}

/// What [`NotificationManager::notify`] did with each channel of a firing.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub queued: Vec<Queued>,
    pub rejected: Vec<NotifyError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Final outcome of one background send.
#[derive(Debug)]
pub struct Delivery {
    pub id: String,
    pub alarm: String,
    pub channel_index: usize,
    pub kind: ChannelKind,
    pub attempts: u32,
    pub result: Result<(), NotifyError>,
}

/// Renders firings per channel and hands them to transports without
/// blocking the caller.
///
/// A delivery failure is logged and reported through [`flush`](Self::flush);
/// it never feeds back into alarm state.
pub struct NotificationManager {
    registry: TransportRegistry,
    station: String,
    app: AppInfo,
    config: DispatchConfig,
    in_flight: Mutex<JoinSet<Delivery>>,
}

impl NotificationManager {
    pub fn new(registry: TransportRegistry, station: impl Into<String>, config: DispatchConfig) -> Self {
        Self {
            registry,
            station: station.into(),
            app: AppInfo::default(),
            config,
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_app_info(mut self, app: AppInfo) -> Self {
        self.app = app;
        self
    }

    /// Render every channel of `firing` and queue the valid ones.
    ///
    /// Returns as soon as sends are spawned. Channels that fail validation,
    /// or whose kind has no transport, are reported as rejected.
    pub async fn notify(&self, firing: &Firing) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut in_flight = self.in_flight.lock().await;
        reap(&mut in_flight);

        for (index, channel) in firing.alarm.channels.iter().enumerate() {
            let kind = channel.kind();
            let notification =
                match Notification::render(firing, index, channel, &self.station, &self.app) {
                    Ok(n) => n,
                    Err(source) => {
                        let err = NotifyError::Validation { index, kind, source };
                        tracing::warn!(alarm = %firing.alarm.name, channel = %kind, error = %err, "Channel rejected");
                        report.rejected.push(err);
                        continue;
                    }
                };
            let Some(transport) = self.registry.get(kind) else {
                let err = NotifyError::NoTransport { index, kind };
                tracing::warn!(alarm = %firing.alarm.name, channel = %kind, error = %err, "Channel rejected");
                report.rejected.push(err);
                continue;
            };

            report.queued.push(Queued {
                id: notification.id.clone(),
                channel_index: index,
                kind,
            });
            in_flight.spawn(deliver(transport, notification, self.config));
        }

        report
    }

    /// Number of sends that have not been collected yet.
    pub async fn pending(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Wait for every queued send and return their outcomes.
    pub async fn flush(&self) -> Vec<Delivery> {
        let mut tasks = std::mem::take(&mut *self.in_flight.lock().await);
        let mut deliveries = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(delivery) => deliveries.push(delivery),
                Err(e) => tracing::error!(error = %e, "Notification task aborted"),
            }
        }
        deliveries
    }
}

/// Drop finished sends so the set does not grow without bound.
fn reap(tasks: &mut JoinSet<Delivery>) {
    while let Some(joined) = tasks.try_join_next() {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Notification task aborted");
        }
    }
}

async fn deliver(
    transport: Arc<dyn Transport>,
    notification: Notification,
    config: DispatchConfig,
) -> Delivery {
    tracing::debug!(
        id = %notification.id,
        alarm = %notification.alarm,
        channel = %notification.kind,
        body = %body_excerpt(&notification.body),
        "Sending notification"
    );
    if let Channel::Webhook { webhook, .. } = &notification.channel {
        if let Ok(headers) = webhook.header_map() {
            tracing::debug!(
                id = %notification.id,
                url = %webhook.url,
                method = %webhook.method(),
                headers = ?redact_headers(&headers),
                "Webhook request"
            );
        }
    }

    let total = config.max_retries.saturating_add(1);
    let mut attempts = 0;
    let mut last_error = NotifyError::Transport("not attempted".to_string());

    for attempt in 0..total {
        attempts = attempt + 1;
        let error = match tokio::time::timeout(config.send_timeout, transport.send(&notification)).await {
            Ok(Ok(())) => {
                tracing::debug!(id = %notification.id, transport = transport.name(), attempts, "Notification sent");
                return finish(notification, attempts, Ok(()));
            }
            Ok(Err(e)) => NotifyError::Transport(format!("{e:#}")),
            Err(_) => NotifyError::Timeout(config.send_timeout),
        };

        if attempt + 1 < total {
            tracing::warn!(
                id = %notification.id,
                alarm = %notification.alarm,
                channel = %notification.kind,
                attempt = attempts,
                error = %error,
                "Notification send failed, retrying"
            );
            let backoff = 100u64.saturating_mul(2u64.saturating_pow(attempt));
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }
        last_error = error;
    }

    tracing::error!(
        id = %notification.id,
        alarm = %notification.alarm,
        channel = %notification.kind,
        attempts,
        error = %last_error,
        "Notification send failed"
    );
    finish(notification, attempts, Err(last_error))
}

fn finish(notification: Notification, attempts: u32, result: Result<(), NotifyError>) -> Delivery {
    Delivery {
        id: notification.id,
        alarm: notification.alarm,
        channel_index: notification.channel_index,
        kind: notification.kind,
        attempts,
        result,
    }
}
