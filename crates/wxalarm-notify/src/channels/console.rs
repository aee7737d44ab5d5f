use crate::notification::Notification;
use crate::Transport;
use anyhow::Result;
use async_trait::async_trait;
use wxalarm_common::channel::ChannelKind;

/// Writes notifications to the process log.
///
/// Stands in for console, syslog, oslog and eventlog delivery; the log
/// subscriber decides where the line finally lands.
pub struct ConsoleTransport {
    kind: ChannelKind,
}

impl ConsoleTransport {
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            target: "wxalarm::alarm",
            id = %notification.id,
            alarm = %notification.alarm,
            channel = %self.kind,
            "{}",
            notification.body
        );
        Ok(())
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }
}
