use crate::channels::ConsoleTransport;
use crate::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use wxalarm_common::channel::ChannelKind;

/// Transports available to the dispatcher, one per channel kind.
///
/// The default registry only covers the log-style kinds. Email, SMS and
/// webhook delivery belong to the embedding application, which registers
/// its own transports.
///
/// # Examples
///
/// ```
/// use wxalarm_common::channel::ChannelKind;
/// use wxalarm_notify::transport::TransportRegistry;
///
/// let registry = TransportRegistry::default();
/// assert!(registry.has(ChannelKind::Console));
/// assert!(registry.has(ChannelKind::Syslog));
/// assert!(!registry.has(ChannelKind::Webhook));
/// assert_eq!(
///     registry.kinds(),
///     [ChannelKind::Console, ChannelKind::Syslog, ChannelKind::Oslog, ChannelKind::Eventlog]
/// );
/// ```
#[derive(Clone)]
pub struct TransportRegistry {
    transports: HashMap<ChannelKind, Arc<dyn Transport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
        }
    }

    /// Register `transport` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: ChannelKind, transport: Arc<dyn Transport>) {
        self.transports.insert(kind, transport);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn Transport>> {
        self.transports.get(&kind).cloned()
    }

    pub fn has(&self, kind: ChannelKind) -> bool {
        self.transports.contains_key(&kind)
    }

    /// Registered kinds, in declaration order.
    pub fn kinds(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<_> = self.transports.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for kind in [
            ChannelKind::Console,
            ChannelKind::Syslog,
            ChannelKind::Oslog,
            ChannelKind::Eventlog,
        ] {
            registry.register(kind, Arc::new(ConsoleTransport::new(kind)));
        }
        registry
    }
}
