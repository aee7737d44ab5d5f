use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` is honoured; `default_directive` (e.g. `wxalarm=info`) is
/// added on top so alarm logs show up without any environment setup.
pub fn init(default_directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(default_directive.parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
