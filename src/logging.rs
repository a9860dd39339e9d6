use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `level` (from config or flags) is
/// used, and an unparseable level falls back to `info` with a warning.
pub fn init(level: &str) -> anyhow::Result<()> {
    let (filter, rejected) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match EnvFilter::try_new(level) {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new("info"), Some(level)),
        },
    };

    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    if let Some(level) = rejected {
        tracing::warn!(%level, "unrecognized log level; using info");
    }
    Ok(())
}
