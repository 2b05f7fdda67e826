use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize stdout logging.
///
/// `filter` overrides the `RUST_LOG` environment variable; with neither set,
/// the crate logs at info.
pub fn init(filter: Option<&str>) -> Result<()> {
    let env_filter = match filter {
        Some(f) => EnvFilter::builder().parse(f)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parlor=info")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(env_filter))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
