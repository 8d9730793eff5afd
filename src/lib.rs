//! Interactive PCB trace router
//!
//! - `geometry` - integer-grid primitives
//! - `router` - node arena, walkaround, shove, optimizer and the line placer
//! - `server` - JSON-lines request server driving a routing session

pub mod geometry;
pub mod router;
pub mod server;

/// Initialize logging for the server binary
///
/// Output goes to stderr so stdout stays free for responses. The level is
/// taken from RUST_LOG, defaulting to info; `RUST_LOG=pns=trace` shows every
/// routing step.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
