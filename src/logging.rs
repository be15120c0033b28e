use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the fmt subscriber. Quiet unless `verbose` is set or the process
/// runs as a server, which always logs requests at info.
pub fn init(verbose: bool, server: bool) -> Result<()> {
    if !verbose && !server {
        return Ok(());
    }
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
