use color_eyre::eyre::{eyre, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sends tracing output to `path`. The terminal belongs to the UI, so nothing
/// is written to stdout or stderr.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mood_diary=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| eyre!("failed to initialize logging: {}", e))?;

    Ok(())
}
