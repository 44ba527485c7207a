use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Send diagnostics to `error_log.txt` in the data directory, or to stderr when the
/// file cannot be opened. `RUST_LOG` overrides `filter`.
pub fn init_tracing(config: &AppConfig, filter: Option<&str>) -> Result<()> {
    let directive: Directive = filter.unwrap_or("info").parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact();

    let log_path = config.error_log_path();
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let _ = subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(err) => {
            let _ = subscriber.with_writer(std::io::stderr).try_init();
            tracing::warn!(path = %log_path.display(), error = %err, "cannot open log file, logging to stderr");
        }
    }
    Ok(())
}
