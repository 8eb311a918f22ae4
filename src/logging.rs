use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::shared::config::LoggingConfig;

/// Installs the global subscriber: a console layer on stderr plus a daily
/// rolling file under `log_dir`, each with its own level.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let console_filter = cfg.console_level.parse::<LevelFilter>()?;
    let file_filter = cfg.file_level.parse::<LevelFilter>()?;

    // stdout carries row output.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_writer(tracing_appender::rolling::daily(&cfg.log_dir, "pq_reader.log"))
        .with_ansi(false)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        target: "pq_reader::open",
        log_dir = %cfg.log_dir,
        console = %console_filter,
        file = %file_filter,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter =
            EnvFilter::from_default_env().add_directive("pq_reader=debug".parse().unwrap());
        // A subscriber may already be installed by another harness.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
