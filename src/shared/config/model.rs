use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub reader: ReaderSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ReaderSettings {
    pub worker_count: usize,
    /// Check the CRC of every page that carries one.
    pub verify_page_crc: bool,
    /// Largest footer accepted from the trailer, in bytes; unset means any
    /// length that fits in the file.
    #[serde(default)]
    pub max_footer_len: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub console_level: String,
    pub file_level: String,
}

const DEFAULT_WORKER_COUNT: i64 = 4;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("PQ_READER_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .set_default("reader.worker_count", DEFAULT_WORKER_COUNT)?
        .set_default("reader.verify_page_crc", true)?
        .set_default("logging.log_dir", "logs")?
        .set_default("logging.console_level", "info")?
        .set_default("logging.file_level", "debug")?
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(
            config::Environment::with_prefix("PQ_READER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
