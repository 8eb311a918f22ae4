use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::shared::config::model::{Settings, load_settings};

/// Process-wide settings, loaded on first access. Only the command-line
/// front end reads these; library callers pass `ReaderOptions` explicitly.
pub static CONFIG: Lazy<Arc<Settings>> =
    Lazy::new(|| Arc::new(load_settings().expect("Failed to load configuration")));
