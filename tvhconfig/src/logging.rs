//! Logging bootstrap driven by the `logger` section of the configuration.
//!
//! The level filter is reloadable so a running player can be switched to
//! `DEBUG` without restarting.

use std::sync::{Arc, RwLock};

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt, Registry,
};

use crate::{Config, LoggerSection};

/// Handle on the installed subscriber.
#[derive(Clone)]
pub struct LogHandle {
    max_level: Arc<RwLock<Level>>,
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("max_level", &self.max_level())
            .finish()
    }
}

impl LogHandle {
    pub fn max_level(&self) -> Level {
        *self.max_level.read().expect("log level lock poisoned")
    }

    /// Changes the maximum level at runtime.
    pub fn set_max_level(&self, level: Level) -> anyhow::Result<()> {
        self.reload_handle.reload(level_to_levelfilter(level))?;
        *self.max_level.write().expect("log level lock poisoned") = level;
        Ok(())
    }
}

/// Installs the global `tracing` subscriber.
///
/// A subscriber may already be installed (tests, embedding application);
/// in that case the error is logged and the returned handle only governs
/// the filter built here.
pub fn init_logging(config: &Config) -> LogHandle {
    let logger = config.logger().unwrap_or_else(|err| {
        eprintln!("invalid logger configuration, using defaults: {err:#}");
        LoggerSection::default()
    });
    let level = string_to_level(&logger.min_level).unwrap_or(Level::INFO);

    let (filter, reload_handle) = reload::Layer::new(level_to_levelfilter(level));

    let console = logger.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
    });

    if let Err(err) = Registry::default().with(filter).with(console).try_init() {
        eprintln!("tracing subscriber already installed: {err}");
    }

    LogHandle {
        max_level: Arc::new(RwLock::new(level)),
        reload_handle,
    }
}

/// Parses a level name as found in the configuration file.
pub fn string_to_level(s: &str) -> Option<Level> {
    match s.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

fn level_to_levelfilter(level: Level) -> LevelFilter {
    match level {
        Level::ERROR => LevelFilter::ERROR,
        Level::WARN => LevelFilter::WARN,
        Level::INFO => LevelFilter::INFO,
        Level::DEBUG => LevelFilter::DEBUG,
        Level::TRACE => LevelFilter::TRACE,
    }
}
