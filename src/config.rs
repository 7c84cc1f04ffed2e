//! Logging setup shared by the relay and the terminal wizard

use simple_logger::SimpleLogger;
use tracing::log::{LevelFilter, SetLoggerError};

/// Dependencies that are chatty at Info or below, capped unless debugging.
const NOISY_MODULES: &[(&str, LevelFilter)] = &[
    ("tracing", LevelFilter::Warn),
    ("hyper_util", LevelFilter::Info),
    ("h2", LevelFilter::Info),
    ("rustls", LevelFilter::Info),
    ("reqwest", LevelFilter::Info),
    ("tower_http", LevelFilter::Info),
];

fn build_logger(debug: bool) -> SimpleLogger {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let logger = SimpleLogger::new().with_level(level);
    if debug {
        return logger;
    }
    NOISY_MODULES
        .iter()
        .fold(logger, |logger, (module, level)| {
            logger.with_module_level(module, *level)
        })
}

/// Installs the global logger. `debug` lowers the level and lifts the caps
/// on noisy dependencies.
pub fn setup_logging(debug: bool) -> Result<(), SetLoggerError> {
    build_logger(debug).init().inspect_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
    })
}
