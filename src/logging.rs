use std::{fs::File, path::Path};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log file {}: {source}", .path.display())]
    LogFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}

/// Logs to stderr, and to `log_file` if given. Stdout is reserved for the report.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = File::create(path).map_err(|source| LoggingError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        loggers.push(WriteLogger::new(level, config, file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}
