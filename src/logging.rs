//! File-backed `log` backend. The terminal is owned by the UI, so records go to a
//! file or nowhere.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("a logger is already installed")]
    AlreadySet(#[from] log::SetLoggerError),
}

struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
    started: Instant,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed();
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "[{:>5}.{:03}] {:<5} {}: {}",
                elapsed.as_secs(),
                elapsed.subsec_millis(),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Install the file logger. Truncates `path`.
pub fn init(path: &Path, level: LevelFilter) -> Result<(), LogError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let logger = FileLogger {
        file: Mutex::new(file),
        level,
        started: Instant::now(),
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}
