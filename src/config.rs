use std::num::NonZeroUsize;

use crate::error::{Error, Result};

pub const DEFAULT_MAX_RECORD_LEN: usize = 100;
pub const DEFAULT_SEPARATOR: u8 = b';';
pub const TERMINATOR: u8 = b'\n';

/// How workers get at the bytes of their range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// One shared read-only mapping, each worker slices its own range.
    #[default]
    Mmap,
    /// Each worker opens its own handle, seeks to its offset and reads at
    /// most its length.
    Seek,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: NonZeroUsize,
    /// Upper bound on a record's length including its terminator. Used as
    /// the backward probe window when placing range boundaries.
    pub max_record_len: usize,
    pub separator: u8,
    pub read_mode: ReadMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            separator: DEFAULT_SEPARATOR,
            read_mode: ReadMode::default(),
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_record_len(mut self, max_record_len: usize) -> Self {
        self.max_record_len = max_record_len;
        self
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_record_len == 0 {
            return Err(Error::InvalidConfig(
                "maximum record length must be at least 1".into(),
            ));
        }
        if self.separator == TERMINATOR {
            return Err(Error::InvalidConfig(
                "separator cannot be the record terminator".into(),
            ));
        }
        Ok(())
    }
}
