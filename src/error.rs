use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened, stat'ed or mapped.
    #[error("cannot access {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Seeking or reading failed after the input was opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No line terminator inside a probe window, so some record is longer
    /// than the configured bound.
    #[error(
        "no record terminator within {max_record_len} bytes from offset {window_start}; \
         a record is longer than the maximum record length"
    )]
    RecordTooLong {
        window_start: u64,
        max_record_len: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Open {
            path: path.into(),
            source,
        }
    }
}
