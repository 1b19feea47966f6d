//! Per-key min/mean/max over large `key;value` files, computed by splitting
//! the input into record-aligned ranges that are scanned in parallel and
//! merged into one sorted report.
//!
//! Values with at most one significant decimal are aggregated as exact
//! integer tenths, so the report does not depend on how the input was split.
//! Other values fall back to `f64` arithmetic.
//!
//! Records that cannot be parsed (no separator, or a value that is not a
//! finite decimal number) are skipped silently and leave no trace in the
//! statistics; only their count is reported through [`Summary`].

pub mod config;
pub mod error;
pub mod mmap;
pub mod pipeline;
pub mod report;
pub mod split;
pub mod stats;
pub mod worker;

pub use config::{Config, ReadMode};
pub use error::{Error, Result};
pub use pipeline::{aggregate_file, run, Summary};
pub use report::write_report;
pub use split::{split, Range};
pub use stats::{merge_all, Accumulator, Aggregates, GlobalResult, Measurement, PartialResult};
pub use worker::{parse_record, parse_value, scan_file, scan_mapped, scan_records, ScanStats};

