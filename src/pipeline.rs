//! Split, scan in parallel, merge, report.

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{Config, ReadMode};
use crate::error::{Error, Result};
use crate::mmap::Mmap;
use crate::report::write_report;
use crate::split::split;
use crate::stats::{merge_all, GlobalResult, PartialResult};
use crate::worker::{scan_file, scan_mapped, ScanStats};

/// What a run saw, for logging and callers that care about dropped input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub ranges: usize,
    pub keys: usize,
    pub scan: ScanStats,
}

/// Aggregates the whole file at `path` into one result.
pub fn aggregate_file(path: &Path, config: &Config) -> Result<(GlobalResult, Summary)> {
    config.validate()?;
    let started = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.get())
        .thread_name(|i| format!("obrc-worker-{i}"))
        .build()?;

    let (ranges, partials) = match config.read_mode {
        ReadMode::Mmap => {
            let map = Mmap::open(path)?;
            let input = map.as_slice();
            let ranges = split(
                &mut Cursor::new(input),
                input.len() as u64,
                config.workers,
                config.max_record_len,
            )?;
            let partials: Vec<_> = pool.install(|| {
                ranges
                    .par_iter()
                    .map(|range| scan_mapped(input, range, config.separator))
                    .collect()
            });
            (ranges, partials)
        }
        ReadMode::Seek => {
            let mut file = File::open(path).map_err(|e| Error::open(path, e))?;
            let size = file.metadata().map_err(|e| Error::open(path, e))?.len();
            let ranges = split(&mut file, size, config.workers, config.max_record_len)?;
            let partials = pool.install(|| {
                ranges
                    .par_iter()
                    .map(|range| scan_file(path, range, config.separator))
                    .collect::<Result<Vec<_>>>()
            })?;
            (ranges, partials)
        }
    };
    debug!(collected = partials.len(), "workers finished");
    debug_assert_eq!(partials.len(), ranges.len());

    let (result, scan) = merge_partials(partials);
    let summary = Summary {
        ranges: ranges.len(),
        keys: result.len(),
        scan,
    };
    info!(
        keys = summary.keys,
        records = scan.records,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "aggregation complete"
    );
    if scan.dropped > 0 {
        warn!(
            dropped = scan.dropped,
            "malformed records were excluded from the report"
        );
    }
    Ok((result, summary))
}

/// Folds partial results in range order, so arrival order never shows up in
/// the sums of float fallback values.
fn merge_partials(partials: Vec<(PartialResult, ScanStats)>) -> (GlobalResult, ScanStats) {
    let (maps, stats): (Vec<_>, Vec<_>) = partials.into_iter().unzip();
    let scan = stats.into_iter().fold(ScanStats::default(), ScanStats::merge);
    (merge_all(maps), scan)
}

/// Runs the whole pipeline and writes the report to `out`.
pub fn run<W: Write>(path: &Path, config: &Config, out: &mut W) -> Result<Summary> {
    let (result, summary) = aggregate_file(path, config)?;
    write_report(out, &result)?;
    out.flush()?;
    Ok(summary)
}
