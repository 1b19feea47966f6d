//! Record-aligned partitioning of the input into per-worker byte ranges.

use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;

use itertools::Itertools;
use tracing::debug;

use crate::config::TERMINATOR;
use crate::error::{Error, Result};

/// A byte span `[offset, offset + length)` of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: u64,
    pub length: u64,
}

impl Range {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Cuts `[0, size)` into exactly `parts` contiguous ranges whose interior
/// boundaries all sit right after a terminator.
///
/// Each boundary is found by probing up to `max_record_len` bytes backwards
/// from its nominal position `k * size / parts`. Ranges may be empty.
pub fn split<R: Read + Seek>(
    source: &mut R,
    size: u64,
    parts: NonZeroUsize,
    max_record_len: usize,
) -> Result<Vec<Range>> {
    if max_record_len == 0 {
        return Err(Error::InvalidConfig(
            "maximum record length must be at least 1".into(),
        ));
    }
    let parts = parts.get();
    debug!(size, parts, split_size = size / parts as u64, "splitting input");

    let mut boundaries = Vec::with_capacity(parts + 1);
    // First boundary has to be 0
    boundaries.push(0u64);
    let mut window = vec![0u8; max_record_len];
    let mut previous = 0u64;
    for k in 1..parts {
        let nominal = (k as u128 * size as u128 / parts as u128) as u64;
        let boundary = if nominal == 0 {
            0
        } else {
            probe(source, size, nominal, &mut window)?
        };
        // never move backwards past an earlier boundary
        previous = boundary.clamp(previous, size);
        boundaries.push(previous);
    }
    // Last boundary has to be file length
    boundaries.push(size);

    let ranges = boundaries
        .into_iter()
        .tuple_windows::<(u64, u64)>()
        .map(|(start, end)| Range {
            offset: start,
            length: end - start,
        })
        .collect_vec();
    debug!(?ranges, "computed ranges");
    Ok(ranges)
}

/// Returns the offset just past the last terminator in the window of up to
/// `window.len()` bytes starting at `nominal - window.len()`.
fn probe<R: Read + Seek>(
    source: &mut R,
    size: u64,
    nominal: u64,
    window: &mut [u8],
) -> Result<u64> {
    let start = nominal.saturating_sub(window.len() as u64);
    let len = (size - start).min(window.len() as u64) as usize;
    let chunk = &mut window[..len];
    source.seek(SeekFrom::Start(start))?;
    source.read_exact(chunk)?;

    match memchr::memrchr(TERMINATOR, chunk) {
        Some(pos) => Ok(start + pos as u64 + 1),
        // nothing ends before this window, so the start of the input is the
        // only aligned boundary available
        None if start == 0 => Ok(0),
        None => Err(Error::RecordTooLong {
            window_start: start,
            max_record_len: window.len(),
        }),
    }
}
