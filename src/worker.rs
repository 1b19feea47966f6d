use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::trace;

use crate::config::TERMINATOR;
use crate::error::{Error, Result};
use crate::split::Range;
use crate::stats::{Measurement, PartialResult};

const READ_BUFFER: usize = 64 * 1024;

/// Per-range counters, reported alongside the partial result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub records: u64,
    pub dropped: u64,
}

impl ScanStats {
    pub fn merge(self, other: ScanStats) -> ScanStats {
        ScanStats {
            records: self.records + other.records,
            dropped: self.dropped + other.dropped,
        }
    }
}

/// Splits a record (without its terminator) into key and value. `None` when
/// the separator is missing or the value is not a finite decimal number.
pub fn parse_record(line: &[u8], separator: u8) -> Option<(&[u8], Measurement)> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let at = memchr::memchr(separator, line)?;
    let (key, value) = (&line[..at], &line[at + 1..]);
    Some((key, parse_value(value)?))
}

/// Parses a value, keeping it as exact tenths whenever the text allows.
pub fn parse_value(text: &[u8]) -> Option<Measurement> {
    let value: f64 = std::str::from_utf8(text).ok()?.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(match parse_tenths(text) {
        Some(tenths) => Measurement::Tenths(tenths),
        None => Measurement::Float(value),
    })
}

/// `[+-]digits[.digit[0...]]` as an integer number of tenths. `None` for
/// anything with a second significant decimal, an exponent, or more integer
/// digits than fit.
fn parse_tenths(text: &[u8]) -> Option<i64> {
    let (negative, digits) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, text),
    };
    let (int, frac) = match memchr::memchr(b'.', digits) {
        Some(dot) => (&digits[..dot], &digits[dot + 1..]),
        None => (digits, &[][..]),
    };
    if int.len() > 17 || (int.is_empty() && frac.is_empty()) {
        return None;
    }
    if !int.iter().chain(frac).all(u8::is_ascii_digit) {
        return None;
    }
    let (decimal, rest) = match frac.split_first() {
        Some((d, rest)) => (*d - b'0', rest),
        None => (0, &[][..]),
    };
    if rest.iter().any(|&d| d != b'0') {
        return None;
    }
    let units = int
        .iter()
        .fold(0i64, |acc, d| acc * 10 + (d - b'0') as i64);
    let tenths = units * 10 + decimal as i64;
    Some(if negative { -tenths } else { tenths })
}

struct Accumulating {
    separator: u8,
    aggregates: PartialResult,
    stats: ScanStats,
}

impl Accumulating {
    fn new(separator: u8) -> Self {
        Accumulating {
            separator,
            aggregates: PartialResult::with_capacity(1024),
            stats: ScanStats::default(),
        }
    }

    #[inline]
    fn feed(&mut self, line: &[u8]) {
        self.stats.records += 1;
        match parse_record(line, self.separator) {
            Some((key, value)) => self.aggregates.record(key, value),
            None => self.stats.dropped += 1,
        }
    }

    fn finish(self, range: &Range) -> (PartialResult, ScanStats) {
        trace!(
            offset = range.offset,
            length = range.length,
            records = self.stats.records,
            dropped = self.stats.dropped,
            keys = self.aggregates.len(),
            "range scanned"
        );
        (self.aggregates, self.stats)
    }

    fn feed_all(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while let Some(end) = memchr::memchr(TERMINATOR, rest) {
            self.feed(&rest[..end]);
            rest = &rest[end + 1..];
        }
        if !rest.is_empty() {
            self.feed(rest);
        }
    }
}

/// Accumulates every record in `bytes`. A final record without terminator
/// still counts.
pub fn scan_records(bytes: &[u8], separator: u8) -> (PartialResult, ScanStats) {
    let mut acc = Accumulating::new(separator);
    acc.feed_all(bytes);
    (acc.aggregates, acc.stats)
}

/// Scans `range` of an already mapped input.
pub fn scan_mapped(input: &[u8], range: &Range, separator: u8) -> (PartialResult, ScanStats) {
    let mut acc = Accumulating::new(separator);
    acc.feed_all(&input[range.offset as usize..range.end() as usize]);
    acc.finish(range)
}

/// Scans `range` through a private file handle, never reading past the end
/// of the range.
pub fn scan_file(path: &Path, range: &Range, separator: u8) -> Result<(PartialResult, ScanStats)> {
    let mut acc = Accumulating::new(separator);
    if range.is_empty() {
        return Ok(acc.finish(range));
    }

    let mut file = File::open(path).map_err(|e| Error::open(path, e))?;
    file.seek(SeekFrom::Start(range.offset))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER, file.take(range.length));

    let mut line = Vec::with_capacity(128);
    loop {
        line.clear();
        if reader.read_until(TERMINATOR, &mut line)? == 0 {
            break;
        }
        let record = line.strip_suffix(&[TERMINATOR]).unwrap_or(&line);
        acc.feed(record);
    }
    Ok(acc.finish(range))
}
