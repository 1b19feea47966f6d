use std::io::{self, Write};

use itertools::Itertools;

use crate::stats::{Accumulator, GlobalResult, Measurement};

/// Rounds to one decimal, halves away from zero, and folds `-0.0` into
/// `0.0` so it prints without a sign. From 2^52 up every `f64` is already
/// integral, and scaling could overflow.
fn round_tenths(value: f64) -> f64 {
    if value.abs() >= 4_503_599_627_370_496.0 {
        return value + 0.0;
    }
    (value * 10.0).round() / 10.0 + 0.0
}

fn write_tenths<W: Write>(out: &mut W, tenths: i128) -> io::Result<()> {
    let sign = if tenths < 0 { "-" } else { "" };
    let abs = tenths.unsigned_abs();
    write!(out, "{sign}{}.{}", abs / 10, abs % 10)
}

fn write_measurement<W: Write>(out: &mut W, value: Measurement) -> io::Result<()> {
    match value {
        Measurement::Tenths(t) => write_tenths(out, t as i128),
        Measurement::Float(v) => write!(out, "{:.1}", round_tenths(v)),
    }
}

fn write_entry<W: Write>(out: &mut W, key: &[u8], acc: &Accumulator) -> io::Result<()> {
    out.write_all(key)?;
    out.write_all(b"=")?;
    write_measurement(out, acc.min)?;
    out.write_all(b"/")?;
    match acc.mean_tenths() {
        Some(t) => write_tenths(out, t)?,
        None => write!(out, "{:.1}", round_tenths(acc.mean()))?,
    }
    out.write_all(b"/")?;
    write_measurement(out, acc.max)
}

/// Writes `{key=min/mean/max, ...}\n` with keys in ascending byte order.
/// Keys are written verbatim, whatever their encoding.
pub fn write_report<W: Write>(out: &mut W, result: &GlobalResult) -> io::Result<()> {
    out.write_all(b"{")?;
    for (i, (key, acc)) in result
        .iter()
        .sorted_unstable_by(|a, b| a.0.cmp(b.0))
        .enumerate()
    {
        if i > 0 {
            out.write_all(b", ")?;
        }
        write_entry(out, key, acc)?;
    }
    out.write_all(b"}\n")
}
