use std::io::Write;
use std::num::NonZeroUsize;

use obrc::{aggregate_file, run, Config, Error, ReadMode};
use tempfile::NamedTempFile;

fn input_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn config(workers: usize, read_mode: ReadMode) -> Config {
    Config::default()
        .with_workers(NonZeroUsize::new(workers).unwrap())
        .with_read_mode(read_mode)
}

fn report(contents: &[u8], workers: usize, read_mode: ReadMode) -> String {
    let file = input_file(contents);
    let mut out = Vec::new();
    run(file.path(), &config(workers, read_mode), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Deterministic measurements whose values are multiples of 0.25. Two-decimal
/// values take the float path, and every partial sum is still exact.
fn measurements(lines: usize) -> Vec<u8> {
    const STATIONS: [&str; 7] = [
        "Hamburg", "Bulawayo", "Palembang", "St. John's", "Cracow", "Bridgetown", "Zürich",
    ];
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut data = Vec::new();
    for _ in 0..lines {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let station = STATIONS[(state >> 33) as usize % STATIONS.len()];
        let quarters = ((state >> 17) % 801) as i64 - 400;
        let value = quarters as f64 / 4.0;
        data.extend_from_slice(format!("{station};{value}\n").as_bytes());
    }
    data
}

#[test]
fn single_record() {
    assert_eq!(report(b"A;5.0\n", 4, ReadMode::Mmap), "{A=5.0/5.0/5.0}\n");
}

#[test]
fn two_keys() {
    assert_eq!(
        report(b"A;1.0\nB;2.0\nA;3.0\n", 2, ReadMode::Mmap),
        "{A=1.0/2.0/3.0, B=2.0/2.0/2.0}\n"
    );
}

#[test]
fn keys_come_out_sorted() {
    assert_eq!(
        report(b"b;1.0\na;2.0\n", 1, ReadMode::Mmap),
        "{a=2.0/2.0/2.0, b=1.0/1.0/1.0}\n"
    );
}

#[test]
fn garbage_lines_are_ignored() {
    let dirty = b"X;1.0\ngarbage_no_separator\nX;2.0\nX;not-a-number\nX;6.0\n";
    let clean = b"X;1.0\nX;2.0\nX;6.0\n";
    for read_mode in [ReadMode::Mmap, ReadMode::Seek] {
        let expected = report(clean, 1, read_mode);
        assert_eq!(expected, "{X=1.0/3.0/6.0}\n");
        for workers in [1, 2, 5] {
            assert_eq!(report(dirty, workers, read_mode), expected);
        }
    }
}

#[test]
fn empty_file() {
    for read_mode in [ReadMode::Mmap, ReadMode::Seek] {
        for workers in [1, 3] {
            assert_eq!(report(b"", workers, read_mode), "{}\n");
        }
    }
}

#[test]
fn report_does_not_depend_on_worker_count() {
    let data = measurements(5_000);
    let expected = report(&data, 1, ReadMode::Mmap);
    for workers in [2, 3, 4, 7, 10, 16] {
        assert_eq!(report(&data, workers, ReadMode::Mmap), expected, "{workers} workers");
    }
}

/// Random `key;±dd.d` lines, the shape of real measurement files.
fn one_decimal_measurements(seed: u64, lines: usize) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    let mut data = Vec::new();
    for _ in 0..lines {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let key = [b'a' + (state % 5) as u8];
        let tenths = ((state >> 8) % 1999) as i64 - 999;
        let sign = if tenths < 0 { "-" } else { "" };
        data.extend_from_slice(&key);
        data.extend_from_slice(
            format!(";{sign}{}.{}\n", tenths.abs() / 10, tenths.abs() % 10).as_bytes(),
        );
    }
    data
}

#[test]
fn one_decimal_report_does_not_depend_on_worker_count() {
    for seed in 0..200 {
        let data = one_decimal_measurements(seed, 400);
        let expected = report(&data, 1, ReadMode::Mmap);
        for workers in [2, 3, 7, 16] {
            assert_eq!(
                report(&data, workers, ReadMode::Mmap),
                expected,
                "seed {seed}, {workers} workers"
            );
        }
    }
}

#[test]
fn mean_on_a_rounding_tie_is_stable() {
    // (-6.5 - 6.6) / 2 = -6.55 exactly; in f64 it lands just short of the tie
    let data = b"c;-6.5\nc;-6.6\n";
    for workers in [1, 2, 3, 4] {
        for read_mode in [ReadMode::Mmap, ReadMode::Seek] {
            assert_eq!(report(data, workers, read_mode), "{c=-6.6/-6.6/-6.5}\n");
        }
    }
}

#[test]
fn huge_value_is_not_rendered_as_infinity() {
    let out = report(b"a;1e308\n", 1, ReadMode::Mmap);
    assert!(!out.contains("inf"), "{out}");
    assert!(out.starts_with("{a=1000"));
}

#[test]
fn more_workers_than_records() {
    let data = b"a;1.0\nb;2.0\na;-1.0\n";
    let expected = report(data, 1, ReadMode::Mmap);
    assert_eq!(report(data, 32, ReadMode::Mmap), expected);
    assert_eq!(report(data, 32, ReadMode::Seek), expected);
}

#[test]
fn read_modes_agree() {
    let data = measurements(3_000);
    for workers in [1, 4, 9] {
        assert_eq!(
            report(&data, workers, ReadMode::Seek),
            report(&data, workers, ReadMode::Mmap)
        );
    }
}

#[test]
fn repeated_runs_are_identical() {
    let file = input_file(&measurements(2_000));
    let config = config(6, ReadMode::Mmap);
    let mut first = Vec::new();
    let mut second = Vec::new();
    run(file.path(), &config, &mut first).unwrap();
    run(file.path(), &config, &mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn summary_counts_records() {
    let file = input_file(b"a;1.0\nbroken\nb;2.0\na;oops\n");
    let (result, summary) = aggregate_file(file.path(), &config(3, ReadMode::Seek)).unwrap();
    assert_eq!(summary.ranges, 3);
    assert_eq!(summary.keys, 2);
    assert_eq!(summary.scan.records, 4);
    assert_eq!(summary.scan.dropped, 2);
    assert_eq!(result.get(b"a").unwrap().count, 1);
}

#[test]
fn record_longer_than_bound_fails() {
    let mut data = measurements(50);
    data.extend_from_slice(&[b'k'; 500]);
    data.extend_from_slice(b";1.0\n");
    data.extend_from_slice(&measurements(50));
    let file = input_file(&data);
    for read_mode in [ReadMode::Mmap, ReadMode::Seek] {
        let config = config(4, read_mode).with_max_record_len(64);
        let err = run(file.path(), &config, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::RecordTooLong { .. }), "{err}");
    }
}

#[test]
fn missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("measurements.txt");
    for read_mode in [ReadMode::Mmap, ReadMode::Seek] {
        let mut out = Vec::new();
        let err = run(&path, &config(2, read_mode), &mut out).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
        assert!(out.is_empty());
    }
}

#[test]
fn custom_separator() {
    let file = input_file(b"a,1.5\na,2.5\nb;3.0\n");
    let config = config(2, ReadMode::Mmap).with_separator(b',');
    let mut out = Vec::new();
    run(file.path(), &config, &mut out).unwrap();
    assert_eq!(out, b"{a=1.5/2.0/2.5}\n");
}
