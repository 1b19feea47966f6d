use std::io::{self, BufWriter};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::{Parser, ValueEnum};
use tracing::{debug, trace};

use obrc::config::{DEFAULT_MAX_RECORD_LEN, DEFAULT_SEPARATOR};
use obrc::{Config, ReadMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Mmap,
    Seek,
}

impl From<Mode> for ReadMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mmap => ReadMode::Mmap,
            Mode::Seek => ReadMode::Seek,
        }
    }
}

/// Min/mean/max per key of a `key;value` measurements file.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input file, one `key;value` record per line
    #[arg(default_value = "measurements.txt")]
    path: PathBuf,

    /// Number of ranges scanned in parallel [default: available cores]
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    /// Longest record in bytes, terminator included
    #[arg(short = 'L', long, default_value_t = DEFAULT_MAX_RECORD_LEN)]
    max_record_len: usize,

    /// Character between key and value
    #[arg(short, long, default_value_t = DEFAULT_SEPARATOR as char)]
    separator: char,

    /// How workers read their range
    #[arg(long, value_enum, default_value_t = Mode::Mmap)]
    read_mode: Mode,

    /// Log more to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let log_level = match verbose {
        0 => "warn,obrc=info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 2)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    trace!(?cli, "parsed arguments");

    ensure!(
        cli.separator.is_ascii(),
        "separator must be a single ASCII character, got {:?}",
        cli.separator
    );
    let mut config = Config::default()
        .with_max_record_len(cli.max_record_len)
        .with_separator(cli.separator as u8)
        .with_read_mode(cli.read_mode.into());
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    debug!(?config, path = %cli.path.display(), "starting");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    obrc::run(&cli.path, &config, &mut out)
        .with_context(|| format!("failed to aggregate {}", cli.path.display()))?;
    Ok(())
}
