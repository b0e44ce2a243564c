//! calotuple command-line tool.
//!
//! Builds per-seed physics ntuples from event files and inspects the
//! resulting table files.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use calotuple_algorithms::{NtupleConfig, NtupleMaker};
use calotuple_core::{ArraySlot, FieldKind, ScalarSlot, Table, TableStore};
use calotuple_io::{read_tables, write_tables, EventFileReader, TableFormat, WriteOptions};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{info, warn, LevelFilter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    CalotupleIo(#[from] calotuple_io::Error),

    #[error("{0}")]
    Core(#[from] calotuple_core::Error),

    #[error("{0}")]
    Usage(String),
}

/// Flatten calorimeter seeds, clusters and rings into per-seed ntuples.
#[derive(Parser)]
#[command(name = "calotuple")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the physics ntuple from JSON Lines event files
    Process {
        /// Input event file(s), one JSON event per line
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output table file (.jsonl, .json, .h5, .hdf5 or .nxs)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the tables, entry counts and fields of a table file
    Info {
        /// Table file
        input: PathBuf,
    },

    /// Print the rows of one table
    Dump {
        /// Table file
        input: PathBuf,

        /// Table to print (defaults to the first one)
        #[arg(short, long)]
        table: Option<String>,

        /// Comma-separated fields to print (defaults to all)
        #[arg(short, long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// Stop after this many entries
        #[arg(short = 'n', long)]
        max_entries: Option<usize>,
    },
}

/// Command-line values that take precedence over the configuration file.
#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Key of the event info collection
    #[arg(long)]
    event_key: Option<String>,

    /// Key of the cluster collection
    #[arg(long)]
    cluster_key: Option<String>,

    /// Key of the ring collection
    #[arg(long)]
    ringer_key: Option<String>,

    /// Maximum seed/cluster ΔR (exclusive)
    #[arg(long)]
    delta_r: Option<f32>,

    /// Copy the cells of matched clusters (`--dump-cells false` turns it off)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    dump_cells: Option<bool>,

    /// Name of the output table
    #[arg(long)]
    ntuple_name: Option<String>,

    /// Message level: 0 verbose, 1 debug, 2 info, 3 warning, 4 error, 5 fatal
    #[arg(long)]
    output_level: Option<u8>,
}

impl ConfigOverrides {
    fn resolve(&self, verbose: bool) -> Result<NtupleConfig> {
        let mut config = match &self.config {
            Some(path) => NtupleConfig::from_file(path)?,
            None => NtupleConfig::default(),
        };
        if let Some(key) = &self.event_key {
            config.event_key.clone_from(key);
        }
        if let Some(key) = &self.cluster_key {
            config.cluster_key.clone_from(key);
        }
        if let Some(key) = &self.ringer_key {
            config.ringer_key.clone_from(key);
        }
        if let Some(delta_r) = self.delta_r {
            config.delta_r = delta_r;
        }
        if let Some(dump_cells) = self.dump_cells {
            config.dump_cells = dump_cells;
        }
        if let Some(name) = &self.ntuple_name {
            config.ntuple_name.clone_from(name);
        }
        if let Some(level) = self.output_level {
            config.output_level = level;
        }
        if verbose {
            config.output_level = config.output_level.min(1);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Logger filtering at `level`, unless `filters` (RUST_LOG syntax) says otherwise.
fn logger_builder(level: LevelFilter, filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    builder
}

// Installing the logger also sets the global cap to its filter, so this must
// run after anything else that sets the cap.
fn init_logging(level: LevelFilter) {
    let filters = std::env::var("RUST_LOG").ok();
    let _ = logger_builder(level, filters.as_deref()).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            overrides,
            verbose,
        } => {
            let config = overrides.resolve(verbose)?;
            let start = Instant::now();
            let summary = run_process(&input, &output, config)?;
            println!(
                "Processed {} events from {} file(s) in {:.2}s",
                summary.events,
                input.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Rows written: {}", summary.rows);
            println!("Cluster matches: {}", summary.cluster_matches);
            println!("Ringer matches: {}", summary.ringer_matches);
        }

        Commands::Info { input } => {
            init_logging(LevelFilter::Warn);
            let tables = read_tables(&input)?;
            let stdout = std::io::stdout();
            write_info(&mut stdout.lock(), &input, &tables)?;
        }

        Commands::Dump {
            input,
            table,
            fields,
            max_entries,
        } => {
            init_logging(LevelFilter::Warn);
            let tables = read_tables(&input)?;
            let stdout = std::io::stdout();
            write_dump(
                &mut stdout.lock(),
                &tables,
                table.as_deref(),
                fields.as_deref(),
                max_entries,
            )?;
        }
    }

    Ok(())
}

fn run_process(
    input: &[PathBuf],
    output: &Path,
    config: NtupleConfig,
) -> Result<calotuple_algorithms::NtupleStatistics> {
    // Reject an unusable output path before reading any event.
    if !TableFormat::from_path(output)?.is_available() {
        return Err(CliError::Usage(format!(
            "{}: HDF5 output requires building with the 'hdf5' feature",
            output.display()
        )));
    }

    let level = config.log_level();
    let mut maker = NtupleMaker::new(config);
    maker.initialize()?;
    init_logging(level);
    let mut tables = TableStore::new();
    maker.book(&mut tables)?;

    for path in input {
        info!("reading events from {}", path.display());
        for event in EventFileReader::open(path)? {
            maker.fill(&event?, &mut tables)?;
        }
    }
    maker.finalize()?;

    write_tables(output, &tables, &WriteOptions::default())?;
    info!("wrote {}", output.display());
    Ok(maker.statistics())
}

fn write_info<W: Write>(out: &mut W, path: &Path, tables: &TableStore) -> Result<()> {
    writeln!(out, "File: {}", path.display())?;
    writeln!(out, "Tables: {}", tables.len())?;
    for table in tables.tables() {
        writeln!(out)?;
        writeln!(
            out,
            "{}: {} entries, {} fields",
            table.name(),
            table.entries(),
            table.fields().len()
        )?;
        for field in table.fields() {
            writeln!(out, "  {:<20} {}", field.name, field.kind())?;
        }
        let mut aliases: Vec<_> = table.aliases().collect();
        aliases.sort_unstable();
        for (alias, target) in aliases {
            writeln!(out, "  {:<20} -> {}", alias, target)?;
        }
    }
    Ok(())
}

/// A field bound for dumping, or a name the table does not know.
enum Bound {
    Int(ScalarSlot<i32>),
    Float(ScalarSlot<f32>),
    Bool(ScalarSlot<bool>),
    FloatArray(ArraySlot<f32>),
    IntArray(ArraySlot<i32>),
    Missing,
}

fn write_dump<W: Write>(
    out: &mut W,
    tables: &TableStore,
    table: Option<&str>,
    fields: Option<&[String]>,
    max_entries: Option<usize>,
) -> Result<()> {
    let table: &Table = match table {
        Some(name) => tables
            .table(name)
            .ok_or_else(|| CliError::Usage(format!("no table named '{name}'")))?,
        None => tables
            .tables()
            .first()
            .ok_or_else(|| CliError::Usage("file contains no tables".to_string()))?,
    };

    let names: Vec<String> = match fields {
        Some(names) => names.to_vec(),
        None => table.fields().iter().map(|f| f.name.clone()).collect(),
    };

    let mut reader = table.reader();
    let bound: Vec<Bound> = names
        .iter()
        .map(|name| {
            let Some(index) = table.resolve(name) else {
                warn!("table '{}' has no field '{name}'; shown as -", table.name());
                return Bound::Missing;
            };
            match table.fields()[index].kind() {
                FieldKind::Int => Bound::Int(reader.bind_scalar(name)),
                FieldKind::Float => Bound::Float(reader.bind_scalar(name)),
                FieldKind::Bool => Bound::Bool(reader.bind_scalar(name)),
                FieldKind::FloatArray => Bound::FloatArray(reader.bind_array(name)),
                FieldKind::IntArray => Bound::IntArray(reader.bind_array(name)),
            }
        })
        .collect();

    writeln!(out, "{}", names.join("\t"))?;
    let entries = max_entries.map_or(reader.entries(), |n| n.min(reader.entries()));
    for entry in 0..entries {
        let row = reader.read_entry(entry)?;
        let cells: Vec<String> = bound
            .iter()
            .map(|b| match b {
                Bound::Int(slot) => format_opt(row.get(*slot)),
                Bound::Float(slot) => format_opt(row.get(*slot)),
                Bound::Bool(slot) => format_opt(row.get(*slot)),
                Bound::FloatArray(slot) => format_opt(row.array(*slot).map(|v| format!("{v:?}"))),
                Bound::IntArray(slot) => format_opt(row.array(*slot).map(|v| format!("{v:?}"))),
                Bound::Missing => "-".to_string(),
            })
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    Ok(())
}

fn format_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
