//! Herd Sequencer CLI
//!
//! Sequence construction for dairy-herd sensor data.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herd_sequencer::{
    audit::{create_shared_log_with_persistence, SharedAuditLog},
    config::Config,
    core::{split_arrays, split_index, LengthBounds},
    export::load_exported,
    herd::{
        cow_view, health_thresholds, trend, weekly_column, weekly_means, CowId, GROUP_MEAN_COLUMN,
    },
    pipeline::SequencePipeline,
    table::write_csv,
    VERSION,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "herd-seq")]
#[command(version = VERSION)]
#[command(about = "Sequence construction for dairy-herd sensor data", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the sequence length selected for a table size
    Length {
        /// Number of rows in the table
        #[arg(long)]
        rows: usize,

        /// Fraction of rows for the lower bound
        #[arg(long)]
        min_proportion: Option<f64>,

        /// Fraction of rows for the upper bound
        #[arg(long)]
        max_proportion: Option<f64>,

        /// Absolute floor for the lower bound
        #[arg(long)]
        min_length: Option<usize>,

        /// Absolute ceiling for the upper bound
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Clean a sensor table and write it back as CSV
    Preprocess {
        /// Input CSV file
        input: PathBuf,

        /// Output CSV file (defaults to the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Build windows from a sensor table and export them
    Sequence {
        /// Input CSV file
        input: PathBuf,

        /// Window length (selected from the row count if not given)
        #[arg(long)]
        length: Option<usize>,

        /// Output directory (defaults to the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip preprocessing
        #[arg(long)]
        raw: bool,
    },

    /// Split an exported window set into training and test portions
    Split {
        /// Export directory written by `sequence`
        dir: PathBuf,

        /// Fraction of windows held out for testing
        #[arg(long)]
        test_size: Option<f64>,
    },

    /// Show weekly means, trends and health indicators for one cow
    Cow {
        /// Input CSV file
        input: PathBuf,

        /// Cow ID (up to four digits)
        #[arg(long)]
        id: String,

        /// Second cow to compare against
        #[arg(long)]
        compare: Option<String>,
    },

    /// Show configuration
    Config,

    /// Show cumulative processing statistics
    Stats,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let result = match cli.command {
        Commands::Length {
            rows,
            min_proportion,
            max_proportion,
            min_length,
            max_length,
        } => cmd_length(rows, min_proportion, max_proportion, min_length, max_length),
        Commands::Preprocess { input, output } => cmd_preprocess(&input, output),
        Commands::Sequence {
            input,
            length,
            output,
            raw,
        } => cmd_sequence(&input, length, output, raw),
        Commands::Split { dir, test_size } => cmd_split(&dir, test_size),
        Commands::Cow { input, id, compare } => cmd_cow(&input, &id, compare.as_deref()),
        Commands::Config => cmd_config(),
        Commands::Stats => cmd_stats(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_length(
    rows: usize,
    min_proportion: Option<f64>,
    max_proportion: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<()> {
    let config = load_config();
    let defaults = config.length;
    let bounds = LengthBounds {
        min_proportion: min_proportion.unwrap_or(defaults.min_proportion),
        max_proportion: max_proportion.unwrap_or(defaults.max_proportion),
        min_length: min_length.unwrap_or(defaults.min_length),
        max_length: max_length.unwrap_or(defaults.max_length),
    };

    let selection = bounds.resolve(rows)?;

    println!("Rows: {}", selection.row_count);
    println!("  Candidate (isqrt): {}", selection.candidate);
    println!("  Lower bound: {}", selection.lower);
    println!("  Upper bound: {}", selection.upper);
    if selection.degenerate {
        println!("  Bounds crossed: lower bound used");
    }
    if selection.capped {
        println!("  Capped to leave at least one target row");
    }
    println!("Sequence length: {}", selection.length);
    println!("Windows: {}", rows.saturating_sub(selection.length));
    Ok(())
}

fn cmd_preprocess(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = load_config();
    let audit = open_audit_log(&config);
    let pipeline = SequencePipeline::new(config.clone(), audit.clone());

    let (table, report) = pipeline
        .load_table(input)
        .with_context(|| format!("preprocessing {}", input.display()))?;

    if let Some(report) = report {
        println!("Rows: {} in, {} out", report.rows_in, report.rows_out);
        for action in &report.actions {
            println!("  {action}");
        }
    }

    let output = output.unwrap_or_else(|| {
        config
            .export_path
            .join(format!("{}_clean.csv", file_stem(input)))
    });
    write_csv(&table, &output)?;
    println!("Wrote cleaned table to {output:?}");

    save_audit_log(&audit);
    Ok(())
}

fn cmd_sequence(
    input: &Path,
    length: Option<usize>,
    output: Option<PathBuf>,
    raw: bool,
) -> Result<()> {
    let config = load_config();
    let audit = open_audit_log(&config);
    let mut pipeline = SequencePipeline::new(config.clone(), audit.clone());
    if raw {
        pipeline = pipeline.without_preprocessing();
    }

    let result = pipeline
        .run(input, length)
        .with_context(|| format!("sequencing {}", input.display()))?;

    println!("Herd Sequencer v{VERSION}");
    println!();
    println!(
        "Table: {} rows x {} columns",
        result.table.row_count(),
        result.table.column_count()
    );
    match result.selection {
        Some(selection) => println!(
            "Sequence length: {} (candidate {}, bounds {}..={})",
            selection.length, selection.candidate, selection.lower, selection.upper
        ),
        None => println!("Sequence length: {} (given)", result.windows.length()),
    }
    println!("Windows: {}", result.windows.len());

    if result.windows.is_empty() {
        println!("Table is too short for this length; nothing exported.");
        save_audit_log(&audit);
        return Ok(());
    }

    let dir = output.unwrap_or_else(|| config.export_path.join(file_stem(input)));
    let summary = pipeline.export(&result, &dir)?;
    println!("Exported to {:?} (run {})", summary.dir, summary.metadata.run_id);

    println!();
    println!("{}", audit.summary());
    save_audit_log(&audit);
    Ok(())
}

fn cmd_split(dir: &Path, test_size: Option<f64>) -> Result<()> {
    let config = load_config();
    let test_size = test_size.unwrap_or(config.test_size);

    let dataset =
        load_exported(dir).with_context(|| format!("loading export from {}", dir.display()))?;
    let split = split_arrays(&dataset.x, &dataset.y, test_size)?;
    let index = split_index(dataset.dates.len(), test_size)?;
    let (train_dates, test_dates) = dataset.dates.split_at(index);

    println!(
        "Sequence length: {}, columns: {}",
        dataset.metadata.sequence_length,
        dataset.metadata.columns.join(", ")
    );
    println!();
    println!(
        "Train: X {:?}, y {:?}, {}",
        split.x_train.shape(),
        split.y_train.shape(),
        date_range(train_dates)
    );
    println!(
        "Test:  X {:?}, y {:?}, {}",
        split.x_test.shape(),
        split.y_test.shape(),
        date_range(test_dates)
    );
    Ok(())
}

fn cmd_cow(input: &Path, id: &str, compare: Option<&str>) -> Result<()> {
    let cow: CowId = id.parse()?;
    let compare: Option<CowId> = compare.map(str::parse).transpose()?;

    // Weekly means are reported in sensor units.
    let mut config = load_config();
    config.preprocess.normalize = false;
    let audit = open_audit_log(&config);
    let pipeline = SequencePipeline::new(config, audit.clone());

    let (table, _) = pipeline
        .load_table(input)
        .with_context(|| format!("loading {}", input.display()))?;
    let view = cow_view(&table, &cow, compare.as_ref())?;

    print!("{:>6} {:>6}", "Week", "Rows");
    for column in view.columns() {
        print!(" {column:>12}");
    }
    println!();

    let summaries = weekly_means(&view);
    for summary in &summaries {
        print!("{:>6} {:>6}", summary.week, summary.rows);
        for mean in &summary.means {
            print!(" {mean:>12.3}");
        }
        println!();
    }

    // The view always starts with the cow, then the herd mean.
    println!();
    for (index, label) in [(0, format!("Cow {cow}")), (1, GROUP_MEAN_COLUMN.to_string())] {
        if let Some(line) = trend(&weekly_column(&summaries, index)) {
            println!(
                "Trend for {label}: {:+.3} per week (intercept {:.3})",
                line.slope, line.intercept
            );
        }
    }

    let cow_weekly = weekly_column(&summaries, 0);
    match health_thresholds(&cow_weekly) {
        Some(lines) => {
            println!();
            println!("Health indicators for cow {cow}:");
            println!("  Green line (healthy): {:.3}", lines.green);
            println!("  Orange line (requires medication): {:.3}", lines.orange);
            println!("  Red line (not well): {:.3}", lines.red);
            if let Some(&latest) = cow_weekly.last() {
                println!("  Latest week: {}", lines.classify(latest));
            }
        }
        None => println!("Not enough weeks for health indicators."),
    }

    save_audit_log(&audit);
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_stats() -> Result<()> {
    let config = load_config();
    let path = config.audit_log_path();
    if !path.exists() {
        println!("No previous run data found.");
        return Ok(());
    }

    let audit = create_shared_log_with_persistence(path);
    println!("{}", audit.summary());
    Ok(())
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {e}; using defaults");
            Config::default()
        }
    }
}

fn open_audit_log(config: &Config) -> SharedAuditLog {
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    create_shared_log_with_persistence(config.audit_log_path())
}

fn save_audit_log(audit: &SharedAuditLog) {
    if let Err(e) = audit.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string())
}

fn date_range(dates: &[Vec<String>]) -> String {
    let first = dates.first().and_then(|w| w.first());
    let last = dates.last().and_then(|w| w.last());
    match (first, last) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "no windows".to_string(),
    }
}
