//! seqrun - Discover completed sequencing runs and extract their metadata.
//!
//! Usage:
//!   seqrun find ROOT                      List filesystem entries
//!   seqrun runs ROOT -s TYPE              List complete runs of a sequencer type
//!   seqrun parse DIR                      Parse the metadata files of one directory
//!   seqrun ingest ROOT -s TYPE            Discover runs and extract metadata (JSON lines)
//!   seqrun types                          List known sequencer types
//!   seqrun --help                         Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use seqrun_core::{EntryKind, FindOptions, SequencerRegistry};
use seqrun_ingest::{IngestOutcome, IngestSummary, MetadataAggregator};
use seqrun_parse::{MetadataFile, projects};
use seqrun_scan::{RunValidator, ValidatedRun, find};

const DEFAULT_LOG_FILTER: &str = "warn,seqrun=info";

#[derive(Parser)]
#[command(
    name = "seqrun",
    version,
    about = "Discover completed sequencing runs and extract their metadata",
    long_about = "seqrun walks directory trees looking for sequencing run directories,\n\
                  checks that they are complete, and parses their run descriptor,\n\
                  run parameters and sample sheet into one JSON document per run."
)]
struct Cli {
    /// Extra sequencer types (TOML file with [[sequencer]] tables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log more detail (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List entries below a directory, like find(1)
    Find {
        /// Directory to search
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Entry type: f (file), d (directory) or l (symlink)
        #[arg(short = 't', long = "type")]
        file_type: Option<EntryKind>,

        /// Minimum depth (the root is depth 0)
        #[arg(long, default_value = "0")]
        min_depth: usize,

        /// Maximum depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Glob matched against entry names (e.g. "*.xml")
        #[arg(short, long)]
        name: Option<String>,

        /// Directory name to skip entirely (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Descend into symlinked directories
        #[arg(short = 'L', long)]
        follow_links: bool,
    },

    /// List complete runs of a sequencer type
    Runs {
        /// Directory to search
        root: PathBuf,

        /// Sequencer type identifier
        #[arg(short, long, default_value = "array_based")]
        sequencer: String,

        /// Override the completion indicator filename
        #[arg(short, long)]
        indicator: Option<String>,

        /// Also report rejected candidate directories on stderr
        #[arg(long)]
        show_rejected: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Parse the metadata files of one run directory
    Parse {
        /// Run directory
        dir: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Discover complete runs and extract their metadata as JSON lines
    Ingest {
        /// Directory to search
        root: PathBuf,

        /// Sequencer type identifier
        #[arg(short, long, default_value = "array_based")]
        sequencer: String,

        /// Override the completion indicator filename
        #[arg(short, long)]
        indicator: Option<String>,

        /// Parse runs on this many threads (runs are discovered first)
        #[arg(short, long, default_value = "1")]
        jobs: usize,
    },

    /// List known sequencer types
    Types {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = load_registry(cli.config.as_deref())?;

    match cli.command {
        Command::Find {
            root,
            file_type,
            min_depth,
            max_depth,
            name,
            exclude,
            follow_links,
        } => {
            let mut builder = FindOptions::builder();
            builder
                .root(root)
                .min_depth(min_depth)
                .exclude_dirs(exclude)
                .follow_links(follow_links);
            if let Some(kind) = file_type {
                builder.file_type(kind);
            }
            if let Some(max) = max_depth {
                builder.max_depth(max);
            }
            if let Some(pattern) = name {
                builder.name_pattern(pattern);
            }
            let options = builder.build().context("Invalid find options")?;
            run_find(options)?;
        }
        Command::Runs {
            root,
            sequencer,
            indicator,
            show_rejected,
            format,
        } => {
            let validator = RunValidator::new(registry);
            run_runs(&validator, &root, &sequencer, indicator.as_deref(), show_rejected, format)?;
        }
        Command::Parse { dir, format } => {
            let aggregator = MetadataAggregator::new().with_validator(RunValidator::new(registry));
            run_parse(&aggregator, &dir, format)?;
        }
        Command::Ingest {
            root,
            sequencer,
            indicator,
            jobs,
        } => {
            let aggregator = MetadataAggregator::new().with_validator(RunValidator::new(registry));
            run_ingest(&aggregator, &root, &sequencer, indicator.as_deref(), jobs)?;
        }
        Command::Types { format } => {
            run_types(&registry, format)?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` when set.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => DEFAULT_LOG_FILTER,
        1 => "warn,seqrun=debug",
        _ => "warn,seqrun=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Built-in sequencer types, plus any from the config file.
fn load_registry(config: Option<&Path>) -> Result<SequencerRegistry> {
    match config {
        Some(path) => SequencerRegistry::load(path)
            .wrap_err_with(|| format!("Failed to load sequencer types from {}", path.display())),
        None => Ok(SequencerRegistry::builtin()),
    }
}

/// Print every matching entry, one path per line.
fn run_find(options: FindOptions) -> Result<()> {
    let mut walk = find(options).context("Invalid find options")?;

    for entry in walk.by_ref() {
        println!("{}", entry.path.display());
    }

    let warnings = walk.take_warnings();
    if !warnings.is_empty() {
        eprintln!("{} entr{} skipped", warnings.len(), if warnings.len() == 1 { "y" } else { "ies" });
    }

    Ok(())
}

/// List complete runs.
fn run_runs(
    validator: &RunValidator,
    root: &Path,
    sequencer: &str,
    indicator: Option<&str>,
    show_rejected: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut runs = validator
        .find_sequencer_runs(root, sequencer, indicator)
        .wrap_err_with(|| format!("Cannot search {}", root.display()))?;
    if show_rejected {
        runs = runs.on_reject(|rejection| {
            eprintln!(
                "rejected {} ({:?})",
                rejection.candidate.path.display(),
                rejection.reason
            );
        });
    }

    match format {
        OutputFormat::Text => {
            for run in runs.by_ref() {
                println!("{}", run.path().display());
            }
            eprintln!(
                "{} run(s) found, {} candidate(s) rejected",
                runs.accepted_count(),
                runs.rejected_count()
            );
        }
        OutputFormat::Json => {
            let found: Vec<ValidatedRun> = runs.collect();
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
    }

    Ok(())
}

/// Parse one directory and print its report.
fn run_parse(aggregator: &MetadataAggregator, dir: &Path, format: OutputFormat) -> Result<()> {
    let report = aggregator
        .parse_directory(dir)
        .wrap_err_with(|| format!("Cannot parse {}", dir.display()))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let metadata = &report.metadata;
            println!("{}", "─".repeat(60));
            println!(" {}", metadata.path().display());
            if let Some(ref sequencer) = metadata.sequencer_type {
                println!(" Sequencer: {sequencer}");
            }
            println!("{}", "─".repeat(60));

            if let Some(run_info) = metadata.get(MetadataFile::RunInfo.filename()) {
                for key in ["run_id", "instrument", "flowcell", "run_date"] {
                    if let Some(value) = run_info.get_str(key) {
                        println!(" {key:<20} {value}");
                    }
                }
            }
            if let Some(sample_sheet) = metadata.get(MetadataFile::SampleSheet.filename()) {
                let projects = projects(sample_sheet);
                if !projects.is_empty() {
                    println!(" {:<20} {}", "projects", projects.join(", "));
                }
            }

            println!();
            for filename in metadata.filenames() {
                println!("   ok      {filename}");
            }
            for failure in &report.failures {
                println!("   failed  {} ({})", failure.filename, failure.message);
            }
        }
    }

    Ok(())
}

/// Stream one JSON object per run to stdout.
fn run_ingest(
    aggregator: &MetadataAggregator,
    root: &Path,
    sequencer: &str,
    indicator: Option<&str>,
    jobs: usize,
) -> Result<()> {
    if jobs <= 1 {
        let mut ingest = aggregator
            .ingest_candidates_with_indicator(root, sequencer, indicator)
            .wrap_err_with(|| format!("Cannot ingest {}", root.display()))?;
        for outcome in ingest.by_ref() {
            println!("{}", outcome_json(&outcome)?);
        }
        print_summary(&ingest.summary());
        return Ok(());
    }

    // Discovery stays single-threaded; only extraction fans out.
    let mut runs = aggregator
        .discover(root, sequencer, indicator)
        .wrap_err_with(|| format!("Cannot ingest {}", root.display()))?;
    let batch: Vec<ValidatedRun> = runs.by_ref().collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| eyre!("Failed to start {jobs} worker threads: {e}"))?;
    let outcomes = pool.install(|| aggregator.extract_all(batch));

    let mut summary = IngestSummary {
        rejected: runs.rejected_count(),
        ..IngestSummary::default()
    };
    for outcome in &outcomes {
        summary.record(outcome);
        println!("{}", outcome_json(outcome)?);
    }
    print_summary(&summary);

    Ok(())
}

fn outcome_json(outcome: &IngestOutcome) -> Result<String> {
    let value = match &outcome.result {
        Ok(report) => json!({
            "path": outcome.path,
            "state": outcome.state(),
            "metadata": report.metadata,
            "failures": report.failures,
        }),
        Err(err) => json!({
            "path": outcome.path,
            "state": outcome.state(),
            "error": err.to_string(),
        }),
    };
    Ok(serde_json::to_string(&value)?)
}

fn print_summary(summary: &IngestSummary) {
    eprintln!(
        "{} run(s) extracted, {} failed, {} rejected, {} file failure(s)",
        summary.extracted, summary.failed, summary.rejected, summary.file_failures
    );
}

/// List the sequencer type table.
fn run_types(registry: &SequencerRegistry, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let specs: Vec<_> = registry.iter().collect();
            println!("{}", serde_json::to_string_pretty(&specs)?);
        }
        OutputFormat::Text => {
            for spec in registry.iter() {
                println!(
                    "{:<14} {:<18} {}",
                    spec.id,
                    spec.completion_indicator,
                    spec.required_files.join(", ")
                );
            }
        }
    }

    Ok(())
}
