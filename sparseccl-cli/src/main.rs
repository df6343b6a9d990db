//! sparseccl CLI
//!
//! Density sweeps against the flood-fill reference, and parallel batch
//! labeling cross-checked against the sequential path.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use sparseccl_algorithms::synth::generate_batch;
use sparseccl_algorithms::{
    BatchLabels, Cell, DensitySweep, ModuleBatch, ModuleExtent, ParallelCcl, ParallelConfig,
    Pattern, ScratchPolicy, SparseCcl, SweepConfig, SweepReport, ValidationSession,
    ValidatorConfig,
};
use std::fs;
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

    #[error("Labeling error: {0}")]
    Core(#[from] sparseccl_core::Error),

    #[error("Config file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{mismatches} of {checked} modules disagreed with the reference")]
    Mismatch { mismatches: usize, checked: usize },
}

/// Synthetic data shape.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternKind {
    /// Independently firing channels
    FullRandom,
    /// Rectangular areas of firing channels
    Clustered,
}

/// Arguments shared by the generating subcommands.
#[derive(clap::Args, Debug)]
struct PatternArgs {
    /// Data shape
    #[arg(long, value_enum)]
    pattern: Option<PatternKind>,

    /// Area size along channel0 (clustered pattern)
    #[arg(long, default_value = "4")]
    cluster_width: u32,

    /// Area size along channel1 (clustered pattern)
    #[arg(long, default_value = "4")]
    cluster_height: u32,

    /// Firing probability inside an area (clustered pattern)
    #[arg(long, default_value = "0.5")]
    cell_probability: f64,
}

impl PatternArgs {
    fn pattern(&self) -> Option<Pattern> {
        self.pattern.map(|kind| match kind {
            PatternKind::FullRandom => Pattern::FullRandom,
            PatternKind::Clustered => Pattern::Clustered {
                cluster_width: self.cluster_width,
                cluster_height: self.cluster_height,
                cell_probability: self.cell_probability,
            },
        })
    }
}

/// Sparse connected-component labeling harness.
#[derive(Parser)]
#[command(name = "sparseccl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label random modules over a range of densities and check each result
    /// against a flood fill
    Sweep {
        /// JSON sweep configuration; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Module width (channel0 extent)
        #[arg(long)]
        width: Option<u32>,

        /// Module height (channel1 extent)
        #[arg(long)]
        height: Option<u32>,

        /// Modules generated per probability
        #[arg(short, long)]
        trials: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Comma-separated probabilities to sweep
        #[arg(long, value_delimiter = ',')]
        probabilities: Option<Vec<f64>>,

        #[command(flatten)]
        pattern: PatternArgs,

        /// Write a dump of every mismatching module to this file
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Include the cell list in mismatch dumps
        #[arg(long)]
        dump_cells: bool,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Label a synthetic multi-module batch in parallel and cross-check it
    /// against sequential labeling
    Batch {
        /// JSON parallel configuration; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of modules
        #[arg(short, long, default_value = "1000")]
        modules: usize,

        /// Module width (channel0 extent)
        #[arg(long, default_value = "336")]
        width: u32,

        /// Module height (channel1 extent)
        #[arg(long, default_value = "1280")]
        height: u32,

        /// Upper bound of the per-module presence probability
        #[arg(long, default_value = "0.01")]
        max_probability: f64,

        #[command(flatten)]
        pattern: PatternArgs,

        /// Worker threads (defaults to the global rayon pool)
        #[arg(long)]
        threads: Option<usize>,

        /// Per-module scratch bound in cells (defaults to the module size)
        #[arg(long)]
        scratch: Option<usize>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of timed iterations
        #[arg(
            short,
            long,
            default_value = "3",
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        iterations: usize,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Timings over the iterations of one labeling path.
#[derive(Debug, Serialize)]
struct Timing {
    mean_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl Timing {
    fn from_samples(times: &[f64]) -> Self {
        let min_ms = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max_ms = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let mean_ms = times.iter().sum::<f64>() / times.len().max(1) as f64;
        Self {
            mean_ms,
            min_ms,
            max_ms,
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    modules: usize,
    cells: usize,
    clusters: u64,
    mismatched_modules: usize,
    parallel: Timing,
    sequential: Timing,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn time_ms<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed().as_secs_f64() * 1000.0)
}

fn run_sweep(
    config: SweepConfig,
    validator: ValidatorConfig,
    dump: Option<&Path>,
    json: bool,
) -> Result<()> {
    let sweep = DensitySweep::with_validator_config(validator, config)?;

    let mut session = match dump {
        Some(path) => {
            info!("writing mismatch dumps to {}", path.display());
            ValidationSession::create(path)?
        }
        None => ValidationSession::new(),
    };

    let (reports, elapsed) = time_ms(|| sweep.run(&mut session));
    let reports = reports?;
    let checked = session.checked();
    let mismatches = session.mismatches();
    session.finish()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_sweep_table(sweep.config(), &reports, elapsed);
    }

    if mismatches > 0 {
        return Err(CliError::Mismatch {
            mismatches,
            checked,
        });
    }
    Ok(())
}

fn print_sweep_table(config: &SweepConfig, reports: &[SweepReport], elapsed_ms: f64) {
    println!(
        "Module {}x{}, {} trials per probability, seed {}",
        config.extent.width, config.extent.height, config.trials, config.seed
    );
    println!(
        "{:<12} | {:<14} | {:<14} | {:<10}",
        "Probability", "Cells/module", "Clusters/mod", "Mismatches"
    );
    println!("{:-<60}", "");
    for report in reports {
        println!(
            "{:<12.0e} | {:<14.1} | {:<14.1} | {:<10}",
            report.probability,
            report.mean_cells(),
            report.mean_clusters(),
            report.mismatches
        );
    }
    println!("Completed in {:.2}s", elapsed_ms / 1000.0);
}

/// Per-module label comparison; returns the number of modules that differ.
fn cross_check(
    batch: &ModuleBatch<Cell>,
    ccl: &SparseCcl,
    parallel: &BatchLabels,
) -> Result<usize> {
    let mut mismatched = 0;
    for (index, cells) in batch.modules().enumerate() {
        let sequential = ccl.label_module(cells)?;
        let same = parallel.cluster_counts()[index] == sequential.cluster_count()
            && parallel.module_labels(index) == Some(sequential.labels());
        if !same {
            warn!("module {index}: parallel and sequential labels differ");
            mismatched += 1;
        }
    }
    Ok(mismatched)
}

fn run_batch(
    batch: &ModuleBatch<Cell>,
    config: ParallelConfig,
    iterations: usize,
    json: bool,
) -> Result<()> {
    let parallel = ParallelCcl::new(config.clone())?;
    let sequential = SparseCcl::new(config.ccl);

    // Warmup
    let labels = parallel.label_batch(batch)?;

    let mut parallel_times = Vec::with_capacity(iterations);
    let mut sequential_times = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let (result, ms) = time_ms(|| parallel.label_batch(batch));
        result?;
        parallel_times.push(ms);

        let (result, ms) = time_ms(|| {
            batch
                .modules()
                .map(|cells| sequential.label_module(cells).map(|l| l.cluster_count()))
                .collect::<sparseccl_core::Result<Vec<_>>>()
        });
        result?;
        sequential_times.push(ms);
    }

    let mismatched_modules = cross_check(batch, &sequential, &labels)?;
    let summary = BatchSummary {
        modules: batch.module_count(),
        cells: batch.total_cells(),
        clusters: labels.total_clusters(),
        mismatched_modules,
        parallel: Timing::from_samples(&parallel_times),
        sequential: Timing::from_samples(&sequential_times),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} modules, {} cells, {} clusters",
            summary.modules, summary.cells, summary.clusters
        );
        println!(
            "{:<10} | {:<15} | {:<15} | {:<15}",
            "Path", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
        );
        println!("{:-<65}", "");
        for (name, timing) in [
            ("Parallel", &summary.parallel),
            ("Sequential", &summary.sequential),
        ] {
            println!(
                "{:<10} | {:<15.2} | {:<15.2} | {:<15.2}",
                name, timing.mean_ms, timing.min_ms, timing.max_ms
            );
        }
    }

    if mismatched_modules > 0 {
        return Err(CliError::Mismatch {
            mismatches: mismatched_modules,
            checked: batch.module_count(),
        });
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep {
            config,
            width,
            height,
            trials,
            seed,
            probabilities,
            pattern,
            dump,
            dump_cells,
            json,
        } => {
            let mut sweep = match &config {
                Some(path) => read_json::<SweepConfig>(path)?,
                None => SweepConfig::default(),
            };
            if let Some(width) = width {
                sweep.extent.width = width;
            }
            if let Some(height) = height {
                sweep.extent.height = height;
            }
            if let Some(trials) = trials {
                sweep.trials = trials;
            }
            if let Some(seed) = seed {
                sweep.seed = seed;
            }
            if let Some(probabilities) = probabilities {
                sweep.probabilities = probabilities;
            }
            if let Some(pattern) = pattern.pattern() {
                sweep.pattern = pattern;
            }

            let validator = ValidatorConfig::new().with_dump_cells(dump_cells);
            run_sweep(sweep, validator, dump.as_deref(), json)?;
        }

        Commands::Batch {
            config,
            modules,
            width,
            height,
            max_probability,
            pattern,
            threads,
            scratch,
            seed,
            iterations,
            json,
        } => {
            let mut parallel = match &config {
                Some(path) => read_json::<ParallelConfig>(path)?,
                None => ParallelConfig::default(),
            };
            if let Some(threads) = threads {
                parallel = parallel.with_num_threads(threads);
            }
            if let Some(bound) = scratch {
                parallel = parallel.with_scratch(ScratchPolicy::Bounded(bound));
            }

            let extent = ModuleExtent::new(width, height);
            let mut rng = StdRng::seed_from_u64(seed);
            let (batch, gen_ms) = time_ms(|| {
                generate_batch(
                    modules,
                    extent,
                    pattern.pattern().unwrap_or_default(),
                    max_probability,
                    &mut rng,
                )
            });
            let batch = batch?;
            info!(
                "generated {} modules ({} cells) in {:.1} ms",
                batch.module_count(),
                batch.total_cells(),
                gen_ms
            );

            run_batch(&batch, parallel, iterations, json)?;
        }
    }

    Ok(())
}
