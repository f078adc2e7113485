//! sprayplan CLI - plan, optimize and export spray deposition sweeps

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sprayplan::{init_logging, OptimizeOptions, ResultStore, Scoring, Session, SprayConfig};
use sprayplan::{BUILD_DATE, VERSION};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sprayplan")]
#[command(version = VERSION)]
#[command(about = "Spray deposition coverage planner", long_about = None)]
struct Cli {
    /// Configuration file (.json or .toml); built-in defaults when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Result directory, overriding the configuration
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep stride candidates and store the best stride per sample
    Optimize {
        /// Only optimize this sample index
        #[arg(short, long)]
        sample: Option<usize>,
        /// Evaluate candidates in parallel
        #[arg(short, long)]
        parallel: bool,
        #[arg(long, value_enum, default_value_t = ScoringArg::StdDev)]
        scoring: ScoringArg,
        /// Do not write a result file
        #[arg(long)]
        no_save: bool,
    },
    /// Simulate deposition over the whole bed and report per-sample uniformity
    Simulate {
        /// Sweep every sample at this stride instead of its stored one
        #[arg(short, long)]
        stride: Option<f64>,
        /// Write the deposition grid as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the G-code program for every sample
    Gcode {
        /// One stride per sample, comma separated; stored strides when absent
        #[arg(short, long, value_delimiter = ',')]
        strides: Vec<f64>,
        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the most recent stored optimization result
    ShowLatest,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScoringArg {
    StdDev,
    Cv,
}

impl From<ScoringArg> for Scoring {
    fn from(arg: ScoringArg) -> Self {
        match arg {
            ScoringArg::StdDev => Scoring::StdDev,
            ScoringArg::Cv => Scoring::CoefficientOfVariation,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;
    tracing::info!("sprayplan {} (built {})", VERSION, BUILD_DATE);

    let config = load_config(cli.config.as_deref())?;
    let store = ResultStore::new(cli.results.clone().unwrap_or_else(|| config.results_dir()));

    match cli.command {
        Commands::Optimize {
            sample,
            parallel,
            scoring,
            no_save,
        } => {
            let mut session = Session::from_config(config)?;
            let options = OptimizeOptions {
                scoring: scoring.into(),
                parallel,
                store: (!no_save).then(|| store.clone()),
                progress: Some(Arc::new(|i: usize, n: usize| {
                    tracing::debug!("candidate {}/{}", i + 1, n);
                })),
                cancel: None,
            };
            let results = match sample {
                Some(index) => vec![session.optimize_sample(index, &options)?],
                None => session.optimize_all(&options)?,
            };
            for result in &results {
                println!(
                    "{}: best stride {:.4} mm ({} {:.6})",
                    result.mask, result.best_stride, result.scoring, result.best_deviation
                );
                for (stride, deviation) in result.series() {
                    println!("    {:>10.4} {:>14.6}", stride, deviation);
                }
                for failure in &result.failures {
                    println!("    {:>10.4} failed: {}", failure.stride, failure.reason);
                }
            }
        }
        Commands::Simulate { stride, output } => {
            let mut session = Session::from_config(config)?;
            let deposition = match stride {
                Some(stride) => session.simulate_stride(stride)?,
                None => {
                    session.load_strides(&store)?;
                    session.simulate()?
                }
            };
            for (name, mask) in session.sample_names().iter().zip(session.grid().masks()) {
                let stats = deposition.region_stats(mask)?;
                println!(
                    "{}: mean {:.6} std {:.6} min {:.6} max {:.6} ({} cells)",
                    name, stats.mean, stats.std_dev, stats.min, stats.max, stats.count
                );
            }
            println!("bed total {:.6}, peak {:.6}", deposition.total(), deposition.max());
            if let Some(path) = output {
                let json = serde_json::to_string(&deposition)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote deposition grid to {}", path.display());
            }
        }
        Commands::Gcode { strides, output } => {
            let mut session = Session::from_config(config)?;
            if strides.is_empty() {
                session.load_strides(&store)?;
            } else {
                session.apply_strides(&strides)?;
            }
            let program = session.motion_program()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, program)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote G-code to {}", path.display());
                }
                None => print!("{}", program),
            }
        }
        Commands::ShowLatest => match store.latest()? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("No optimization results in {}", store.dir().display()),
        },
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SprayConfig> {
    match path {
        Some(path) => SprayConfig::load_from_file(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(SprayConfig::default()),
    }
}
