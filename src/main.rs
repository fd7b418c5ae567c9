//! manifest-fixup CLI
//!
//! Entry point for the `manifest-fixup` command-line tool.

use clap::{Args, Parser, Subcommand};
use manifest_fixup::config::EffectiveConfig;
use manifest_fixup::pipeline::{PipelineError, PipelineResult, RunReport};
use manifest_fixup::{logging, signal, BuildSnapshot, CancelToken, ManifestBatch, Pipeline};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "manifest-fixup")]
#[command(about = "Resolve build variants and fix up their manifests", version)]
struct Cli {
    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Flags layered over the config file.
#[derive(Args, Clone)]
struct ConfigArgs {
    /// Path to config file (default: .manifest-fixup.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Minimum SDK floor; 0 takes it from the build snapshot
    #[arg(long)]
    min_sdk: Option<i64>,

    /// Worker threads; 0 uses all cores
    #[arg(long, short = 'j')]
    jobs: Option<u64>,

    /// Application project name
    #[arg(long)]
    project: Option<String>,
}

impl ConfigArgs {
    fn overrides(&self) -> Option<serde_json::Value> {
        let mut map = serde_json::Map::new();
        if let Some(min_sdk) = self.min_sdk {
            map.insert("min_sdk".into(), min_sdk.into());
        }
        if let Some(jobs) = self.jobs {
            map.insert("jobs".into(), jobs.into());
        }
        if let Some(project) = &self.project {
            map.insert("project".into(), project.clone().into());
        }
        (!map.is_empty()).then_some(serde_json::Value::Object(map))
    }

    fn load(&self) -> PipelineResult<EffectiveConfig> {
        Ok(EffectiveConfig::load(self.config.as_deref(), self.overrides())?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the variants a build invocation produces
    Resolve {
        /// Build snapshot JSON exported by the host build
        #[arg(long, short = 's')]
        snapshot: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Requested task names (after --)
        #[arg(last = true)]
        tasks: Vec<String>,
    },

    /// Resolve variants and fix up their manifests
    Fix {
        /// Build snapshot JSON exported by the host build
        #[arg(long, short = 's')]
        snapshot: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Requested task names (after --)
        #[arg(last = true)]
        tasks: Vec<String>,
    },

    /// Fix up an explicit list of dependency manifests
    Rewrite {
        /// Application manifest, checked but never modified
        #[arg(long)]
        main: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Dependency manifests to rewrite
        files: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(logging::verbosity(cli.verbose, cli.quiet)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::Resolve {
            snapshot,
            config,
            json,
            tasks,
        } => run_resolve(snapshot, config, json, tasks),
        Commands::Fix {
            snapshot,
            config,
            json,
            tasks,
        } => run_fix(snapshot, config, json, tasks),
        Commands::Rewrite {
            main,
            config,
            json,
            files,
        } => run_rewrite(main, config, json, files),
        Commands::Config { config } => run_config(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn pipeline(config: &EffectiveConfig) -> PipelineResult<Pipeline> {
    let cancel = CancelToken::new();
    if let Err(e) = signal::install(cancel.clone()) {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }
    Ok(Pipeline::new(config.settings()?, cancel))
}

fn run_resolve(
    snapshot_path: PathBuf,
    config: ConfigArgs,
    json: bool,
    tasks: Vec<String>,
) -> PipelineResult<()> {
    let effective = config.load()?;
    let snapshot = BuildSnapshot::from_file(&snapshot_path)?;
    let resolution = pipeline(&effective)?.resolve(&tasks, &snapshot)?;

    if json {
        println!("{}", resolution.to_json()?);
    } else {
        print!("{}", resolution.to_human());
    }
    Ok(())
}

fn run_fix(
    snapshot_path: PathBuf,
    config: ConfigArgs,
    json: bool,
    tasks: Vec<String>,
) -> PipelineResult<()> {
    let effective = config.load()?;
    let snapshot = BuildSnapshot::from_file(&snapshot_path)?;
    let pipeline = pipeline(&effective)?;
    let report = pipeline.run(&tasks, &snapshot)?;
    finish(&report, json, &pipeline)
}

fn run_rewrite(
    main: Option<PathBuf>,
    config: ConfigArgs,
    json: bool,
    files: Vec<PathBuf>,
) -> PipelineResult<()> {
    let effective = config.load()?;
    let pipeline = pipeline(&effective)?;
    let report = pipeline.rewrite(&ManifestBatch::new(files, main))?;
    finish(&report, json, &pipeline)
}

fn finish(report: &RunReport, json: bool, pipeline: &Pipeline) -> Result<(), PipelineError> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.to_human());
    }
    report.verdict(&pipeline.settings().policy)
}

fn run_config(config: ConfigArgs) -> PipelineResult<()> {
    let effective = config.load()?;
    println!("{}", effective.to_json()?);
    Ok(())
}
