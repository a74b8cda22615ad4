//! Fitgauge: fitness assessment rating CLI

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use fitgauge::config::{default_config_json, load_config, Config, CONFIG_FILENAME};
use fitgauge::norms::{self, NormsRepository};
use fitgauge::reporter::{AssessmentReport, ConsoleReporter, JsonReporter, ReportEntry};
use fitgauge::{
    assess, diff, AssessmentInput, AssessmentSnapshot, Gender, RangeBarProjector, RatingEngine,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "FITGAUGE_LOG";

/// Fitgauge: rate fitness test results against normative tables
#[derive(Parser, Debug)]
#[command(name = "fitgauge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Output format as JSON
    #[arg(long, short, global = true)]
    json: bool,

    /// Quiet mode (minimal output)
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Verbose output (shows cutoffs, enables debug logging)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Path to config file (default: search .fitgaugerc.json in current dir and parents)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of norms tables layered over the built-in set
    #[arg(long, global = true)]
    norms: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rate a single test result
    Rate {
        /// Test id, e.g. pushup or step_test
        test_id: String,

        /// Raw measured value
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// male or female
        #[arg(long)]
        gender: Gender,

        /// Age in years
        #[arg(long, allow_negative_numbers = true)]
        age: i32,

        /// Render the best tier on the opposite side
        #[arg(long)]
        mirror: bool,
    },

    /// Rate a full assessment from a JSON input file
    Assess {
        /// Assessment input: {"client": {...}, "tests": {"<id>": value}}
        input: PathBuf,

        /// Previous snapshot to compare against
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Write this assessment's snapshot to a file for later comparison
        #[arg(long, value_name = "PATH")]
        save_snapshot: Option<PathBuf>,

        /// Render the best tier on the opposite side
        #[arg(long)]
        mirror: bool,
    },

    /// List the tests known to the loaded norms
    Battery,

    /// Load and validate a directory of norms tables
    Validate {
        /// Directory containing <test_id>.json files
        dir: PathBuf,
    },

    /// Create .fitgaugerc.json with defaults
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Output options shared by every subcommand
struct Output {
    json: bool,
    quiet: bool,
    verbose: bool,
}

impl Output {
    fn console(&self) -> ConsoleReporter {
        let reporter = ConsoleReporter::new();
        if self.verbose {
            reporter.verbose()
        } else {
            reporter
        }
    }

    fn json(&self) -> JsonReporter {
        JsonReporter::new().pretty()
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode> {
    let Args {
        command,
        json,
        quiet,
        verbose,
        config,
        norms: norms_dir,
    } = Args::parse();
    init_tracing(verbose);
    let output = Output {
        json,
        quiet,
        verbose,
    };

    match command {
        Commands::Init { dir } => run_init(dir.as_deref()),
        Commands::Validate { dir } => run_validate(&dir, &output),
        Commands::Battery => {
            let config = load_effective_config(config.as_deref(), norms_dir.as_deref(), false)?;
            let repo = install_norms(&config)?;
            if output.json {
                println!("{}", output.json().report_battery(repo.definitions()));
            } else {
                output.console().report_battery(repo.definitions());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Rate {
            test_id,
            value,
            gender,
            age,
            mirror,
        } => {
            let config = load_effective_config(config.as_deref(), norms_dir.as_deref(), mirror)?;
            let repo = install_norms(&config)?;
            let result = RatingEngine::new(repo)
                .with_body_fat_adjustment(config.body_fat_adjustment())
                .rate(&test_id, value, gender, age)
                .with_context(|| format!("Failed to rate '{}'", test_id))?;

            let projector = RangeBarProjector::new(config.range_bar_settings());
            let entry = ReportEntry::new(&result, &projector, config.mirror(), None);
            if output.json {
                println!("{}", output.json().report_result(&entry));
            } else if output.quiet {
                println!("{}", result.tier);
            } else {
                output.console().report_result(&entry);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Assess {
            input,
            previous,
            save_snapshot,
            mirror,
        } => {
            let config = load_effective_config(config.as_deref(), norms_dir.as_deref(), mirror)?;
            let repo = install_norms(&config)?;
            run_assess(
                repo,
                &config,
                &input,
                previous.as_deref(),
                save_snapshot.as_deref(),
                &output,
            )
        }
    }
}

fn load_effective_config(
    custom_path: Option<&Path>,
    cli_norms: Option<&Path>,
    cli_mirror: bool,
) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(load_config(&cwd, custom_path)?.merge_with_cli(cli_norms, cli_mirror))
}

/// Built-in tables plus the configured norms directory, installed process-wide
fn install_norms(config: &Config) -> Result<&'static NormsRepository> {
    let mut builder = NormsRepository::builder().with_builtin();
    if let Some(dir) = &config.norms_dir {
        builder = builder.with_directory(dir);
    }
    let repo = builder
        .initialize()
        .context("Failed to load normative tables")?;
    norms::install(repo).map_err(|_| anyhow::anyhow!("Norms repository already installed"))
}

fn run_assess(
    repo: &NormsRepository,
    config: &Config,
    input_path: &Path,
    previous_path: Option<&Path>,
    save_path: Option<&Path>,
    output: &Output,
) -> Result<ExitCode> {
    let content = fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let input: AssessmentInput = serde_json::from_str(&content)
        .with_context(|| format!("Invalid assessment input: {}", input_path.display()))?;

    let previous = previous_path.map(load_snapshot).transpose()?;
    let outcome = assess(repo, &input, &config.body_fat_adjustment(), Utc::now());

    let deltas = match &previous {
        Some(prev) => {
            if !prev.norms_fingerprint().is_empty()
                && prev.norms_fingerprint() != outcome.snapshot.norms_fingerprint()
                && !output.quiet
            {
                eprintln!(
                    "{}: previous snapshot was rated with different norms; tiers may not be comparable",
                    "Warning".yellow()
                );
            }
            diff(&outcome.snapshot, prev)
        }
        None => Vec::new(),
    };

    if let Some(path) = save_path {
        let json = serde_json::to_string_pretty(&outcome.snapshot)
            .context("Failed to serialize snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    }

    let projector = RangeBarProjector::new(config.range_bar_settings());
    let report = AssessmentReport::build(&input.client, &outcome, &deltas, &projector, config.mirror());
    if output.json {
        println!("{}", output.json().report_assessment(&report));
    } else if output.quiet {
        output.console().report_quiet(&report);
    } else {
        output.console().report_assessment(&report);
    }

    if let Some(path) = save_path {
        if !output.quiet && !output.json {
            eprintln!("{}: Snapshot saved to {}", "Info".blue(), path.display());
        }
    }

    if outcome.has_failures() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn load_snapshot(path: &Path) -> Result<AssessmentSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid snapshot: {}", path.display()))
}

fn run_validate(dir: &Path, output: &Output) -> Result<ExitCode> {
    let repo = NormsRepository::builder()
        .with_directory(dir)
        .initialize()
        .with_context(|| format!("Invalid norms directory: {}", dir.display()))?;

    if repo.is_empty() {
        eprintln!(
            "{}: No norms tables found in {}",
            "Warning".yellow(),
            dir.display()
        );
        return Ok(ExitCode::from(2));
    }

    if output.json {
        println!(
            "{}",
            output.json().report_validation(repo.len(), repo.fingerprint())
        );
    } else if !output.quiet {
        println!(
            "{}: {} tables valid in {} (fingerprint {})",
            "Done".green().bold(),
            repo.len(),
            dir.display(),
            &repo.fingerprint()[..12.min(repo.fingerprint().len())]
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_init(dir: Option<&Path>) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let dir = dir.unwrap_or(&cwd);
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let json = default_config_json()?;
    fs::write(&config_path, json)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!(
        "{}: Created {}",
        "Done".green().bold(),
        config_path.display()
    );
    Ok(ExitCode::SUCCESS)
}
