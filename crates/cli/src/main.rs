//! fieldscan - In-Field Scan hardware self-test driver
//!
//! `run` initializes once (driver load, batch selection) and then triggers the
//! scan on every selected logical CPU concurrently. `status` only reads.

mod logging;
mod render;
mod runner;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use fieldscan_core::application::constants::{DEFAULT_CONTROL_ROOT, LOADER_PROGRAM};
use fieldscan_core::application::{inspect_instances, InitOutcome, ScanConfig, ScanService};
use fieldscan_core::domain::Outcome;
use fieldscan_core::port::id_provider::UuidProvider;
use fieldscan_core::port::knobs::{ENFORCE_RUN_KNOB, TEST_FILE_KNOB};
use fieldscan_core::port::time_provider::SystemTimeProvider;
use fieldscan_core::port::{ControlFs, KnobSet, TimeProvider, TopologyProvider};
use fieldscan_infra_system::{ModprobeLoader, SysfsControlFs, SysfsTopology};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const EXIT_FAIL: u8 = 1;
const EXIT_FATAL: u8 = 2;
/// Conventional "test skipped" status
const EXIT_SKIP: u8 = 77;

#[derive(Parser)]
#[command(name = "fieldscan")]
#[command(about = "In-Field Scan hardware self-test driver", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the scan instance directories
    #[arg(long, global = true, env = "FIELDSCAN_CONTROL_ROOT", default_value = DEFAULT_CONTROL_ROOT)]
    control_root: PathBuf,

    /// Log format: pretty or json
    #[arg(long, global = true, env = "FIELDSCAN_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the next scan image and run it on every core
    Run(RunArgs),

    /// Show the state of every scan instance without running anything
    Status,
}

#[derive(Args)]
struct RunArgs {
    /// CPUs to run on, kernel list syntax (e.g. 0-3,8); default all online
    #[arg(long)]
    cpus: Option<String>,

    /// Test knob NAME=VALUE (test_file, enforce_run); repeatable
    #[arg(short = 'O', long = "knob", value_name = "NAME=VALUE", env = "FIELDSCAN_KNOBS", value_delimiter = ',')]
    knobs: Vec<String>,

    /// Load this image instead of advancing (same as -O test_file=ID)
    #[arg(long, value_name = "ID")]
    test_file: Option<String>,

    /// Run even if the previous run failed (same as -O enforce_run=1)
    #[arg(long)]
    enforce_run: bool,

    /// Helper used to load the scan driver
    #[arg(long, env = "FIELDSCAN_LOADER", default_value = LOADER_PROGRAM)]
    loader: PathBuf,
}

fn build_knobs(knobs: &[String], test_file: Option<String>, enforce_run: bool) -> Result<KnobSet> {
    let mut set = KnobSet::parse(knobs).context("Invalid knob")?;
    if let Some(id) = test_file {
        set.set(TEST_FILE_KNOB, id);
    }
    if enforce_run {
        set.set(ENFORCE_RUN_KNOB, "1");
    }
    Ok(set)
}

fn exit_code(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Success => ExitCode::SUCCESS,
        Outcome::Fail(_) => ExitCode::from(EXIT_FAIL),
        Outcome::Skip(_) => ExitCode::from(EXIT_SKIP),
    }
}

async fn run(control_root: PathBuf, json: bool, args: RunArgs) -> Result<ExitCode> {
    let RunArgs {
        cpus,
        knobs,
        test_file,
        enforce_run,
        loader,
    } = args;

    let mut config = ScanConfig::default().with_control_root(control_root);
    config.loader_program = loader;

    // 1. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let fs: Arc<dyn ControlFs> = Arc::new(SysfsControlFs::new(&config.control_root));
    let service = Arc::new(ScanService::new(
        config.clone(),
        fs,
        Arc::new(ModprobeLoader::from_config(&config)),
        Arc::new(build_knobs(&knobs, test_file, enforce_run)?),
        Arc::clone(&time_provider),
        Arc::new(UuidProvider),
    ));

    // 2. Init: driver load + batch selection (blocking)
    let init_service = Arc::clone(&service);
    let init = tokio::task::spawn_blocking(move || init_service.init())
        .await
        .context("Init task panicked")??;

    let session = match init {
        InitOutcome::Ready(session) => session,
        InitOutcome::Skip(reason) => {
            render::print_init_skip(&reason, json)?;
            return Ok(ExitCode::from(EXIT_SKIP));
        }
    };

    // 3. Run on every selected core
    let topology = SysfsTopology::default();
    let all_cpus = topology
        .logical_cpus()
        .context("Cannot enumerate CPU topology")?;
    let cpus = runner::select_cpus(all_cpus, cpus.as_deref())?;
    info!(
        cpus = cpus.len(),
        image_id = %session.image_id,
        "Starting scan"
    );

    let driver = Arc::new(service.driver(session));
    let report = runner::run_all(driver, cpus, time_provider).await?;

    render::print_report(&report, json)?;
    Ok(exit_code(&report.overall))
}

fn status(control_root: PathBuf, json: bool) -> Result<ExitCode> {
    let config = ScanConfig::default().with_control_root(control_root);
    let fs = SysfsControlFs::new(&config.control_root);
    let states = inspect_instances(&fs, &config.instance_prefix).with_context(|| {
        format!(
            "Cannot list scan instances under {} (driver not loaded?)",
            config.control_root.display()
        )
    })?;
    render::print_instances(&states, json)?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_format);

    info!("fieldscan v{} starting...", VERSION);

    let result = match cli.command {
        Commands::Run(args) => run(cli.control_root, cli.json, args).await,
        Commands::Status => status(cli.control_root, cli.json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "fieldscan failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::domain::SkipReason;
    use fieldscan_core::port::KnobProvider;

    #[test]
    fn test_build_knobs_shortcuts_override() {
        let knobs = build_knobs(&["test_file=0x2".to_string()], Some("0x5".to_string()), true)
            .unwrap();
        assert_eq!(knobs.knob_uint(TEST_FILE_KNOB).unwrap(), Some(5));
        assert_eq!(knobs.knob_uint(ENFORCE_RUN_KNOB).unwrap(), Some(1));
    }

    #[test]
    fn test_build_knobs_rejects_malformed() {
        assert!(build_knobs(&["enforce_run".to_string()], None, false).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Outcome::Success), ExitCode::SUCCESS);
        assert_eq!(
            exit_code(&Outcome::Skip(SkipReason::NoInstancePassed)),
            ExitCode::from(EXIT_SKIP)
        );
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "fieldscan",
            "run",
            "--cpus",
            "0-3",
            "-O",
            "enforce_run=1",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.cpus.as_deref(), Some("0-3"));
                assert_eq!(args.knobs, vec!["enforce_run=1"]);
            }
            Commands::Status => panic!("expected run"),
        }
    }
}
