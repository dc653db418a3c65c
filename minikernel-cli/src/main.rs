use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use minikernel::{workload, EngineConfig, EngineConfigOverrides, SchedulerEngine};

const LOG_FILE: &str = "log_execucao_minikernel.txt";

#[derive(Parser, Debug)]
#[command(name = "minikernel", about = "Preemptive scheduling simulator")]
struct Args {
    /// Workload file (see the format documented in the crate's README).
    workload: std::path::PathBuf,

    /// Override the in-file round-robin quantum, in milliseconds.
    #[arg(long)]
    quantum: Option<u64>,

    /// Run the dual-CPU scheduler core instead of single-CPU.
    #[arg(long = "dual-cpu")]
    dual_cpu: bool,

    /// Optional TOML file overriding engine tuning defaults.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Also write the verbose event-log channel to stderr as it runs.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), minikernel::EngineError> {
    let text = std::fs::read_to_string(&args.workload)
        .map_err(|e| minikernel::EngineError::InputFormat(format!("reading {:?}: {e}", args.workload)))?;
    let parsed = workload::parse(&text)?;

    let mut config = EngineConfig::new(parsed.policy);
    config.dual_cpu = args.dual_cpu;
    if let Some(quantum) = args.quantum {
        config.quantum_ms = quantum;
    }
    if let Some(path) = &args.config {
        let overrides = load_overrides(path)?;
        config.apply_overrides(&overrides);
    }

    let engine = Arc::new(SchedulerEngine::new(parsed.processes, config));
    let result = engine.run();

    std::fs::write(LOG_FILE, engine.event_log.finalize_essential())
        .map_err(|e| minikernel::EngineError::InputFormat(format!("writing {LOG_FILE}: {e}")))?;

    result
}

fn load_overrides(path: &std::path::Path) -> Result<EngineConfigOverrides, minikernel::EngineError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| minikernel::EngineError::InputFormat(format!("reading {path:?}: {e}")))?;
    toml::from_str(&text).map_err(|e| minikernel::EngineError::InputFormat(format!("parsing {path:?}: {e}")))
}
