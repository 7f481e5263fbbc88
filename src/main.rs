//! ActionFlow CLI Entry Point
//!
//! Emulates the step orchestrator locally: the task envelope is handed to
//! the invocation handler again and again until it returns `success` or
//! `failure`, sleeping between invocations when it returns `wait`.
//!
//! # Usage
//!
//! ```bash
//! # Run a task envelope against the default data directory
//! actionflow task.json
//!
//! # Store action and state documents somewhere else
//! actionflow task.json --data-dir /tmp/actionflow
//!
//! # Short invocations and back-off, write the final envelope to a file
//! actionflow task.json --max-runtime 30 --wait 2 --output result.json
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use log::{error, info, warn};
use serde_json::Value;

use actionflow::action::{ActionRegistry, Collaborators};
use actionflow::engine::{Deadline, Handler};
use actionflow::storage::FileObjectStore;
use actionflow::{EngineConfig, FlowControl, APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    envelope_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    max_runtime: Option<Duration>,
    wait_interval: Option<Duration>,
    max_iterations: Option<usize>,
    output_path: Option<PathBuf>,
    verbose: bool,
}

impl Config {
    /// Applies command-line overrides on top of the environment settings.
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(ref dir) = self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(runtime) = self.max_runtime {
            config.max_runtime = runtime;
        }
        if let Some(wait) = self.wait_interval {
            config.wait_interval = wait;
        }
        if let Some(iterations) = self.max_iterations {
            config.max_iterations = iterations;
        }
        config
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    eprintln!();
    eprintln!("{} v{}", APP_NAME.bold(), VERSION);
    eprintln!("Resumable Deployment Action Engine");
    eprintln!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: actionflow [OPTIONS] <ENVELOPE_FILE>");
    println!();
    println!("Arguments:");
    println!("  <ENVELOPE_FILE>       Path to the task envelope (JSON)");
    println!();
    println!("Options:");
    println!("  --data-dir PATH       Root directory of the object store");
    println!("  --max-runtime SECS    Time limit of each invocation");
    println!("  --wait SECS           Back-off after a 'wait' signal");
    println!("  --max-iterations N    Maximum passes per invocation");
    println!("  --output PATH         Write the final envelope to PATH instead of stdout");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Environment:");
    println!("  ACTIONFLOW_DATA_DIR, ACTIONFLOW_MAX_RUNTIME_SECS, ACTIONFLOW_WAIT_SECS,");
    println!("  ACTIONFLOW_MAX_ITERATIONS, ACTIONFLOW_SAFETY_MARGIN_MS, ACTIONFLOW_ITERATION_PAUSE_MS");
    println!();
    println!("Examples:");
    println!("  actionflow task.json");
    println!("  actionflow task.json --data-dir /tmp/actionflow --wait 2");
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn parse_seconds(value: &str, flag: &str) -> Result<Duration, String> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("Invalid {} value: {}", flag, value))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--data-dir" => {
                i += 1;
                config.data_dir = Some(PathBuf::from(flag_value(args, i, arg)?));
            }
            "--output" | "-o" => {
                i += 1;
                config.output_path = Some(PathBuf::from(flag_value(args, i, arg)?));
            }
            "--max-runtime" => {
                i += 1;
                config.max_runtime = Some(parse_seconds(flag_value(args, i, arg)?, arg)?);
            }
            "--wait" => {
                i += 1;
                config.wait_interval = Some(parse_seconds(flag_value(args, i, arg)?, arg)?);
            }
            "--max-iterations" => {
                i += 1;
                let value = flag_value(args, i, arg)?;
                config.max_iterations = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid {} value: {}", arg, value))?,
                );
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.envelope_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.envelope_path = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    if config.envelope_path.is_none() {
        return Err("Missing envelope file".to_string());
    }

    Ok(config)
}

/// Reads the signal the handler left on an envelope.
fn signal_of(envelope: &Value) -> FlowControl {
    envelope
        .get("flow_control")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(FlowControl::Failure)
}

/// Invokes the handler until it returns a terminal signal.
async fn drive(handler: Arc<Handler>, mut envelope: Value) -> Result<Value, Box<dyn std::error::Error>> {
    let config = handler.config().clone();
    let mut invocation = 0usize;

    loop {
        invocation += 1;
        info!("{} {}", "Invocation".cyan(), invocation);

        let worker = handler.clone();
        let (max_runtime, safety_margin) = (config.max_runtime, config.safety_margin);
        envelope = tokio::task::spawn_blocking(move || {
            let budget = Deadline::start(max_runtime, safety_margin);
            worker.handle_value(envelope, &budget)
        })
        .await?;

        match signal_of(&envelope) {
            FlowControl::Execute => continue,
            FlowControl::Wait => {
                info!("Waiting {:?} before the next invocation", config.wait_interval);
                tokio::time::sleep(config.wait_interval).await;
            }
            FlowControl::Success | FlowControl::Failure => break,
        }
    }

    info!("Finished after {} invocations", invocation);
    Ok(envelope)
}

/// Main application entry point. Returns true when the task succeeded.
async fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let engine_config = config.engine_config();
    info!("Data directory: {}", engine_config.data_dir.display());

    let envelope_path = config.envelope_path.clone().unwrap_or_default();
    info!("Loading envelope: {}", envelope_path.display());
    let text = fs::read_to_string(&envelope_path).map_err(|e| {
        error!("Failed to read envelope: {}", e);
        format!("Could not read '{}': {}", envelope_path.display(), e)
    })?;
    let envelope: Value = serde_json::from_str(&text)
        .map_err(|e| format!("Could not parse '{}': {}", envelope_path.display(), e))?;

    let store = Arc::new(FileObjectStore::new(&engine_config.data_dir));
    let handler = Arc::new(Handler::new(
        ActionRegistry::builtin(),
        store,
        Collaborators::default(),
        engine_config,
    ));

    let result = drive(handler, envelope).await?;
    let signal = signal_of(&result);
    let rendered = serde_json::to_string_pretty(&result)?;

    match config.output_path {
        Some(ref path) => {
            fs::write(path, &rendered)?;
            info!("Final envelope written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    eprintln!();
    if signal == FlowControl::Success {
        eprintln!("{}", "Task completed successfully".green().bold());
        Ok(true)
    } else {
        if let Some(diagnostic) = result.get("diagnostic").and_then(Value::as_str) {
            warn!("{}", diagnostic);
        }
        eprintln!("{}", "Task failed".red().bold());
        Ok(false)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
