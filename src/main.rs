//! Neuro Clinical Logger CLI
//!
//! Runs timed clinical sessions against a serial sensor board and appends
//! one CSV row per recorded session.

use anyhow::Context;
use clap::{Parser, Subcommand};
use neuro_clinical_logger::{
    config::Config,
    core::{ConsoleReporter, Orchestrator, SessionProtocol, SharedState},
    device::{available_ports, DeviceChannel},
    record::{LogSummary, SessionLog},
    VERSION,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "neuro-logger")]
#[command(version = VERSION)]
#[command(about = "Timed clinical session logger for a serial sensor board", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run clinical sessions and log results
    Start {
        /// Serial port of the sensor board
        #[arg(long)]
        port: Option<String>,

        /// Serial baud rate
        #[arg(long)]
        baud: Option<u32>,

        /// Stop after this many recorded sessions
        #[arg(long)]
        max_sessions: Option<u32>,

        /// CSV file to append session rows to
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Length of one protocol time unit in milliseconds
        #[arg(long)]
        unit_ms: Option<u64>,

        /// Run the protocol without opening the serial port
        #[arg(long)]
        no_device: bool,

        /// Show decoded device samples and other debug output
        #[arg(long, short)]
        verbose: bool,
    },

    /// List serial ports visible to this machine
    Ports,

    /// Summarize an existing session log
    Status {
        /// CSV file to inspect (defaults to the configured log)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

/// One-run overrides from the command line.
struct StartOverrides {
    port: Option<String>,
    baud: Option<u32>,
    max_sessions: Option<u32>,
    log_file: Option<PathBuf>,
    unit_ms: Option<u64>,
}

impl StartOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.device.port = port;
        }
        if let Some(baud) = self.baud {
            config.device.baud_rate = baud;
        }
        if let Some(max) = self.max_sessions {
            config.max_sessions = max;
        }
        if let Some(path) = self.log_file {
            config.log_path = path;
        }
        if let Some(ms) = self.unit_ms {
            config.protocol.unit = Duration::from_millis(ms);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            port,
            baud,
            max_sessions,
            log_file,
            unit_ms,
            no_device,
            verbose,
        } => {
            init_tracing(verbose);
            let overrides = StartOverrides {
                port,
                baud,
                max_sessions,
                log_file,
                unit_ms,
            };
            cmd_start(cli.config.as_deref(), overrides, no_device)
        }
        Commands::Ports => cmd_ports(),
        Commands::Status { log_file } => cmd_status(cli.config.as_deref(), log_file),
        Commands::Config { save } => cmd_config(cli.config.as_deref(), save),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(p) => Config::load_from(p),
        None => Config::load(),
    };
    config.context("loading configuration")
}

fn cmd_start(
    config_path: Option<&Path>,
    overrides: StartOverrides,
    no_device: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);
    config.validate()?;

    println!("Neuro Clinical Logger v{VERSION}");
    println!();
    println!("Starting clinical logger...");
    if no_device {
        println!("  Device: none (every session will report no data)");
    } else {
        println!(
            "  Device: {} @ {} baud",
            config.device.port, config.device.baud_rate
        );
    }
    println!("  Session log: {}", config.log_path.display());
    println!(
        "  Protocol unit: {} ms",
        config.protocol.unit.as_millis()
    );
    let session_length = SessionProtocol::from_config(&config.protocol).total_duration();
    println!(
        "  Session length: {:.1} s (up to {} sessions)",
        session_length.as_secs_f64(),
        config.max_sessions
    );

    let log = SessionLog::open(&config.log_path)
        .with_context(|| format!("opening session log {}", config.log_path.display()))?;

    // Ctrl+C lowers the run flag shared with the device reader.
    let shared = SharedState::new();
    ctrlc_handler(shared.clone());

    let mut orchestrator = Orchestrator::with_shared(
        &config,
        log,
        ConsoleReporter::new(&config.log_path),
        shared,
    );

    if !no_device {
        let channel = DeviceChannel::open(&config.device, orchestrator.shared().clone())?;
        println!("Connected to device on {}", channel.source());
        orchestrator.attach_channel(channel);
    }

    let summary = orchestrator.run()?;

    println!();
    println!("{}", orchestrator.shared().stats().summary());
    if let Some(exit) = orchestrator.channel_exit() {
        if exit.is_failure() {
            eprintln!("Warning: device channel ended early ({exit})");
        }
    }
    if summary.skipped > 0 {
        println!("Sessions skipped for missing data: {}", summary.skipped);
    }

    Ok(())
}

fn cmd_ports() -> anyhow::Result<()> {
    let ports = available_ports()?;

    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("Serial Ports");
    println!("============");
    for port in ports {
        println!("  {:<24} {}", port.name, port.kind);
    }
    Ok(())
}

fn cmd_status(config_path: Option<&Path>, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let path = log_file.unwrap_or(config.log_path);

    if !path.exists() {
        println!("No session log found at {}", path.display());
        println!("Run 'neuro-logger start' to record sessions.");
        return Ok(());
    }

    let summary = LogSummary::read(&path)
        .with_context(|| format!("reading session log {}", path.display()))?;

    println!("Session Log Status");
    println!("==================");
    println!();
    println!("File: {}", path.display());
    println!("Logger runs: {}", summary.runs());
    println!("Recorded sessions: {}", summary.data_rows);
    if summary.unreadable_rows > 0 {
        println!("Unreadable rows: {}", summary.unreadable_rows);
    }
    match summary.last_record {
        Some(record) => println!("Last session: {record}"),
        None => println!("No sessions recorded yet."),
    }
    Ok(())
}

fn cmd_config(config_path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let shown_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);

    if save {
        config
            .save_to(&shown_path)
            .with_context(|| format!("writing {}", shown_path.display()))?;
        println!("Saved configuration to {}", shown_path.display());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {shown_path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(shared: SharedState) {
    ctrlc::set_handler(move || {
        shared.request_stop();
    })
    .expect("Error setting Ctrl+C handler");
}
