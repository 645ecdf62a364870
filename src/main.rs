use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use zoonet::backend::OvsBackend;
use zoonet::config::{self, Config};
use zoonet::orchestrator::Orchestrator;
use zoonet::signal::Interrupt;
use zoonet::ZooError;

/// Emulate an Internet Topology Zoo GML network as switches and hosts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the GML topology file
    topology: PathBuf,
}

fn run(args: &Args, config: &Config) -> Result<(), ZooError> {
    let interrupt = Interrupt::new();
    if let Err(e) = interrupt.install() {
        warn!("Could not install interrupt handler: {}", e);
    }

    let backend = OvsBackend::new(config.tools.clone());
    Orchestrator::new(interrupt)
        .with_ovs_vsctl(config.tools.ovs_vsctl.clone())
        .run(&args.topology, backend, BufReader::new(io::stdin()), io::stdout())
}

fn main() -> ExitCode {
    // Initialize error handling
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error reporter: {e}");
    }

    let args = Args::parse();

    // Configuration comes first so it can set the default log level
    let loaded = config::load_from_env();
    let default_level = loaded
        .as_ref()
        .ok()
        .and_then(|c| c.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            let e = ZooError::from(e);
            error!("{}", e);
            error!("hint: {}", e.hint());
            return ExitCode::from(e.exit_code());
        }
    };

    info!("Starting zoonet v{}", env!("CARGO_PKG_VERSION"));
    info!("Topology file: {:?}", args.topology);

    match run(&args, &config) {
        Ok(()) => {
            info!("Network stopped, exiting");
            ExitCode::SUCCESS
        }
        Err(ZooError::Interrupted) => {
            info!("Interrupted, network stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            error!("hint: {}", e.hint());
            ExitCode::from(e.exit_code())
        }
    }
}
