//! `padgate` - CLI for the launch-pad readiness gate
//!
//! This binary waits for the avionics sensors to appear on the I2C bus and
//! hands control to the data-acquisition program exactly once.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use padgate::cli::{Cli, Command, ConfigCommand, ScanCommand};
use padgate::{
    init_logging, AcquisitionLauncher, BusScanner as _, Config, I2cdetectScanner, MonitorOutcome,
    ReadinessMonitor,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Run => handle_run(&config).await,
        Command::Scan(scan_cmd) => handle_scan(&config, &scan_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

/// Wait for readiness, then hand off to the acquisition program.
async fn handle_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let scanner = I2cdetectScanner::new(&config.bus.i2cdetect, config.bus.index);
    let monitor = ReadinessMonitor::new(
        scanner,
        config.monitor.required.clone(),
        config.poll_interval(),
        shutdown_rx,
    );

    match monitor.run().await? {
        MonitorOutcome::Ready(token) => {
            let launcher = AcquisitionLauncher::from_config(&config.acquisition);
            let status = launcher.launch(token).await?;
            // Handoff is one-shot: the gate's lifetime ends with the
            // acquisition program, whatever its exit status.
            info!(%status, "acquisition finished, exiting");
        }
        MonitorOutcome::Interrupted => {
            warn!("interrupted before the bus became ready");
        }
    }
    Ok(())
}

/// Perform a single bus scan and report the result.
async fn handle_scan(config: &Config, cmd: &ScanCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut scanner = I2cdetectScanner::new(&config.bus.i2cdetect, config.bus.index);
    let scan = scanner.scan().await?;
    let ready = scan.contains_all(&config.monitor.required);

    if cmd.json {
        let report = serde_json::json!({
            "bus": config.bus.index,
            "detected": scan.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            "required": config.monitor.required.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "ready": ready,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("padgate scan (bus {})", config.bus.index);
        println!("------------------");
        println!("Detected: {scan}");
        println!(
            "Required: {}",
            config
                .monitor
                .required
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Ready:    {}", if ready { "yes" } else { "no" });
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[bus]");
                println!("  Index:          {}", config.bus.index);
                println!("  i2cdetect:      {}", config.bus.i2cdetect.display());
                println!();
                println!("[monitor]");
                println!("  Poll interval:  {} ms", config.monitor.poll_interval_ms);
                println!(
                    "  Required:       {}",
                    config
                        .monitor
                        .required
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                println!();
                println!("[acquisition]");
                println!("  Program:        {}", config.acquisition.program.display());
                println!("  Args:           {}", config.acquisition.args.join(" "));
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
