// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the Modbus device simulator

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::signal;

use rust_modbus_sim::config::{self, Config};
use rust_modbus_sim::daemon::Daemon;
use rust_modbus_sim::sync::{LoggingObserver, SyncEngine};

/// Number of rows printed per bank by --dump-mapping
const DUMP_MAPPING_ROWS: usize = 16;

/// Multi-device Modbus TCP slave simulator
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Modbus enabled
    #[arg(long)]
    modbus_enabled: Option<bool>,

    /// Modbus server address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Modbus server port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Unit id live at startup
    #[arg(long)]
    initial_unit: Option<u8>,

    /// Print the address mapping of every device and exit
    #[arg(long)]
    dump_mapping: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger with appropriate level based on verbose and quiet flags
    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        let config = Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        config.build_registry()?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.modbus_enabled,
        args.modbus_address.clone(),
        args.modbus_port,
        args.initial_unit,
    );

    let mut engine = config.build_engine()?;

    if args.dump_mapping {
        dump_mapping(&engine)?;
        return Ok(());
    }

    engine.subscribe(Arc::new(LoggingObserver));
    info!(
        "{} device(s) configured, unit {} live",
        engine.registry().len(),
        engine.current_unit_id()
    );

    let mut daemon = Daemon::new();
    daemon.launch(&config, engine.into_shared()).await?;

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}

/// Print the first rows of every bank of every device
fn dump_mapping(engine: &SyncEngine) -> Result<()> {
    for device in engine.registry().devices() {
        let live = if device.unit_id() == engine.current_unit_id() {
            " (live)"
        } else {
            ""
        };
        println!("Device {} - {}{}", device.unit_id(), device.name(), live);
        for category in device.categories() {
            println!("  {}", category);
            let mapping = engine.address_mapping(device.unit_id(), category, DUMP_MAPPING_ROWS)?;
            for row in &mapping {
                let store_value = row
                    .store_value
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "    {:05}  index {:>5}  cell {:>5}  store {:>5}",
                    row.operator_address, row.index, row.cell_value, store_value
                );
            }
            let len = device.bank(category).map_or(0, |bank| bank.len());
            if len > mapping.len() {
                println!("    ... {} more", len - mapping.len());
            }
        }
    }
    if engine.registry().is_empty() {
        println!("No device configured");
    }
    Ok(())
}
