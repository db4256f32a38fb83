// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-sim project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::Config;
use crate::modbus::SimulatorModbusServer;
use crate::sync::{lock_engine, SharedSyncEngine};

/// How often stopping tasks check the running flag
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time given to each task to stop in [`Daemon::join`]
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Represents a daemon task that can be started and managed
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            modbus_addr: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// When this returns, the Modbus listener (if enabled) is already bound
    /// and [`Daemon::modbus_addr`] reports its address.
    pub async fn launch(&mut self, config: &Config, engine: SharedSyncEngine) -> Result<()> {
        // Checked before anything starts; a zero period would panic the timer
        if config.simulation.heartbeat_interval == 0 {
            anyhow::bail!("Heartbeat interval must be at least 1 second");
        }

        if config.modbus.enabled {
            self.start_modbus_server(config, engine.clone()).await?;
        } else {
            info!("Modbus server disabled");
        }

        // Start heartbeat task for monitoring
        self.start_heartbeat(
            engine,
            Duration::from_secs(config.simulation.heartbeat_interval),
        )?;

        Ok(())
    }

    /// Address the Modbus server is bound to, once launched
    pub fn modbus_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the Modbus TCP listener and spawn the server task
    async fn start_modbus_server(&mut self, config: &Config, engine: SharedSyncEngine) -> Result<()> {
        info!(
            "Starting Modbus server on {}:{}",
            config.modbus.address, config.modbus.port
        );

        let listener = TcpListener::bind((config.modbus.address.as_str(), config.modbus.port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind Modbus server to {}:{}",
                    config.modbus.address, config.modbus.port
                )
            })?;
        let local_addr = listener.local_addr()?;
        self.modbus_addr = Some(local_addr);
        info!("Modbus server listening on {}", local_addr);

        let server = Server::new(listener);
        let service = SimulatorModbusServer::new(engine, config.modbus.reject_unknown_units);
        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let new_service = |socket_addr: SocketAddr| {
                debug!("Modbus client connected from {}", socket_addr);
                Ok(Some(service.clone()))
            };
            let on_connected = |stream: TcpStream, socket_addr: SocketAddr| async move {
                accept_tcp_connection(stream, socket_addr, new_service)
            };
            let on_process_error = |err: std::io::Error| {
                error!("Modbus connection error: {}", err);
            };

            tokio::select! {
                result = server.serve(&on_connected, on_process_error) => {
                    result.context("Modbus server stopped unexpectedly")?;
                }
                _ = wait_for_shutdown(running) => {
                    info!("Modbus server stopped");
                }
            }
            Ok::<_, anyhow::Error>(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs the live unit and sync statistics
    fn start_heartbeat(&mut self, engine: SharedSyncEngine, period: Duration) -> Result<()> {
        debug!("Starting heartbeat monitor every {:?}", period);

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = ticker.tick() => {
                        let (unit_id, stats) = {
                            let engine = lock_engine(&engine);
                            (engine.current_unit_id(), engine.stats())
                        };
                        info!(
                            "Daemon heartbeat: unit {} live, {}",
                            unit_id,
                            serde_json::to_string(&stats)?
                        );
                    }
                    _ = wait_for_shutdown(running.clone()) => {}
                }
            }
            Ok::<_, anyhow::Error>(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// A task still running after the timeout is aborted.
    pub async fn join(self) -> Result<()> {
        for mut task in self.tasks {
            match time::timeout(JOIN_TIMEOUT, &mut task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!("Task failed: {:#}", e),
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => {
                    warn!("Task did not stop within {:?}, aborting", JOIN_TIMEOUT);
                    task.abort();
                }
            }
        }
        Ok(())
    }
}

/// Resolves once the running flag is cleared
async fn wait_for_shutdown(running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        time::sleep(SHUTDOWN_POLL_INTERVAL).await;
    }
}
