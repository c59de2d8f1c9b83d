//! nextgcu CU-CP
//!
//! This is the main binary for the CU-CP DU processor. It implements:
//! - CLI argument parsing
//! - Configuration loading and validation
//! - Task spawning and lifecycle management
//! - Graceful shutdown handling
//!
//! # Usage
//!
//! ```bash
//! nr-cucp -c config/cucp.yaml
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use nextgcu_common::tick::tick_duration;
use nextgcu_common::{init_logging, CuCpConfig, DuIndex, LogLevel};
use nextgcu_cucp::messages::{E1apMessage, F1apMessage};
use nextgcu_cucp::{
    load_and_validate_cucp_config, validate_cucp_config, CuCpTaskBase, DuProcessor,
    DuProcessorMessage, DuProcessorTask, PeerReceiver, Task, TaskError, TaskId, TaskManager,
    TaskMessage, DEFAULT_CHANNEL_CAPACITY,
};

/// nextgcu CU-CP - 5G CU-CP DU processor
#[derive(Parser, Debug)]
#[command(name = "nr-cucp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the CU-CP configuration file (YAML); defaults are used if omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: LogLevel,
}

/// Application state for the CU-CP
struct CuCpApp {
    /// Task manager for lifecycle management
    task_manager: TaskManager,
    /// Shutdown signal receiver
    shutdown_rx: watch::Receiver<bool>,
}

impl CuCpApp {
    /// Creates a new CU-CP application with the given configuration file
    fn new(config_path: Option<&str>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                info!("Loading configuration from: {}", path);
                load_and_validate_cucp_config(path)
                    .with_context(|| format!("Failed to load configuration from {path}"))?
            }
            None => {
                info!("No configuration file given, using defaults");
                let config = CuCpConfig::default();
                validate_cucp_config(&config).context("Default configuration is invalid")?;
                config
            }
        };

        info!(
            "Configuration loaded: name={}, max_ues={}, max_cells={}, timeout={} ticks, tick={} ms",
            config.gnb_cu_name,
            config.max_ues,
            config.max_cells_per_setup,
            config.procedure_timeout_ticks,
            config.tick_duration_ms
        );

        let (mut task_manager, du_processor_rx, du_rx, cu_up_rx) =
            TaskManager::new(DEFAULT_CHANNEL_CAPACITY);
        let task_base = task_manager.task_base();
        let shutdown_rx = task_manager.shutdown_receiver();

        Self::spawn_tasks(
            &mut task_manager,
            task_base,
            config,
            du_processor_rx,
            du_rx,
            cu_up_rx,
        );

        Ok(Self {
            task_manager,
            shutdown_rx,
        })
    }

    /// Spawns all CU-CP tasks
    fn spawn_tasks(
        task_manager: &mut TaskManager,
        task_base: CuCpTaskBase,
        config: CuCpConfig,
        du_processor_rx: mpsc::Receiver<TaskMessage<DuProcessorMessage>>,
        du_rx: PeerReceiver<F1apMessage>,
        cu_up_rx: PeerReceiver<E1apMessage>,
    ) {
        let period = tick_duration(config.tick_duration_ms);

        // Spawn DU processor task
        let processor = DuProcessor::new(
            DuIndex(0),
            config,
            Box::new(task_base.du_tx.clone()),
            Box::new(task_base.cu_up_tx.clone()),
        );
        let mut du_processor_task = DuProcessorTask::new(processor);
        let handle = tokio::spawn(async move {
            du_processor_task.run(du_processor_rx).await;
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::DuProcessor, handle);
        info!("DU processor task spawned");

        // Spawn ticker
        let ticker_tx = task_base.du_processor_tx.clone();
        let mut ticker_shutdown = task_manager.shutdown_receiver();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if ticker_tx.send(DuProcessorMessage::Tick).await.is_err() {
                            info!("Ticker stopped, DU processor is gone");
                            break;
                        }
                    }
                    _ = ticker_shutdown.changed() => {
                        info!("Ticker received shutdown signal");
                        break;
                    }
                }
            }
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::Ticker, handle);
        info!("Ticker spawned ({:?} period)", period);

        // Spawn DU peer
        let handle = tokio::spawn(drain_peer(du_rx, "F1AP", F1apMessage::name));
        task_manager.register_task_handle(TaskId::DuPeer, handle);
        info!("F1AP peer spawned");

        // Spawn CU-UP peer
        let handle = tokio::spawn(drain_peer(cu_up_rx, "E1AP", E1apMessage::name));
        task_manager.register_task_handle(TaskId::CuUpPeer, handle);
        info!("E1AP peer spawned");
    }

    /// Runs the main event loop until shutdown
    async fn run(&mut self) -> Result<()> {
        info!("CU-CP started, waiting for shutdown signal...");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = async {
                loop {
                    if *self.shutdown_rx.borrow() {
                        break;
                    }
                    if self.shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            } => {
                info!("Received shutdown signal from task manager");
            }
        }

        Ok(())
    }

    /// Performs graceful shutdown of all tasks
    async fn shutdown(mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        match self.task_manager.shutdown().await {
            Ok(()) => info!("All tasks shut down successfully"),
            Err(e) => warn!("Some tasks failed during shutdown: {}", e),
        }
        for (task_id, state) in self.task_manager.status_summary() {
            info!("Task {}: {}", task_id, state);
        }
        Ok(())
    }
}

/// Consumes messages addressed to a peer that has no transport attached.
async fn drain_peer<T: Send>(
    mut rx: PeerReceiver<T>,
    protocol: &'static str,
    name: fn(&T) -> &'static str,
) -> Result<(), TaskError> {
    while let Some(msg) = rx.recv().await {
        match msg {
            TaskMessage::Message(msg) => {
                debug!("{} peer not connected, dropping {}", protocol, name(&msg));
            }
            TaskMessage::Shutdown => {
                info!("{} peer received shutdown signal", protocol);
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.log_level);

    println!("nextgcu CU-CP - 5G CU-CP DU processor");
    println!("=====================================");

    match run_cucp(args).await {
        Ok(()) => {
            info!("CU-CP exited successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("CU-CP failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main CU-CP execution logic
async fn run_cucp(args: Args) -> Result<()> {
    let mut app = CuCpApp::new(args.config_file.as_deref())?;

    app.run().await?;

    app.shutdown().await?;

    Ok(())
}
