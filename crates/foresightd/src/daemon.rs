//! Daemon mode — runs the reconcile controller and the REST API.
//!
//! In this mode, the daemon:
//! 1. Opens the state store under the data directory
//! 2. Builds the prediction stack (kernel runner, tuning hooks, model router)
//! 3. Starts the controller over the local cluster and its watch events
//! 4. Serves the REST API until Ctrl-C, then drains the controller

use std::sync::Arc;

use foresight_autoscale::{Controller, LocalCluster, ReadingsEvaluator, Reconciler};
use foresight_predict::{
    CombinedHook, ModelPredict, NativeRunner, PredictionRunner, ProcessRunner,
};
use foresight_state::StateStore;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::{DaemonConfig, RunnerMode};

/// Build the kernel runner selected by the configuration.
pub fn build_runner(config: &DaemonConfig) -> anyhow::Result<Arc<dyn PredictionRunner>> {
    let runner: Arc<dyn PredictionRunner> = match config.runner.mode {
        RunnerMode::Native => Arc::new(NativeRunner),
        RunnerMode::Process => {
            let program = match &config.runner.program {
                Some(program) => program.clone(),
                None => std::env::current_exe()?,
            };
            info!(program = ?program, args = ?config.runner.args, "process runner");
            Arc::new(ProcessRunner::new(program, config.runner.args.clone()))
        }
    };
    Ok(runner)
}

/// Assemble a controller over `cluster`.
pub fn build_controller(
    config: &DaemonConfig,
    cluster: &LocalCluster,
    runner: Arc<dyn PredictionRunner>,
) -> Controller {
    let predicter = ModelPredict::with_defaults(runner, Arc::new(CombinedHook::default()));
    let reconciler = Reconciler::new(
        Arc::new(cluster.clone()),
        Arc::new(ReadingsEvaluator::new(cluster.state().clone())),
        Arc::new(predicter),
    )
    .with_error_retry(config.controller.error_retry());

    Controller::new(reconciler, config.controller.controller_config())
}

/// Run the daemon until interrupted.
pub async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!("Foresight daemon starting");
    std::fs::create_dir_all(&config.data_dir)?;

    // ── State store ────────────────────────────────────────────

    let db_path = config.db_path();
    let state = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // ── Controller ─────────────────────────────────────────────

    let runner = build_runner(&config)?;
    let (cluster, events) = LocalCluster::with_events(state);
    let controller = build_controller(&config, &cluster, runner);
    info!(
        workers = config.controller.workers,
        mode = ?config.runner.mode,
        "controller initialized"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller_handle = tokio::spawn(controller.run(Some(events), shutdown_rx));

    // ── API server ─────────────────────────────────────────────

    let router = foresight_api::build_router(cluster);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(addr = %config.listen, "API server starting");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    if let Err(e) = controller_handle.await {
        error!(error = %e, "controller task failed");
    }

    info!("Foresight daemon stopped");
    Ok(())
}
