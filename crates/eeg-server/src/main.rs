//! EEG server: serial or simulated samples in, band powers out over HTTP and WebSocket

use anyhow::Context;
use eeg_processing::SpectralAnalyzer;
use eeg_server::{
    source::{self, channel_lines, pump_lines, serial_lines},
    storage::{HistoryStore, MemoryStore, MySqlStore, PersistenceSink, SessionStore},
    ActiveSession, AppState, BroadcastHub, LineParser, PipelineCoordinator, PipelineStats,
    ServerConfig,
};
use eeg_simulation::{start_simulated_stream, SimulatorConfig, StreamConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eeg_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load().context("invalid configuration")?;
    let analysis = config.analysis()?;
    for warning in analysis.warnings() {
        warn!("{}", warning);
    }

    info!(
        "Starting EEG server - mode: {}, block size: {} ({:.2}s), sample rate: {}Hz",
        config.ingest_mode,
        analysis.block_size,
        analysis.block_duration_secs(),
        analysis.sample_rate
    );

    let (sink, history, sessions): (
        Arc<dyn PersistenceSink>,
        Arc<dyn HistoryStore>,
        Arc<dyn SessionStore>,
    ) = if config.uses_memory_store() {
        warn!("Using in-memory storage; records are lost on exit");
        let store = Arc::new(MemoryStore::new());
        (store.clone(), store.clone(), store)
    } else {
        let store = MySqlStore::connect(&config.database_url, config.max_db_connections)
            .await
            .context("failed to connect to database")?;
        store
            .initialize()
            .await
            .context("failed to initialize database schema")?;
        let store = Arc::new(store);
        (store.clone(), store.clone(), store)
    };

    let stats = Arc::new(PipelineStats::new());
    let hub = BroadcastHub::new(config.event_capacity);
    let active_session = Arc::new(ActiveSession::new());
    let (item_sender, item_receiver) = mpsc::channel(config.line_buffer);

    let source_task = spawn_source(&config, item_sender, stats.clone())?;

    let analyzer = Arc::new(SpectralAnalyzer::new(analysis.block_size)?);
    let coordinator = PipelineCoordinator::new(
        analysis,
        analyzer,
        sink,
        hub.clone(),
        stats.clone(),
        active_session.clone(),
    )?;
    let pipeline_task = tokio::spawn(coordinator.run(item_receiver));

    let app = eeg_server::router(AppState {
        history,
        sessions,
        active_session,
        hub: hub.clone(),
        stats,
        mode: config.ingest_mode,
    });

    let addr = config.bind_address()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let shutdown = async move {
        shutdown_signal().await;
        info!("Shutdown requested, draining pipeline");

        source_task.abort();
        match pipeline_task.await {
            Ok(summary) => info!(
                "Pipeline stopped - {} blocks formed, {} published, {} unannounced, {} dropped",
                summary.blocks_formed, summary.published, summary.unannounced, summary.dropped
            ),
            Err(e) => error!("Pipeline task failed: {}", e),
        }

        hub.close();
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Start the serial reader or the simulator, feeding `sender`
fn spawn_source(
    config: &ServerConfig,
    sender: mpsc::Sender<source::SourceItem>,
    stats: Arc<PipelineStats>,
) -> anyhow::Result<JoinHandle<()>> {
    let parser = LineParser::new(config.ingest_mode);

    if config.simulate {
        let stream_config = StreamConfig {
            simulator: SimulatorConfig {
                sample_rate: config.sample_rate,
                state: config.sim_state,
                ..Default::default()
            },
            mode: config.ingest_mode,
            ..Default::default()
        };
        let (lines, _simulator) = start_simulated_stream(stream_config)?;
        info!("Reading simulated EEG lines");

        return Ok(tokio::spawn(async move {
            if let Err(e) = pump_lines(channel_lines(lines), parser, sender, stats).await {
                error!("Simulated source failed: {}", e);
            }
        }));
    }

    let lines = serial_lines(&config.serial_port, config.baud_rate)
        .with_context(|| format!("failed to open serial port {}", config.serial_port))?;

    Ok(tokio::spawn(async move {
        if let Err(e) = pump_lines(lines, parser, sender, stats).await {
            error!("Serial source failed: {}", e);
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
