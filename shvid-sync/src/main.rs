//! Shared video sync (shvid-sync) - scenario runner
//!
//! Replays a JSON scenario of authoritative state updates, engine errors and
//! renderer callbacks against the simulated renderer and engine, printing
//! every outbound player event as a JSON line on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shvid_sync::config::SyncConfig;
use shvid_sync::engine::SimulatedEngineProvider;
use shvid_sync::playback::{ElementController, SyncReconciler};
use shvid_sync::renderer::SimulatedRenderer;
use shvid_sync::scenario::{Scenario, ScenarioRunner};

/// Command-line arguments for shvid-sync
#[derive(Parser, Debug)]
#[command(name = "shvid-sync")]
#[command(about = "Replay a shared-video playback scenario against simulated back ends")]
#[command(version)]
struct Args {
    /// Scenario file (JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SHVID_CONFIG")]
    config: Option<PathBuf>,

    /// Act as the session owner (overrides the scenario's flag)
    #[arg(long)]
    owner: bool,

    /// Simulate an environment without an adaptive engine
    #[arg(long)]
    engine_unsupported: bool,

    /// Simulate a renderer without native manifest playback
    #[arg(long)]
    no_native_hls: bool,

    /// Reject every playback start like a blocked autoplay
    #[arg(long)]
    reject_autoplay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = SyncConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("shvid_sync={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    if args.owner {
        scenario.owner = true;
    }
    info!(
        "Running scenario {} ({} steps)",
        args.scenario.display(),
        scenario.steps.len()
    );

    let (renderer, renderer_probe) = if args.no_native_hls {
        SimulatedRenderer::new()
    } else {
        SimulatedRenderer::with_native_support(&config.engine.native_mime)
    };
    renderer_probe.set_reject_play(args.reject_autoplay);

    let (engines, engine_probe) = SimulatedEngineProvider::new(!args.engine_unsupported);
    let reconciler = SyncReconciler::new(ElementController::new(), Arc::new(engines), config);

    // Print outbound events as they arrive
    let events = BroadcastStream::new(reconciler.subscribe_events());
    let printer = tokio::spawn(async move {
        let mut events = events;
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize {}: {}", event.name(), e),
                },
                Err(e) => warn!("Event stream lagged: {}", e),
            }
        }
    });

    let mut runner = ScenarioRunner::new(reconciler, engine_probe.clone(), renderer);
    let summary = runner.run(&scenario).await.context("Scenario failed")?;

    // Dropping the runner closes the event channel and ends the printer
    drop(runner.finish());
    printer.await.context("Event printer task failed")?;

    let snapshot = renderer_probe.snapshot();
    info!(
        "Renderer: src={:?} paused={} muted={} position={}",
        snapshot.src,
        snapshot.paused,
        snapshot.muted,
        shvid_common::time::format_position(snapshot.current_time)
    );
    info!(
        "Engines: {} created, {} live; {} engine errors delivered, {} escalations",
        engine_probe.created(),
        engine_probe.live(),
        summary.engine_errors_delivered,
        summary.escalations
    );

    Ok(())
}
