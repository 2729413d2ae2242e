use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::BufReader;
use tokio::task::{JoinError, LocalSet};
use tracing::{error, info, warn};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod models;
mod services;
mod utils;

use api::binance::BinanceClient;
use config::DashboardConfig;
use services::readout_service::{DECRYPT_INTERVAL, HEX_STREAM_INTERVAL};
use services::{
    BinanceTicker, ChartRenderer, DecryptTask, FrameLoop, FrameTask, HexStreamTask, IngestLoop,
    PriceSeriesBuffer, RainRenderer, ReadoutBoard, ResizeRouter, StopHandle, TracingSink,
};
use utils::{Canvas, DashboardError, SnapshotWriter, Viewport};

/// Hex stream slots shown next to the chart
const HEX_SLOTS: usize = 4;
/// How long shutdown waits for blocking work (snapshot encodes, the stdin reader)
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn log_filter() -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["omega_ticker=debug", "reqwest=warn"] {
        match directive.parse::<Directive>() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring log directive {}: {}", directive, e),
        }
    }
    filter
}

fn open_canvas(label: &'static str, viewport: Viewport) -> Option<Canvas> {
    match Canvas::new(label, viewport) {
        Ok(canvas) => Some(canvas),
        Err(e) => {
            error!("{}; the {} loop will not run", e, label);
            None
        }
    }
}

fn report<T: FrameTask>(surface: &str, joined: Result<FrameLoop<T>, JoinError>) {
    match joined {
        Ok(frame_loop) => info!(
            "{} loop stopped after {} frames ({} skipped)",
            frame_loop.task().name(),
            frame_loop.frames(),
            frame_loop.skipped()
        ),
        Err(e) => error!("{} loop panicked: {}", surface, e),
    }
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting OMEGA ticker...");
    info!("   ____  __  ___ ______ ______ ___ ");
    info!("  / __ \\/  |/  // ____// ____//   |");
    info!(" / / / / /|_/ // __/  / / __ / /| |");
    info!("/ /_/ / /  / // /___ / /_/ // ___ |");
    info!("\\____/_/  /_//_____/ \\____//_/  |_|");
    info!("");

    let config = match DashboardConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    info!(
        "Tracking {} every {:?} ({} samples, {} background, {} chart)",
        config.symbol,
        config.render.update_speed,
        config.render.max_data_points,
        config.background,
        config.chart
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return;
        }
    };

    let local = LocalSet::new();
    if let Err(e) = local.block_on(&runtime, run(config)) {
        error!("Dashboard stopped: {}", e);
    }
    drop(local);
    // A pending stdin read cannot be cancelled, so do not wait on it indefinitely
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

async fn run(config: DashboardConfig) -> Result<(), DashboardError> {
    let stop = StopHandle::new();
    let series = PriceSeriesBuffer::shared(config.render.max_data_points)?;
    let readouts =
        ReadoutBoard::new(Box::new(TracingSink), HEX_SLOTS, StdRng::from_entropy()).shared();

    let snapshots = match &config.snapshot_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                info!("Writing PNG snapshots to {} every {} frames", dir.display(), config.snapshot_every);
                Some(SnapshotWriter::new(dir.clone(), config.snapshot_every))
            }
            Err(e) => {
                warn!("Snapshots disabled, cannot create {}: {}", dir.display(), e);
                None
            }
        },
        None => None,
    };

    let (rain, rain_resize) = open_canvas("background", config.background)
        .map(|canvas| {
            let mut renderer = RainRenderer::new(canvas, StdRng::from_entropy());
            if let Some(s) = &snapshots {
                renderer = renderer.with_snapshots(s.clone());
            }
            let mut frame_loop = FrameLoop::new(renderer, config.frame_interval, &stop);
            let resize = frame_loop.resizable();
            (tokio::task::spawn_local(frame_loop.run()), resize)
        })
        .unzip();

    let (chart, chart_resize) = open_canvas("chart", config.chart)
        .map(|canvas| {
            let mut renderer = ChartRenderer::new(series.clone(), config.render.clone(), canvas);
            if let Some(s) = &snapshots {
                renderer = renderer.with_snapshots(s.clone());
            }
            let mut frame_loop = FrameLoop::new(renderer, config.frame_interval, &stop);
            let resize = frame_loop.resizable();
            (tokio::task::spawn_local(frame_loop.run()), resize)
        })
        .unzip();

    info!("Resize with '<background|chart> WIDTHxHEIGHT' on stdin");
    let resizes = tokio::task::spawn_local(
        ResizeRouter::new(rain_resize, chart_resize, &stop).run(BufReader::new(tokio::io::stdin())),
    );

    let decrypt = tokio::task::spawn_local(
        FrameLoop::new(DecryptTask::new(readouts.clone()), DECRYPT_INTERVAL, &stop).run(),
    );
    let hex_stream = tokio::task::spawn_local(
        FrameLoop::new(HexStreamTask::new(readouts.clone()), HEX_STREAM_INTERVAL, &stop).run(),
    );

    let client = BinanceClient::with_base_url(config.api_base_url.clone());
    let ingest = tokio::task::spawn_local(
        IngestLoop::new(
            BinanceTicker::new(client, config.symbol.clone()),
            series.clone(),
            readouts.clone(),
            config.render.update_speed,
            &stop,
        )
        .run(),
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!("Failed to listen for ctrl-c ({}), shutting down", e),
    }
    stop.stop();

    if let Some(handle) = rain {
        report("background", handle.await);
    }
    if let Some(handle) = chart {
        report("chart", handle.await);
    }
    report("decrypt", decrypt.await);
    report("hex-stream", hex_stream.await);

    match resizes.await {
        Ok(routed) => info!("{} resize command(s) applied", routed),
        Err(e) => error!("Resize reader panicked: {}", e),
    }
    match ingest.await {
        Ok(ingest) => info!(
            "Ingest finished: {} polls, {} failures, {} samples buffered",
            ingest.polls(),
            ingest.failures(),
            series.borrow().len()
        ),
        Err(e) => error!("Ingest loop panicked: {}", e),
    }
    if series.borrow().is_empty() {
        warn!("No prices were received this session");
    }

    Ok(())
}
