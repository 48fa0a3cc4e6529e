use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use now_playing_live::animation::run_frames;
use now_playing_live::artwork::ArtworkLoader;
use now_playing_live::compositor::{encode_png, Compositor, PLATTER_SIZE};
use now_playing_live::config::WidgetConfig;
use now_playing_live::connection::ConnectionManager;
use now_playing_live::state::{create_session, run_updates, SharedSession};
use now_playing_live::surface::FrameSurface;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting now-playing widget");

    let config = WidgetConfig::load()?;
    log::info!(
        "Streaming from {} ({:?} variant)",
        config.connection.socket_url(),
        config.display.variant
    );

    // Nothing to tear down: the pipeline lives as long as the process
    ctrlc::set_handler(|| {
        log::info!("Received interrupt signal (Ctrl+C), exiting");
        std::process::exit(0);
    })
    .context("Failed to set Ctrl+C handler")?;

    // One cooperative scheduler for connection, frames and artwork
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: WidgetConfig) -> Result<()> {
    let compositor = Compositor::new(config.output.font_path.as_deref())?;
    let loader = ArtworkLoader::new(PLATTER_SIZE).context("Failed to create artwork client")?;
    let session = create_session(&config, FrameSurface::new(compositor, Some(loader)));

    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let connection = ConnectionManager::new(&config.connection, updates_tx);
    connection.connect();

    tokio::spawn(run_updates(session.clone(), updates_rx));
    tokio::spawn(run_frames(session.clone(), config.animation.frame_interval()));

    write_snapshots(session, &config).await
}

/// Periodically write the current frame to the snapshot file.
async fn write_snapshots(session: SharedSession<FrameSurface>, config: &WidgetConfig) -> Result<()> {
    let path = &config.output.snapshot_path;
    let staging = path.with_extension("png.tmp");

    let mut ticker = tokio::time::interval(config.output.snapshot_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log::info!("Writing snapshots to {}", path.display());

    loop {
        ticker.tick().await;

        let frame = session.lock().surface().render_frame();
        let png = match encode_png(&frame) {
            Ok(png) => png,
            Err(e) => {
                log::error!("Failed to encode snapshot: {:#}", e);
                continue;
            }
        };

        // Write then rename so readers never see a partial file
        if let Err(e) = tokio::fs::write(&staging, &png).await {
            log::error!("Failed to write snapshot {}: {}", staging.display(), e);
            continue;
        }
        if let Err(e) = tokio::fs::rename(&staging, path).await {
            log::error!("Failed to move snapshot into place {}: {}", path.display(), e);
        }
    }
}
