//! River: periodic webcam snapshot with a timestamp overlay, served over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::{eyre::WrapErr, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use river::capture::{probe_v4l, CommandGrabber, DeviceLocator};
use river::pipeline::{Annotator, Pipeline};
use river::{server, Config, RefreshScheduler, SnapshotService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("river=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("River starting");

    // Load configuration
    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("RIVER_CONFIG"))
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).wrap_err("loading configuration")?;

    // A broken font would fail every cycle, so refuse to start
    let annotator = Annotator::load(&config.overlay.font_path, config.overlay.style())
        .wrap_err("loading overlay font")?;
    let pipeline = Pipeline::new(
        annotator,
        config.capture.format,
        config.output.format,
        config.output.quality,
    );
    let service = Arc::new(SnapshotService::new(pipeline));

    let locator = DeviceLocator::new(config.capture.devices.clone(), probe_v4l)?;
    let scheduler = RefreshScheduler::new(
        Arc::clone(&service),
        locator,
        CommandGrabber::from_config(&config.capture),
        config.capture.params(),
        config.refresh.interval(),
    );

    let shutdown = CancellationToken::new();

    // Spawn refresh task; a fatal scheduler error also stops the server
    let scheduler_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            let result = scheduler.run(shutdown.clone()).await;
            shutdown.cancel();
            result
        }
    });

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .wrap_err_with(|| format!("binding {}", config.server.bind))?;
    server::serve(listener, Arc::clone(&service), shutdown.clone()).await?;

    shutdown.cancel();
    scheduler_handle.await??;

    info!("River shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
