//! Process wiring.
//!
//! Startup order: audio pipeline, session, OS signal handler, HTTP listener bind,
//! login, lifecycle thread, then serve HTTP until the lifecycle thread ends.

use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use spotbot_audio::device;
use spotbot_audio::output::CpalBackend;
use spotbot_audio::{AudioWriter, ShutdownSignal};

use crate::api::{self, AppState};
use crate::config::RuntimeConfig;
use crate::lifecycle::{Lifecycle, LifecycleStatus};
use crate::session::MusicSession;
use crate::session::library::LibrarySession;

/// List output devices and print them to stdout.
pub fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    device::list_devices(&host)
}

/// Run the bot until shutdown or logout.
pub async fn run(config: RuntimeConfig) -> Result<()> {
    let pipeline = Arc::new(
        AudioWriter::spawn(CpalBackend::new(config.device.clone()), config.pipeline)
            .context("spawn audio pump")?,
    );
    let session: Arc<dyn MusicSession> = Arc::new(LibrarySession::new(
        config.library.clone(),
        pipeline.clone(),
    ));
    let shutdown = ShutdownSignal::new();
    install_signal_handler(shutdown.clone())?;

    let lifecycle_status = LifecycleStatus::shared();
    let state = web::Data::new(AppState {
        session: session.clone(),
        pipeline: pipeline.health(),
        lifecycle: lifecycle_status.clone(),
    });
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default().exclude("/health"))
            .configure(api::configure)
    })
    .disable_signals()
    .bind(config.http_bind)
    .with_context(|| format!("bind {}", config.http_bind))?;

    tracing::info!(
        library = %config.library.root.display(),
        username = %config.credentials.username,
        "logging in"
    );
    session.login(&config.credentials).context("login")?;

    let lifecycle = Lifecycle::new(
        session.clone(),
        pipeline.clone(),
        shutdown,
        lifecycle_status,
    );
    let lifecycle_thread = std::thread::Builder::new()
        .name("lifecycle".into())
        .spawn(move || lifecycle.run())
        .context("spawn lifecycle thread")?;

    let server = server.run();
    let handle = server.handle();
    tracing::info!(bind = %config.http_bind, "http api listening");

    actix_web::rt::spawn(async move {
        match web::block(move || lifecycle_thread.join()).await {
            Ok(Ok(exit)) => tracing::info!(exit = exit.label(), "lifecycle finished"),
            Ok(Err(_)) => tracing::error!("lifecycle thread panicked"),
            Err(e) => tracing::error!(error = %e, "failed to wait for lifecycle thread"),
        }
        handle.stop(true).await;
    });

    server.await.context("http server")?;
    pipeline.close();
    tracing::info!("shutdown complete");
    Ok(())
}

fn install_signal_handler(shutdown: ShutdownSignal) -> Result<()> {
    ctrlc::set_handler(move || {
        if shutdown.fire() {
            tracing::info!("shutdown requested");
        } else {
            tracing::debug!("shutdown already pending");
        }
    })
    .context("install signal handler")
}
