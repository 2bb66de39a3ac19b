//! Session lifecycle coordinator.
//!
//! One thread selects over the session's event streams and the process-wide
//! shutdown signal. It is the only place that logs the session out, closes the
//! audio pipeline on shutdown and closes the session.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{never, select};
use spotbot_audio::{AudioWriter, ShutdownSignal};

use crate::session::{LogLevel, MusicSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Connecting,
    LoggedIn,
    LoggedOut,
    ShuttingDown,
    Closed,
}

impl LifecycleState {
    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::Connecting => "connecting",
            LifecycleState::LoggedIn => "logged_in",
            LifecycleState::LoggedOut => "logged_out",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Closed => "closed",
        }
    }
}

/// Lifecycle state shared with the HTTP health endpoint.
#[derive(Debug)]
pub struct LifecycleStatus {
    state: Mutex<LifecycleState>,
}

impl Default for LifecycleStatus {
    fn default() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Connecting),
        }
    }
}

impl LifecycleStatus {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, state: LifecycleState) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *guard != state {
            tracing::debug!(from = guard.label(), to = state.label(), "lifecycle transition");
            *guard = state;
        }
    }
}

/// Audio pipeline as seen by the coordinator.
pub trait Pipeline: Send + Sync {
    /// Stop the pump and release the output device. Idempotent.
    fn close(&self);
}

impl Pipeline for AudioWriter {
    fn close(&self) {
        AudioWriter::close(self);
    }
}

pub struct Lifecycle {
    session: Arc<dyn MusicSession>,
    pipeline: Arc<dyn Pipeline>,
    shutdown: ShutdownSignal,
    status: Arc<LifecycleStatus>,
}

impl Lifecycle {
    pub fn new(
        session: Arc<dyn MusicSession>,
        pipeline: Arc<dyn Pipeline>,
        shutdown: ShutdownSignal,
        status: Arc<LifecycleStatus>,
    ) -> Self {
        Self {
            session,
            pipeline,
            shutdown,
            status,
        }
    }

    /// Run the event loop until logout completes or shutdown is requested, then
    /// close the session. Returns the state the loop exited from.
    pub fn run(self) -> LifecycleState {
        let exit = self.event_loop();
        if let Err(e) = self.session.close() {
            tracing::error!(error = %e, "failed to close session");
        }
        self.status.set(LifecycleState::Closed);
        tracing::info!(exit = exit.label(), "session closed");
        exit
    }

    fn event_loop(&self) -> LifecycleState {
        let events = self.session.events();
        let mut logged_in = events.logged_in;
        let mut messages = events.messages_to_user;
        let mut logs = events.log_messages;
        let logged_out = events.logged_out;
        let shutdown = self.shutdown.receiver();

        loop {
            select! {
                recv(logged_in) -> msg => match msg {
                    Ok(Ok(())) => {
                        match self.session.current_user() {
                            Ok(user) => tracing::info!(user = %user.display_name, "logged in"),
                            Err(_) => tracing::info!("logged in"),
                        }
                        self.status.set(LifecycleState::LoggedIn);
                    }
                    Ok(Err(e)) => tracing::error!(error = %e, "login failed"),
                    Err(_) => logged_in = never(),
                },
                recv(messages) -> msg => match msg {
                    Ok(message) => tracing::info!(%message, "message from service"),
                    Err(_) => messages = never(),
                },
                recv(logs) -> msg => match msg {
                    Ok(log) => match log.level {
                        LogLevel::Debug => tracing::debug!(message = %log.message, "session"),
                        LogLevel::Info => tracing::info!(message = %log.message, "session"),
                        LogLevel::Warn => tracing::warn!(message = %log.message, "session"),
                    },
                    Err(_) => logs = never(),
                },
                recv(logged_out) -> msg => {
                    if msg.is_err() {
                        tracing::debug!("logged-out stream closed");
                    }
                    tracing::info!("logged out");
                    self.status.set(LifecycleState::LoggedOut);
                    return LifecycleState::LoggedOut;
                },
                recv(shutdown) -> _ => {
                    self.shut_down();
                    return LifecycleState::ShuttingDown;
                },
            }
        }
    }

    fn shut_down(&self) {
        self.status.set(LifecycleState::ShuttingDown);
        match self.session.current_user() {
            Ok(user) => tracing::info!(
                user = %user.canonical_name,
                display_name = %user.display_name,
                "shutting down, logging out"
            ),
            Err(e) => tracing::warn!(error = %e, "shutting down, current user unavailable"),
        }
        if let Err(e) = self.session.logout() {
            tracing::error!(error = %e, "logout failed");
        }
        self.pipeline.close();
    }
}
