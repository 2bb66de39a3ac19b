//! HTTP API handlers.
//!
//! Defines the Actix routes for player control, track lookup/search, playlists
//! and health. Session calls may block, so handlers run them on the blocking
//! pool through [`run_session`].

pub mod health;
pub mod player;
pub mod tracks;

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use serde::Serialize;
use spotbot_audio::status::PipelineHealth;

use crate::lifecycle::LifecycleStatus;
use crate::session::{MusicSession, SessionError};

pub use health::health_check;
pub use player::player_action;
pub use tracks::{list_playlists, load_track, search_tracks};

/// Shared handler state.
pub struct AppState {
    pub session: Arc<dyn MusicSession>,
    pub pipeline: Arc<PipelineHealth>,
    pub lifecycle: Arc<LifecycleStatus>,
}

/// Register every route on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(player_action)
        .service(load_track)
        .service(search_tracks)
        .service(list_playlists)
        .service(health_check);
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn into_response(self) -> HttpResponse {
        let (mut builder, error) = match self {
            ApiError::BadRequest(error) => (HttpResponse::BadRequest(), error),
            ApiError::NotFound(error) => (HttpResponse::NotFound(), error),
            ApiError::Internal(error) => (HttpResponse::InternalServerError(), error),
        };
        builder.json(ErrorBody { error })
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidLink(_) => ApiError::BadRequest(err.to_string()),
            SessionError::TrackNotFound(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Run a session call on the blocking pool.
pub async fn run_session<T, F>(state: &web::Data<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn MusicSession) -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    let session = state.session.clone();
    web::block(move || f(session.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}
