//! Track load, search and playlist handlers.

use actix_web::{HttpResponse, Responder, get, web};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState, run_session};
use crate::session::{PlaylistKind, SearchOptions, Track};

#[derive(Serialize)]
pub struct TrackSummary {
    pub name: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl From<Track> for TrackSummary {
    fn from(track: Track) -> Self {
        Self {
            name: track.name,
            link: track.link,
            duration_ms: track.duration_ms,
        }
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub tracks: Vec<TrackSummary>,
}

/// Optional paging for `/search`.
#[derive(Deserialize)]
pub struct SearchParams {
    pub offset: Option<usize>,
    pub count: Option<usize>,
}

#[derive(Serialize)]
pub struct PlaylistSummary {
    pub name: String,
}

#[derive(Serialize)]
pub struct PlaylistsResponse {
    pub playlists: Vec<PlaylistSummary>,
}

#[get("/load/{track_id}")]
/// Resolve a track link and load it into the player (paused).
pub async fn load_track(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let link = path.into_inner();
    tracing::info!(link = %link, "load request");
    let result = run_session(&state, move |s| {
        let parsed = s.parse_link(&link)?;
        s.track(&parsed)
    })
    .await;
    let track = match result {
        Ok(track) => track,
        Err(err) => return err.into_response(),
    };

    let to_load = track.clone();
    if let Err(err) = run_session(&state, move |s| s.load(&to_load)).await {
        let err = match err {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => ApiError::Internal(msg),
            other => other,
        };
        return err.into_response();
    }
    tracing::info!(track = %track.name, "track loaded");
    HttpResponse::Ok().json(TrackSummary::from(track))
}

#[get("/search/{name}")]
/// Search tracks by name.
pub async fn search_tracks(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<SearchParams>,
) -> impl Responder {
    let name = path.into_inner();
    let defaults = SearchOptions::default();
    let options = SearchOptions {
        offset: query.offset.unwrap_or(defaults.offset),
        count: query.count.unwrap_or(defaults.count),
    };
    tracing::info!(query = %name, offset = options.offset, count = options.count, "search request");
    match run_session(&state, move |s| s.search(&name, options)).await {
        Ok(results) => HttpResponse::Ok().json(SearchResponse {
            query: results.query,
            total: results.total,
            tracks: results.tracks.into_iter().map(TrackSummary::from).collect(),
        }),
        Err(err) => err.into_response(),
    }
}

#[get("/playlists")]
/// List playlists, leaving out folders.
pub async fn list_playlists(state: web::Data<AppState>) -> impl Responder {
    match run_session(&state, |s| s.playlists()).await {
        Ok(entries) => HttpResponse::Ok().json(PlaylistsResponse {
            playlists: entries
                .into_iter()
                .filter(|e| e.kind == PlaylistKind::Playlist)
                .map(|e| PlaylistSummary { name: e.name })
                .collect(),
        }),
        Err(err) => err.into_response(),
    }
}
