use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;

use crate::api::{ApiError, AppState, run_session};

#[derive(Serialize)]
pub struct PlayerActionResponse {
    pub action: String,
}

#[get("/player/{action}")]
/// Play or pause the loaded track.
pub async fn player_action(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let action = path.into_inner();
    tracing::info!(action = %action, "player request");
    let result = match action.as_str() {
        "play" => run_session(&state, |s| s.play()).await,
        "pause" => run_session(&state, |s| s.pause()).await,
        _ => Err(ApiError::BadRequest(format!("unknown player action: {action}"))),
    };
    match result {
        Ok(()) => HttpResponse::Ok().json(PlayerActionResponse { action }),
        Err(err) => err.into_response(),
    }
}
