use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use spotbot_audio::status::PumpState;

use crate::api::AppState;

#[derive(Serialize)]
pub struct PipelineStatus {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub chunks_accepted: u64,
    pub chunks_dropped: u64,
    pub samples_written: u64,
    pub reconfigurations: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session: &'static str,
    pub pipeline: PipelineStatus,
}

/// Session state and audio pipeline health. 503 once the pump has failed.
#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.pipeline.snapshot();
    let reason = match &snapshot.state {
        PumpState::Failed(reason) => Some(reason.clone()),
        _ => None,
    };
    let failed = reason.is_some();
    let body = HealthResponse {
        status: if failed { "degraded" } else { "ok" },
        session: state.lifecycle.state().label(),
        pipeline: PipelineStatus {
            state: snapshot.state.label(),
            reason,
            chunks_accepted: snapshot.chunks_accepted,
            chunks_dropped: snapshot.chunks_dropped,
            samples_written: snapshot.samples_written,
            reconfigurations: snapshot.reconfigurations,
        },
    };
    if failed {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}
