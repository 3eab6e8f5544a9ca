use crate::door::{DoorPosition, TargetOutcome};
use crate::error::{ActuatorError, GatecamError};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::server::ApiState;

/// Requested position, by name or by the framework's numeric code
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    Code(u8),
    Name(DoorPosition),
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TargetRequest {
    pub target: TargetValue,
}

/// Current gate position, `{"status": "open"}`
pub async fn status_handler(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "status": state.door.current_state().as_str() }))
}

pub async fn door_handler(State(state): State<ApiState>) -> Json<Value> {
    let snapshot = state.door.snapshot();
    let last_classification = state
        .pipeline
        .as_ref()
        .and_then(|status| status.lock().last_report.clone());

    Json(json!({
        "current": snapshot.current,
        "current_code": snapshot.current_code,
        "target": snapshot.target,
        "target_code": snapshot.target_code,
        "obstruction_detected": snapshot.obstruction_detected,
        "debounce_streak": snapshot.debounce_streak,
        "last_classification": last_classification,
    }))
}

pub async fn set_target_handler(
    State(state): State<ApiState>,
    Json(request): Json<TargetRequest>,
) -> (StatusCode, Json<Value>) {
    let result = match request.target {
        TargetValue::Code(code) => state.door.set_target_code(code).await,
        TargetValue::Name(position) => state.door.set_target(position).await,
    };

    match result {
        Ok(outcome) => {
            let started = matches!(outcome, TargetOutcome::Started { .. });
            info!(
                "Target write via API: {} ({})",
                state.door.target_state(),
                if started { "started" } else { "unchanged" }
            );
            (
                StatusCode::OK,
                Json(json!({
                    "result": if started { "started" } else { "unchanged" },
                    "current": state.door.current_state(),
                    "target": state.door.target_state(),
                })),
            )
        }
        Err(GatecamError::Actuator(ActuatorError::InvalidTarget { code })) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("invalid target code {}", code) })),
        ),
        Err(e) => {
            warn!("Target write failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

pub async fn stop_handler(State(state): State<ApiState>) -> Json<Value> {
    let previous = state.door.stop();
    info!("Stop requested via API (was {})", previous);
    Json(json!({
        "previous": previous,
        "current": state.door.current_state(),
    }))
}

/// Health endpoint with pipeline counters
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    let pipeline = state.pipeline.as_ref().map(|status| {
        let status = status.lock();
        json!({
            "enabled": status.enabled,
            "source": status.source,
            "stats": status.stats,
        })
    });

    let health_info = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "door": state.door.snapshot(),
        "inference": pipeline,
        "server_info": {
            "subscribers": state.event_bus.subscriber_count(),
        }
    });

    (StatusCode::OK, Json(health_info))
}
