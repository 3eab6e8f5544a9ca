use super::handlers::{
    door_handler, health_handler, set_target_handler, status_handler, stop_handler,
};
use super::*;
use crate::config::{ApiConfig, GatecamConfig};
use crate::door::{DoorController, DoorPosition, MockRelay};
use crate::error::ApiError;
use crate::events::EventBus;
use crate::pipeline::PipelineStatus;
use axum::{extract::State, http::StatusCode, Json};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn create_test_state(initial: DoorPosition) -> (ApiState, MockRelay) {
    let mut config = GatecamConfig::default().door;
    config.initial_state = initial;
    config.pulse_ms = 1;

    let relay = MockRelay::new();
    let event_bus = Arc::new(EventBus::new(16));
    let door = DoorController::new(&config, Arc::new(relay.clone()), Arc::clone(&event_bus));
    let pipeline = Arc::new(Mutex::new(PipelineStatus {
        enabled: true,
        source: "test".to_string(),
        ..PipelineStatus::default()
    }));

    (ApiState::new(door, Some(pipeline), event_bus), relay)
}

fn target_request(json: &str) -> TargetRequest {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_target_request_forms() {
    assert!(matches!(
        target_request(r#"{"target": "open"}"#).target,
        TargetValue::Name(DoorPosition::Open)
    ));
    assert!(matches!(
        target_request(r#"{"target": 1}"#).target,
        TargetValue::Code(1)
    ));
    assert!(serde_json::from_str::<TargetRequest>(r#"{"target": "ajar"}"#).is_err());
}

#[tokio::test]
async fn test_status_reports_current_position() {
    let (state, _relay) = create_test_state(DoorPosition::Closed);

    let Json(body) = status_handler(State(state)).await;
    assert_eq!(body["status"], "closed");
}

#[tokio::test]
async fn test_target_write_by_name_starts_transition() {
    let (state, relay) = create_test_state(DoorPosition::Closed);

    let (status, Json(body)) = set_target_handler(
        State(state.clone()),
        Json(target_request(r#"{"target": "open"}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "started");
    assert_eq!(body["current"], "opening");
    assert_eq!(relay.pulse_count(), 1);

    let Json(door) = door_handler(State(state)).await;
    assert_eq!(door["current_code"], 2);
    assert_eq!(door["target_code"], 0);
    assert_eq!(door["obstruction_detected"], false);
    assert!(door["last_classification"].is_null());
}

#[tokio::test]
async fn test_target_write_by_code_is_idempotent() {
    let (state, relay) = create_test_state(DoorPosition::Closed);

    let (status, Json(body)) = set_target_handler(
        State(state),
        Json(target_request(r#"{"target": 1}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unchanged");
    assert_eq!(relay.pulse_count(), 0);
}

#[tokio::test]
async fn test_invalid_target_code_rejected() {
    let (state, relay) = create_test_state(DoorPosition::Closed);

    let (status, Json(body)) = set_target_handler(
        State(state),
        Json(target_request(r#"{"target": 7}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains('7'));
    assert_eq!(relay.pulse_count(), 0);
}

#[tokio::test]
async fn test_stop_handler() {
    let (state, _relay) = create_test_state(DoorPosition::Open);

    let Json(body) = stop_handler(State(state.clone())).await;
    assert_eq!(body["previous"], "open");
    assert_eq!(body["current"], "stopped");

    let Json(status) = status_handler(State(state)).await;
    assert_eq!(status["status"], "stopped");
}

#[tokio::test]
async fn test_health_includes_pipeline() {
    let (state, _relay) = create_test_state(DoorPosition::Closed);

    let (status, Json(body)) = health_handler(State(state)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["inference"]["enabled"], true);
    assert_eq!(body["inference"]["stats"]["cycles"], 0);
    assert_eq!(body["door"]["current"], "closed");
}

#[tokio::test]
async fn test_bind_failure_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let (state, _relay) = create_test_state(DoorPosition::Closed);

    let server = ApiServer::new(
        ApiConfig {
            enabled: true,
            ip: "127.0.0.1".to_string(),
            port,
        },
        state,
    );

    let result = server.serve(CancellationToken::new()).await;
    assert!(matches!(result, Err(ApiError::BindFailed { .. })));
}

#[tokio::test]
async fn test_server_stops_on_cancellation() {
    let (state, _relay) = create_test_state(DoorPosition::Closed);
    let server = ApiServer::new(
        ApiConfig {
            enabled: true,
            ip: "127.0.0.1".to_string(),
            port: 0,
        },
        state,
    );

    let token = CancellationToken::new();
    token.cancel();
    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        server.serve(token),
    )
    .await
    .unwrap();
    assert!(result.is_ok());
}
