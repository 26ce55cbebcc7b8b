//! Router-level tests against an in-process engine and hub.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tokio_test::assert_ok;
use tower::ServiceExt;

use swarm_api::{AppState, Hub, build_router};
use swarm_domain::{Drone, DroneStatus, Waypoint};
use swarm_simulator::Engine;

const HOME: Waypoint = Waypoint::new(38.9, -77.0);

fn app() -> (Router, Arc<Engine>) {
    let engine = Arc::new(Engine::from_drones(
        [
            Drone::at_home("DRONE-001", HOME),
            Drone::at_home("DRONE-002", HOME),
            Drone::at_home("DRONE-003", HOME),
        ],
        Duration::from_millis(500),
    ));
    let state = AppState {
        engine: Arc::clone(&engine),
        hub: Arc::new(Hub::new()),
    };
    (build_router(state, &["*".to_string()]), engine)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_drones() {
    let (app, _) = app();
    let (status, body) = send(app, Request::get("/api/drones").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    let drones = body.as_array().unwrap();
    assert_eq!(drones.len(), 3);
    assert_eq!(drones[0]["id"], "DRONE-001");
    assert_eq!(drones[0]["homeLat"], 38.9);
    assert!(drones[0].get("waypoint").is_none());
}

#[tokio::test]
async fn test_get_single_drone() {
    let (app, _) = app();
    let (status, body) =
        send(app.clone(), Request::get("/api/drones/DRONE-002").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "DRONE-002");

    let (status, body) =
        send(app, Request::get("/api/drones/DRONE-404").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_goto_command() {
    let (app, engine) = app();
    let request = post_json(
        "/api/drones/DRONE-001/command",
        &json!({"action": "goto", "waypoint": {"lat": 38.9005, "lng": -77.0}}),
    );
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    let drone = engine.drone("DRONE-001").await.unwrap();
    assert_eq!(drone.status(), DroneStatus::Enroute);
    assert_eq!(drone.waypoint(), Some(Waypoint::new(38.9005, -77.0)));
}

#[tokio::test]
async fn test_command_unknown_drone_is_404_and_changes_nothing() {
    let (app, engine) = app();
    let before = engine.drones().await;

    let (status, body) = send(app, post_json("/api/drones/GHOST/command", &json!({"action": "recall"}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["message"].as_str().unwrap().contains("GHOST"));
    assert_eq!(engine.drones().await, before);
}

#[tokio::test]
async fn test_unknown_action_is_accepted() {
    let (app, engine) = app();
    let before = engine.drones().await;

    let (status, _) = send(app, post_json("/api/drones/DRONE-003/command", &json!({"action": "dance"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(engine.drones().await, before);
}

#[tokio::test]
async fn test_missing_action_is_accepted() {
    let (app, engine) = app();
    let before = engine.drones().await;

    let (status, body) = send(app.clone(), post_json("/api/drones/DRONE-001/command", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, _) = send(
        app,
        post_json("/api/swarm/command", &json!({"waypoint": {"lat": 38.91, "lng": -77.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(engine.drones().await, before);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (app, engine) = app();
    let before = engine.drones().await;

    let request = Request::post("/api/swarm/command")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let (status, _) = send(
        app,
        post_json(
            "/api/drones/DRONE-001/command",
            &json!({"action": "goto", "waypoint": {"lat": 123.0, "lng": 0.0}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(engine.drones().await, before);
}

#[tokio::test]
async fn test_swarm_recall() {
    let (app, engine) = app();
    let (status, body) = send(app, post_json("/api/swarm/command", &json!({"action": "recall"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let drones = engine.drones().await;
    assert!(drones.iter().all(|d| d.status() == DroneStatus::Returning));
}

#[tokio::test]
async fn test_status_and_health() {
    let (app, engine) = app();
    engine.step().await;

    let (status, body) = send(app.clone(), Request::get("/api/status").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tick"], 1);
    assert_eq!(body["drones"], 3);
    assert_eq!(body["operational"], 3);
    assert_eq!(body["subscribers"], 0);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
