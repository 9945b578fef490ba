//! HTTP surface: history queries, recording sessions, health and the live event socket

use crate::broadcast::BroadcastHub;
use crate::session::ActiveSession;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::storage::{HistoryStore, SessionStore, StorageError};
use crate::websocket::handle_websocket;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use eeg_core::{
    BandPowerRecord, IngestMode, RawBlockId, RawBlockRecord, SessionRecord, SessionRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn HistoryStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub active_session: Arc<ActiveSession>,
    pub hub: BroadcastHub,
    pub stats: Arc<PipelineStats>,
    pub mode: IngestMode,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handle_websocket))
        .route("/health", get(health_check))
        .route("/api/data", get(list_band_powers))
        .route("/api/latest", get(latest_band_powers))
        .route("/api/blocks/{id}", get(get_raw_block))
        .route("/api/start_session", post(start_session))
        .route("/api/stop_session", post(stop_session))
        .route("/api/sessions", get(list_sessions))
        .route("/api/session_data/{name}", get(session_data))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    mode: IngestMode,
    subscribers: usize,
    session: Option<SessionRecord>,
    stats: StatsSnapshot,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.mode,
        subscribers: state.hub.subscriber_count(),
        session: state.active_session.current(),
        stats: state.stats.snapshot(),
    })
}

async fn list_band_powers(
    State(state): State<AppState>,
) -> Result<Json<Vec<BandPowerRecord>>, ApiError> {
    Ok(Json(state.history.band_history(state.mode).await?))
}

async fn latest_band_powers(
    State(state): State<AppState>,
) -> Result<Json<BandPowerRecord>, ApiError> {
    state
        .history
        .latest_band_powers(state.mode)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("no band powers recorded yet"))
}

async fn get_raw_block(
    State(state): State<AppState>,
    Path(id): Path<RawBlockId>,
) -> Result<Json<RawBlockRecord>, ApiError> {
    state
        .history
        .raw_block(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("raw block not found"))
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    status: &'static str,
    session: Option<SessionRecord>,
}

/// Start recording; blocks formed from now on belong to the new session
async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state.sessions.create_session(&request).await?;
    info!("Recording session {} started ({})", session.id, session.name);

    if let Some(previous) = state.active_session.start(session.clone()) {
        info!("Recording session {} replaced", previous.name);
    }

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            status: "success",
            session: Some(session),
        }),
    ))
}

async fn stop_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.active_session.stop();
    if let Some(session) = &session {
        info!("Recording session {} stopped", session.name);
    }

    Json(SessionResponse {
        status: "success",
        session,
    })
}

async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    Ok(Json(state.sessions.list_sessions().await?))
}

#[derive(Debug, Serialize)]
struct SessionData {
    session: SessionRecord,
    records: Vec<BandPowerRecord>,
}

async fn session_data(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SessionData>, ApiError> {
    let session = state
        .sessions
        .session_by_name(&name)
        .await?
        .ok_or(ApiError::NotFound("session not found"))?;
    let records = state.sessions.session_records(session.id, state.mode).await?;

    Ok(Json(SessionData { session, records }))
}

/// Errors returned to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(e) => {
                error!("Storage request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, PersistenceSink, SessionStore};
    use axum::body::Body;
    use axum::http::Request;
    use eeg_core::BandPowers;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryStore>, mode: IngestMode) -> Router {
        with_session(store, Arc::new(ActiveSession::new()), mode)
    }

    fn with_session(
        store: Arc<MemoryStore>,
        active: Arc<ActiveSession>,
        mode: IngestMode,
    ) -> Router {
        router(AppState {
            history: store.clone(),
            sessions: store,
            active_session: active,
            hub: BroadcastHub::new(4),
            stats: Arc::new(PipelineStats::new()),
            mode,
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let store = Arc::new(MemoryStore::new());
        for alpha in [1.0, 2.0, 3.0] {
            let powers = BandPowers { alpha, ..Default::default() };
            store.persist_block(256, &[0, 1], &powers, None).await.unwrap();
        }

        let (status, body) = get_json(app(store.clone(), IngestMode::Samples), "/api/data").await;
        assert_eq!(status, StatusCode::OK);

        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["alpha"], 3.0);
        assert_eq!(records[0]["raw_block_id"], 3);
        assert_eq!(records[2]["alpha"], 1.0);

        let (status, body) = get_json(app(store, IngestMode::Samples), "/api/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 3);
    }

    #[tokio::test]
    async fn test_latest_without_records_is_not_found() {
        let store = Arc::new(MemoryStore::new());

        let (status, body) = get_json(app(store.clone(), IngestMode::Bands), "/api/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("no band powers"));

        let (status, body) = get_json(app(store, IngestMode::Bands), "/api/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_raw_block_lookup() {
        let store = Arc::new(MemoryStore::new());
        store
            .persist_block(256, &[5, 6, 7], &BandPowers::default(), None)
            .await
            .unwrap();

        let (status, body) = get_json(app(store.clone(), IngestMode::Samples), "/api/blocks/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["samples"], serde_json::json!([5, 6, 7]));

        let (status, _) = get_json(app(store, IngestMode::Samples), "/api/blocks/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_mode() {
        let (status, body) = get_json(app(Arc::new(MemoryStore::new()), IngestMode::Bands), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["mode"], "bands");
        assert_eq!(body["stats"]["blocks_formed"], 0);
    }

    #[tokio::test]
    async fn test_start_session_becomes_active() {
        let store = Arc::new(MemoryStore::new());
        let active = Arc::new(ActiveSession::new());

        let (status, body) = post_json(
            with_session(store.clone(), active.clone(), IngestMode::Samples),
            "/api/start_session",
            serde_json::json!({ "nombre": "Ana", "apellido": "Rivera", "actividad": "reading" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");
        assert_eq!(body["session"]["first_name"], "Ana");
        assert!(body["session"]["name"]
            .as_str()
            .unwrap()
            .starts_with("session_Ana_Rivera_reading_"));
        assert_eq!(active.current_id(), Some(1));

        let (_, health) =
            get_json(with_session(store.clone(), active.clone(), IngestMode::Samples), "/health").await;
        assert_eq!(health["session"]["id"], 1);

        let (status, body) = post_json(
            with_session(store, active.clone(), IngestMode::Samples),
            "/api/stop_session",
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["id"], 1);
        assert!(active.current().is_none());
    }

    #[tokio::test]
    async fn test_sessions_listed_newest_first() {
        let store = Arc::new(MemoryStore::new());
        for first_name in ["Ana", "Luis"] {
            let request = SessionRequest {
                first_name: first_name.to_string(),
                ..Default::default()
            };
            store.create_session(&request).await.unwrap();
        }

        let (status, body) = get_json(app(store, IngestMode::Samples), "/api/sessions").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|session| session["first_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Luis", "Ana"]);
    }

    #[tokio::test]
    async fn test_session_data_returns_tagged_records() {
        let store = Arc::new(MemoryStore::new());
        let session = store.create_session(&SessionRequest::default()).await.unwrap();
        for (alpha, tag) in [(1.0, None), (2.0, Some(session.id)), (3.0, Some(session.id))] {
            let powers = BandPowers { alpha, ..Default::default() };
            store.persist_block(256, &[0], &powers, tag).await.unwrap();
        }

        let uri = format!("/api/session_data/{}", session.name);
        let (status, body) = get_json(app(store.clone(), IngestMode::Samples), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["id"], session.id);
        let alphas: Vec<f64> = body["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["alpha"].as_f64().unwrap())
            .collect();
        assert_eq!(alphas, vec![2.0, 3.0]);

        let (status, body) =
            get_json(app(store, IngestMode::Samples), "/api/session_data/session_missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session not found");
    }
}
