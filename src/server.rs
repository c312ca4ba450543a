//! HTTP question-answering surface (`cqa serve`).
//!
//! Loads the document once at startup, then serves questions against it.
//! Questions are serialized through the session lock, so at most one
//! chat-completion request is in flight.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Ask a question: `{ "question": "..." }` |
//! | `GET`  | `/history` | Most recent Q&A plus all of them, newest first |
//! | `GET`  | `/health` | Health check (returns version and model) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (502),
//! `bad_upstream_response` (502).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::{Answerer, TogetherClient};
use crate::config::Config;
use crate::error::AnswerError;
use crate::models::QaPair;
use crate::progress::ProgressMode;
use crate::session::Session;

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
    answerer: Arc<dyn Answerer>,
}

/// `cqa serve`: load the document, then bind to `[server].bind`.
pub async fn run_server(
    config: &Config,
    page_id: Option<&str>,
    progress: ProgressMode,
) -> anyhow::Result<()> {
    let answerer = Arc::new(TogetherClient::from_config(config)?);
    let document = crate::confluence::load_document(config, page_id, progress).await?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Listening on http://{}", listener.local_addr()?);

    serve(listener, Session::new(document), answerer).await
}

/// Serve `session` on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    session: Session,
    answerer: Arc<dyn Answerer>,
) -> anyhow::Result<()> {
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
        answerer,
    };
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/history", get(handle_history))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AnswerError> for AppError {
    fn from(err: AnswerError) -> Self {
        let (status, code) = match &err {
            AnswerError::EmptyQuestion => (StatusCode::BAD_REQUEST, "bad_request"),
            AnswerError::Request(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            AnswerError::ResponseShape(_) => (StatusCode::BAD_GATEWAY, "bad_upstream_response"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.answerer.model_name().to_string(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<QaPair>, AppError> {
    let mut session = state.session.lock().await;
    let pair = session
        .ask(state.answerer.as_ref(), &req.question)
        .await?
        .clone();
    Ok(Json(pair))
}

// ============ GET /history ============

#[derive(Serialize)]
struct HistoryResponse {
    latest: Option<QaPair>,
    history: Vec<QaPair>,
}

async fn handle_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let session = state.session.lock().await;
    Json(HistoryResponse {
        latest: session.latest().cloned(),
        history: session.history().cloned().collect(),
    })
}
