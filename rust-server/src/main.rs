use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

mod config;
mod db;

use config::ServerConfig;
use db::Database;

// ============================================================================
// App State
// ============================================================================

/// Auth token -> (account id, username)
type AuthSessions = Arc<DashMap<String, (i64, String)>>;

#[derive(Clone)]
struct AppState {
    db: Arc<Database>,
    auth_sessions: AuthSessions,
}

impl AppState {
    fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            auth_sessions: Arc::new(DashMap::new()),
        }
    }
}

// ============================================================================
// HTTP Handlers - Auth
// ============================================================================

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    success: bool,
    token: Option<String>,
    username: Option<String>,
    error: Option<String>,
}

impl AuthResponse {
    fn ok(token: String, username: String) -> Self {
        Self {
            success: true,
            token: Some(token),
            username: Some(username),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            username: None,
            error: Some(error.into()),
        }
    }
}

async fn register_account(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    // Validate input
    if req.username.len() < 3 {
        return Json(AuthResponse::failed("Username must be at least 3 characters"));
    }
    if req.password.len() < 6 {
        return Json(AuthResponse::failed("Password must be at least 6 characters"));
    }

    match state.db.create_account(&req.username, &req.password).await {
        Ok(account_id) => {
            let token = issue_token(&state.auth_sessions, account_id, &req.username);

            info!("Account registered: {} (id: {})", req.username, account_id);
            Json(AuthResponse::ok(token, req.username))
        }
        Err(e) => Json(AuthResponse::failed(e)),
    }
}

async fn login_account(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    match state.db.verify_password(&req.username, &req.password).await {
        Some(account) => {
            let token = issue_token(&state.auth_sessions, account.id, &account.username);

            info!("Account logged in: {} (id: {})", account.username, account.id);
            Json(AuthResponse::ok(token, account.username))
        }
        None => {
            warn!("Failed login attempt for '{}'", req.username);
            Json(AuthResponse::failed("Invalid username or password"))
        }
    }
}

async fn logout_account(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        state.auth_sessions.remove(token);
    }
    Json(serde_json::json!({ "success": true }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// New bearer token for the account; any token it held before stops working
fn issue_token(sessions: &AuthSessions, account_id: i64, username: &str) -> String {
    sessions.retain(|_, (id, _)| *id != account_id);
    let token = Uuid::new_v4().to_string();
    sessions.insert(token.clone(), (account_id, username.to_string()));
    token
}

/// Helper to extract the account behind the bearer token
fn extract_auth(headers: &HeaderMap, sessions: &AuthSessions) -> Option<(i64, String)> {
    let token = bearer_token(headers)?;
    sessions.get(token).map(|r| r.value().clone())
}

// ============================================================================
// HTTP Handlers - Saves
// ============================================================================

#[derive(Deserialize)]
struct SaveRequest {
    #[serde(rename = "gameState")]
    game_state: serde_json::Value,
}

#[derive(Serialize)]
struct SaveResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl SaveResponse {
    fn failed(status: StatusCode, error: &str) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: false,
                error: Some(error.to_string()),
            }),
        )
    }
}

#[derive(Serialize)]
struct LoadResponse {
    #[serde(rename = "gameState", skip_serializing_if = "Option::is_none")]
    game_state: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl LoadResponse {
    fn failed(status: StatusCode, error: &str) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                game_state: None,
                error: Some(error.to_string()),
            }),
        )
    }
}

/// POST /api/save - Replace the account's save with the posted game state
async fn save_game(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SaveRequest>,
) -> (StatusCode, Json<SaveResponse>) {
    let Some((account_id, username)) = extract_auth(&headers, &state.auth_sessions) else {
        return SaveResponse::failed(StatusCode::UNAUTHORIZED, "Not authenticated");
    };

    if !req.game_state.is_object() {
        return SaveResponse::failed(StatusCode::BAD_REQUEST, "gameState must be an object");
    }

    let json = req.game_state.to_string();
    match state.db.save_game(account_id, &json).await {
        Ok(()) => {
            info!("Saved game for {} ({} bytes)", username, json.len());
            (
                StatusCode::OK,
                Json(SaveResponse {
                    success: true,
                    error: None,
                }),
            )
        }
        Err(e) => {
            error!("Failed to save game for {}: {}", username, e);
            SaveResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save game")
        }
    }
}

/// GET /api/load - The account's save, if any
async fn load_game(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<LoadResponse>) {
    let Some((account_id, username)) = extract_auth(&headers, &state.auth_sessions) else {
        return LoadResponse::failed(StatusCode::UNAUTHORIZED, "Not authenticated");
    };

    let stored = match state.db.load_game(account_id).await {
        Ok(stored) => stored,
        Err(e) => {
            error!("Failed to load game for {}: {}", username, e);
            return LoadResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load game");
        }
    };

    let game_state = match stored.as_deref().map(serde_json::from_str::<serde_json::Value>) {
        None => None,
        Some(Ok(value)) => Some(value),
        Some(Err(e)) => {
            error!("Stored save for {} is corrupt: {}", username, e);
            return LoadResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, "Stored save is corrupt");
        }
    };

    (
        StatusCode::OK,
        Json(LoadResponse {
            game_state,
            error: None,
        }),
    )
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Router
// ============================================================================

fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication
        .route("/api/register", post(register_account))
        .route("/api/login", post(login_account))
        .route("/api/logout", post(logout_account))
        // Saves
        .route("/api/save", post(save_game))
        .route("/api/load", get(load_game))
        // Browser clients call from another origin
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ]),
        )
        .with_state(state)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "survival_server=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    let app = build_router(AppState::new(db));

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    info!("Save server listening on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
