//! REST surface of the wake-up game: accounts, wake-up challenges and
//! scores, the friend graph, the social feed and notification settings.

pub mod auth;
pub mod convert;
pub mod error;
pub mod feed;
pub mod friends;
pub mod middleware;
pub mod notifications;
pub mod wakeup;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tracing::error;

use shame_db::Database;
use shame_engine::GameConfig;
use shame_gateway::Dispatcher;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub config: GameConfig,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: String, config: GameConfig) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret,
            dispatcher: Dispatcher::new(),
            config,
        })
    }
}

/// Runs blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
}

async fn health() -> &'static str {
    "ok"
}

/// Every REST route. The WebSocket gateway is mounted by the server.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(auth::me).patch(auth::update_profile))
        .route("/users/search", get(auth::search_users))
        .route("/users/{id}", get(auth::get_user))
        .route("/wakeup/challenge", post(wakeup::issue_challenge))
        .route("/wakeup/answer", post(wakeup::submit_answer))
        .route("/wakeup/today", get(wakeup::today))
        .route("/wakeups", get(wakeup::wake_up_history))
        .route("/scores", get(wakeup::score_history))
        .route("/friends", get(friends::list_friends))
        .route(
            "/friends/requests",
            get(friends::list_requests).post(friends::send_request),
        )
        .route("/friends/requests/{id}", delete(friends::cancel_request))
        .route("/friends/requests/{id}/accept", post(friends::accept_request))
        .route("/friends/requests/{id}/reject", post(friends::reject_request))
        .route("/friends/{user_id}", delete(friends::remove_friend))
        .route("/friends/{user_id}/status", get(friends::friendship_status))
        .route("/friends/{user_id}/shame", post(feed::shame))
        .route("/feed", get(feed::get_feed))
        .route(
            "/feed/{id}/reaction",
            put(feed::react).delete(feed::unreact),
        )
        .route("/feed/{id}/comments", post(feed::comment))
        .route("/notifications/token", put(notifications::set_push_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    public.merge(protected).with_state(state)
}
