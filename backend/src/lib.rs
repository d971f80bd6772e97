pub mod auth;
pub mod config;
pub mod error;
mod route;
pub mod schema;
pub mod service;
pub mod store;
pub mod validation;

use crate::auth::{AuthorizationGate, CredentialStore, TokenService};
use crate::service::{ParticipationEngine, QuestRepository, UserDirectory};
use crate::store::Store;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use common::ApiError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Body of every JSON reply: either the value itself or `{"error": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiResponse<T> {
    #[serde(rename = "error")]
    Error(ApiError),
    #[serde(untagged)]
    Response(T),
}

pub struct AppState {
    pub gate: Arc<AuthorizationGate>,
    pub users: UserDirectory,
    pub quests: QuestRepository,
    pub participation: ParticipationEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, credentials: CredentialStore) -> Self {
        let gate = Arc::new(AuthorizationGate::new(tokens));
        Self {
            users: UserDirectory::new(store.clone(), credentials, gate.clone()),
            quests: QuestRepository::new(store.clone()),
            participation: ParticipationEngine::new(store),
            gate,
        }
    }
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(route::health))
        .route("/signup", post(route::signup::sign_up))
        .route("/login", post(route::login::log_in))
        .route("/logout", post(route::logout::log_out))
        .route(
            "/users/userName",
            get(route::get_user_name::get_user_name).put(route::update_user_name::update_user_name),
        )
        .route("/users/userInfo", get(route::get_user_info::get_user_info))
        .route("/users/me", delete(route::delete_account::delete_account))
        .route(
            "/quests",
            get(route::get_quests::get_all_quests).post(route::create_quest::create_quest),
        )
        .route("/quests/created", get(route::get_created_quests::get_created_quests))
        .route("/quests/joined", get(route::get_joined_quests::get_joined_quests))
        .route(
            "/quests/{id}",
            get(route::get_quest_info::get_quest_info)
                .put(route::update_quest::update_quest)
                .delete(route::delete_quest::delete_quest),
        )
        .route("/quests/join/{id}", post(route::quests_join::quest_join))
        .route("/quests/cancel/{id}", delete(route::quests_cancel::quest_cancel))
        .layer(cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
