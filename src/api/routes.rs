//! Router assembly and shared API state.

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::auth::claims::TokenCodec;
use crate::auth::confirmation::EmailConfirmationSigner;
use crate::auth::credentials::CredentialVerifier;
use crate::auth::middleware::{authenticate, AuthState};
use crate::auth::session::SessionService;
use crate::config::AppConfig;
use crate::services::chat_relay::ChatRelay;
use crate::services::telegram::ChatNotifier;
use crate::storage::repositories::{
    CryptoCoinRepository, ExchangeRepository, NewsRepository, SqlxCryptoCoinRepository,
    SqlxExchangeRepository, SqlxNewsRepository, SqlxUserRepository, UserRepository,
};
use crate::storage::DbPool;

/// Everything the handlers need, shared behind cheap clones.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub news: Arc<dyn NewsRepository>,
    pub exchanges: Arc<dyn ExchangeRepository>,
    pub coins: Arc<dyn CryptoCoinRepository>,
    pub sessions: Arc<SessionService>,
    pub verifier: Arc<CredentialVerifier>,
    pub confirmations: Arc<EmailConfirmationSigner>,
    pub auth: Arc<AuthState>,
    pub notifier: Arc<dyn ChatNotifier>,
    pub relay: Arc<ChatRelay>,
}

impl ApiState {
    pub fn new(config: AppConfig, pool: DbPool, notifier: Arc<dyn ChatNotifier>) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(pool.clone()));
        let codec = Arc::new(TokenCodec::new(&config.auth.jwt_secret));

        let sessions = Arc::new(SessionService::new(
            codec.clone(),
            users.clone(),
            config.auth.access_token_lifetime_seconds,
            config.auth.refresh_token_lifetime_seconds,
        ));
        let verifier = Arc::new(CredentialVerifier::new(users.clone()));
        let confirmations = Arc::new(EmailConfirmationSigner::new(
            &config.auth.jwt_secret,
            config.auth.confirmation_token_max_age_seconds,
        ));
        let auth = Arc::new(AuthState::new(codec, users.clone()));

        Self {
            config: Arc::new(config),
            users,
            news: Arc::new(SqlxNewsRepository::new(pool.clone())),
            exchanges: Arc::new(SqlxExchangeRepository::new(pool.clone())),
            coins: Arc::new(SqlxCryptoCoinRepository::new(pool)),
            sessions,
            verifier,
            confirmations,
            auth,
            notifier,
            relay: Arc::new(ChatRelay::new()),
        }
    }
}

/// Build the application router. Routes that mutate state or expose account
/// data sit behind the bearer-token guard; reads, registration, and the
/// WebSocket entry point (which does its own handshake auth) are public.
pub fn build_router(state: ApiState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/confirm/{token}", get(handlers::auth::confirm))
        .route("/api/users/{id}", get(handlers::users::get_user))
        .route("/api/news", get(handlers::news::list_news))
        .route("/api/news/{id}", get(handlers::news::get_news))
        .route("/api/exchanges", get(handlers::exchanges::list_exchanges))
        .route("/api/exchanges/{id}", get(handlers::exchanges::get_exchange))
        .route("/api/cryptocurrencies", get(handlers::cryptocurrencies::list_coins))
        .route("/api/cryptocurrencies/{id}", get(handlers::cryptocurrencies::get_coin))
        .route("/api/chat/ws", get(handlers::chat::websocket));

    let protected = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/profile", get(handlers::auth::profile))
        .route(
            "/api/users/{id}",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route("/api/news", post(handlers::news::create_news))
        .route(
            "/api/news/{id}",
            put(handlers::news::update_news)
                .patch(handlers::news::update_news)
                .delete(handlers::news::delete_news),
        )
        .route("/api/chat/send", post(handlers::chat::send_message))
        .route_layer(from_fn_with_state(state.auth.clone(), authenticate));

    let mut router = public.merge(protected);
    if state.config.server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
