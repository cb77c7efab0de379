use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_admin, require_user, ApiResponse, ApiResult};
use crate::services::{AvailabilityService, CertificateRenderer, Mailer, MidValidator};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub availability: AvailabilityService,
    pub tokens: TokenIssuer,
    pub mids: Arc<MidValidator>,
    pub mailer: Arc<dyn Mailer>,
    pub certificates: Arc<dyn CertificateRenderer>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        certificates: Arc<dyn CertificateRenderer>,
    ) -> Self {
        let cache = Arc::new(TtlCache::new(config.cache.expiration));

        Self {
            availability: AvailabilityService::new(
                store.clone(),
                cache,
                config.reservation_expiration,
            ),
            store,
            tokens: TokenIssuer::new(&config.session.jwt_signature, config.session.expire),
            mids: Arc::new(MidValidator::new(config.elements.clone())),
            mailer,
            certificates,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let user = || from_fn_with_state(state.clone(), require_user);
    let admin = || from_fn_with_state(state.clone(), require_admin);

    Router::new()
        .route("/health", get(health))
        // Public
        .route("/api/welcome", get(public::welcome))
        .route("/api/login", post(public::login))
        .route("/api/logout", get(public::logout))
        .route(
            "/api/elements",
            get(public::elements_get).post(public::elements_post).merge(
                patch(protected::elements_patch)
                    .delete(protected::elements_delete)
                    .route_layer(user()),
            ),
        )
        // Logged-in users
        .route(
            "/api/reservations",
            get(protected::reservations_get)
                .post(protected::reservations_post)
                .patch(protected::reservations_patch)
                .delete(protected::reservations_delete)
                .route_layer(user()),
        )
        .route(
            "/api/sponsorships",
            get(protected::sponsorships_get)
                .patch(protected::sponsorships_patch)
                .delete(protected::sponsorships_delete)
                .route_layer(user()),
        )
        .route(
            "/api/certificates",
            get(protected::certificates_get).route_layer(user()),
        )
        .route(
            "/api/user/password",
            patch(protected::password_patch).route_layer(user()),
        )
        // Admin
        .route(
            "/api/users",
            get(elevated::users_get)
                .post(elevated::users_post)
                .patch(elevated::users_patch)
                .delete(elevated::users_delete)
                .route_layer(admin()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.store.ping().await.map_err(|e| {
        tracing::error!("health check failed: {}", e);
        ApiError::service_unavailable("Database temporarily unavailable")
    })?;

    Ok(ApiResponse::success(json!({ "status": "ok" })))
}
