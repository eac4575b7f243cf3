use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{audit, decisions, grants, health, resources, roles, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let role_routes = Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/:role_id",
            get(roles::get_role).put(roles::update_role).delete(roles::delete_role),
        )
        .route("/:role_id/overrides", get(roles::list_overrides).put(roles::set_override))
        .route("/:role_id/overrides/:permission", delete(roles::remove_override));

    let user_routes = Router::new()
        .route("/", post(users::create_user))
        .route("/:user_id", get(users::get_user))
        .route("/:user_id/role", post(users::assign_role).delete(users::unassign_role))
        .route("/:user_id/effective-permissions", get(users::effective_permissions));

    let resource_routes = Router::new()
        .route("/", post(resources::register_resource))
        .route("/:resource_type/:resource_id", get(resources::get_resource))
        .route("/:resource_type/:resource_id/transfer", post(resources::transfer_resource))
        .route(
            "/:resource_type/:resource_id/grants",
            get(grants::list_grants).post(grants::create_grant),
        )
        .route("/:resource_type/:resource_id/grants/:user_id", delete(grants::revoke_grant));

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/decide", post(decisions::decide))
        .nest("/roles", role_routes)
        .nest("/users", user_routes)
        .nest("/resources", resource_routes)
        .route("/audit", get(audit::list_audit))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
