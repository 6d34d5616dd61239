use crate::{
    auth::{enforce_gates, Gate, GateChain, Gatekeeper},
    handlers::users,
    middleware::{
        cors_layer, error_boundary, health_check, panic_layer, propagate_request_id_layer,
        request_id_layer, trace_layer,
    },
    models::Scope,
    state::AppState,
};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// Build the application router with its gate pipelines
pub fn create_app(state: AppState) -> anyhow::Result<Router> {
    let gatekeeper = Arc::new(Gatekeeper::new(
        state.api_keys.clone(),
        state.users.clone(),
        state.codec.clone(),
        &state.config,
    )?);

    let keyed = Arc::new(GateChain::new(
        gatekeeper.clone(),
        [Gate::ApiKey, Gate::Scope(Scope::General)],
    ));
    let user_protected = Arc::new(GateChain::new(
        gatekeeper,
        [Gate::ApiKey, Gate::Scope(Scope::General), Gate::Session],
    ));

    // API key + scope
    let keyed_routes = Router::new()
        .route("/api/users", post(users::register))
        .route("/api/users/auth", post(users::login))
        .route("/api/users/logout", post(users::logout))
        .route_layer(from_fn_with_state(keyed, enforce_gates));

    // API key + scope + session
    let session_routes = Router::new()
        .route("/api/users/profile", get(users::profile))
        .route_layer(from_fn_with_state(user_protected, enforce_gates));

    let public_routes = Router::new().route("/health", get(health_check));

    let app = Router::new()
        .merge(public_routes)
        .merge(keyed_routes)
        .merge(session_routes)
        .layer(
            ServiceBuilder::new()
                // Request tracing
                .layer(trace_layer())
                // Request ID
                .layer(request_id_layer())
                .layer(propagate_request_id_layer())
                // CORS
                .layer(cors_layer(&state.config))
                // Error logging and development detail
                .layer(from_fn_with_state(state.config.clone(), error_boundary))
                // Panics become 500s
                .layer(panic_layer()),
        )
        .with_state(state);

    Ok(app)
}
