use axum::{Router, response::IntoResponse, routing};
use tower_http::trace::TraceLayer;

use crate::{app_error::StdResponse, app_state::AppState};

pub mod aliases;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod domain;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schema;
pub mod swagger;

async fn health() -> impl IntoResponse {
    StdResponse {
        data: Some("ok"),
        message: Some("ClinicService is up"),
    }
}

/// Assembles the API routes, their OpenAPI document and the Swagger UI.
pub fn build_router(state: AppState) -> Router {
    let routes = routes::routes_with_openapi(state.clone());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Nexus ClinicService API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();
    swagger::add_bearer_security(&mut openapi);
    let swagger_ui = swagger::create_swagger_ui(openapi);

    Router::new()
        .route("/health", routing::get(health))
        .merge(routes)
        .merge(swagger_ui)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
