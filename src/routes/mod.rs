use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod diagnostics;
pub mod invoices;
pub mod medicines;
pub mod patients;
pub mod prescriptions;
pub mod profile;

/// Every route group of the service, each guarding its own protected routes.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    auth::routes_with_openapi(state.clone())
        .merge(profile::routes_with_openapi(state.clone()))
        .merge(patients::routes_with_openapi(state.clone()))
        .merge(prescriptions::routes_with_openapi(state.clone()))
        .merge(appointments::routes_with_openapi(state.clone()))
        .merge(invoices::routes_with_openapi(state.clone()))
        .merge(analytics::routes_with_openapi(state.clone()))
        .merge(medicines::routes_with_openapi(state.clone()))
        .merge(diagnostics::routes_with_openapi(state))
}
