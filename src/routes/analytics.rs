use anyhow::Context;
use axum::{
    Extension,
    extract::{Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::analytics::{self, AnalyticsSummary, DateRange},
    middleware,
    models::{InvoiceEntity, PatientEntity, PrescriptionEntity},
    schema::{invoices, patients, prescriptions},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/analytics",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_summary))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Practice summary over an optional creation-date range.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Analytics"],
    security(("bearerAuth" = [])),
    params(DateRange),
    responses(
        (status = 200, description = "Analytics summary", body = StdResponse<AnalyticsSummary, String>)
    )
)]
async fn get_summary(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Query(range): Query<DateRange>,
) -> Result<impl IntoResponse, AppError> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(AppError::BadRequest("from must not be after to".into()));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patients: Vec<PatientEntity> = patients::table
        .filter(patients::doctor_id.eq(doctor_id))
        .select(PatientEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get patients")?;

    let prescriptions: Vec<PrescriptionEntity> = prescriptions::table
        .filter(prescriptions::doctor_id.eq(doctor_id))
        .select(PrescriptionEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get prescriptions")?;

    let invoices: Vec<InvoiceEntity> = invoices::table
        .filter(invoices::doctor_id.eq(doctor_id))
        .select(InvoiceEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get invoices")?;

    Ok(StdResponse {
        data: Some(analytics::summarize(
            range,
            &patients,
            &prescriptions,
            &invoices,
        )),
        message: Some("Get analytics successfully"),
    })
}
