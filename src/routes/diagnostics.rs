use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::catalog::DiagnosticTestForm,
    middleware,
    models::DiagnosticTestEntity,
    schema::diagnostic_tests,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/diagnostics",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_diagnostic_tests, create_diagnostic_test))
            .routes(utoipa_axum::routes!(update_diagnostic_test, delete_diagnostic_test))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Fetch the doctor's diagnostic test list, alphabetically.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Diagnostics"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List diagnostic tests", body = StdResponse<Vec<DiagnosticTestEntity>, String>)
    )
)]
async fn get_diagnostic_tests(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let tests: Vec<DiagnosticTestEntity> = diagnostic_tests::table
        .filter(diagnostic_tests::doctor_id.eq(doctor_id))
        .order(diagnostic_tests::test_name.asc())
        .select(DiagnosticTestEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get diagnostic tests")?;

    Ok(StdResponse {
        data: Some(tests),
        message: Some("Get diagnostic tests successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Diagnostics"],
    security(("bearerAuth" = [])),
    request_body = DiagnosticTestForm,
    responses(
        (status = 200, description = "Diagnostic test added", body = StdResponse<DiagnosticTestEntity, String>)
    )
)]
async fn create_diagnostic_test(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<DiagnosticTestForm>,
) -> Result<impl IntoResponse, AppError> {
    let new_test = body.into_entity(doctor_id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let test: DiagnosticTestEntity = diesel::insert_into(diagnostic_tests::table)
        .values(new_test)
        .returning(DiagnosticTestEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create diagnostic test")?;

    Ok(StdResponse {
        data: Some(test),
        message: Some("Diagnostic test added successfully"),
    })
}

#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Diagnostics"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Diagnostic test ID to update")
    ),
    request_body = DiagnosticTestForm,
    responses(
        (status = 200, description = "Diagnostic test updated", body = StdResponse<DiagnosticTestEntity, String>),
        (status = 404, description = "Diagnostic test not found")
    )
)]
async fn update_diagnostic_test(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<DiagnosticTestForm>,
) -> Result<impl IntoResponse, AppError> {
    let fields = body.into_entity(doctor_id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let test: DiagnosticTestEntity = diesel::update(
        diagnostic_tests::table
            .find(id)
            .filter(diagnostic_tests::doctor_id.eq(doctor_id)),
    )
    .set((
        diagnostic_tests::test_name.eq(fields.test_name),
        diagnostic_tests::instructions.eq(fields.instructions),
        diagnostic_tests::updated_at.eq(diesel::dsl::now),
    ))
    .returning(DiagnosticTestEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(test),
        message: Some("Diagnostic test updated successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Diagnostics"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Diagnostic test ID to delete")
    ),
    responses(
        (status = 200, description = "Diagnostic test deleted", body = StdResponse<DiagnosticTestEntity, String>),
        (status = 404, description = "Diagnostic test not found")
    )
)]
async fn delete_diagnostic_test(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let test: DiagnosticTestEntity = diesel::delete(
        diagnostic_tests::table
            .find(id)
            .filter(diagnostic_tests::doctor_id.eq(doctor_id)),
    )
    .returning(DiagnosticTestEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(test),
        message: Some("Diagnostic test deleted successfully"),
    })
}
