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
    domain::catalog::MedicineForm,
    middleware,
    models::MedicineEntity,
    schema::medicines,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/medicines",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_medicines, create_medicine))
            .routes(utoipa_axum::routes!(update_medicine, delete_medicine))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Fetch the doctor's medicine list, alphabetically.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Medicines"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List medicines", body = StdResponse<Vec<MedicineEntity>, String>)
    )
)]
async fn get_medicines(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medicines: Vec<MedicineEntity> = medicines::table
        .filter(medicines::doctor_id.eq(doctor_id))
        .order(medicines::name.asc())
        .select(MedicineEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get medicines")?;

    Ok(StdResponse {
        data: Some(medicines),
        message: Some("Get medicines successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Medicines"],
    security(("bearerAuth" = [])),
    request_body = MedicineForm,
    responses(
        (status = 200, description = "Medicine added", body = StdResponse<MedicineEntity, String>)
    )
)]
async fn create_medicine(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<MedicineForm>,
) -> Result<impl IntoResponse, AppError> {
    let new_medicine = body.into_entity(doctor_id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medicine: MedicineEntity = diesel::insert_into(medicines::table)
        .values(new_medicine)
        .returning(MedicineEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create medicine")?;

    Ok(StdResponse {
        data: Some(medicine),
        message: Some("Medicine added successfully"),
    })
}

#[utoipa::path(
    put,
    path = "/{id}",
    tags = ["Medicines"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Medicine ID to update")
    ),
    request_body = MedicineForm,
    responses(
        (status = 200, description = "Medicine updated", body = StdResponse<MedicineEntity, String>),
        (status = 404, description = "Medicine not found")
    )
)]
async fn update_medicine(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<MedicineForm>,
) -> Result<impl IntoResponse, AppError> {
    let changeset = body.into_changeset()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medicine: MedicineEntity = diesel::update(
        medicines::table
            .find(id)
            .filter(medicines::doctor_id.eq(doctor_id)),
    )
    .set(&changeset)
    .returning(MedicineEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(medicine),
        message: Some("Medicine updated successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Medicines"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Medicine ID to delete")
    ),
    responses(
        (status = 200, description = "Medicine deleted", body = StdResponse<MedicineEntity, String>),
        (status = 404, description = "Medicine not found")
    )
)]
async fn delete_medicine(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medicine: MedicineEntity = diesel::delete(
        medicines::table
            .find(id)
            .filter(medicines::doctor_id.eq(doctor_id)),
    )
    .returning(MedicineEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(medicine),
        message: Some("Medicine deleted successfully"),
    })
}
