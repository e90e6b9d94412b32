use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, PgTextExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{
        patients::{PatientForm, validate_patient_patch},
        search::{Page, PatientSearch, contains_pattern},
    },
    middleware,
    models::{PatientEntity, UpdatePatientEntity},
    schema::patients,
};

const SUGGESTION_LIMIT: i64 = 5;

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/patients",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_patients, create_patient))
            .routes(utoipa_axum::routes!(suggest_patients))
            .routes(utoipa_axum::routes!(search_patients))
            .routes(utoipa_axum::routes!(get_patient, update_patient, delete_patient))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Fetch all of the doctor's patients, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List patients", body = StdResponse<Vec<PatientEntity>, String>)
    )
)]
async fn get_patients(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patients: Vec<PatientEntity> = patients::table
        .filter(patients::doctor_id.eq(doctor_id))
        .order(patients::created_at.desc())
        .select(PatientEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get patients")?;

    Ok(StdResponse {
        data: Some(patients),
        message: Some("Get patients successfully"),
    })
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
struct SuggestQuery {
    /// Phone fragment typed so far.
    phone: Option<String>,
}

/// Phone-number autocomplete used by the prescription pad.
#[utoipa::path(
    get,
    path = "/suggest",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    params(SuggestQuery),
    responses(
        (status = 200, description = "Matching patients", body = StdResponse<Vec<PatientEntity>, String>)
    )
)]
async fn suggest_patients(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Query(query): Query<SuggestQuery>,
) -> Result<impl IntoResponse, AppError> {
    let fragment = query.phone.as_deref().map(str::trim).unwrap_or_default();
    if fragment.is_empty() {
        return Ok(StdResponse {
            data: Some(Vec::new()),
            message: Some("No phone fragment given"),
        });
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patients: Vec<PatientEntity> = patients::table
        .filter(patients::doctor_id.eq(doctor_id))
        .filter(patients::phone.ilike(contains_pattern(fragment)))
        .order(patients::created_at.desc())
        .limit(SUGGESTION_LIMIT)
        .select(PatientEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to suggest patients")?;

    Ok(StdResponse {
        data: Some(patients),
        message: Some("Get suggestions successfully"),
    })
}

/// Manage-patients search with pagination.
#[utoipa::path(
    get,
    path = "/search",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    params(PatientSearch),
    responses(
        (status = 200, description = "One page of matching patients", body = StdResponse<Page<PatientEntity>, String>)
    )
)]
async fn search_patients(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Query(search): Query<PatientSearch>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patients: Vec<PatientEntity> = patients::table
        .filter(patients::doctor_id.eq(doctor_id))
        .order(patients::created_at.desc())
        .select(PatientEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get patients")?;

    Ok(StdResponse {
        data: Some(search.apply(patients)),
        message: Some("Search patients successfully"),
    })
}

/// Fetch one of the doctor's patients.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Patient ID to fetch")
    ),
    responses(
        (status = 200, description = "Get patient successfully", body = StdResponse<PatientEntity, String>),
        (status = 404, description = "Patient not found")
    )
)]
async fn get_patient(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient: PatientEntity = patients::table
        .find(id)
        .filter(patients::doctor_id.eq(doctor_id))
        .select(PatientEntity::as_select())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(patient),
        message: Some("Get patient successfully"),
    })
}

/// Register a new patient for the doctor.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    request_body = PatientForm,
    responses(
        (status = 200, description = "Patient created", body = StdResponse<PatientEntity, String>)
    )
)]
async fn create_patient(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<PatientForm>,
) -> Result<impl IntoResponse, AppError> {
    let new_patient = body.into_entity(doctor_id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient: PatientEntity = diesel::insert_into(patients::table)
        .values(new_patient)
        .returning(PatientEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create patient")?;

    tracing::info!("Doctor {} registered patient {}", doctor_id, patient.id);

    Ok(StdResponse {
        data: Some(patient),
        message: Some("Patient created successfully"),
    })
}

/// Update the given fields of a patient.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Patient ID to update")
    ),
    request_body = UpdatePatientEntity,
    responses(
        (status = 200, description = "Patient updated", body = StdResponse<PatientEntity, String>),
        (status = 404, description = "Patient not found")
    )
)]
async fn update_patient(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<UpdatePatientEntity>,
) -> Result<impl IntoResponse, AppError> {
    validate_patient_patch(&body)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient: PatientEntity = diesel::update(
        patients::table
            .find(id)
            .filter(patients::doctor_id.eq(doctor_id)),
    )
    .set((&body, patients::updated_at.eq(diesel::dsl::now)))
    .returning(PatientEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(patient),
        message: Some("Patient updated successfully"),
    })
}

/// Remove a patient together with their records.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Patients"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Patient ID to delete")
    ),
    responses(
        (status = 200, description = "Patient deleted", body = StdResponse<PatientEntity, String>),
        (status = 404, description = "Patient not found")
    )
)]
async fn delete_patient(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient: PatientEntity = diesel::delete(
        patients::table
            .find(id)
            .filter(patients::doctor_id.eq(doctor_id)),
    )
    .returning(PatientEntity::as_returning())
    .get_result(conn)
    .await?;

    tracing::info!("Doctor {} deleted patient {}", doctor_id, id);

    Ok(StdResponse {
        data: Some(patient),
        message: Some("Patient deleted successfully"),
    })
}
