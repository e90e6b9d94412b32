use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{
        patients::PatientForm,
        prescribing::{ClinicalDetails, PatientSource, PrescriptionDraft},
        print::{self, PrintOptions},
        search::{Page, PrescriptionRecord, RecordSearch},
    },
    middleware,
    models::{
        CreatePrescriptionEntity, PatientEntity, PatientSummary, PrescriptionEntity, ProfileEntity,
    },
    schema::{patients, prescriptions, profiles},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/prescriptions",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_prescriptions, create_prescription))
            .routes(utoipa_axum::routes!(search_prescriptions))
            .routes(utoipa_axum::routes!(get_prescription, delete_prescription))
            .routes(utoipa_axum::routes!(print_prescription))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Fetch the doctor's prescriptions with their patients, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Prescriptions"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List prescriptions", body = StdResponse<Vec<PrescriptionRecord>, String>)
    )
)]
async fn get_prescriptions(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let records = load_records(conn, doctor_id).await?;

    Ok(StdResponse {
        data: Some(records),
        message: Some("Get prescriptions successfully"),
    })
}

async fn load_records(
    conn: &mut diesel_async::AsyncPgConnection,
    doctor_id: Uuid,
) -> Result<Vec<PrescriptionRecord>, AppError> {
    let rows: Vec<(PrescriptionEntity, PatientSummary)> = prescriptions::table
        .inner_join(patients::table)
        .filter(prescriptions::doctor_id.eq(doctor_id))
        .order(prescriptions::created_at.desc())
        .select((PrescriptionEntity::as_select(), PatientSummary::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get prescriptions")?;

    Ok(rows
        .into_iter()
        .map(|(prescription, patient)| PrescriptionRecord {
            prescription,
            patient,
        })
        .collect())
}

/// Manage-records search with pagination.
#[utoipa::path(
    get,
    path = "/search",
    tags = ["Prescriptions"],
    security(("bearerAuth" = [])),
    params(RecordSearch),
    responses(
        (status = 200, description = "One page of matching prescriptions", body = StdResponse<Page<PrescriptionRecord>, String>)
    )
)]
async fn search_prescriptions(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Query(search): Query<RecordSearch>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let records = load_records(conn, doctor_id).await?;

    Ok(StdResponse {
        data: Some(search.apply(records)),
        message: Some("Search prescriptions successfully"),
    })
}

/// Fetch one prescription with its patient.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Prescriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Prescription ID to fetch")
    ),
    responses(
        (status = 200, description = "Get prescription successfully", body = StdResponse<PrescriptionRecord, String>),
        (status = 404, description = "Prescription not found")
    )
)]
async fn get_prescription(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (prescription, patient): (PrescriptionEntity, PatientSummary) = prescriptions::table
        .inner_join(patients::table)
        .filter(prescriptions::id.eq(id))
        .filter(prescriptions::doctor_id.eq(doctor_id))
        .select((PrescriptionEntity::as_select(), PatientSummary::as_select()))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(PrescriptionRecord {
            prescription,
            patient,
        }),
        message: Some("Get prescription successfully"),
    })
}

/// Save a prescription, registering the patient first when the pad names a new one.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Prescriptions"],
    security(("bearerAuth" = [])),
    request_body = PrescriptionDraft,
    responses(
        (status = 200, description = "Prescription created", body = StdResponse<PrescriptionEntity, String>),
        (status = 403, description = "Patient belongs to another doctor")
    )
)]
async fn create_prescription(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<PrescriptionDraft>,
) -> Result<impl IntoResponse, AppError> {
    let new_patient = match body.validate()? {
        PatientSource::Existing(_) => None,
        PatientSource::New(patient) => {
            Some(PatientForm::from(patient.clone()).into_entity(doctor_id)?)
        }
    };

    let details =
        serde_json::to_value(&body.details).context("Failed to serialize clinical details")?;
    let medications = body.medications_text();
    let instructions = body.instructions_text();
    let diagnosis = body.diagnosis.trim().to_string();
    let existing_patient_id = body.patient_id;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let prescription = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let patient_id = match (existing_patient_id, new_patient) {
                    (_, Some(new_patient)) => {
                        let patient_id: Uuid = diesel::insert_into(patients::table)
                            .values(new_patient)
                            .returning(patients::id)
                            .get_result(conn)
                            .await
                            .context("Failed to create patient")?;
                        tracing::info!("Registered patient {} from prescription pad", patient_id);
                        patient_id
                    }
                    (Some(patient_id), None) => {
                        let owner: Uuid = patients::table
                            .find(patient_id)
                            .select(patients::doctor_id)
                            .get_result(conn)
                            .await?;
                        if owner != doctor_id {
                            return Err(AppError::ForbiddenResource(
                                "Patient belongs to another doctor".into(),
                            ));
                        }
                        patient_id
                    }
                    (None, None) => {
                        return Err(AppError::BadRequest("patient_id is required".into()));
                    }
                };

                let prescription = diesel::insert_into(prescriptions::table)
                    .values(CreatePrescriptionEntity {
                        doctor_id,
                        patient_id,
                        diagnosis,
                        medications,
                        instructions,
                        details: Some(details),
                    })
                    .returning(PrescriptionEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create prescription")?;

                Ok::<PrescriptionEntity, AppError>(prescription)
            })
        })
        .await?;

    tracing::info!(
        "Doctor {} wrote prescription {} for patient {}",
        doctor_id,
        prescription.id,
        prescription.patient_id
    );

    Ok(StdResponse {
        data: Some(prescription),
        message: Some("Prescription saved successfully"),
    })
}

/// Remove a prescription.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Prescriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Prescription ID to delete")
    ),
    responses(
        (status = 200, description = "Prescription deleted", body = StdResponse<PrescriptionEntity, String>),
        (status = 404, description = "Prescription not found")
    )
)]
async fn delete_prescription(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let prescription: PrescriptionEntity = diesel::delete(
        prescriptions::table
            .find(id)
            .filter(prescriptions::doctor_id.eq(doctor_id)),
    )
    .returning(PrescriptionEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(prescription),
        message: Some("Prescription deleted successfully"),
    })
}

/// Printable HTML for a prescription.
#[utoipa::path(
    get,
    path = "/{id}/print",
    tags = ["Prescriptions"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Prescription ID to print"),
        PrintOptions
    ),
    responses(
        (status = 200, description = "Print document", content_type = "text/html", body = String),
        (status = 404, description = "Prescription not found")
    )
)]
async fn print_prescription(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Query(options): Query<PrintOptions>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (prescription, patient): (PrescriptionEntity, PatientEntity) = prescriptions::table
        .inner_join(patients::table)
        .filter(prescriptions::id.eq(id))
        .filter(prescriptions::doctor_id.eq(doctor_id))
        .select((PrescriptionEntity::as_select(), PatientEntity::as_select()))
        .get_result(conn)
        .await?;

    let profile: ProfileEntity = profiles::table
        .find(doctor_id)
        .select(ProfileEntity::as_select())
        .get_result(conn)
        .await?;

    let details: Option<ClinicalDetails> = match prescription.details.clone() {
        Some(value) => match serde_json::from_value(value) {
            Ok(details) => Some(details),
            Err(err) => {
                tracing::warn!(
                    "Prescription {} has unreadable details, printing summary only: {}",
                    prescription.id,
                    err
                );
                None
            }
        },
        None => None,
    };

    Ok(Html(print::render_prescription(
        &profile,
        &patient,
        &prescription,
        details.as_ref(),
        options,
        Utc::now(),
    )?))
}
