use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::scheduling::{AppointmentForm, AppointmentStatus, day_bounds},
    middleware,
    models::{AppointmentEntity, CreateAppointmentEntity, PatientSummary},
    schema::{appointments, patients},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/appointments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_appointments, create_appointment))
            .routes(utoipa_axum::routes!(get_appointments_for_day))
            .routes(utoipa_axum::routes!(update_appointment_status, delete_appointment))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

#[derive(Serialize, ToSchema)]
pub struct AppointmentRecord {
    pub appointment: AppointmentEntity,
    pub patient: PatientSummary,
}

/// Fetch every appointment of the doctor, earliest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List appointments", body = StdResponse<Vec<AppointmentRecord>, String>)
    )
)]
async fn get_appointments(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(AppointmentEntity, PatientSummary)> = appointments::table
        .inner_join(patients::table)
        .filter(appointments::doctor_id.eq(doctor_id))
        .order(appointments::appointment_date.asc())
        .select((AppointmentEntity::as_select(), PatientSummary::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get appointments")?;

    Ok(StdResponse {
        data: Some(into_records(rows)),
        message: Some("Get appointments successfully"),
    })
}

fn into_records(rows: Vec<(AppointmentEntity, PatientSummary)>) -> Vec<AppointmentRecord> {
    rows.into_iter()
        .map(|(appointment, patient)| AppointmentRecord {
            appointment,
            patient,
        })
        .collect()
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
struct DayQuery {
    /// `YYYY-MM-DD`, UTC. Today when omitted.
    date: Option<NaiveDate>,
}

/// Dashboard view: the appointments of one day.
#[utoipa::path(
    get,
    path = "/day",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    params(DayQuery),
    responses(
        (status = 200, description = "Appointments of the day", body = StdResponse<Vec<AppointmentRecord>, String>)
    )
)]
async fn get_appointments_for_day(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse, AppError> {
    let day = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let (start, end) = day_bounds(day);

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(AppointmentEntity, PatientSummary)> = appointments::table
        .inner_join(patients::table)
        .filter(appointments::doctor_id.eq(doctor_id))
        .filter(appointments::appointment_date.ge(start))
        .filter(appointments::appointment_date.lt(end))
        .order(appointments::appointment_date.asc())
        .select((AppointmentEntity::as_select(), PatientSummary::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get appointments")?;

    Ok(StdResponse {
        data: Some(into_records(rows)),
        message: Some("Get appointments successfully"),
    })
}

/// Book an appointment for one of the doctor's patients.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    request_body = AppointmentForm,
    responses(
        (status = 200, description = "Appointment created", body = StdResponse<AppointmentEntity, String>),
        (status = 403, description = "Patient belongs to another doctor")
    )
)]
async fn create_appointment(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<AppointmentForm>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let owner: Uuid = patients::table
        .find(body.patient_id)
        .select(patients::doctor_id)
        .get_result(conn)
        .await?;
    if owner != doctor_id {
        return Err(AppError::ForbiddenResource(
            "Patient belongs to another doctor".into(),
        ));
    }

    let appointment: AppointmentEntity = diesel::insert_into(appointments::table)
        .values(CreateAppointmentEntity {
            doctor_id,
            patient_id: body.patient_id,
            appointment_date: body.appointment_date,
            status: AppointmentStatus::Scheduled.to_string(),
            notes: body
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
        .returning(AppointmentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create appointment")?;

    Ok(StdResponse {
        data: Some(appointment),
        message: Some("Appointment created successfully"),
    })
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateAppointmentStatusReq {
    pub status: String,
}

/// Mark an appointment scheduled, completed or cancelled.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Appointment ID to update")
    ),
    request_body = UpdateAppointmentStatusReq,
    responses(
        (status = 200, description = "Appointment updated", body = StdResponse<AppointmentEntity, String>),
        (status = 404, description = "Appointment not found")
    )
)]
async fn update_appointment_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<UpdateAppointmentStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let status: AppointmentStatus = body.status.parse()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let appointment: AppointmentEntity = diesel::update(
        appointments::table
            .find(id)
            .filter(appointments::doctor_id.eq(doctor_id)),
    )
    .set(appointments::status.eq(status.as_str()))
    .returning(AppointmentEntity::as_returning())
    .get_result(conn)
    .await?;

    tracing::info!("Appointment {} is now {}", id, status);

    Ok(StdResponse {
        data: Some(appointment),
        message: Some("Appointment updated successfully"),
    })
}

/// Remove an appointment.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Appointment ID to delete")
    ),
    responses(
        (status = 200, description = "Appointment deleted", body = StdResponse<AppointmentEntity, String>),
        (status = 404, description = "Appointment not found")
    )
)]
async fn delete_appointment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let appointment: AppointmentEntity = diesel::delete(
        appointments::table
            .find(id)
            .filter(appointments::doctor_id.eq(doctor_id)),
    )
    .returning(AppointmentEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(appointment),
        message: Some("Appointment deleted successfully"),
    })
}
