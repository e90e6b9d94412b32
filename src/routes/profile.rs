use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::account::ProfileForm,
    middleware,
    models::ProfileEntity,
    schema::profiles,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/profile",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_profile, update_my_profile))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Fetch the authenticated doctor's profile.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Profile"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<ProfileEntity, String>)
    )
)]
async fn get_my_profile(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profile: ProfileEntity = profiles::table
        .find(doctor_id)
        .select(ProfileEntity::as_select())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(profile),
        message: Some("Get profile successfully"),
    })
}

/// Save every editable field of the profile form.
#[utoipa::path(
    put,
    path = "/",
    tags = ["Profile"],
    security(("bearerAuth" = [])),
    request_body = ProfileForm,
    responses(
        (status = 200, description = "Profile updated", body = StdResponse<ProfileEntity, String>)
    )
)]
async fn update_my_profile(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Json(body): Json<ProfileForm>,
) -> Result<impl IntoResponse, AppError> {
    let changeset = body.into_changeset()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profile: ProfileEntity = diesel::update(profiles::table.find(doctor_id))
        .set((&changeset, profiles::updated_at.eq(diesel::dsl::now)))
        .returning(ProfileEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!("Doctor {} updated their profile", doctor_id);

    Ok(StdResponse {
        data: Some(profile),
        message: Some("Profile updated successfully"),
    })
}
