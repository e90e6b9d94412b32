use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, define_sql_function,
    sql_types::Text,
};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::account::{self, LOGIN_ROUTE, LoginForm, SignupForm},
    middleware::{self, SessionToken},
    models::{CreateProfileEntity, CreateSessionEntity, ProfileEntity, SessionEntity},
    schema::{credentials, profiles, sessions},
};

define_sql_function! {
    /// pgcrypto `crypt(password, salt)`.
    fn crypt(password: Text, salt: Text) -> Text;
}

define_sql_function! {
    /// pgcrypto `gen_salt(type)`.
    fn gen_salt(kind: Text) -> Text;
}

/// Public signup/login plus the session endpoints behind `doctors_authorization`.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_session))
        .routes(utoipa_axum::routes!(refresh_session))
        .routes(utoipa_axum::routes!(logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::doctors_authorization,
        ));

    OpenApiRouter::new().nest(
        "/auth",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(signup))
            .routes(utoipa_axum::routes!(login))
            .merge(protected),
    )
}

#[derive(Serialize, ToSchema)]
pub struct SessionRes {
    pub session: SessionEntity,
    pub profile: ProfileEntity,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutRes {
    pub redirect_to: String,
}

/// Register a new doctor account and open a session for it.
#[utoipa::path(
    post,
    path = "/signup",
    tags = ["Auth"],
    request_body = SignupForm,
    responses(
        (status = 200, description = "Signed up successfully", body = StdResponse<SessionRes, String>),
        (status = 409, description = "Email already registered")
    )
)]
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupForm>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let email = account::normalize_email(&body.email);
    let taken: i64 = profiles::table
        .filter(profiles::email.eq(&email))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check email")?;
    if taken > 0 {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let expires_at = account::session_expiry(Utc::now(), state.config.session_ttl());

    let (profile, session) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let profile = diesel::insert_into(profiles::table)
                    .values(CreateProfileEntity {
                        email,
                        full_name: body.full_name.trim().to_string(),
                        clinic_name: body.clinic_name.trim().to_string(),
                        shift: body.shift.trim().to_string(),
                    })
                    .returning(ProfileEntity::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::insert_into(credentials::table)
                    .values((
                        credentials::doctor_id.eq(profile.id),
                        credentials::password_hash.eq(crypt(body.password, gen_salt("bf"))),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to store credentials")?;

                let session = diesel::insert_into(sessions::table)
                    .values(CreateSessionEntity {
                        doctor_id: profile.id,
                        expires_at,
                    })
                    .returning(SessionEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create session")?;

                Ok::<(ProfileEntity, SessionEntity), AppError>((profile, session))
            })
        })
        .await?;

    tracing::info!("Doctor {} signed up", profile.id);

    Ok(StdResponse {
        data: Some(SessionRes { session, profile }),
        message: Some("Signed up successfully"),
    })
}

/// Exchange email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = LoginForm,
    responses(
        (status = 200, description = "Logged in successfully", body = StdResponse<SessionRes, String>),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let profile: Option<ProfileEntity> = profiles::table
        .inner_join(credentials::table)
        .filter(profiles::email.eq(account::normalize_email(&body.email)))
        .filter(credentials::password_hash.eq(crypt(body.password, credentials::password_hash)))
        .select(ProfileEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to verify credentials")?;

    let Some(profile) = profile else {
        tracing::info!("Rejected login attempt");
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    };

    let now = Utc::now();
    let expired = diesel::delete(
        sessions::table
            .filter(sessions::doctor_id.eq(profile.id))
            .filter(sessions::expires_at.le(now)),
    )
    .execute(conn)
    .await
    .context("Failed to delete expired sessions")?;
    if expired > 0 {
        tracing::debug!("Deleted {} expired sessions of doctor {}", expired, profile.id);
    }

    let session = diesel::insert_into(sessions::table)
        .values(CreateSessionEntity {
            doctor_id: profile.id,
            expires_at: account::session_expiry(now, state.config.session_ttl()),
        })
        .returning(SessionEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create session")?;

    tracing::info!("Doctor {} logged in", profile.id);

    Ok(StdResponse {
        data: Some(SessionRes { session, profile }),
        message: Some("Logged in successfully"),
    })
}

/// Fetch the current session and the signed-in doctor's profile.
#[utoipa::path(
    get,
    path = "/session",
    tags = ["Auth"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current session", body = StdResponse<SessionRes, String>)
    )
)]
async fn get_session(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (session, profile): (SessionEntity, ProfileEntity) = sessions::table
        .inner_join(profiles::table)
        .filter(sessions::token.eq(token))
        .select((SessionEntity::as_select(), ProfileEntity::as_select()))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(SessionRes { session, profile }),
        message: Some("Get session successfully"),
    })
}

/// Rotate the bearer token and extend the session.
#[utoipa::path(
    post,
    path = "/refresh",
    tags = ["Auth"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Refreshed session", body = StdResponse<SessionEntity, String>)
    )
)]
async fn refresh_session(
    State(state): State<AppState>,
    Extension(doctor_id): Extension<Uuid>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let expires_at = account::session_expiry(Utc::now(), state.config.session_ttl());

    let session = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let deleted = diesel::delete(sessions::table.find(token))
                    .execute(conn)
                    .await?;
                if deleted == 0 {
                    return Err(AppError::Unauthorized("Session expired or invalid".into()));
                }

                let session = diesel::insert_into(sessions::table)
                    .values(CreateSessionEntity {
                        doctor_id,
                        expires_at,
                    })
                    .returning(SessionEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create session")?;

                Ok::<SessionEntity, AppError>(session)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(session),
        message: Some("Refreshed session successfully"),
    })
}

/// End the current session. Always answers with the login route.
#[utoipa::path(
    post,
    path = "/logout",
    tags = ["Auth"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Logged out", body = StdResponse<LogoutRes, String>)
    )
)]
async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<impl IntoResponse, AppError> {
    let deleted: Result<usize, anyhow::Error> = async {
        let conn = &mut state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;
        let deleted = diesel::delete(sessions::table.find(token))
            .execute(conn)
            .await
            .context("Failed to delete session")?;
        Ok(deleted)
    }
    .await;

    if let Err(err) = deleted {
        tracing::warn!("Failed to delete session on logout: {:?}", err);
    }

    Ok(StdResponse {
        data: Some(LogoutRes {
            redirect_to: LOGIN_ROUTE.to_string(),
        }),
        message: Some("Logged out successfully"),
    })
}
