use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::{app_error::AppError, app_state::AppState, schema::sessions};

/// Token presented by the caller, stored next to the doctor id for logout/refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionToken(pub Uuid);

/// Extracts the UUID from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Uuid::parse_str(token.trim()).ok()
}

/// Resolves the bearer token to a live session and exposes the owning doctor's
/// id as `Extension<Uuid>` to the wrapped handlers.
pub async fn doctors_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing or malformed bearer token".into()))?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor_id: Option<Uuid> = sessions::table
        .find(token)
        .filter(sessions::expires_at.gt(diesel::dsl::now))
        .select(sessions::doctor_id)
        .get_result(conn)
        .await
        .optional()
        .context("Failed to look up session")?;

    let Some(doctor_id) = doctor_id else {
        tracing::debug!("Rejected unknown or expired session token");
        return Err(AppError::Unauthorized("Session expired or invalid".into()));
    };

    req.extensions_mut().insert(doctor_id);
    req.extensions_mut().insert(SessionToken(token));
    Ok(next.run(req).await)
}
