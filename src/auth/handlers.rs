use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::accounts::service;
use crate::auth::dto::{AuthResponse, LoginRequest, PublicAccount, RefreshRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::verify_password;
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and bad password produce the same 401.
    let principal = service::resolve_for_authentication(&state.db, &payload.email).await?;

    let ok = verify_password(&payload.password, &principal.password_hash)?;
    if !ok {
        warn!(email = %payload.email, account_id = principal.id, "login invalid password");
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(principal.id)?;
    let refresh_token = keys.sign_refresh(principal.id)?;

    info!(account_id = principal.id, email = %principal.email, "login succeeded");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        account: PublicAccount {
            id: principal.id,
            email: principal.email,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let account = crate::accounts::model::Account::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown account".into()))?;

    let access_token = keys.sign_access(account.id)?;
    let refresh_token = keys.sign_refresh(account.id)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        account: PublicAccount {
            id: account.id,
            email: account.email,
        },
    }))
}
