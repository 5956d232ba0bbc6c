use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::accounts::model::{Account, Role};
use crate::auth::claims::TokenKind;
use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;
use crate::state::AppState;

/// The resolved caller: bearer token validated and the backing account
/// loaded. This is the only identity handlers ever see.
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub id: i64,
    pub email: String,
    pub roles: Vec<Role>,
}

impl CurrentAccount {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("access token required".into()));
        }

        // The token may outlive the account; resolve against storage.
        let account = Account::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("unknown account".into()))?;

        Ok(CurrentAccount {
            id: account.id,
            email: account.email,
            roles: account.roles,
        })
    }
}

/// Optional caller for endpoints that serve anonymous requests but expose
/// extra affordances to authenticated ones.
pub struct MaybeAccount(pub Option<CurrentAccount>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAccount {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAccount(
            CurrentAccount::from_request_parts(parts, state).await.ok(),
        ))
    }
}
