use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::accounts::model::{Account, Role};
use crate::accounts::repo::is_unique_violation;
use crate::accounts::validator::email_exists;
use crate::auth::password::hash_password;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The storage-level uniqueness constraint fired; carries the attempted
    /// address so the response matches the validator's pre-flight error.
    #[error("account already registered ({0})")]
    EmailTaken(String),
    #[error("no account registered for {0}")]
    UserNotFound(String),
    #[error("account not found")]
    NotFound,
    #[error("credential hashing failed")]
    Hash(anyhow::Error),
    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::EmailTaken(email) => ApiError::Validation(vec![email_exists(&email)]),
            ServiceError::UserNotFound(_) => ApiError::Unauthorized("invalid credentials".into()),
            ServiceError::NotFound => ApiError::NotFound,
            ServiceError::Hash(e) => ApiError::Internal(e),
            ServiceError::Storage(e) => ApiError::Internal(e.into()),
        }
    }
}

/// A new account as accepted from the API boundary: plaintext password,
/// already-normalized email.
#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub roles: Vec<Role>,
}

/// Full replacement of an account's mutable fields. `password` is the only
/// optional piece: when absent the stored hash is carried over untouched,
/// when present the new plaintext is hashed exactly once.
#[derive(Debug)]
pub struct AccountChanges {
    pub email: String,
    pub password: Option<String>,
    pub name: String,
    pub roles: Vec<Role>,
}

/// Credential material handed to the authentication layer, never to API
/// callers.
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

impl From<Account> for AuthPrincipal {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            password_hash: account.password_hash,
            roles: account.roles,
        }
    }
}

/// Hashes the plaintext once and inserts. A duplicate-email race that slips
/// past the validator's pre-flight comes back as `EmailTaken`.
pub async fn create_account(db: &PgPool, new: NewAccount) -> Result<Account, ServiceError> {
    let hash = hash_password(&new.password).map_err(ServiceError::Hash)?;
    let account = Account::insert(db, &new.email, &hash, &new.name, &new.roles)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(email = %new.email, "duplicate email lost the insert race");
                ServiceError::EmailTaken(new.email.clone())
            } else {
                ServiceError::Storage(e)
            }
        })?;
    info!(account_id = account.id, email = %account.email, "account created");
    Ok(account)
}

/// Replaces the mutable fields of `existing`. The stored hash is reused
/// unless the caller supplied a new plaintext password.
pub async fn update_account(
    db: &PgPool,
    existing: &Account,
    changes: AccountChanges,
) -> Result<Account, ServiceError> {
    let password_hash = match &changes.password {
        Some(plain) => hash_password(plain).map_err(ServiceError::Hash)?,
        None => existing.password_hash.clone(),
    };

    let updated = Account::update(
        db,
        existing.id,
        &changes.email,
        &password_hash,
        &changes.name,
        &changes.roles,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ServiceError::EmailTaken(changes.email.clone())
        } else {
            ServiceError::Storage(e)
        }
    })?
    .ok_or(ServiceError::NotFound)?;

    info!(account_id = updated.id, "account updated");
    Ok(updated)
}

/// Resolves an email to credential material for the authentication layer.
pub async fn resolve_for_authentication(
    db: &PgPool,
    email: &str,
) -> Result<AuthPrincipal, ServiceError> {
    let account = Account::find_by_email(db, email)
        .await?
        .ok_or_else(|| ServiceError::UserNotFound(email.to_string()))?;
    Ok(account.into())
}

pub async fn account_exists(db: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    Ok(Account::find_by_email(db, email).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    #[test]
    fn email_taken_maps_to_field_error() {
        let api: ApiError = ServiceError::EmailTaken("a@x.com".into()).into();
        match api {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                let FieldError { field, code, message } = &errors[0];
                assert_eq!(*field, "email");
                assert_eq!(*code, "exists");
                assert!(message.contains("a@x.com"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn user_not_found_names_the_email() {
        let err = ServiceError::UserNotFound("random@email".into());
        assert!(err.to_string().contains("random@email"));
    }

    #[test]
    fn user_not_found_is_unauthorized_at_the_boundary() {
        let api: ApiError = ServiceError::UserNotFound("a@x.com".into()).into();
        assert!(matches!(api, ApiError::Unauthorized(_)));
    }
}
