use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::accounts::dto::{
    account_href, AccountPage, AccountResource, CreateAccountRequest, EmbeddedAccounts, PageMeta,
    PageQuery, UpdateAccountRequest, ACCOUNTS_HREF, PROFILE_CREATE, PROFILE_GET, PROFILE_UPDATE,
};
use crate::accounts::model::Account;
use crate::accounts::repo::SortSpec;
use crate::accounts::service::{self, AccountChanges, NewAccount};
use crate::accounts::validator;
use crate::auth::extractors::{CurrentAccount, MaybeAccount};
use crate::error::ApiError;
use crate::state::AppState;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(query_accounts).post(create_account))
        .route("/accounts/:id", get(get_account).put(update_account))
}

/// Update policy: an account may be modified by an admin or by itself.
fn may_update(caller: &CurrentAccount, target_id: i64) -> bool {
    caller.is_admin() || caller.id == target_id
}

#[instrument(skip(state, payload))]
pub async fn create_account(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AccountResource>), ApiError> {
    payload.normalize();

    // Structural and uniqueness errors are collected into one response.
    let mut errors = payload.structural_errors();
    if errors.iter().all(|e| e.field != "email") {
        errors.extend(validator::validate_new(&state.db, &payload.email).await?);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let account = service::create_account(
        &state.db,
        NewAccount {
            email: payload.email,
            password: payload.password,
            name: payload.name,
            roles: payload.roles,
        },
    )
    .await?;

    let self_href = account_href(account.id);
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::LOCATION,
        self_href.parse().unwrap(),
    );

    let resource = AccountResource::new(&account)
        .with_link("query-accounts", ACCOUNTS_HREF)
        .with_link("profile", PROFILE_CREATE);

    Ok((StatusCode::CREATED, headers, Json(resource)))
}

#[instrument(skip(state, caller))]
pub async fn query_accounts(
    State(state): State<AppState>,
    caller: MaybeAccount,
    Query(query): Query<PageQuery>,
) -> Result<Json<AccountPage>, ApiError> {
    let sort = query
        .sort
        .as_deref()
        .map(SortSpec::parse)
        .transpose()
        .map_err(|e| ApiError::Validation(vec![e]))?;

    let number = query.number();
    let size = query.limit();

    let total = Account::count(&state.db).await?;
    let accounts = Account::list(&state.db, number, size, sort.unwrap_or_default()).await?;

    let account_list = accounts.iter().map(AccountResource::new).collect();
    let meta = PageMeta::new(size, total, number);
    let links = crate::accounts::dto::page_links(&meta, sort.as_ref(), caller.0.is_some());

    Ok(Json(AccountPage {
        embedded: EmbeddedAccounts { account_list },
        links,
        page: meta,
    }))
}

#[instrument(skip(state, caller))]
pub async fn get_account(
    State(state): State<AppState>,
    caller: MaybeAccount,
    Path(id): Path<i64>,
) -> Result<Json<AccountResource>, ApiError> {
    let account = Account::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let is_admin = caller.0.as_ref().is_some_and(CurrentAccount::is_admin);
    let resource = AccountResource::new(&account)
        .with_link("profile", PROFILE_GET)
        .with_link_if(is_admin, "update-account", account_href(account.id));

    Ok(Json(resource))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    caller: CurrentAccount,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResource>, ApiError> {
    let existing = Account::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !may_update(&caller, existing.id) {
        return Err(ApiError::Forbidden);
    }

    payload.normalize();

    let mut errors = payload.structural_errors();
    // Re-check uniqueness only when the address actually changes.
    if payload.email != existing.email && errors.iter().all(|e| e.field != "email") {
        errors.extend(validator::validate_new(&state.db, &payload.email).await?);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let updated = service::update_account(
        &state.db,
        &existing,
        AccountChanges {
            email: payload.email,
            password: payload.password,
            name: payload.name,
            roles: payload.roles,
        },
    )
    .await?;

    let resource = AccountResource::new(&updated)
        .with_link("profile", PROFILE_UPDATE)
        .with_link_if(caller.is_admin(), "get-account", account_href(updated.id));

    Ok(Json(resource))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::model::Role;

    fn caller(id: i64, roles: Vec<Role>) -> CurrentAccount {
        CurrentAccount {
            id,
            email: format!("caller{}@x.com", id),
            roles,
        }
    }

    #[test]
    fn admins_may_update_anyone() {
        let admin = caller(1, vec![Role::Admin]);
        assert!(may_update(&admin, 1));
        assert!(may_update(&admin, 99));
    }

    #[test]
    fn plain_users_may_only_update_themselves() {
        let user = caller(5, vec![Role::User]);
        assert!(may_update(&user, 5));
        assert!(!may_update(&user, 6));
    }
}
