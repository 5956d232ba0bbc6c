use serde::{Deserialize, Serialize};

use crate::accounts::model::{Account, Role};
use crate::accounts::repo::SortSpec;
use crate::accounts::validator::is_valid_email;
use crate::error::FieldError;
use crate::hal::Links;

pub const ACCOUNTS_HREF: &str = "/api/accounts";

pub const PROFILE_CREATE: &str = "/docs/index.html#resources-accounts-create";
pub const PROFILE_LIST: &str = "/docs/index.html#resources-accounts-list";
pub const PROFILE_GET: &str = "/docs/index.html#resources-accounts-get";
pub const PROFILE_UPDATE: &str = "/docs/index.html#resources-accounts-update";

pub fn account_href(id: i64) -> String {
    format!("{}/{}", ACCOUNTS_HREF, id)
}

const MIN_PASSWORD_LEN: usize = 8;

/// Body of `POST /api/accounts`.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Body of `PUT /api/accounts/{id}`. Same shape as create, except the
/// password is optional: omitted means "keep the current credential".
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub email: String,
    pub password: Option<String>,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

fn common_structural_errors(email: &str, name: &str, roles: &[Role]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !is_valid_email(email) {
        errors.push(FieldError::new(
            "email",
            "invalid",
            format!("not a valid email address ({})", email),
        ));
    }
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "required", "name must not be empty"));
    }
    if roles.is_empty() {
        errors.push(FieldError::new(
            "roles",
            "required",
            "at least one role is required",
        ));
    }
    errors
}

fn password_too_short(plain: &str) -> Option<FieldError> {
    (plain.len() < MIN_PASSWORD_LEN).then(|| {
        FieldError::new(
            "password",
            "length",
            format!("password must be at least {} characters", MIN_PASSWORD_LEN),
        )
    })
}

impl CreateAccountRequest {
    /// Trims and lowercases the email so uniqueness is case-insensitive by
    /// construction.
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
    }

    pub fn structural_errors(&self) -> Vec<FieldError> {
        let mut errors = common_structural_errors(&self.email, &self.name, &self.roles);
        if let Some(err) = password_too_short(&self.password) {
            errors.push(err);
        }
        errors
    }
}

impl UpdateAccountRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
    }

    pub fn structural_errors(&self) -> Vec<FieldError> {
        let mut errors = common_structural_errors(&self.email, &self.name, &self.roles);
        if let Some(err) = self.password.as_deref().and_then(password_too_short) {
            errors.push(err);
        }
        errors
    }
}

/// HAL rendering of one account. Always carries its self link; callers add
/// the affordances the current request warrants.
#[derive(Debug, Serialize)]
pub struct AccountResource {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub roles: Vec<Role>,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl AccountResource {
    pub fn new(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            roles: account.roles.clone(),
            links: Links::new().add("self", account_href(account.id)),
        }
    }

    pub fn with_link(mut self, rel: &'static str, href: impl Into<String>) -> Self {
        self.links = self.links.add(rel, href);
        self
    }

    pub fn with_link_if(mut self, cond: bool, rel: &'static str, href: impl Into<String>) -> Self {
        self.links = self.links.add_if(cond, rel, href);
        self
    }
}

/// Pagination query parameters, zero-indexed page number.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
    pub sort: Option<String>,
}

fn default_page_size() -> i64 {
    20
}

const MAX_PAGE_SIZE: i64 = 100;

impl PageQuery {
    pub fn number(&self) -> i64 {
        self.page.max(0)
    }

    pub fn limit(&self) -> i64 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub number: i64,
}

impl PageMeta {
    pub fn new(size: i64, total_elements: i64, number: i64) -> Self {
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + size - 1) / size
        };
        Self {
            size,
            total_elements,
            total_pages,
            number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmbeddedAccounts {
    #[serde(rename = "accountList")]
    pub account_list: Vec<AccountResource>,
}

/// Paged HAL envelope: `_embedded.accountList`, navigation `_links`, and
/// `page` metadata.
#[derive(Debug, Serialize)]
pub struct AccountPage {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedAccounts,
    #[serde(rename = "_links")]
    pub links: Links,
    pub page: PageMeta,
}

fn page_href(page: i64, size: i64, sort: Option<&SortSpec>) -> String {
    match sort {
        Some(spec) => format!("{}?page={}&size={}&sort={}", ACCOUNTS_HREF, page, size, spec.to_query()),
        None => format!("{}?page={}&size={}", ACCOUNTS_HREF, page, size),
    }
}

/// Navigation links for a listing page. `prev`/`next` appear only when the
/// neighbouring page exists; `create-account` only for authenticated callers.
pub fn page_links(meta: &PageMeta, sort: Option<&SortSpec>, authenticated: bool) -> Links {
    let last = (meta.total_pages - 1).max(0);
    Links::new()
        .add("self", page_href(meta.number, meta.size, sort))
        .add("first", page_href(0, meta.size, sort))
        .add_if(
            meta.number > 0,
            "prev",
            page_href(meta.number - 1, meta.size, sort),
        )
        .add_if(
            meta.number + 1 < meta.total_pages,
            "next",
            page_href(meta.number + 1, meta.size, sort),
        )
        .add("last", page_href(last, meta.size, sort))
        .add("profile", PROFILE_LIST)
        .add_if(authenticated, "create-account", ACCOUNTS_HREF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn account() -> Account {
        Account {
            id: 7,
            email: "a@x.com".into(),
            password_hash: "$argon2id$not-a-real-hash".into(),
            name: "A".into(),
            roles: vec![Role::User],
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn resource_carries_self_link_and_no_hash() {
        let resource = AccountResource::new(&account())
            .with_link("profile", PROFILE_GET)
            .with_link_if(false, "update-account", account_href(7));

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["roles"][0], "USER");
        assert_eq!(json["_links"]["self"]["href"], "/api/accounts/7");
        assert_eq!(json["_links"]["profile"]["href"], PROFILE_GET);
        assert!(json["_links"].get("update-account").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn page_meta_serializes_camel_case() {
        let meta = PageMeta::new(10, 30, 1);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["size"], 10);
        assert_eq!(json["totalElements"], 30);
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["number"], 1);
    }

    #[test]
    fn thirty_accounts_page_size_ten_is_three_pages() {
        assert_eq!(PageMeta::new(10, 30, 0).total_pages, 3);
        assert_eq!(PageMeta::new(10, 31, 0).total_pages, 4);
        assert_eq!(PageMeta::new(10, 0, 0).total_pages, 0);
    }

    #[test]
    fn middle_page_has_all_navigation_links() {
        let meta = PageMeta::new(10, 30, 1);
        let sort = SortSpec::parse("name,DESC").unwrap();
        let links = page_links(&meta, Some(&sort), true);

        assert_eq!(
            links.get("self").unwrap().href,
            "/api/accounts?page=1&size=10&sort=name,DESC"
        );
        assert_eq!(
            links.get("first").unwrap().href,
            "/api/accounts?page=0&size=10&sort=name,DESC"
        );
        assert_eq!(
            links.get("prev").unwrap().href,
            "/api/accounts?page=0&size=10&sort=name,DESC"
        );
        assert_eq!(
            links.get("next").unwrap().href,
            "/api/accounts?page=2&size=10&sort=name,DESC"
        );
        assert_eq!(
            links.get("last").unwrap().href,
            "/api/accounts?page=2&size=10&sort=name,DESC"
        );
        assert!(links.contains("profile"));
        assert!(links.contains("create-account"));
    }

    #[test]
    fn edge_pages_drop_missing_neighbours() {
        let first = page_links(&PageMeta::new(10, 30, 0), None, false);
        assert!(!first.contains("prev"));
        assert!(first.contains("next"));
        assert!(!first.contains("create-account"));

        let last = page_links(&PageMeta::new(10, 30, 2), None, false);
        assert!(last.contains("prev"));
        assert!(!last.contains("next"));
    }

    #[test]
    fn create_request_collects_all_structural_errors() {
        let mut req = CreateAccountRequest {
            email: "  Not-An-Email  ".into(),
            password: "short".into(),
            name: "   ".into(),
            roles: vec![],
        };
        req.normalize();
        let errors = req.structural_errors();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "name", "roles", "password"]);
    }

    #[test]
    fn normalize_lowercases_email() {
        let mut req = CreateAccountRequest {
            email: " Messi1913@Gmail.COM ".into(),
            password: "long-enough".into(),
            name: "Messi".into(),
            roles: vec![Role::User],
        };
        req.normalize();
        assert_eq!(req.email, "messi1913@gmail.com");
        assert!(req.structural_errors().is_empty());
    }

    #[test]
    fn update_request_checks_password_only_when_supplied() {
        let mut req = UpdateAccountRequest {
            email: "a@x.com".into(),
            password: None,
            name: "A".into(),
            roles: vec![Role::User],
        };
        req.normalize();
        assert!(req.structural_errors().is_empty());

        req.password = Some("short".into());
        let errors = req.structural_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }
}
