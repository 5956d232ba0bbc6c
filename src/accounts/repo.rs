use sqlx::PgPool;

use crate::accounts::model::{Account, Role};
use crate::error::FieldError;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, name, roles, created_at, updated_at";

/// Sortable columns for account listing. Keeping this a closed enum is what
/// lets the ORDER BY clause be assembled from static strings only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Email,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl SortSpec {
    /// Parses `field` or `field,DIRECTION` (e.g. `name,DESC`). Direction is
    /// case-insensitive, the field name is not.
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let mut parts = raw.splitn(2, ',');
        let field = match parts.next().unwrap_or("").trim() {
            "id" => SortField::Id,
            "email" => SortField::Email,
            "name" => SortField::Name,
            other => {
                return Err(FieldError::new(
                    "sort",
                    "invalid",
                    format!("unsupported sort field ({})", other),
                ))
            }
        };
        let direction = match parts.next().map(|d| d.trim().to_ascii_lowercase()) {
            None => SortDirection::Asc,
            Some(d) if d == "asc" => SortDirection::Asc,
            Some(d) if d == "desc" => SortDirection::Desc,
            Some(d) => {
                return Err(FieldError::new(
                    "sort",
                    "invalid",
                    format!("unsupported sort direction ({})", d),
                ))
            }
        };
        Ok(Self { field, direction })
    }

    /// ORDER BY clause with id as tiebreaker, so pagination is stable even
    /// when the sort column has duplicates.
    fn order_clause(&self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::Id, SortDirection::Asc) => "id ASC",
            (SortField::Id, SortDirection::Desc) => "id DESC",
            (SortField::Email, SortDirection::Asc) => "email ASC, id ASC",
            (SortField::Email, SortDirection::Desc) => "email DESC, id ASC",
            (SortField::Name, SortDirection::Asc) => "name ASC, id ASC",
            (SortField::Name, SortDirection::Desc) => "name DESC, id ASC",
        }
    }

    /// Query-string form, `name,DESC`, used when rebuilding page links.
    pub fn to_query(&self) -> String {
        let field = match self.field {
            SortField::Id => "id",
            SortField::Email => "email",
            SortField::Name => "name",
        };
        let direction = match self.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        format!("{},{}", field, direction)
    }
}

impl Account {
    pub async fn insert(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
        roles: &[Role],
    ) -> Result<Account, sqlx::Error> {
        let sql = format!(
            "INSERT INTO accounts (email, password_hash, name, roles)
             VALUES ($1, $2, $3, $4)
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .bind(password_hash)
            .bind(name)
            .bind(roles)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<Account>, sqlx::Error> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Exact match on the stored email. Emails are normalized to lowercase
    /// before any write, so this doubles as a case-insensitive lookup.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Zero-indexed page of accounts in the given sort order.
    pub async fn list(
        db: &PgPool,
        page: i64,
        size: i64,
        sort: SortSpec,
    ) -> Result<Vec<Account>, sqlx::Error> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY {} LIMIT $1 OFFSET $2",
            sort.order_clause()
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(size)
            .bind(page * size)
            .fetch_all(db)
            .await
    }

    pub async fn count(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM accounts")
            .fetch_one(db)
            .await
    }

    /// Full replace of the mutable fields for an existing id. Returns `None`
    /// when the id does not exist.
    pub async fn update(
        db: &PgPool,
        id: i64,
        email: &str,
        password_hash: &str,
        name: &str,
        roles: &[Role],
    ) -> Result<Option<Account>, sqlx::Error> {
        let sql = format!(
            "UPDATE accounts
             SET email = $2, password_hash = $3, name = $4, roles = $5, updated_at = now()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(email)
            .bind(password_hash)
            .bind(name)
            .bind(roles)
            .fetch_optional(db)
            .await
    }
}

/// True when the error is Postgres rejecting a duplicate email. The UNIQUE
/// constraint is the final arbiter for creates racing on the same address.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_and_direction() {
        let spec = SortSpec::parse("name,DESC").unwrap();
        assert_eq!(spec.field, SortField::Name);
        assert_eq!(spec.direction, SortDirection::Desc);
        assert_eq!(spec.to_query(), "name,DESC");
    }

    #[test]
    fn direction_defaults_to_ascending() {
        let spec = SortSpec::parse("email").unwrap();
        assert_eq!(spec.field, SortField::Email);
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn direction_is_case_insensitive() {
        let spec = SortSpec::parse("id,desc").unwrap();
        assert_eq!(spec.direction, SortDirection::Desc);
    }

    #[test]
    fn rejects_unknown_field() {
        let err = SortSpec::parse("password_hash,ASC").unwrap_err();
        assert_eq!(err.field, "sort");
        assert!(err.message.contains("password_hash"));
    }

    #[test]
    fn rejects_unknown_direction() {
        let err = SortSpec::parse("name,sideways").unwrap_err();
        assert_eq!(err.field, "sort");
        assert!(err.message.contains("sideways"));
    }

    #[test]
    fn tiebreaks_on_id_for_non_id_sorts() {
        let spec = SortSpec::parse("name,DESC").unwrap();
        assert_eq!(spec.order_clause(), "name DESC, id ASC");
        assert_eq!(SortSpec::default().order_clause(), "id ASC");
    }
}
