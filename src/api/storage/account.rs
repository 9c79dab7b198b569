//! Account rows: uniqueness checks, creation, credential verification.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{is_unique_violation, violated_constraint};

/// Fields persisted on sign-up; the password arrives raw and is hashed
/// here, nowhere else.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub user_id: &'a str,
    pub user_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub gender: &'a str,
    pub birthday: NaiveDate,
}

/// Insert result. Conflicts are data, not errors: the unique indexes
/// arbitrate races the pre-insert checks cannot see.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Uuid),
    DuplicateUserId,
    DuplicateEmail,
}

/// Resolved active account.
#[derive(Debug)]
pub struct AccountRef {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether an active account already claims this user id.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn exists_by_user_id(&self, user_id: &str) -> Result<bool> {
        let query =
            "SELECT EXISTS(SELECT 1 FROM account WHERE user_id = $1 AND NOT delete_flg) AS exists";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check user_id existence")?;
        Ok(row.get("exists"))
    }

    /// Whether an active account already claims this email.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let query =
            "SELECT EXISTS(SELECT 1 FROM account WHERE email = $1 AND NOT delete_flg) AS exists";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check email existence")?;
        Ok(row.get("exists"))
    }

    /// Insert a new account, mapping unique-index conflicts back to the
    /// duplicate outcomes so concurrent sign-ups cannot both succeed.
    ///
    /// # Errors
    /// Returns an error on hashing or database failure other than a
    /// uniqueness conflict.
    pub async fn create(&self, account: &NewAccount<'_>) -> Result<CreateOutcome> {
        let password_hash =
            bcrypt::hash(account.password, bcrypt::DEFAULT_COST).context("failed to hash password")?;

        let query = r"
            INSERT INTO account (user_id, user_name, email, password_hash, gender, birthday)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account.user_id)
            .bind(account.user_name)
            .bind(account.email)
            .bind(&password_hash)
            .bind(account.gender)
            .bind(account.birthday)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(row.get("id"))),
            Err(err) if is_unique_violation(&err) => {
                match violated_constraint(&err).as_deref() {
                    Some("account_email_key") => Ok(CreateOutcome::DuplicateEmail),
                    _ => Ok(CreateOutcome::DuplicateUserId),
                }
            }
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    /// Resolve a sign-in identifier (user id or email) and verify the
    /// password in one step. An unknown identifier and a wrong password are
    /// indistinguishable: both come back as `None`.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn verify_credentials(&self, identifier: &str, password: &str) -> Result<Option<Uuid>> {
        let query = r"
            SELECT id, password_hash
            FROM account
            WHERE (user_id = $1 OR email = $1) AND NOT delete_flg
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to resolve credentials")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: Uuid = row.get("id");
        let password_hash: String = row.get("password_hash");

        // A malformed stored hash fails verification rather than erroring,
        // keeping the failure indistinguishable from a wrong password.
        let valid = bcrypt::verify(password, &password_hash).unwrap_or(false);

        Ok(valid.then_some(id))
    }

    /// Resolve an identifier to an active account. Soft-deleted rows do
    /// not resolve even though they still exist.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn resolve_active(&self, identifier: &str) -> Result<Option<AccountRef>> {
        let query = r"
            SELECT id, user_name, email
            FROM account
            WHERE (user_id = $1 OR email = $1) AND NOT delete_flg
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to resolve account")?;

        Ok(row.map(|row| AccountRef {
            id: row.get("id"),
            user_name: row.get("user_name"),
            email: row.get("email"),
        }))
    }

    /// Replace the stored secret (password reset).
    ///
    /// # Errors
    /// Returns an error on hashing or database failure, or when the
    /// account no longer exists.
    pub async fn replace_password(&self, id: Uuid, password: &str) -> Result<()> {
        let password_hash =
            bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash password")?;

        let query = "UPDATE account SET password_hash = $2 WHERE id = $1 AND NOT delete_flg";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(&password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to replace password")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("account {id} not found for password replacement"));
        }

        Ok(())
    }
}
