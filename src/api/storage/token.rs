//! Session tokens: opaque strings bound to one account.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct TokenStore {
    pool: PgPool,
}

impl TokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a fresh token bound to the account and return it.
    ///
    /// # Errors
    /// Returns an error if token generation or the insert fails.
    pub async fn issue(&self, account_id: Uuid) -> Result<String> {
        let token = generate_token()?;

        let query = "INSERT INTO session_token (account_id, token) VALUES ($1, $2)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(&token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session token")?;

        Ok(token)
    }

    /// Resolve a bearer token to its account. Tokens of soft-deleted
    /// accounts do not authenticate.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Uuid>> {
        let query = r"
            SELECT a.id
            FROM session_token st
            JOIN account a ON a.id = st.account_id
            WHERE st.token = $1 AND NOT a.delete_flg
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session token")?;

        Ok(row.map(|row| row.get("id")))
    }

    /// Delete a token; true when one existed.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let query = "DELETE FROM session_token WHERE token = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session token")?;

        Ok(result.rows_affected() == 1)
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_decodes_to_32_bytes() -> Result<()> {
        let token = generate_token()?;
        assert_eq!(token.len(), 43);
        let decoded = Base64UrlUnpadded::decode_vec(&token)
            .map_err(|e| anyhow::anyhow!("token is not base64url: {e}"))?;
        assert_eq!(decoded.len(), 32);
        Ok(())
    }

    #[test]
    fn generated_tokens_differ() -> Result<()> {
        let first = generate_token()?;
        let second = generate_token()?;
        assert_ne!(first, second);
        Ok(())
    }
}
