//! Child profiles and their vaccination, allergy, and growth records.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug)]
pub struct NewChild<'a> {
    pub user_name: &'a str,
    pub birthday: NaiveDate,
    pub gender: &'a str,
    pub blood_type: &'a str,
}

#[derive(Debug)]
pub struct NewGrowth<'a> {
    pub body_height: f64,
    pub body_weight: f64,
    pub clothes_size: &'a str,
    pub shoes_size: &'a str,
    pub recorded_on: NaiveDate,
}

/// Latest growth measurements, if any were recorded.
#[derive(ToSchema, Serialize, Debug)]
pub struct GrowthSnapshot {
    pub body_height: f64,
    pub body_weight: f64,
    pub clothes_size: String,
    pub shoes_size: String,
    pub recorded_on: NaiveDate,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct VaccinationEntry {
    pub id: Uuid,
    pub vaccine_name: String,
    pub visit_date: NaiveDate,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AllergyEntry {
    pub id: Uuid,
    pub allergy_name: String,
}

/// One child with the aggregated records the list endpoint returns.
#[derive(ToSchema, Serialize, Debug)]
pub struct ChildProfile {
    pub child_id: Uuid,
    pub user_name: String,
    pub birthday: NaiveDate,
    pub gender: String,
    pub blood_type: String,
    pub growth: Option<GrowthSnapshot>,
    pub vaccination: Vec<VaccinationEntry>,
    pub allergy: Vec<AllergyEntry>,
}

#[derive(Clone, Debug)]
pub struct ChildStore {
    pool: PgPool,
}

impl ChildStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    /// Returns an error on database failure.
    pub async fn add_child(&self, account_id: Uuid, child: &NewChild<'_>) -> Result<Uuid> {
        let query = r"
            INSERT INTO account_child (account_id, user_name, birthday, gender, blood_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account_id)
            .bind(child.user_name)
            .bind(child.birthday)
            .bind(child.gender)
            .bind(child.blood_type)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert child")?;
        Ok(row.get("id"))
    }

    /// Whether the child is active and belongs to the account.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn owns_child(&self, account_id: Uuid, child_id: Uuid) -> Result<bool> {
        let query = r"
            SELECT EXISTS(
                SELECT 1 FROM account_child
                WHERE id = $2 AND account_id = $1 AND NOT delete_flg
            ) AS exists
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(account_id)
            .bind(child_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to check child ownership")?;
        Ok(row.get("exists"))
    }

    /// Soft delete; records stay for history. True when a row was marked.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn soft_delete_child(&self, account_id: Uuid, child_id: Uuid) -> Result<bool> {
        let query = r"
            UPDATE account_child SET delete_flg = TRUE
            WHERE id = $2 AND account_id = $1 AND NOT delete_flg
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account_id)
            .bind(child_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to soft delete child")?;
        Ok(result.rows_affected() == 1)
    }

    /// All active children of the account, each with its latest growth
    /// snapshot and full vaccination/allergy lists.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn list_children(&self, account_id: Uuid) -> Result<Vec<ChildProfile>> {
        let query = r"
            SELECT id, user_name, birthday, gender, blood_type
            FROM account_child
            WHERE account_id = $1 AND NOT delete_flg
            ORDER BY created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list children")?;

        let mut children = Vec::with_capacity(rows.len());
        for row in rows {
            let child_id: Uuid = row.get("id");
            children.push(ChildProfile {
                child_id,
                user_name: row.get("user_name"),
                birthday: row.get("birthday"),
                gender: row.get("gender"),
                blood_type: row.get("blood_type"),
                growth: self.latest_growth(child_id).await?,
                vaccination: self.vaccinations(child_id).await?,
                allergy: self.allergies(child_id).await?,
            });
        }

        Ok(children)
    }

    async fn latest_growth(&self, child_id: Uuid) -> Result<Option<GrowthSnapshot>> {
        let query = r"
            SELECT body_height, body_weight, clothes_size, shoes_size, recorded_on
            FROM child_growth_history
            WHERE child_id = $1
            ORDER BY recorded_on DESC, created_at DESC
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(child_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load latest growth record")?;

        Ok(row.map(|row| GrowthSnapshot {
            body_height: row.get("body_height"),
            body_weight: row.get("body_weight"),
            clothes_size: row.get("clothes_size"),
            shoes_size: row.get("shoes_size"),
            recorded_on: row.get("recorded_on"),
        }))
    }

    async fn vaccinations(&self, child_id: Uuid) -> Result<Vec<VaccinationEntry>> {
        let query = r"
            SELECT id, vaccine_name, visit_date
            FROM child_vaccination
            WHERE child_id = $1
            ORDER BY visit_date
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(child_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list vaccinations")?;

        Ok(rows
            .into_iter()
            .map(|row| VaccinationEntry {
                id: row.get("id"),
                vaccine_name: row.get("vaccine_name"),
                visit_date: row.get("visit_date"),
            })
            .collect())
    }

    async fn allergies(&self, child_id: Uuid) -> Result<Vec<AllergyEntry>> {
        let query = r"
            SELECT id, allergy_name
            FROM child_allergy
            WHERE child_id = $1
            ORDER BY created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(child_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list allergies")?;

        Ok(rows
            .into_iter()
            .map(|row| AllergyEntry {
                id: row.get("id"),
                allergy_name: row.get("allergy_name"),
            })
            .collect())
    }

    /// # Errors
    /// Returns an error on database failure.
    pub async fn add_vaccination(
        &self,
        child_id: Uuid,
        vaccine_name: &str,
        visit_date: NaiveDate,
    ) -> Result<Uuid> {
        let query = r"
            INSERT INTO child_vaccination (child_id, vaccine_name, visit_date)
            VALUES ($1, $2, $3)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(child_id)
            .bind(vaccine_name)
            .bind(visit_date)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert vaccination")?;
        Ok(row.get("id"))
    }

    /// Delete a vaccination only when it belongs to the child. True when a
    /// row was removed.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn delete_vaccination(&self, child_id: Uuid, vaccination_id: Uuid) -> Result<bool> {
        let query = "DELETE FROM child_vaccination WHERE id = $2 AND child_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(child_id)
            .bind(vaccination_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete vaccination")?;
        Ok(result.rows_affected() == 1)
    }

    /// # Errors
    /// Returns an error on database failure.
    pub async fn add_allergy(&self, child_id: Uuid, allergy_name: &str) -> Result<Uuid> {
        let query = r"
            INSERT INTO child_allergy (child_id, allergy_name)
            VALUES ($1, $2)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(child_id)
            .bind(allergy_name)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert allergy")?;
        Ok(row.get("id"))
    }

    /// Delete an allergy only when it belongs to the child. True when a
    /// row was removed.
    ///
    /// # Errors
    /// Returns an error on database failure.
    pub async fn delete_allergy(&self, child_id: Uuid, allergy_id: Uuid) -> Result<bool> {
        let query = "DELETE FROM child_allergy WHERE id = $2 AND child_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(child_id)
            .bind(allergy_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete allergy")?;
        Ok(result.rows_affected() == 1)
    }

    /// # Errors
    /// Returns an error on database failure.
    pub async fn add_growth(&self, child_id: Uuid, growth: &NewGrowth<'_>) -> Result<Uuid> {
        let query = r"
            INSERT INTO child_growth_history
                (child_id, body_height, body_weight, clothes_size, shoes_size, recorded_on)
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
            .bind(child_id)
            .bind(growth.body_height)
            .bind(growth.body_weight)
            .bind(growth.clothes_size)
            .bind(growth.shoes_size)
            .bind(growth.recorded_on)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert growth record")?;
        Ok(row.get("id"))
    }
}
