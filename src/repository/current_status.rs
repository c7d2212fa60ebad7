//! Current status repository (singleton row)
//!
//! Read-modify-write operations lock the row with `SELECT ... FOR UPDATE`
//! inside a transaction so the sensor ingestor and admin requests never
//! interleave on it.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::current_status::{CurrentStatus, FloorPolicy, STATUS_ID},
};

#[derive(Clone)]
pub struct CurrentStatusRepository {
    pool: Pool<Postgres>,
}

impl CurrentStatusRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch the singleton row
    pub async fn get(&self) -> AppResult<CurrentStatus> {
        sqlx::query_as::<_, CurrentStatus>("SELECT * FROM current_status WHERE id = $1")
            .bind(STATUS_ID)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotInitialized)
    }

    /// Create the singleton row if absent; returns whether it was created
    pub async fn ensure(&self, default_capacity: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO current_status (id, current_visitors, max_capacity, is_open)
            VALUES ($1, 0, $2, TRUE)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(STATUS_ID)
        .bind(default_capacity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Apply a visitor delta under `policy` and return the updated row
    pub async fn adjust_visitors(&self, delta: i32, policy: FloorPolicy) -> AppResult<CurrentStatus> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_as::<_, CurrentStatus>(
            "SELECT * FROM current_status WHERE id = $1 FOR UPDATE",
        )
        .bind(STATUS_ID)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotInitialized)?;

        let next = status.visitors_after(delta, policy);
        if next != status.current_visitors.saturating_add(delta).max(0) {
            tracing::info!("Maintaining minimum visitor count of 1 while open");
        }

        let updated = sqlx::query_as::<_, CurrentStatus>(
            r#"
            UPDATE current_status
            SET current_visitors = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(STATUS_ID)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Replace the visitor count unconditionally
    pub async fn overwrite_visitors(&self, current_visitors: i32) -> AppResult<CurrentStatus> {
        self.update_returning(
            "UPDATE current_status SET current_visitors = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            current_visitors,
        )
        .await
    }

    pub async fn set_max_capacity(&self, max_capacity: i32) -> AppResult<CurrentStatus> {
        self.update_returning(
            "UPDATE current_status SET max_capacity = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            max_capacity,
        )
        .await
    }

    pub async fn set_open(&self, is_open: bool) -> AppResult<CurrentStatus> {
        sqlx::query_as::<_, CurrentStatus>(
            "UPDATE current_status SET is_open = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(STATUS_ID)
        .bind(is_open)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotInitialized)
    }

    async fn update_returning(&self, query: &str, value: i32) -> AppResult<CurrentStatus> {
        sqlx::query_as::<_, CurrentStatus>(query)
            .bind(STATUS_ID)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotInitialized)
    }
}
