//! Hourly aggregates repository

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{hourly_aggregate::HourlyAggregate, visitor_event::VisitorEventType},
};

#[derive(Clone)]
pub struct HourlyAggregatesRepository {
    pool: Pool<Postgres>,
}

impl HourlyAggregatesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fold one event into the (date, hour) row, creating it if needed
    pub async fn record(
        &self,
        date: NaiveDate,
        hour: i32,
        event_type: VisitorEventType,
        current_visitors: i32,
    ) -> AppResult<HourlyAggregate> {
        let mut tx = self.pool.begin().await?;

        // First event of the hour seeds the row; a concurrent creator makes this a no-op
        let seeded = HourlyAggregate::seeded(date, hour, event_type, current_visitors);
        let inserted = sqlx::query_as::<_, HourlyAggregate>(
            r#"
            INSERT INTO hourly_aggregates (date, hour, entry_count, exit_count, peak_visitors)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (date, hour) DO NOTHING
            RETURNING date, hour, entry_count, exit_count, peak_visitors
            "#,
        )
        .bind(seeded.date)
        .bind(seeded.hour)
        .bind(seeded.entry_count)
        .bind(seeded.exit_count)
        .bind(seeded.peak_visitors)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = inserted {
            tx.commit().await?;
            return Ok(row);
        }

        let mut row = sqlx::query_as::<_, HourlyAggregate>(
            r#"
            SELECT date, hour, entry_count, exit_count, peak_visitors
            FROM hourly_aggregates
            WHERE date = $1 AND hour = $2
            FOR UPDATE
            "#,
        )
        .bind(date)
        .bind(hour)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Internal(format!("Hourly aggregate {} {:02}h vanished during upsert", date, hour))
        })?;

        row.record(event_type, current_visitors);

        sqlx::query(
            r#"
            UPDATE hourly_aggregates
            SET entry_count = $3, exit_count = $4, peak_visitors = $5
            WHERE date = $1 AND hour = $2
            "#,
        )
        .bind(date)
        .bind(hour)
        .bind(row.entry_count)
        .bind(row.exit_count)
        .bind(row.peak_visitors)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Rows recorded for one calendar date, ascending by hour
    pub async fn list_for_date(&self, date: NaiveDate) -> AppResult<Vec<HourlyAggregate>> {
        let rows = sqlx::query_as::<_, HourlyAggregate>(
            r#"
            SELECT date, hour, entry_count, exit_count, peak_visitors
            FROM hourly_aggregates
            WHERE date = $1
            ORDER BY hour ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
