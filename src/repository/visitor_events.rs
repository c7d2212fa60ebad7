//! Visitor events repository (append-only log)

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::visitor_event::{EventTally, VisitorEvent, VisitorEventRow, VisitorEventType},
};

#[derive(Clone)]
pub struct VisitorEventsRepository {
    pool: Pool<Postgres>,
}

impl VisitorEventsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append one event
    pub async fn append(
        &self,
        event_type: VisitorEventType,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<VisitorEvent> {
        let row = sqlx::query_as::<_, VisitorEventRow>(
            r#"
            INSERT INTO visitor_events (event_type, occurred_at)
            VALUES ($1, $2)
            RETURNING id, event_type, occurred_at
            "#,
        )
        .bind(event_type.as_str())
        .bind(occurred_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Most recent events first
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<VisitorEvent>> {
        let rows = sqlx::query_as::<_, VisitorEventRow>(
            r#"
            SELECT id, event_type, occurred_at
            FROM visitor_events
            ORDER BY occurred_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(VisitorEvent::try_from).collect()
    }

    /// Entry and exit counts with `since <= occurred_at <= until`
    pub async fn tally_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<EventTally> {
        let tally = sqlx::query_as::<_, EventTally>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE event_type = 'entry') AS entries,
                COUNT(*) FILTER (WHERE event_type = 'exit') AS exits
            FROM visitor_events
            WHERE occurred_at >= $1 AND occurred_at <= $2
            "#,
        )
        .bind(since)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(tally)
    }
}
