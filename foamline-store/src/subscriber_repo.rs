use async_trait::async_trait;
use foamline_core::booking::CalendarSubscriber;
use foamline_core::error::EngineError;
use foamline_core::repository::SubscriberStore;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: i64,
    email: String,
    unsubscribe_token: Uuid,
    active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<SubscriberRow> for CalendarSubscriber {
    fn from(row: SubscriberRow) -> Self {
        CalendarSubscriber {
            id: row.id,
            email: row.email,
            unsubscribe_token: row.unsubscribe_token,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

fn storage_err(err: sqlx::Error) -> EngineError {
    EngineError::Storage(err.to_string())
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn subscribe(&self, email: &str) -> Result<CalendarSubscriber, EngineError> {
        // Idempotent on email; re-subscribing reactivates.
        let row: SubscriberRow = sqlx::query_as(
            "INSERT INTO calendar_subscribers (email, unsubscribe_token) \
             VALUES (LOWER($1), $2) \
             ON CONFLICT (email) DO UPDATE SET active = TRUE \
             RETURNING id, email, unsubscribe_token, active, created_at",
        )
        .bind(email)
        .bind(Uuid::new_v4())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.into())
    }

    async fn unsubscribe(&self, token: Uuid) -> Result<bool, EngineError> {
        let result = sqlx::query(
            "UPDATE calendar_subscribers SET active = FALSE \
             WHERE unsubscribe_token = $1 AND active",
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_active(&self) -> Result<Vec<CalendarSubscriber>, EngineError> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            "SELECT id, email, unsubscribe_token, active, created_at \
             FROM calendar_subscribers WHERE active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
