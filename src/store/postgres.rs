use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime, Time};
use tracing::debug;
use uuid::Uuid;

use super::{RecordFilter, StoreError, TrackingStore};
use crate::meals::{MealRecord, MealStatus};
use crate::nutrition::{ActualNutrition, Nutrition};
use crate::summaries::DailySummary;

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Backend {
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, FromRow)]
struct MealRecordRow {
    id: Uuid,
    user_id: Uuid,
    date: Date,
    slot: String,
    status_detail: Json<MealStatus>,
    planned: Json<Nutrition>,
    actual: Json<ActualNutrition>,
    planned_portion: f64,
    actual_portion: Option<f64>,
    planned_time: Option<Time>,
    actual_time: Option<Time>,
    satisfaction: Option<i16>,
    difficulty: Option<i16>,
    notes: Option<String>,
    photo_refs: Vec<String>,
    version: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

fn rating_from_db(value: Option<i16>) -> Result<Option<u8>, StoreError> {
    value
        .map(|v| {
            u8::try_from(v).map_err(|_| StoreError::Backend {
                message: format!("stored rating {v} out of range"),
            })
        })
        .transpose()
}

impl TryFrom<MealRecordRow> for MealRecord {
    type Error = StoreError;

    fn try_from(r: MealRecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            slot: r.slot,
            status: r.status_detail.0,
            planned: r.planned.0,
            actual: r.actual.0,
            planned_portion: r.planned_portion,
            actual_portion: r.actual_portion,
            planned_time: r.planned_time,
            actual_time: r.actual_time,
            satisfaction: rating_from_db(r.satisfaction)?,
            difficulty: rating_from_db(r.difficulty)?,
            notes: r.notes,
            photo_refs: r.photo_refs,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    needs_recalculation: bool,
    body: Json<DailySummary>,
}

impl From<SummaryRow> for DailySummary {
    fn from(r: SummaryRow) -> Self {
        let mut summary = r.body.0;
        summary.needs_recalculation = r.needs_recalculation;
        summary
    }
}

const RECORD_COLUMNS: &str = r#"
    id, user_id, date, slot, status_detail, planned, actual,
    planned_portion, actual_portion, planned_time, actual_time,
    satisfaction, difficulty, notes, photo_refs, version, created_at, updated_at
"#;

#[async_trait]
impl TrackingStore for PgStore {
    async fn insert_record(&self, rec: &MealRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO meal_records (
                id, user_id, date, slot, status, status_detail, planned, actual,
                planned_portion, actual_portion, planned_time, actual_time,
                satisfaction, difficulty, notes, photo_refs, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(rec.id)
        .bind(rec.user_id)
        .bind(rec.date)
        .bind(&rec.slot)
        .bind(rec.kind().as_str())
        .bind(Json(&rec.status))
        .bind(Json(&rec.planned))
        .bind(Json(&rec.actual))
        .bind(rec.planned_portion)
        .bind(rec.actual_portion)
        .bind(rec.planned_time)
        .bind(rec.actual_time)
        .bind(rec.satisfaction.map(i16::from))
        .bind(rec.difficulty.map(i16::from))
        .bind(&rec.notes)
        .bind(&rec.photo_refs)
        .bind(rec.version)
        .bind(rec.created_at)
        .bind(rec.updated_at)
        .execute(&self.db)
        .await?;
        debug!(record_id = %rec.id, "meal record inserted");
        Ok(())
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<MealRecord>, StoreError> {
        let row = sqlx::query_as::<_, MealRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM meal_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(MealRecord::try_from).transpose()
    }

    async fn update_record(&self, rec: &MealRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE meal_records
               SET status = $2, status_detail = $3, planned = $4, actual = $5,
                   planned_portion = $6, actual_portion = $7,
                   planned_time = $8, actual_time = $9,
                   satisfaction = $10, difficulty = $11, notes = $12, photo_refs = $13,
                   version = $14, updated_at = $15
             WHERE id = $1
            "#,
        )
        .bind(rec.id)
        .bind(rec.kind().as_str())
        .bind(Json(&rec.status))
        .bind(Json(&rec.planned))
        .bind(Json(&rec.actual))
        .bind(rec.planned_portion)
        .bind(rec.actual_portion)
        .bind(rec.planned_time)
        .bind(rec.actual_time)
        .bind(rec.satisfaction.map(i16::from))
        .bind(rec.difficulty.map(i16::from))
        .bind(&rec.notes)
        .bind(&rec.photo_refs)
        .bind(rec.version)
        .bind(rec.updated_at)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Backend {
                message: format!("meal record {} does not exist", rec.id),
            });
        }
        Ok(())
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<MealRecord>, StoreError> {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let rows = sqlx::query_as::<_, MealRecordRow>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
              FROM meal_records
             WHERE user_id = $1
               AND ($2::date IS NULL OR date >= $2)
               AND ($3::date IS NULL OR date <= $3)
               AND (cardinality($4::text[]) = 0 OR status = ANY($4))
             ORDER BY date, slot, id
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(statuses)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(MealRecord::try_from).collect()
    }

    async fn get_summary(
        &self,
        user_id: Uuid,
        date: Date,
    ) -> Result<Option<DailySummary>, StoreError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT needs_recalculation, body
              FROM daily_summaries
             WHERE user_id = $1 AND date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(DailySummary::from))
    }

    async fn upsert_summary(&self, s: &DailySummary) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO daily_summaries (
                id, user_id, date, week_start, month_key,
                needs_recalculation, last_calculated_at, body
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, date) DO UPDATE
               SET week_start = EXCLUDED.week_start,
                   month_key = EXCLUDED.month_key,
                   needs_recalculation = EXCLUDED.needs_recalculation,
                   last_calculated_at = EXCLUDED.last_calculated_at,
                   body = EXCLUDED.body
            "#,
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(s.date)
        .bind(s.week_start)
        .bind(&s.month_key)
        .bind(s.needs_recalculation)
        .bind(s.last_calculated_at)
        .bind(Json(s))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_summary_stale(&self, user_id: Uuid, date: Date) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE daily_summaries
               SET needs_recalculation = TRUE
             WHERE user_id = $1 AND date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_summaries(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<DailySummary>, StoreError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT needs_recalculation, body
              FROM daily_summaries
             WHERE user_id = $1 AND date BETWEEN $2 AND $3
             ORDER BY date
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(DailySummary::from).collect())
    }
}
