//! Persistence port for meal records and daily summaries.
//!
//! The tracking service only needs create/read/update and filtered listing;
//! adapters map their own failures into [`StoreError`].

use async_trait::async_trait;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::meals::{MealRecord, MealStatusKind};
use crate::summaries::DailySummary;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate entry")]
    Duplicate,
    #[error("storage backend failed: {message}")]
    Backend { message: String },
}

/// Selects meal records for one user. Date bounds are inclusive; an empty
/// status list matches every status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub user_id: Uuid,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub statuses: Vec<MealStatusKind>,
}

impl RecordFilter {
    pub fn for_day(user_id: Uuid, date: Date) -> Self {
        Self {
            user_id,
            from: Some(date),
            to: Some(date),
            statuses: Vec::new(),
        }
    }

    pub fn matches(&self, rec: &MealRecord) -> bool {
        rec.user_id == self.user_id
            && self.from.map_or(true, |from| rec.date >= from)
            && self.to.map_or(true, |to| rec.date <= to)
            && (self.statuses.is_empty() || self.statuses.contains(&rec.kind()))
    }
}

/// Storage collaborator. Listings come back ordered by date, then slot.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the (user, date, slot) is taken.
    async fn insert_record(&self, record: &MealRecord) -> Result<(), StoreError>;
    async fn get_record(&self, id: Uuid) -> Result<Option<MealRecord>, StoreError>;
    async fn update_record(&self, record: &MealRecord) -> Result<(), StoreError>;
    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<MealRecord>, StoreError>;

    async fn get_summary(&self, user_id: Uuid, date: Date)
        -> Result<Option<DailySummary>, StoreError>;
    /// Inserts or replaces the summary for its (user, date).
    async fn upsert_summary(&self, summary: &DailySummary) -> Result<(), StoreError>;
    /// Flags the day's summary for recomputation. Returns whether one existed.
    async fn mark_summary_stale(&self, user_id: Uuid, date: Date) -> Result<bool, StoreError>;
    async fn list_summaries(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<DailySummary>, StoreError>;
}
