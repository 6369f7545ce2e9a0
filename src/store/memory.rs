use std::collections::HashMap;

use async_trait::async_trait;
use time::Date;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordFilter, StoreError, TrackingStore};
use crate::meals::MealRecord;
use crate::summaries::DailySummary;

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, MealRecord>,
    summaries: HashMap<(Uuid, Date), DailySummary>,
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn insert_record(&self, record: &MealRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let taken = inner.records.values().any(|r| {
            r.user_id == record.user_id && r.date == record.date && r.slot == record.slot
        });
        if taken || inner.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate);
        }
        inner.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<MealRecord>, StoreError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn update_record(&self, record: &MealRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::Backend {
                message: format!("meal record {} does not exist", record.id),
            }),
        }
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<MealRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<MealRecord> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| (a.date, &a.slot, a.id).cmp(&(b.date, &b.slot, b.id)));
        Ok(out)
    }

    async fn get_summary(
        &self,
        user_id: Uuid,
        date: Date,
    ) -> Result<Option<DailySummary>, StoreError> {
        Ok(self.inner.read().await.summaries.get(&(user_id, date)).cloned())
    }

    async fn upsert_summary(&self, summary: &DailySummary) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .summaries
            .insert((summary.user_id, summary.date), summary.clone());
        Ok(())
    }

    async fn mark_summary_stale(&self, user_id: Uuid, date: Date) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.summaries.get_mut(&(user_id, date)) {
            Some(s) => {
                s.needs_recalculation = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_summaries(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<DailySummary>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<DailySummary> = inner
            .summaries
            .values()
            .filter(|s| s.user_id == user_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.date);
        Ok(out)
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;
    use crate::meals::{MealPlanEntry, MealStatusKind};
    use crate::nutrition::Nutrition;
    use time::macros::{date, datetime};

    fn record(user: Uuid, date: Date, slot: &str) -> MealRecord {
        MealRecord::from_plan(
            user,
            MealPlanEntry {
                date,
                slot: slot.into(),
                nutrition: Nutrition::default(),
                portion: 1.0,
                time: None,
            },
            datetime!(2024-03-01 00:00 UTC),
        )
    }

    #[tokio::test]
    async fn rejects_second_record_for_same_slot() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.insert_record(&record(user, date!(2024 - 03 - 11), "lunch")).await.unwrap();
        let err = store
            .insert_record(&record(user, date!(2024 - 03 - 11), "lunch"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate);

        // other slot, day or user is fine
        store.insert_record(&record(user, date!(2024 - 03 - 11), "dinner")).await.unwrap();
        store.insert_record(&record(user, date!(2024 - 03 - 12), "lunch")).await.unwrap();
        store
            .insert_record(&record(Uuid::new_v4(), date!(2024 - 03 - 11), "lunch"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for (d, slot) in [
            (date!(2024 - 03 - 12), "lunch"),
            (date!(2024 - 03 - 11), "lunch"),
            (date!(2024 - 03 - 11), "breakfast"),
            (date!(2024 - 03 - 15), "dinner"),
        ] {
            store.insert_record(&record(user, d, slot)).await.unwrap();
        }

        let filter = RecordFilter {
            user_id: user,
            from: Some(date!(2024 - 03 - 11)),
            to: Some(date!(2024 - 03 - 12)),
            statuses: vec![MealStatusKind::Planned],
        };
        let found = store.list_records(&filter).await.unwrap();
        let keys: Vec<_> = found.iter().map(|r| (r.date, r.slot.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (date!(2024 - 03 - 11), "breakfast"),
                (date!(2024 - 03 - 11), "lunch"),
                (date!(2024 - 03 - 12), "lunch"),
            ]
        );

        let skipped_only = RecordFilter {
            statuses: vec![MealStatusKind::Skipped],
            ..filter
        };
        assert!(store.list_records(&skipped_only).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn marking_missing_summary_is_a_no_op() {
        let store = MemoryStore::new();
        assert!(!store
            .mark_summary_stale(Uuid::new_v4(), date!(2024 - 03 - 11))
            .await
            .unwrap());
    }
}
