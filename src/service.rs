use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use time::{Date, Duration, Month, OffsetDateTime};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::TrackingError;
use crate::meals::{MealPlanEntry, MealRecord, PlanReseed, TransitionRequest};
use crate::nutrition::NutritionTargets;
use crate::store::{RecordFilter, TrackingStore};
use crate::summaries::{
    aggregate_day, month_bounds, monthly_report, trend_report, week_bounds, weekly_report,
    DailySummary, MonthlyReport, TrendReport, WeeklyReport,
};

pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// One async mutex per (user, date). Every write touching a day, and every
/// recomputation of its summary, runs while holding that day's lock.
#[derive(Default)]
struct DayLocks {
    locks: Mutex<HashMap<(Uuid, Date), Arc<AsyncMutex<()>>>>,
}

impl DayLocks {
    async fn lock(&self, user_id: Uuid, date: Date) -> OwnedMutexGuard<()> {
        let handle = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry((user_id, date)).or_default().clone()
        };
        handle.lock_owned().await
    }
}

/// Entry point for every tracking operation.
pub struct TrackingService {
    store: Arc<dyn TrackingStore>,
    day_locks: DayLocks,
    clock: Clock,
}

impl TrackingService {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self {
            store,
            day_locks: DayLocks::default(),
            clock: Arc::new(OffsetDateTime::now_utc),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }

    /// Seeds a `Planned` record for one slot of a meal plan.
    #[instrument(skip(self, entry), fields(date = %entry.date, slot = %entry.slot))]
    pub async fn create_from_plan(
        &self,
        user_id: Uuid,
        entry: MealPlanEntry,
    ) -> Result<MealRecord, TrackingError> {
        entry.validate()?;
        let record = MealRecord::from_plan(user_id, entry, self.now());

        let _day = self.day_locks.lock(user_id, record.date).await;
        if let Err(e) = self.store.insert_record(&record).await {
            let err = TrackingError::from(e);
            if matches!(err, TrackingError::DuplicateRecord) {
                warn!(%user_id, date = %record.date, slot = %record.slot, "duplicate meal record");
            }
            return Err(err);
        }
        self.store.mark_summary_stale(user_id, record.date).await?;

        info!(%user_id, record_id = %record.id, "meal record created");
        Ok(record)
    }

    async fn load_owned(&self, record_id: Uuid, user_id: Uuid) -> Result<MealRecord, TrackingError> {
        match self.store.get_record(record_id).await? {
            Some(rec) if rec.user_id == user_id => Ok(rec),
            _ => Err(TrackingError::NotFound),
        }
    }

    /// Moves a record to a new status and flags its day for recomputation.
    #[instrument(skip(self, request), fields(status = ?request.transition))]
    pub async fn transition(
        &self,
        record_id: Uuid,
        user_id: Uuid,
        request: TransitionRequest,
    ) -> Result<MealRecord, TrackingError> {
        request.transition.validate()?;
        let date = self.load_owned(record_id, user_id).await?.date;

        let _day = self.day_locks.lock(user_id, date).await;
        let mut record = self.load_owned(record_id, user_id).await?;
        if let Some(expected) = request.expected_version {
            if expected != record.version {
                return Err(TrackingError::ConflictingVersion {
                    expected,
                    actual: record.version,
                });
            }
        }
        let from = record.kind();
        request.transition.apply(&mut record, self.now());
        self.store.update_record(&record).await?;
        self.store.mark_summary_stale(user_id, date).await?;

        info!(
            %user_id,
            %record_id,
            from = %from,
            to = %record.kind(),
            version = record.version,
            "meal status changed"
        );
        Ok(record)
    }

    /// Replaces a record's planned values.
    #[instrument(skip(self, plan))]
    pub async fn reseed_plan(
        &self,
        record_id: Uuid,
        user_id: Uuid,
        plan: PlanReseed,
    ) -> Result<MealRecord, TrackingError> {
        plan.validate()?;
        let date = self.load_owned(record_id, user_id).await?.date;

        let _day = self.day_locks.lock(user_id, date).await;
        let mut record = self.load_owned(record_id, user_id).await?;
        record.reseed(&plan, self.now());
        self.store.update_record(&record).await?;
        self.store.mark_summary_stale(user_id, date).await?;

        info!(%user_id, %record_id, version = record.version, "meal plan re-seeded");
        Ok(record)
    }

    pub async fn query(&self, filter: &RecordFilter) -> Result<Vec<MealRecord>, TrackingError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(TrackingError::InvalidPayload(format!(
                    "date range start {from} is after end {to}"
                )));
            }
        }
        Ok(self.store.list_records(filter).await?)
    }

    /// Returns the day's summary, recomputing it when it is missing, stale,
    /// or `force` is set.
    #[instrument(skip(self, targets))]
    pub async fn summarize(
        &self,
        user_id: Uuid,
        date: Date,
        targets: &NutritionTargets,
        force: bool,
    ) -> Result<DailySummary, TrackingError> {
        targets.validate()?;
        let _day = self.day_locks.lock(user_id, date).await;
        let existing = self.store.get_summary(user_id, date).await?;
        match existing {
            Some(s) if !force && !s.needs_recalculation => {
                debug!(%user_id, %date, "summary is fresh");
                Ok(s)
            }
            other => {
                let id = other.map_or_else(Uuid::new_v4, |s| s.id);
                self.recompute_locked(id, user_id, date, targets).await
            }
        }
    }

    /// Caller must hold the day lock.
    async fn recompute_locked(
        &self,
        id: Uuid,
        user_id: Uuid,
        date: Date,
        targets: &NutritionTargets,
    ) -> Result<DailySummary, TrackingError> {
        let records = self
            .store
            .list_records(&RecordFilter::for_day(user_id, date))
            .await?;
        let summary = aggregate_day(id, user_id, date, &records, targets, self.now())?;
        self.store.upsert_summary(&summary).await?;
        info!(
            %user_id,
            %date,
            meals = records.len(),
            plan_adherence = summary.plan_adherence_score,
            target_adherence = summary.target_adherence_score,
            "daily summary recalculated"
        );
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn invalidate(&self, user_id: Uuid, date: Date) -> Result<(), TrackingError> {
        let _day = self.day_locks.lock(user_id, date).await;
        let existed = self.store.mark_summary_stale(user_id, date).await?;
        debug!(%user_id, %date, existed, "summary invalidated");
        Ok(())
    }

    /// Summaries in range with stale ones recomputed against the targets they
    /// were last computed with.
    async fn fresh_summaries(
        &self,
        user_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<DailySummary>, TrackingError> {
        let mut summaries = self.store.list_summaries(user_id, from, to).await?;
        for slot in summaries.iter_mut().filter(|s| s.needs_recalculation) {
            let _day = self.day_locks.lock(user_id, slot.date).await;
            *slot = match self.store.get_summary(user_id, slot.date).await? {
                Some(s) if s.needs_recalculation => {
                    self.recompute_locked(s.id, user_id, s.date, &s.targets).await?
                }
                Some(s) => s,
                None => continue,
            };
        }
        Ok(summaries)
    }

    /// Report for the ISO week containing `week_start`.
    #[instrument(skip(self))]
    pub async fn weekly_rollup(
        &self,
        user_id: Uuid,
        week_start: Date,
    ) -> Result<WeeklyReport, TrackingError> {
        let (monday, sunday) = week_bounds(week_start)?;
        let summaries = self.fresh_summaries(user_id, monday, sunday).await?;
        Ok(weekly_report(user_id, monday, sunday, &summaries))
    }

    #[instrument(skip(self))]
    pub async fn monthly_rollup(
        &self,
        user_id: Uuid,
        year: i32,
        month: u8,
    ) -> Result<MonthlyReport, TrackingError> {
        let month = Month::try_from(month)
            .map_err(|_| TrackingError::InvalidPayload(format!("month {month} is not 1-12")))?;
        let (first, last) = month_bounds(year, month)?;
        let summaries = self.fresh_summaries(user_id, first, last).await?;
        Ok(monthly_report(user_id, year, month, &summaries))
    }

    /// Trend over the `window_days` days ending today.
    pub async fn trend(&self, user_id: Uuid, window_days: u32) -> Result<TrendReport, TrackingError> {
        let today = self.now().date();
        self.trend_as_of(user_id, window_days, today).await
    }

    #[instrument(skip(self))]
    pub async fn trend_as_of(
        &self,
        user_id: Uuid,
        window_days: u32,
        end: Date,
    ) -> Result<TrendReport, TrackingError> {
        if window_days == 0 {
            return Err(TrackingError::InvalidPayload(
                "trend window must cover at least one day".into(),
            ));
        }
        let start = end
            .checked_sub(Duration::days(i64::from(window_days) - 1))
            .ok_or_else(|| {
                TrackingError::InvalidPayload(format!(
                    "a {window_days} day window ending {end} starts before the earliest date"
                ))
            })?;
        let summaries = self.fresh_summaries(user_id, start, end).await?;
        trend_report(user_id, window_days, start, end, &summaries)
    }
}
