use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::effective::display_nutrition;
use super::repo_types::{MealRecord, MealStatusKind};
use crate::error::TrackingError;
use crate::nutrition::Nutrition;
use crate::store::RecordFilter;

#[derive(Debug, Serialize)]
pub struct MealDetails {
    #[serde(flatten)]
    pub record: MealRecord,
    /// Logged values with planned ones filling the gaps.
    pub shown_nutrition: Nutrition,
}

impl From<MealRecord> for MealDetails {
    fn from(record: MealRecord) -> Self {
        let shown_nutrition = display_nutrition(&record);
        Self {
            record,
            shown_nutrition,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MealQuery {
    pub from: Option<Date>,
    pub to: Option<Date>,
    /// Comma-separated statuses, e.g. `consumed,replaced`.
    pub status: Option<String>,
}

impl MealQuery {
    pub fn into_filter(self, user_id: Uuid) -> Result<RecordFilter, TrackingError> {
        let statuses = match self.status.as_deref() {
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse::<MealStatusKind>)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(RecordFilter {
            user_id,
            from: self.from,
            to: self.to,
            statuses,
        })
    }
}
