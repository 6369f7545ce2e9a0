use serde::Deserialize;

use crate::nutrition::NutritionTargets;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub targets: NutritionTargets,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_window")]
    pub days: u32,
}

fn default_window() -> u32 {
    30
}
