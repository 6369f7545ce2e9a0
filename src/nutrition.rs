use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

/// Seven tracked nutrients. Used for planned values, aggregated totals and
/// daily targets alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories_kcal: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
    #[serde(default)]
    pub sodium_mg: f64,
    #[serde(default)]
    pub sugar_g: f64,
}

/// A user's daily goals, supplied by the profile collaborator.
pub type NutritionTargets = Nutrition;

/// Logged intake for one meal; each nutrient is present only once the user
/// reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualNutrition {
    pub calories_kcal: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub sugar_g: Option<f64>,
}

impl Nutrition {
    pub fn validate(&self) -> Result<(), TrackingError> {
        for (name, value) in self.fields() {
            check_amount(name, value)?;
        }
        Ok(())
    }

    pub fn add(&mut self, other: &Nutrition) {
        self.calories_kcal += other.calories_kcal;
        self.protein_g += other.protein_g;
        self.carbs_g += other.carbs_g;
        self.fat_g += other.fat_g;
        self.fiber_g += other.fiber_g;
        self.sodium_mg += other.sodium_mg;
        self.sugar_g += other.sugar_g;
    }

    /// Divides every nutrient by `n`; a zero divisor yields all zeros.
    pub fn mean_of(total: &Nutrition, n: usize) -> Nutrition {
        if n == 0 {
            return Nutrition::default();
        }
        let d = n as f64;
        Nutrition {
            calories_kcal: total.calories_kcal / d,
            protein_g: total.protein_g / d,
            carbs_g: total.carbs_g / d,
            fat_g: total.fat_g / d,
            fiber_g: total.fiber_g / d,
            sodium_mg: total.sodium_mg / d,
            sugar_g: total.sugar_g / d,
        }
    }

    fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("calories_kcal", self.calories_kcal),
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
            ("fiber_g", self.fiber_g),
            ("sodium_mg", self.sodium_mg),
            ("sugar_g", self.sugar_g),
        ]
    }
}

impl ActualNutrition {
    pub fn validate(&self) -> Result<(), TrackingError> {
        let fields = [
            ("calories_kcal", self.calories_kcal),
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
            ("fiber_g", self.fiber_g),
            ("sodium_mg", self.sodium_mg),
            ("sugar_g", self.sugar_g),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                check_amount(name, v)?;
            }
        }
        Ok(())
    }

    /// Every nutrient that was logged, with the planned value filling the
    /// gaps. This is the display value for a record, not its contribution to
    /// actual totals.
    pub fn or_planned(&self, planned: &Nutrition) -> Nutrition {
        Nutrition {
            calories_kcal: self.calories_kcal.unwrap_or(planned.calories_kcal),
            protein_g: self.protein_g.unwrap_or(planned.protein_g),
            carbs_g: self.carbs_g.unwrap_or(planned.carbs_g),
            fat_g: self.fat_g.unwrap_or(planned.fat_g),
            fiber_g: self.fiber_g.unwrap_or(planned.fiber_g),
            sodium_mg: self.sodium_mg.unwrap_or(planned.sodium_mg),
            sugar_g: self.sugar_g.unwrap_or(planned.sugar_g),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ActualNutrition::default()
    }
}

fn check_amount(name: &str, value: f64) -> Result<(), TrackingError> {
    if !value.is_finite() || value < 0.0 {
        return Err(TrackingError::InvalidPayload(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}
