use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::Intake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Beverage {
    Coffee,
    Espresso,
    ColdBrew,
    Tea,
    GreenTea,
    Matcha,
    EnergyDrink,
    Soda,
    Other,
}

impl Beverage {
    pub const ALL: [Beverage; 9] = [
        Beverage::Coffee,
        Beverage::Espresso,
        Beverage::ColdBrew,
        Beverage::Tea,
        Beverage::GreenTea,
        Beverage::Matcha,
        Beverage::EnergyDrink,
        Beverage::Soda,
        Beverage::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Beverage::Coffee => "coffee",
            Beverage::Espresso => "espresso",
            Beverage::ColdBrew => "cold_brew",
            Beverage::Tea => "tea",
            Beverage::GreenTea => "green_tea",
            Beverage::Matcha => "matcha",
            Beverage::EnergyDrink => "energy_drink",
            Beverage::Soda => "soda",
            Beverage::Other => "other",
        }
    }
}

impl fmt::Display for Beverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Beverage {
    type Err = std::convert::Infallible;

    /// Unrecognised names map to `Other` so old rows stay readable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Ok(Beverage::ALL
            .into_iter()
            .find(|b| b.as_str() == normalized)
            .unwrap_or(Beverage::Other))
    }
}

/// A recorded drink. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaffeineEvent {
    pub id: Uuid,
    pub time: DateTime<Utc>,
    pub beverage: Beverage,
    pub amount_ml: Option<f64>,
    /// Overrides the table estimate when the label states the dose.
    pub caffeine_mg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeverageDose {
    pub beverage: Beverage,
    pub mg_per_ml: f64,
    pub default_ml: f64,
}

/// Static beverage -> caffeine density lookup.
#[derive(Debug, Clone)]
pub struct DoseTable {
    entries: Vec<BeverageDose>,
}

impl Default for DoseTable {
    fn default() -> Self {
        let row = |beverage, mg_per_ml, default_ml| BeverageDose {
            beverage,
            mg_per_ml,
            default_ml,
        };
        Self {
            entries: vec![
                row(Beverage::Coffee, 0.40, 240.0),
                row(Beverage::Espresso, 2.12, 30.0),
                row(Beverage::ColdBrew, 0.63, 240.0),
                row(Beverage::Tea, 0.20, 240.0),
                row(Beverage::GreenTea, 0.12, 240.0),
                row(Beverage::Matcha, 0.28, 240.0),
                row(Beverage::EnergyDrink, 0.32, 250.0),
                row(Beverage::Soda, 0.10, 355.0),
                row(Beverage::Other, 0.0, 0.0),
            ],
        }
    }
}

impl DoseTable {
    pub fn entries(&self) -> &[BeverageDose] {
        &self.entries
    }

    pub fn lookup(&self, beverage: Beverage) -> Option<&BeverageDose> {
        self.entries.iter().find(|e| e.beverage == beverage)
    }

    /// Estimated milligrams for one event; anything unknowable counts as 0.
    pub fn dose_mg(&self, event: &CaffeineEvent) -> f64 {
        let dose = match event.caffeine_mg {
            Some(mg) => mg,
            None => self
                .lookup(event.beverage)
                .map(|e| e.mg_per_ml * event.amount_ml.unwrap_or(e.default_ml))
                .unwrap_or(0.0),
        };
        if dose.is_finite() && dose > 0.0 {
            dose
        } else {
            0.0
        }
    }

    pub fn intakes(&self, events: &[CaffeineEvent]) -> Vec<Intake> {
        events
            .iter()
            .map(|event| Intake {
                at_ms: event.time.timestamp_millis(),
                dose_mg: self.dose_mg(event),
            })
            .collect()
    }
}
