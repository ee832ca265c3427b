//! Single-compartment caffeine model: intake events decay with first-order
//! elimination, sampled on a fixed grid.

mod doses;
mod model;

pub use doses::{Beverage, BeverageDose, CaffeineEvent, DoseTable};
pub use model::{
    BodyProfile, CaffeineError, CaffeineSeriesPoint, Intake, MAX_SERIES_POINTS, ModelOptions,
    body_mg_at, lookback_hours, model_caffeine,
};
