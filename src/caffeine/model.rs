use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;

/// Upper bound on the number of grid points one call may produce.
pub const MAX_SERIES_POINTS: usize = 10_000;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CaffeineError {
    #[error("invalid body profile: half-life must be positive, got {half_life_hours}")]
    InvalidProfile { half_life_hours: f64 },
    #[error("invalid model options: {0}")]
    InvalidOptions(String),
}

/// A dose entering the body at an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intake {
    pub at_ms: i64,
    pub dose_mg: f64,
}

/// Latest body measurements. Only the newest snapshot is used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyProfile {
    pub half_life_hours: f64,
    pub sensitivity: f64,
    pub bioavailability: f64,
}

impl Default for BodyProfile {
    fn default() -> Self {
        Self {
            half_life_hours: 5.0,
            sensitivity: 1.0,
            bioavailability: 1.0,
        }
    }
}

impl BodyProfile {
    pub fn validate(&self) -> Result<(), CaffeineError> {
        validate_half_life(self.half_life_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOptions {
    pub start_ms: i64,
    pub end_ms: i64,
    pub grid_minutes: u32,
    /// Floor the first sample to the top of its UTC hour.
    pub align_to_hour: bool,
    /// Overrides the profile's half-life when set.
    pub half_life_hours: Option<f64>,
}

impl ModelOptions {
    /// Checks the grid and any half-life override without evaluating the
    /// series; returns the number of points.
    pub fn validate(&self) -> Result<usize, CaffeineError> {
        if let Some(half_life_hours) = self.half_life_hours {
            validate_half_life(half_life_hours)?;
        }
        self.grid().map(|(_, _, points)| points)
    }

    fn grid(&self) -> Result<(i64, i64, usize), CaffeineError> {
        if self.grid_minutes == 0 {
            return Err(CaffeineError::InvalidOptions(
                "grid_minutes must be at least 1".into(),
            ));
        }

        let grid_ms = i64::from(self.grid_minutes) * MS_PER_MINUTE;
        let first_ms = if self.align_to_hour {
            self.start_ms.div_euclid(MS_PER_HOUR) * MS_PER_HOUR
        } else {
            self.start_ms
        };
        let span_ms = self.end_ms.saturating_sub(first_ms).max(0);
        let points = (span_ms / grid_ms) as usize;

        if points > MAX_SERIES_POINTS {
            return Err(CaffeineError::InvalidOptions(format!(
                "window needs {points} points, the limit is {MAX_SERIES_POINTS}"
            )));
        }
        Ok((first_ms, grid_ms, points))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaffeineSeriesPoint {
    #[serde(rename = "timeISO")]
    pub time: DateTime<Utc>,
    pub intake_mg: f64,
    pub body_mg: f64,
}

fn validate_half_life(half_life_hours: f64) -> Result<(), CaffeineError> {
    if half_life_hours.is_finite() && half_life_hours > 0.0 {
        Ok(())
    } else {
        Err(CaffeineError::InvalidProfile { half_life_hours })
    }
}

/// How far back events still matter: 24h, or four half-lives if longer.
pub fn lookback_hours(half_life_hours: f64) -> f64 {
    (4.0 * half_life_hours).max(24.0)
}

fn decay(dose_mg: f64, elapsed_ms: i64, half_life_ms: f64) -> f64 {
    dose_mg * 0.5f64.powf(elapsed_ms as f64 / half_life_ms)
}

fn residual(intakes: &[Intake], half_life_ms: f64, at_ms: i64) -> f64 {
    intakes
        .iter()
        .filter(|i| i.at_ms <= at_ms && i.dose_mg.is_finite())
        .map(|i| decay(i.dose_mg, at_ms - i.at_ms, half_life_ms))
        .sum()
}

/// Milligrams remaining at `at_ms` from every intake at or before it.
pub fn body_mg_at(
    intakes: &[Intake],
    half_life_hours: f64,
    at_ms: i64,
) -> Result<f64, CaffeineError> {
    validate_half_life(half_life_hours)?;
    Ok(residual(intakes, half_life_hours * MS_PER_HOUR as f64, at_ms))
}

/// Samples intake and body caffeine on `[start, end)`.
///
/// Points sit at `first + k * grid` for `k = 0..N` where `first` is the
/// (optionally hour-aligned) start and `N = (end - first) / grid`; the end is
/// never sampled. `intake_mg` at a point sums the doses in `(t - grid, t]`,
/// the same doses that first appear in that point's `body_mg`.
pub fn model_caffeine(
    intakes: &[Intake],
    profile: &BodyProfile,
    options: &ModelOptions,
) -> Result<Vec<CaffeineSeriesPoint>, CaffeineError> {
    let half_life_hours = options.half_life_hours.unwrap_or(profile.half_life_hours);
    validate_half_life(half_life_hours)?;

    let (first_ms, grid_ms, points) = options.grid()?;

    let half_life_ms = half_life_hours * MS_PER_HOUR as f64;
    let bioavailability = if profile.bioavailability.is_finite() {
        profile.bioavailability
    } else {
        1.0
    };

    let mut intakes: Vec<Intake> = intakes
        .iter()
        .copied()
        .filter(|i| i.at_ms < options.end_ms)
        .collect();
    intakes.sort_by_key(|i| i.at_ms);

    let mut series = Vec::with_capacity(points);
    for k in 0..points as i64 {
        let t = first_ms + k * grid_ms;
        let upto = intakes.partition_point(|i| i.at_ms <= t);
        let taken = &intakes[..upto];

        let intake_mg: f64 = taken
            .iter()
            .rev()
            .take_while(|i| i.at_ms > t - grid_ms)
            .filter(|i| i.dose_mg.is_finite())
            .map(|i| i.dose_mg)
            .sum();
        let body_mg = bioavailability * residual(taken, half_life_ms, t);

        let Some(time) = DateTime::from_timestamp_millis(t) else {
            return Err(CaffeineError::InvalidOptions(format!(
                "timestamp {t} is out of range"
            )));
        };
        series.push(CaffeineSeriesPoint {
            time,
            intake_mg,
            body_mg,
        });
    }

    Ok(series)
}
