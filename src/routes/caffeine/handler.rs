use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    caffeine::{
        Beverage, BeverageDose, BodyProfile, CaffeineEvent, CaffeineSeriesPoint, ModelOptions,
        body_mg_at, lookback_hours, model_caffeine,
    },
    error::AppError,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{
    CurrentLevel, EventView, NewEventRequest, ProfileUpdateRequest, events_between, insert_event,
    insert_profile, latest_profile,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

const DEFAULT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Default, Deserialize)]
pub struct SeriesQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub grid_minutes: Option<u32>,
    pub align_to_hour: Option<bool>,
    pub half_life_hours: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub since: Option<String>,
    pub until: Option<String>,
}

/// Accepts RFC 3339 timestamps or epoch milliseconds.
pub(crate) fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| AppError::Validation(format!("{field} is out of range")));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::Validation(format!("{field} must be an RFC 3339 timestamp")))
}

/// Resolves an optional `[start, end)` pair, defaulting to the day before `now`.
fn window(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let end = match end {
        Some(raw) => parse_instant("end", raw)?,
        None => now,
    };
    let start = match start {
        Some(raw) => parse_instant("start", raw)?,
        None => end - Duration::hours(DEFAULT_WINDOW_HOURS),
    };
    if end < start {
        return Err(AppError::Validation("end must not be before start".into()));
    }
    Ok((start, end))
}

impl SeriesQuery {
    pub fn resolve(&self, now: DateTime<Utc>, default_grid: u32) -> Result<ModelOptions, AppError> {
        let (start, end) = window(self.start.as_deref(), self.end.as_deref(), now)?;
        Ok(ModelOptions {
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
            grid_minutes: self.grid_minutes.unwrap_or(default_grid),
            align_to_hour: self.align_to_hour.unwrap_or(false),
            half_life_hours: self.half_life_hours,
        })
    }
}

async fn current_profile(state: &AppState) -> Result<BodyProfile, AppError> {
    Ok(latest_profile(&state.pool)
        .await?
        .unwrap_or_else(|| BodyProfile {
            half_life_hours: state.config.caffeine_half_life_hours,
            ..BodyProfile::default()
        }))
}

/// Earliest event time that still contributes at `from`.
fn lookback_start(from: DateTime<Utc>, half_life_hours: f64) -> DateTime<Utc> {
    let minutes = (lookback_hours(half_life_hours) * 60.0).ceil() as i64;
    Duration::try_minutes(minutes)
        .and_then(|d| from.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub async fn series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> ApiResult<Vec<CaffeineSeriesPoint>> {
    let options = query.resolve(Utc::now(), state.config.caffeine_grid_minutes)?;
    // Rejects a bad grid or half-life override before touching the database.
    options.validate()?;
    let profile = current_profile(&state).await?;

    let half_life_hours = options.half_life_hours.unwrap_or(profile.half_life_hours);
    BodyProfile {
        half_life_hours,
        ..profile
    }
    .validate()?;

    let (since, until) = match (
        DateTime::from_timestamp_millis(options.start_ms),
        DateTime::from_timestamp_millis(options.end_ms),
    ) {
        (Some(start), Some(end)) => (lookback_start(start, half_life_hours), end),
        _ => return Err(AppError::Validation("window is out of range".into())),
    };

    let events = events_between(&state.pool, since, until).await?;
    let intakes = state.doses.intakes(&events);
    let points = model_caffeine(&intakes, &profile, &options)?;

    tracing::debug!(
        events = events.len(),
        points = points.len(),
        "Modelled caffeine series"
    );
    Ok(success_to_api_response(points))
}

pub async fn current(State(state): State<AppState>) -> ApiResult<CurrentLevel> {
    let profile = current_profile(&state).await?;
    profile.validate()?;

    let now = Utc::now();
    let since = lookback_start(now, profile.half_life_hours);
    let events = events_between(&state.pool, since, now).await?;
    let intakes = state.doses.intakes(&events);
    let residual_mg = body_mg_at(&intakes, profile.half_life_hours, now.timestamp_millis())?;
    let body_mg = profile.bioavailability * residual_mg;

    Ok(success_to_api_response(CurrentLevel {
        time: now,
        body_mg,
        half_life_hours: profile.half_life_hours,
    }))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Vec<EventView>> {
    let (since, until) = window(query.since.as_deref(), query.until.as_deref(), Utc::now())?;
    let events = events_between(&state.pool, since, until).await?;

    let views = events
        .into_iter()
        .map(|event| EventView {
            dose_mg: state.doses.dose_mg(&event),
            event,
        })
        .collect();
    Ok(success_to_api_response(views))
}

fn non_negative(field: &str, value: Option<f64>) -> Result<Option<f64>, AppError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        ))),
        other => Ok(other),
    }
}

impl NewEventRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> Result<CaffeineEvent, AppError> {
        let beverage: Beverage = self.beverage.parse().unwrap_or(Beverage::Other);
        Ok(CaffeineEvent {
            id: Uuid::new_v4(),
            time: self.time.unwrap_or(now),
            beverage,
            amount_ml: non_negative("amount_ml", self.amount_ml)?,
            caffeine_mg: non_negative("caffeine_mg", self.caffeine_mg)?,
        })
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<NewEventRequest>,
) -> ApiResult<EventView> {
    let event = request.into_event(Utc::now())?;
    insert_event(&state.pool, &event).await?;

    let dose_mg = state.doses.dose_mg(&event);
    tracing::info!(beverage = %event.beverage, dose_mg, "Recorded caffeine event");
    Ok(success_to_api_response(EventView { event, dose_mg }))
}

pub async fn get_profile(State(state): State<AppState>) -> ApiResult<BodyProfile> {
    Ok(success_to_api_response(current_profile(&state).await?))
}

impl ProfileUpdateRequest {
    pub fn into_profile(self) -> Result<BodyProfile, AppError> {
        let defaults = BodyProfile::default();
        let profile = BodyProfile {
            half_life_hours: self.half_life_hours,
            sensitivity: self.sensitivity.unwrap_or(defaults.sensitivity),
            bioavailability: self.bioavailability.unwrap_or(defaults.bioavailability),
        };
        profile.validate()?;

        if !(profile.sensitivity.is_finite() && profile.sensitivity > 0.0) {
            return Err(AppError::Validation("sensitivity must be positive".into()));
        }
        if !(profile.bioavailability > 0.0 && profile.bioavailability <= 1.0) {
            return Err(AppError::Validation(
                "bioavailability must be in (0, 1]".into(),
            ));
        }
        Ok(profile)
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileUpdateRequest>,
) -> ApiResult<BodyProfile> {
    let profile = request.into_profile()?;
    insert_profile(&state.pool, &profile).await?;

    tracing::info!(half_life_hours = profile.half_life_hours, "Stored body profile");
    Ok(success_to_api_response(profile))
}

pub async fn beverages(State(state): State<AppState>) -> ApiResult<Vec<BeverageDose>> {
    Ok(success_to_api_response(state.doses.entries().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caffeine::CaffeineError;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap()
    }

    #[test]
    fn series_defaults_to_last_day() {
        let options = SeriesQuery::default().resolve(now(), 15).unwrap();
        assert_eq!(options.end_ms, now().timestamp_millis());
        assert_eq!(options.end_ms - options.start_ms, 24 * 3_600_000);
        assert_eq!(options.grid_minutes, 15);
        assert!(!options.align_to_hour);
    }

    #[test]
    fn series_accepts_rfc3339_and_epoch_ms() {
        let query = SeriesQuery {
            start: Some("2024-03-09T08:00:00Z".into()),
            end: Some(now().timestamp_millis().to_string()),
            grid_minutes: Some(60),
            align_to_hour: Some(true),
            half_life_hours: Some(4.0),
        };
        let options = query.resolve(now(), 15).unwrap();
        assert_eq!(options.end_ms - options.start_ms, 12 * 3_600_000);
        assert_eq!(options.grid_minutes, 60);
        assert_eq!(options.half_life_hours, Some(4.0));
    }

    #[test]
    fn inverted_window_is_a_validation_error() {
        let query = SeriesQuery {
            start: Some("2024-03-09T21:00:00Z".into()),
            ..SeriesQuery::default()
        };
        assert!(matches!(query.resolve(now(), 15), Err(AppError::Validation(_))));
    }

    #[test]
    fn lookback_start_never_panics() {
        assert_eq!(lookback_start(now(), 5.0), now() - Duration::hours(24));
        assert_eq!(lookback_start(now(), 1e300), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn garbage_timestamp_is_a_validation_error() {
        assert!(matches!(
            parse_instant("start", "yesterday"),
            Err(AppError::Validation(msg)) if msg.starts_with("start")
        ));
    }

    #[test]
    fn new_event_defaults_time_and_parses_beverage() {
        let event = NewEventRequest {
            time: None,
            beverage: "Espresso".into(),
            amount_ml: Some(30.0),
            caffeine_mg: None,
        }
        .into_event(now())
        .unwrap();
        assert_eq!(event.time, now());
        assert_eq!(event.beverage, Beverage::Espresso);
    }

    #[test]
    fn negative_volume_is_rejected() {
        let result = NewEventRequest {
            time: None,
            beverage: "tea".into(),
            amount_ml: Some(-1.0),
            caffeine_mg: None,
        }
        .into_event(now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn profile_update_rejects_zero_half_life() {
        let result = ProfileUpdateRequest {
            half_life_hours: 0.0,
            sensitivity: None,
            bioavailability: None,
        }
        .into_profile();
        assert!(matches!(
            result,
            Err(AppError::Caffeine(CaffeineError::InvalidProfile { .. }))
        ));
    }

    #[test]
    fn profile_update_checks_bioavailability_range() {
        let result = ProfileUpdateRequest {
            half_life_hours: 5.0,
            sensitivity: None,
            bioavailability: Some(1.5),
        }
        .into_profile();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
