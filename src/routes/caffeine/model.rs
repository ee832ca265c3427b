use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::caffeine::{Beverage, BodyProfile, CaffeineEvent};

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    time: DateTime<Utc>,
    beverage: String,
    amount_ml: Option<f64>,
    caffeine_mg: Option<f64>,
}

impl From<EventRow> for CaffeineEvent {
    fn from(row: EventRow) -> Self {
        CaffeineEvent {
            id: row.id,
            time: row.time,
            beverage: row.beverage.parse().unwrap_or(Beverage::Other),
            amount_ml: row.amount_ml,
            caffeine_mg: row.caffeine_mg,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    half_life_hours: f64,
    sensitivity: f64,
    bioavailability: f64,
}

#[derive(Debug, Deserialize)]
pub struct NewEventRequest {
    pub time: Option<DateTime<Utc>>,
    pub beverage: String,
    pub amount_ml: Option<f64>,
    pub caffeine_mg: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: CaffeineEvent,
    pub dose_mg: f64,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub half_life_hours: f64,
    pub sensitivity: Option<f64>,
    pub bioavailability: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CurrentLevel {
    pub time: DateTime<Utc>,
    pub body_mg: f64,
    pub half_life_hours: f64,
}

pub async fn events_between(
    pool: &PgPool,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<CaffeineEvent>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT id, time, beverage, amount_ml, caffeine_mg
        FROM caffeine_events
        WHERE time >= $1 AND time < $2
        ORDER BY time ASC
        "#,
    )
    .bind(since)
    .bind(until)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CaffeineEvent::from).collect())
}

pub async fn insert_event(pool: &PgPool, event: &CaffeineEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO caffeine_events (id, time, beverage, amount_ml, caffeine_mg, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(event.id)
    .bind(event.time)
    .bind(event.beverage.as_str())
    .bind(event.amount_ml)
    .bind(event.caffeine_mg)
    .execute(pool)
    .await?;

    Ok(())
}

/// Newest profile snapshot, if one has ever been recorded.
pub async fn latest_profile(pool: &PgPool) -> Result<Option<BodyProfile>, sqlx::Error> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT half_life_hours, sensitivity, bioavailability
        FROM body_profiles
        ORDER BY recorded_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| BodyProfile {
        half_life_hours: r.half_life_hours,
        sensitivity: r.sensitivity,
        bioavailability: r.bioavailability,
    }))
}

pub async fn insert_profile(pool: &PgPool, profile: &BodyProfile) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO body_profiles (id, half_life_hours, sensitivity, bioavailability, recorded_at)
        VALUES ($1, $2, $3, $4, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile.half_life_hours)
    .bind(profile.sensitivity)
    .bind(profile.bioavailability)
    .execute(pool)
    .await?;

    Ok(())
}
