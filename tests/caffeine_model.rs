use chrono::{TimeZone, Utc};
use dashboard_api::caffeine::{
    Beverage, BodyProfile, CaffeineEvent, DoseTable, ModelOptions, model_caffeine,
};
use uuid::Uuid;

fn drink(
    hour: u32,
    beverage: Beverage,
    amount_ml: Option<f64>,
    caffeine_mg: Option<f64>,
) -> CaffeineEvent {
    CaffeineEvent {
        id: Uuid::new_v4(),
        time: Utc.with_ymd_and_hms(2024, 3, 9, hour, 0, 0).unwrap(),
        beverage,
        amount_ml,
        caffeine_mg,
    }
}

#[test]
fn recorded_drinks_flow_into_the_series() {
    let table = DoseTable::default();
    let events = vec![
        // 200 ml of drip coffee at 0.4 mg/ml.
        drink(8, Beverage::Coffee, Some(200.0), None),
        drink(13, Beverage::EnergyDrink, None, Some(40.0)),
    ];
    let intakes = table.intakes(&events);

    let start = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap();
    let options = ModelOptions {
        start_ms: start.timestamp_millis(),
        end_ms: end.timestamp_millis(),
        grid_minutes: 60,
        align_to_hour: true,
        half_life_hours: None,
    };
    let profile = BodyProfile::default();
    let series = model_caffeine(&intakes, &profile, &options).unwrap();

    assert_eq!(series.len(), 12);
    assert!((series[5].body_mg - 80.0).abs() < 1e-9);
    let total_intake: f64 = series.iter().map(|p| p.intake_mg).sum();
    assert!((total_intake - 120.0).abs() < 1e-9);

    // Decay is monotone between doses.
    for pair in series[6..].windows(2) {
        assert!(pair[1].body_mg < pair[0].body_mg);
    }
}
