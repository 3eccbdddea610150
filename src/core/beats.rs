//! Climate report → observation beats
//!
//! Instantaneous extremes are stamped with the time they occurred.
//! Daily aggregates are stamped at 23:59:59 of the report date and are only
//! emitted when the report carries a date.

use chrono::NaiveDateTime;

use crate::models::types::{ClimateReport, ObservationBeat, CLI_SERVICE};
use crate::utils::constants::TIMESTAMP_FORMAT;

const DAILY: &str = "daily";

/// Flatten a report into the beats published for it
pub fn format_beats(report: &ClimateReport) -> Vec<ObservationBeat> {
    let beat = |measurement_type: &str,
                value: f64,
                unit: &str,
                observation_type: &str,
                timestamp: String,
                period: Option<&str>| ObservationBeat {
        measurement_type: measurement_type.to_string(),
        value,
        unit: unit.to_string(),
        observation_type: observation_type.to_string(),
        timestamp,
        station_id: report.station_id.clone(),
        service: CLI_SERVICE.to_string(),
        period: period.map(String::from),
    };

    let mut beats = vec![
        beat(
            "temperature",
            report.temperature_max,
            "F",
            "max",
            format_timestamp(report.temperature_max_datetime),
            None,
        ),
        beat(
            "temperature",
            report.temperature_min,
            "F",
            "min",
            format_timestamp(report.temperature_min_datetime),
            None,
        ),
    ];

    let Some(date) = report.report_datetime else {
        return beats;
    };
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .map(format_timestamp)
        .unwrap_or_default();

    beats.push(beat(
        "temperature",
        report.temperature_avg,
        "F",
        "average",
        end_of_day.clone(),
        Some(DAILY),
    ));
    beats.push(beat(
        "precipitation",
        report.precipitation_yesterday,
        "IN",
        "total",
        end_of_day.clone(),
        Some(DAILY),
    ));

    if let Some(humidity) = report.humidity_avg {
        beats.push(beat(
            "humidity",
            f64::from(humidity),
            "%",
            "average",
            end_of_day.clone(),
            Some(DAILY),
        ));
    }

    if let Some(speed) = report.wind_highest_speed {
        beats.push(beat("wind_speed", speed, "MPH", "max", end_of_day, None));
    }

    beats
}

pub fn format_timestamp(datetime: NaiveDateTime) -> String {
    datetime.format(TIMESTAMP_FORMAT).to_string()
}
