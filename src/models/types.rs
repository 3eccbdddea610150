//! Type definitions for the observation pipeline
//! Parsed climate reports and the flat beats published to Kafka

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::errors::{AppError, AppResult};

/// Plausible surface temperature range in °F
pub const TEMPERATURE_RANGE_F: (f64, f64) = (-150.0, 150.0);

/// Service tag carried by every beat produced from a CLI report
pub const CLI_SERVICE: &str = "CLI";

/// Yesterday's climate summary for one station, as parsed from a CLI report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateReport {
    /// Summary date as printed in the report, e.g. "APRIL 17 2025"
    pub report_date: Option<String>,
    pub report_datetime: Option<NaiveDate>,
    pub station_id: String,

    pub temperature_max: f64,
    pub temperature_min: f64,
    pub temperature_avg: f64,

    /// Local standard time of the extreme, e.g. "3:41 PM"
    pub temperature_max_time: String,
    pub temperature_min_time: String,
    pub temperature_max_datetime: NaiveDateTime,
    pub temperature_min_datetime: NaiveDateTime,

    /// Inches; 0.0 when the report has no measurable value
    pub precipitation_yesterday: f64,

    pub humidity_highest: Option<u32>,
    pub humidity_lowest: Option<u32>,
    pub humidity_avg: Option<u32>,

    pub wind_highest_speed: Option<f64>,
    pub wind_highest_direction: Option<String>,
    pub wind_avg_speed: Option<f64>,
}

impl ClimateReport {
    /// Build a report holding only the required temperature fields
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_id: impl Into<String>,
        temperature_max: f64,
        temperature_min: f64,
        temperature_avg: f64,
        temperature_max_time: impl Into<String>,
        temperature_min_time: impl Into<String>,
        temperature_max_datetime: NaiveDateTime,
        temperature_min_datetime: NaiveDateTime,
    ) -> Self {
        Self {
            report_date: None,
            report_datetime: None,
            station_id: station_id.into(),
            temperature_max,
            temperature_min,
            temperature_avg,
            temperature_max_time: temperature_max_time.into(),
            temperature_min_time: temperature_min_time.into(),
            temperature_max_datetime,
            temperature_min_datetime,
            precipitation_yesterday: 0.0,
            humidity_highest: None,
            humidity_lowest: None,
            humidity_avg: None,
            wind_highest_speed: None,
            wind_highest_direction: None,
            wind_avg_speed: None,
        }
    }

    /// Check every measured value against its physical range
    pub fn validate(&self) -> AppResult<()> {
        let (lo, hi) = TEMPERATURE_RANGE_F;
        for (name, value) in [
            ("temperature_max", self.temperature_max),
            ("temperature_min", self.temperature_min),
            ("temperature_avg", self.temperature_avg),
        ] {
            if !(lo..=hi).contains(&value) {
                return Err(AppError::out_of_range(format!(
                    "Temperature value {} ({}) is outside reasonable range",
                    value, name
                )));
            }
        }

        if self.precipitation_yesterday < 0.0 {
            return Err(AppError::out_of_range(format!(
                "Precipitation value cannot be negative: {}",
                self.precipitation_yesterday
            )));
        }

        for value in [self.humidity_highest, self.humidity_lowest, self.humidity_avg]
            .into_iter()
            .flatten()
        {
            if value > 100 {
                return Err(AppError::out_of_range(format!(
                    "Humidity value must be between 0 and 100, got {}",
                    value
                )));
            }
        }

        for value in [self.wind_highest_speed, self.wind_avg_speed]
            .into_iter()
            .flatten()
        {
            if value < 0.0 {
                return Err(AppError::out_of_range(format!(
                    "Wind speed value cannot be negative: {}",
                    value
                )));
            }
        }

        Ok(())
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} {} | Max: {}F @ {} | Min: {}F @ {} | Avg: {}F | Precip: {:.2}in",
            self.station_id,
            self.report_date.as_deref().unwrap_or("(undated)"),
            self.temperature_max,
            self.temperature_max_time,
            self.temperature_min,
            self.temperature_min_time,
            self.temperature_avg,
            self.precipitation_yesterday,
        )
    }
}

/// Flat observation message published to Kafka
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationBeat {
    pub measurement_type: String,
    pub value: f64,
    pub unit: String,
    pub observation_type: String,
    /// `%Y-%m-%dT%H:%M:%SZ`
    pub timestamp: String,
    pub station_id: String,
    pub service: String,
    /// Aggregation window for averages and totals, e.g. "daily"
    pub period: Option<String>,
}

impl ObservationBeat {
    /// JSON payload bytes as sent on the wire
    pub fn to_payload(&self) -> AppResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ClimateReport {
        let day = NaiveDate::from_ymd_opt(2025, 4, 17).unwrap();
        let mut report = ClimateReport::new(
            "KNYC",
            64.0,
            42.0,
            53.0,
            "3:41 PM",
            "5:42 AM",
            day.and_hms_opt(15, 41, 0).unwrap(),
            day.and_hms_opt(5, 42, 0).unwrap(),
        );
        report.report_date = Some("APRIL 17 2025".to_string());
        report.report_datetime = Some(day);
        report.humidity_highest = Some(55);
        report.humidity_lowest = Some(15);
        report.humidity_avg = Some(35);
        report.wind_highest_speed = Some(17.0);
        report.wind_highest_direction = Some("NW".to_string());
        report.wind_avg_speed = Some(6.6);
        report
    }

    #[test]
    fn test_report_creation() {
        let report = sample_report();
        assert_eq!(report.station_id, "KNYC");
        assert_eq!(report.temperature_max, 64.0);
        assert_eq!(report.temperature_max_time, "3:41 PM");
        assert_eq!(report.precipitation_yesterday, 0.0);
        assert_eq!(report.humidity_avg, Some(35));
        assert!(report.validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut report = sample_report();
        report.temperature_max = 200.0;
        let err = report.validate().unwrap_err();
        assert_eq!(err.code_str(), "VALIDATION_OUT_OF_RANGE");

        let mut report = sample_report();
        report.temperature_min = -151.0;
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_humidity_out_of_range() {
        let mut report = sample_report();
        report.humidity_avg = Some(120);
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_negative_precipitation_and_wind() {
        let mut report = sample_report();
        report.precipitation_yesterday = -1.0;
        assert!(report.validate().is_err());

        let mut report = sample_report();
        report.wind_avg_speed = Some(-0.5);
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_beat_serializes_null_period() {
        let beat = ObservationBeat {
            measurement_type: "temperature".to_string(),
            value: 64.0,
            unit: "F".to_string(),
            observation_type: "max".to_string(),
            timestamp: "2025-04-17T15:41:00Z".to_string(),
            station_id: "KNYC".to_string(),
            service: CLI_SERVICE.to_string(),
            period: None,
        };

        let json: serde_json::Value = serde_json::from_slice(&beat.to_payload().unwrap()).unwrap();
        assert_eq!(json["measurement_type"], "temperature");
        assert_eq!(json["value"], 64.0);
        assert_eq!(json["service"], "CLI");
        assert!(json["period"].is_null());
    }
}
