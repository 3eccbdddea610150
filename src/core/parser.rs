//! Climatological Report (CLI) parser
//!
//! A CLI product page wraps a fixed-width text report in
//! `<pre class="glossaryProduct">`. The sections used here look like:
//!
//! ```text
//! ...THE CENTRAL PARK NY CLIMATE SUMMARY FOR APRIL 17 2025...
//!
//! TEMPERATURE (F)
//!  YESTERDAY
//!   MAXIMUM         64    341 PM  96    2002  63      1       62
//!   MINIMUM         42    542 AM  27    1875  46     -4       50
//!   AVERAGE         53                        54     -1       56
//!
//! PRECIPITATION (IN)
//!   YESTERDAY        0.00          1.59 1873   0.13  -0.13     0.02
//! ```
//!
//! Only the morning "yesterday" summary is accepted. The afternoon edition
//! reports "TODAY" values that are still changing.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::errors::{AppError, AppResult};
use crate::models::types::ClimateReport;
use crate::utils::constants::REPORT_DATE_FORMAT;

lazy_static! {
    static ref REPORT_SELECTOR: Selector =
        Selector::parse("pre.glossaryProduct").expect("static selector");
    static ref DATE_RE: Regex =
        Regex::new(r"\.\.\.THE .* CLIMATE SUMMARY FOR ([A-Z]+ \d+ \d+)\.\.\.").expect("static regex");
    static ref YESTERDAY_RE: Regex =
        Regex::new(r"(?s)TEMPERATURE \(F\).*?YESTERDAY").expect("static regex");
    static ref TODAY_RE: Regex =
        Regex::new(r"(?s)TEMPERATURE \(F\).*?TODAY").expect("static regex");
    static ref TEMPERATURE_RE: Regex = Regex::new(
        r"(?s)TEMPERATURE \(F\).*?YESTERDAY.*?MAXIMUM\s+(-?\d+)\s+(\d+)\s+([AP]M).*?MINIMUM\s+(-?\d+)\s+(\d+)\s+([AP]M).*?AVERAGE\s+(-?\d+)"
    )
    .expect("static regex");
    static ref PRECIPITATION_RE: Regex =
        Regex::new(r"(?s)PRECIPITATION \(IN\).*?YESTERDAY\s+(\d+\.\d+)").expect("static regex");
    static ref HUMIDITY_RE: Regex = Regex::new(
        r"(?s)RELATIVE HUMIDITY \(PERCENT\).*?HIGHEST\s+(\d+).*?LOWEST\s+(\d+).*?AVERAGE\s+(\d+)"
    )
    .expect("static regex");
    static ref WIND_RE: Regex = Regex::new(
        r"(?s)WIND \(MPH\).*?HIGHEST WIND SPEED\s+(\d+).*?HIGHEST WIND DIRECTION\s+([A-Z]+).*?AVERAGE WIND SPEED\s+([\d\.]+)"
    )
    .expect("static regex");
}

/// Temperature section of a report
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureBlock {
    pub max: f64,
    pub min: f64,
    pub avg: f64,
    pub max_time: String,
    pub min_time: String,
    pub max_datetime: NaiveDateTime,
    pub min_datetime: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HumidityBlock {
    pub highest: u32,
    pub lowest: u32,
    pub average: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindBlock {
    pub highest_speed: f64,
    pub highest_direction: String,
    pub average_speed: f64,
}

/// Stateless CLI report parser
#[derive(Debug, Default, Clone, Copy)]
pub struct CliParser;

impl CliParser {
    pub fn new() -> Self {
        Self
    }

    /// Text of the report `<pre>` block
    pub fn extract_report_content(&self, html: &str) -> AppResult<String> {
        let document = Html::parse_document(html);
        document
            .select(&REPORT_SELECTOR)
            .next()
            .map(|element| element.text().collect::<String>())
            .ok_or_else(AppError::missing_content)
    }

    /// True if the report holds yesterday's final values
    pub fn validate_report_type(&self, content: &str) -> bool {
        if content.contains("TEMPERATURE (F)\n YESTERDAY") {
            return true;
        }
        if content.contains("TEMPERATURE (F)\n TODAY") || content.contains("VALID TODAY AS OF") {
            return false;
        }

        let has_yesterday = YESTERDAY_RE.is_match(content);
        let has_today = TODAY_RE.is_match(content);
        match (has_yesterday, has_today) {
            (true, false) => true,
            (false, true) => false,
            _ => content.contains("YESTERDAY") && !content.contains("VALID TODAY"),
        }
    }

    /// Summary date, e.g. ("APRIL 17 2025", 2025-04-17)
    pub fn extract_report_date(&self, content: &str) -> AppResult<(String, NaiveDate)> {
        let date_str = DATE_RE
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(AppError::missing_date)?;

        let date = NaiveDate::parse_from_str(&date_str, REPORT_DATE_FORMAT)
            .map_err(|_| AppError::missing_date())?;

        Ok((date_str, date))
    }

    /// Parse a report, anchoring undated reports to today's UTC date
    pub fn parse_report(&self, content: &str, station_id: &str) -> AppResult<ClimateReport> {
        self.parse_report_with_fallback(content, station_id, Utc::now().date_naive())
    }

    /// Parse a report; `fallback_date` anchors extreme times when the report has no date
    pub fn parse_report_with_fallback(
        &self,
        content: &str,
        station_id: &str,
        fallback_date: NaiveDate,
    ) -> AppResult<ClimateReport> {
        if !self.validate_report_type(content) {
            return Err(AppError::wrong_report_type());
        }

        let (report_date, report_datetime) = match self.extract_report_date(content) {
            Ok((date_str, date)) => (Some(date_str), Some(date)),
            Err(_) => {
                debug!("No summary date in report for {}, using {}", station_id, fallback_date);
                (None, None)
            }
        };

        let temperature = self
            .parse_temperature(content, report_datetime.unwrap_or(fallback_date))
            .ok_or_else(AppError::missing_temperature)?;

        let mut report = ClimateReport::new(
            station_id,
            temperature.max,
            temperature.min,
            temperature.avg,
            temperature.max_time,
            temperature.min_time,
            temperature.max_datetime,
            temperature.min_datetime,
        );
        report.report_date = report_date;
        report.report_datetime = report_datetime;

        if let Some(precipitation) = self.parse_precipitation(content) {
            report.precipitation_yesterday = precipitation;
        }

        if let Some(humidity) = self.parse_humidity(content) {
            report.humidity_highest = Some(humidity.highest);
            report.humidity_lowest = Some(humidity.lowest);
            report.humidity_avg = Some(humidity.average);
        }

        if let Some(wind) = self.parse_wind(content) {
            report.wind_highest_speed = Some(wind.highest_speed);
            report.wind_highest_direction = Some(wind.highest_direction);
            report.wind_avg_speed = Some(wind.average_speed);
        }

        report.validate()?;
        Ok(report)
    }

    /// Temperature section; `None` when absent or the clock values are invalid
    pub fn parse_temperature(&self, content: &str, date: NaiveDate) -> Option<TemperatureBlock> {
        let caps = TEMPERATURE_RE.captures(content)?;

        let max: i32 = caps[1].parse().ok()?;
        let (max_time, max_clock) = clock_time(caps[2].parse().ok()?, &caps[3])?;
        let min: i32 = caps[4].parse().ok()?;
        let (min_time, min_clock) = clock_time(caps[5].parse().ok()?, &caps[6])?;
        let avg: i32 = caps[7].parse().ok()?;

        Some(TemperatureBlock {
            max: f64::from(max),
            min: f64::from(min),
            avg: f64::from(avg),
            max_time,
            min_time,
            max_datetime: date.and_time(max_clock),
            min_datetime: date.and_time(min_clock),
        })
    }

    /// Yesterday's precipitation in inches. Trace ("T") and missing ("MM") do not match.
    pub fn parse_precipitation(&self, content: &str) -> Option<f64> {
        let caps = PRECIPITATION_RE.captures(content)?;
        caps[1].parse().ok()
    }

    pub fn parse_humidity(&self, content: &str) -> Option<HumidityBlock> {
        let caps = HUMIDITY_RE.captures(content)?;
        Some(HumidityBlock {
            highest: caps[1].parse().ok()?,
            lowest: caps[2].parse().ok()?,
            average: caps[3].parse().ok()?,
        })
    }

    pub fn parse_wind(&self, content: &str) -> Option<WindBlock> {
        let caps = WIND_RE.captures(content)?;
        Some(WindBlock {
            highest_speed: caps[1].parse().ok()?,
            highest_direction: caps[2].to_string(),
            average_speed: caps[3].parse().ok()?,
        })
    }
}

/// Convert an `hmm`/`hhmm` clock value plus AM/PM into display text and a 24h time
fn clock_time(hhmm: u32, meridiem: &str) -> Option<(String, NaiveTime)> {
    let hour = hhmm / 100;
    let minute = hhmm % 100;
    if hour > 12 || minute > 59 {
        return None;
    }

    let hour_24 = match meridiem {
        "AM" if hour == 12 => 0,
        "AM" => hour,
        "PM" if hour == 12 => 12,
        "PM" => hour + 12,
        _ => return None,
    };

    let display = format!("{}:{:02} {}", hour, minute, meridiem);
    Some((display, NaiveTime::from_hms_opt(hour_24, minute, 0)?))
}
