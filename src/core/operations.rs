//! Pipeline operations: fetch → extract → parse → beats → publish

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::beats::format_beats;
use crate::core::parser::CliParser;
use crate::models::errors::AppResult;
use crate::models::types::{ClimateReport, ObservationBeat};
use crate::providers::kafka::{publish_beats, BeatSink};
use crate::providers::nws::ReportSource;
use crate::utils::cache::PublishedCache;

/// Fetch and parse yesterday's climate summary for a station
pub async fn get_climate_data(source: &dyn ReportSource, station_id: &str) -> AppResult<ClimateReport> {
    let station_id = normalize_station_id(station_id);
    let html = source.fetch_report(&station_id).await?;

    let parser = CliParser::new();
    let content = parser.extract_report_content(&html)?;
    let report = parser.parse_report(&content, &station_id)?;

    info!("🌡️ {}", report.summary());
    Ok(report)
}

/// ICAO ids are upper case; `knyc` and `KNYC ` name the same station
pub fn normalize_station_id(station_id: &str) -> String {
    station_id.trim().to_ascii_uppercase()
}

/// Fetch and parse a station's report and return its beats without publishing
pub async fn preview_beats(source: &dyn ReportSource, station_id: &str) -> AppResult<Vec<ObservationBeat>> {
    let report = get_climate_data(source, station_id).await?;
    Ok(format_beats(&report))
}

/// Fetch, parse and publish one station's beats, returning how many were sent
pub async fn get_and_publish(
    source: &dyn ReportSource,
    sink: &dyn BeatSink,
    station_id: &str,
    topic: &str,
) -> AppResult<usize> {
    let report = get_climate_data(source, station_id).await?;
    let beats = format_beats(&report);
    publish_beats(sink, &beats, topic).await
}

/// Smoke-test beat used to check a deployment can reach Kafka
pub fn create_test_beat() -> ObservationBeat {
    ObservationBeat {
        measurement_type: "temperature".to_string(),
        value: 22.5,
        unit: "celsius".to_string(),
        observation_type: "test_deployment".to_string(),
        timestamp: format!("{}Z", Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f")),
        station_id: "DEPLOYMENT_TEST_STATION".to_string(),
        service: "kubernetes_deployment_test".to_string(),
        period: Some("test".to_string()),
    }
}

pub async fn send_test_beat(sink: &dyn BeatSink, topic: &str) -> AppResult<usize> {
    publish_beats(sink, &[create_test_beat()], topic).await
}

/// Long-lived pipeline shared by the scheduler and one-shot commands.
/// Skips station/date pairs that were already published, across processes
/// when a state file is attached.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn ReportSource>,
    sink: Arc<dyn BeatSink>,
    cache: PublishedCache,
    state_file: Option<PathBuf>,
    topic: String,
}

impl Pipeline {
    pub fn new(source: Arc<dyn ReportSource>, sink: Arc<dyn BeatSink>, topic: impl Into<String>) -> Self {
        Self {
            source,
            sink,
            cache: PublishedCache::new(),
            state_file: None,
            topic: topic.into(),
        }
    }

    pub fn with_cache(mut self, cache: PublishedCache) -> Self {
        self.cache = cache;
        self
    }

    /// Seed the cache from `path` and write it back after every publish.
    /// An unreadable state file is logged and replaced.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>, ttl: std::time::Duration) -> Self {
        let path = path.into();
        self.cache = match PublishedCache::load(&path, ttl) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("⚠️ Ignoring state file {}: {}", path.display(), e);
                PublishedCache::with_ttl(ttl)
            }
        };
        self.state_file = Some(path);
        self
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn cache(&self) -> &PublishedCache {
        &self.cache
    }

    /// Publish one station. Returns 0 when the report date was already published and `force` is off.
    pub async fn run_station(&self, station_id: &str, force: bool) -> AppResult<usize> {
        let report = get_climate_data(self.source.as_ref(), station_id).await?;
        let station_id = report.station_id.as_str();

        if let (false, Some(date)) = (force, report.report_datetime) {
            if let Some(beats) = self.cache.get(station_id, date) {
                warn!(
                    "⏭️ {} {} already published ({} beats), skipping",
                    station_id, date, beats
                );
                return Ok(0);
            }
        }

        let beats = format_beats(&report);
        let count = publish_beats(self.sink.as_ref(), &beats, &self.topic).await?;

        if let Some(date) = report.report_datetime {
            self.cache.insert(station_id, date, count);
            if let Some(path) = &self.state_file {
                // Beats are already out; a failed save only risks a duplicate later
                if let Err(e) = self.cache.save(path) {
                    warn!("⚠️ Could not save state file {}: {}", path.display(), e);
                }
            }
        }
        Ok(count)
    }
}
