//! Configuration module for the observation scraper
//!
//! Settings come from YAML files in a config directory:
//! - `cli.yaml`      product endpoint and station locations (required)
//! - `kafka.yaml`    broker and topic (required)
//! - `schedule.yaml` daily run time and stations (optional)
//!
//! `state.path` (no file of its own, usually set from the environment) says
//! where published reports are remembered between runs.
//!
//! Any key can be overridden from the environment with the `OBS__` prefix,
//! e.g. `OBS__KAFKA__BOOTSTRAP_SERVERS=broker:9092`.

use chrono::NaiveTime;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_BOOTSTRAP_SERVER, DEFAULT_CLIENT_ID, DEFAULT_FETCH_RETRIES, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MESSAGE_TIMEOUT_MS, DEFAULT_RUN_TIME, DEFAULT_STATE_FILE, DEFAULT_STATION,
    DEFAULT_TOPIC, ENV_PREFIX, PUBLISHED_TTL_SECS,
};

/// All runtime settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub cli: CliSettings,
    pub kafka: KafkaSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub state: StateSettings,
}

impl Settings {
    /// Load settings from `config_dir`, then apply environment overrides
    pub fn load(config_dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = config_dir.as_ref();
        info!("⚙️ Loading configuration from {}", dir.display());

        let config = Config::builder()
            .add_source(File::from(dir.join("cli.yaml")).format(FileFormat::Yaml))
            .add_source(File::from(dir.join("kafka.yaml")).format(FileFormat::Yaml))
            .add_source(
                File::from(dir.join("schedule.yaml"))
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("schedule.stations"),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.check()?;

        debug!(
            "Loaded {} station location(s), topic '{}'",
            settings.cli.locations.len(),
            settings.kafka.topic
        );
        Ok(settings)
    }

    /// Cross-field checks that serde cannot express
    fn check(&self) -> AppResult<()> {
        if self.cli.base_url.trim().is_empty() {
            return Err(AppError::invalid_config("cli.base_url must not be empty"));
        }
        self.schedule.run_time()?;
        for station in &self.schedule.stations {
            self.cli.location(station)?;
        }
        Ok(())
    }
}

/// NWS product endpoint and station table
#[derive(Debug, Clone, Deserialize)]
pub struct CliSettings {
    pub base_url: String,
    #[serde(default)]
    pub default_params: BTreeMap<String, String>,
    #[serde(default)]
    pub locations: BTreeMap<String, Location>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fetch_retries")]
    pub max_retries: u32,
}

impl CliSettings {
    /// Look up a station; ids are matched case-insensitively
    pub fn location(&self, station_id: &str) -> AppResult<&Location> {
        self.locations
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(station_id))
            .map(|(_, location)| location)
            .ok_or_else(|| AppError::unknown_station(station_id))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Forecast office (`site`) and issuing station (`issuedby`) of a CLI product
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub site: String,
    pub issuedby: String,
}

/// Kafka producer settings
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSettings {
    /// Comma separated `host:port` list
    #[serde(default = "default_bootstrap_servers")]
    pub bootstrap_servers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

impl KafkaSettings {
    pub fn bootstrap_list(&self) -> Vec<String> {
        split_servers(&self.bootstrap_servers)
    }
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_bootstrap_servers(),
            topic: default_topic(),
            client_id: default_client_id(),
            message_timeout_ms: default_message_timeout_ms(),
        }
    }
}

/// Split a comma separated server list, falling back to localhost
pub fn split_servers(servers: &str) -> Vec<String> {
    let list: Vec<String> = servers
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if list.is_empty() {
        vec![DEFAULT_BOOTSTRAP_SERVER.to_string()]
    } else {
        list
    }
}

/// Daily scheduler settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    /// UTC time of day, `HH:MM`
    #[serde(default = "default_run_time")]
    pub at: String,
    #[serde(default = "default_stations")]
    pub stations: Vec<String>,
}

impl ScheduleSettings {
    pub fn run_time(&self) -> AppResult<NaiveTime> {
        NaiveTime::parse_from_str(self.at.trim(), "%H:%M").map_err(|e| {
            AppError::invalid_config(format!("schedule.at '{}' is not HH:MM: {}", self.at, e))
        })
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            at: default_run_time(),
            stations: default_stations(),
        }
    }
}

/// Where the published-report cache is kept between runs
#[derive(Debug, Clone, Deserialize)]
pub struct StateSettings {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
    #[serde(default = "default_published_ttl_secs")]
    pub ttl_secs: u64,
}

impl StateSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            ttl_secs: default_published_ttl_secs(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_fetch_retries() -> u32 {
    DEFAULT_FETCH_RETRIES
}

fn default_bootstrap_servers() -> String {
    DEFAULT_BOOTSTRAP_SERVER.to_string()
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_message_timeout_ms() -> u64 {
    DEFAULT_MESSAGE_TIMEOUT_MS
}

fn default_run_time() -> String {
    DEFAULT_RUN_TIME.to_string()
}

fn default_stations() -> Vec<String> {
    vec![DEFAULT_STATION.to_string()]
}

fn default_state_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_STATE_FILE)
}

fn default_published_ttl_secs() -> u64 {
    PUBLISHED_TTL_SECS
}
