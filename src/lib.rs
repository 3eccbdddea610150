//! Observation Scraper Library
//!
//! Scrapes National Weather Service Climatological Reports (CLI) and
//! publishes the previous day's observations to Kafka:
//! - Fetch the CLI product page for a station
//! - Parse yesterday's temperature, precipitation, humidity and wind
//! - Flatten the summary into observation beats
//! - Publish the beats as JSON, once a day

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    create_test_beat, format_beats, get_and_publish, get_climate_data, next_run_after,
    normalize_station_id, preview_beats, send_test_beat, CliParser, Pipeline, Scheduler,
    SchedulerStats,
};
pub use models::{
    AppError, AppResult, ClimateReport, CliSettings, ErrorCode, KafkaSettings, Location,
    ObservationBeat, ScheduleSettings, Settings, StateSettings,
};
pub use providers::{
    publish_beats, BeatSink, CliScraper, MemorySink, ObservationProducer, ReportSource, StdoutSink,
};
pub use utils::{shutdown_signal, PublishedCache};
