//! Daily scheduler
//!
//! Sleeps until the configured UTC time of day, runs the pipeline for every
//! configured station, and repeats. A failing station is logged and does not
//! stop the loop or the other stations.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::operations::Pipeline;

/// First instant strictly after `now` whose UTC time of day is `at`
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let candidate = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

/// Counters since the scheduler started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub runs: u64,
    pub stations_ok: u64,
    pub stations_failed: u64,
    pub beats_published: u64,
}

#[derive(Default)]
struct Counters {
    runs: AtomicU64,
    stations_ok: AtomicU64,
    stations_failed: AtomicU64,
    beats_published: AtomicU64,
}

pub struct Scheduler {
    pipeline: Pipeline,
    stations: Vec<String>,
    at: NaiveTime,
    counters: Arc<Counters>,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline, stations: Vec<String>, at: NaiveTime) -> Self {
        Self {
            pipeline,
            stations,
            at,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            runs: self.counters.runs.load(Ordering::Relaxed),
            stations_ok: self.counters.stations_ok.load(Ordering::Relaxed),
            stations_failed: self.counters.stations_failed.load(Ordering::Relaxed),
            beats_published: self.counters.beats_published.load(Ordering::Relaxed),
        }
    }

    /// Run until `shutdown` resolves
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> SchedulerStats {
        info!(
            "⏰ Starting the scheduler: daily at {} UTC for [{}] -> '{}'",
            self.at.format("%H:%M"),
            self.stations.join(", "),
            self.pipeline.topic()
        );

        tokio::pin!(shutdown);

        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.at);
            let wait = (next - now).to_std().unwrap_or_default();
            info!("💤 Next run at {} (in {}m)", next.format("%Y-%m-%d %H:%M UTC"), wait.as_secs() / 60);

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(wait) => {}
            }

            // A stop request also cuts a run short; unfinished stations are not recorded
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("🛑 Stop requested mid-run, abandoning remaining stations");
                    break;
                }
                _ = self.run_once() => {}
            }
        }

        let stats = self.stats();
        info!("🛑 Scheduler stopped");
        info!("   Runs:            {}", stats.runs);
        info!("   Stations OK:     {}", stats.stations_ok);
        info!("   Stations failed: {}", stats.stations_failed);
        info!("   Beats published: {}", stats.beats_published);
        stats
    }

    /// One pass over every station
    pub async fn run_once(&self) {
        self.counters.runs.fetch_add(1, Ordering::Relaxed);

        for station in &self.stations {
            match self.pipeline.run_station(station, false).await {
                Ok(count) => {
                    self.counters.stations_ok.fetch_add(1, Ordering::Relaxed);
                    self.counters
                        .beats_published
                        .fetch_add(count as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.stations_failed.fetch_add(1, Ordering::Relaxed);
                    error!("❌ {} run failed: {}", station, e);
                }
            }
        }

        let dropped = self.pipeline.cache().cleanup();
        if dropped > 0 {
            info!("🧹 Dropped {} expired published-report entries", dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::{AppError, AppResult, ErrorCode};
    use crate::providers::kafka::MemorySink;
    use crate::providers::nws::ReportSource;
    use async_trait::async_trait;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run_after(utc(2025, 4, 18, 8, 0), at(10, 0)), utc(2025, 4, 18, 10, 0));
    }

    #[test]
    fn test_next_run_tomorrow() {
        assert_eq!(next_run_after(utc(2025, 4, 18, 11, 0), at(10, 0)), utc(2025, 4, 19, 10, 0));
    }

    #[test]
    fn test_next_run_exactly_now_is_tomorrow() {
        assert_eq!(next_run_after(utc(2025, 4, 18, 10, 0), at(10, 0)), utc(2025, 4, 19, 10, 0));
    }

    #[test]
    fn test_next_run_crosses_month_end() {
        assert_eq!(next_run_after(utc(2025, 4, 30, 23, 0), at(10, 0)), utc(2025, 5, 1, 10, 0));
    }

    const REPORT_HTML: &str = "<pre class=\"glossaryProduct\">\n...THE CENTRAL PARK NY CLIMATE SUMMARY FOR APRIL 17 2025...\n\nTEMPERATURE (F)\n YESTERDAY\n  MAXIMUM         64    341 PM\n  MINIMUM         42    542 AM\n  AVERAGE         53\n</pre>";

    /// Serves a report for KNYC and fails every other station
    struct OneStation;

    #[async_trait]
    impl ReportSource for OneStation {
        async fn fetch_report(&self, station_id: &str) -> AppResult<String> {
            if station_id == "KNYC" {
                Ok(REPORT_HTML.to_string())
            } else {
                Err(AppError::new(ErrorCode::FetchHttpStatus, "Error fetching CLI report: HTTP 404"))
            }
        }
    }

    fn scheduler(sink: Arc<MemorySink>) -> Scheduler {
        let pipeline = Pipeline::new(Arc::new(OneStation), sink, "observations");
        Scheduler::new(pipeline, vec!["KNYC".to_string(), "KLGA".to_string()], at(10, 0))
    }

    #[tokio::test]
    async fn test_run_once_continues_past_failures() {
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(sink.clone());

        scheduler.run_once().await;

        let stats = scheduler.stats();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.stations_ok, 1);
        assert_eq!(stats.stations_failed, 1);
        assert_eq!(stats.beats_published, 4);
        assert_eq!(sink.sent().len(), 4);
    }

    #[tokio::test]
    async fn test_second_run_same_day_publishes_nothing() {
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(sink.clone());

        scheduler.run_once().await;
        scheduler.run_once().await;

        assert_eq!(scheduler.stats().beats_published, 4);
        assert_eq!(sink.sent().len(), 4);
    }

    /// Never answers, like a server that accepted the connection and went quiet
    struct HangingSource;

    #[async_trait]
    impl ReportSource for HangingSource {
        async fn fetch_report(&self, _station_id: &str) -> AppResult<String> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_a_run_in_progress() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(Arc::new(HangingSource), sink.clone(), "observations");
        let scheduler = Scheduler::new(pipeline, vec!["KNYC".to_string()], at(10, 0));

        // The run starts within 24h of test time; the stop request lands later
        let shutdown = tokio::time::sleep(std::time::Duration::from_secs(25 * 60 * 60));
        let stats = scheduler.run(shutdown).await;

        assert_eq!(stats.runs, 1);
        assert_eq!(stats.stations_ok, 0);
        assert_eq!(stats.stations_failed, 0);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let scheduler = scheduler(Arc::new(MemorySink::new()));
        let stats = scheduler.run(async {}).await;
        assert_eq!(stats, SchedulerStats::default());
    }
}
