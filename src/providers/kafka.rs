//! Beat sinks - where observation beats go
//!
//! - `ObservationProducer`: Kafka via rdkafka, JSON payloads
//! - `StdoutSink`: JSON lines on stdout (dry runs)
//! - `MemorySink`: collects beats in memory

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::config::{split_servers, KafkaSettings};
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::ObservationBeat;
use crate::utils::constants::FLUSH_TIMEOUT_SECS;

/// Destination for observation beats
#[async_trait]
pub trait BeatSink: Send + Sync {
    async fn send_beat(&self, topic: &str, beat: &ObservationBeat, key: Option<&str>) -> AppResult<()>;

    /// Block until everything sent so far is delivered
    async fn flush(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Kafka producer for observation beats
#[derive(Clone)]
pub struct ObservationProducer {
    producer: FutureProducer,
    bootstrap_servers: Vec<String>,
    default_topic: String,
    queue_timeout: Duration,
}

impl ObservationProducer {
    pub fn new(settings: &KafkaSettings) -> AppResult<Self> {
        Self::build(
            settings.bootstrap_list(),
            &settings.client_id,
            &settings.topic,
            settings.message_timeout_ms,
        )
    }

    /// Producer for an explicit comma separated server list; other settings default
    pub fn with_bootstrap_servers(servers: &str) -> AppResult<Self> {
        let defaults = KafkaSettings::default();
        Self::build(
            split_servers(servers),
            &defaults.client_id,
            &defaults.topic,
            defaults.message_timeout_ms,
        )
    }

    fn build(
        bootstrap_servers: Vec<String>,
        client_id: &str,
        default_topic: &str,
        message_timeout_ms: u64,
    ) -> AppResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers.join(","))
            .set("client.id", client_id)
            .set("message.timeout.ms", message_timeout_ms.to_string())
            .create()
            .map_err(|e| {
                AppError::with_source(
                    ErrorCode::PublishProducerInit,
                    format!("Failed to create Kafka producer: {}", e),
                    e,
                )
            })?;

        info!("📡 Kafka producer ready ({})", bootstrap_servers.join(","));

        Ok(Self {
            producer,
            bootstrap_servers,
            default_topic: default_topic.to_string(),
            queue_timeout: Duration::from_millis(message_timeout_ms),
        })
    }

    pub fn bootstrap_servers(&self) -> &[String] {
        &self.bootstrap_servers
    }

    pub fn default_topic(&self) -> &str {
        &self.default_topic
    }
}

#[async_trait]
impl BeatSink for ObservationProducer {
    async fn send_beat(&self, topic: &str, beat: &ObservationBeat, key: Option<&str>) -> AppResult<()> {
        let payload = beat.to_payload()?;

        let mut record: FutureRecord<'_, str, [u8]> =
            FutureRecord::to(topic).payload(payload.as_slice());
        if let Some(key) = key {
            record = record.key(key);
        }

        let (partition, offset) = self
            .producer
            .send(record, self.queue_timeout)
            .await
            .map_err(|(e, _msg)| {
                AppError::with_source(
                    ErrorCode::PublishFailed,
                    format!("Failed to deliver beat to '{}': {}", topic, e),
                    e,
                )
            })?;

        debug!(
            "📨 {}/{} {} -> {}[{}]@{}",
            beat.measurement_type, beat.observation_type, beat.station_id, topic, partition, offset
        );
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(Duration::from_secs(FLUSH_TIMEOUT_SECS)))
        })
        .await
        .map_err(|e| AppError::publish_failed(format!("Flush task failed: {}", e)))??;
        Ok(())
    }
}

/// Writes each beat as one JSON line to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl BeatSink for StdoutSink {
    async fn send_beat(&self, _topic: &str, beat: &ObservationBeat, _key: Option<&str>) -> AppResult<()> {
        let line = serde_json::to_string(beat)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        Ok(())
    }
}

/// A beat as received by `MemorySink`
#[derive(Debug, Clone, PartialEq)]
pub struct SentBeat {
    pub topic: String,
    pub key: Option<String>,
    pub beat: ObservationBeat,
}

/// Collects beats in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    sent: Mutex<Vec<SentBeat>>,
    flushes: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentBeat> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().map(|f| *f).unwrap_or_default()
    }
}

#[async_trait]
impl BeatSink for MemorySink {
    async fn send_beat(&self, topic: &str, beat: &ObservationBeat, key: Option<&str>) -> AppResult<()> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AppError::publish_failed("MemorySink lock poisoned"))?;
        sent.push(SentBeat {
            topic: topic.to_string(),
            key: key.map(String::from),
            beat: beat.clone(),
        });
        Ok(())
    }

    async fn flush(&self) -> AppResult<()> {
        let mut flushes = self
            .flushes
            .lock()
            .map_err(|_| AppError::publish_failed("MemorySink lock poisoned"))?;
        *flushes += 1;
        Ok(())
    }
}

/// Send every beat to `topic`, keyed by station, then flush
pub async fn publish_beats(
    sink: &dyn BeatSink,
    beats: &[ObservationBeat],
    topic: &str,
) -> AppResult<usize> {
    let mut count = 0;
    for beat in beats {
        sink.send_beat(topic, beat, Some(beat.station_id.as_str())).await?;
        count += 1;
    }
    sink.flush().await?;

    info!("✅ Published {} beat(s) to '{}'", count, topic);
    Ok(count)
}
