//! NWS product client - Climatological Report (CLI) pages
//!
//! Downloads the HTML product page for a station from forecast.weather.gov:
//!
//! `https://forecast.weather.gov/product.php?site=OKX&issuedby=NYC&product=CLI&format=CI&version=1&glossary=0`
//!
//! Transient failures (connect errors, timeouts, 429, 5xx) are retried with
//! exponential backoff and jitter. Anything else is returned immediately.

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::config::CliSettings;
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    RETRY_BASE_MS, RETRY_JITTER_PERCENT, RETRY_MAX_MS, USER_AGENT as USER_AGENT_CONST,
};

/// Anything that can hand back the raw product page for a station
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_report(&self, station_id: &str) -> AppResult<String>;
}

/// HTTP client for CLI product pages
#[derive(Clone)]
pub struct CliScraper {
    settings: CliSettings,
    client: reqwest::Client,
    base_retry_delay: Duration,
}

impl CliScraper {
    pub fn new(settings: CliSettings) -> AppResult<Self> {
        let client = Self::build_client(settings.timeout())?;
        Ok(Self {
            settings,
            client,
            base_retry_delay: Duration::from_millis(RETRY_BASE_MS),
        })
    }

    /// Override the first backoff step (tests use a few milliseconds)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(AppError::fetch_failed)
    }

    /// Product URL for a station: station params first, then the defaults
    pub fn build_url(&self, station_id: &str) -> AppResult<String> {
        let location = self.settings.location(station_id)?;

        let mut params: Vec<(&str, &str)> = vec![
            ("site", location.site.as_str()),
            ("issuedby", location.issuedby.as_str()),
        ];
        params.extend(
            self.settings
                .default_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        // BTreeMap iteration is alphabetical; keep the NWS conventional order
        params.sort_by_key(|(key, _)| param_rank(key));

        let url = Url::parse_with_params(&self.settings.base_url, &params).map_err(|e| {
            AppError::invalid_config(format!(
                "Invalid cli.base_url '{}': {}",
                self.settings.base_url, e
            ))
        })?;
        Ok(url.to_string())
    }

    /// Fetch with retries on transient errors
    async fn fetch_with_retry(&self, url: &str) -> AppResult<String> {
        let attempts = self.settings.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt, self.settings.max_retries, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => {
                    warn!("⚠️ Fetch attempt {}/{} failed: {}", attempt + 1, attempts, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::empty_response(url)))
    }

    /// Exponential backoff with ±RETRY_JITTER_PERCENT jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_retry_delay.as_millis() as u64;
        let capped = base_ms
            .saturating_mul(2_u64.saturating_pow(attempt - 1))
            .min(RETRY_MAX_MS);

        let jitter_range = (capped * RETRY_JITTER_PERCENT) / 100;
        let jitter: i64 = if jitter_range > 0 {
            rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64))
        } else {
            0
        };
        Duration::from_millis((capped as i64 + jitter).max(0) as u64)
    }

    async fn fetch_once(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AppError::fetch_failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_status(status));
        }

        let body = response.text().await.map_err(AppError::fetch_failed)?;
        if body.trim().is_empty() {
            return Err(AppError::empty_response(url));
        }

        Ok(body)
    }
}

#[async_trait]
impl ReportSource for CliScraper {
    async fn fetch_report(&self, station_id: &str) -> AppResult<String> {
        let url = self.build_url(station_id)?;
        info!("🌐 Fetching CLI report for {}", station_id);
        debug!("   URL: {}", url);

        let body = self.fetch_with_retry(&url).await?;
        debug!("   Received {} bytes", body.len());
        Ok(body)
    }
}

/// Position of a query parameter in the product URL
fn param_rank(key: &str) -> usize {
    const ORDER: [&str; 6] = ["site", "issuedby", "product", "format", "version", "glossary"];
    ORDER.iter().position(|k| *k == key).unwrap_or(ORDER.len())
}
