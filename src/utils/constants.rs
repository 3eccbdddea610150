//! Constants Module - Single Source of Truth
//!
//! Defaults, endpoint pieces and wire formats shared across the crate.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "observation-scraper";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent to forecast.weather.gov
pub const USER_AGENT: &str = concat!("observation-scraper/", env!("CARGO_PKG_VERSION"));

/// Prefix for environment overrides (`OBS__KAFKA__TOPIC`)
pub const ENV_PREFIX: &str = "OBS";

/// Default config directory, relative to the working directory
pub const DEFAULT_CONFIG_DIR: &str = "config";

// ============================================
// FETCH CONSTANTS
// ============================================

/// Default timeout for product page requests (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default number of retries after the first attempt
pub const DEFAULT_FETCH_RETRIES: u32 = 3;

/// Base retry delay in milliseconds (1s → 2s → 4s ...)
pub const RETRY_BASE_MS: u64 = 1000;

/// Maximum retry delay in milliseconds
pub const RETRY_MAX_MS: u64 = 30_000;

/// Jitter percentage applied to each retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// KAFKA CONSTANTS
// ============================================

pub const DEFAULT_BOOTSTRAP_SERVER: &str = "localhost:9092";
pub const DEFAULT_TOPIC: &str = "observations";
pub const DEFAULT_CLIENT_ID: &str = "observation-scraper";
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 5000;

/// How long `flush` may block on shutdown (seconds)
pub const FLUSH_TIMEOUT_SECS: u64 = 10;

// ============================================
// SCHEDULE CONSTANTS
// ============================================

/// Daily run time (UTC). CLI reports for the previous day are out by early morning local time.
pub const DEFAULT_RUN_TIME: &str = "10:00";

pub const DEFAULT_STATION: &str = "KNYC";

/// How long a published station/date pair is remembered (seconds)
pub const PUBLISHED_TTL_SECS: u64 = 24 * 60 * 60;

/// Published-report state file, created under the system temp dir unless `state.path` is set
pub const DEFAULT_STATE_FILE: &str = "observation-scraper/published.json";

// ============================================
// FORMATS
// ============================================

/// Beat timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Date format of the climate summary line, e.g. "APRIL 17 2025"
pub const REPORT_DATE_FORMAT: &str = "%B %d %Y";
