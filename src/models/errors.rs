//! Centralized Error Handling Module
//!
//! Every failure carries a unique, stable error code so scheduler logs can be
//! grepped and alerted on without parsing free-form messages.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - FETCH_xxx: report download errors
//! - PARSE_xxx: report parsing errors
//! - VALIDATION_xxx: parsed values outside physical ranges
//! - PUBLISH_xxx: Kafka errors
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Fetch Errors (1xx)
    // ============================================
    /// Could not connect to the product server
    FetchConnectionFailed,
    /// Request timed out
    FetchTimeout,
    /// Server answered with a non-success status
    FetchHttpStatus,
    /// Server answered 5xx
    FetchServerError,
    /// Server answered 429
    FetchRateLimited,
    /// Body was empty or whitespace only
    FetchEmptyResponse,

    // ============================================
    // Parse Errors (2xx)
    // ============================================
    /// No `<pre class="glossaryProduct">` element
    ParseMissingContent,
    /// Report is a "today" report, not yesterday's summary
    ParseWrongReportType,
    /// Climate summary date line not found
    ParseMissingDate,
    /// Required temperature block not found or malformed
    ParseMissingTemperature,

    // ============================================
    // Validation Errors (3xx)
    // ============================================
    /// A parsed value is outside its physical range
    ValidationOutOfRange,

    // ============================================
    // Publish Errors (4xx)
    // ============================================
    /// Kafka producer could not be created
    PublishProducerInit,
    /// Message delivery failed
    PublishFailed,
    /// Beat could not be serialized
    PublishSerialize,

    // ============================================
    // Configuration Errors (5xx)
    // ============================================
    /// Config files missing or malformed
    ConfigLoadFailed,
    /// Station id not present in `locations`
    ConfigUnknownStation,
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// IO error
    Io,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            // Fetch Errors
            Self::FetchConnectionFailed => "FETCH_CONNECTION_FAILED",
            Self::FetchTimeout => "FETCH_TIMEOUT",
            Self::FetchHttpStatus => "FETCH_HTTP_STATUS",
            Self::FetchServerError => "FETCH_SERVER_ERROR",
            Self::FetchRateLimited => "FETCH_RATE_LIMITED",
            Self::FetchEmptyResponse => "FETCH_EMPTY_RESPONSE",

            // Parse Errors
            Self::ParseMissingContent => "PARSE_MISSING_CONTENT",
            Self::ParseWrongReportType => "PARSE_WRONG_REPORT_TYPE",
            Self::ParseMissingDate => "PARSE_MISSING_DATE",
            Self::ParseMissingTemperature => "PARSE_MISSING_TEMPERATURE",

            // Validation Errors
            Self::ValidationOutOfRange => "VALIDATION_OUT_OF_RANGE",

            // Publish Errors
            Self::PublishProducerInit => "PUBLISH_PRODUCER_INIT",
            Self::PublishFailed => "PUBLISH_FAILED",
            Self::PublishSerialize => "PUBLISH_SERIALIZE",

            // Configuration Errors
            Self::ConfigLoadFailed => "CFG_LOAD_FAILED",
            Self::ConfigUnknownStation => "CFG_UNKNOWN_STATION",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            // Generic
            Self::Io => "IO_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchConnectionFailed
                | Self::FetchTimeout
                | Self::FetchServerError
                | Self::FetchRateLimited
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Transport-level fetch failure
    pub fn fetch_failed(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::FetchTimeout
        } else {
            ErrorCode::FetchConnectionFailed
        };
        let message = format!("Error fetching CLI report: {}", err);
        Self::with_source(code, message, err)
    }

    /// Non-success HTTP status
    pub fn http_status(status: reqwest::StatusCode) -> Self {
        let code = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ErrorCode::FetchRateLimited
        } else if status.is_server_error() {
            ErrorCode::FetchServerError
        } else {
            ErrorCode::FetchHttpStatus
        };
        Self::new(code, format!("Error fetching CLI report: HTTP {}", status))
    }

    pub fn empty_response(url: &str) -> Self {
        Self::new(
            ErrorCode::FetchEmptyResponse,
            format!("Empty response received from {}", url),
        )
    }

    pub fn missing_content() -> Self {
        Self::new(
            ErrorCode::ParseMissingContent,
            "Could not find CLI report content in the HTML",
        )
    }

    pub fn wrong_report_type() -> Self {
        Self::new(
            ErrorCode::ParseWrongReportType,
            "The CLI report does not contain yesterday's weather data.",
        )
    }

    pub fn missing_date() -> Self {
        Self::new(
            ErrorCode::ParseMissingDate,
            "Could not extract date from the CLI report",
        )
    }

    pub fn missing_temperature() -> Self {
        Self::new(
            ErrorCode::ParseMissingTemperature,
            "Could not extract required temperature data from the report",
        )
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationOutOfRange, msg)
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PublishFailed, msg)
    }

    pub fn unknown_station(station_id: &str) -> Self {
        Self::new(
            ErrorCode::ConfigUnknownStation,
            format!("Unknown station: {}", station_id),
        )
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Io, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::fetch_failed(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::PublishSerialize, "JSON serialize error", err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        let message = format!("Failed to load configuration: {}", err);
        Self::with_source(ErrorCode::ConfigLoadFailed, message, err)
    }
}

impl From<rdkafka::error::KafkaError> for AppError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        let message = format!("Kafka error: {}", err);
        Self::with_source(ErrorCode::PublishFailed, message, err)
    }
}
