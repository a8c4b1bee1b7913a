//! Error taxonomy and classification of remote API errors.
//!
//! Every failure is one of three kinds:
//! - skippable: one entity or metric is dropped, the run continues
//! - retryable: the failed operation is re-run from scratch
//! - fatal: the stream ends with the error
//!
//! Call sites only ever ask [`InsightsError::is_skippable`] and
//! [`InsightsError::is_retryable`]; API error codes stay in this module.

use serde::Deserialize;
use serde_json::Value;

/// Missing object, missing permission or unsupported operation.
pub const MISSING_ERROR_CODE: i64 = 100;
/// Operation not supported for this node.
pub const NOT_SUPPORTED_CODE: i64 = 3001;

/// The `error` object of a failed Graph API response.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}) {}", self.code, self.message)?;
        if let Some(kind) = &self.kind {
            write!(f, " [{}]", kind)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    /// The entity or metric has no usable data; drop it and carry on.
    #[error("skipped: {0}")]
    Skipped(String),

    /// A transient failure; the operation should be re-run.
    #[error("retryable: {0}")]
    Retryable(String),

    #[error("api error {0}")]
    Api(ApiError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unexpected payload: {0}")]
    Payload(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("item source error: {0}")]
    ItemSource(String),

    #[error("gave up after {attempts} retries: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<InsightsError>,
    },
}

impl InsightsError {
    pub fn is_skippable(&self) -> bool {
        matches!(self, InsightsError::Skipped(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, InsightsError::Retryable(_))
    }
}

impl From<config::ConfigError> for InsightsError {
    fn from(err: config::ConfigError) -> Self {
        InsightsError::Config(err.to_string())
    }
}

/// Decides what an API error means for the run.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    pub ignore_missing: bool,
    pub retry_codes: Vec<i64>,
}

impl ErrorClassifier {
    pub fn new(ignore_missing: bool, retry_codes: Vec<i64>) -> Self {
        Self {
            ignore_missing,
            retry_codes,
        }
    }

    /// Passes a body without an `error` field through unchanged.
    pub fn classify(&self, body: Value) -> Result<Value, InsightsError> {
        if body.get("error").map_or(true, Value::is_null) {
            return Ok(body);
        }
        let raw = body["error"].clone();

        let error: ApiError = serde_json::from_value(raw.clone()).unwrap_or_else(|_| ApiError {
            message: raw.to_string(),
            ..ApiError::default()
        });

        Err(self.classify_api_error(error))
    }

    pub fn classify_api_error(&self, error: ApiError) -> InsightsError {
        let missing = error.code == MISSING_ERROR_CODE;
        if (missing && self.ignore_missing) || error.code == NOT_SUPPORTED_CODE {
            InsightsError::Skipped(error.to_string())
        } else if self.retry_codes.contains(&error.code) {
            InsightsError::Retryable(error.to_string())
        } else {
            InsightsError::Api(error)
        }
    }

    /// Parses a raw response body and classifies it.
    pub fn parse(&self, body: &str) -> Result<Value, InsightsError> {
        let value: Value = serde_json::from_str(body)?;
        self.classify(value)
    }
}
