//! Error taxonomy for the Prometheus datasource

use thiserror::Error;
use vigil_plugin::PluginError;

/// Errors produced while resolving instances and executing queries
///
/// `Api` is the one variant representing the backend itself rejecting a
/// query; everything else is validation, construction, or transport. Callers
/// that want to treat query rejections differently test with
/// [`PrometheusError::is_api_error`].
#[derive(Error, Debug)]
pub enum PrometheusError {
    /// The incoming batch had no queries
    #[error("query contains no queries")]
    EmptyRequest,

    /// `timeInterval` in the instance settings was present but not a string
    #[error("invalid time-interval provided")]
    InvalidTimeInterval,

    #[error("error reading settings: {0}")]
    ReadSettings(String),

    #[error("error getting http options: {0}")]
    HttpOptions(#[source] PluginError),

    #[error("invalid datasource url: {0}")]
    InvalidUrl(String),

    /// A query's backend-specific model could not be decoded
    #[error("invalid query model for {ref_id}: {reason}")]
    InvalidQueryModel { ref_id: String, reason: String },

    /// Interval strings like `"15s"` that fail to parse
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// The backend's query API rejected the query
    #[error("{message}: {detail}")]
    Api { message: String, detail: String },

    /// The backend answered with something other than the query API envelope
    #[error("unexpected response from backend: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl PrometheusError {
    /// True when the backend's query API reported a structured error, as
    /// opposed to a transport, validation, or construction failure.
    ///
    /// The combined `"<message>: <detail>"` text of such errors is their
    /// `Display` form; every other variant renders unchanged.
    pub fn is_api_error(&self) -> bool {
        matches!(self, PrometheusError::Api { .. })
    }
}
