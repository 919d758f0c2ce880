use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::context::PluginContext;

/// Absolute time range of one query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Span of the range
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }
}

/// One query inside a batch
///
/// `json` carries the backend-specific query model (expression, legend
/// template, interval hints); the host passes it through uninterpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// Caller-assigned reference; keys the result slot in the response
    pub ref_id: String,
    /// Declared handling strategy tag; plugins fall back to their default
    /// strategy when missing or unrecognized
    #[serde(default)]
    pub query_type: Option<String>,
    pub time_range: TimeRange,
    /// Upper bound on data points the caller can render
    #[serde(default)]
    pub max_data_points: i64,
    /// Interval the host derived from the panel width, in milliseconds
    #[serde(default)]
    pub interval_ms: i64,
    #[serde(default)]
    pub json: serde_json::Value,
}

/// A batch of queries against one datasource
#[derive(Debug, Clone)]
pub struct QueryDataRequest {
    pub plugin_context: PluginContext,
    pub queries: Vec<DataQuery>,
}

/// One point of a time series, as (epoch seconds, value)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: f64,
    pub value: f64,
}

/// A named series of points with its label set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesFrame {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub points: Vec<TimePoint>,
}

/// Result slot for one query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataResponse {
    pub frames: Vec<TimeSeriesFrame>,
    /// Per-query error text, for hosts that deliver partial results. Batch
    /// level failures are returned as errors instead of filling this slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to a query batch: one slot per ref id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

impl QueryDataResponse {
    pub fn new() -> Self {
        Self::default()
    }
}
