//! Prometheus HTTP API client
//!
//! A thin client for the query endpoints of a Prometheus-compatible backend,
//! constructed once per datasource instance from resolved transport options.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use vigil_plugin::{HttpClientOptions, HttpClientProvider};

use crate::error::PrometheusError;

/// Response envelope of the Prometheus query API
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstantData {
    result: Vec<InstantSample>,
}

#[derive(Debug, Deserialize)]
struct InstantSample {
    metric: BTreeMap<String, String>,
    value: (f64, String),
}

#[derive(Debug, Deserialize)]
struct RangeData {
    result: Vec<RangeSeries>,
}

#[derive(Debug, Deserialize)]
struct RangeSeries {
    metric: BTreeMap<String, String>,
    values: Vec<(f64, String)>,
}

/// One series returned by the query API
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub labels: BTreeMap<String, String>,
    /// (epoch seconds, sample value)
    pub points: Vec<(f64, f64)>,
}

/// Client bound to one Prometheus-compatible endpoint
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    /// Build a client from resolved transport options. The shared provider
    /// owns the actual HTTP client construction.
    pub fn create(
        url: &str,
        options: &HttpClientOptions,
        provider: &HttpClientProvider,
    ) -> Result<Self, PrometheusError> {
        reqwest::Url::parse(url)
            .map_err(|e| PrometheusError::InvalidUrl(format!("{}: {}", url, e)))?;

        let http = provider.create(options)?;

        let mut base_url = url.to_string();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { http, base_url })
    }

    /// Evaluate an expression at a single point in time
    pub async fn query(
        &self,
        expr: &str,
        time: DateTime<Utc>,
    ) -> Result<Vec<Series>, PrometheusError> {
        let url = format!("{}/api/v1/query", self.base_url);
        let time_param = time.timestamp().to_string();
        let params = [("query", expr), ("time", time_param.as_str())];

        debug!("Instant query against {}: {}", self.base_url, expr);

        let response = self.http.get(&url).query(&params).send().await?;
        let data: InstantData = Self::decode(response).await?;

        Ok(data
            .result
            .into_iter()
            .map(|sample| Series {
                points: parse_points(std::iter::once(sample.value)),
                labels: sample.metric,
            })
            .collect())
    }

    /// Evaluate an expression over a time range at the given step
    pub async fn query_range(
        &self,
        expr: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<Series>, PrometheusError> {
        let url = format!("{}/api/v1/query_range", self.base_url);
        let start_param = start.timestamp().to_string();
        let end_param = end.timestamp().to_string();
        let step_param = format!("{}s", step.num_seconds().max(1));
        let params = [
            ("query", expr),
            ("start", start_param.as_str()),
            ("end", end_param.as_str()),
            ("step", step_param.as_str()),
        ];

        debug!(
            "Range query against {}: {} (step {})",
            self.base_url, expr, step_param
        );

        let response = self.http.get(&url).query(&params).send().await?;
        let data: RangeData = Self::decode(response).await?;

        Ok(data
            .result
            .into_iter()
            .map(|series| Series {
                points: parse_points(series.values.into_iter()),
                labels: series.metric,
            })
            .collect())
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PrometheusError> {
        let status = response.status();
        let body = response.bytes().await?;
        decode_envelope(status, &body)
    }
}

/// Unwrap the query API envelope, surfacing backend rejections as structured
/// errors. The backend reports rejections with a non-success envelope, often
/// alongside a 4xx status; the envelope is authoritative.
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, PrometheusError> {
    let envelope: ApiResponse<T> = serde_json::from_slice(body)
        .map_err(|_| PrometheusError::InvalidResponse(format!("status {}", status)))?;

    if envelope.status != "success" {
        return Err(PrometheusError::Api {
            message: envelope.error_type.unwrap_or_else(|| "error".to_string()),
            detail: envelope.error.unwrap_or_default(),
        });
    }

    envelope
        .data
        .ok_or_else(|| PrometheusError::InvalidResponse("missing data field".to_string()))
}

fn parse_points(raw: impl Iterator<Item = (f64, String)>) -> Vec<(f64, f64)> {
    raw.filter_map(|(timestamp, value)| match value.parse::<f64>() {
        Ok(value) => Some((timestamp, value)),
        Err(e) => {
            debug!("Skipping unparsable sample value '{}': {}", value, e);
            None
        }
    })
    .collect()
}
