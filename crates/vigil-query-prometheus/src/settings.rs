//! Instance settings resolution
//!
//! Turns the host's opaque per-datasource configuration into a typed
//! connection descriptor and a constructed query client. Settings arrive as
//! an uninterpreted JSON object; every recognized key is validated here and
//! nothing untyped flows past this module.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vigil_plugin::{
    DataSourceInstanceSettings, HttpClientOptions, HttpClientProvider, InstanceFactory,
};

use crate::client::PrometheusClient;
use crate::error::PrometheusError;

/// Service namespace signed requests are scoped to for this backend family.
/// Overrides whatever the host supplied; not user-configurable.
pub const SIGV4_SERVICE_NAMESPACE: &str = "aps";

/// Resolved connection descriptor for one Prometheus datasource
#[derive(Debug, Clone, PartialEq)]
pub struct PrometheusSettings {
    pub id: i64,
    pub url: String,
    /// Lower bound for the query step, as configured on the datasource.
    /// Always a defined string; empty when the datasource does not set one.
    pub time_interval: String,
}

impl PrometheusSettings {
    /// Parse the opaque instance settings into a typed descriptor
    pub fn resolve(settings: &DataSourceInstanceSettings) -> Result<Self, PrometheusError> {
        let json_data = settings.json_data.as_object().ok_or_else(|| {
            PrometheusError::ReadSettings("instance settings are not a JSON object".to_string())
        })?;

        // timeInterval can be a string or can be missing. If it is missing,
        // we set it to empty-string.
        let time_interval = match json_data.get("timeInterval") {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(interval)) => interval.clone(),
            Some(_) => return Err(PrometheusError::InvalidTimeInterval),
        };

        Ok(Self {
            id: settings.id,
            url: settings.url.clone(),
            time_interval,
        })
    }
}

/// Apply backend-family auth normalization to resolved transport options
pub fn normalize_http_options(options: &mut HttpClientOptions) {
    if let Some(sig_v4) = options.sig_v4.as_mut() {
        sig_v4.service = SIGV4_SERVICE_NAMESPACE.to_string();
    }
}

/// Resolved instance: descriptor plus constructed client
///
/// Cloned freely by concurrent queries; the instance cache keeps one per
/// datasource and replaces it wholesale on settings changes.
#[derive(Debug, Clone)]
pub struct PrometheusInstance {
    pub settings: PrometheusSettings,
    pub client: PrometheusClient,
}

/// Builds [`PrometheusInstance`]s for the instance cache
pub struct PrometheusInstanceFactory {
    http_provider: Arc<HttpClientProvider>,
}

impl PrometheusInstanceFactory {
    pub fn new(http_provider: Arc<HttpClientProvider>) -> Self {
        Self { http_provider }
    }
}

#[async_trait]
impl InstanceFactory for PrometheusInstanceFactory {
    type Instance = PrometheusInstance;
    type Error = PrometheusError;

    async fn create_instance(
        &self,
        settings: &DataSourceInstanceSettings,
    ) -> Result<PrometheusInstance, PrometheusError> {
        let descriptor = PrometheusSettings::resolve(settings)?;

        let mut http_options = settings
            .http_client_options()
            .map_err(PrometheusError::HttpOptions)?;
        normalize_http_options(&mut http_options);

        let client = PrometheusClient::create(&settings.url, &http_options, &self.http_provider)?;

        debug!(
            "Resolved Prometheus instance for datasource {} ({})",
            settings.id, settings.url
        );

        Ok(PrometheusInstance {
            settings: descriptor,
            client,
        })
    }
}
