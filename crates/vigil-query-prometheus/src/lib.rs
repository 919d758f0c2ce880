//! # vigil-query-prometheus
//!
//! Prometheus datasource plugin for Vigil.
//!
//! Bridges the host's generic query batches to the HTTP query API of a
//! Prometheus-compatible backend:
//!
//! - resolves opaque instance settings into a typed descriptor, forcing the
//!   signed-request service namespace for this backend family
//! - keeps one constructed client per datasource in the host's instance
//!   cache, rebuilt when settings change
//! - dispatches batches through a single time-series strategy (step
//!   selection, range/instant execution, legend-formatted frames)
//! - separates backend query rejections from transport failures in
//!   [`PrometheusError`]

pub mod client;
pub mod error;
pub mod interval;
pub mod legend;
pub mod settings;
mod timeseries;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};
use vigil_plugin::{
    HttpClientProvider, InstanceManager, PluginContext, PluginError, PluginRegistry,
    QueryDataHandler, QueryDataRequest, QueryDataResponse,
};

pub use crate::error::PrometheusError;
pub use crate::settings::{PrometheusInstance, PrometheusSettings, SIGV4_SERVICE_NAMESPACE};

use crate::interval::IntervalCalculator;
use crate::legend::LegendFormatter;
use crate::settings::PrometheusInstanceFactory;

/// Plugin id this datasource registers under
pub const PLUGIN_ID: &str = "prometheus";

/// Query type tag of the default time-series strategy
pub const TIME_SERIES_QUERY_TYPE: &str = "timeSeriesQuery";

/// Handling strategies selectable by a batch's query type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryStrategy {
    TimeSeries,
}

impl QueryStrategy {
    /// Unknown and missing tags fall back to the time-series path
    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(TIME_SERIES_QUERY_TYPE) => QueryStrategy::TimeSeries,
            _ => QueryStrategy::TimeSeries,
        }
    }
}

/// Prometheus datasource service: the plugin's request-handling entry point
///
/// Owns the instance cache and the query collaborators; shared behind an
/// `Arc` by the registry and invoked concurrently by the host.
pub struct PrometheusService {
    instances: InstanceManager<PrometheusInstanceFactory>,
    pub(crate) intervals: IntervalCalculator,
    pub(crate) legend: LegendFormatter,
}

impl PrometheusService {
    pub fn new(http_provider: Arc<HttpClientProvider>) -> Self {
        Self {
            instances: InstanceManager::new(PrometheusInstanceFactory::new(http_provider)),
            intervals: IntervalCalculator::new(),
            legend: LegendFormatter::new(),
        }
    }

    /// Construct the service and register it with the host's plugin registry
    pub async fn provide(
        registry: &PluginRegistry,
        http_provider: Arc<HttpClientProvider>,
    ) -> Result<Arc<Self>, PluginError> {
        debug!("Initializing Prometheus datasource plugin");

        let service = Arc::new(Self::new(http_provider));
        if let Err(e) = registry.register(PLUGIN_ID, service.clone()).await {
            error!("Failed to register plugin {}: {}", PLUGIN_ID, e);
            return Err(e);
        }

        Ok(service)
    }

    /// Execute a query batch against the datasource named by its context
    ///
    /// The batch's strategy is taken from its first query; all queries in
    /// one batch are assumed to share a query type.
    pub async fn query_data(
        &self,
        request: &QueryDataRequest,
    ) -> Result<QueryDataResponse, PrometheusError> {
        if request.queries.is_empty() {
            return Err(PrometheusError::EmptyRequest);
        }

        let instance = self.instance_for(&request.plugin_context).await?;

        match QueryStrategy::from_tag(request.queries[0].query_type.as_deref()) {
            QueryStrategy::TimeSeries => self.execute_time_series_query(request, &instance).await,
        }
    }

    async fn instance_for(
        &self,
        ctx: &PluginContext,
    ) -> Result<PrometheusInstance, PrometheusError> {
        self.instances.get(ctx).await
    }
}

#[async_trait]
impl QueryDataHandler for PrometheusService {
    async fn query_data(
        &self,
        request: QueryDataRequest,
    ) -> Result<QueryDataResponse, PluginError> {
        PrometheusService::query_data(self, &request)
            .await
            .map_err(|e| PluginError::QueryData(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use vigil_plugin::{DataQuery, DataSourceInstanceSettings, TimeRange};

    fn context(json_data: serde_json::Value) -> PluginContext {
        PluginContext {
            org_id: 1,
            datasource: DataSourceInstanceSettings {
                id: 1,
                uid: "prom".to_string(),
                name: "Prometheus".to_string(),
                url: "http://localhost:9090".to_string(),
                basic_auth_enabled: false,
                basic_auth_user: String::new(),
                json_data,
                decrypted_secure_json_data: HashMap::new(),
                updated: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            },
        }
    }

    #[test]
    fn test_unknown_tags_fall_back_to_time_series() {
        assert_eq!(
            QueryStrategy::from_tag(Some(TIME_SERIES_QUERY_TYPE)),
            QueryStrategy::TimeSeries
        );
        assert_eq!(QueryStrategy::from_tag(None), QueryStrategy::TimeSeries);
        assert_eq!(
            QueryStrategy::from_tag(Some("somethingElse")),
            QueryStrategy::TimeSeries
        );
    }

    #[tokio::test]
    async fn test_empty_batch_fails_before_instance_resolution() {
        let service = PrometheusService::new(Arc::new(HttpClientProvider::new()));

        // Settings are deliberately malformed: if dispatch touched instance
        // resolution first, this would fail with a settings error instead.
        let request = QueryDataRequest {
            plugin_context: context(serde_json::json!("not an object")),
            queries: vec![],
        };

        let err = service.query_data(&request).await.unwrap_err();
        assert!(matches!(err, PrometheusError::EmptyRequest));
        assert_eq!(err.to_string(), "query contains no queries");
    }

    #[tokio::test]
    async fn test_resolution_failure_is_propagated() {
        let service = PrometheusService::new(Arc::new(HttpClientProvider::new()));

        let request = QueryDataRequest {
            plugin_context: context(serde_json::json!({"timeInterval": 42})),
            queries: vec![DataQuery {
                ref_id: "A".to_string(),
                query_type: None,
                time_range: TimeRange::new(
                    Utc.timestamp_opt(1_704_067_200, 0).unwrap(),
                    Utc.timestamp_opt(1_704_070_800, 0).unwrap(),
                ),
                max_data_points: 600,
                interval_ms: 0,
                json: serde_json::json!({"expr": "up"}),
            }],
        };

        let err = service.query_data(&request).await.unwrap_err();
        assert!(matches!(err, PrometheusError::InvalidTimeInterval));
        assert!(!err.is_api_error());
    }

    #[tokio::test]
    async fn test_provide_registers_under_plugin_id() {
        let registry = PluginRegistry::new();
        let provider = Arc::new(HttpClientProvider::new());

        PrometheusService::provide(&registry, provider.clone())
            .await
            .unwrap();
        assert!(registry.handler(PLUGIN_ID).await.is_ok());

        // Registering the same plugin id twice is a host wiring bug.
        let err = PrometheusService::provide(&registry, provider)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::AlreadyRegistered(_)));
    }
}
