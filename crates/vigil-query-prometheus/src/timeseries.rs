//! Time-series query execution against a resolved instance

use serde::Deserialize;
use tracing::{debug, warn};
use vigil_plugin::{
    DataQuery, DataResponse, QueryDataRequest, QueryDataResponse, TimePoint, TimeSeriesFrame,
};

use crate::client::Series;
use crate::error::PrometheusError;
use crate::settings::PrometheusInstance;
use crate::PrometheusService;

/// Backend-specific query model carried in [`DataQuery::json`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryModel {
    expr: String,
    #[serde(default)]
    legend_format: Option<String>,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    interval_factor: Option<i64>,
    #[serde(default)]
    instant: Option<bool>,
}

impl PrometheusService {
    /// Run every query of the batch against the instance's client and
    /// collect one response slot per ref id. A failing query records its
    /// classified error text in its own slot and does not abort the rest of
    /// the batch.
    pub(crate) async fn execute_time_series_query(
        &self,
        request: &QueryDataRequest,
        instance: &PrometheusInstance,
    ) -> Result<QueryDataResponse, PrometheusError> {
        let mut response = QueryDataResponse::new();

        for query in &request.queries {
            let slot = match self.run_single(query, instance).await {
                Ok(frames) => DataResponse {
                    frames,
                    error: None,
                },
                Err(e) => {
                    warn!("Query {} failed: {}", query.ref_id, e);
                    DataResponse {
                        frames: vec![],
                        error: Some(e.to_string()),
                    }
                }
            };
            response.responses.insert(query.ref_id.clone(), slot);
        }

        Ok(response)
    }

    async fn run_single(
        &self,
        query: &DataQuery,
        instance: &PrometheusInstance,
    ) -> Result<Vec<TimeSeriesFrame>, PrometheusError> {
        let model: QueryModel =
            serde_json::from_value(query.json.clone()).map_err(|e| {
                PrometheusError::InvalidQueryModel {
                    ref_id: query.ref_id.clone(),
                    reason: e.to_string(),
                }
            })?;

        let series = self.run_query(query, &model, instance).await?;
        Ok(self.shape_frames(&model, series))
    }

    async fn run_query(
        &self,
        query: &DataQuery,
        model: &QueryModel,
        instance: &PrometheusInstance,
    ) -> Result<Vec<Series>, PrometheusError> {
        if model.instant.unwrap_or(false) {
            debug!("Executing instant query {}", query.ref_id);
            return instance.client.query(&model.expr, query.time_range.to).await;
        }

        let min_interval = self.intervals.min_interval(
            model.interval.as_deref(),
            query.interval_ms,
            &instance.settings.time_interval,
        )?;
        let step = self.intervals.step(
            query.time_range.duration(),
            min_interval,
            model.interval_factor.unwrap_or(1),
        );

        debug!(
            "Executing range query {} with step {}s",
            query.ref_id,
            step.num_seconds()
        );

        instance
            .client
            .query_range(&model.expr, query.time_range.from, query.time_range.to, step)
            .await
    }

    fn shape_frames(&self, model: &QueryModel, series: Vec<Series>) -> Vec<TimeSeriesFrame> {
        let template = model.legend_format.as_deref().unwrap_or("");

        series
            .into_iter()
            .map(|series| TimeSeriesFrame {
                name: self.legend.format(template, &series.labels),
                points: series
                    .points
                    .into_iter()
                    .map(|(timestamp, value)| TimePoint { timestamp, value })
                    .collect(),
                labels: series.labels,
            })
            .collect()
    }
}
