//! # vigil-plugin
//!
//! Host-side boundary for Vigil datasource plugins.
//!
//! A datasource plugin receives batches of queries from the host, resolves
//! the datasource's connection settings into a backend client, and answers
//! with time-series frames. This crate provides everything a plugin shares
//! with the host:
//!
//! - **Data model**: [`QueryDataRequest`], [`DataQuery`], [`QueryDataResponse`]
//!   and the time-series frame types
//! - **Context**: [`PluginContext`] and [`DataSourceInstanceSettings`], the
//!   opaque per-datasource configuration handed to plugins on every call
//! - **Transport**: [`HttpClientOptions`] and the shared
//!   [`HttpClientProvider`] that builds HTTP clients for backend access
//! - **Instance management**: [`InstanceManager`], a typed cache of
//!   constructed per-datasource instances keyed by datasource id
//! - **Registration**: [`QueryDataHandler`] and [`PluginRegistry`], the
//!   entry-point contract between host and plugins
//!
//! Plugin crates (e.g. `vigil-query-prometheus`) implement
//! [`InstanceFactory`] and [`QueryDataHandler`] on top of these types.

pub mod context;
pub mod data;
pub mod error;
pub mod http;
pub mod instance;
pub mod registry;

// Re-export commonly used items
pub use context::{DataSourceInstanceSettings, PluginContext};
pub use data::{
    DataQuery, DataResponse, QueryDataRequest, QueryDataResponse, TimePoint, TimeRange,
    TimeSeriesFrame,
};
pub use error::PluginError;
pub use http::{BasicAuth, HttpClientOptions, HttpClientProvider, SigV4Options};
pub use instance::{InstanceFactory, InstanceManager};
pub use registry::{PluginRegistry, QueryDataHandler};
