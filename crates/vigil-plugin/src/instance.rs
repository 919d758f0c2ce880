//! Cached per-datasource plugin instances
//!
//! A datasource plugin keeps one constructed instance (parsed settings plus
//! backend client) per datasource so repeated queries do not re-parse
//! configuration or rebuild client state. The manager hands out clones of
//! the cached instance and replaces it wholesale when the host saves new
//! settings; an entry is never mutated in place.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::context::{DataSourceInstanceSettings, PluginContext};

/// Builds plugin instances from datasource settings
#[async_trait]
pub trait InstanceFactory: Send + Sync + 'static {
    /// The constructed instance type. Handed out by value, so it must be
    /// cheap to clone (wrap shared state in `Arc`).
    type Instance: Clone + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_instance(
        &self,
        settings: &DataSourceInstanceSettings,
    ) -> Result<Self::Instance, Self::Error>;
}

struct CachedInstance<T> {
    updated: DateTime<Utc>,
    instance: T,
}

/// Typed cache of constructed plugin instances, keyed by datasource id
pub struct InstanceManager<F: InstanceFactory> {
    factory: F,
    instances: RwLock<HashMap<i64, CachedInstance<F::Instance>>>,
}

impl<F: InstanceFactory> InstanceManager<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Get the instance for the context's datasource, constructing it on
    /// first use or after the host saved new settings.
    ///
    /// Construction runs under the write lock, so concurrent callers for the
    /// same datasource and settings generation share a single build. Failed
    /// builds are not cached; the next call retries.
    pub async fn get(&self, ctx: &PluginContext) -> Result<F::Instance, F::Error> {
        let settings = &ctx.datasource;

        {
            let instances = self.instances.read().await;
            if let Some(cached) = instances.get(&settings.id) {
                if cached.updated == settings.updated {
                    return Ok(cached.instance.clone());
                }
            }
        }

        let mut instances = self.instances.write().await;
        // Another caller may have built this generation while we waited.
        match instances.get(&settings.id) {
            Some(cached) if cached.updated == settings.updated => {
                return Ok(cached.instance.clone());
            }
            Some(_) => {
                debug!(
                    "Settings changed for datasource {}, rebuilding instance",
                    settings.id
                );
            }
            None => {
                debug!("Creating instance for datasource {}", settings.id);
            }
        }

        let instance = self.factory.create_instance(settings).await?;
        instances.insert(
            settings.id,
            CachedInstance {
                updated: settings.updated,
                instance: instance.clone(),
            },
        );

        Ok(instance)
    }
}
