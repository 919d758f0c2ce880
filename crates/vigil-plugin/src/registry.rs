//! Plugin registration and lookup

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::data::{QueryDataRequest, QueryDataResponse};
use crate::error::PluginError;

/// Request-handling entry point every datasource plugin exposes to the host
#[async_trait]
pub trait QueryDataHandler: Send + Sync {
    async fn query_data(
        &self,
        request: QueryDataRequest,
    ) -> Result<QueryDataResponse, PluginError>;
}

/// Host-side registry mapping plugin ids to their query handlers
pub struct PluginRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn QueryDataHandler>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a plugin's query handler under its fixed plugin id
    pub async fn register(
        &self,
        plugin_id: &str,
        handler: Arc<dyn QueryDataHandler>,
    ) -> Result<(), PluginError> {
        let mut handlers = self.handlers.write().await;

        if handlers.contains_key(plugin_id) {
            return Err(PluginError::AlreadyRegistered(plugin_id.to_string()));
        }

        handlers.insert(plugin_id.to_string(), handler);
        debug!("Registered plugin: {}", plugin_id);
        Ok(())
    }

    /// Look up the handler registered for a plugin id
    pub async fn handler(&self, plugin_id: &str) -> Result<Arc<dyn QueryDataHandler>, PluginError> {
        let handlers = self.handlers.read().await;
        handlers
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| PluginError::PluginNotFound(plugin_id.to_string()))
    }

    /// Ids of all registered plugins
    pub async fn plugin_ids(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        handlers.keys().cloned().collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
