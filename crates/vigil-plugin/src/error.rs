use thiserror::Error;

/// Errors surfaced at the host/plugin boundary
#[derive(Error, Debug)]
pub enum PluginError {
    /// A plugin id was registered twice
    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),

    /// No handler registered under the requested plugin id
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// Instance settings failed typed validation
    #[error("invalid instance settings: {0}")]
    InvalidSettings(String),

    /// The shared transport provider could not build a client
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A plugin's query handler failed; the boxed error keeps the plugin's
    /// own taxonomy intact for callers that downcast
    #[error("{0}")]
    QueryData(Box<dyn std::error::Error + Send + Sync>),
}
