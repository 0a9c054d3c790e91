//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Event has no broker attached")]
    MissingBroker,

    #[error("Event was not routed to a plugin instance")]
    MissingInstance,

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Plugin registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A caller broke a documented precondition, e.g. a second instance of
    /// a single-instance plugin. Fatal under `InvariantPolicy::Abort`.
    #[error("BUG: {0}")]
    Invariant(String),

    #[error("plugin '{0}' only allows one instance and is already attached")]
    SingleInstance(String),

    #[error("'{0}' is already instantiated")]
    AlreadyInstantiated(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RegistryError {
    pub fn is_invariant(&self) -> bool {
        matches!(self, RegistryError::Invariant(_))
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
