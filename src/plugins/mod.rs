//! Built-in plugins
//!
//! - `echo`: repeats its arguments back
//! - `pluginmgr`: manages plugin instances from chat

pub mod echo;
pub mod manager;

use std::sync::Arc;
use crate::application::errors::BotError;
use crate::application::registry::Registry;
use crate::domain::entities::Instance;
use crate::domain::traits::PrefStore;
use crate::infrastructure::config::InstanceConfig;

pub use manager::{attach_instance, PluginManager};

/// Register the built-in plugin definitions
pub fn register_builtins(registry: &Arc<Registry>, store: Arc<dyn PrefStore>, prefix: &str) {
    registry.register_definition(echo::definition(prefix));
    registry.register_definition(PluginManager::new(registry, store, prefix).into_definition());
}

/// Attach the instances listed in the config. Stops at the first failure,
/// keeping the instances attached before it.
pub fn attach_configured(
    registry: &Registry,
    store: &dyn PrefStore,
    instances: &[InstanceConfig],
) -> Result<Vec<Arc<Instance>>, BotError> {
    let mut attached = Vec::with_capacity(instances.len());

    for cfg in instances {
        let def = registry
            .definition(&cfg.plugin)
            .ok_or_else(|| BotError::Plugin(format!("no such plugin '{}'", cfg.plugin)))?;
        attached.push(attach_instance(registry, store, &def, &cfg.channel, cfg.pattern.as_deref())?);
    }

    Ok(attached)
}
