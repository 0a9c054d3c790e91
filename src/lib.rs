//! Plugin registry and message router for a chat bot.
//!
//! Plugins register a [`PluginDefinition`] once; instances bind a definition
//! to a channel and a pattern. The [`Router`] picks every registered instance
//! whose channel and pattern match an incoming [`Event`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, ConfigError, RegistryError, StorageError};
pub use application::messaging::Router;
pub use application::registry::{InvariantPolicy, Registry};
pub use application::services::BotService;
pub use domain::entities::{Event, Instance, PluginDefinition, Pref, Prefs};
pub use domain::traits::{Broker, CompiledPattern, Matcher, PrefStore};
