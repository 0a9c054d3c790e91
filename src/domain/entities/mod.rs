//! Domain entities - Core business objects

pub mod event;
pub mod plugin;
pub mod pref;

pub use event::Event;
pub use plugin::{Handler, Instance, PluginDefinition};
pub use pref::{Pref, Prefs};
