use crate::application::errors::StorageError;
use crate::domain::entities::{Pref, Prefs};

/// Preference store - abstraction over wherever prefs are persisted
///
/// Calls are synchronous: settings sync runs while the registry lock is held.
pub trait PrefStore: Send + Sync {
    /// Look up one pref by its full scope. Returns a pref carrying `default`
    /// as its value when nothing is stored.
    fn get(&self, user: &str, broker: &str, room: &str, plugin: &str, key: &str, default: &str) -> Pref;

    /// Persist a pref, replacing any value stored under the same scope and key.
    fn set(&self, pref: &Pref) -> Result<(), StorageError>;

    /// All stored prefs matching the filter. Empty filter fields match anything.
    fn find(&self, user: &str, broker: &str, room: &str, plugin: &str, key: &str) -> Prefs;
}
