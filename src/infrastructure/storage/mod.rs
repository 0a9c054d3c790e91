//! In-memory preference storage

use std::sync::{PoisonError, RwLock};

use crate::application::errors::StorageError;
use crate::domain::entities::{Pref, Prefs};
use crate::domain::traits::PrefStore;

/// Process-local pref store. Values are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryPrefStore {
    prefs: RwLock<Prefs>,
}

fn same_scope(a: &Pref, b: &Pref) -> bool {
    a.user == b.user && a.broker == b.broker && a.room == b.room && a.plugin == b.plugin && a.key == b.key
}

fn field_matches(filter: &str, value: &str) -> bool {
    filter.is_empty() || filter == value
}

impl MemoryPrefStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.prefs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PrefStore for MemoryPrefStore {
    fn get(&self, user: &str, broker: &str, room: &str, plugin: &str, key: &str, default: &str) -> Pref {
        let wanted = Pref {
            user: user.to_string(),
            broker: broker.to_string(),
            room: room.to_string(),
            plugin: plugin.to_string(),
            key: key.to_string(),
            value: default.to_string(),
            default: default.to_string(),
        };

        let prefs = self.prefs.read().unwrap_or_else(PoisonError::into_inner);
        match prefs.iter().find(|p| same_scope(p, &wanted)) {
            Some(found) => Pref {
                value: found.value.clone(),
                ..wanted
            },
            None => wanted,
        }
    }

    fn set(&self, pref: &Pref) -> Result<(), StorageError> {
        if pref.key.is_empty() {
            return Err(StorageError::Serialization("pref has no key".to_string()));
        }

        let mut prefs = self.prefs.write().unwrap_or_else(PoisonError::into_inner);
        match prefs.iter_mut().find(|p| same_scope(p, pref)) {
            Some(existing) => existing.value = pref.value.clone(),
            None => prefs.push(pref.clone()),
        }

        Ok(())
    }

    fn find(&self, user: &str, broker: &str, room: &str, plugin: &str, key: &str) -> Prefs {
        self.prefs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| {
                field_matches(user, &p.user)
                    && field_matches(broker, &p.broker)
                    && field_matches(room, &p.room)
                    && field_matches(plugin, &p.plugin)
                    && field_matches(key, &p.key)
            })
            .cloned()
            .collect()
    }
}
