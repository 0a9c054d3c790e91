use serde::{Deserialize, Serialize};
use std::fmt;

/// A preference value scoped by user, room, broker and plugin.
///
/// Empty scope fields mean "any". The same struct doubles as a setting
/// descriptor on plugin definitions, where `room` restricts the setting to
/// one channel and `default` is used when nothing is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Pref {
    pub user: String,
    pub room: String,
    pub broker: String,
    pub plugin: String,
    pub key: String,
    pub value: String,
    pub default: String,
}

impl Pref {
    /// A setting descriptor with a key and a default value.
    pub fn setting(key: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default: default.into(),
            ..Self::default()
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Whether a setting restricted to a room applies to `room`.
    pub fn applies_to_room(&self, room: &str) -> bool {
        self.room.is_empty() || self.room == room
    }

    /// The stored value, falling back to the default.
    pub fn effective_value(&self) -> &str {
        if self.value.is_empty() {
            &self.default
        } else {
            &self.value
        }
    }
}

impl fmt::Display for Pref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}: {}={}",
            self.user,
            self.broker,
            self.room,
            self.plugin,
            self.key,
            self.effective_value()
        )
    }
}

/// Ordered list of prefs
pub type Prefs = Vec<Pref>;
