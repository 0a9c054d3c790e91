use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use crate::application::errors::RegistryError;
use crate::domain::traits::{Broker, CompiledPattern, Matcher};
use super::{Event, Pref, Prefs};

/// Plugin handler function type
pub type Handler = Arc<dyn Fn(Event) + Send + Sync>;

/// A named capability with metadata to assist with message routing.
///
/// Definitions are built once at startup and shared by `Arc`; the registry
/// never mutates them.
pub struct PluginDefinition {
    pub name: String,
    pub default_pattern: String,
    pub allow_multiple: bool,
    /// Required settings, autoloaded into instances with their defaults
    pub settings: Vec<Pref>,
    /// Required secret key names, resolved elsewhere
    pub secrets: Vec<String>,
    pub broker: Option<Arc<dyn Broker>>,
    handler: Handler,
}

impl PluginDefinition {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            default_pattern: String::new(),
            allow_multiple: false,
            settings: Vec::new(),
            secrets: Vec::new(),
            broker: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.default_pattern = pattern.into();
        self
    }

    pub fn with_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }

    pub fn with_setting(mut self, setting: Pref) -> Self {
        self.settings.push(setting);
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>) -> Self {
        self.secrets.push(key.into());
        self
    }

    pub fn with_broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn broker_name(&self) -> &str {
        self.broker.as_ref().map(|b| b.name()).unwrap_or("")
    }

    /// Run the handler. Called by the router for matched events.
    pub fn invoke(&self, evt: Event) {
        (self.handler)(evt)
    }

    /// Create an instance bound to `channel`. It is *not* registered, and
    /// the router ignores it until it is.
    pub fn instance(self: &Arc<Self>, channel: impl Into<String>) -> Instance {
        Instance {
            definition: Arc::clone(self),
            channel: channel.into(),
            pattern: String::new(),
            compiled: None,
            settings: RwLock::new(Vec::new()),
        }
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("default_pattern", &self.default_pattern)
            .field("allow_multiple", &self.allow_multiple)
            .field("settings", &self.settings)
            .field("secrets", &self.secrets)
            .field("broker", &self.broker_name())
            .finish()
    }
}

/// A plugin bound to one channel.
pub struct Instance {
    definition: Arc<PluginDefinition>,
    channel: String,
    pattern: String,
    compiled: Option<Arc<dyn CompiledPattern>>,
    settings: RwLock<Prefs>,
}

impl Instance {
    /// Override the definition's default pattern
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn definition(&self) -> &Arc<PluginDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Pattern source. Empty until registration resolves the default.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Broker scope of this instance's stored settings: the definition's
    /// broker, or "" for a plugin that works with any broker.
    pub fn settings_broker(&self) -> &str {
        self.definition.broker_name()
    }

    /// `<plugin>/<channel>`, unique among registered instances
    pub fn identity(&self) -> String {
        format!("{}/{}", self.definition.name, self.channel)
    }

    /// Test a body against the compiled pattern. Unregistered instances
    /// never match.
    pub fn is_match(&self, body: &str) -> bool {
        self.compiled.as_ref().is_some_and(|p| p.is_match(body))
    }

    /// Snapshot of the runtime settings
    pub fn settings(&self) -> Prefs {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Current value of a setting, if loaded
    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.effective_value().to_string())
    }

    /// Update or add a runtime setting value, scoped to this instance.
    pub fn set_setting(&self, key: &str, value: impl Into<String>) {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        let value = value.into();
        match settings.iter_mut().find(|p| p.key == key) {
            Some(p) => p.value = value,
            None => settings.push(Pref {
                broker: self.settings_broker().to_string(),
                room: self.channel.clone(),
                plugin: self.definition.name.clone(),
                key: key.to_string(),
                value,
                ..Pref::default()
            }),
        }
    }

    pub(crate) fn replace_settings(&self, prefs: Prefs) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = prefs;
    }

    /// Resolve the default pattern and compile it. Leaves nothing behind on
    /// failure since `self` is consumed.
    pub(crate) fn compile(mut self, matcher: &dyn Matcher) -> Result<Self, RegistryError> {
        if self.pattern.is_empty() {
            self.pattern = self.definition.default_pattern.clone();
        }
        self.compiled = Some(matcher.compile(&self.pattern)?);
        Ok(self)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("plugin", &self.definition.name)
            .field("channel", &self.channel)
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.definition.name, self.channel)
    }
}
