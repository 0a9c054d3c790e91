//! Plugin registry - Owns plugin definitions and their registered instances
//!
//! Every mutation and enumeration goes through one mutex. Queries hand out
//! snapshot copies so callers can iterate (and match patterns) without
//! holding the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};
use crate::application::errors::{RegistryError, StorageError};
use crate::domain::entities::{Instance, PluginDefinition, Prefs};
use crate::domain::traits::{Matcher, PrefStore};
use crate::infrastructure::matchers::RegexMatcher;

/// What to do when a caller breaks a registry invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvariantPolicy {
    /// Log and terminate the process. The caller has a bug.
    #[default]
    Abort,
    /// Return `RegistryError::Invariant` to the caller
    Report,
}

#[derive(Default)]
struct State {
    definitions: Vec<Arc<PluginDefinition>>,
    instances: Vec<Arc<Instance>>,
}

/// Registry of plugin definitions and instances
pub struct Registry {
    state: Mutex<State>,
    matcher: Arc<dyn Matcher>,
    policy: InvariantPolicy,
}

impl Registry {
    /// Registry using regular expressions for instance patterns
    pub fn new() -> Self {
        Self::with_matcher(Arc::new(RegexMatcher))
    }

    pub fn with_matcher(matcher: Arc<dyn Matcher>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            matcher,
            policy: InvariantPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: InvariantPolicy) -> Self {
        self.policy = policy;
        self
    }

    // The lists are only ever pushed to or compacted in one step, so a
    // panic elsewhere cannot leave them half-edited.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn violation(&self, msg: String) -> RegistryError {
        error!("BUG: {}", msg);
        match self.policy {
            InvariantPolicy::Abort => std::process::exit(1),
            InvariantPolicy::Report => RegistryError::Invariant(msg),
        }
    }

    /// Register a plugin definition.
    ///
    /// Registering a name twice is ignored so repeated init paths are safe.
    /// Returns the definition the registry holds under that name.
    pub fn register_definition(&self, def: impl Into<Arc<PluginDefinition>>) -> Arc<PluginDefinition> {
        let def = def.into();
        let mut state = self.lock();

        if let Some(existing) = state.definitions.iter().find(|d| d.name == def.name) {
            info!("Ignoring repeated registration of plugin '{}'", def.name);
            return Arc::clone(existing);
        }

        state.definitions.push(Arc::clone(&def));
        def
    }

    /// Snapshot of the registered definitions
    pub fn definitions(&self) -> Vec<Arc<PluginDefinition>> {
        self.lock().definitions.clone()
    }

    /// Look up a definition by name
    pub fn definition(&self, name: &str) -> Option<Arc<PluginDefinition>> {
        self.lock().definitions.iter().find(|d| d.name == name).cloned()
    }

    /// Register an instance so the router starts sending it events.
    ///
    /// The pattern falls back to the definition default and is compiled
    /// here. On any error the registry is left unchanged. A second instance
    /// of a single-instance plugin is a caller bug, handled per the
    /// registry's [`InvariantPolicy`].
    pub fn register_instance(&self, inst: Instance) -> Result<Arc<Instance>, RegistryError> {
        self.insert(inst, |name| {
            self.violation(format!(
                "plugin '{}' being registered multiple times when only one instance is allowed",
                name
            ))
        })
    }

    /// Like [`register_instance`](Self::register_instance), but a second
    /// instance of a single-instance plugin is an ordinary
    /// `RegistryError::SingleInstance`. For user- or config-driven attaches.
    pub fn try_register_instance(&self, inst: Instance) -> Result<Arc<Instance>, RegistryError> {
        self.insert(inst, |name| RegistryError::SingleInstance(name.to_string()))
    }

    fn insert<F>(&self, inst: Instance, on_multiple: F) -> Result<Arc<Instance>, RegistryError>
    where
        F: FnOnce(&str) -> RegistryError,
    {
        let mut state = self.lock();

        let def = inst.definition();
        if !def.allow_multiple && state.instances.iter().any(|i| i.name() == def.name) {
            return Err(on_multiple(&def.name));
        }

        let identity = inst.identity();
        if state.instances.iter().any(|i| i.identity() == identity) {
            return Err(RegistryError::AlreadyInstantiated(identity));
        }

        let inst = Arc::new(inst.compile(self.matcher.as_ref())?);
        state.instances.push(Arc::clone(&inst));

        info!(
            "Registered plugin '{}' in channel '{}' with pattern '{}'",
            inst.name(),
            inst.channel(),
            inst.pattern()
        );

        Ok(inst)
    }

    /// Remove an instance. Matches by identity of the handle, not by value.
    /// Returns false, touching nothing, when the instance is not registered.
    pub fn unregister_instance(&self, inst: &Arc<Instance>) -> bool {
        let mut state = self.lock();

        let Some(idx) = state.instances.iter().position(|i| Arc::ptr_eq(i, inst)) else {
            return false;
        };
        state.instances.remove(idx);

        info!("Unregistered plugin '{}' from channel '{}'", inst.name(), inst.channel());
        true
    }

    /// Snapshot of the registered instances, in registration order.
    /// Called for every routed event.
    pub fn instances(&self) -> Vec<Arc<Instance>> {
        self.lock().instances.clone()
    }

    /// Instances of `plugin` registered on `channel`
    pub fn find_instances(&self, channel: &str, plugin: &str) -> Vec<Arc<Instance>> {
        self.lock()
            .instances
            .iter()
            .filter(|i| i.name() == plugin && i.channel() == channel)
            .cloned()
            .collect()
    }

    /// Definitions with at least one instance, in first-seen order
    pub fn active_definitions(&self) -> Vec<Arc<PluginDefinition>> {
        let mut out: Vec<Arc<PluginDefinition>> = Vec::new();

        for inst in self.instances() {
            if !out.iter().any(|d| d.name == inst.name()) {
                out.push(Arc::clone(inst.definition()));
            }
        }

        out
    }

    /// Registered definitions without any instance
    pub fn inactive_definitions(&self) -> Vec<Arc<PluginDefinition>> {
        let state = self.lock();

        state
            .definitions
            .iter()
            .filter(|d| !state.instances.iter().any(|i| i.name() == d.name))
            .cloned()
            .collect()
    }

    pub fn len_definitions(&self) -> usize {
        self.lock().definitions.len()
    }

    pub fn len_instances(&self) -> usize {
        self.lock().instances.len()
    }

    /// Replace an instance's settings with values from `store`, one per
    /// setting the plugin declares. Settings restricted to another room are
    /// skipped.
    pub fn load_instance_settings(&self, inst: &Instance, store: &dyn PrefStore) {
        let _guard = self.lock();

        let def = inst.definition();
        let broker = inst.settings_broker();
        let prefs: Prefs = def
            .settings
            .iter()
            .filter(|stg| stg.applies_to_room(inst.channel()))
            .map(|stg| store.get("", broker, inst.channel(), &def.name, &stg.key, &stg.default))
            .collect();

        inst.replace_settings(prefs);
    }

    /// Write an instance's settings back to `store`. Stops at the first
    /// failure; settings before it are already saved.
    pub fn save_instance_settings(&self, inst: &Instance, store: &dyn PrefStore) -> Result<(), StorageError> {
        let _guard = self.lock();

        for pref in inst.settings() {
            store.set(&pref)?;
        }

        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use crate::application::errors::BotError;
    use crate::domain::entities::{Event, Pref};
    use crate::domain::traits::Broker;
    use crate::infrastructure::storage::MemoryPrefStore;

    fn reporting() -> Registry {
        Registry::new().with_policy(InvariantPolicy::Report)
    }

    fn plugin(name: &str, multi: bool) -> PluginDefinition {
        PluginDefinition::new(name, |_| {})
            .with_pattern("^deploy")
            .with_multiple(multi)
    }

    #[test]
    fn duplicate_definition_is_ignored() {
        let reg = reporting();
        let first = reg.register_definition(plugin("deploy", true));
        let second = reg.register_definition(plugin("deploy", false));
        let third = reg.register_definition(plugin("deploy", true));

        assert_eq!(reg.len_definitions(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &third));
        assert!(first.allow_multiple);
    }

    #[test]
    fn definition_lookup() {
        let reg = reporting();
        reg.register_definition(plugin("deploy", true));
        assert!(reg.definition("deploy").is_some());
        assert!(reg.definition("missing").is_none());
    }

    #[test]
    fn definitions_snapshot_is_independent() {
        let reg = reporting();
        reg.register_definition(plugin("a", true));
        let snap = reg.definitions();
        reg.register_definition(plugin("b", true));
        assert_eq!(snap.len(), 1);
        assert_eq!(reg.definitions().len(), 2);
    }

    #[test]
    fn single_instance_plugin_rejects_second_channel() {
        let reg = reporting();
        let def = reg.register_definition(plugin("solo", false));
        reg.register_instance(def.instance("ops")).unwrap();

        let err = reg.register_instance(def.instance("dev")).unwrap_err();
        assert!(err.is_invariant());
        assert_eq!(reg.len_instances(), 1);
        assert!(reg.find_instances("dev", "solo").is_empty());
    }

    #[test]
    fn try_register_reports_single_instance_without_invariant() {
        // default policy aborts on invariant violations; this path must not
        let reg = Registry::new();
        let def = reg.register_definition(plugin("solo", false));
        reg.try_register_instance(def.instance("ops")).unwrap();

        let err = reg.try_register_instance(def.instance("dev")).unwrap_err();
        assert_eq!(err, RegistryError::SingleInstance("solo".to_string()));
        assert!(!err.is_invariant());
        assert_eq!(reg.len_instances(), 1);
    }

    #[test]
    fn concurrent_try_register_admits_one_single_instance() {
        let reg = Registry::new();
        let def = reg.register_definition(plugin("solo", false));

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|n| {
                    let reg = &reg;
                    let def = &def;
                    s.spawn(move || reg.try_register_instance(def.instance(format!("room-{n}"))))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RegistryError::SingleInstance(_))));
        assert_eq!(reg.len_instances(), 1);
    }

    #[test]
    fn duplicate_identity_is_already_instantiated() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true));
        reg.register_instance(def.instance("ops")).unwrap();

        let err = reg.register_instance(def.instance("ops")).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyInstantiated("multi/ops".to_string()));
        assert_eq!(reg.len_instances(), 1);

        // same definition, different channel is fine
        reg.register_instance(def.instance("dev")).unwrap();
        assert_eq!(reg.len_instances(), 2);
    }

    #[test]
    fn bad_pattern_leaves_registry_unchanged() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true));
        let err = reg
            .register_instance(def.instance("ops").with_pattern("(unclosed"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::InvalidPattern { .. }));
        assert_eq!(reg.len_instances(), 0);

        // the identity is still free
        reg.register_instance(def.instance("ops")).unwrap();
        assert_eq!(reg.len_instances(), 1);
    }

    #[test]
    fn registered_instance_inherits_default_pattern() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true));
        let inst = reg.register_instance(def.instance("ops")).unwrap();
        assert_eq!(inst.pattern(), "^deploy");
    }

    #[test]
    fn unregister_removes_only_that_instance() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true));
        let a = reg.register_instance(def.instance("a")).unwrap();
        let b = reg.register_instance(def.instance("b")).unwrap();
        let c = reg.register_instance(def.instance("c")).unwrap();

        assert!(reg.unregister_instance(&b));
        let left = reg.instances();
        assert_eq!(left.len(), 2);
        assert!(Arc::ptr_eq(&left[0], &a));
        assert!(Arc::ptr_eq(&left[1], &c));
        assert!(reg.find_instances("b", "multi").is_empty());
    }

    #[test]
    fn unregister_unknown_instance_is_a_noop() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true));
        let a = reg.register_instance(def.instance("a")).unwrap();
        let b = reg.register_instance(def.instance("b")).unwrap();

        // never registered
        let stray = Arc::new(def.instance("a"));
        assert!(!reg.unregister_instance(&stray));

        // already removed
        assert!(reg.unregister_instance(&b));
        assert!(!reg.unregister_instance(&b));

        let left = reg.instances();
        assert_eq!(left.len(), 1);
        assert!(Arc::ptr_eq(&left[0], &a));
    }

    #[test]
    fn unregistered_single_instance_can_be_registered_again() {
        let reg = reporting();
        let def = reg.register_definition(plugin("solo", false));
        let inst = reg.register_instance(def.instance("ops")).unwrap();
        assert!(reg.unregister_instance(&inst));
        reg.register_instance(def.instance("dev")).unwrap();
        assert_eq!(reg.len_instances(), 1);
    }

    #[test]
    fn instances_snapshot_is_independent() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true));
        let a = reg.register_instance(def.instance("a")).unwrap();
        let snap = reg.instances();
        reg.unregister_instance(&a);
        reg.register_instance(def.instance("b")).unwrap();
        reg.register_instance(def.instance("c")).unwrap();

        assert_eq!(snap.len(), 1);
        assert!(Arc::ptr_eq(&snap[0], &a));
    }

    #[test]
    fn find_instances_filters_by_channel_and_name() {
        let reg = reporting();
        let one = reg.register_definition(plugin("one", true));
        let two = reg.register_definition(plugin("two", true));
        reg.register_instance(one.instance("ops")).unwrap();
        reg.register_instance(two.instance("ops")).unwrap();
        reg.register_instance(one.instance("dev")).unwrap();

        let found = reg.find_instances("ops", "one");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].identity(), "one/ops");
        assert!(reg.find_instances("ops", "three").is_empty());
    }

    #[test]
    fn active_and_inactive_partition_definitions() {
        let reg = reporting();
        let one = reg.register_definition(plugin("one", true));
        let two = reg.register_definition(plugin("two", true));
        reg.register_definition(plugin("three", true));

        let a = reg.register_instance(two.instance("ops")).unwrap();
        reg.register_instance(one.instance("ops")).unwrap();
        reg.register_instance(two.instance("dev")).unwrap();

        let active: Vec<String> = reg.active_definitions().iter().map(|d| d.name.clone()).collect();
        let inactive: Vec<String> = reg.inactive_definitions().iter().map(|d| d.name.clone()).collect();
        assert_eq!(active, vec!["two", "one"]);
        assert_eq!(inactive, vec!["three"]);

        reg.unregister_instance(&a);
        let active: Vec<String> = reg.active_definitions().iter().map(|d| d.name.clone()).collect();
        assert_eq!(active, vec!["one", "two"]);
    }

    #[test]
    fn load_settings_overwrites_from_store() {
        let reg = reporting();
        let def = reg.register_definition(
            plugin("multi", true)
                .with_setting(Pref::setting("limit", "10"))
                .with_setting(Pref::setting("mode", "fast"))
                .with_setting(Pref::setting("dev-only", "x").with_room("dev")),
        );
        let inst = reg.register_instance(def.instance("ops")).unwrap();

        let store = MemoryPrefStore::new();
        store
            .set(&Pref {
                room: "ops".into(),
                plugin: "multi".into(),
                key: "limit".into(),
                value: "3".into(),
                ..Pref::default()
            })
            .unwrap();

        inst.set_setting("stale", "1");
        reg.load_instance_settings(&inst, &store);

        let settings = inst.settings();
        assert_eq!(settings.len(), 2);
        assert_eq!(inst.setting("limit").as_deref(), Some("3"));
        assert_eq!(inst.setting("mode").as_deref(), Some("fast"));
        assert!(inst.setting("stale").is_none());
        assert!(inst.setting("dev-only").is_none());
    }

    #[test]
    fn save_settings_round_trips_through_store() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true).with_setting(Pref::setting("limit", "10")));
        let inst = reg.register_instance(def.instance("ops")).unwrap();
        let store = MemoryPrefStore::new();

        reg.load_instance_settings(&inst, &store);
        inst.set_setting("limit", "7");
        reg.save_instance_settings(&inst, &store).unwrap();

        let other = reg.register_instance(def.instance("dev")).unwrap();
        reg.load_instance_settings(&other, &store);
        assert_eq!(other.setting("limit").as_deref(), Some("10"));

        inst.replace_settings(Vec::new());
        reg.load_instance_settings(&inst, &store);
        assert_eq!(inst.setting("limit").as_deref(), Some("7"));
    }

    #[test]
    fn save_settings_propagates_store_failure() {
        let reg = reporting();
        let def = reg.register_definition(plugin("multi", true).with_setting(Pref::setting("limit", "10")));
        let inst = reg.register_instance(def.instance("ops")).unwrap();
        reg.load_instance_settings(&inst, &MemoryPrefStore::new());

        let err = reg.save_instance_settings(&inst, &ReadOnlyStore).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[test]
    fn broker_bound_plugin_scopes_settings_by_its_broker() {
        let reg = reporting();
        let def = reg.register_definition(
            plugin("standup", true)
                .with_broker(Arc::new(NamedBroker("slack")))
                .with_secret("API_TOKEN")
                .with_secret("SIGNING_KEY")
                .with_setting(Pref::setting("limit", "10")),
        );
        assert_eq!(def.secrets, vec!["API_TOKEN", "SIGNING_KEY"]);

        let store = MemoryPrefStore::new();
        for (broker, value) in [("", "1"), ("console", "2"), ("slack", "5")] {
            store
                .set(&Pref {
                    broker: broker.into(),
                    room: "ops".into(),
                    plugin: "standup".into(),
                    key: "limit".into(),
                    value: value.into(),
                    ..Pref::default()
                })
                .unwrap();
        }

        let inst = reg.register_instance(def.instance("ops")).unwrap();
        assert_eq!(inst.settings_broker(), "slack");
        reg.load_instance_settings(&inst, &store);
        assert_eq!(inst.setting("limit").as_deref(), Some("5"));

        inst.set_setting("mode", "fast");
        reg.save_instance_settings(&inst, &store).unwrap();
        assert_eq!(store.get("", "slack", "ops", "standup", "mode", "").value, "fast");
        assert_eq!(store.get("", "", "ops", "standup", "mode", "").value, "");

        // handlers read through the event with the same scope, whatever
        // broker delivered the event
        let evt = Event::new("ops", "standup")
            .with_broker(Arc::new(NamedBroker("console")))
            .with_instance(Arc::clone(&inst));
        let settings = evt.instance_settings(&store).unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].value, "5");
    }

    struct NamedBroker(&'static str);

    #[async_trait]
    impl Broker for NamedBroker {
        fn name(&self) -> &str {
            self.0
        }

        fn send(&self, _evt: Event) -> Result<(), BotError> {
            Ok(())
        }

        fn send_table(&self, _evt: Event, _header: &[String], _rows: &[Vec<String>]) -> Result<(), BotError> {
            Ok(())
        }

        async fn stream(&self, _out: mpsc::Sender<Event>) -> Result<(), BotError> {
            Ok(())
        }
    }

    struct ReadOnlyStore;

    impl PrefStore for ReadOnlyStore {
        fn get(&self, user: &str, broker: &str, room: &str, plugin: &str, key: &str, default: &str) -> Pref {
            Pref {
                user: user.into(),
                broker: broker.into(),
                room: room.into(),
                plugin: plugin.into(),
                key: key.into(),
                value: default.into(),
                default: default.into(),
            }
        }

        fn set(&self, _pref: &Pref) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only".into()))
        }

        fn find(&self, _user: &str, _broker: &str, _room: &str, _plugin: &str, _key: &str) -> Prefs {
            Vec::new()
        }
    }
}
