//! Plugin manager - chat commands that manage plugin instances at runtime

use std::sync::{Arc, Weak};
use tracing::warn;
use crate::application::errors::BotError;
use crate::application::messaging::command_args;
use crate::application::registry::Registry;
use crate::domain::entities::{Event, Instance, PluginDefinition};
use crate::domain::traits::PrefStore;

pub const NAME: &str = "pluginmgr";

/// Register an instance of `def` on `channel` and load its settings.
///
/// Single-instance plugins that already run somewhere are refused with an
/// ordinary error, checked under the registry lock, so chat users and config
/// files never trip the registry's fatal check.
pub fn attach_instance(
    registry: &Registry,
    store: &dyn PrefStore,
    def: &Arc<PluginDefinition>,
    channel: &str,
    pattern: Option<&str>,
) -> Result<Arc<Instance>, BotError> {
    let mut inst = def.instance(channel);
    if let Some(pattern) = pattern {
        inst = inst.with_pattern(pattern);
    }

    let inst = registry.try_register_instance(inst)?;
    registry.load_instance_settings(&inst, store);
    Ok(inst)
}

/// Parsed `--room` / `--regex` options and positional arguments
#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    positional: Vec<String>,
    room: Option<String>,
    regex: Option<String>,
}

fn parse_options(args: &[String]) -> Result<Options, BotError> {
    let mut opts = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "--room" => &mut opts.room,
            "--regex" => &mut opts.regex,
            _ => {
                opts.positional.push(arg.clone());
                continue;
            }
        };
        let value = iter
            .next()
            .ok_or_else(|| BotError::Plugin(format!("{} needs a value", arg)))?;
        *slot = Some(value.clone());
    }

    Ok(opts)
}

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// The `pluginmgr` meta-plugin
pub struct PluginManager {
    registry: Weak<Registry>,
    store: Arc<dyn PrefStore>,
    prefix: String,
}

impl PluginManager {
    pub fn new(registry: &Arc<Registry>, store: Arc<dyn PrefStore>, prefix: impl Into<String>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            store,
            prefix: prefix.into(),
        }
    }

    /// Wrap the manager into a definition. Holds only a weak reference to the
    /// registry the definition is registered in.
    pub fn into_definition(self) -> PluginDefinition {
        let pattern = format!(r"^{}plugin\b", regex_lite::escape(&self.prefix));
        PluginDefinition::new(NAME, move |evt: Event| self.on_event(evt))
            .with_pattern(pattern)
            .with_multiple(false)
    }

    fn on_event(&self, evt: Event) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let Some(args) = command_args(&evt.body, &self.prefix, "plugin") else {
            return;
        };

        if let Err(e) = self.handle(&registry, &evt, &args) {
            if let Err(send_err) = evt.reply_error(&e) {
                warn!("pluginmgr could not report '{}': {}", e, send_err);
            }
        }
    }

    fn handle(&self, registry: &Registry, evt: &Event, args: &[String]) -> Result<(), BotError> {
        let rest = args.get(1..).unwrap_or_default();
        match args.first().map(String::as_str) {
            Some("list") => self.list(registry, evt),
            Some("instances") => self.instances(registry, evt),
            Some("attach") => self.attach(registry, evt, rest),
            Some("detach") => self.detach(registry, evt, rest),
            Some("settings") => self.settings(registry, evt, rest),
            Some("set") => self.set(registry, evt, rest),
            _ => evt.reply(self.usage()),
        }
    }

    fn usage(&self) -> String {
        let p = &self.prefix;
        [
            format!("{p}plugin list"),
            format!("{p}plugin instances"),
            format!("{p}plugin attach <plugin> [--room <channel>] [--regex <pattern>]"),
            format!("{p}plugin detach <plugin> [--room <channel>]"),
            format!("{p}plugin settings <plugin> [--room <channel>]"),
            format!("{p}plugin set <plugin> <key> <value> [--room <channel>]"),
        ]
        .join("\n")
    }

    fn list(&self, registry: &Registry, evt: &Event) -> Result<(), BotError> {
        let active = registry.active_definitions();
        let rows: Vec<Vec<String>> = registry
            .definitions()
            .iter()
            .map(|d| {
                let status = if active.iter().any(|a| a.name == d.name) { "active" } else { "inactive" };
                cells(&[d.name.as_str(), status, d.default_pattern.as_str()])
            })
            .collect();

        evt.reply_table(&cells(&["plugin", "status", "default pattern"]), &rows)
    }

    fn instances(&self, registry: &Registry, evt: &Event) -> Result<(), BotError> {
        let rows: Vec<Vec<String>> = registry
            .instances()
            .iter()
            .map(|i| cells(&[i.name(), i.channel(), i.pattern()]))
            .collect();

        evt.reply_table(&cells(&["plugin", "channel", "pattern"]), &rows)
    }

    /// The one instance named by `<plugin> [--room]`, defaulting to this room
    fn target(&self, registry: &Registry, evt: &Event, opts: &Options) -> Result<Arc<Instance>, BotError> {
        let name = opts
            .positional
            .first()
            .ok_or_else(|| BotError::Plugin("missing plugin name".to_string()))?;
        let room = opts.room.as_deref().unwrap_or(evt.channel());

        registry
            .find_instances(room, name)
            .into_iter()
            .next()
            .ok_or_else(|| BotError::Plugin(format!("'{}' is not attached to '{}'", name, room)))
    }

    fn attach(&self, registry: &Registry, evt: &Event, args: &[String]) -> Result<(), BotError> {
        let opts = parse_options(args)?;
        let name = opts
            .positional
            .first()
            .ok_or_else(|| BotError::Plugin("missing plugin name".to_string()))?;
        let def = registry
            .definition(name)
            .ok_or_else(|| BotError::Plugin(format!("no such plugin '{}'", name)))?;
        let room = opts.room.as_deref().unwrap_or(evt.channel());

        let inst = attach_instance(registry, self.store.as_ref(), &def, room, opts.regex.as_deref())?;
        evt.reply(format!(
            "Attached '{}' to '{}' with pattern '{}'",
            inst.name(),
            inst.channel(),
            inst.pattern()
        ))
    }

    fn detach(&self, registry: &Registry, evt: &Event, args: &[String]) -> Result<(), BotError> {
        let opts = parse_options(args)?;
        let inst = self.target(registry, evt, &opts)?;

        registry.unregister_instance(&inst);
        evt.reply(format!("Detached '{}' from '{}'", inst.name(), inst.channel()))
    }

    fn settings(&self, registry: &Registry, evt: &Event, args: &[String]) -> Result<(), BotError> {
        let opts = parse_options(args)?;
        let inst = self.target(registry, evt, &opts)?;

        let rows: Vec<Vec<String>> = inst
            .settings()
            .iter()
            .map(|p| cells(&[p.key.as_str(), p.effective_value()]))
            .collect();
        evt.reply_table(&cells(&["key", "value"]), &rows)
    }

    fn set(&self, registry: &Registry, evt: &Event, args: &[String]) -> Result<(), BotError> {
        let opts = parse_options(args)?;
        let inst = self.target(registry, evt, &opts)?;
        let (Some(key), Some(value)) = (opts.positional.get(1), opts.positional.get(2)) else {
            return Err(BotError::Plugin("usage: set <plugin> <key> <value>".to_string()));
        };

        inst.set_setting(key, value.clone());
        registry.save_instance_settings(&inst, self.store.as_ref())?;
        evt.reply(format!("Set {}={} for '{}'", key, value, inst))
    }
}
