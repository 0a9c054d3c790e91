use crate::application::messaging::command_args;
use crate::domain::entities::{Event, PluginDefinition};

pub const NAME: &str = "echo";

/// Replies with whatever follows `<prefix>echo`
pub fn definition(prefix: &str) -> PluginDefinition {
    let pattern = format!(r"^{}echo\b", regex_lite::escape(prefix));
    let prefix = prefix.to_string();

    PluginDefinition::new(NAME, move |evt: Event| {
        let Some(args) = command_args(&evt.body, &prefix, NAME) else {
            return;
        };
        if let Err(e) = evt.reply(args.join(" ")) {
            tracing::warn!("echo reply failed: {}", e);
        }
    })
    .with_pattern(pattern)
    .with_multiple(true)
}
