//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub broker: BrokerConfig,
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Prefix for built-in plugin commands, e.g. "!" for "!echo"
    pub prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "hal-bot".to_string(),
            prefix: "!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokerKind {
    #[default]
    Console,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    /// Room name the console broker posts events in
    pub room: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Console,
            room: "console".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PluginsConfig {
    /// Instances registered at startup
    pub instances: Vec<InstanceConfig>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            instances: vec![
                InstanceConfig {
                    plugin: "pluginmgr".to_string(),
                    channel: "console".to_string(),
                    pattern: None,
                },
                InstanceConfig {
                    plugin: "echo".to_string(),
                    channel: "console".to_string(),
                    pattern: None,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstanceConfig {
    pub plugin: String,
    pub channel: String,
    /// Overrides the plugin's default pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();

        if let Ok(name) = std::env::var("BOT_NAME") {
            config.bot.name = name;
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.prefix = prefix;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue("bot.prefix must not contain whitespace".to_string()));
        }
        for inst in &self.plugins.instances {
            if inst.plugin.is_empty() || inst.channel.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "plugin instance needs both plugin and channel: {:?}",
                    inst
                )));
            }
        }
        Ok(())
    }
}
