use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::completion::{CompletionSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::conversation::{ConversationOptions, DEFAULT_GREETING};

/// On-disk configuration. Every field is optional; missing ones take defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub referer: Option<String>,
    pub title: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub copy_acknowledgment_ms: Option<u64>,
    pub greeting: Option<String>,
}

/// Everything a conversation needs at construction
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub conversation: ConversationOptions,
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Resolve the configuration into the settings injected into a conversation
    pub fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let completion = CompletionSettings {
            endpoint: self.endpoint.clone().unwrap_or(defaults.completion.endpoint),
            model: self.model.clone().unwrap_or(defaults.completion.model),
            api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
            referer: self.referer.clone().unwrap_or(defaults.completion.referer),
            title: self.title.clone().unwrap_or(defaults.completion.title),
            timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.completion.timeout),
        };
        let conversation = ConversationOptions {
            greeting: self
                .greeting
                .clone()
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            copy_acknowledgment: self
                .copy_acknowledgment_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.conversation.copy_acknowledgment),
        };
        Settings { completion, conversation }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("parley").join("config.json"))
    }
}
