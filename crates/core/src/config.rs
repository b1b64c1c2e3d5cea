use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub ollama_url: String,
    pub model: String,
    pub temperature: f32,
    pub num_ctx: u32,
    /// Keep the model resident in memory between requests.
    pub keep_alive: bool,
    pub system_prompt: String,
    pub stream: bool,
    pub markdown: bool,
    pub auto_title: bool,
    /// Temporary sessions skip persistence entirely.
    pub temporary: bool,
    pub store_path: PathBuf,
    pub collection: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:0.5b-instruct".to_string(),
            temperature: 0.7,
            num_ctx: 4096,
            keep_alive: true,
            system_prompt: "You are a helpful assistant.".to_string(),
            stream: true,
            markdown: true,
            auto_title: true,
            temporary: false,
            store_path: default_store_path(),
            collection: "conversations".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid by the config file (written on first run), then by
    /// `CHATUI_*` environment variables.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("chatui").join("config.json"))
    }

    fn apply_env(&mut self) {
        for (key, value) in std::env::vars() {
            let Some(key) = key.strip_prefix("CHATUI_") else {
                continue;
            };
            // Env overrides are best-effort; a malformed value is skipped.
            let _ = self.set(&key.to_lowercase(), &value);
        }
    }

    /// Apply a single `key value` assignment, parsing the value per field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "ollama_url" | "url" => self.ollama_url = value.to_string(),
            "model" => self.model = value.to_string(),
            "temperature" => self.temperature = value.parse()?,
            "num_ctx" => self.num_ctx = value.parse()?,
            "keep_alive" => self.keep_alive = parse_bool(value)?,
            "system_prompt" => self.system_prompt = value.to_string(),
            "stream" => self.stream = parse_bool(value)?,
            "markdown" => self.markdown = parse_bool(value)?,
            "auto_title" => self.auto_title = parse_bool(value)?,
            "temporary" => self.temporary = parse_bool(value)?,
            "store_path" | "store" => self.store_path = PathBuf::from(value),
            "collection" => self.collection = value.to_string(),
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        other => Err(anyhow::anyhow!("Expected a boolean, got {:?}", other)),
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatui")
        .join("chats.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_parses_each_field() {
        let mut config = Config::default();

        config.set("model", "qwen3:8b").unwrap();
        config.set("temperature", "0.2").unwrap();
        config.set("num_ctx", "8192").unwrap();
        config.set("stream", "off").unwrap();
        config.set("auto_title", "yes").unwrap();
        config.set("collection", "archive").unwrap();

        assert_eq!(config.model, "qwen3:8b");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.num_ctx, 8192);
        assert!(!config.stream);
        assert!(config.auto_title);
        assert_eq!(config.collection, "archive");
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut config = Config::default();
        assert!(config.set("no_such_key", "x").is_err());
        assert!(config.set("temperature", "warm").is_err());
        assert!(config.set("stream", "sometimes").is_err());
    }
}
