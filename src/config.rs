use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Path of the persisted JSON document.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Default provider when neither the request nor the item names one.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Ordered Gemini model fallback list, tried first to last.
    #[serde(default = "default_gemini_models")]
    pub gemini_models: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai_model: default_openai_model(),
            gemini_models: default_gemini_models(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o".to_string()
}
fn default_gemini_models() -> Vec<String> {
    vec!["gemini-1.5-pro".to_string(), "gemini-1.5-flash".to_string()]
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.ai.provider.as_str() {
        "openai" | "gemini" => {}
        other => anyhow::bail!("Unknown AI provider: '{}'. Must be openai or gemini.", other),
    }

    if config.ai.gemini_models.is_empty() {
        anyhow::bail!("ai.gemini_models must list at least one model");
    }

    if config.ai.timeout_secs == 0 {
        anyhow::bail!("ai.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_defaults_fill_ai_section() {
        let f = write_config("[storage]\npath = \"data/storage.json\"\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.ai.provider, "gemini");
        assert_eq!(config.ai.openai_model, "gpt-4o");
        assert_eq!(config.ai.gemini_models.len(), 2);
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let f = write_config("[storage]\npath = \"x.json\"\n[ai]\nprovider = \"claude\"\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_rejects_empty_gemini_models() {
        let f = write_config("[storage]\npath = \"x.json\"\n[ai]\ngemini_models = []\n");
        assert!(load_config(f.path()).is_err());
    }
}
