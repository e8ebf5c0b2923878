//! Provider adapters for schedule generation.
//!
//! Defines the [`AiProvider`] trait and two concrete implementations:
//! - **[`OpenAiProvider`]** — chat-completions endpoint in JSON response
//!   mode, single model.
//! - **[`GeminiProvider`]** — `generateContent` endpoint, tried across an
//!   ordered model fallback list; only errors once every model has failed.
//!
//! Both adapters return the raw parsed payload as a [`serde_json::Value`].
//! Response text that is not valid JSON (after stripping markdown code
//! fences) comes back as `Value::String`, so callers see one shape for the
//! "provider answered but not with JSON" case regardless of which provider
//! ran. Network and credential failures propagate as errors; there is no
//! cross-request retry beyond the in-adapter model fallback.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::AiConfig;
use crate::models::CatalogItem;

/// Instruction block appended to every prompt describing the exact JSON
/// shape we want back. Redundant with the validator, but it measurably
/// reduces the malformed-output rate.
const JSON_SHAPE_INSTRUCTIONS: &str = r#"
Respond with valid JSON in this exact format:
{
  "name": "string",
  "nextMaintenanceDates": {
    "minor": "ISO-8601 date-time",
    "major": "ISO-8601 date-time"
  },
  "maintenanceSchedule": {
    "minorIntervalMonths": "string",
    "minorTasks": ["string"],
    "majorIntervalMonths": "string",
    "majorTasks": ["string"]
  },
  "reasoning": "string"
}
Respond only in valid JSON format."#;

/// An external LLM service that can answer a schedule prompt.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider tag used in diagnostics (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Issue the prompt and return the raw parsed payload.
    ///
    /// `Ok(Value::String(..))` means the provider answered with text that is
    /// not valid JSON. `Err` means the request itself failed.
    async fn generate(&self, prompt: &str) -> Result<Value>;
}

/// Build the schedule prompt for one catalog item.
///
/// Missing service dates fall back to the installation date, matching what
/// the maintenance history actually implies.
pub fn build_schedule_prompt(item: &CatalogItem) -> String {
    let installation = item.installation_date.as_deref().unwrap_or("N/A");
    let minor = item
        .last_maintenance_date
        .minor
        .as_deref()
        .unwrap_or(installation);
    let major = item
        .last_maintenance_date
        .major
        .as_deref()
        .unwrap_or(installation);

    format!(
        "You are a home maintenance expert. Given the following household item and its \
         attributes, generate a maintenance schedule together with the next minor and major \
         service dates.\n\n\
         Item details:\n\
         - Name: {}\n\
         - Model: {}\n\
         - Brand: {}\n\
         - Installation Date: {}\n\
         - Location: {}\n\
         - Last Minor Service Date: {}\n\
         - Last Major Service Date: {}\n\
         {}",
        item.name,
        item.model.as_deref().unwrap_or("N/A"),
        item.brand.as_deref().unwrap_or("N/A"),
        installation,
        item.location.as_deref().unwrap_or("N/A"),
        minor,
        major,
        JSON_SHAPE_INSTRUCTIONS,
    )
}

/// Strip leading/trailing markdown code-fence markers from response text.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Parse cleaned response text as JSON, degrading to a plain string.
fn parse_or_string(cleaned: &str) -> Value {
    serde_json::from_str(cleaned).unwrap_or_else(|_| Value::String(cleaned.to_string()))
}

// ============ OpenAI-style Provider ============

/// Adapter for the OpenAI chat-completions API in JSON response mode.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: &AiConfig) -> Self {
        Self {
            api_key,
            model: config.openai_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<Value> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": "You are a home maintenance expert." },
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.5,
            "max_tokens": 400
        });

        let response = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, text);
        }

        let json: Value = response.json().await.context("OpenAI response was not JSON")?;
        let content = json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("OpenAI response missing message content"))?;

        Ok(parse_or_string(strip_code_fences(content)))
    }
}

// ============ Gemini-style Provider ============

/// Adapter for the Gemini `generateContent` API with ordered model fallback.
pub struct GeminiProvider {
    api_key: String,
    models: Vec<String>,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(api_key: String, config: &AiConfig) -> Self {
        Self {
            api_key,
            models: config.gemini_models.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<Value> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let body = serde_json::json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ]
        });

        let mut last_err = None;

        for model in &self.models {
            let endpoint = format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
                model, self.api_key
            );

            let response = match client.post(&endpoint).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_err = Some(anyhow::anyhow!("Gemini request failed for {}: {}", model, e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                last_err = Some(anyhow::anyhow!(
                    "Gemini API error {} for {}: {}",
                    status,
                    model,
                    text
                ));
                continue;
            }

            let data: Value = match response.json().await {
                Ok(v) => v,
                Err(e) => {
                    last_err = Some(anyhow::anyhow!("Gemini response for {} was not JSON: {}", model, e));
                    continue;
                }
            };

            let text = data
                .pointer("/candidates/0/content/parts/0/text")
                .and_then(Value::as_str);

            return Ok(match text {
                Some(t) => parse_or_string(strip_code_fences(t)),
                // No candidates: surface the whole payload as text so the
                // caller's non-object handling reports it.
                None => Value::String(data.to_string()),
            });
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Gemini API request failed")))
    }
}

/// Instantiate the adapter for a provider tag with an already-resolved
/// credential. Credential resolution precedence (request → environment →
/// key file) belongs to the caller.
pub fn create_provider(
    provider: &str,
    api_key: String,
    config: &AiConfig,
) -> Result<Box<dyn AiProvider>> {
    match provider {
        "openai" => Ok(Box::new(OpenAiProvider::new(api_key, config))),
        "gemini" => Ok(Box::new(GeminiProvider::new(api_key, config))),
        other => bail!("Unknown AI provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaintenanceDates;

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_parse_or_string_degrades() {
        assert_eq!(parse_or_string("{\"a\":1}"), serde_json::json!({"a":1}));
        assert_eq!(
            parse_or_string("not json"),
            Value::String("not json".to_string())
        );
    }

    #[test]
    fn test_prompt_falls_back_to_installation_date() {
        let item = CatalogItem {
            id: "1".to_string(),
            name: "HVAC".to_string(),
            installation_date: Some("2022-01-01".to_string()),
            last_maintenance_date: MaintenanceDates {
                minor: Some("2023-01-01".to_string()),
                major: None,
            },
            ..Default::default()
        };
        let prompt = build_schedule_prompt(&item);
        assert!(prompt.contains("Last Minor Service Date: 2023-01-01"));
        assert!(prompt.contains("Last Major Service Date: 2022-01-01"));
        assert!(prompt.contains("nextMaintenanceDates"));
    }

    #[test]
    fn test_create_provider_rejects_unknown() {
        let config = AiConfig::default();
        assert!(create_provider("claude", "k".to_string(), &config).is_err());
        assert!(create_provider("gemini", "k".to_string(), &config).is_ok());
    }
}
