//! Gemini API client for the city recommender
//!
//! Implements [`ChatModel`] over the `generateContent` endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::TriageError;
use crate::travel::{ChatModel, Prompt};
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Sampling settings sent with every request
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: i32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 256,
        }
    }
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    settings: GenerationSettings,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            settings: GenerationSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", BASE_URL, self.model)
    }

    fn build_request(&self, prompt: &Prompt) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.user.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: prompt.system.clone(),
                }],
            },
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(TriageError::ConfigError(
                "GOOGLE_API_KEY not configured".to_string(),
            ));
        }

        let request = self.build_request(prompt);

        info!(model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                TriageError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(TriageError::LlmError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            TriageError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        extract_text(&gemini_response)
    }
}

fn extract_text(response: &GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| TriageError::LlmError("No response from Gemini API".to_string()))?;

    let text: String = candidate
        .content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect();

    if text.trim().is_empty() {
        return Err(TriageError::LlmError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    finish_reason: Option<String>,
}
