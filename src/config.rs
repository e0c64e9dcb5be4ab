//! Environment configuration
//!
//! Loaded once at startup. `.env` is read first when present.

use crate::error::TriageError;
use crate::gemini::DEFAULT_MODEL;
use crate::Result;

pub const DEFAULT_PORT: u16 = 2024;
pub const DEFAULT_ASSISTANT_ID: &str = "agent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Graph id the run server answers to
    pub assistant_id: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    /// Base URL of an order-lookup service; placeholder lookup when unset
    pub lookup_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            google_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            lookup_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                TriageError::ConfigError(format!("invalid port '{}': {}", raw, e))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            port,
            assistant_id: get("ASSISTANT_ID").unwrap_or(defaults.assistant_id),
            google_api_key: get("GOOGLE_API_KEY").or_else(|| get("GEMINI_API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            lookup_url: get("ORDER_LOOKUP_URL"),
        })
    }
}
