//! City recommender
//!
//! One model call per request: template → chat model → city-list parser.
//! The pipeline is built once at startup and injected where needed.

use crate::error::TriageError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Under1000,
    From1000To2000,
    From2000To5000,
    Over5000,
}

impl Budget {
    pub const ALL: [Budget; 4] = [
        Budget::Under1000,
        Budget::From1000To2000,
        Budget::From2000To5000,
        Budget::Over5000,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Budget::Under1000 => "Less than $1000",
            Budget::From1000To2000 => "Between $1000 and $2000",
            Budget::From2000To5000 => "Between $2000 and $5000",
            Budget::Over5000 => "More than $5000",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Budget::Under1000 => "under-1000",
            Budget::From1000To2000 => "1000-2000",
            Budget::From2000To5000 => "2000-5000",
            Budget::Over5000 => "over-5000",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Budget {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Budget::ALL
            .iter()
            .copied()
            .find(|b| b.label().eq_ignore_ascii_case(s) || b.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let keys: Vec<&str> = Budget::ALL.iter().map(|b| b.key()).collect();
                TriageError::InvalidRequest(format!(
                    "unknown budget '{}', expected one of: {}",
                    s,
                    keys.join(", ")
                ))
            })
    }
}

/// Budget and vacation length in weeks (at least one)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripRequest {
    pub budget: Budget,
    pub weeks: u32,
}

impl TripRequest {
    pub fn new(budget: Budget, weeks: u32) -> Result<Self> {
        if weeks < 1 {
            return Err(TriageError::InvalidRequest(
                "vacation must last at least one week".to_string(),
            ));
        }
        Ok(Self { budget, weeks })
    }
}

/// Rendered prompt handed to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// `{duration}` and `{budget}` placeholders in the user template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
    user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: "You are a helpful travel assistant.".to_string(),
            user: "I want to spend a nice vacation for {duration} week(s). \
                   My budget for the entire trip is {budget}. \
                   Suggest a list of 10 cities to visit that would fit this budget. \
                   Return ONLY the city names as a comma-separated list. No explanations."
                .to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    pub fn render(&self, request: &TripRequest) -> Prompt {
        Prompt {
            system: self.system.clone(),
            user: self
                .user
                .replace("{duration}", &request.weeks.to_string())
                .replace("{budget}", request.budget.label()),
        }
    }
}

/// Text-in, text-out language model
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// Split a model reply into city names.
///
/// Accepts commas or newlines; strips bullets, numbering and trailing periods.
pub fn parse_city_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(clean_city)
        .filter(|c| !c.is_empty())
        .collect()
}

fn clean_city(item: &str) -> String {
    let item = item.trim().trim_start_matches(['-', '*', '•']).trim_start();

    // "3. Paris" / "3) Paris"
    let digits = item.chars().take_while(|c| c.is_ascii_digit()).count();
    let item = if digits > 0 {
        item[digits..]
            .trim_start_matches(['.', ')'])
            .trim_start()
    } else {
        item
    };

    item.trim_end_matches('.').trim().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub cities: Vec<String>,
    pub raw: String,
}

/// Prompt template plus injected model
#[derive(Clone)]
pub struct CityRecommender {
    template: PromptTemplate,
    model: Arc<dyn ChatModel>,
}

impl CityRecommender {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            template: PromptTemplate::default(),
            model,
        }
    }

    pub async fn recommend(&self, request: &TripRequest) -> Result<Recommendation> {
        let prompt = self.template.render(request);

        info!(
            model = self.model.name(),
            budget = request.budget.key(),
            weeks = request.weeks,
            "Requesting city recommendations"
        );

        let raw = self.model.complete(&prompt).await?;
        let cities = parse_city_list(&raw);

        Ok(Recommendation { cities, raw })
    }
}
