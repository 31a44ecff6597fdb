//! `AnthropicProvider` — an HTTP-backed implementation of both LLM
//! interfaces against the Anthropic Messages API, following the shape of
//! the teacher's `ClaudeClient`: build once, hold one `reqwest::Client`,
//! serialize a provider-specific request body, parse a provider-specific
//! response body.
//!
//! A non-conforming `analyze_response` result is never propagated as a
//! parse error — it maps to `ResponseAnalysis::unknown` per spec.md §6,
//! since the caller rejects non-conforming classification output rather
//! than trusting it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use records_core::{ActionType, Case, Classification, Draft, Message, ResponseAnalysis, ScopeItem, Sentiment};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::traits::{DraftContext, DraftGenerator, ResponseAnalyzer};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Clone)]
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to build anthropic http client"),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = AnthropicRequest {
            model: self.model.clone(),
            system: system.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 401 {
                LlmError::Authentication(text)
            } else if status.as_u16() == 429 {
                LlmError::RateLimitExceeded(text)
            } else {
                LlmError::Provider(format!("anthropic API error {status}: {text}"))
            });
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl ResponseAnalyzer for AnthropicProvider {
    async fn analyze_response(&self, message: &Message, case: &Case) -> Result<ResponseAnalysis> {
        let system = "You classify inbound public-records correspondence. Respond with ONLY a JSON \
                       object matching {intent, confidence, sentiment, fee, deadline, \
                       constraints_to_add, scope_updates, key_points, requires_action, \
                       suggested_action}. No prose, no markdown fences.";
        let user = format!(
            "Agency: {}\nSubject: {}\nBody:\n{}",
            case.agency.name,
            message.subject.clone().unwrap_or_default(),
            message.body_text.clone().unwrap_or_default(),
        );

        let raw = match self.complete(system, &user).await {
            Ok(raw) => raw,
            Err(e) if e.is_validation_fallback() => {
                return Ok(ResponseAnalysis::unknown(message.id));
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<ProviderAnalysis>(&raw) {
            Ok(parsed) => Ok(ResponseAnalysis {
                message_id: message.id,
                classification: parsed.intent,
                confidence: parsed.confidence,
                sentiment: parsed.sentiment,
                extracted_fee_amount: parsed.fee,
                extracted_deadline: parsed.deadline,
                constraints_to_add: parsed.constraints_to_add,
                scope_updates: parsed.scope_updates,
                key_points: parsed.key_points,
                requires_action: parsed.requires_action,
                suggested_action: parsed.suggested_action,
            }),
            Err(_) => Ok(ResponseAnalysis::unknown(message.id)),
        }
    }
}

#[async_trait]
impl DraftGenerator for AnthropicProvider {
    async fn generate(&self, case: &Case, action_type: ActionType, context: &DraftContext) -> Result<Draft> {
        let system = "You draft correspondence for a public-records request automation system. \
                       Respond with ONLY a JSON object matching {subject, body_text, body_html}. \
                       No prose, no markdown fences.";
        let exclude = if context.exclude_items.is_empty() {
            "none".to_string()
        } else {
            context.exclude_items.join(", ")
        };
        let adjustment = context
            .adjustment_instruction
            .clone()
            .unwrap_or_else(|| "none".to_string());
        let user = format!(
            "Agency: {}\nAction: {action_type:?}\nExcluded items: {exclude}\nAdjustment instruction: {adjustment}",
            case.agency.name,
        );

        let raw = self.complete(system, &user).await?;
        serde_json::from_str::<Draft>(&raw).map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    system: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

/// Mirrors spec.md §6's `analyzeResponse` wire contract field-for-field,
/// with `intent` renamed to `classification` once mapped into
/// `ResponseAnalysis`.
#[derive(Debug, Deserialize)]
struct ProviderAnalysis {
    intent: Classification,
    confidence: f64,
    sentiment: Sentiment,
    fee: Option<f64>,
    deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    constraints_to_add: Vec<String>,
    #[serde(default)]
    scope_updates: Vec<ScopeItem>,
    #[serde(default)]
    key_points: Vec<String>,
    requires_action: bool,
    suggested_action: Option<ActionType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_constructs_with_default_model() {
        let provider = AnthropicProvider::new("test-key");
        assert_eq!(provider.model, DEFAULT_MODEL);
    }

    #[test]
    fn with_model_overrides_default() {
        let provider = AnthropicProvider::new("test-key").with_model("claude-3-opus-20240229");
        assert_eq!(provider.model, "claude-3-opus-20240229");
    }
}
