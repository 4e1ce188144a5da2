//! Centralized model definitions for all LLM providers

use super::gemini::GeminiModel;
use super::openai::OpenAIModel;
use super::{GeminiService, LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Gemini => "Google",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// Model ID, also the provider's API name
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    /// Context window size in tokens
    pub context_window: usize,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

fn openai(model: OpenAIModel, api_key: &str, gateway: Option<&str>) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!("{} requires OPENAI_API_KEY or gateway", model.api_name()));
    }
    OpenAIService::new(api_key.to_string(), model, gateway)
        .map(|s| Arc::new(s) as Arc<dyn LlmService>)
        .map_err(|e| e.message)
}

fn gemini(model: GeminiModel, api_key: &str, gateway: Option<&str>) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!("{} requires GEMINI_API_KEY or gateway", model.api_name()));
    }
    GeminiService::new(api_key.to_string(), model, gateway)
        .map(|s| Arc::new(s) as Arc<dyn LlmService>)
        .map_err(|e| e.message)
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o (balanced, multimodal)",
            context_window: 128_000,
            factory: |api_key, gateway| openai(OpenAIModel::GPT4o, api_key, gateway),
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o mini (fast, inexpensive)",
            context_window: 128_000,
            factory: |api_key, gateway| openai(OpenAIModel::GPT4oMini, api_key, gateway),
        },
        ModelDef {
            id: "gpt-4.1",
            provider: Provider::OpenAI,
            description: "GPT-4.1 (long context)",
            context_window: 1_047_576,
            factory: |api_key, gateway| openai(OpenAIModel::GPT41, api_key, gateway),
        },
        ModelDef {
            id: "gpt-4.1-mini",
            provider: Provider::OpenAI,
            description: "GPT-4.1 mini (long context, fast)",
            context_window: 1_047_576,
            factory: |api_key, gateway| openai(OpenAIModel::GPT41Mini, api_key, gateway),
        },
        ModelDef {
            id: "gemini-2.5-pro",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Pro (most capable Gemini)",
            context_window: 1_048_576,
            factory: |api_key, gateway| gemini(GeminiModel::Gemini25Pro, api_key, gateway),
        },
        ModelDef {
            id: "gemini-2.5-flash",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Flash (fast, efficient)",
            context_window: 1_048_576,
            factory: |api_key, gateway| gemini(GeminiModel::Gemini25Flash, api_key, gateway),
        },
    ]
}
