use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Context and output limits for a thinking-capable model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLimits {
    pub id: String,
    pub display_name: String,
    pub context_window: i64,
    pub max_output_tokens: i64,
    /// Extended output ceiling unlocked by a beta header, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_max_output_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_header: Option<String>,
    /// Largest thinking budget accepted on a streamed (non-batch) request.
    pub thinking_hard_cap: i64,
}

impl ModelLimits {
    pub fn all() -> &'static [ModelLimits] {
        &MODEL_LIMITS
    }

    pub fn get_by_id(id: &str) -> Option<&'static ModelLimits> {
        MODEL_LIMITS.iter().find(|m| m.id == id)
    }

    pub fn default_model() -> &'static ModelLimits {
        &MODEL_LIMITS[0]
    }

    /// Output ceiling to plan against: the beta cap when one exists.
    pub fn output_cap(&self) -> i64 {
        self.beta_max_output_tokens.unwrap_or(self.max_output_tokens)
    }
}

// First entry is the default model.
static MODEL_LIMITS: Lazy<Vec<ModelLimits>> = Lazy::new(|| {
    vec![
        ModelLimits {
            id: "claude-3-7-sonnet-20250219".to_string(),
            display_name: "Claude 3.7 Sonnet".to_string(),
            context_window: 200_000,
            max_output_tokens: 64_000,
            beta_max_output_tokens: Some(128_000),
            beta_header: Some("output-128k-2025-02-19".to_string()),
            thinking_hard_cap: 32_000,
        },
        ModelLimits {
            id: "claude-sonnet-4-20250514".to_string(),
            display_name: "Claude Sonnet 4".to_string(),
            context_window: 200_000,
            max_output_tokens: 64_000,
            beta_max_output_tokens: None,
            beta_header: None,
            thinking_hard_cap: 32_000,
        },
        ModelLimits {
            id: "claude-opus-4-20250514".to_string(),
            display_name: "Claude Opus 4".to_string(),
            context_window: 200_000,
            max_output_tokens: 32_000,
            beta_max_output_tokens: None,
            beta_header: None,
            thinking_hard_cap: 32_000,
        },
    ]
});
