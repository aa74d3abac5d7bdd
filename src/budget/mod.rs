//! Token-budget planning for thinking-enabled completion requests.
//!
//! Every request that enables extended thinking has to split a fixed context
//! window between the prompt, the hidden thinking phase and the visible
//! output. [`TokenBudgetPlanner::plan`] is the single place where that split is
//! computed; callers feed it a measured prompt size plus their configured
//! limits and use `max_tokens` / `thinking_budget` from the result.

use crate::error::{Result, ToolkitError};
use serde::{Deserialize, Serialize};

pub mod model_limits;

pub use model_limits::ModelLimits;

/// Inputs to a single planning call.
///
/// Fields are signed so that a negative value coming from user input or a
/// miscomputed count is reported as `InvalidArgument` instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRequest {
    /// Total tokens the model can consider (prompt + thinking + output).
    pub context_window: i64,
    /// Measured or estimated size of the already-built prompt.
    pub prompt_tokens: i64,
    /// Hard ceiling on output tokens imposed by the API tier.
    pub max_output_tokens_cap: i64,
    /// Room the caller wants to keep for visible output.
    pub desired_output_tokens: i64,
    /// Thinking tokens the caller originally asked for.
    pub requested_thinking_tokens: i64,
    /// Absolute ceiling on thinking tokens.
    pub thinking_hard_cap: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetResult {
    /// `context_window - prompt_tokens`; negative when the prompt overflows.
    pub available_tokens: i64,
    /// Total output ceiling to send as `max_tokens`.
    pub max_tokens: i64,
    /// Thinking tokens to send as `budget_tokens`, after clamping.
    pub thinking_budget: i64,
    /// Whether `thinking_budget` covers the requested thinking tokens.
    pub sufficient: bool,
    /// Set when the raw thinking budget exceeded the hard cap and was clamped.
    pub thinking_clamped: bool,
    /// Thinking tokens the plan was checked against.
    pub requested_thinking_tokens: i64,
}

impl BudgetRequest {
    /// Build a request from a catalogue entry, using its context window,
    /// output cap and thinking cap.
    pub fn for_model(
        limits: &ModelLimits,
        prompt_tokens: i64,
        desired_output_tokens: i64,
        requested_thinking_tokens: i64,
    ) -> Self {
        Self {
            context_window: limits.context_window,
            prompt_tokens,
            max_output_tokens_cap: limits.output_cap(),
            desired_output_tokens,
            requested_thinking_tokens,
            thinking_hard_cap: limits.thinking_hard_cap,
        }
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("context_window", self.context_window),
            ("max_output_tokens_cap", self.max_output_tokens_cap),
            ("desired_output_tokens", self.desired_output_tokens),
            ("thinking_hard_cap", self.thinking_hard_cap),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ToolkitError::InvalidArgument(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("prompt_tokens", self.prompt_tokens),
            ("requested_thinking_tokens", self.requested_thinking_tokens),
        ];
        for (name, value) in non_negative {
            if value < 0 {
                return Err(ToolkitError::InvalidArgument(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

impl BudgetResult {
    /// Turn an insufficient plan into an error so callers can abort with `?`.
    pub fn ensure_sufficient(&self) -> Result<&Self> {
        if self.sufficient {
            Ok(self)
        } else {
            Err(ToolkitError::InsufficientThinkingBudget {
                requested: self.requested_thinking_tokens,
                available: self.thinking_budget,
            })
        }
    }
}

/// Splits a context window between prompt, thinking and visible output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBudgetPlanner;

impl TokenBudgetPlanner {
    /// Compute the output and thinking allocation for one request.
    ///
    /// The thinking budget is clamped to `thinking_hard_cap` before the
    /// sufficiency check. An insufficient budget is a normal outcome reported
    /// through [`BudgetResult::sufficient`]; only precondition violations
    /// return an error.
    pub fn plan(request: &BudgetRequest) -> Result<BudgetResult> {
        request.validate()?;

        let available_tokens = request
            .context_window
            .checked_sub(request.prompt_tokens)
            .ok_or_else(|| overflow("context_window - prompt_tokens"))?;
        let max_tokens = available_tokens.min(request.max_output_tokens_cap);

        let mut thinking_budget = max_tokens
            .checked_sub(request.desired_output_tokens)
            .ok_or_else(|| overflow("max_tokens - desired_output_tokens"))?;
        let thinking_clamped = thinking_budget > request.thinking_hard_cap;
        if thinking_clamped {
            tracing::warn!(
                thinking_budget,
                hard_cap = request.thinking_hard_cap,
                "thinking budget exceeds hard cap, reset to cap; use batch for larger thinking budgets"
            );
            thinking_budget = request.thinking_hard_cap;
        }

        let sufficient = thinking_budget >= request.requested_thinking_tokens;
        tracing::debug!(
            available_tokens,
            max_tokens,
            thinking_budget,
            sufficient,
            "planned token budget"
        );

        Ok(BudgetResult {
            available_tokens,
            max_tokens,
            thinking_budget,
            sufficient,
            thinking_clamped,
            requested_thinking_tokens: request.requested_thinking_tokens,
        })
    }
}

fn overflow(expr: &str) -> ToolkitError {
    ToolkitError::InvalidArgument(format!("{} overflows a 64-bit token count", expr))
}
