//! Reading manuscript text and measuring it in words and tokens.

use crate::error::{Result, ToolkitError};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

/// Anything that can size a prompt in model tokens.
///
/// The hosted token-counting endpoint is the accurate source; the heuristic
/// counter is what we can do offline.
pub trait TokenCounter {
    fn count(&self, text: &str) -> Result<u64>;
}

/// Cheap heuristic: ~4 bytes per token for English prose.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> Result<u64> {
        Ok(text.len() as u64 / 4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStats {
    pub word_count: u64,
    pub prompt_tokens: u64,
    pub words_per_token: f64,
}

impl TextStats {
    pub fn measure(text: &str, counter: &dyn TokenCounter) -> Result<Self> {
        let word_count = count_words(text);
        let prompt_tokens = counter.count(text)?;
        let words_per_token = if prompt_tokens > 0 {
            word_count as f64 / prompt_tokens as f64
        } else {
            0.0
        };

        Ok(Self {
            word_count,
            prompt_tokens,
            words_per_token,
        })
    }
}

/// Read a UTF-8 text file, rejecting missing and blank files.
pub fn read_text_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ToolkitError::InputNotFound {
            path: path.display().to_string(),
        },
        _ => ToolkitError::Io(e),
    })?;

    if content.trim().is_empty() {
        return Err(ToolkitError::EmptyInput {
            path: path.display().to_string(),
        });
    }

    tracing::debug!(path = %path.display(), bytes = content.len(), "read text file");
    Ok(content)
}

pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
