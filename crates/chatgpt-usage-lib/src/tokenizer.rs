//! Token counting for message text.
//!
//! Two tiers: an exact BPE count when the `tiktoken` feature is compiled in
//! and the model maps to a known encoding, otherwise a length heuristic of
//! roughly four characters per token. The choice is made up front by
//! [`TokenEstimator::exact_tokenizer_available`], never by catching failures.

use crate::data_structures::Message;
#[cfg(feature = "tiktoken")]
use std::collections::HashMap;
use tracing::debug;

/// Characters per token assumed by the fallback heuristic.
pub const CHARS_PER_TOKEN: usize = 4;

pub struct TokenEstimator {
    exact_enabled: bool,
    #[cfg(feature = "tiktoken")]
    encoders: HashMap<String, Option<tiktoken_rs::CoreBPE>>,
}

impl TokenEstimator {
    /// Uses exact counts whenever they are available.
    pub fn new() -> Self {
        Self {
            exact_enabled: cfg!(feature = "tiktoken"),
            #[cfg(feature = "tiktoken")]
            encoders: HashMap::new(),
        }
    }

    /// Always uses the length heuristic.
    pub fn heuristic_only() -> Self {
        Self {
            exact_enabled: false,
            #[cfg(feature = "tiktoken")]
            encoders: HashMap::new(),
        }
    }

    pub fn exact_tokenizer_available(&self, model: Option<&str>) -> bool {
        match model {
            Some(model) if self.exact_enabled && !model.is_empty() => has_encoding(model),
            _ => false,
        }
    }

    pub fn estimate(&mut self, text: &str, model: Option<&str>) -> u64 {
        if text.is_empty() {
            return 0;
        }

        if let Some(model) = model.filter(|m| self.exact_tokenizer_available(Some(*m))) {
            if let Some(count) = self.exact_count(text, model) {
                return count;
            }
            debug!(model, "no encoder for model, using length heuristic");
        }

        heuristic_count(text)
    }

    /// Sets `token_count` on every message that does not have one yet.
    pub fn annotate(&mut self, messages: &mut [Message]) {
        for message in messages.iter_mut() {
            if message.token_count().is_some() {
                continue;
            }
            let tokens = self.estimate(message.text(), message.model());
            message.set_token_count(tokens);
        }
    }

    #[cfg(feature = "tiktoken")]
    fn exact_count(&mut self, text: &str, model: &str) -> Option<u64> {
        let encoder = self
            .encoders
            .entry(model.to_string())
            .or_insert_with(|| tiktoken_rs::get_bpe_from_model(model).ok());

        encoder
            .as_ref()
            .map(|bpe| bpe.encode_ordinary(text).len() as u64)
    }

    #[cfg(not(feature = "tiktoken"))]
    fn exact_count(&mut self, _text: &str, _model: &str) -> Option<u64> {
        None
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "tiktoken")]
fn has_encoding(model: &str) -> bool {
    tiktoken_rs::tokenizer::get_tokenizer(model).is_some()
}

#[cfg(not(feature = "tiktoken"))]
fn has_encoding(_model: &str) -> bool {
    false
}

/// `max(1, chars / 4)` for non-empty text, 0 for empty text.
pub fn heuristic_count(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    ((text.chars().count() / CHARS_PER_TOKEN) as u64).max(1)
}
