use crate::data_structures::ModelPricing;
use std::collections::HashMap;

/// Models whose identifier starts with this are treated as reasoning models.
pub const REASONING_PREFIX: &str = "o";

/// Hidden thinking tokens assumed per visible output token for reasoning
/// models. The export does not record the real figure; this is an estimate.
pub const DEFAULT_THINKING_MULTIPLIER: f64 = 3.0;

/// Variant tags ChatGPT appends to a model slug. They do not change the price.
pub const VARIANT_SUFFIXES: &[&str] = &[
    "-canmore",
    "-gizmo",
    "-browsing",
    "-plugins",
    "-code-interpreter",
    "-jawbone",
    "-high",
    "-preview",
];

#[derive(Debug, Clone)]
pub struct PricingProvider {
    pricing_cache: HashMap<String, ModelPricing>,
    thinking_multiplier: f64,
}

impl PricingProvider {
    pub fn new() -> Self {
        let mut pricing_cache = HashMap::new();

        // USD per 1M input / output tokens
        let table: &[(&str, f64, f64)] = &[
            ("gpt-3.5-turbo", 0.5, 1.5),
            ("gpt-4", 30.0, 60.0),
            ("gpt-4-turbo", 10.0, 30.0),
            ("gpt-4o", 5.0, 15.0),
            ("gpt-4o-mini", 0.15, 0.6),
            ("gpt-4-1", 2.0, 8.0),
            ("gpt-4.1", 2.0, 8.0),
            ("gpt-4.1-mini", 0.4, 1.6),
            ("gpt-4-5", 75.0, 150.0),
            ("gpt-4.5", 75.0, 150.0),
            ("o1", 15.0, 60.0),
            ("o1-mini", 3.0, 12.0),
            ("o1-pro", 150.0, 600.0),
            ("o3", 10.0, 40.0),
            ("o3-mini", 1.1, 4.4),
            ("o3-pro", 20.0, 80.0),
            ("o4-mini", 1.1, 4.4),
        ];

        for (model, input, output) in table {
            pricing_cache.insert(model.to_string(), ModelPricing::per_million(*input, *output));
        }

        Self {
            pricing_cache,
            thinking_multiplier: DEFAULT_THINKING_MULTIPLIER,
        }
    }

    pub fn with_thinking_multiplier(mut self, multiplier: f64) -> Self {
        self.thinking_multiplier = multiplier.max(0.0);
        self
    }

    /// Adds a model or replaces its built-in price.
    pub fn set_pricing(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.pricing_cache.insert(model.into(), pricing);
    }

    pub fn thinking_multiplier(&self) -> f64 {
        self.thinking_multiplier
    }

    /// Strips variant tags and a trailing `-YYYY-MM-DD` snapshot date.
    pub fn normalize_model<'a>(&self, model: &'a str) -> &'a str {
        let mut normalized = model;
        loop {
            let stripped = VARIANT_SUFFIXES
                .iter()
                .find_map(|suffix| normalized.strip_suffix(suffix))
                .or_else(|| strip_date_suffix(normalized));

            match stripped {
                Some(rest) if !rest.is_empty() => normalized = rest,
                _ => return normalized,
            }
        }
    }

    /// Looks up the exact name first, then the normalized one.
    pub fn get_pricing(&self, model: &str) -> Option<&ModelPricing> {
        self.pricing_cache
            .get(model)
            .or_else(|| self.pricing_cache.get(self.normalize_model(model)))
    }

    pub fn is_reasoning_model(&self, model: &str) -> bool {
        self.normalize_model(model).starts_with(REASONING_PREFIX)
    }

    pub fn thinking_tokens(&self, model: &str, output_tokens: u64) -> u64 {
        if self.is_reasoning_model(model) {
            (output_tokens as f64 * self.thinking_multiplier).round() as u64
        } else {
            0
        }
    }

    /// Unknown models cost nothing.
    pub fn calculate_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let thinking_tokens = self.thinking_tokens(model, output_tokens);
        self.get_pricing(model)
            .map(|pricing| pricing.calculate_cost(input_tokens, output_tokens, thinking_tokens))
            .unwrap_or(0.0)
    }

    pub fn supported_models(&self) -> Vec<&String> {
        let mut models: Vec<&String> = self.pricing_cache.keys().collect();
        models.sort();
        models
    }
}

impl Default for PricingProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_date_suffix(model: &str) -> Option<&str> {
    // "-2024-08-06"
    const LEN: usize = 11;
    if model.len() <= LEN || !model.is_char_boundary(model.len() - LEN) {
        return None;
    }
    let (rest, suffix) = model.split_at(model.len() - LEN);
    let bytes = suffix.as_bytes();
    let is_date = bytes.iter().enumerate().all(|(i, b)| match i {
        0 | 5 | 8 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    is_date.then_some(rest)
}
