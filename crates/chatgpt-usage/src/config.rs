use anyhow::Result;
use chatgpt_usage_analytics::{ModelPricing, PricingProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const CONFIG_PATH: &str = "~/.chatgpt-usage.json";

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_SUBSCRIPTION_PRICE: f64 = 20.0;

/// USD per million tokens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceOverride {
    pub input: f64,
    pub output: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct UsageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pricing: BTreeMap<String, PriceOverride>,
}

impl UsageConfig {
    pub fn timezone(&self) -> &str {
        self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE)
    }

    pub fn subscription_price(&self) -> f64 {
        self.subscription_price.unwrap_or(DEFAULT_SUBSCRIPTION_PRICE)
    }

    pub fn pricing_provider(&self) -> PricingProvider {
        let mut provider = PricingProvider::new();
        if let Some(multiplier) = self.thinking_multiplier {
            provider = provider.with_thinking_multiplier(multiplier);
        }
        for (model, price) in &self.pricing {
            provider.set_pricing(model.clone(), ModelPricing::per_million(price.input, price.output));
        }
        provider
    }
}

pub fn get_config_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(CONFIG_PATH).as_ref())
}

pub fn load_config() -> Result<UsageConfig> {
    let config_path = get_config_path();

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let config: UsageConfig = serde_json::from_str(&content)?;
        Ok(config)
    } else {
        Ok(UsageConfig::default())
    }
}

pub fn save_config(config: &UsageConfig) -> Result<()> {
    let config_path = get_config_path();
    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UsageConfig::default();
        assert_eq!(config.timezone(), "UTC");
        assert_eq!(config.subscription_price(), 20.0);
        assert_eq!(config.pricing_provider().thinking_multiplier(), 3.0);
    }

    #[test]
    fn test_partial_config_parses() {
        let config: UsageConfig = serde_json::from_str(
            r#"{"timezone": "Europe/Berlin", "pricing": {"gpt-4o": {"input": 2.5, "output": 10.0}}}"#,
        )
        .unwrap();

        assert_eq!(config.timezone(), "Europe/Berlin");
        assert_eq!(config.subscription_price(), 20.0);
        let provider = config.pricing_provider();
        assert!((provider.calculate_cost("gpt-4o", 0, 1_000_000) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_thinking_multiplier_override() {
        let config = UsageConfig {
            thinking_multiplier: Some(1.5),
            ..UsageConfig::default()
        };
        assert_eq!(config.pricing_provider().thinking_tokens("o3", 100), 150);
    }

    #[test]
    fn test_serialize_skips_unset_fields() {
        let config = UsageConfig {
            timezone: Some("UTC".to_string()),
            ..UsageConfig::default()
        };
        assert_eq!(serde_json::to_string(&config).unwrap(), r#"{"timezone":"UTC"}"#);
    }
}
