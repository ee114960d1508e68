pub mod accountant;
pub mod aggregator;
pub mod analyzer;
pub mod backfill;
pub mod calendar;
pub mod data_structures;
pub mod features;
pub mod loader;
pub mod pricing;
pub mod tokenizer;

pub use accountant::ConversationAccountant;
pub use aggregator::Aggregator;
pub use analyzer::UsageAnalyzer;
pub use backfill::assign_user_models;
pub use calendar::{HeatmapCell, HeatmapGrid, HeatmapMetric};
pub use data_structures::{
    format_usd, round_to, DailyUsage, Message, MessageKey, ModelCost, ModelPricing, ModelUsage,
    Role, SubscriptionValue, TokenAttribution, UsageRecord,
};
pub use features::is_advanced_message;
pub use loader::DataLoader;
pub use pricing::{PricingProvider, DEFAULT_THINKING_MULTIPLIER, REASONING_PREFIX};
pub use tokenizer::TokenEstimator;

pub use anyhow::Result;
pub use chrono::{DateTime, NaiveDate, Utc};
pub use chrono_tz::Tz;

pub mod prelude {
    pub use crate::analyzer::UsageAnalyzer;
    pub use crate::calendar::HeatmapMetric;
    pub use crate::data_structures::{
        format_usd, DailyUsage, ModelCost, ModelUsage, SubscriptionValue,
    };
    pub use anyhow::Result;
    pub use chrono_tz::Tz;
}
