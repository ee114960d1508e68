use crate::accountant::ConversationAccountant;
use crate::aggregator::Aggregator;
use crate::backfill::assign_user_models;
use crate::calendar::{HeatmapGrid, HeatmapMetric};
use crate::data_structures::{
    DailyUsage, Message, ModelCost, ModelUsage, SubscriptionValue, TokenAttribution, UsageRecord,
};
use crate::features::is_advanced_message;
use crate::loader::DataLoader;
use crate::pricing::PricingProvider;
use crate::tokenizer::TokenEstimator;
use anyhow::Result;
use chrono::Datelike;
use chrono_tz::Tz;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Runs the whole pipeline over one export and answers questions about it.
///
/// Loading goes extract → model backfill → token counts → tree accounting →
/// usage records; every aggregate is computed from the records on demand.
pub struct UsageAnalyzer {
    messages: Vec<Message>,
    records: Vec<UsageRecord>,
    timezone: Tz,
    pricing_provider: PricingProvider,
    aggregator: Aggregator,
    accountant: ConversationAccountant,
    loader: DataLoader,
    exact_tokens: bool,
}

impl UsageAnalyzer {
    pub fn new(timezone: Tz) -> Self {
        Self {
            messages: Vec::new(),
            records: Vec::new(),
            timezone,
            pricing_provider: PricingProvider::new(),
            aggregator: Aggregator::new(),
            accountant: ConversationAccountant::new(),
            loader: DataLoader::new(),
            exact_tokens: true,
        }
    }

    pub fn with_pricing(mut self, pricing_provider: PricingProvider) -> Self {
        self.pricing_provider = pricing_provider;
        self
    }

    /// Disables the exact tokenizer; every count uses the length heuristic.
    pub fn with_heuristic_tokens(mut self) -> Self {
        self.exact_tokens = false;
        self
    }

    pub fn load_export<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let conversations = self.loader.load_conversations(path)?;
        self.load_conversations(&conversations);
        Ok(())
    }

    pub fn load_conversations(&mut self, conversations: &[Value]) {
        let messages = self.loader.extract_messages(conversations);
        self.load_messages(messages);
    }

    pub fn load_messages(&mut self, mut messages: Vec<Message>) {
        assign_user_models(&mut messages);

        let mut estimator = if self.exact_tokens {
            TokenEstimator::new()
        } else {
            TokenEstimator::heuristic_only()
        };
        estimator.annotate(&mut messages);

        let attributions = self.accountant.account(&mut messages);

        let mut records = Vec::with_capacity(messages.len());
        for message in &messages {
            let Some(timestamp) = message.timestamp() else {
                debug!(
                    conversation = %message.conversation_id(),
                    message = %message.message_id(),
                    created_at = message.created_at(),
                    "timestamp out of range, dropping record"
                );
                continue;
            };
            let local_time = timestamp.with_timezone(&self.timezone).fixed_offset();
            let attribution = attributions
                .get(&message.key())
                .copied()
                .unwrap_or_else(|| TokenAttribution::new(0, 0, 0));
            records.push(UsageRecord::new(
                message,
                local_time,
                attribution,
                is_advanced_message(message),
            ));
        }

        info!(
            messages = messages.len(),
            records = records.len(),
            conversations = count_conversations(&messages),
            "analyzed export"
        );

        self.messages = messages;
        self.records = records;
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn pricing_provider(&self) -> &PricingProvider {
        &self.pricing_provider
    }

    pub fn daily_usage(&self) -> Vec<DailyUsage> {
        self.aggregator.aggregate_daily(&self.records)
    }

    pub fn model_usage(&self) -> Vec<ModelUsage> {
        self.aggregator.aggregate_by_model(&self.records)
    }

    pub fn model_costs(&self) -> Vec<ModelCost> {
        self.aggregator
            .estimate_costs(&self.model_usage(), &self.pricing_provider)
    }

    pub fn total_cost(&self) -> f64 {
        self.aggregator.calculate_total_cost(&self.model_costs())
    }

    pub fn month_count(&self) -> usize {
        self.aggregator.count_months(&self.records)
    }

    pub fn subscription_value(&self, monthly_price: f64) -> SubscriptionValue {
        self.aggregator
            .subscription_value(&self.model_costs(), monthly_price, self.month_count())
    }

    pub fn advanced_feature_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.is_advanced())
            .count()
    }

    pub fn heatmap(&self, year: i32, metric: HeatmapMetric) -> Option<HeatmapGrid> {
        HeatmapGrid::build(year, &self.daily_usage(), metric)
    }

    /// Calendar years present in the records, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|record| record.date().year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.records.iter().map(|record| record.input_tokens()).sum()
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.records.iter().map(|record| record.output_tokens()).sum()
    }

    pub fn conversation_count(&self) -> usize {
        count_conversations(&self.messages)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear_data(&mut self) {
        self.messages.clear();
        self.records.clear();
    }
}

impl Default for UsageAnalyzer {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

fn count_conversations(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|message| message.conversation_id())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::Role;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn node(role: &str, time: f64, text: &str, parent: Option<&str>, children: &[&str], model: Option<&str>) -> Value {
        let metadata = match model {
            Some(model) => json!({"model_slug": model}),
            None => json!({}),
        };
        json!({
            "message": {
                "author": {"role": role},
                "create_time": time,
                "content": {"content_type": "text", "parts": [text]},
                "metadata": metadata
            },
            "parent": parent,
            "children": children
        })
    }

    // 2024-01-31T23:30:00Z and later; crosses into February in UTC+1.
    fn export() -> Value {
        json!([
            {
                "conversation_id": "conv-a",
                "mapping": {
                    "root": {"message": null, "parent": null, "children": ["u1"]},
                    "u1": node("user", 1706743800.0, &"q".repeat(40), Some("root"), &["a1", "a1b"], None),
                    "a1": node("assistant", 1706743810.0, &"r".repeat(80), Some("u1"), &["u2"], Some("o3")),
                    "a1b": node("assistant", 1706743820.0, &"s".repeat(20), Some("u1"), &[], Some("o3")),
                    "u2": node("user", 1706743830.0, &"t".repeat(8), Some("a1"), &["a2", "ghost"], None),
                    "a2": node("assistant", 1706743840.0, &"v".repeat(12), Some("u2"), &[], Some("o3"))
                }
            },
            {
                "mapping": {
                    "x": node("user", 1709294400.0, "search(\"cats\") please", None, &[], Some("gpt-4o"))
                }
            }
        ])
    }

    fn analyzer(tz: Tz) -> UsageAnalyzer {
        let mut analyzer = UsageAnalyzer::new(tz).with_heuristic_tokens();
        analyzer.load_conversations(export().as_array().unwrap());
        analyzer
    }

    fn record<'a>(analyzer: &'a UsageAnalyzer, id: &str) -> &'a UsageRecord {
        analyzer
            .records()
            .iter()
            .find(|r| r.message_id() == id)
            .unwrap()
    }

    #[test]
    fn test_new_analyzer() {
        let analyzer = UsageAnalyzer::default();
        assert!(analyzer.is_empty());
        assert_eq!(analyzer.message_count(), 0);
        assert_eq!(analyzer.conversation_count(), 0);
        assert_eq!(analyzer.month_count(), 0);
    }

    #[test]
    fn test_pipeline_attribution() {
        let analyzer = analyzer(Tz::UTC);
        assert_eq!(analyzer.message_count(), 6);
        assert_eq!(analyzer.conversation_count(), 2);

        // u1: 10 tokens, a1: 20, a1b: 5, u2: 2, a2: 3
        let u1 = record(&analyzer, "u1");
        assert_eq!(u1.model(), Some("o3"));
        assert_eq!((u1.input_tokens(), u1.output_tokens()), (0, 0));

        let a1 = record(&analyzer, "a1");
        assert_eq!((a1.input_tokens(), a1.output_tokens()), (10, 20));

        let a1b = record(&analyzer, "a1b");
        assert_eq!((a1b.input_tokens(), a1b.output_tokens()), (10, 5));

        let u2 = record(&analyzer, "u2");
        assert_eq!(u2.context_token_count(), 30);
        assert_eq!(u2.model(), Some("o3"));

        let a2 = record(&analyzer, "a2");
        assert_eq!((a2.input_tokens(), a2.output_tokens()), (32, 3));
        assert_eq!(a2.context_token_count(), 32);

        assert_eq!(analyzer.total_input_tokens(), 52);
        assert_eq!(analyzer.total_output_tokens(), 28);
    }

    #[test]
    fn test_costs_and_subscription() {
        let analyzer = analyzer(Tz::UTC);
        let costs = analyzer.model_costs();

        let o3 = costs.iter().find(|c| c.model() == "o3").unwrap();
        assert_eq!(o3.input_tokens(), 52);
        assert_eq!(o3.output_tokens(), 28);
        assert_eq!(o3.thinking_tokens(), 84);

        let gpt4o = costs.iter().find(|c| c.model() == "gpt-4o").unwrap();
        assert_eq!(gpt4o.cost_usd(), 0.0);

        let value = analyzer.subscription_value(20.0);
        assert_eq!(value.period_months(), 2);
        assert_eq!(value.subscription_cost(), 40.0);
        assert!((value.pay_per_use() - analyzer.total_cost()).abs() < 1e-12);
    }

    #[test]
    fn test_timezone_shifts_dates() {
        let utc = analyzer(Tz::UTC);
        let utc_days: Vec<NaiveDate> = utc.daily_usage().iter().map(|d| d.date()).collect();
        assert_eq!(utc_days[0], NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

        let berlin = analyzer(chrono_tz::Europe::Berlin);
        let berlin_days: Vec<NaiveDate> = berlin.daily_usage().iter().map(|d| d.date()).collect();
        assert_eq!(berlin_days[0], NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(berlin.month_count(), 2);
    }

    #[test]
    fn test_advanced_features_and_heatmap() {
        let analyzer = analyzer(Tz::UTC);
        assert_eq!(analyzer.advanced_feature_count(), 1);
        assert_eq!(analyzer.years(), vec![2024]);

        let grid = analyzer.heatmap(2024, HeatmapMetric::UserMessages).unwrap();
        assert_eq!(grid.total(), 3);
        assert_eq!(grid.active_days(), 2);
    }

    #[test]
    fn test_daily_user_messages() {
        let analyzer = analyzer(Tz::UTC);
        let daily = analyzer.daily_usage();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].user_messages(), 2);
        assert_eq!(daily[0].conversations(), 1);
        assert!(analyzer.records().iter().any(|r| r.role() == Role::Assistant));
    }

    #[test]
    fn test_load_export_from_file() {
        let mut analyzer = UsageAnalyzer::new(Tz::UTC).with_heuristic_tokens();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(export().to_string().as_bytes()).unwrap();

        analyzer.load_export(temp_file.path()).unwrap();
        assert_eq!(analyzer.message_count(), 6);

        analyzer.clear_data();
        assert!(analyzer.is_empty());
        assert!(analyzer.records().is_empty());
    }
}
