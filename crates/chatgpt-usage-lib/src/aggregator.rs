use crate::data_structures::{
    DailyUsage, ModelCost, ModelUsage, Role, SubscriptionValue, UsageRecord,
};
use crate::pricing::PricingProvider;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub struct Aggregator;

#[derive(Default)]
struct Bucket<'a> {
    conversations: HashSet<&'a str>,
    user_messages: u64,
    messages: u64,
    input_tokens: u64,
    output_tokens: u64,
}

impl<'a> Bucket<'a> {
    fn add(&mut self, record: &'a UsageRecord) {
        self.conversations.insert(record.conversation_id());
        if record.role() == Role::User {
            self.user_messages += 1;
        }
        self.messages += 1;
        self.input_tokens += record.input_tokens();
        self.output_tokens += record.output_tokens();
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Per local calendar date, oldest first.
    pub fn aggregate_daily(&self, records: &[UsageRecord]) -> Vec<DailyUsage> {
        let mut days: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
        for record in records {
            days.entry(record.date()).or_default().add(record);
        }

        days.into_iter()
            .map(|(date, bucket)| {
                DailyUsage::new(
                    date,
                    bucket.conversations.len(),
                    bucket.user_messages,
                    bucket.messages,
                    bucket.input_tokens,
                    bucket.output_tokens,
                )
            })
            .collect()
    }

    /// Per model name; messages without a model share the `unknown` row.
    pub fn aggregate_by_model(&self, records: &[UsageRecord]) -> Vec<ModelUsage> {
        let mut models: BTreeMap<&str, Bucket> = BTreeMap::new();
        for record in records {
            models.entry(record.model_label()).or_default().add(record);
        }

        models
            .into_iter()
            .map(|(model, bucket)| {
                ModelUsage::new(
                    model.to_string(),
                    bucket.conversations.len(),
                    bucket.messages,
                    bucket.input_tokens,
                    bucket.output_tokens,
                )
            })
            .collect()
    }

    /// Distinct (year, month) pairs among the records' local dates.
    pub fn count_months(&self, records: &[UsageRecord]) -> usize {
        records
            .iter()
            .map(|record| {
                let date = record.date();
                (date.year(), date.month())
            })
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn estimate_costs(&self, usage: &[ModelUsage], pricing: &PricingProvider) -> Vec<ModelCost> {
        usage
            .iter()
            .map(|row| {
                ModelCost::new(
                    row.model().to_string(),
                    row.input_tokens(),
                    row.output_tokens(),
                    pricing.thinking_tokens(row.model(), row.output_tokens()),
                    pricing.calculate_cost(row.model(), row.input_tokens(), row.output_tokens()),
                )
            })
            .collect()
    }

    pub fn calculate_total_cost(&self, costs: &[ModelCost]) -> f64 {
        costs.iter().map(|cost| cost.cost_usd()).sum()
    }

    pub fn subscription_value(
        &self,
        costs: &[ModelCost],
        monthly_price: f64,
        months: usize,
    ) -> SubscriptionValue {
        SubscriptionValue::new(months, self.calculate_total_cost(costs), monthly_price)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
