use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label used for messages that carry no model identifier at all.
pub const UNKNOWN_MODEL: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    Other,
}

impl Role {
    pub fn parse(role: &str) -> Self {
        match role {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            "tool" => Role::Tool,
            _ => Role::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
            Role::Other => "other",
        }
    }
}

/// Identifies a message across the whole export. Message ids are only
/// unique inside their conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKey {
    conversation_id: String,
    message_id: String,
}

impl MessageKey {
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

/// One node of a conversation tree.
///
/// Built once by the loader, then touched by exactly two passes: model
/// backfill and token annotation (count and context). Everything after that
/// only reads it.
#[derive(Debug, Clone)]
pub struct Message {
    conversation_id: String,
    message_id: String,
    parent_id: Option<String>,
    children_ids: Vec<String>,
    role: Role,
    created_at: f64,
    text: String,
    content_type: String,
    model: Option<String>,
    metadata: Value,
    token_count: Option<u64>,
    context_token_count: Option<u64>,
}

impl Message {
    pub fn new(
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
        parent_id: Option<String>,
        role: Role,
        created_at: f64,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            parent_id,
            children_ids: Vec::new(),
            role,
            created_at,
            text: text.into(),
            content_type: "text".to_string(),
            model: None,
            metadata: Value::Null,
            token_count: None,
            context_token_count: None,
        }
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children_ids = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn key(&self) -> MessageKey {
        MessageKey::new(self.conversation_id.clone(), self.message_id.clone())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn children_ids(&self) -> &[String] {
        &self.children_ids
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    /// `created_at` as a UTC instant, `None` when it falls outside chrono's range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if !self.created_at.is_finite() {
            return None;
        }
        let secs = self.created_at.floor();
        let nanos = ((self.created_at - secs) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn token_count(&self) -> Option<u64> {
        self.token_count
    }

    pub fn context_token_count(&self) -> Option<u64> {
        self.context_token_count
    }

    pub(crate) fn set_model(&mut self, model: String) {
        self.model = Some(model);
    }

    pub(crate) fn set_token_count(&mut self, tokens: u64) {
        self.token_count = Some(tokens);
    }

    pub(crate) fn set_context_token_count(&mut self, tokens: u64) {
        self.context_token_count = Some(tokens);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAttribution {
    input_tokens: u64,
    output_tokens: u64,
    context_tokens: u64,
}

impl TokenAttribution {
    pub fn new(input_tokens: u64, output_tokens: u64, context_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            context_tokens,
        }
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn context_tokens(&self) -> u64 {
        self.context_tokens
    }
}

/// One row of the analysis table: a message with every derived field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    conversation_id: String,
    message_id: String,
    role: Role,
    model: Option<String>,
    local_time: DateTime<FixedOffset>,
    content_type: String,
    token_count: u64,
    context_token_count: u64,
    input_tokens: u64,
    output_tokens: u64,
    advanced: bool,
}

impl UsageRecord {
    pub fn new(
        message: &Message,
        local_time: DateTime<FixedOffset>,
        attribution: TokenAttribution,
        advanced: bool,
    ) -> Self {
        Self {
            conversation_id: message.conversation_id().to_string(),
            message_id: message.message_id().to_string(),
            role: message.role(),
            model: message.model().map(str::to_string),
            local_time,
            content_type: message.content_type().to_string(),
            token_count: message.token_count().unwrap_or(0),
            context_token_count: message.context_token_count().unwrap_or(0),
            input_tokens: attribution.input_tokens(),
            output_tokens: attribution.output_tokens(),
            advanced,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Model name used for grouping; messages without one share a bucket.
    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(UNKNOWN_MODEL)
    }

    pub fn local_time(&self) -> DateTime<FixedOffset> {
        self.local_time
    }

    pub fn date(&self) -> NaiveDate {
        self.local_time.date_naive()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    pub fn context_token_count(&self) -> u64 {
        self.context_token_count
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    date: NaiveDate,
    conversations: usize,
    user_messages: u64,
    messages: u64,
    input_tokens: u64,
    output_tokens: u64,
}

impl DailyUsage {
    pub fn new(
        date: NaiveDate,
        conversations: usize,
        user_messages: u64,
        messages: u64,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Self {
        Self {
            date,
            conversations,
            user_messages,
            messages,
            input_tokens,
            output_tokens,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn conversations(&self) -> usize {
        self.conversations
    }

    pub fn user_messages(&self) -> u64 {
        self.user_messages
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    model: String,
    conversations: usize,
    messages: u64,
    input_tokens: u64,
    output_tokens: u64,
}

impl ModelUsage {
    pub fn new(
        model: String,
        conversations: usize,
        messages: u64,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Self {
        Self {
            model,
            conversations,
            messages,
            input_tokens,
            output_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn conversations(&self) -> usize {
        self.conversations
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn input_tokens_m(&self) -> f64 {
        round_to(self.input_tokens as f64 / 1_000_000.0, 2)
    }

    pub fn output_tokens_m(&self) -> f64 {
        round_to(self.output_tokens as f64 / 1_000_000.0, 2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCost {
    model: String,
    input_tokens: u64,
    output_tokens: u64,
    thinking_tokens: u64,
    cost_usd: f64,
}

impl ModelCost {
    pub fn new(
        model: String,
        input_tokens: u64,
        output_tokens: u64,
        thinking_tokens: u64,
        cost_usd: f64,
    ) -> Self {
        Self {
            model,
            input_tokens,
            output_tokens,
            thinking_tokens,
            cost_usd,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn thinking_tokens(&self) -> u64 {
        self.thinking_tokens
    }

    pub fn cost_usd(&self) -> f64 {
        self.cost_usd
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionValue {
    period_months: usize,
    pay_per_use: f64,
    subscription_cost: f64,
    difference: f64,
}

impl SubscriptionValue {
    pub fn new(period_months: usize, pay_per_use: f64, monthly_price: f64) -> Self {
        let subscription_cost = monthly_price * period_months as f64;
        Self {
            period_months,
            pay_per_use,
            subscription_cost,
            difference: subscription_cost - pay_per_use,
        }
    }

    pub fn period_months(&self) -> usize {
        self.period_months
    }

    pub fn pay_per_use(&self) -> f64 {
        self.pay_per_use
    }

    pub fn subscription_cost(&self) -> f64 {
        self.subscription_cost
    }

    /// Subscription cost minus pay-per-use cost; positive means the API would have been cheaper.
    pub fn difference(&self) -> f64 {
        self.difference
    }

    pub fn subscription_is_cheaper(&self) -> bool {
        self.difference < 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    input_cost_per_token: f64,
    output_cost_per_token: f64,
}

impl ModelPricing {
    pub fn new(input_cost_per_token: f64, output_cost_per_token: f64) -> Self {
        Self {
            input_cost_per_token,
            output_cost_per_token,
        }
    }

    pub fn per_million(input_usd: f64, output_usd: f64) -> Self {
        Self::new(input_usd / 1_000_000.0, output_usd / 1_000_000.0)
    }

    pub fn input_cost_per_token(&self) -> f64 {
        self.input_cost_per_token
    }

    pub fn output_cost_per_token(&self) -> f64 {
        self.output_cost_per_token
    }

    /// Thinking tokens are billed at the output rate.
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64, thinking_tokens: u64) -> f64 {
        let cost = (input_tokens as f64 * self.input_cost_per_token)
            + ((output_tokens + thinking_tokens) as f64 * self.output_cost_per_token);

        round_to(cost, 6)
    }
}

/// Rounds half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Dollar amount at cent precision, ties rounded away from zero.
pub fn format_usd(value: f64) -> String {
    // adding 0.0 turns -0.0 into 0.0
    format!("{:.2}", round_to(value, 2) + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("assistant"), Role::Assistant);
        assert_eq!(Role::parse("tool"), Role::Tool);
        assert_eq!(Role::parse("critic"), Role::Other);
        assert_eq!(Role::parse(""), Role::Other);
    }

    #[test]
    fn test_message_timestamp_keeps_fraction() {
        let message = Message::new("c", "m", None, Role::User, 1_700_000_000.5, "hi");
        let ts = message.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_model_pricing_cost() {
        let pricing = ModelPricing::per_million(10.0, 40.0);
        let cost = pricing.calculate_cost(500, 1_000, 3_000);
        assert!((cost - 0.165).abs() < 1e-9);
    }

    #[test]
    fn test_subscription_value() {
        let value = SubscriptionValue::new(3, 12.5, 20.0);
        assert_eq!(value.subscription_cost(), 60.0);
        assert_eq!(value.difference(), 47.5);
        assert!(!value.subscription_is_cheaper());
    }

    #[test]
    fn test_round_to_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1.234, 2), 1.23);
    }

    #[test]
    fn test_format_usd_rounds_ties_up() {
        assert_eq!(format_usd(0.125), "0.13");
        assert_eq!(format_usd(0.625), "0.63");
        assert_eq!(format_usd(-0.125), "-0.13");
        assert_eq!(format_usd(1.0), "1.00");
        assert_eq!(format_usd(0.0), "0.00");
        assert_eq!(format_usd(-0.001), "0.00");
    }

    #[test]
    fn test_model_usage_millions() {
        let usage = ModelUsage::new("gpt-4o".to_string(), 1, 2, 1_234_567, 5_000);
        assert_eq!(usage.input_tokens_m(), 1.23);
        assert_eq!(usage.output_tokens_m(), 0.01);
    }
}
