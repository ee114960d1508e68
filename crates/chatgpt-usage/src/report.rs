//! Plain text report for `--print`.

use chatgpt_usage_analytics::calendar::MAX_LEVEL;
use chatgpt_usage_analytics::{
    format_usd, HeatmapGrid, HeatmapMetric, ModelCost, ModelUsage, SubscriptionValue,
    UsageAnalyzer,
};
use std::fmt::Write;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const SHADES: [char; (MAX_LEVEL + 1) as usize] = ['·', '░', '▒', '▓', '█'];

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub fn render_report(analyzer: &UsageAnalyzer, year: i32, subscription_price: f64) -> String {
    let mut out = String::new();

    for metric in [HeatmapMetric::Conversations, HeatmapMetric::UserMessages] {
        if let Some(grid) = analyzer.heatmap(year, metric) {
            let _ = writeln!(out, "{} ChatGPT {} Heatmap", year, metric.label());
            out.push_str(&render_heatmap(&grid));
            out.push('\n');
        }
    }

    let _ = writeln!(
        out,
        "Advanced feature messages: {}",
        analyzer.advanced_feature_count()
    );
    out.push_str("\nModel Statistics (token counts in millions):\n");
    out.push_str(&render_model_table(&analyzer.model_usage()));
    out.push_str("\nCost Estimates:\n");
    out.push_str(&render_cost_table(&analyzer.model_costs()));
    out.push_str("\nSubscription Value Analysis:\n");
    out.push_str(&render_subscription(&analyzer.subscription_value(subscription_price)));

    out
}

pub fn render_heatmap(grid: &HeatmapGrid) -> String {
    let mut out = String::new();

    let mut label_row = vec![' '; grid.weeks() + 4];
    for (week, label) in grid.month_labels() {
        for (offset, c) in label.chars().enumerate() {
            if let Some(slot) = label_row.get_mut(week + 4 + offset) {
                *slot = c;
            }
        }
    }
    out.push_str(label_row.iter().collect::<String>().trim_end());
    out.push('\n');

    for (weekday, name) in WEEKDAYS.iter().enumerate() {
        out.push_str(name);
        out.push(' ');
        for week in 0..grid.weeks() {
            let shade = grid
                .cell(week, weekday)
                .map(|cell| SHADES[cell.level() as usize])
                .unwrap_or(' ');
            out.push(shade);
        }
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "total {} over {} active days",
        format_number(grid.total()),
        grid.active_days()
    );
    out
}

pub fn render_model_table(rows: &[ModelUsage]) -> String {
    let width = model_column_width(rows.iter().map(|row| row.model()));
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:>13} {:>9} {:>14} {:>15} {:>14} {:>15}",
        "model",
        "conversations",
        "messages",
        "input_tokens_M",
        "output_tokens_M",
        "input_tokens",
        "output_tokens",
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<width$} {:>13} {:>9} {:>14.2} {:>15.2} {:>14} {:>15}",
            row.model(),
            row.conversations(),
            row.messages(),
            row.input_tokens_m(),
            row.output_tokens_m(),
            format_number(row.input_tokens()),
            format_number(row.output_tokens()),
        );
    }
    out
}

pub fn render_cost_table(rows: &[ModelCost]) -> String {
    let width = model_column_width(rows.iter().map(|row| row.model()));
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:>14} {:>15} {:>15} {:>10}",
        "model", "input_tokens", "output_tokens", "thinking_tokens", "cost_usd",
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<width$} {:>14} {:>15} {:>15} {:>10}",
            row.model(),
            format_number(row.input_tokens()),
            format_number(row.output_tokens()),
            format_number(row.thinking_tokens()),
            format_usd(row.cost_usd()),
        );
    }
    out
}

pub fn render_subscription(value: &SubscriptionValue) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>13} {:>12} {:>17} {:>11}",
        "period_months", "pay_per_use", "subscription_cost", "difference"
    );
    let _ = writeln!(
        out,
        "{:>13} {:>12} {:>17} {:>11}",
        value.period_months(),
        format_usd(value.pay_per_use()),
        format_usd(value.subscription_cost()),
        format_usd(value.difference())
    );
    out
}

fn model_column_width<'a>(models: impl Iterator<Item = &'a str>) -> usize {
    models.map(|m| m.chars().count()).max().unwrap_or(0).max(5)
}
