use chatgpt_usage_analytics::prelude::*;
use std::env;
use std::path::{Path, PathBuf};

fn format_number(n: u64) -> String {
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

fn discover_export_paths() -> Vec<PathBuf> {
    let standard_paths = ["~/Downloads/chatgpt-export", "~/chatgpt-export"];

    let mut discovered_paths = Vec::new();

    for path_str in &standard_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.join("conversations.json").is_file() {
            discovered_paths.push(path.to_path_buf());
        }
    }

    discovered_paths
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let export_path = if args.len() >= 2 {
        PathBuf::from(&args[1])
    } else {
        match discover_export_paths().into_iter().next() {
            Some(path) => path,
            None => {
                eprintln!("No ChatGPT export found in standard locations:");
                eprintln!("  ~/Downloads/chatgpt-export");
                eprintln!("  ~/chatgpt-export");
                eprintln!();
                eprintln!("Usage: {} <export folder or conversations.json> [timezone]", args[0]);
                std::process::exit(1);
            }
        }
    };

    let timezone: Tz = match args.get(2) {
        Some(name) => name
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", name, e))?,
        None => Tz::UTC,
    };

    println!("Loading export from: {}", export_path.display());
    let mut analyzer = UsageAnalyzer::new(timezone);
    analyzer.load_export(&export_path)?;

    println!(
        "Loaded {} messages across {} conversations",
        analyzer.message_count(),
        analyzer.conversation_count()
    );

    if analyzer.is_empty() {
        println!("No messages found.");
        return Ok(());
    }

    println!("\n--- Overall Statistics ---");
    println!("Input tokens (with context): {}", format_number(analyzer.total_input_tokens()));
    println!("Output tokens: {}", format_number(analyzer.total_output_tokens()));
    println!("Advanced feature messages: {}", analyzer.advanced_feature_count());
    println!("Estimated pay-per-use cost: ${}", format_usd(analyzer.total_cost()));

    println!("\n--- Model Breakdown ---");
    for usage in analyzer.model_usage() {
        println!(
            "{}: {} messages in {} conversations, {:.2}M in / {:.2}M out",
            usage.model(),
            usage.messages(),
            usage.conversations(),
            usage.input_tokens_m(),
            usage.output_tokens_m()
        );
    }

    println!("\n--- Cost Estimates ---");
    for cost in analyzer.model_costs() {
        println!(
            "{}: ${} ({} thinking tokens estimated)",
            cost.model(),
            format_usd(cost.cost_usd()),
            format_number(cost.thinking_tokens())
        );
    }

    let value = analyzer.subscription_value(20.0);
    println!("\n--- Subscription Value ---");
    println!("Months: {}", value.period_months());
    println!("Pay per use: ${}", format_usd(value.pay_per_use()));
    println!("Subscription: ${}", format_usd(value.subscription_cost()));
    if value.subscription_is_cheaper() {
        println!("The subscription saved ${}", format_usd(-value.difference()));
    } else {
        println!("Pay-per-use would have saved ${}", format_usd(value.difference()));
    }

    if let Some(year) = analyzer.years().last().copied() {
        for metric in [HeatmapMetric::Conversations, HeatmapMetric::UserMessages] {
            if let Some(grid) = analyzer.heatmap(year, metric) {
                println!(
                    "\n{} {}: {} total over {} active days",
                    year,
                    metric.label(),
                    format_number(grid.total()),
                    grid.active_days()
                );
            }
        }
    }

    Ok(())
}
