use chatgpt_usage_analytics::format_usd;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Row, Table},
    Frame,
};

use crate::report::format_number;
use crate::AppState;

pub struct CostsWidget;

impl CostsWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let header = Row::new(["Model", "Input", "Output", "Thinking", "Cost"]).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

        let mut rows: Vec<Row> = state
            .model_costs
            .iter()
            .map(|cost| {
                Row::new([
                    Line::from(cost.model().to_string()),
                    Line::from(format_number(cost.input_tokens())).right_aligned(),
                    Line::from(format_number(cost.output_tokens())).right_aligned(),
                    Line::from(format_number(cost.thinking_tokens())).right_aligned(),
                    Line::from(format!("${}", format_usd(cost.cost_usd()))).right_aligned(),
                ])
            })
            .collect();

        if !rows.is_empty() {
            rows.push(
                Row::new([
                    Line::from("Total"),
                    Line::from(""),
                    Line::from(""),
                    Line::from(""),
                    Line::from(format!("${}", format_usd(state.get_total_cost()))).right_aligned(),
                ])
                .style(
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
            );
        }

        let widths = [
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::bordered().title("Pay-per-use Cost Estimate"));

        frame.render_widget(table, area);
    }
}
