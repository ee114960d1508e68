use chatgpt_usage_analytics::format_usd;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use crate::report::format_number;
use crate::AppState;

pub struct StatisticsWidget;

impl StatisticsWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let analyzer = &state.analyzer;
        let value_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);

        let mut stats_text = vec![
            Line::from(vec![
                Span::styled("Data Status: ", Style::default().fg(Color::White)),
                Span::styled(
                    if state.data_loaded {
                        format!("Loaded ({} messages)", format_number(analyzer.message_count() as u64))
                    } else if state.is_loading {
                        "Loading...".to_string()
                    } else {
                        "No data".to_string()
                    },
                    Style::default()
                        .fg(if state.data_loaded {
                            Color::Green
                        } else {
                            Color::Red
                        })
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Conversations: ", Style::default().fg(Color::White)),
                Span::styled(format_number(analyzer.conversation_count() as u64), value_style),
            ]),
            Line::from(vec![
                Span::styled("Input Tokens: ", Style::default().fg(Color::White)),
                Span::styled(format_number(analyzer.total_input_tokens()), value_style),
            ]),
            Line::from(vec![
                Span::styled("Output Tokens: ", Style::default().fg(Color::White)),
                Span::styled(format_number(analyzer.total_output_tokens()), value_style),
            ]),
            Line::from(vec![
                Span::styled("Advanced Features: ", Style::default().fg(Color::White)),
                Span::styled(
                    format_number(analyzer.advanced_feature_count() as u64),
                    value_style,
                ),
            ]),
            Line::from(vec![
                Span::styled("Active Months: ", Style::default().fg(Color::White)),
                Span::styled(analyzer.month_count().to_string(), value_style),
            ]),
            Line::from(vec![
                Span::styled("Pay-per-use Cost: ", Style::default().fg(Color::White)),
                Span::styled(
                    format!("${}", format_usd(state.get_total_cost())),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
        ];

        if let Some(error) = &state.error_message {
            stats_text.push(Line::from(vec![
                Span::styled("Error: ", Style::default().fg(Color::Red)),
                Span::styled(
                    error.chars().take(50).collect::<String>()
                        + if error.chars().count() > 50 { "..." } else { "" },
                    Style::default().fg(Color::Red),
                ),
            ]));
        } else {
            stats_text.push(Line::from(vec![
                Span::styled("Last Update: ", Style::default().fg(Color::White)),
                Span::styled(
                    state.last_update.format("%H:%M:%S UTC").to_string(),
                    Style::default().fg(Color::Cyan),
                ),
            ]));
        }

        let stats = Paragraph::new(stats_text)
            .block(Block::bordered().title("Statistics"))
            .alignment(Alignment::Left);

        frame.render_widget(stats, area);
    }
}
