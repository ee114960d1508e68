use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
    Frame,
};

use chatgpt_usage_analytics::{format_usd, SubscriptionValue};

use crate::AppState;

pub struct SubscriptionPopupWidget;

impl SubscriptionPopupWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let popup_area = centered_rect(50, 50, area);

        // Clear the area first
        frame.render_widget(Clear, popup_area);

        let text = match &state.subscription {
            Some(value) => Self::create_subscription_text(value, state.subscription_price),
            None => vec![Line::from(Span::styled(
                "No data loaded",
                Style::default().fg(Color::Red),
            ))],
        };

        let popup = Paragraph::new(text)
            .block(
                Block::bordered()
                    .title("Subscription Value")
                    .title_alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Cyan)),
            )
            .alignment(Alignment::Left);

        frame.render_widget(popup, popup_area);
    }

    fn create_subscription_text(value: &SubscriptionValue, monthly_price: f64) -> Vec<Line<'static>> {
        let bold = |color: Color| Style::default().fg(color).add_modifier(Modifier::BOLD);

        let verdict = if value.subscription_is_cheaper() {
            Span::styled(
                format!("Subscription saved ${}", format_usd(-value.difference())),
                bold(Color::Green),
            )
        } else {
            Span::styled(
                format!("Pay-per-use would have saved ${}", format_usd(value.difference())),
                bold(Color::Red),
            )
        };

        vec![
            Line::from(vec![
                Span::styled("Active Months: ", Style::default().fg(Color::White)),
                Span::styled(value.period_months().to_string(), bold(Color::Yellow)),
            ]),
            Line::from(vec![
                Span::styled("Pay-per-use: ", Style::default().fg(Color::White)),
                Span::styled(format!("${}", format_usd(value.pay_per_use())), bold(Color::Yellow)),
            ]),
            Line::from(vec![
                Span::styled("Subscription: ", Style::default().fg(Color::White)),
                Span::styled(
                    format!("${}", format_usd(value.subscription_cost())),
                    bold(Color::Yellow),
                ),
                Span::styled(
                    format!(" (${}/month)", format_usd(monthly_price)),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(vec![
                Span::styled("Difference: ", Style::default().fg(Color::White)),
                Span::styled(format!("${}", format_usd(value.difference())), bold(Color::Cyan)),
            ]),
            Line::from(" "),
            Line::from(verdict),
            Line::from(" "),
            close_hint("v"),
        ]
    }
}

pub fn close_hint(key: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled("Press ", Style::default().fg(Color::Gray)),
        Span::styled(
            key,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" or ", Style::default().fg(Color::Gray)),
        Span::styled(
            "Esc",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" to close", Style::default().fg(Color::Gray)),
    ])
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
