use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Clear, Paragraph, Row, Table},
    Frame,
};

use super::popup::{centered_rect, close_hint};
use crate::AppState;

pub struct ModelPopupWidget;

impl ModelPopupWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let popup_area = centered_rect(80, 70, area);

        frame.render_widget(Clear, popup_area);

        let block = Block::bordered()
            .title("Model Statistics (tokens in millions)")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let [table_area, hint_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

        let header = Row::new(["Model", "Conversations", "Messages", "Input M", "Output M"])
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );

        let rows: Vec<Row> = state
            .model_usage
            .iter()
            .map(|usage| {
                Row::new([
                    Line::from(usage.model().to_string()),
                    Line::from(usage.conversations().to_string()).right_aligned(),
                    Line::from(usage.messages().to_string()).right_aligned(),
                    Line::from(format!("{:.2}", usage.input_tokens_m())).right_aligned(),
                    Line::from(format!("{:.2}", usage.output_tokens_m())).right_aligned(),
                ])
                .style(Style::default().fg(Color::White))
            })
            .collect();

        let widths = [
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
        ];

        frame.render_widget(Table::new(rows, widths).header(header), table_area);
        frame.render_widget(
            Paragraph::new(close_hint("s")).alignment(Alignment::Center),
            hint_area,
        );
    }
}
