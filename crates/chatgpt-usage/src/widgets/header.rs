use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use crate::AppState;

pub struct HeaderWidget;

impl HeaderWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let mut spans = vec![
            Span::styled(
                format!("ChatGPT Usage - {}", state.year),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}  ", state.metric.label()),
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!("{} ({})", state.export_path.display(), state.timezone.name()),
                Style::default().fg(Color::Gray),
            ),
        ];

        match Self::status(state) {
            Some((text, color)) => {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(text, Style::default().fg(color)));
            }
            None => spans.push(Span::raw("   ")),
        }

        let header = Paragraph::new(Line::from(spans))
            .block(Block::bordered().title("Status"))
            .alignment(Alignment::Center);

        frame.render_widget(header, area);
    }

    /// Spinner while loading, a marker after a failed load, nothing otherwise.
    fn status(state: &AppState) -> Option<(String, Color)> {
        if state.is_loading {
            Some((state.get_spinner_char().to_string(), Color::Yellow))
        } else if state.error_message.is_some() {
            Some(("load failed".to_string(), Color::Red))
        } else {
            None
        }
    }
}
