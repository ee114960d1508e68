use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::AppState;

const SHORTCUTS: [(&str, &str); 7] = [
    ("q", " quit  "),
    ("r", " reload  "),
    ("←/→", " year  "),
    ("m", " metric  "),
    ("s", " models  "),
    ("v", " subscription  "),
    ("Esc", " close"),
];

pub struct ShortcutsWidget;

impl ShortcutsWidget {
    pub fn render(frame: &mut Frame, area: Rect, _state: &AppState) {
        let key_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);

        let spans: Vec<Span> = SHORTCUTS
            .iter()
            .flat_map(|(key, action)| {
                [
                    Span::styled(*key, key_style),
                    Span::styled(*action, Style::default().fg(Color::Gray)),
                ]
            })
            .collect();

        let shortcuts = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);

        frame.render_widget(shortcuts, area);
    }
}
