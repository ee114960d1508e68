use chatgpt_usage_analytics::HeatmapGrid;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use crate::report::format_number;
use crate::AppState;

const WEEKDAYS: [&str; 7] = ["Mon", "   ", "Wed", "   ", "Fri", "   ", "Sun"];
const LABEL_WIDTH: usize = 4;

pub struct HeatmapWidget;

impl HeatmapWidget {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
        let title = format!("{} - {}", state.year, state.metric.label());

        let lines = match &state.heatmap {
            Some(grid) if state.data_loaded => {
                let inner_width = area.width.saturating_sub(2) as usize;
                let cell_width = if LABEL_WIDTH + grid.weeks() * 2 <= inner_width {
                    2
                } else {
                    1
                };
                Self::grid_lines(grid, cell_width)
            }
            _ => vec![Line::from(Span::styled(
                if state.is_loading {
                    "Loading export..."
                } else {
                    "No data"
                },
                Style::default().fg(Color::Gray),
            ))],
        };

        let heatmap = Paragraph::new(lines)
            .block(Block::bordered().title(title))
            .alignment(Alignment::Left);

        frame.render_widget(heatmap, area);
    }

    fn grid_lines(grid: &HeatmapGrid, cell_width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::with_capacity(9);

        let mut label_row = vec![' '; LABEL_WIDTH + grid.weeks() * cell_width];
        for (week, label) in grid.month_labels() {
            for (offset, c) in label.chars().enumerate() {
                if let Some(slot) = label_row.get_mut(LABEL_WIDTH + week * cell_width + offset) {
                    *slot = c;
                }
            }
        }
        lines.push(Line::from(Span::styled(
            label_row.into_iter().collect::<String>(),
            Style::default().fg(Color::Gray),
        )));

        let block = "■".to_string() + &" ".repeat(cell_width - 1);
        let blank = " ".repeat(cell_width);

        for (weekday, name) in WEEKDAYS.iter().enumerate() {
            let mut spans = vec![Span::styled(
                format!("{} ", name),
                Style::default().fg(Color::Gray),
            )];
            for week in 0..grid.weeks() {
                spans.push(match grid.cell(week, weekday) {
                    Some(cell) => Span::styled(
                        block.clone(),
                        Style::default().fg(level_color(cell.level())),
                    ),
                    None => Span::raw(blank.clone()),
                });
            }
            lines.push(Line::from(spans));
        }

        lines.push(Line::from(Span::styled(
            format!(
                "total {} over {} active days, p90 {:.0}",
                format_number(grid.total()),
                grid.active_days(),
                grid.scale()
            ),
            Style::default().fg(Color::Gray),
        )));

        lines
    }
}

pub fn level_color(level: u8) -> Color {
    match level {
        0 => Color::DarkGray,
        1 => Color::Rgb(14, 68, 41),
        2 => Color::Rgb(0, 109, 50),
        3 => Color::Rgb(38, 166, 65),
        _ => Color::Rgb(57, 211, 83),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgpt_usage_analytics::HeatmapMetric;

    #[test]
    fn test_grid_lines_shape() {
        let grid = HeatmapGrid::build(2024, &[], HeatmapMetric::Conversations).unwrap();
        let lines = HeatmapWidget::grid_lines(&grid, 2);
        assert_eq!(lines.len(), 9);
        assert!(lines[0].to_string().contains("Jan"));
        assert!(lines[1].to_string().starts_with("Mon ■"));
        assert!(lines[8].to_string().starts_with("total 0"));
    }

    #[test]
    fn test_level_colors_are_distinct() {
        let colors: Vec<Color> = (0..=4).map(level_color).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
