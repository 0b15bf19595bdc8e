use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

/// Marker in front of the selected row; other rows get the same width of
/// blank space.
pub const SELECTED_MARKER: &str = "> ";

fn split(area: Rect) -> (Rect, Rect) {
    let [main, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);
    (main, footer)
}

pub fn render_list(f: &mut Frame, title: &str, labels: &[String], highlight: Option<usize>) {
    let (main, footer) = split(f.area());

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let items: Vec<ListItem> = labels.iter().map(|l| ListItem::new(l.as_str())).collect();
    let list = List::new(items)
        .block(block)
        .style(Style::default().fg(Color::Green))
        .highlight_symbol(SELECTED_MARKER)
        .highlight_spacing(ratatui::widgets::HighlightSpacing::Always)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(highlight);
    f.render_stateful_widget(list, main, &mut state);

    f.render_widget(
        hints(&[("j/k", "move"), ("Enter", "read"), ("Esc/q", "quit")]),
        footer,
    );
}

/// Draws the body pane and returns the scroll offset actually used, which is
/// at most what keeps the last line of `text` in view.
pub fn render_text_pane(f: &mut Frame, title: &str, text: &str, scroll: u16) -> u16 {
    let (main, footer) = split(f.area());

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(main);

    let scroll = scroll.min(max_scroll(text, inner.width, inner.height));
    let p = Paragraph::new(text.to_string())
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(p, main);

    f.render_widget(
        hints(&[("j/k", "scroll"), ("Enter", "reload"), ("Esc", "back"), ("q", "quit")]),
        footer,
    );
    scroll
}

fn max_scroll(text: &str, width: u16, height: u16) -> u16 {
    let rows = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .line_count(width);
    u16::try_from(rows.saturating_sub(height as usize)).unwrap_or(u16::MAX)
}

fn hints(pairs: &[(&'static str, &'static str)]) -> Paragraph<'static> {
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (key, what) in pairs {
        spans.push(Span::styled(*key, Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(format!(" {what}  ")));
    }
    Paragraph::new(Line::from(spans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn draw_pane(text: &str, scroll: u16) -> u16 {
        // 10 rows: 1 footer, 2 border rows, 7 rows of text.
        let mut terminal = Terminal::new(TestBackend::new(20, 10)).unwrap();
        let mut applied = 0;
        terminal
            .draw(|f| applied = render_text_pane(f, " t ", text, scroll))
            .unwrap();
        applied
    }

    #[test]
    fn test_scroll_stops_at_last_line() {
        let text: Vec<String> = (1..=30).map(|n| format!("line {n}")).collect();
        let text = text.join("\n");
        assert_eq!(draw_pane(&text, 5), 5);
        assert_eq!(draw_pane(&text, 100), 23);
    }

    #[test]
    fn test_short_text_does_not_scroll() {
        assert_eq!(draw_pane("one line", 10), 0);
    }

    #[test]
    fn test_wrapped_rows_count_towards_scroll() {
        // One logical line, wrapped over many rows of 18 columns.
        let text = "word ".repeat(60);
        assert!(draw_pane(&text, u16::MAX) > 0);
    }
}
