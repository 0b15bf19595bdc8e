use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;

use crate::terminal::events::{Key, map_key};
use crate::terminal::ui;

/// Where the selection loop draws and where its key presses come from.
pub trait DisplaySurface {
    /// Draw the message list with row `highlight` marked as selected.
    fn render_list(
        &mut self,
        title: &str,
        labels: &[String],
        highlight: Option<usize>,
    ) -> Result<()>;

    /// Draw a text pane scrolled by `scroll` rows. Returns the offset
    /// actually shown, which never scrolls past the end of `text`.
    fn render_text_pane(&mut self, title: &str, text: &str, scroll: u16) -> Result<u16>;

    /// Next input, waiting at most `timeout`. `None` on timeout.
    fn next_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
}

/// The real terminal in raw mode on the alternate screen. Dropping it
/// restores the terminal, whatever state the loop ended in.
pub struct TerminalSurface {
    terminal: DefaultTerminal,
}

impl TerminalSurface {
    pub fn init() -> Self {
        // ratatui::init also installs a panic hook that restores the screen.
        Self {
            terminal: ratatui::init(),
        }
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

impl DisplaySurface for TerminalSurface {
    fn render_list(
        &mut self,
        title: &str,
        labels: &[String],
        highlight: Option<usize>,
    ) -> Result<()> {
        self.terminal
            .draw(|f| ui::render_list(f, title, labels, highlight))?;
        Ok(())
    }

    fn render_text_pane(&mut self, title: &str, text: &str, scroll: u16) -> Result<u16> {
        let mut applied = scroll;
        self.terminal
            .draw(|f| applied = ui::render_text_pane(f, title, text, scroll))?;
        Ok(applied)
    }

    fn next_key(&mut self, timeout: Duration) -> Result<Option<Key>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => map_key(key),
            Event::Resize(_, _) => Some(Key::Resize),
            _ => None,
        })
    }
}
