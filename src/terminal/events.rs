use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::domain::email::SeqNum;
use crate::terminal::state::{AppState, View};

/// Input understood by the selection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    PageUp,
    PageDown,
    Confirm,
    /// Leave the body pane.
    Back,
    /// Esc: back from the body pane, exit from the list.
    Escape,
    Quit,
    /// The terminal was resized; not a key press but delivered the same way.
    Resize,
}

/// What the loop has to do after a key was applied to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Nothing,
    Redraw,
    Fetch { request: u64, seq: SeqNum },
    Quit,
}

pub fn map_key(key: KeyEvent) -> Option<Key> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Key::Quit);
    }
    Some(match key.code {
        KeyCode::Up | KeyCode::Char('k') => Key::Up,
        KeyCode::Down | KeyCode::Char('j') => Key::Down,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown | KeyCode::Char(' ') => Key::PageDown,
        KeyCode::Enter => Key::Confirm,
        KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => Key::Back,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char('q') => Key::Quit,
        _ => return None,
    })
}

pub fn handle_key(key: Key, state: &mut AppState) -> Command {
    if key == Key::Quit {
        state.terminate();
        return Command::Quit;
    }
    if key == Key::Resize {
        return Command::Redraw;
    }

    match state.view {
        View::Browsing => handle_list_keys(key, state),
        View::Fetching { .. } => handle_pending_keys(key, state),
        View::Reading { .. } => handle_body_keys(key, state),
        View::Terminated => Command::Quit,
    }
}

fn handle_list_keys(key: Key, state: &mut AppState) -> Command {
    match key {
        Key::Up => state.selection.up(),
        Key::Down => state.selection.down(),
        Key::PageUp => state.selection.move_selection(-10),
        Key::PageDown => state.selection.move_selection(10),
        Key::Confirm => return start_fetch(state),
        Key::Escape => {
            state.terminate();
            return Command::Quit;
        }
        _ => return Command::Nothing,
    }
    Command::Redraw
}

fn handle_pending_keys(key: Key, state: &mut AppState) -> Command {
    match key {
        // No cancellation: the result of the abandoned fetch is dropped.
        Key::Escape | Key::Back => {
            state.back_to_list();
            Command::Redraw
        }
        _ => Command::Nothing,
    }
}

fn handle_body_keys(key: Key, state: &mut AppState) -> Command {
    match key {
        Key::Down => state.scroll_body(1),
        Key::Up => state.scroll_body(-1),
        Key::PageDown => state.scroll_body(10),
        Key::PageUp => state.scroll_body(-10),
        Key::Confirm => return start_fetch(state),
        Key::Escape | Key::Back => state.back_to_list(),
        _ => return Command::Nothing,
    }
    Command::Redraw
}

fn start_fetch(state: &mut AppState) -> Command {
    match state.begin_fetch(Instant::now()) {
        Some((request, seq)) => Command::Fetch { request, seq },
        None => Command::Nothing,
    }
}
