use std::time::{Duration, Instant};

use crate::domain::email::{MessageSummary, ResolvedBody, SeqNum};
use crate::error::FetchError;

pub const LOADING_TEXT: &str = "Loading message...";
pub const NO_PLAIN_TEXT: &str = "(This message has no plain-text body.)";

/// Cursor over a fixed-size list. With no items there is no selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    index: usize,
    count: usize,
}

impl SelectionState {
    pub fn new(count: usize) -> Self {
        Self { index: 0, count }
    }

    pub fn selected(&self) -> Option<usize> {
        (self.count > 0).then_some(self.index)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.count == 0 {
            return;
        }
        let cur = self.index as i64;
        let last = self.count as i64 - 1;
        self.index = (cur + delta as i64).clamp(0, last) as usize;
    }

    pub fn up(&mut self) {
        self.move_selection(-1);
    }

    pub fn down(&mut self) {
        self.move_selection(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Message list.
    Browsing,
    /// A body fetch is in flight; `request` tags the expected outcome.
    Fetching {
        request: u64,
        seq: SeqNum,
        since: Instant,
    },
    /// Body (or an error about it) in the text pane.
    Reading {
        seq: SeqNum,
        title: String,
        text: String,
        scroll: u16,
    },
    Terminated,
}

/// Result of one body fetch as delivered back to the loop.
#[derive(Debug)]
pub struct FetchOutcome {
    pub request: u64,
    pub seq: SeqNum,
    pub result: Result<ResolvedBody, FetchError>,
}

pub struct AppState {
    pub mailbox: String,
    pub items: Vec<MessageSummary>,
    pub selection: SelectionState,
    pub view: View,
    next_request: u64,
}

impl AppState {
    pub fn new(mailbox: impl Into<String>, items: Vec<MessageSummary>) -> Self {
        Self {
            mailbox: mailbox.into(),
            selection: SelectionState::new(items.len()),
            items,
            view: View::Browsing,
            next_request: 0,
        }
    }

    pub fn selected_item(&self) -> Option<&MessageSummary> {
        self.items.get(self.selection.selected()?)
    }

    pub fn is_terminated(&self) -> bool {
        self.view == View::Terminated
    }

    pub fn list_title(&self) -> String {
        format!(" {} ({} messages) ", self.mailbox, self.items.len())
    }

    /// Start a fetch of the selected message. Returns the request to send,
    /// or `None` when the list is empty.
    pub fn begin_fetch(&mut self, now: Instant) -> Option<(u64, SeqNum)> {
        let seq = self.selected_item()?.seq;
        self.next_request += 1;
        let request = self.next_request;
        self.view = View::Fetching {
            request,
            seq,
            since: now,
        };
        Some((request, seq))
    }

    /// Apply a fetch outcome. Outcomes that no longer match the pending
    /// request (timed out, abandoned) are dropped. Returns whether the
    /// view changed.
    pub fn complete_fetch(&mut self, outcome: FetchOutcome) -> bool {
        match self.view {
            View::Fetching { request, .. } if request == outcome.request => {}
            _ => {
                log::debug!(
                    "dropping stale result for request {} (message {})",
                    outcome.request,
                    outcome.seq
                );
                return false;
            }
        }

        let text = match outcome.result {
            Ok(body) if body.found => body.text,
            Ok(_) => NO_PLAIN_TEXT.to_string(),
            Err(e) => {
                log::warn!("reading message {} failed: {e}", outcome.seq);
                format!("Could not read message {}:\n\n{e}", outcome.seq)
            }
        };
        self.show_body(outcome.seq, text);
        true
    }

    /// Give up on a fetch that has been pending for longer than `timeout`.
    pub fn check_fetch_timeout(&mut self, now: Instant, timeout: Duration) -> bool {
        let View::Fetching { seq, since, .. } = self.view else {
            return false;
        };
        if now.duration_since(since) < timeout {
            return false;
        }
        log::warn!("message {seq}: no response after {timeout:?}");
        self.show_body(
            seq,
            format!(
                "Could not read message {seq}:\n\ntimed out after {}s",
                timeout.as_secs_f32()
            ),
        );
        true
    }

    fn show_body(&mut self, seq: SeqNum, text: String) {
        self.view = View::Reading {
            seq,
            title: self.title_for(seq),
            text,
            scroll: 0,
        };
    }

    pub fn title_for(&self, seq: SeqNum) -> String {
        let subject = self
            .items
            .iter()
            .find(|m| m.seq == seq)
            .map(|m| m.subject.as_str())
            .unwrap_or("");
        format!(" #{seq} {subject} ")
    }

    pub fn scroll_body(&mut self, delta: i32) {
        if let View::Reading { scroll, .. } = &mut self.view {
            if delta < 0 {
                *scroll = scroll.saturating_sub(delta.unsigned_abs() as u16);
            } else {
                *scroll = scroll.saturating_add(delta as u16);
            }
        }
    }

    /// Adopt the offset the body pane was actually drawn with, so scrolling
    /// back up starts from what is on screen.
    pub fn settle_scroll(&mut self, applied: u16) {
        if let View::Reading { scroll, .. } = &mut self.view {
            *scroll = applied;
        }
    }

    pub fn back_to_list(&mut self) {
        self.view = View::Browsing;
    }

    pub fn terminate(&mut self) {
        self.view = View::Terminated;
    }
}
