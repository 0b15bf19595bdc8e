/// IMAP message sequence number (1-based).
pub type SeqNum = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub seq: SeqNum,
    pub subject: String,
}

/// Outcome of one body read. `found == false` means the message has no
/// text/plain part; `text` is empty in that case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedBody {
    pub text: String,
    pub found: bool,
}

impl ResolvedBody {
    pub fn found(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            found: true,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}
