use crate::domain::email::SeqNum;
use crate::error::FetchError;

/// The IMAP operations the client needs, against an already selected
/// mailbox. Implementations are used from one thread at a time.
pub trait MailSession {
    /// Number of messages in the selected mailbox.
    fn message_count(&self) -> u32;

    /// Header blocks for the inclusive sequence range `first..=last`.
    fn list_headers(
        &mut self,
        first: SeqNum,
        last: SeqNum,
    ) -> Result<Vec<(SeqNum, Vec<u8>)>, FetchError>;

    /// Full RFC822 bytes of one message.
    fn fetch_raw(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError>;

    /// Header block of one message.
    fn fetch_header(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError>;

    fn logout(&mut self) {}
}
