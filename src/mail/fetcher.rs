use log::{debug, warn};

use crate::domain::email::{MessageSummary, ResolvedBody, SeqNum};
use crate::error::FetchError;
use crate::mail::decoders::subject_from_headers;
use crate::mail::mime::{ResolverConfig, resolve_plain_text};
use crate::mail::session::MailSession;

/// Default number of most recent messages listed at startup.
pub const DEFAULT_RECENT_WINDOW: u32 = 10;

/// Fetch one message and resolve its text/plain body.
///
/// Transport errors are not retried. A message without a text/plain part
/// yields `found == false`.
pub fn fetch_body<S: MailSession + ?Sized>(
    session: &mut S,
    seq: SeqNum,
    cfg: &ResolverConfig,
) -> Result<ResolvedBody, FetchError> {
    let raw = session.fetch_raw(seq)?;
    debug!("message {seq}: fetched {} bytes", raw.len());

    Ok(match resolve_plain_text(&raw, cfg)? {
        Some(part) => ResolvedBody::found(part.text()),
        None => {
            debug!("message {seq}: no text/plain part");
            ResolvedBody::not_found()
        }
    })
}

/// Subject of one message; empty when it cannot be fetched or parsed.
pub fn fetch_header<S: MailSession + ?Sized>(session: &mut S, seq: SeqNum) -> String {
    match session.fetch_header(seq) {
        Ok(raw) => subject_from_headers(&raw),
        Err(e) => {
            warn!("message {seq}: header fetch failed: {e}");
            String::new()
        }
    }
}

/// Inclusive sequence range covering the last `window` messages.
pub fn recent_range(exists: u32, window: u32) -> Option<(SeqNum, SeqNum)> {
    if exists == 0 || window == 0 {
        return None;
    }
    Some((exists.saturating_sub(window) + 1, exists))
}

/// Summaries of the most recent `window` messages, oldest first.
///
/// A transport failure here is fatal to the caller; a single unreadable
/// header only costs that message its subject.
pub fn list_recent<S: MailSession + ?Sized>(
    session: &mut S,
    window: u32,
) -> Result<Vec<MessageSummary>, FetchError> {
    let Some((first, last)) = recent_range(session.message_count(), window) else {
        return Ok(vec![]);
    };

    let mut headers = session.list_headers(first, last)?;
    headers.sort_by_key(|(seq, _)| *seq);
    headers.dedup_by_key(|(seq, _)| *seq);

    let mut out = Vec::with_capacity(headers.len());
    for (seq, raw) in headers {
        // Some servers drop the header literal from bulk responses.
        let subject = if raw.is_empty() {
            fetch_header(session, seq)
        } else {
            subject_from_headers(&raw)
        };
        out.push(MessageSummary { seq, subject });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MimeError;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct FakeSession {
        messages: BTreeMap<SeqNum, Vec<u8>>,
        broken: bool,
        raw_fetches: usize,
    }

    impl FakeSession {
        fn with(messages: &[&str]) -> Self {
            Self {
                messages: messages
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (i as SeqNum + 1, m.as_bytes().to_vec()))
                    .collect(),
                ..Default::default()
            }
        }

        fn get(&self, seq: SeqNum) -> Result<&[u8], FetchError> {
            if self.broken {
                return Err(FetchError::failed("connection reset"));
            }
            self.messages
                .get(&seq)
                .map(Vec::as_slice)
                .ok_or_else(|| FetchError::failed(format!("no message {seq}")))
        }
    }

    fn header_part(raw: &[u8]) -> Vec<u8> {
        let end = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|p| p + 4)
            .unwrap_or(raw.len());
        raw[..end].to_vec()
    }

    impl MailSession for FakeSession {
        fn message_count(&self) -> u32 {
            self.messages.len() as u32
        }

        fn list_headers(
            &mut self,
            first: SeqNum,
            last: SeqNum,
        ) -> Result<Vec<(SeqNum, Vec<u8>)>, FetchError> {
            // Servers may answer out of order.
            (first..=last)
                .rev()
                .map(|seq| -> Result<(SeqNum, Vec<u8>), FetchError> {
                    Ok((seq, header_part(self.get(seq)?)))
                })
                .collect()
        }

        fn fetch_raw(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError> {
            self.raw_fetches += 1;
            self.get(seq).map(<[u8]>::to_vec)
        }

        fn fetch_header(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError> {
            self.get(seq).map(header_part)
        }
    }

    fn message(subject: &str, body: &str) -> String {
        format!("Subject: {subject}\r\nContent-Type: text/plain\r\n\r\n{body}")
    }

    #[test]
    fn test_fetch_body_found() {
        let mut session = FakeSession::with(&[&message("a", "body a")]);
        let body = fetch_body(&mut session, 1, &ResolverConfig::default()).unwrap();
        assert_eq!(body, ResolvedBody::found("body a"));
    }

    #[test]
    fn test_fetch_body_without_plain_text() {
        let html = "Subject: h\r\nContent-Type: text/html\r\n\r\n<p>x</p>";
        let mut session = FakeSession::with(&[html]);
        let body = fetch_body(&mut session, 1, &ResolverConfig::default()).unwrap();
        assert!(!body.found);
        assert_eq!(body.text, "");
    }

    #[test]
    fn test_fetch_body_errors() {
        let mut session = FakeSession::with(&["not an envelope"]);
        let err = fetch_body(&mut session, 1, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, FetchError::Mime(MimeError::MalformedEnvelope(_))));

        session.broken = true;
        let err = fetch_body(&mut session, 1, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, FetchError::FetchFailed(_)));
    }

    #[test]
    fn test_fetch_body_is_never_cached() {
        let mut session = FakeSession::with(&[&message("a", "x")]);
        fetch_body(&mut session, 1, &ResolverConfig::default()).unwrap();
        fetch_body(&mut session, 1, &ResolverConfig::default()).unwrap();
        assert_eq!(session.raw_fetches, 2);
    }

    #[test]
    fn test_fetch_header_never_fails() {
        let mut session = FakeSession::with(&[&message("Hello", "x"), "no headers at all"]);
        assert_eq!(fetch_header(&mut session, 1), "Hello");
        assert_eq!(fetch_header(&mut session, 2), "");
        assert_eq!(fetch_header(&mut session, 9), "");
    }

    #[test]
    fn test_recent_range() {
        assert_eq!(recent_range(0, 10), None);
        assert_eq!(recent_range(3, 10), Some((1, 3)));
        assert_eq!(recent_range(10, 10), Some((1, 10)));
        assert_eq!(recent_range(25, 10), Some((16, 25)));
    }

    #[test]
    fn test_list_recent_is_oldest_first() {
        let msgs: Vec<String> = (1..=12).map(|i| message(&format!("m{i}"), "x")).collect();
        let refs: Vec<&str> = msgs.iter().map(String::as_str).collect();
        let mut session = FakeSession::with(&refs);

        let listed = list_recent(&mut session, DEFAULT_RECENT_WINDOW).unwrap();
        let subjects: Vec<&str> = listed.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(listed.first().map(|s| s.seq), Some(3));
        assert_eq!(subjects.last(), Some(&"m12"));
        assert_eq!(listed.len(), 10);
    }

    #[test]
    fn test_list_recent_refetches_missing_headers() {
        struct Sparse(FakeSession);
        impl MailSession for Sparse {
            fn message_count(&self) -> u32 {
                self.0.message_count()
            }
            fn list_headers(
                &mut self,
                first: SeqNum,
                last: SeqNum,
            ) -> Result<Vec<(SeqNum, Vec<u8>)>, FetchError> {
                Ok((first..=last).map(|seq| (seq, Vec::new())).collect())
            }
            fn fetch_raw(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError> {
                self.0.fetch_raw(seq)
            }
            fn fetch_header(&mut self, seq: SeqNum) -> Result<Vec<u8>, FetchError> {
                self.0.fetch_header(seq)
            }
        }

        let mut session = Sparse(FakeSession::with(&[&message("A", "x"), &message("B", "y")]));
        let listed = list_recent(&mut session, 10).unwrap();
        assert_eq!(
            listed,
            vec![
                MessageSummary {
                    seq: 1,
                    subject: "A".into()
                },
                MessageSummary {
                    seq: 2,
                    subject: "B".into()
                },
            ]
        );
    }

    #[test]
    fn test_list_recent_empty_and_failing() {
        let mut empty = FakeSession::default();
        assert!(list_recent(&mut empty, 10).unwrap().is_empty());

        let mut broken = FakeSession::with(&[&message("a", "x")]);
        broken.broken = true;
        assert!(matches!(
            list_recent(&mut broken, 10),
            Err(FetchError::FetchFailed(_))
        ));
    }
}
