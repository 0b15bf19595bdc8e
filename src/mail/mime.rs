//! Locates the first text/plain leaf of a MIME message.
//!
//! The walk is depth-first and left-to-right, so in a
//! `multipart/alternative` whose plain part is listed first, the plain part
//! wins. Malformed sibling parts are skipped; a malformed top-level envelope
//! or nesting beyond [`ResolverConfig::max_depth`] aborts the walk.

use std::borrow::Cow;
use std::io::Cursor;

use log::{debug, warn};

use crate::error::MimeError;
use crate::mail::envelope::{Envelope, split_multipart};

/// Maximum multipart nesting accepted from the network.
pub const DEFAULT_MAX_DEPTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A text/plain leaf borrowed from the fetched message bytes.
#[derive(Debug, Clone)]
pub struct PlainTextPart<'a> {
    raw: &'a [u8],
    body: &'a [u8],
    transfer_encoding: Option<String>,
}

impl<'a> PlainTextPart<'a> {
    /// Body bytes exactly as they appear in the message.
    pub fn raw_body(&self) -> &'a [u8] {
        self.body
    }

    /// Body with quoted-printable or base64 transfer encoding undone.
    pub fn decoded(&self) -> Cow<'a, [u8]> {
        match self.transfer_encoding.as_deref() {
            Some("quoted-printable") | Some("base64") => {
                match mailparse::parse_mail(self.raw).and_then(|m| m.get_body_raw()) {
                    Ok(bytes) => Cow::Owned(bytes),
                    Err(e) => {
                        warn!("cannot decode text/plain body, showing it raw: {e}");
                        Cow::Borrowed(self.body)
                    }
                }
            }
            _ => Cow::Borrowed(self.body),
        }
    }

    pub fn reader(&self) -> Cursor<Cow<'a, [u8]>> {
        Cursor::new(self.decoded())
    }

    /// Decoded body as text; invalid UTF-8 is replaced, not transcoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.decoded()).into_owned()
    }
}

/// Resolve the first text/plain part of `raw`.
///
/// `Ok(None)` means the message has no text/plain leaf, which is a normal
/// outcome (HTML-only mail, attachment-only mail).
pub fn resolve_plain_text<'a>(
    raw: &'a [u8],
    cfg: &ResolverConfig,
) -> Result<Option<PlainTextPart<'a>>, MimeError> {
    resolve_node(raw, 0, cfg.max_depth)
}

fn resolve_node<'a>(
    raw: &'a [u8],
    depth: usize,
    max_depth: usize,
) -> Result<Option<PlainTextPart<'a>>, MimeError> {
    let envelope = Envelope::parse(raw)?;
    let ctype = envelope.content_type();

    if ctype.is_multipart() {
        if depth >= max_depth {
            return Err(MimeError::ExcessiveNesting { limit: max_depth });
        }
        let boundary = ctype.boundary().ok_or_else(|| {
            MimeError::MalformedEnvelope(format!("{} without boundary", ctype.mime_type))
        })?;

        for (idx, part) in split_multipart(envelope.body(), boundary)?
            .into_iter()
            .enumerate()
        {
            if part.iter().all(u8::is_ascii_whitespace) {
                debug!("skipping empty part {idx} at depth {}", depth + 1);
                continue;
            }
            match resolve_node(part, depth + 1, max_depth) {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(MimeError::MalformedEnvelope(reason)) => {
                    debug!("skipping malformed part {idx} at depth {}: {reason}", depth + 1);
                }
                Err(e) => return Err(e),
            }
        }
        return Ok(None);
    }

    if ctype.is_text_plain() {
        return Ok(Some(PlainTextPart {
            raw: envelope.raw(),
            body: envelope.body(),
            transfer_encoding: envelope.transfer_encoding(),
        }));
    }

    debug!("skipping {} leaf at depth {depth}", ctype.mime_type);
    Ok(None)
}
