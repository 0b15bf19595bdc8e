//! RFC822 header/body framing and multipart splitting over borrowed bytes.

use std::collections::BTreeMap;

use mailparse::{MailHeader, MailHeaderMap};

use crate::error::MimeError;

/// One message or MIME part: parsed headers plus the untouched body bytes.
pub struct Envelope<'a> {
    raw: &'a [u8],
    headers: Vec<MailHeader<'a>>,
    body: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self, MimeError> {
        let body_start = header_block_end(raw)?;
        let (headers, _) = mailparse::parse_headers(&raw[..body_start])
            .map_err(|e| MimeError::MalformedEnvelope(e.to_string()))?;

        Ok(Self {
            raw,
            headers,
            body: &raw[body_start..],
        })
    }

    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Unfolded value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get_first_value(name)
    }

    /// `Content-Type` of this part; `text/plain` when the header is absent.
    pub fn content_type(&self) -> ContentType {
        match self.header("Content-Type") {
            Some(value) => ContentType::parse(&value),
            None => ContentType::text_plain(),
        }
    }

    pub fn transfer_encoding(&self) -> Option<String> {
        self.header("Content-Transfer-Encoding")
            .map(|v| v.trim().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype`.
    pub mime_type: String,
    /// Parameters keyed by lowercased name.
    pub params: BTreeMap<String, String>,
}

impl ContentType {
    pub fn text_plain() -> Self {
        Self {
            mime_type: "text/plain".to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn parse(value: &str) -> Self {
        let parsed = mailparse::parse_content_type(value);
        Self {
            mime_type: parsed.mimetype.trim().to_ascii_lowercase(),
            params: parsed
                .params
                .into_iter()
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
                .collect(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type.starts_with("multipart/")
    }

    pub fn is_text_plain(&self) -> bool {
        self.mime_type == "text/plain"
    }

    pub fn boundary(&self) -> Option<&str> {
        self.params
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }
}

/// Returns the offset where the body starts (just past the blank line).
///
/// Folded continuation lines are accepted; any other header line must be
/// `name: value` with a non-empty name. Input that ends right after its
/// header lines has an empty body.
fn header_block_end(raw: &[u8]) -> Result<usize, MimeError> {
    if raw.is_empty() {
        return Err(MimeError::MalformedEnvelope("empty message".into()));
    }

    let mut pos = 0;
    while pos < raw.len() {
        let (line_end, next) = match raw[pos..].iter().position(|&b| b == b'\n') {
            Some(nl) => (pos + nl, pos + nl + 1),
            None => (raw.len(), raw.len()),
        };
        let line = trim_cr(&raw[pos..line_end]);

        if line.is_empty() {
            return Ok(next);
        }

        if line[0] == b' ' || line[0] == b'\t' {
            if pos == 0 {
                return Err(MimeError::MalformedEnvelope(
                    "continuation line before the first header".into(),
                ));
            }
        } else {
            match line.iter().position(|&b| b == b':') {
                Some(colon) if colon > 0 && !line[..colon].iter().any(u8::is_ascii_whitespace) => {}
                _ => {
                    return Err(MimeError::MalformedEnvelope(format!(
                        "bad header line: {:?}",
                        String::from_utf8_lossy(line)
                    )));
                }
            }
        }
        pos = next;
    }

    Ok(raw.len())
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

enum Delimiter {
    Open,
    Close,
}

fn classify_line(line: &[u8], delimiter: &[u8]) -> Option<Delimiter> {
    let rest = line.strip_prefix(delimiter)?;
    // Transport padding after the delimiter is allowed.
    let is_padding = |s: &[u8]| s.iter().all(|&b| b == b' ' || b == b'\t');

    if let Some(after) = rest.strip_prefix(b"--")
        && is_padding(after)
    {
        return Some(Delimiter::Close);
    }
    if is_padding(rest) {
        Some(Delimiter::Open)
    } else {
        None
    }
}

/// Splits a multipart body into its parts, in order.
///
/// The preamble and the epilogue are dropped, and the line break in front of
/// each delimiter is not part of the preceding part. A body that ends before
/// the close delimiter keeps its last part up to the end of input.
pub fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>, MimeError> {
    let mut delimiter = b"--".to_vec();
    delimiter.extend_from_slice(boundary.as_bytes());

    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut seen_delimiter = false;
    let mut closed = false;
    let mut pos = 0;

    while pos < body.len() {
        let (line_end, next) = match body[pos..].iter().position(|&b| b == b'\n') {
            Some(nl) => (pos + nl, pos + nl + 1),
            None => (body.len(), body.len()),
        };
        let line = trim_cr(&body[pos..line_end]);

        if let Some(kind) = classify_line(line, &delimiter) {
            seen_delimiter = true;
            if let Some(start) = part_start.take() {
                parts.push(&body[start..strip_line_break(body, start, pos)]);
            }
            match kind {
                Delimiter::Open => part_start = Some(next),
                Delimiter::Close => {
                    closed = true;
                    break;
                }
            }
        }
        pos = next;
    }

    if !seen_delimiter {
        return Err(MimeError::MalformedEnvelope(format!(
            "no \"--{boundary}\" delimiter in multipart body"
        )));
    }

    if !closed
        && let Some(start) = part_start
    {
        log::debug!("multipart body ended without close delimiter for {boundary:?}");
        parts.push(&body[start..]);
    }

    Ok(parts)
}

/// End offset of a part that is followed by a delimiter line at `end`.
fn strip_line_break(body: &[u8], start: usize, mut end: usize) -> usize {
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_headers_and_body() {
        let raw = b"Subject: hi\r\nContent-Type: text/plain\r\n\r\nline one\r\nline two\r\n";
        let env = Envelope::parse(raw).unwrap();
        assert_eq!(env.header("subject").as_deref(), Some("hi"));
        assert_eq!(env.body(), b"line one\r\nline two\r\n");
    }

    #[test]
    fn test_folded_header_is_unfolded() {
        let raw = b"Content-Type: multipart/mixed;\r\n\tboundary=\"abc\"\r\n\r\nbody";
        let env = Envelope::parse(raw).unwrap();
        let ct = env.content_type();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("abc"));
    }

    #[test]
    fn test_missing_content_type_defaults_to_text_plain() {
        let env = Envelope::parse(b"From: a@example.com\n\nhello").unwrap();
        assert_eq!(env.content_type(), ContentType::text_plain());
    }

    #[test]
    fn test_empty_header_block() {
        let env = Envelope::parse(b"\r\njust a body").unwrap();
        assert_eq!(env.body(), b"just a body");
        assert!(env.content_type().is_text_plain());
    }

    #[test]
    fn test_headers_without_body() {
        let env = Envelope::parse(b"Subject: x\r\nContent-Type: text/plain\r\n").unwrap();
        assert_eq!(env.header("subject").as_deref(), Some("x"));
        assert!(env.content_type().is_text_plain());
        assert_eq!(env.body(), b"");

        let env = Envelope::parse(b"Content-Type: text/html").unwrap();
        assert_eq!(env.content_type().mime_type, "text/html");
        assert_eq!(env.body(), b"");
    }

    #[test]
    fn test_content_type_params_case_insensitive() {
        let ct = ContentType::parse("Multipart/Alternative; BOUNDARY=\"XyZ\"");
        assert_eq!(ct.mime_type, "multipart/alternative");
        assert_eq!(ct.boundary(), Some("XyZ"));
    }

    #[test]
    fn test_malformed_envelopes() {
        let cases: [&[u8]; 4] = [
            b"",
            b"Subject: fine\r\nnot a header\r\n",
            b"this is not a header\r\n\r\nbody",
            b" leading continuation\r\n\r\nbody",
        ];
        for raw in cases {
            assert!(
                matches!(Envelope::parse(raw), Err(MimeError::MalformedEnvelope(_))),
                "expected malformed: {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_split_multipart_drops_preamble_and_epilogue() {
        let body = b"preamble\r\n--b1\r\nA\r\n--b1\r\nB\r\nB2\r\n--b1--\r\nepilogue\r\n";
        let parts = split_multipart(body, "b1").unwrap();
        assert_eq!(parts, vec![&b"A"[..], &b"B\r\nB2"[..]]);
    }

    #[test]
    fn test_split_multipart_ignores_longer_boundary_lookalikes() {
        let body = b"--b1\nkeep --b1 inline\n--b1x not a delimiter\n--b1--\n";
        let parts = split_multipart(body, "b1").unwrap();
        assert_eq!(parts, vec![&b"keep --b1 inline\n--b1x not a delimiter"[..]]);
    }

    #[test]
    fn test_split_multipart_without_close_delimiter() {
        let parts = split_multipart(b"--b\r\nonly\r\n", "b").unwrap();
        assert_eq!(parts, vec![&b"only\r\n"[..]]);
    }

    #[test]
    fn test_split_multipart_without_any_delimiter() {
        let err = split_multipart(b"no parts here\r\n", "b").unwrap_err();
        assert!(matches!(err, MimeError::MalformedEnvelope(_)));
    }
}
