use mailparse::MailHeaderMap;

/// Subject of a header-only fetch, with RFC 2047 encoded words decoded.
///
/// Returns an empty string when the header is absent or the block cannot be
/// parsed: one bad header must not break the listing.
pub fn subject_from_headers(raw: &[u8]) -> String {
    match mailparse::parse_headers(raw) {
        Ok((headers, _idx)) => headers
            .get_first_value("Subject")
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        Err(e) => {
            log::debug!("unparsable header block: {e}");
            String::new()
        }
    }
}
