//! CRC-32C framing helpers.
//!
//! A framed line is `<record>\t<8 lowercase hex digits>` where the
//! digits are the CRC-32C (Castagnoli) of the record bytes. The suffix
//! shape alone disambiguates framed from legacy lines; no format
//! version gate is needed, because a JSON record cannot end with a raw
//! tab followed by exactly eight hex characters (tabs inside JSON
//! strings are escaped).

/// Checksum of a record's bytes.
pub fn checksum(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// The 8-digit lowercase hex trailer for a checksum.
pub fn format_hex(crc: u32) -> String {
    format!("{crc:08x}")
}

/// Outcome of checking a framed line's trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    /// Trailer present and matching.
    Valid,
    /// Trailer present but not matching the record bytes.
    Mismatch {
        /// The hex digits stored on the line.
        stored: String,
        /// The hex digits computed from the record bytes.
        computed: String,
    },
}

/// Split a log line into its record text and frame status.
///
/// Returns the record portion plus `Some(status)` when a frame trailer
/// was recognized, or the whole line and `None` for legacy lines.
pub fn split_frame(line: &str) -> (&str, Option<FrameStatus>) {
    if let Some(tab_pos) = line.rfind('\t') {
        let trailer = &line[tab_pos + 1..];
        if trailer.len() == 8 && trailer.bytes().all(|b| b.is_ascii_hexdigit()) {
            let record = &line[..tab_pos];
            let computed = format_hex(checksum(record.as_bytes()));
            let status = if trailer.eq_ignore_ascii_case(&computed) {
                FrameStatus::Valid
            } else {
                FrameStatus::Mismatch {
                    stored: trailer.to_string(),
                    computed,
                }
            };
            return (record, Some(status));
        }
    }
    (line, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_castagnoli() {
        // Known CRC-32C vector.
        assert_eq!(checksum(b"123456789"), 0xe3069283);
        assert_eq!(format_hex(checksum(b"123456789")), "e3069283");
    }

    #[test]
    fn test_split_valid_frame() {
        let record = r#"{"kind":"test"}"#;
        let line = format!("{record}\t{}", format_hex(checksum(record.as_bytes())));
        let (got, status) = split_frame(&line);
        assert_eq!(got, record);
        assert_eq!(status, Some(FrameStatus::Valid));
    }

    #[test]
    fn test_split_mismatched_frame() {
        let line = "{\"kind\":\"test\"}\t00000000";
        let (record, status) = split_frame(line);
        assert_eq!(record, "{\"kind\":\"test\"}");
        assert!(matches!(status, Some(FrameStatus::Mismatch { .. })));
    }

    #[test]
    fn test_legacy_line_passes_through() {
        let line = r#"{"kind":"legacy","seq":1}"#;
        let (record, status) = split_frame(line);
        assert_eq!(record, line);
        assert_eq!(status, None);
    }

    #[test]
    fn test_short_or_nonhex_trailer_is_not_a_frame() {
        for line in ["{\"a\":1}\tabcd", "{\"a\":1}\tzzzzzzzz", "{\"a\":1}\tdeadbeef0"] {
            let (record, status) = split_frame(line);
            assert_eq!(record, line);
            assert_eq!(status, None);
        }
    }
}
