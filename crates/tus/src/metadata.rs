//! Parsing for the `Upload-Metadata` request header (§4.D, §6).
//!
//! Grammar: a comma-separated list of `key base64value` pairs, or a bare
//! `key` with no value. Parsing is lenient per the spec: malformed base64
//! falls back to the raw text as the value (with a warning), and a
//! duplicate key keeps the last occurrence rather than erroring.

use std::collections::HashMap;

use base64::Engine;
use tracing::warn;

/// Decoded form of an `Upload-Metadata` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct UploadMetadata(pub HashMap<String, String>);

impl UploadMetadata {
    pub(crate) fn parse(raw: &str) -> Self {
        let mut map = HashMap::new();
        for pair in raw.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, encoded) = match pair.split_once(' ') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (pair, None),
            };
            if key.is_empty() {
                continue;
            }
            let value = match encoded {
                None => String::new(),
                Some(encoded) => match base64::engine::general_purpose::STANDARD.decode(encoded) {
                    Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| {
                        warn!(key, "Upload-Metadata value is not valid UTF-8 once decoded");
                        encoded.to_string()
                    }),
                    Err(_) => {
                        warn!(key, "Upload-Metadata value is not valid base64");
                        encoded.to_string()
                    }
                },
            };
            // Last occurrence of a duplicate key wins.
            map.insert(key.to_string(), value);
        }
        Self(map)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub(crate) fn filename(&self) -> Option<&str> {
        self.get("filename")
    }

    pub(crate) fn checksum(&self) -> Option<&str> {
        self.get("checksum")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(s)
    }

    #[test]
    fn parses_single_pair() {
        let raw = format!("filename {}", b64("test.txt"));
        let meta = UploadMetadata::parse(&raw);
        assert_eq!(meta.filename(), Some("test.txt"));
    }

    #[test]
    fn parses_multiple_comma_separated_pairs() {
        let raw = format!("filename {},checksum {}", b64("pic.png"), b64("abc123"));
        let meta = UploadMetadata::parse(&raw);
        assert_eq!(meta.filename(), Some("pic.png"));
        assert_eq!(meta.checksum(), Some("abc123"));
    }

    #[test]
    fn bare_key_with_no_value_is_empty_string() {
        let meta = UploadMetadata::parse("is_confidential");
        assert_eq!(meta.get("is_confidential"), Some(""));
    }

    #[test]
    fn malformed_base64_falls_back_to_raw_text() {
        let meta = UploadMetadata::parse("filename not-valid-base64!!!");
        assert_eq!(meta.filename(), Some("not-valid-base64!!!"));
    }

    #[test]
    fn duplicate_key_keeps_last_occurrence() {
        let raw = format!("filename {},filename {}", b64("first.txt"), b64("second.txt"));
        let meta = UploadMetadata::parse(&raw);
        assert_eq!(meta.filename(), Some("second.txt"));
    }

    #[test]
    fn empty_segments_are_ignored() {
        let raw = format!("filename {},,", b64("a.txt"));
        let meta = UploadMetadata::parse(&raw);
        assert_eq!(meta.filename(), Some("a.txt"));
        assert_eq!(meta.0.len(), 1);
    }
}
