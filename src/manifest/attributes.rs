//! Attribute keys and payload chunking.
//!
//! A payload longer than the chunk size is split into numbered keys
//! (`splice.units.0`, `splice.units.1`, ...) plus a count key. Shorter
//! payloads use the single primary key.

/// Primary manifest payload key.
pub const UNITS_KEY: &str = "splice.units";
/// Number of payload chunks, present only when chunked.
pub const CHUNK_COUNT_KEY: &str = "splice.units.count";
/// Payload shape (`raw` or `compact`).
pub const MODE_KEY: &str = "splice.mode";
/// Version of the producing tool.
pub const VERSION_KEY: &str = "splice.version";
/// Minimum language level consumers need.
pub const LANGUAGE_KEY: &str = "splice.language";
/// Comma-joined namespaces the library declares.
pub const NAMESPACES_KEY: &str = "splice.namespaces";

/// Key for chunk `index`.
pub fn chunk_key(index: usize) -> String {
    format!("{}.{}", UNITS_KEY, index)
}

/// Split `payload` into pieces of at most `max_chars` characters.
pub fn split_chunks(payload: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in payload.char_indices() {
        if count == max_chars {
            chunks.push(&payload[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < payload.len() || chunks.is_empty() {
        chunks.push(&payload[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_keys() {
        assert_eq!(chunk_key(0), "splice.units.0");
        assert_eq!(chunk_key(12), "splice.units.12");
    }

    #[test]
    fn test_split_on_char_boundaries() {
        let payload = "\u{3400}\u{3401}\u{3402}\u{3403}\u{3404}7";
        let chunks = split_chunks(payload, 4);

        assert_eq!(chunks, ["\u{3400}\u{3401}\u{3402}\u{3403}", "\u{3404}7"]);
        assert_eq!(chunks.concat(), payload);
    }

    #[test]
    fn test_split_exact_and_empty() {
        assert_eq!(split_chunks("abcdef", 3), ["abc", "def"]);
        assert_eq!(split_chunks("", 3), [""]);
        assert_eq!(split_chunks("ab", 0), ["a", "b"]);
    }
}
