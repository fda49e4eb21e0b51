//! Key templates: embedding an identity value in an external store key.
//!
//! A template is a pattern with exactly one placeholder, e.g. `host:$`. The
//! text before the placeholder is the prefix, the text after it the suffix.
//!
//! Decoding is a textual strip, not a pattern match: the first occurrence of
//! the prefix is removed, then the first occurrence of the suffix in what
//! remains. Keys already in storage depend on exactly this behaviour, so an
//! identity that itself contains the prefix or suffix text may not decode
//! back to itself.

use crate::error::{SchemaError, SchemaResult};

/// Placeholder used when no other is configured.
pub const DEFAULT_PLACEHOLDER: char = '$';

/// A compiled key pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyTemplate {
    prefix: String,
    suffix: String,
    placeholder: char,
}

impl KeyTemplate {
    /// Compile a pattern using [`DEFAULT_PLACEHOLDER`].
    pub fn parse(pattern: &str) -> SchemaResult<Self> {
        Self::parse_with(pattern, DEFAULT_PLACEHOLDER)
    }

    /// Compile a pattern with an explicit placeholder character.
    ///
    /// The placeholder must occur exactly once.
    pub fn parse_with(pattern: &str, placeholder: char) -> SchemaResult<Self> {
        let occurrences = pattern.matches(placeholder).count();
        if occurrences != 1 {
            return Err(SchemaError::InvalidKeyTemplate {
                pattern: pattern.to_string(),
                placeholder,
                occurrences,
            });
        }
        let (prefix, rest) = pattern
            .split_once(placeholder)
            .ok_or_else(|| SchemaError::InvalidKeyTemplate {
                pattern: pattern.to_string(),
                placeholder,
                occurrences: 0,
            })?;
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: rest.to_string(),
            placeholder,
        })
    }

    /// The template that maps an identity to itself.
    pub fn identity() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    /// The source pattern (`prefix + placeholder + suffix`).
    pub fn pattern(&self) -> String {
        let capacity = self.prefix.len() + self.suffix.len() + self.placeholder.len_utf8();
        let mut pattern = String::with_capacity(capacity);
        pattern.push_str(&self.prefix);
        pattern.push(self.placeholder);
        pattern.push_str(&self.suffix);
        pattern
    }

    /// Wrap an identity value into an external key.
    pub fn encode(&self, identity: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + identity.len() + self.suffix.len());
        key.push_str(&self.prefix);
        key.push_str(identity);
        key.push_str(&self.suffix);
        key
    }

    /// Recover the identity value from an external key.
    pub fn decode(&self, external_key: &str) -> String {
        let without_prefix = strip_first(external_key, &self.prefix);
        strip_first(&without_prefix, &self.suffix)
    }
}

/// Extract the identity embedded in `external_key` by a raw `pattern`.
///
/// A pattern without exactly one [`DEFAULT_PLACEHOLDER`] is rejected.
pub fn extract_key(external_key: &str, pattern: &str) -> SchemaResult<String> {
    Ok(KeyTemplate::parse(pattern)?.decode(external_key))
}

/// Remove the first occurrence of `needle`, scanning left to right.
fn strip_first(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    match haystack.find(needle) {
        Some(pos) => {
            let mut out = String::with_capacity(haystack.len() - needle.len());
            out.push_str(&haystack[..pos]);
            out.push_str(&haystack[pos + needle.len()..]);
            out
        }
        None => haystack.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extract(key: &str, pattern: &str) -> String {
        extract_key(key, pattern).unwrap()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parse_splits_around_placeholder() {
        let t = KeyTemplate::parse("uno:$:due").unwrap();
        assert_eq!(t.prefix(), "uno:");
        assert_eq!(t.suffix(), ":due");
        assert_eq!(t.pattern(), "uno:$:due");
    }

    #[test]
    fn parse_bare_placeholder() {
        let t = KeyTemplate::parse("$").unwrap();
        assert_eq!(t, KeyTemplate::identity());
    }

    #[test]
    fn parse_rejects_missing_placeholder() {
        let err = KeyTemplate::parse("host:").unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidKeyTemplate {
                pattern: "host:".into(),
                placeholder: '$',
                occurrences: 0,
            }
        );
    }

    #[test]
    fn parse_rejects_repeated_placeholder() {
        assert!(matches!(
            KeyTemplate::parse("$:$"),
            Err(SchemaError::InvalidKeyTemplate { occurrences: 2, .. })
        ));
    }

    #[test]
    fn parse_with_custom_placeholder() {
        assert!(KeyTemplate::parse_with("user/$/profile", '%').is_err());

        let t = KeyTemplate::parse_with("user/%/profile", '%').unwrap();
        assert_eq!(t.encode("42"), "user/42/profile");
        assert_eq!(t.decode("user/42/profile"), "42");
        assert_eq!(t.pattern(), "user/%/profile");
    }

    // -----------------------------------------------------------------------
    // Extraction
    // -----------------------------------------------------------------------

    #[test]
    fn extract_with_literals_on_both_sides() {
        assert_eq!(extract("uno:ciao:due", "uno:$:due"), "ciao");
    }

    #[test]
    fn extract_without_literals() {
        assert_eq!(extract("ciao", "$"), "ciao");
    }

    #[test]
    fn extract_with_one_sided_literals() {
        assert_eq!(extract("uno:ciao", "uno:$"), "ciao");
        assert_eq!(extract("ciao:due", "$:due"), "ciao");
        assert_eq!(extract("unociao", "uno$"), "ciao");
        assert_eq!(extract("ciaodue", "$due"), "ciao");
    }

    #[test]
    fn extract_mismatched_literal_is_not_fuzzy() {
        // Prefix strips once, the suffix is absent: nothing else is removed.
        assert_ne!(extract("ciao:ciao:ciao", "ciao:$due"), "ciao");
        assert_eq!(extract("ciao:ciao:ciao", "ciao:$due"), "ciao:ciao");
    }

    #[test]
    fn extract_keeps_placeholder_char_inside_identity() {
        assert_eq!(extract("uno:ci$s:due", "uno:$:due"), "ci$s");
    }

    #[test]
    fn extract_strips_first_occurrence_anywhere() {
        // The prefix need not sit at position zero.
        assert_eq!(extract("xhost:abc", "host:$"), "xabc");
    }

    #[test]
    fn extract_rejects_invalid_pattern() {
        assert!(extract_key("abc", "no-placeholder").is_err());
    }

    #[test]
    fn identity_overlapping_suffix_is_ambiguous() {
        let t = KeyTemplate::parse("$:tail").unwrap();
        let key = t.encode("a:tailb");
        assert_eq!(key, "a:tailb:tail");
        assert_eq!(t.decode(&key), "ab:tail");
    }

    // -----------------------------------------------------------------------
    // Round trip
    // -----------------------------------------------------------------------

    #[test]
    fn encode_then_decode() {
        for pattern in ["$", "uno:$:due", "uno$", "$due"] {
            let t = KeyTemplate::parse(pattern).unwrap();
            assert_eq!(t.decode(&t.encode("ciao")), "ciao", "pattern {pattern}");
        }
    }

    proptest! {
        #[test]
        fn roundtrip_when_identity_avoids_literals(identity in "[a-z0-9.\\-]{0,24}") {
            let t = KeyTemplate::parse("host:$:key").unwrap();
            prop_assert_eq!(t.decode(&t.encode(&identity)), identity);
        }
    }
}
