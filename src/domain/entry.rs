use crate::canonical::CanonicalKey;

/// Where an entry was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTag {
    Channel,
    Emergency,
}

/// A configuration URI that survived canonicalization.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub uri: String,
    pub key: CanonicalKey,
    pub flag: Option<String>,
    pub source: SourceTag,
}

impl ConfigEntry {
    pub fn new(uri: impl Into<String>, key: CanonicalKey, source: SourceTag) -> Self {
        let uri = uri.into();
        let flag = flag_glyph(&decode_fragment(split_fragment(&uri).1.unwrap_or("")));
        Self {
            uri,
            key,
            flag,
            source,
        }
    }

    /// The URI up to (not including) the first `#`.
    pub fn base(&self) -> &str {
        split_fragment(&self.uri).0
    }

    /// The percent-decoded display name, empty when the URI has none.
    pub fn fragment(&self) -> String {
        split_fragment(&self.uri)
            .1
            .map(decode_fragment)
            .unwrap_or_default()
    }
}

/// Split a URI at its first `#`.
pub fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    }
}

/// Percent-decode a fragment. Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_fragment(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// Find the first emoji-class glyph in `text`.
///
/// A pair of regional indicators (a country flag) is returned as one glyph,
/// and a trailing variation selector stays attached to its pictograph.
pub fn flag_glyph(text: &str) -> Option<String> {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if is_regional_indicator(c) {
            if let Some(&next) = chars.peek() {
                if is_regional_indicator(next) {
                    return Some([c, next].iter().collect());
                }
            }
            continue;
        }
        if is_pictographic(c) {
            let mut glyph = c.to_string();
            if chars.peek() == Some(&'\u{FE0F}') {
                glyph.push('\u{FE0F}');
            }
            return Some(glyph);
        }
    }
    None
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_pictographic(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1F1E5
        | 0x1F200..=0x1FAFF
        | 0x2600..=0x27BF
        | 0x2B00..=0x2BFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fragment_first_hash() {
        assert_eq!(split_fragment("ss://abc#one#two"), ("ss://abc", Some("one#two")));
        assert_eq!(split_fragment("ss://abc"), ("ss://abc", None));
    }

    #[test]
    fn test_decode_fragment_percent() {
        assert_eq!(decode_fragment("My%20Node"), "My Node");
        assert_eq!(decode_fragment("%F0%9F%87%A9%F0%9F%87%AA%20DE"), "🇩🇪 DE");
    }

    #[test]
    fn test_decode_fragment_keeps_plus() {
        assert_eq!(decode_fragment("a+b"), "a+b");
    }

    #[test]
    fn test_flag_glyph_country_pair() {
        assert_eq!(flag_glyph("Server 🇳🇱 fast"), Some("🇳🇱".to_string()));
    }

    #[test]
    fn test_flag_glyph_pictograph() {
        assert_eq!(flag_glyph("fast 🚀 node"), Some("🚀".to_string()));
        assert_eq!(flag_glyph("⚡️ boost"), Some("⚡\u{FE0F}".to_string()));
    }

    #[test]
    fn test_flag_glyph_none() {
        assert_eq!(flag_glyph("plain text 123"), None);
        assert_eq!(flag_glyph(""), None);
    }
}
