//! Bounded pattern scan for configuration URIs embedded in free text.
//!
//! Each scheme has its own pattern. Patterns run independently over the
//! whole text in a fixed order (vmess, vless, ss, trojan), so one text can
//! yield matches from several of them. Nothing here validates a match; that
//! is the job of [`crate::canonical`].

use regex::Regex;

use crate::canonical::Scheme;

/// One scheme's matcher.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub scheme: Scheme,
    regex: Regex,
    /// The match only counts when followed by a space, newline, quote or end of text.
    requires_terminator: bool,
}

impl Pattern {
    fn new(scheme: Scheme, pattern: &str, requires_terminator: bool) -> Self {
        Self {
            scheme,
            regex: Regex::new(pattern).expect("scheme pattern must compile"),
            requires_terminator,
        }
    }

    fn accepts(&self, text: &str, start: usize, end: usize) -> bool {
        if self.requires_terminator
            && !matches!(text[end..].chars().next(), None | Some(' ' | '\n' | '"'))
        {
            return false;
        }
        // `ss://` also occurs inside `vless://` and `vmess://`.
        if self.scheme == Scheme::Shadowsocks
            && text[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphabetic())
        {
            return false;
        }
        true
    }
}

/// The fixed, ordered set of scheme patterns.
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<Pattern>,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternTable {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Pattern::new(Scheme::VMess, r"vmess://[a-zA-Z0-9+/=]+", false),
                Pattern::new(Scheme::VLess, r#"vless://[^ \n"]+"#, false),
                Pattern::new(
                    Scheme::Shadowsocks,
                    r"ss://[a-zA-Z0-9\-_=.@:+/#?&%]+",
                    true,
                ),
                Pattern::new(Scheme::Trojan, r#"trojan://[^ \n"]+"#, false),
            ],
        }
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    table: PatternTable,
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_table(PatternTable::new())
    }

    pub fn with_table(table: PatternTable) -> Self {
        Self { table }
    }

    /// Lazily yield candidate URIs, pattern by pattern, leftmost-first.
    pub fn extract<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.table.patterns().iter().flat_map(move |pattern| {
            pattern
                .regex
                .find_iter(text)
                .filter(move |m| pattern.accepts(text, m.start(), m.end()))
                .map(|m| m.as_str().trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\''))
                .filter(|candidate| !candidate.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<String> {
        Extractor::new().extract(text).map(String::from).collect()
    }

    #[test]
    fn test_extracts_each_scheme() {
        let text = "vmess://eyJhZGQiOiIxIn0= and vless://id@h:443?security=tls#n\n\
                    ss://YWVzOnB3@1.2.3.4:8388#x trojan://pw@h:443";
        let found = extract(text);
        assert_eq!(
            found,
            vec![
                "vmess://eyJhZGQiOiIxIn0=",
                "vless://id@h:443?security=tls#n",
                "ss://YWVzOnB3@1.2.3.4:8388#x",
                "trojan://pw@h:443",
            ]
        );
    }

    #[test]
    fn test_pattern_order_not_text_order() {
        let text = "trojan://a@b:1 vmess://QUJD";
        assert_eq!(extract(text), vec!["vmess://QUJD", "trojan://a@b:1"]);
    }

    #[test]
    fn test_vless_stops_at_quote_and_space() {
        let text = r#"config: "vless://u@h:1?x=y#name" more"#;
        assert_eq!(extract(text), vec!["vless://u@h:1?x=y#name"]);
    }

    #[test]
    fn test_vmess_stops_at_non_base64() {
        assert_eq!(extract("vmess://abc+/=!tail"), vec!["vmess://abc+/="]);
    }

    #[test]
    fn test_ss_requires_terminator() {
        assert!(extract("ss://YWVzOnB3@1.2.3.4:8388!").is_empty());
        assert_eq!(extract("ss://YWVzOnB3@1.2.3.4:8388\"").len(), 1);
        assert_eq!(extract("ss://YWVzOnB3@1.2.3.4:8388").len(), 1);
    }

    #[test]
    fn test_ss_not_matched_inside_other_schemes() {
        let found = extract("vless://aes:pw@h:1 vmess://QUJD");
        assert!(found.iter().all(|c| !c.starts_with("ss://")));
    }

    #[test]
    fn test_multiple_matches_non_overlapping() {
        let text = "trojan://a@h:1\ntrojan://b@h:2";
        assert_eq!(extract(text), vec!["trojan://a@h:1", "trojan://b@h:2"]);
    }

    #[test]
    fn test_no_matches() {
        assert!(extract("nothing to see here https://example.com").is_empty());
    }
}
