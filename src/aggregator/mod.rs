//! Merge of channel scans, the emergency feed and custom header lines.
//!
//! One [`Aggregator`] lives for one run. Its seen-set is shared by every
//! source, so the first occurrence of an endpoint wins no matter where it
//! came from; later duplicates are discarded.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::canonical::{canonicalize, CanonicalKey};
use crate::config::Config;
use crate::domain::{decode_fragment, split_fragment, Channel, ConfigEntry, SourceTag};
use crate::extractor::Extractor;
use crate::source::MessageSource;

/// Fragments that disqualify emergency feed entries.
#[derive(Debug, Clone, Default)]
pub struct EmergencyFilter {
    /// Checked against the feed's first entry only.
    pub excluded_glyphs: Vec<String>,
    /// Checked against every entry.
    pub excluded_phrases: Vec<String>,
}

impl EmergencyFilter {
    fn excludes(&self, index: usize, fragment: &str) -> bool {
        (index == 0 && self.excluded_glyphs.iter().any(|g| fragment.contains(g.as_str())))
            || self
                .excluded_phrases
                .iter()
                .any(|p| fragment.contains(p.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct AggregatePolicy {
    /// Trailing window measured back from the start of aggregation.
    pub window: Duration,
    /// Offer emergency entries before scanning channels.
    pub emergency_first: bool,
    pub filter: EmergencyFilter,
}

impl Default for AggregatePolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            emergency_first: false,
            filter: EmergencyFilter::default(),
        }
    }
}

impl AggregatePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window: config.scan.window(),
            emergency_first: config.emergency.process_first,
            filter: EmergencyFilter {
                excluded_glyphs: config.emergency.excluded_glyphs.clone(),
                excluded_phrases: config.emergency.excluded_phrases.clone(),
            },
        }
    }
}

/// Unique entries in first-seen order, split by block.
#[derive(Debug, Clone, Default)]
pub struct OrderedEntries {
    pub custom: Vec<String>,
    pub emergency: Vec<ConfigEntry>,
    pub regular: Vec<ConfigEntry>,
}

impl OrderedEntries {
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty() && self.emergency.is_empty() && self.regular.is_empty()
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub entries: OrderedEntries,
    pub channels_scanned: usize,
    pub channels_failed: usize,
    /// Candidates dropped because their endpoint was already seen.
    pub duplicates: usize,
    /// Candidates dropped because they have no identity.
    pub unparsed: usize,
}

pub struct Aggregator<'a> {
    extractor: &'a Extractor,
    policy: &'a AggregatePolicy,
    seen: HashSet<CanonicalKey>,
    custom_seen: HashSet<String>,
    result: Aggregation,
}

impl<'a> Aggregator<'a> {
    pub fn new(extractor: &'a Extractor, policy: &'a AggregatePolicy) -> Self {
        Self {
            extractor,
            policy,
            seen: HashSet::new(),
            custom_seen: HashSet::new(),
            result: Aggregation::default(),
        }
    }

    /// Run the whole merge: channels and emergency feed in policy order,
    /// then custom header lines.
    pub async fn aggregate<S: MessageSource + ?Sized>(
        mut self,
        source: &S,
        emergency_entries: &[String],
        custom_header_lines: &[String],
        now: DateTime<Utc>,
    ) -> Aggregation {
        // A window reaching past the earliest representable time scans everything.
        let cutoff = now
            .checked_sub_signed(self.policy.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        if self.policy.emergency_first {
            self.add_emergency(emergency_entries);
            self.scan_channels(source, cutoff).await;
        } else {
            self.scan_channels(source, cutoff).await;
            self.add_emergency(emergency_entries);
        }
        self.add_custom(custom_header_lines);

        self.finish()
    }

    /// Offer one candidate URI. Returns true when it was new and kept.
    pub fn offer(&mut self, uri: &str, source: SourceTag) -> bool {
        let Some(key) = canonicalize(uri) else {
            self.result.unparsed += 1;
            return false;
        };

        if self.seen.contains(&key) {
            debug!("Duplicate {} from {:?}", key.fingerprint(), source);
            self.result.duplicates += 1;
            return false;
        }
        self.seen.insert(key.clone());

        let entry = ConfigEntry::new(uri, key, source);
        match source {
            SourceTag::Channel => self.result.entries.regular.push(entry),
            SourceTag::Emergency => self.result.entries.emergency.push(entry),
        }
        true
    }

    /// Extract and offer every candidate in a message text.
    pub fn scan_text(&mut self, text: &str) -> usize {
        let extractor = self.extractor;
        extractor
            .extract(text)
            .filter(|candidate| self.offer(candidate, SourceTag::Channel))
            .count()
    }

    /// Visit eligible channels one after another.
    pub async fn scan_channels<S: MessageSource + ?Sized>(
        &mut self,
        source: &S,
        cutoff: DateTime<Utc>,
    ) {
        let channels = match source.channels().await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Could not list channels from {}: {}", source.name(), e);
                return;
            }
        };

        for channel in channels.iter().filter(|c| c.is_eligible(cutoff)) {
            self.result.channels_scanned += 1;
            info!("Scanning: {}", channel.title);

            match self.scan_channel(source, channel, cutoff).await {
                Ok(found) => debug!("{} new configs from {}", found, channel.title),
                Err(e) => {
                    self.result.channels_failed += 1;
                    warn!("Error in {}: {}...", channel.title, truncate(&e.to_string(), 40));
                }
            }
        }
    }

    async fn scan_channel<S: MessageSource + ?Sized>(
        &mut self,
        source: &S,
        channel: &Channel,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let mut history = source.history(channel);
        let mut found = 0;

        while let Some(message) = history.next().await {
            let message = message?;
            if message.date < cutoff {
                break;
            }
            if let Some(text) = message.body() {
                found += self.scan_text(text);
            }
        }

        Ok(found)
    }

    /// Offer pre-extracted emergency feed entries.
    pub fn add_emergency(&mut self, entries: &[String]) -> usize {
        let mut kept = 0;
        for (index, uri) in entries.iter().enumerate() {
            let fragment = decode_fragment(split_fragment(uri).1.unwrap_or(""));
            if self.policy.filter.excludes(index, &fragment) {
                debug!("Excluded emergency entry {}", index);
                continue;
            }
            if self.offer(uri, SourceTag::Emergency) {
                kept += 1;
            }
        }
        kept
    }

    /// Add free-text announcement lines, skipping blank lines and exact repeats.
    pub fn add_custom<T: AsRef<str>>(&mut self, lines: &[T]) {
        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() || !self.custom_seen.insert(line.to_string()) {
                continue;
            }
            self.result.entries.custom.push(line.to_string());
        }
    }

    pub fn finish(self) -> Aggregation {
        self.result
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelKind, Message};
    use crate::source::MemorySource;

    const VLESS_A: &str = "vless://user@host:443?security=tls&sni=example.com#first";
    const VLESS_B: &str = "vless://user@host:443?sni=example.com&security=tls#second";
    const TROJAN: &str = "trojan://pw@t.example:443?security=tls&sni=t.example#T";

    fn policy() -> AggregatePolicy {
        AggregatePolicy {
            filter: EmergencyFilter {
                excluded_glyphs: vec!["ℹ️".into()],
                excluded_phrases: vec!["Expire".into()],
            },
            ..Default::default()
        }
    }

    fn uris(entries: &[ConfigEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.uri.as_str()).collect()
    }

    #[tokio::test]
    async fn test_dedup_across_channels() {
        let now = Utc::now();
        let source = MemorySource::new("test")
            .with_channel("one", vec![Message::new(now, format!("get it: {}", VLESS_A))])
            .with_channel("two", vec![Message::new(now, VLESS_B)]);
        let extractor = Extractor::new();
        let policy = policy();

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[], &[], now)
            .await;

        assert_eq!(result.channels_scanned, 2);
        assert_eq!(uris(&result.entries.regular), vec![VLESS_A]);
        assert_eq!(result.duplicates, 1);
    }

    #[tokio::test]
    async fn test_cutoff_boundary_and_halt() {
        let now = Utc::now();
        let cutoff = now - Duration::hours(24);
        // The stream would fail after both messages; halting at the stale
        // message means the failure is never reached.
        let source = MemorySource::new("test").with_failing_channel(
            "edge",
            vec![
                Message::new(cutoff, VLESS_A),
                Message::new(cutoff - Duration::seconds(1), TROJAN),
            ],
            2,
        );
        let extractor = Extractor::new();
        let policy = policy();

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[], &[], now)
            .await;

        assert_eq!(uris(&result.entries.regular), vec![VLESS_A]);
        assert_eq!(result.channels_failed, 0);
    }

    #[tokio::test]
    async fn test_ineligible_channels_skipped() {
        let now = Utc::now();
        let source = MemorySource::new("test")
            .with_chat("group", ChannelKind::Group, vec![Message::new(now, TROJAN)])
            .with_channel(
                "stale",
                vec![Message::new(now - Duration::hours(25), VLESS_A)],
            );
        let extractor = Extractor::new();
        let policy = policy();

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[], &[], now)
            .await;

        assert_eq!(result.channels_scanned, 0);
        assert!(result.entries.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_vmess_does_not_abort() {
        let now = Utc::now();
        let text = format!("vmess://AAAA broken\n{}", TROJAN);
        let source = MemorySource::new("test").with_channel("mixed", vec![Message::new(now, text)]);
        let extractor = Extractor::new();
        let policy = policy();

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[], &[], now)
            .await;

        assert_eq!(uris(&result.entries.regular), vec![TROJAN]);
        assert_eq!(result.unparsed, 1);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_stop_scan() {
        let now = Utc::now();
        let source = MemorySource::new("test")
            .with_failing_channel("flaky", vec![Message::new(now, VLESS_A)], 1)
            .with_channel("steady", vec![Message::new(now, TROJAN)]);
        let extractor = Extractor::new();
        let policy = policy();

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[], &[], now)
            .await;

        assert_eq!(result.channels_scanned, 2);
        assert_eq!(result.channels_failed, 1);
        // Configs read before the failure are kept
        assert_eq!(uris(&result.entries.regular), vec![VLESS_A, TROJAN]);
    }

    #[tokio::test]
    async fn test_channel_wins_over_emergency_by_default() {
        let now = Utc::now();
        let source = MemorySource::new("test").with_channel("one", vec![Message::new(now, VLESS_A)]);
        let extractor = Extractor::new();
        let policy = policy();

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[VLESS_B.to_string()], &[], now)
            .await;

        assert_eq!(uris(&result.entries.regular), vec![VLESS_A]);
        assert!(result.entries.emergency.is_empty());
    }

    #[tokio::test]
    async fn test_emergency_first_wins() {
        let now = Utc::now();
        let source = MemorySource::new("test").with_channel("one", vec![Message::new(now, VLESS_A)]);
        let extractor = Extractor::new();
        let policy = AggregatePolicy {
            emergency_first: true,
            ..policy()
        };

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[VLESS_B.to_string()], &[], now)
            .await;

        assert!(result.entries.regular.is_empty());
        assert_eq!(uris(&result.entries.emergency), vec![VLESS_B]);
        assert_eq!(result.entries.emergency[0].source, SourceTag::Emergency);
    }

    #[tokio::test]
    async fn test_oversized_window_scans_everything() {
        let now = Utc::now();
        let source = MemorySource::new("test").with_channel(
            "archive",
            vec![Message::new(DateTime::<Utc>::MIN_UTC, TROJAN)],
        );
        let extractor = Extractor::new();
        let policy = AggregatePolicy {
            window: Duration::MAX,
            ..policy()
        };

        let result = Aggregator::new(&extractor, &policy)
            .aggregate(&source, &[], &[], now)
            .await;

        assert_eq!(result.channels_scanned, 1);
        assert_eq!(uris(&result.entries.regular), vec![TROJAN]);
    }

    #[test]
    fn test_emergency_exclusions() {
        let extractor = Extractor::new();
        let policy = policy();
        let mut aggregator = Aggregator::new(&extractor, &policy);

        let feed = vec![
            "vless://info@0.0.0.0:1#%E2%84%B9%EF%B8%8F%20Channel%20info".to_string(),
            "trojan://a@h:1#%E2%84%B9%EF%B8%8F%20kept%20later".to_string(),
            "trojan://b@h:2#Expire%3A%202025".to_string(),
            "trojan://c@h:3#plain".to_string(),
        ];
        assert_eq!(aggregator.add_emergency(&feed), 2);

        let result = aggregator.finish();
        assert_eq!(
            uris(&result.entries.emergency),
            vec![feed[1].as_str(), feed[3].as_str()]
        );
    }

    #[test]
    fn test_custom_lines_deduplicated() {
        let extractor = Extractor::new();
        let policy = policy();
        let mut aggregator = Aggregator::new(&extractor, &policy);

        aggregator.add_custom(&[
            "Maintenance tonight",
            "",
            "   ",
            "Maintenance tonight",
            "Maintenance tonight ",
        ]);
        let result = aggregator.finish();
        // Only exact repeats collapse
        assert_eq!(
            result.entries.custom,
            vec!["Maintenance tonight", "Maintenance tonight "]
        );
        assert!(!result.entries.is_empty());
    }

    #[test]
    fn test_scan_text_idempotent() {
        let extractor = Extractor::new();
        let policy = policy();
        let text = format!("{} {} {}\n{}", VLESS_A, TROJAN, VLESS_B, TROJAN);

        let run = || {
            let mut aggregator = Aggregator::new(&extractor, &policy);
            aggregator.scan_text(&text);
            aggregator
                .finish()
                .entries
                .regular
                .into_iter()
                .map(|e| e.uri)
                .collect::<Vec<_>>()
        };

        let first = run();
        assert_eq!(first, vec![VLESS_A.to_string(), TROJAN.to_string()]);
        assert_eq!(first, run());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("ساعت ساعت", 4), "ساعت");
        assert_eq!(truncate("short", 40), "short");
    }
}
