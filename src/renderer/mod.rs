//! Output document rendering.
//!
//! Every line of the document is itself a configuration URI. Informational
//! lines (headers, announcements, separators) reuse a non-functional carrier
//! endpoint so that clients importing the document show them as named
//! entries.

mod locale;

pub use locale::Locale;

use chrono::{DateTime, Offset, Utc};

use crate::aggregator::OrderedEntries;
use crate::config::{EmergencyConfig, RenderConfig};
use crate::domain::split_fragment;

/// Rendered output, block by block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDocument {
    pub header: Vec<String>,
    pub custom: Vec<String>,
    pub emergency: Vec<String>,
    pub regular: Vec<String>,
    pub separator: String,
}

impl OutputDocument {
    /// All lines in output order.
    ///
    /// A separator follows the custom block when it is non-empty, and sits
    /// between the emergency and regular blocks only when both are non-empty.
    pub fn lines(&self) -> Vec<&str> {
        let mut lines: Vec<&str> = self.header.iter().map(String::as_str).collect();

        if !self.custom.is_empty() {
            lines.extend(self.custom.iter().map(String::as_str));
            lines.push(&self.separator);
        }

        lines.extend(self.emergency.iter().map(String::as_str));
        if !self.emergency.is_empty() && !self.regular.is_empty() {
            lines.push(&self.separator);
        }

        lines.extend(self.regular.iter().map(String::as_str));
        lines
    }

    pub fn to_text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Localized date and time of a run.
#[derive(Debug, Clone)]
struct Stamp {
    weekday: String,
    date: String,
    time: String,
}

pub struct Renderer {
    config: RenderConfig,
    emergency_label: String,
    default_flag: String,
}

impl Renderer {
    pub fn new(config: RenderConfig, emergency: &EmergencyConfig) -> Self {
        Self {
            config,
            emergency_label: emergency.label.clone(),
            default_flag: emergency.default_flag.clone(),
        }
    }

    pub fn render(
        &self,
        entries: &OrderedEntries,
        channels_scanned: usize,
        now: DateTime<Utc>,
    ) -> OutputDocument {
        let stamp = self.stamp(now);
        let locale = self.config.locale;
        let carrier = split_fragment(&self.config.carrier_uri).0;
        let channels = locale.localize_digits(&channels_scanned.to_string());

        let header = self
            .config
            .header_lines
            .iter()
            .map(|template| {
                let text = substitute(
                    template,
                    &[
                        ("{weekday}", stamp.weekday.as_str()),
                        ("{time}", stamp.time.as_str()),
                        ("{date}", stamp.date.as_str()),
                        ("{channels}", channels.as_str()),
                    ],
                );
                format!("{}#{}", carrier, text)
            })
            .collect();

        let marker = &self.config.warning_marker;
        let custom = entries
            .custom
            .iter()
            .map(|line| format!("{}#{} {} {}", carrier, marker, line, marker))
            .collect();

        let emergency = entries
            .emergency
            .iter()
            .map(|entry| {
                let flag = entry.flag.as_deref().unwrap_or(&self.default_flag);
                format!(
                    "{}#EMERGENCY {} | {}",
                    entry.base(),
                    flag,
                    self.emergency_label
                )
            })
            .collect();

        let total = entries.regular.len().to_string();
        let regular = entries
            .regular
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let number = (i + 1).to_string();
                let old = entry.fragment();
                // `{old}` goes last so text inside the old name is never substituted.
                let fragment = substitute(
                    &self.config.fragment_template,
                    &[
                        ("{number}", number.as_str()),
                        ("{total}", total.as_str()),
                        ("{date}", stamp.date.as_str()),
                        ("{time}", stamp.time.as_str()),
                        ("{old}", old.as_str()),
                    ],
                );
                format!("{}#{}", entry.base(), fragment)
            })
            .collect();

        OutputDocument {
            header,
            custom,
            emergency,
            regular,
            separator: format!("{}#{}", carrier, self.config.separator),
        }
    }

    fn stamp(&self, now: DateTime<Utc>) -> Stamp {
        // Out-of-range offsets are rejected when the config is loaded.
        let offset = self.config.offset().unwrap_or_else(|| Utc.fix());
        let local = now.with_timezone(&offset);
        let locale = self.config.locale;

        Stamp {
            weekday: locale.weekday(&local.format("%A").to_string()),
            date: locale.localize_digits(&local.format("%Y-%m-%d").to_string()),
            time: locale.localize_digits(&local.format("%H:%M").to_string()),
        }
    }
}

/// Plain placeholder replacement; unknown placeholders stay as written.
fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}
