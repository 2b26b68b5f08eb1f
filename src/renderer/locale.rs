use serde::Deserialize;

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

const PERSIAN_WEEKDAYS: [(&str, &str); 7] = [
    ("Saturday", "شنبه"),
    ("Sunday", "یکشنبه"),
    ("Monday", "دوشنبه"),
    ("Tuesday", "سه‌شنبه"),
    ("Wednesday", "چهارشنبه"),
    ("Thursday", "پنجشنبه"),
    ("Friday", "جمعه"),
];

/// Display language for header text.
///
/// Localization is deliberately shallow: digits are swapped one-to-one and
/// weekday names come from a fixed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fa,
    En,
}

impl Locale {
    /// Replace ASCII digits with the locale's digit glyphs.
    pub fn localize_digits(self, s: &str) -> String {
        match self {
            Locale::En => s.to_string(),
            Locale::Fa => s
                .chars()
                .map(|c| match c.to_digit(10) {
                    Some(d) if c.is_ascii_digit() => PERSIAN_DIGITS[d as usize],
                    _ => c,
                })
                .collect(),
        }
    }

    /// Map an English weekday name, falling back to the input when unmapped.
    pub fn weekday(self, english: &str) -> String {
        let table: &[(&str, &str)] = match self {
            Locale::En => &[],
            Locale::Fa => &PERSIAN_WEEKDAYS,
        };
        table
            .iter()
            .find(|(en, _)| *en == english)
            .map(|(_, local)| local.to_string())
            .unwrap_or_else(|| english.to_string())
    }
}
