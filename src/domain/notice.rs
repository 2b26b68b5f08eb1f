use serde::Deserialize;

/// Advisory settings published on the control channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControlNotice {
    /// Extra announcement lines rendered in the custom block.
    pub headers: Vec<String>,
    /// Replaces the configured emergency feed URL for this run.
    pub emergency_url: Option<String>,
}

impl ControlNotice {
    /// Parse a notice from message text.
    ///
    /// Accepts either a JSON array of header strings or an object with
    /// `headers` and `emergency_url`. Anything else yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: serde_json::Value = match serde_json::from_str(text.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Ignoring malformed control notice: {}", e);
                return None;
            }
        };

        match value {
            serde_json::Value::Array(items) => Some(Self {
                headers: items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect(),
                emergency_url: None,
            }),
            serde_json::Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| tracing::debug!("Ignoring control notice: {}", e))
                .ok(),
            _ => None,
        }
    }
}
