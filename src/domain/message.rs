use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Channel,
    Group,
    Private,
}

/// A chat the message source can replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub kind: ChannelKind,
    /// Timestamp of the newest message, if any.
    pub top_message_at: Option<DateTime<Utc>>,
}

impl Channel {
    /// Broadcast channels whose newest message is inside the window are scanned.
    pub fn is_eligible(&self, cutoff: DateTime<Utc>) -> bool {
        self.kind == ChannelKind::Channel && self.top_message_at.is_some_and(|at| at >= cutoff)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl Message {
    pub fn new(date: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            date,
            text: Some(text.into()),
            caption: None,
        }
    }

    /// The message text, or its caption when the text is missing or empty.
    pub fn body(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.caption.as_deref())
            .filter(|t| !t.is_empty())
    }
}
