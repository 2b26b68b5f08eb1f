//! Telegram Desktop JSON export reader.
//!
//! Accepts either a single-chat export (`result.json` with `name`, `type`,
//! `id` and `messages`) or a full account export (`chats.list`). A path may
//! point at one file or at a directory of `.json` files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::app::{Result, SluiceError};
use crate::domain::{ChannelKind, Message};
use crate::source::MemorySource;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Account { chats: ChatList },
    Single(ChatExport),
}

#[derive(Debug, Deserialize)]
struct ChatList {
    list: Vec<ChatExport>,
}

#[derive(Debug, Deserialize)]
struct ChatExport {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    messages: Vec<ExportMessage>,
}

#[derive(Debug, Deserialize)]
struct ExportMessage {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    date_unixtime: Option<String>,
    #[serde(default)]
    text: Option<ExportText>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportText {
    Plain(String),
    Rich(Vec<TextPart>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextPart {
    Plain(String),
    Entity { text: String },
}

impl ExportText {
    fn flatten(self) -> String {
        match self {
            ExportText::Plain(s) => s,
            ExportText::Rich(parts) => parts
                .into_iter()
                .map(|part| match part {
                    TextPart::Plain(s) => s,
                    TextPart::Entity { text } => text,
                })
                .collect(),
        }
    }
}

impl ExportMessage {
    fn into_message(self) -> Option<Message> {
        if self.kind.as_deref().is_some_and(|k| k != "message") {
            return None;
        }
        let date = self
            .date_unixtime
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.date.as_deref().and_then(parse_datetime))?;

        Some(Message {
            date,
            text: self.text.map(ExportText::flatten),
            caption: self.caption,
        })
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn chat_kind(kind: &str) -> ChannelKind {
    match kind {
        "public_channel" | "private_channel" | "channel" => ChannelKind::Channel,
        "private_group" | "public_supergroup" | "private_supergroup" | "group" | "supergroup" => {
            ChannelKind::Group
        }
        _ => ChannelKind::Private,
    }
}

fn push_chat(source: &mut MemorySource, chat: ChatExport) {
    let id = match &chat.id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    let title = chat.name.unwrap_or_else(|| format!("chat-{}", id));
    let id = if id.is_empty() { title.clone() } else { id };
    let messages: Vec<Message> = chat
        .messages
        .into_iter()
        .filter_map(ExportMessage::into_message)
        .collect();

    source.push(&id, &title, chat_kind(&chat.kind), messages, None);
}

/// Parse the content of one export file into `source`.
pub fn parse_export(source: &mut MemorySource, content: &str) -> Result<usize> {
    let file: ExportFile = serde_json::from_str(content)?;
    let chats = match file {
        ExportFile::Account { chats } => chats.list,
        ExportFile::Single(chat) => vec![chat],
    };
    let count = chats.len();
    for chat in chats {
        push_chat(source, chat);
    }
    Ok(count)
}

/// Collect export files: the path itself, or the `.json` files of a directory.
fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(SluiceError::Source(format!(
            "export path does not exist: {}",
            path.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();

    // Sort for deterministic channel order
    files.sort();
    Ok(files)
}

/// Load every export under `path` into one [`MemorySource`].
///
/// A file that cannot be read or parsed is logged and skipped.
pub fn load(path: impl AsRef<Path>) -> Result<MemorySource> {
    let path = path.as_ref();
    let mut source = MemorySource::new(format!("export:{}", path.display()));

    for file in collect_files(path)? {
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skipping export {}: {}", file.display(), e);
                continue;
            }
        };
        match parse_export(&mut source, &content) {
            Ok(count) => tracing::debug!("Loaded {} chats from {}", count, file.display()),
            Err(e) => tracing::warn!("Skipping export {}: {}", file.display(), e),
        }
    }

    tracing::info!("Loaded {} chats from {}", source.len(), path.display());
    Ok(source)
}
