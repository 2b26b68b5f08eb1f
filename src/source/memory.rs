use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::app::{Result, SluiceError};
use crate::domain::{Channel, ChannelKind, Message};
use crate::source::MessageSource;

struct StoredChannel {
    channel: Channel,
    /// Newest first.
    messages: Vec<Message>,
    /// Fail the history stream after this many messages.
    fail_after: Option<usize>,
}

/// Channels and their histories held in memory.
#[derive(Default)]
pub struct MemorySource {
    name: String,
    channels: Vec<StoredChannel>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
        }
    }

    /// Add a broadcast channel. Messages may be given in any order.
    pub fn with_channel(self, title: &str, messages: Vec<Message>) -> Self {
        self.with_chat(title, ChannelKind::Channel, messages)
    }

    pub fn with_chat(mut self, title: &str, kind: ChannelKind, messages: Vec<Message>) -> Self {
        self.push(title, title, kind, messages, None);
        self
    }

    /// Add a channel whose history stream errors after `fail_after` messages.
    pub fn with_failing_channel(
        mut self,
        title: &str,
        messages: Vec<Message>,
        fail_after: usize,
    ) -> Self {
        self.push(title, title, ChannelKind::Channel, messages, Some(fail_after));
        self
    }

    pub fn push(
        &mut self,
        id: &str,
        title: &str,
        kind: ChannelKind,
        mut messages: Vec<Message>,
        fail_after: Option<usize>,
    ) {
        messages.sort_by(|a, b| b.date.cmp(&a.date));
        // Ids key the history lookup and must stay unique.
        let id = if self.channels.iter().any(|c| c.channel.id == id) {
            format!("{}#{}", id, self.channels.len())
        } else {
            id.to_string()
        };
        let channel = Channel {
            id,
            title: title.to_string(),
            kind,
            top_message_at: messages.first().map(|m| m.date),
        };
        self.channels.push(StoredChannel {
            channel,
            messages,
            fail_after,
        });
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn by_id(&self, id: &str) -> Option<&StoredChannel> {
        self.channels.iter().find(|c| c.channel.id == id)
    }

    /// Lookup by id, falling back to the first channel with this title.
    fn find(&self, key: &str) -> Option<&StoredChannel> {
        self.by_id(key)
            .or_else(|| self.channels.iter().find(|c| c.channel.title == key))
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn channels(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.iter().map(|c| c.channel.clone()).collect())
    }

    fn history<'a>(&'a self, channel: &'a Channel) -> BoxStream<'a, Result<Message>> {
        let Some(stored) = self.by_id(&channel.id) else {
            let err = SluiceError::Source(format!("unknown channel: {}", channel.title));
            return stream::once(async move { Err(err) }).boxed();
        };

        let limit = stored.fail_after.unwrap_or(stored.messages.len());
        let messages = stream::iter(stored.messages.iter().take(limit).cloned().map(Ok));
        match stored.fail_after {
            Some(_) => {
                let err = SluiceError::Source(format!("history interrupted in {}", channel.title));
                messages.chain(stream::once(async move { Err(err) })).boxed()
            }
            None => messages.boxed(),
        }
    }

    async fn latest_message(&self, channel: &str) -> Result<Option<Message>> {
        Ok(self.find(channel).and_then(|c| c.messages.first().cloned()))
    }
}
