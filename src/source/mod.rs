//! Message source adapters.
//!
//! The scanner only needs three things from a chat backend: the list of
//! channels, each channel's history newest-first, and the latest message of
//! a named channel (for the control notice). Authentication and pagination
//! belong to the adapter.
//!
//! - [`MemorySource`] - channels held in memory
//! - [`export::load`] - builds a [`MemorySource`] from Telegram Desktop JSON exports

pub mod export;
mod memory;

pub use memory::MemorySource;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::app::Result;
use crate::domain::{Channel, Message};

#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Human-readable name for this source (used in logs).
    fn name(&self) -> &str;

    async fn channels(&self) -> Result<Vec<Channel>>;

    /// Messages of `channel`, newest first. The stream may fail part way.
    fn history<'a>(&'a self, channel: &'a Channel) -> BoxStream<'a, Result<Message>>;

    /// The newest message of the channel with this id or title.
    async fn latest_message(&self, channel: &str) -> Result<Option<Message>>;
}
