//! # Sluice
//!
//! Collects proxy configuration links posted in chat channels, merges them
//! with an emergency subscription feed, and writes one deduplicated,
//! renamed document that clients can import as a subscription.
//!
//! ## Architecture
//!
//! ```text
//! Source → Extractor → Canonicalizer → Aggregator → Renderer
//! ```
//!
//! - [`source`]: chat backends (Telegram Desktop exports, in-memory channels)
//! - [`extractor`]: pulls `vmess://`, `vless://`, `ss://` and `trojan://` links out of text
//! - [`canonical`]: reduces a link to the identity used for deduplication
//! - [`aggregator`]: one seen-set across channels, emergency feed and custom lines
//! - [`renderer`]: numbered, localized output document
//!
//! ## Quick Start
//!
//! ```bash
//! # Scan an export and write configs.txt
//! sluice scan --source ~/Downloads/Telegram\ Desktop/result.json
//!
//! # Same, merging an emergency feed and printing to stdout
//! sluice scan -s result.json --emergency-url https://example.com/sub --stdout
//!
//! # Unique links of a plain text file
//! sluice extract notes.txt
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the fetcher,
/// extractor, aggregation policy and renderer.
pub mod app;

/// Merge of every source into ordered, deduplicated entries.
pub mod aggregator;

/// Canonical identity of a config link.
pub mod canonical;

/// Command-line interface using clap.
///
/// - `scan -s <export>` - Scan channels and write the output document
/// - `extract <file>` - Print the unique links of a text file
/// - `feed <url>` - Fetch and decode a subscription feed
pub mod cli;

/// Configuration loaded from `~/.config/sluice/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ConfigEntry`](domain::ConfigEntry): a kept link with its identity and flag
/// - [`Channel`](domain::Channel) and [`Message`](domain::Message): chat data
/// - [`ControlNotice`](domain::ControlNotice): runtime instructions posted to a control channel
pub mod domain;

/// Link extraction from free text.
pub mod extractor;

/// HTTP fetching and subscription decoding.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching a URL
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Output document rendering.
pub mod renderer;

/// Message sources.
pub mod source;
