use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::aggregator::{Aggregation, Aggregator};
use crate::app::{AppContext, Result};
use crate::canonical::canonicalize;
use crate::domain::ControlNotice;
use crate::fetcher::subscription::fetch_subscription;
use crate::renderer::OutputDocument;
use crate::source::{export, MessageSource};

/// Options of the `scan` command.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub stdout: bool,
    pub emergency_url: Option<String>,
    pub headers: Vec<String>,
}

/// Result of one scan run; `document` is `None` when nothing was found.
#[derive(Debug)]
pub struct ScanReport {
    pub aggregation: Aggregation,
    pub document: Option<OutputDocument>,
}

pub async fn scan(ctx: &AppContext, opts: &ScanOptions) -> Result<()> {
    // With --stdout the document owns stdout; status goes to stderr.
    let status = |line: String| {
        if opts.stdout {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    let source = export::load(&opts.source)?;
    status(format!("Starting scan of {}...", source.name()));

    let report = run_scan(ctx, &source, opts, Utc::now()).await?;

    match &report.document {
        None => status("❌ No configs found".to_string()),
        Some(document) if opts.stdout => println!("{}", document.to_text()),
        Some(document) => {
            let path = opts.output.as_deref().unwrap_or(&ctx.config.output.path);
            write_document(path, document)?;
            status(format!("✅ Saved {} lines to {}", document.len(), path.display()));
        }
    }

    status(summary(&report.aggregation));
    Ok(())
}

fn summary(agg: &Aggregation) -> String {
    format!(
        "Scanned {} channels ({} failed): {} configs, {} emergency, {} announcements, {} duplicates, {} unparseable",
        agg.channels_scanned,
        agg.channels_failed,
        agg.entries.regular.len(),
        agg.entries.emergency.len(),
        agg.entries.custom.len(),
        agg.duplicates,
        agg.unparsed
    )
}

/// The full pipeline against an already opened message source.
pub async fn run_scan<S: MessageSource + ?Sized>(
    ctx: &AppContext,
    source: &S,
    opts: &ScanOptions,
    now: DateTime<Utc>,
) -> Result<ScanReport> {
    let notice = match ctx.config.scan.control_channel() {
        Some(channel) => read_control_notice(source, channel).await,
        None => None,
    };

    let emergency_url = opts
        .emergency_url
        .as_deref()
        .or_else(|| notice.as_ref().and_then(|n| n.emergency_url.as_deref()))
        .or_else(|| ctx.config.emergency.url());

    let emergency = match emergency_url {
        Some(url) => fetch_subscription(ctx.fetcher.as_ref(), &ctx.extractor, url).await,
        None => Vec::new(),
    };

    let mut custom = ctx.config.render.custom_headers.clone();
    custom.extend(opts.headers.iter().cloned());
    if let Some(notice) = notice {
        custom.extend(notice.headers);
    }

    let aggregation = Aggregator::new(&ctx.extractor, &ctx.policy)
        .aggregate(source, &emergency, &custom, now)
        .await;

    let document = (!aggregation.entries.is_empty()).then(|| {
        ctx.renderer
            .render(&aggregation.entries, aggregation.channels_scanned, now)
    });

    Ok(ScanReport {
        aggregation,
        document,
    })
}

async fn read_control_notice<S: MessageSource + ?Sized>(
    source: &S,
    channel: &str,
) -> Option<ControlNotice> {
    match source.latest_message(channel).await {
        Ok(message) => message
            .as_ref()
            .and_then(|m| m.body())
            .and_then(ControlNotice::parse),
        Err(e) => {
            tracing::warn!("Could not read control channel {}: {}", channel, e);
            None
        }
    }
}

fn write_document(path: &Path, document: &OutputDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document.to_text())?;
    Ok(())
}

/// Print the unique configs of a text file in first-seen order.
pub fn extract_file(ctx: &AppContext, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)?;

    let mut aggregator = Aggregator::new(&ctx.extractor, &ctx.policy);
    aggregator.scan_text(&text);
    let result = aggregator.finish();

    for entry in &result.entries.regular {
        println!("{}", entry.uri);
    }
    println!(
        "\n{} unique, {} duplicates, {} unparseable",
        result.entries.regular.len(),
        result.duplicates,
        result.unparsed
    );

    Ok(())
}

/// Fetch a subscription feed and list its entries.
pub async fn show_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let entries = fetch_subscription(ctx.fetcher.as_ref(), &ctx.extractor, url).await;

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }

    let mut valid = 0;
    for entry in &entries {
        let marker = if canonicalize(entry).is_some() {
            valid += 1;
            "✓"
        } else {
            "✗"
        };
        println!("{} {}", marker, entry);
    }
    println!("\n{} entries, {} with a usable identity", entries.len(), valid);

    Ok(())
}
