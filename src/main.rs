use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sluice::app::AppContext;
use sluice::cli::commands::{self, ScanOptions};
use sluice::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            source,
            output,
            stdout,
            emergency_url,
            headers,
        } => {
            let opts = ScanOptions {
                source,
                output,
                stdout,
                emergency_url,
                headers,
            };
            commands::scan(&ctx, &opts).await?;
        }
        Commands::Extract { path } => {
            commands::extract_file(&ctx, &path)?;
        }
        Commands::Feed { url } => {
            commands::show_feed(&ctx, &url).await?;
        }
    }

    Ok(())
}
