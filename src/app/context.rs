use std::path::Path;
use std::sync::Arc;

use crate::aggregator::AggregatePolicy;
use crate::app::error::Result;
use crate::config::Config;
use crate::extractor::Extractor;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::renderer::Renderer;

pub struct AppContext {
    pub config: Config,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub extractor: Extractor,
    pub policy: AggregatePolicy,
    pub renderer: Renderer,
}

impl AppContext {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path)?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_timeout(config.emergency.timeout())?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        let extractor = Extractor::new();
        let policy = AggregatePolicy::from_config(&config);
        let renderer = Renderer::new(config.render.clone(), &config.emergency);

        Self {
            config,
            fetcher,
            extractor,
            policy,
            renderer,
        }
    }
}
