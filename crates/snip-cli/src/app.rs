use std::sync::Arc;

use crate::cli::Command;
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Serialize;
use snip_core::{Clock, MappingStore};
use snip_generator::RandomGenerator;
use snip_redirector::{MetricsReader, MetricsView, RedirectorService};
use snip_shortener::{ShortenParams, Shortener, ShortenerService};
use snip_storage::{InMemoryStore, MySqlStore};

/// Schema management for a storage backend.
#[async_trait]
pub trait Schema: Send + Sync + 'static {
    async fn migrate(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl<C: Clock> Schema for InMemoryStore<C> {
    async fn migrate(&self) -> anyhow::Result<()> {
        bail!("the in-memory backend has no schema; use --storage mysql")
    }
}

#[async_trait]
impl<C: Clock> Schema for MySqlStore<C> {
    async fn migrate(&self) -> anyhow::Result<()> {
        MySqlStore::migrate(self)
            .await
            .context("failed to apply the url_mappings schema")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub short_code: String,
    pub short_url: String,
}

/// Result of one command, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Created(Created),
    Resolved(String),
    Metrics(MetricsView),
    Migrated,
}

impl Output {
    pub fn render(&self) -> anyhow::Result<String> {
        Ok(match self {
            Output::Created(created) => serde_json::to_string_pretty(created)?,
            Output::Resolved(long_url) => long_url.clone(),
            Output::Metrics(view) => serde_json::to_string_pretty(view)?,
            Output::Migrated => "url_mappings schema is up to date".to_string(),
        })
    }
}

/// Wires the services over one shared store.
pub struct App<S> {
    store: Arc<S>,
    shortener: ShortenerService<Arc<S>, RandomGenerator>,
    redirector: RedirectorService<Arc<S>>,
    metrics: MetricsReader<Arc<S>>,
    base_url: String,
}

impl<S: MappingStore + Schema> App<S> {
    pub fn new(store: S, generator: RandomGenerator, base_url: impl Into<String>) -> Self {
        let store = Arc::new(store);
        Self {
            shortener: ShortenerService::new(Arc::clone(&store), generator),
            redirector: RedirectorService::new(Arc::clone(&store)),
            metrics: MetricsReader::new(Arc::clone(&store)),
            store,
            base_url: base_url.into(),
        }
    }

    pub async fn execute(&self, command: Command) -> anyhow::Result<Output> {
        match command {
            Command::Create { long_url, alias } => {
                let params = ShortenParams { long_url, alias };
                let code = self.shortener.shorten(params).await?;
                Ok(Output::Created(Created {
                    short_url: code.to_url(&self.base_url),
                    short_code: code.into_string(),
                }))
            }
            Command::Resolve { code } => Ok(Output::Resolved(self.redirector.resolve(&code).await?)),
            Command::Metrics { code } => Ok(Output::Metrics(self.metrics.get_metrics(&code).await?)),
            Command::Migrate => {
                self.store.migrate().await?;
                Ok(Output::Migrated)
            }
        }
    }
}
