use crate::error::{Result, ShortenerError};
use crate::settings::ShortenerSettings;
use crate::shortener::{ShortenParams, Shortener};
use async_trait::async_trait;
use snip_core::{
    Clock, MappingStore, ShortCode, StorageError, SystemClock, UrlMapping, MAX_URL_LENGTH,
};
use snip_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// A concrete implementation of the [`Shortener`] trait.
///
/// Uniqueness of codes is enforced by the store's conditional create. A
/// caller-chosen alias gets exactly one attempt; generated codes are retried
/// on collision up to `settings.max_retries` times.
#[derive(Debug, Clone)]
pub struct ShortenerService<S, G, C = SystemClock> {
    store: Arc<S>,
    generator: Arc<G>,
    clock: C,
    settings: ShortenerSettings,
}

impl<S: MappingStore, G: Generator> ShortenerService<S, G> {
    pub fn new(store: S, generator: G) -> Self {
        Self::with_settings(store, generator, ShortenerSettings::default())
    }

    pub fn with_settings(store: S, generator: G, settings: ShortenerSettings) -> Self {
        Self {
            store: Arc::new(store),
            generator: Arc::new(generator),
            clock: SystemClock,
            settings,
        }
    }
}

impl<S: MappingStore, G: Generator, C: Clock> ShortenerService<S, G, C> {
    /// Replaces the clock used to stamp new mappings.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ShortenerService<S, G, C2> {
        ShortenerService {
            store: self.store,
            generator: self.generator,
            clock,
            settings: self.settings,
        }
    }

    pub fn settings(&self) -> &ShortenerSettings {
        &self.settings
    }

    /// Accepts absolute `http`/`https` URLs with a host, up to [`MAX_URL_LENGTH`] characters.
    fn validate_url(long_url: &str) -> Result<()> {
        if long_url.is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        let length = long_url.chars().count();
        if length > MAX_URL_LENGTH {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must be at most {MAX_URL_LENGTH} characters, got {length}"
            )));
        }

        let parsed = Url::parse(long_url)
            .map_err(|e| ShortenerError::InvalidUrl(format!("{long_url}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                parsed.scheme()
            )));
        }

        match parsed.host_str() {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(ShortenerError::InvalidUrl(format!(
                "URL must have a host: {long_url}"
            ))),
        }
    }

    fn mapping(&self, code: ShortCode, long_url: &str) -> UrlMapping {
        UrlMapping::new(
            code,
            long_url,
            self.clock.now(),
            self.settings.expiry_window,
        )
    }

    async fn claim_alias(&self, code: ShortCode, long_url: &str) -> Result<ShortCode> {
        match self.store.create(self.mapping(code.clone(), long_url)).await {
            Ok(()) => {
                info!(code = %code, "created mapping with custom alias");
                Ok(code)
            }
            Err(StorageError::Conflict(_)) => {
                debug!(code = %code, "custom alias is taken");
                Err(ShortenerError::AliasConflict(code.into_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn claim_generated(&self, long_url: &str) -> Result<ShortCode> {
        let attempts = self.settings.max_retries;

        for attempt in 1..=attempts {
            let code: ShortCode = self.generator.generate().into();

            match self.store.create(self.mapping(code.clone(), long_url)).await {
                Ok(()) => {
                    info!(code = %code, attempt, "created mapping");
                    return Ok(code);
                }
                Err(StorageError::Conflict(_)) => {
                    debug!(code = %code, attempt, "generated code collided, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(attempts, "no free short code found");
        Err(ShortenerError::AliasSpaceExhausted { attempts })
    }
}

#[async_trait]
impl<S: MappingStore, G: Generator, C: Clock> Shortener for ShortenerService<S, G, C> {
    async fn shorten(&self, params: ShortenParams) -> Result<ShortCode> {
        Self::validate_url(&params.long_url)?;

        match params.alias {
            Some(alias) => {
                let code = ShortCode::new(alias)?;
                self.claim_alias(code, &params.long_url).await
            }
            None => self.claim_generated(&params.long_url).await,
        }
    }
}
