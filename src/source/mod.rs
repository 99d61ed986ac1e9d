//! Source resolution with ordered mirror fallback.
//!
//! Given a canonical code, the resolver checks the local cache, then walks
//! an ordered candidate list (raw repository mirror, CDN mirror, filename
//! permutations) until one yields a parseable vector document. Each
//! candidate gets its own timeout and retry budget; one dead mirror never
//! aborts a resolution.

mod cache;
mod candidate;
mod provider;
mod retry;

pub use cache::RawCache;
pub use candidate::{CandidateKind, SourceCandidate};
pub use provider::{CandidateSource, candidates_for, default_providers};
pub use retry::RetryPolicy;

use crate::code::CharacterCode;
use crate::debug;
use crate::error::PipelineError;
use crate::log;
use std::future::Future;
use std::time::{Duration, SystemTime};
use url::Url;

/// The fetched (or cached) vector source before sanitization.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub text: String,
    /// URL of the winning candidate, or the cache path for cache hits.
    pub origin: String,
    pub kind: CandidateKind,
    pub fetched_at: SystemTime,
}

/// One candidate fetch outcome.
#[derive(Debug, Clone)]
pub enum FetchError {
    /// Timeout, connect failure, 5xx - worth retrying.
    Transient(String),
    /// Well-formed "not here" (4xx) - move to the next candidate.
    NotFound(String),
}

/// The fetch seam: the resolver is generic over this so tests can inject
/// scripted outcomes without a network.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Production fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sumi/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .text()
                .await
                .map_err(|e| FetchError::Transient(e.to_string()))
        } else if status.is_server_error() || status.as_u16() == 429 {
            Err(FetchError::Transient(format!("HTTP {status}")))
        } else {
            Err(FetchError::NotFound(format!("HTTP {status}")))
        }
    }
}

/// Validate that a payload is actually a vector document.
///
/// Mirrors have been observed returning HTML error pages with HTTP 200;
/// the payload must begin with a recognizable SVG/XML marker.
pub fn looks_like_svg(text: &str) -> bool {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    (trimmed.starts_with("<?xml")
        || trimmed.starts_with("<svg")
        || trimmed.starts_with("<!DOCTYPE svg"))
        && trimmed.contains("<svg")
}

/// Resolves codes to raw documents via cache and mirror fallback.
pub struct Resolver<F: Fetch> {
    providers: Vec<Box<dyn CandidateSource>>,
    fetcher: F,
    cache: RawCache,
    policy: RetryPolicy,
}

impl<F: Fetch> Resolver<F> {
    pub fn new(
        providers: Vec<Box<dyn CandidateSource>>,
        fetcher: F,
        cache: RawCache,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            providers,
            fetcher,
            cache,
            policy,
        }
    }

    /// Resolve a code to a raw document, cache first, then each candidate
    /// in strict priority order. Fails with `SourceExhausted` only after
    /// every candidate has been given its full retry budget.
    pub async fn resolve(&self, code: &CharacterCode) -> Result<RawDocument, PipelineError> {
        if let Some(text) = self.cache.load(code) {
            debug!("cache"; "hit for {}", code.hex4());
            let path = self.cache.path(code);
            let fetched_at = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or_else(|_| SystemTime::now());
            return Ok(RawDocument {
                text,
                origin: path.display().to_string(),
                kind: CandidateKind::LocalCache,
                fetched_at,
            });
        }

        let candidates = candidates_for(&self.providers, code);
        let mut tried = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            match self.try_candidate(code, candidate).await {
                Ok(text) => {
                    if let Err(e) = self.cache.store(code, &text) {
                        // A failed cache write costs a refetch next run, nothing more
                        log!("warning"; "cache write failed for {}: {e:#}", code.hex4());
                    }
                    return Ok(RawDocument {
                        text,
                        origin: candidate.url.to_string(),
                        kind: candidate.kind,
                        fetched_at: SystemTime::now(),
                    });
                }
                Err(reason) => {
                    debug!("fetch"; "{} candidate #{} {} failed: {}", code.hex4(), candidate.priority, candidate.url, reason);
                    tried.push(format!("{} [{}]", candidate.url, reason));
                }
            }
        }

        Err(PipelineError::SourceExhausted {
            code: code.hex4(),
            tried,
        })
    }

    /// Fetch one candidate with retries. Only transient errors are
    /// retried; a 4xx or a non-SVG payload abandons the candidate.
    async fn try_candidate(
        &self,
        code: &CharacterCode,
        candidate: &SourceCandidate,
    ) -> Result<String, String> {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            match self.fetcher.get(&candidate.url).await {
                Ok(text) => {
                    if looks_like_svg(&text) {
                        debug!("fetch"; "{} <- {} ({})", code.hex4(), candidate.url, candidate.kind);
                        return Ok(text);
                    }
                    return Err("payload is not an SVG document".to_string());
                }
                Err(FetchError::NotFound(reason)) => return Err(reason),
                Err(FetchError::Transient(reason)) => {
                    last_error = reason;
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay(attempt)).await;
                    }
                }
            }
        }

        Err(format!(
            "{} attempts failed, last: {}",
            self.policy.max_attempts, last_error
        ))
    }
}
