use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{MediaHandle, ResourceResolver};
use crate::error::PlaybackError;

/// A syntactically valid source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUrl {
    /// `file://` URL or plain path
    File(PathBuf),
    /// Any other `scheme://rest` URL; the scheme is lowercased
    Remote { scheme: String, url: String },
}

impl SourceUrl {
    /// Check that `url` can be handed to a resolver.
    ///
    /// Plain paths may contain spaces; `scheme://` URLs may not.
    pub fn parse(url: &str) -> Result<Self, PlaybackError> {
        if url.trim().is_empty() {
            return Err(PlaybackError::source_invalid(url, "empty URL"));
        }
        if url.chars().any(char::is_control) {
            return Err(PlaybackError::source_invalid(url, "contains control characters"));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Ok(SourceUrl::File(PathBuf::from(url)));
        };

        let valid_scheme = scheme
            .chars()
            .next()
            .map_or(false, |first| first.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(PlaybackError::source_invalid(url, "malformed scheme"));
        }
        if rest.is_empty() {
            return Err(PlaybackError::source_invalid(url, "nothing after the scheme"));
        }
        if url.chars().any(char::is_whitespace) {
            return Err(PlaybackError::source_invalid(url, "contains whitespace"));
        }

        let scheme = scheme.to_ascii_lowercase();
        if scheme == "file" {
            Ok(SourceUrl::File(PathBuf::from(rest)))
        } else {
            Ok(SourceUrl::Remote {
                scheme,
                url: url.to_string(),
            })
        }
    }
}

/// Outcome of one resolution attempt, tagged with its load generation
pub struct LoadResult {
    pub generation: u64,
    pub url: String,
    pub result: Result<Box<dyn MediaHandle>, PlaybackError>,
    pub took: Duration,
}

/// Runs resource resolution off the engine task.
///
/// Each `start` bumps the generation and aborts the previous attempt, so at
/// most one resolution is in flight and results of older generations are
/// refused by [`LoadPipeline::accept`].
pub struct LoadPipeline {
    resolver: Arc<dyn ResourceResolver>,
    timeout: Duration,
    results: mpsc::UnboundedSender<LoadResult>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl LoadPipeline {
    pub fn new(
        resolver: Arc<dyn ResourceResolver>,
        timeout: Duration,
        results: mpsc::UnboundedSender<LoadResult>,
    ) -> Self {
        Self {
            resolver,
            timeout,
            results,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Spawn resolution of `url` under the load timeout
    pub fn start(&mut self, url: &str) -> u64 {
        self.cancel();

        let generation = self.generation;
        let resolver = Arc::clone(&self.resolver);
        let timeout = self.timeout;
        let results = self.results.clone();
        let url = url.to_string();

        self.in_flight = Some(tokio::spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, resolver.resolve(&url)).await {
                Ok(result) => result,
                Err(_) => Err(PlaybackError::ResourceUnreachable(format!(
                    "no response within {} ms",
                    timeout.as_millis()
                ))),
            };
            // The engine may be gone already
            let _ = results.send(LoadResult {
                generation,
                url,
                result,
                took: started.elapsed(),
            });
        }));

        generation
    }

    /// Abort the attempt in flight; anything it already sent becomes stale
    pub fn cancel(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.generation += 1;
    }

    /// Claim a result for the current load
    pub fn accept(&mut self, generation: u64) -> Result<(), PlaybackError> {
        if generation != self.generation || self.in_flight.is_none() {
            return Err(PlaybackError::Superseded);
        }
        self.in_flight = None;
        Ok(())
    }
}

impl Drop for LoadPipeline {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
