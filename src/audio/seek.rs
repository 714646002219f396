use tokio::time::Instant;

use crate::error::PlaybackError;
use crate::models::{SeekOutcome, SeekRequest};

/// Phase the engine returns to once a seek finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    Playing,
    Paused,
}

/// A seek that has been issued and not yet resolved
#[derive(Debug, Clone)]
pub struct PendingSeek {
    pub request: SeekRequest,
    pub resume: ResumeMode,
    /// Position the clock showed when the first seek of the chain started
    pub origin: f64,
    pub started_at: Instant,
}

/// Generation-tagged bookkeeping for seeks.
///
/// At most one seek is pending. A newer seek supersedes the pending one,
/// which then completes with `did_finish = false`. Completions carrying an
/// older generation are rejected as stale.
#[derive(Debug, Default)]
pub struct SeekController {
    generation: u64,
    pending: Option<PendingSeek>,
}

impl SeekController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingSeek> {
        self.pending.as_ref()
    }

    /// Register a new seek.
    ///
    /// Returns the request to execute and, when a seek was already pending,
    /// the outcome of the superseded one. A superseding seek keeps the resume
    /// mode and origin of the chain it replaces.
    pub fn begin(
        &mut self,
        requested: f64,
        duration: Option<f64>,
        resume: ResumeMode,
        origin: f64,
        now: Instant,
    ) -> (SeekRequest, Option<SeekOutcome>) {
        self.generation += 1;
        let request = SeekRequest::clamped(requested, duration, self.generation);

        let (resume, origin, superseded) = match self.pending.take() {
            Some(previous) => (
                previous.resume,
                previous.origin,
                Some(previous.request.abandon()),
            ),
            None => (resume, origin, None),
        };

        self.pending = Some(PendingSeek {
            request: request.clone(),
            resume,
            origin,
            started_at: now,
        });

        (request, superseded)
    }

    /// Claim the pending seek for a completion of `generation`
    pub fn complete(&mut self, generation: u64) -> Result<PendingSeek, PlaybackError> {
        match self.pending.take() {
            Some(pending) if pending.request.generation == generation => Ok(pending),
            other => {
                self.pending = other;
                Err(PlaybackError::Superseded)
            }
        }
    }

    /// Drop the pending seek, returning its abandoned outcome
    pub fn cancel(&mut self) -> Option<SeekOutcome> {
        self.generation += 1;
        self.pending.take().map(|pending| pending.request.abandon())
    }
}
