pub mod clock;
pub mod engine;
pub mod events;
pub mod loader;
pub mod resolver;
pub mod seek;
pub mod state;

#[cfg(test)]
pub mod tests;

use async_trait::async_trait;

use crate::error::PlaybackError;

pub use clock::{PlaybackTimer, SampleReporter};
pub use engine::{AudioManager, PlaybackSnapshot};
pub use events::{ChannelObserver, EngineEvent, EventDispatcher, PlayerObserver};
pub use loader::{LoadPipeline, LoadResult, SourceUrl};
pub use resolver::{FileResolver, LocalMedia, SchemeResolver};
pub use seek::{ResumeMode, SeekController};
pub use state::{StateMachine, TransitionError};

/// Turns a source URL into something the engine can play.
///
/// Implementations perform their I/O asynchronously; the engine bounds every
/// call with the configured load timeout and drops results that arrive after
/// a newer load has started.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<Box<dyn MediaHandle>, PlaybackError>;
}

/// A resolved, playable resource
#[async_trait]
pub trait MediaHandle: Send + Sync {
    /// Length in seconds, `None` when the resource cannot tell (live streams)
    fn duration(&self) -> Option<f64>;

    /// Move the read position. The target has already been clamped.
    async fn seek(&self, _seconds: f64) -> Result<(), PlaybackError> {
        Ok(())
    }
}
