use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PlaybackError;

/// One playable media resource and its display metadata.
///
/// Fields are private so an item cannot change after it has been handed to
/// the engine; build it with [`AudioItem::new`] and the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioItem {
    audio_url: String,
    artist: Option<String>,
    title: Option<String>,
    album_title: Option<String>,
}

impl AudioItem {
    pub fn new(audio_url: impl Into<String>) -> Self {
        Self {
            audio_url: audio_url.into(),
            artist: None,
            title: None,
            album_title: None,
        }
    }

    /// Create an item with all display metadata at once
    pub fn with_metadata(
        audio_url: impl Into<String>,
        artist: Option<String>,
        title: Option<String>,
        album_title: Option<String>,
    ) -> Self {
        Self {
            audio_url: audio_url.into(),
            artist,
            title,
            album_title,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_album_title(mut self, album_title: impl Into<String>) -> Self {
        self.album_title = Some(album_title.into());
        self
    }

    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn album_title(&self) -> Option<&str> {
        self.album_title.as_deref()
    }

    /// Get the display name for this item (title or last URL segment)
    pub fn display_name(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            self.audio_url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        })
    }

    /// Get the artist name or "Unknown Artist"
    pub fn artist_name(&self) -> String {
        self.artist
            .clone()
            .unwrap_or_else(|| "Unknown Artist".to_string())
    }
}

/// Lifecycle phase of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Loading,
    Ready,
    /// Playing at the given rate (1.0 is normal speed)
    Playing(f32),
    Paused,
    Seeking,
    Completed,
    Failed(PlaybackError),
}

impl PlayerState {
    /// Get a human-readable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Loading => "Loading",
            PlayerState::Ready => "Ready",
            PlayerState::Playing(_) => "Playing",
            PlayerState::Paused => "Paused",
            PlayerState::Seeking => "Seeking",
            PlayerState::Completed => "Completed",
            PlayerState::Failed(_) => "Failed",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerState::Playing(_))
    }

    /// Completed and Failed can only be left through a new load
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerState::Completed | PlayerState::Failed(_))
    }

    /// States in which a resolved resource is attached and seeking is allowed
    pub fn accepts_seek(&self) -> bool {
        matches!(
            self,
            PlayerState::Ready
                | PlayerState::Playing(_)
                | PlayerState::Paused
                | PlayerState::Seeking
        )
    }

    /// Same phase, ignoring the rate carried by `Playing`
    pub fn same_phase(&self, other: &PlayerState) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Playing(rate) if (*rate - 1.0).abs() > f32::EPSILON => {
                write!(f, "Playing ({:.2}x)", rate)
            }
            PlayerState::Failed(error) => write!(f, "Failed ({})", error),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Point-in-time reading of the playback clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackClock {
    /// Seconds from the start of the item, never negative
    pub current_time: f64,
    /// `None` until the resource has been resolved and reports a length
    pub duration: Option<f64>,
    /// Effective rate; 0.0 when not playing
    pub rate: f32,
}

impl PlaybackClock {
    pub fn zero() -> Self {
        Self {
            current_time: 0.0,
            duration: None,
            rate: 0.0,
        }
    }

    /// Duration in seconds, 0 while unknown
    pub fn duration_or_zero(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    /// Get progress as a fraction (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(duration) if duration > 0.0 => (self.current_time / duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.duration_or_zero() - self.current_time).max(0.0)
    }

    /// Format position as MM:SS
    pub fn position_formatted(&self) -> String {
        format_seconds(self.current_time)
    }

    /// Format duration as MM:SS
    pub fn duration_formatted(&self) -> String {
        format_seconds(self.duration_or_zero())
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::zero()
    }
}

fn format_seconds(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// A position change in flight.
///
/// The completion signal is produced by consuming the request, so each
/// request reports exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekRequest {
    pub target: f64,
    pub generation: u64,
}

impl SeekRequest {
    /// Build a request whose target is clamped to `[0, duration]`.
    ///
    /// With an unknown duration only the lower bound applies.
    pub fn clamped(requested: f64, duration: Option<f64>, generation: u64) -> Self {
        let lower = if requested.is_nan() { 0.0 } else { requested.max(0.0) };
        let target = match duration {
            Some(duration) => lower.min(duration.max(0.0)),
            None if lower.is_finite() => lower,
            None => 0.0,
        };
        Self { target, generation }
    }

    pub fn finish(self) -> SeekOutcome {
        SeekOutcome {
            seconds: self.target,
            did_finish: true,
        }
    }

    pub fn abandon(self) -> SeekOutcome {
        SeekOutcome {
            seconds: self.target,
            did_finish: false,
        }
    }
}

/// Completion signal of a [`SeekRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekOutcome {
    pub seconds: f64,
    pub did_finish: bool,
}
