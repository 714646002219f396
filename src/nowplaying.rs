//! System "now playing" metadata published by the engine.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::models::AudioItem;

/// One key/value pair of now-playing metadata
#[derive(Debug, Clone, PartialEq)]
pub enum NowPlayingProperty {
    Artist(Option<String>),
    Title(Option<String>),
    AlbumTitle(Option<String>),
    /// Seconds, 0 while unknown
    Duration(f64),
    ElapsedPlaybackTime(f64),
    PlaybackRate(f64),
}

impl NowPlayingProperty {
    pub fn key(&self) -> &'static str {
        match self {
            NowPlayingProperty::Artist(_) => "artist",
            NowPlayingProperty::Title(_) => "title",
            NowPlayingProperty::AlbumTitle(_) => "album_title",
            NowPlayingProperty::Duration(_) => "duration",
            NowPlayingProperty::ElapsedPlaybackTime(_) => "elapsed_playback_time",
            NowPlayingProperty::PlaybackRate(_) => "playback_rate",
        }
    }

    /// Display metadata of `item`
    pub fn for_item(item: &AudioItem) -> Vec<NowPlayingProperty> {
        vec![
            NowPlayingProperty::Artist(item.artist().map(str::to_string)),
            NowPlayingProperty::Title(item.title().map(str::to_string)),
            NowPlayingProperty::AlbumTitle(item.album_title().map(str::to_string)),
        ]
    }

    /// Timing values of the current playback position
    pub fn playback(elapsed: f64, duration: f64, rate: f32) -> Vec<NowPlayingProperty> {
        vec![
            NowPlayingProperty::ElapsedPlaybackTime(elapsed),
            NowPlayingProperty::Duration(duration),
            NowPlayingProperty::PlaybackRate(f64::from(rate)),
        ]
    }
}

/// Destination for now-playing metadata, called from the engine task
pub trait MetadataSink: Send {
    fn set(&mut self, values: Vec<NowPlayingProperty>);
}

/// Latest value of every now-playing key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlayingValues {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album_title: Option<String>,
    pub duration: f64,
    pub elapsed_playback_time: f64,
    pub playback_rate: f64,
    /// Number of `set` calls received
    pub updates: u64,
}

impl NowPlayingValues {
    fn apply(&mut self, property: NowPlayingProperty) {
        match property {
            NowPlayingProperty::Artist(value) => self.artist = value,
            NowPlayingProperty::Title(value) => self.title = value,
            NowPlayingProperty::AlbumTitle(value) => self.album_title = value,
            NowPlayingProperty::Duration(value) => self.duration = value,
            NowPlayingProperty::ElapsedPlaybackTime(value) => self.elapsed_playback_time = value,
            NowPlayingProperty::PlaybackRate(value) => self.playback_rate = value,
        }
    }
}

/// In-process now-playing store, shared between the engine and readers
#[derive(Debug, Clone, Default)]
pub struct NowPlayingInfo {
    inner: Arc<Mutex<NowPlayingValues>>,
}

impl NowPlayingInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> NowPlayingValues {
        match self.inner.lock() {
            Ok(values) => values.clone(),
            Err(_) => NowPlayingValues::default(),
        }
    }
}

impl MetadataSink for NowPlayingInfo {
    fn set(&mut self, values: Vec<NowPlayingProperty>) {
        if let Ok(mut current) = self.inner.lock() {
            for value in values {
                current.apply(value);
            }
            current.updates += 1;
        }
    }
}

/// Sink that only writes the values to the debug log
#[derive(Debug, Default)]
pub struct LogSink;

impl MetadataSink for LogSink {
    fn set(&mut self, values: Vec<NowPlayingProperty>) {
        for value in values {
            debug!("now playing {} = {:?}", value.key(), value);
        }
    }
}
