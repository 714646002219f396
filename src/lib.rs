pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod nowplaying;

pub use audio::{
    AudioManager, ChannelObserver, EngineEvent, MediaHandle, PlayerObserver, ResourceResolver,
};
pub use error::*;
pub use models::*;
pub use nowplaying::{MetadataSink, NowPlayingInfo};
