//! Engine scenarios driven through [`AudioManager`](crate::audio::AudioManager)
//! with scripted resolvers and a paused tokio clock.

mod seek_scenarios;
mod support;
