use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::audio::{AudioManager, ChannelObserver, EngineEvent, MediaHandle, ResourceResolver};
use crate::config::EngineConfig;
use crate::error::PlaybackError;
use crate::models::PlayerState;
use crate::nowplaying::NowPlayingInfo;

/// How a scripted URL resolves
#[derive(Clone)]
pub struct Script {
    pub delay: Duration,
    pub outcome: Result<Option<f64>, PlaybackError>,
    pub seek_delay: Duration,
    pub seek_error: Option<PlaybackError>,
}

impl Script {
    pub fn ok(duration: f64) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(Some(duration)),
            seek_delay: Duration::ZERO,
            seek_error: None,
        }
    }

    pub fn unknown_duration() -> Self {
        Self {
            outcome: Ok(None),
            ..Self::ok(0.0)
        }
    }

    pub fn error(error: PlaybackError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::ok(0.0)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_seek_delay(mut self, delay: Duration) -> Self {
        self.seek_delay = delay;
        self
    }

    pub fn with_seek_error(mut self, error: PlaybackError) -> Self {
        self.seek_error = Some(error);
        self
    }
}

struct ScriptedMedia {
    duration: Option<f64>,
    seek_delay: Duration,
    seek_error: Option<PlaybackError>,
}

#[async_trait]
impl MediaHandle for ScriptedMedia {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    async fn seek(&self, _seconds: f64) -> Result<(), PlaybackError> {
        tokio::time::sleep(self.seek_delay).await;
        match &self.seek_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Resolver answering from per-URL scripts; unknown URLs are unreachable
#[derive(Default)]
pub struct ScriptedResolver {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceResolver for ScriptedResolver {
    async fn resolve(&self, url: &str) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        self.calls.lock().unwrap().push(url.to_string());
        let script = self.scripts.lock().unwrap().get(url).cloned();
        let script = match script {
            Some(script) => script,
            None => return Err(PlaybackError::ResourceUnreachable(url.to_string())),
        };

        tokio::time::sleep(script.delay).await;
        let duration = script.outcome?;
        Ok(Box::new(ScriptedMedia {
            duration,
            seek_delay: script.seek_delay,
            seek_error: script.seek_error,
        }))
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        tick_interval_ms: 500,
        load_timeout_ms: 15_000,
        play_when_ready: true,
        default_rate: 1.0,
    }
}

/// An engine with a registered channel observer and an in-process sink
pub struct Harness {
    pub manager: AudioManager,
    pub observer: Arc<ChannelObserver>,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub info: NowPlayingInfo,
}

impl Harness {
    pub fn start(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self::with_config(resolver, test_config())
    }

    pub fn with_config(resolver: Arc<dyn ResourceResolver>, config: EngineConfig) -> Self {
        let info = NowPlayingInfo::new();
        let manager = AudioManager::new(config, resolver, Box::new(info.clone())).unwrap();
        let (observer, events) = ChannelObserver::new();
        manager.set_observer(&observer).unwrap();

        Self {
            manager,
            observer,
            events,
            info,
        }
    }

    /// Every event delivered within `span` of virtual time
    pub async fn events_within(&mut self, span: Duration) -> Vec<EngineEvent> {
        let deadline = Instant::now() + span;
        let mut events = Vec::new();
        while let Ok(Some(event)) = timeout_at(deadline, self.events.recv()).await {
            events.push(event);
        }
        events
    }

    /// Events up to and including the first one matching `done`
    pub async fn events_until<F>(&mut self, done: F) -> Vec<EngineEvent>
    where
        F: Fn(&EngineEvent) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(3_600);
        let mut events = Vec::new();
        loop {
            let event = timeout_at(deadline, self.events.recv())
                .await
                .expect("expected event never arrived")
                .expect("observer channel closed");
            let finished = done(&event);
            events.push(event);
            if finished {
                return events;
            }
        }
    }

    pub async fn wait_for_state(&mut self, state: PlayerState) -> Vec<EngineEvent> {
        self.events_until(|event| *event == EngineEvent::StateChanged(state.clone()))
            .await
    }
}

/// The `StateChanged` payloads, in order
pub fn state_changes(events: &[EngineEvent]) -> Vec<PlayerState> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::StateChanged(state) => Some(state.clone()),
            _ => None,
        })
        .collect()
}

pub fn samples(events: &[EngineEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::SecondsElapsed(seconds) => Some(*seconds),
            _ => None,
        })
        .collect()
}

/// Everything except `SecondsElapsed`
pub fn without_samples(events: Vec<EngineEvent>) -> Vec<EngineEvent> {
    events
        .into_iter()
        .filter(|event| !matches!(event, EngineEvent::SecondsElapsed(_)))
        .collect()
}

/// Equal within the millisecond granularity of the timer wheel
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.005,
        "expected {}, got {}",
        expected,
        actual
    );
}
