use std::sync::{Arc, Weak};

use log::trace;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::PlaybackError;
use crate::models::PlayerState;

/// Notifications produced by the engine, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(PlayerState),
    ItemDidComplete,
    SecondsElapsed(f64),
    FailedWithError(Option<PlaybackError>),
    SeekCompleted { seconds: f64, did_finish: bool },
}

impl EngineEvent {
    /// Invoke the observer callback matching this event
    pub fn deliver_to(&self, observer: &dyn PlayerObserver) {
        match self {
            EngineEvent::StateChanged(state) => observer.player_did_change_state(state),
            EngineEvent::ItemDidComplete => observer.item_did_complete(),
            EngineEvent::SecondsElapsed(seconds) => observer.seconds_elapsed(*seconds),
            EngineEvent::FailedWithError(error) => observer.failed_with_error(error.as_ref()),
            EngineEvent::SeekCompleted { seconds, did_finish } => {
                observer.seek_completed(*seconds, *did_finish)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::StateChanged(_) => "state_changed",
            EngineEvent::ItemDidComplete => "item_did_complete",
            EngineEvent::SecondsElapsed(_) => "seconds_elapsed",
            EngineEvent::FailedWithError(_) => "failed_with_error",
            EngineEvent::SeekCompleted { .. } => "seek_completed",
        }
    }
}

/// Receiver of engine notifications.
///
/// Callbacks run on the delivery task, one at a time and in emission order.
/// The engine only keeps a weak reference: dropping the observer stops
/// delivery without unregistering.
pub trait PlayerObserver: Send + Sync {
    fn player_did_change_state(&self, _state: &PlayerState) {}

    fn item_did_complete(&self) {}

    fn seconds_elapsed(&self, _seconds: f64) {}

    fn failed_with_error(&self, _error: Option<&PlaybackError>) {}

    fn seek_completed(&self, _seconds: f64, _did_finish: bool) {}
}

/// Observer that forwards every event into a channel
pub struct ChannelObserver {
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }

    fn forward(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}

impl PlayerObserver for ChannelObserver {
    fn player_did_change_state(&self, state: &PlayerState) {
        self.forward(EngineEvent::StateChanged(state.clone()));
    }

    fn item_did_complete(&self) {
        self.forward(EngineEvent::ItemDidComplete);
    }

    fn seconds_elapsed(&self, seconds: f64) {
        self.forward(EngineEvent::SecondsElapsed(seconds));
    }

    fn failed_with_error(&self, error: Option<&PlaybackError>) {
        self.forward(EngineEvent::FailedWithError(error.cloned()));
    }

    fn seek_completed(&self, seconds: f64, did_finish: bool) {
        self.forward(EngineEvent::SeekCompleted { seconds, did_finish });
    }
}

enum Delivery {
    Register(Option<Weak<dyn PlayerObserver>>),
    Event(EngineEvent),
}

/// Serializes observer callbacks onto a dedicated task.
///
/// Registration goes through the same queue as events, so an observer sees
/// exactly the events emitted after it was set.
pub struct EventDispatcher {
    queue: mpsc::UnboundedSender<Delivery>,
    task: JoinHandle<()>,
}

impl EventDispatcher {
    pub fn spawn() -> Self {
        let (queue, mut rx) = mpsc::unbounded_channel::<Delivery>();

        let task = tokio::spawn(async move {
            let mut observer: Option<Weak<dyn PlayerObserver>> = None;

            while let Some(delivery) = rx.recv().await {
                match delivery {
                    Delivery::Register(next) => observer = next,
                    Delivery::Event(event) => {
                        match observer.as_ref().and_then(Weak::upgrade) {
                            Some(target) => event.deliver_to(target.as_ref()),
                            None => trace!("No observer for {}, dropped", event.name()),
                        }
                    }
                }
            }
        });

        Self { queue, task }
    }

    pub fn set_observer(&self, observer: Option<Weak<dyn PlayerObserver>>) {
        let _ = self.queue.send(Delivery::Register(observer));
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.queue.send(Delivery::Event(event));
    }

    /// Deliver everything already queued, then stop
    pub async fn close(self) {
        let Self { queue, task } = self;
        drop(queue);
        let _ = task.await;
    }
}
