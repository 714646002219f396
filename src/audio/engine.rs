use std::sync::{Arc, Weak};

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::clock::{wait_until, PlaybackTimer, SampleReporter};
use super::events::{EngineEvent, EventDispatcher, PlayerObserver};
use super::loader::{LoadPipeline, LoadResult, SourceUrl};
use super::seek::{ResumeMode, SeekController};
use super::state::{is_valid_transition, StateMachine};
use super::{MediaHandle, ResourceResolver};
use crate::config::{is_valid_rate, EngineConfig};
use crate::error::{PlaybackError, PlayerError};
use crate::logging::SessionLogger;
use crate::models::{AudioItem, PlaybackClock, PlayerState};
use crate::nowplaying::{MetadataSink, NowPlayingProperty};

/// Commands accepted by the engine task
enum Command {
    Load {
        item: AudioItem,
        play_when_ready: bool,
    },
    TogglePlaying,
    Seek(f64),
    SetRate(f32),
    SetObserver(Option<Weak<dyn PlayerObserver>>),
    Shutdown,
}

/// Outcome of `MediaHandle::seek` for one seek generation
struct SeekResult {
    generation: u64,
    result: Result<(), PlaybackError>,
}

/// What the engine last published for readers on other tasks
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    pub item: Option<AudioItem>,
    pub timer: PlaybackTimer,
}

impl PlaybackSnapshot {
    /// Clock reading extrapolated to now
    pub fn clock(&self) -> PlaybackClock {
        self.timer.reading(Instant::now())
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
            item: None,
            timer: PlaybackTimer::new(),
        }
    }
}

/// Handle to a playback engine running on its own task.
///
/// Commands are queued and applied in call order; they return as soon as the
/// command is queued. Queries read the last published snapshot and never
/// wait for the engine.
pub struct AudioManager {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
    engine: JoinHandle<()>,
    logger: SessionLogger,
}

impl AudioManager {
    /// Start an engine on the current tokio runtime
    pub fn new(
        config: EngineConfig,
        resolver: Arc<dyn ResourceResolver>,
        sink: Box<dyn MetadataSink>,
    ) -> Result<Self, PlayerError> {
        config.validate()?;

        let logger = SessionLogger::new();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(PlaybackSnapshot::default());

        let engine = Engine::new(config, resolver, sink, logger.clone(), snapshot_tx);
        let engine = tokio::spawn(engine.run(command_rx));

        info!("Audio engine started");
        Ok(Self {
            commands,
            snapshot,
            engine,
            logger,
        })
    }

    /// Replace the current item and start resolving it
    pub fn load(&self, item: AudioItem, play_when_ready: bool) -> Result<(), PlayerError> {
        self.send(Command::Load {
            item,
            play_when_ready,
        })
    }

    /// Playing -> Paused, Paused or Ready -> Playing; ignored otherwise
    pub fn toggle_playing(&self) -> Result<(), PlayerError> {
        self.send(Command::TogglePlaying)
    }

    /// Move to `seconds`, clamped to the item
    pub fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
        self.send(Command::Seek(seconds))
    }

    /// Rate used the next time (or, while playing, right now) playback runs
    pub fn set_rate(&self, rate: f32) -> Result<(), PlayerError> {
        self.send(Command::SetRate(rate))
    }

    /// Register the observer; the engine only keeps a weak reference
    pub fn set_observer<O>(&self, observer: &Arc<O>) -> Result<(), PlayerError>
    where
        O: PlayerObserver + 'static,
    {
        let weak: Weak<O> = Arc::downgrade(observer);
        let weak: Weak<dyn PlayerObserver> = weak;
        self.send(Command::SetObserver(Some(weak)))
    }

    pub fn clear_observer(&self) -> Result<(), PlayerError> {
        self.send(Command::SetObserver(None))
    }

    pub fn player_state(&self) -> PlayerState {
        self.snapshot.borrow().state.clone()
    }

    pub fn current_item(&self) -> Option<AudioItem> {
        self.snapshot.borrow().item.clone()
    }

    pub fn clock(&self) -> PlaybackClock {
        self.snapshot.borrow().clock()
    }

    /// Seconds from the start of the item
    pub fn current_time(&self) -> f64 {
        self.clock().current_time
    }

    /// Length of the item in seconds, 0 while unknown
    pub fn duration(&self) -> f64 {
        self.clock().duration_or_zero()
    }

    /// Rate while playing, 0.0 otherwise
    pub fn rate(&self) -> f32 {
        self.clock().rate
    }

    /// Receiver that is notified whenever the engine publishes a new snapshot
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    pub fn session_log(&self) -> &SessionLogger {
        &self.logger
    }

    /// Stop the engine and wait until queued observer callbacks have run
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.engine.await {
            error!("Audio engine task failed: {}", e);
        }
    }

    fn send(&self, command: Command) -> Result<(), PlayerError> {
        self.commands
            .send(command)
            .map_err(|_| PlayerError::EngineStopped)
    }
}

/// The engine task. Owns every piece of mutable playback state.
struct Engine {
    config: EngineConfig,
    machine: StateMachine,
    item: Option<AudioItem>,
    media: Option<Arc<dyn MediaHandle>>,
    timer: PlaybackTimer,
    rate: f32,
    play_when_ready: bool,

    loader: LoadPipeline,
    load_results: mpsc::UnboundedReceiver<LoadResult>,
    seeks: SeekController,
    seek_task: Option<JoinHandle<()>>,
    seek_results_tx: mpsc::UnboundedSender<SeekResult>,
    seek_results: mpsc::UnboundedReceiver<SeekResult>,
    reporter: SampleReporter,

    dispatcher: EventDispatcher,
    sink: Box<dyn MetadataSink>,
    logger: SessionLogger,
    snapshot: watch::Sender<PlaybackSnapshot>,
}

impl Engine {
    fn new(
        config: EngineConfig,
        resolver: Arc<dyn ResourceResolver>,
        sink: Box<dyn MetadataSink>,
        logger: SessionLogger,
        snapshot: watch::Sender<PlaybackSnapshot>,
    ) -> Self {
        let (load_tx, load_results) = mpsc::unbounded_channel();
        let (seek_results_tx, seek_results) = mpsc::unbounded_channel();

        Self {
            machine: StateMachine::new(),
            item: None,
            media: None,
            timer: PlaybackTimer::new(),
            rate: config.default_rate,
            play_when_ready: config.play_when_ready,
            loader: LoadPipeline::new(resolver, config.load_timeout(), load_tx),
            load_results,
            seeks: SeekController::new(),
            seek_task: None,
            seek_results_tx,
            seek_results,
            reporter: SampleReporter::new(config.tick_interval()),
            dispatcher: EventDispatcher::spawn(),
            sink,
            logger,
            snapshot,
            config,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let end_of_item = self.timer.end_deadline(Instant::now());

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(result) = self.load_results.recv() => self.handle_load_result(result),
                Some(result) = self.seek_results.recv() => self.handle_seek_result(result),
                _ = wait_until(end_of_item) => self.handle_end_of_item(),
                _ = self.reporter.tick() => self.emit_sample(),
            }

            self.publish();
        }

        self.teardown().await;
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Load {
                item,
                play_when_ready,
            } => self.load(item, play_when_ready),
            Command::TogglePlaying => self.toggle_playing(),
            Command::Seek(seconds) => self.seek(seconds),
            Command::SetRate(rate) => self.set_rate(rate),
            Command::SetObserver(observer) => self.dispatcher.set_observer(observer),
            // Handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn load(&mut self, item: AudioItem, play_when_ready: bool) {
        // Anything still in flight belongs to the previous item
        self.loader.cancel();
        self.abandon_seek();
        self.reporter.stop();
        self.timer.reset();
        self.media = None;

        self.sink.set(NowPlayingProperty::for_item(&item));
        let url = item.audio_url().to_string();
        self.item = Some(item);
        self.play_when_ready = play_when_ready;

        if *self.machine.state() != PlayerState::Idle {
            self.transition(PlayerState::Idle);
        }

        if let Err(e) = SourceUrl::parse(&url) {
            self.logger.log_load_failed(self.loader.generation(), &url, &e.to_string());
            self.fail(e);
            return;
        }

        self.transition(PlayerState::Loading);
        let generation = self.loader.start(&url);
        self.logger.log_load_started(generation, &url);
    }

    fn handle_load_result(&mut self, load: LoadResult) {
        if self.loader.accept(load.generation).is_err() {
            self.logger
                .log_stale_result("load", load.generation, self.loader.generation());
            return;
        }

        match load.result {
            Ok(media) => {
                let media: Arc<dyn MediaHandle> = Arc::from(media);
                self.timer.set_duration(media.duration());
                self.media = Some(media);
                self.logger.log_load_resolved(
                    load.generation,
                    &load.url,
                    self.timer.duration(),
                    load.took,
                );

                self.transition(PlayerState::Ready);
                if self.play_when_ready {
                    self.start_playing();
                } else {
                    self.transition(PlayerState::Paused);
                }
            }
            Err(e) => {
                self.logger
                    .log_load_failed(load.generation, &load.url, &e.to_string());
                self.fail(e);
            }
        }
    }

    fn toggle_playing(&mut self) {
        match self.machine.toggle_target(self.rate) {
            Some(PlayerState::Paused) => self.pause(),
            Some(_) => self.start_playing(),
            None => {
                let state = self.machine.state().to_string();
                self.logger.log_command_rejected("toggle_playing", &state);
            }
        }
    }

    fn seek(&mut self, requested: f64) {
        let state = self.machine.state().clone();
        let media = match &self.media {
            Some(media) if state.accepts_seek() => Arc::clone(media),
            _ => {
                let rejection = PlaybackError::SeekOutOfSession {
                    state: state.to_string(),
                };
                self.logger
                    .log_command_rejected("seek", &rejection.to_string());
                return;
            }
        };

        let now = Instant::now();
        let resume = if state.is_playing() {
            ResumeMode::Playing
        } else {
            ResumeMode::Paused
        };
        let origin = self.timer.position_at(now);
        self.timer.pause(now);
        self.reporter.stop();

        let (request, superseded) =
            self.seeks
                .begin(requested, self.timer.duration(), resume, origin, now);
        if let Some(task) = self.seek_task.take() {
            task.abort();
        }
        if let Some(outcome) = superseded {
            debug!("Seek to {:.2}s superseded", outcome.seconds);
            self.dispatcher.emit(EngineEvent::SeekCompleted {
                seconds: outcome.seconds,
                did_finish: outcome.did_finish,
            });
        }

        self.transition(PlayerState::Seeking);

        let results = self.seek_results_tx.clone();
        self.seek_task = Some(tokio::spawn(async move {
            let result = media.seek(request.target).await;
            let _ = results.send(SeekResult {
                generation: request.generation,
                result,
            });
        }));
    }

    fn handle_seek_result(&mut self, seek: SeekResult) {
        let pending = match self.seeks.complete(seek.generation) {
            Ok(pending) => pending,
            Err(_) => {
                self.logger
                    .log_stale_result("seek", seek.generation, self.seeks.generation());
                return;
            }
        };
        self.seek_task = None;

        let took = pending.started_at.elapsed();
        match seek.result {
            Ok(()) => {
                let outcome = pending.request.finish();
                self.timer.seek(Instant::now(), outcome.seconds);
                self.logger
                    .log_seek_operation(pending.origin, outcome.seconds, true, took);
                self.dispatcher.emit(EngineEvent::SeekCompleted {
                    seconds: outcome.seconds,
                    did_finish: true,
                });

                match pending.resume {
                    ResumeMode::Playing => self.start_playing(),
                    ResumeMode::Paused => {
                        self.transition(PlayerState::Paused);
                    }
                }
            }
            Err(e) => {
                let outcome = pending.request.abandon();
                self.logger
                    .log_seek_operation(pending.origin, outcome.seconds, false, took);
                self.dispatcher.emit(EngineEvent::SeekCompleted {
                    seconds: outcome.seconds,
                    did_finish: false,
                });
                self.fail(e);
            }
        }
    }

    fn set_rate(&mut self, rate: f32) {
        if !is_valid_rate(rate) {
            self.logger
                .log_command_rejected("set_rate", &format!("{} is out of range", rate));
            return;
        }
        self.rate = rate;
        if self.machine.state().is_playing() {
            self.start_playing();
        }
    }

    /// Enter Playing at the current rate from Ready, Paused, Seeking or Playing
    fn start_playing(&mut self) {
        let target = PlayerState::Playing(self.rate);
        if !is_valid_transition(self.machine.state(), &target) {
            error!("Cannot start playback while {}", self.machine.state());
            return;
        }
        self.timer.start(Instant::now(), self.rate);
        self.reporter.resume();
        self.transition(target);
    }

    fn pause(&mut self) {
        self.timer.pause(Instant::now());
        self.reporter.stop();
        self.transition(PlayerState::Paused);
    }

    fn handle_end_of_item(&mut self) {
        if !self.machine.state().is_playing() {
            return;
        }
        self.timer.finish();
        self.reporter.stop();

        if self.transition(PlayerState::Completed) {
            if let Some(item) = &self.item {
                self.logger
                    .log_item_completed(item.audio_url(), self.timer.duration().unwrap_or(0.0));
            }
            self.dispatcher.emit(EngineEvent::ItemDidComplete);
        }
    }

    fn emit_sample(&mut self) {
        if !self.machine.state().is_playing() {
            self.reporter.stop();
            return;
        }
        let seconds = self.timer.position_at(Instant::now());
        self.dispatcher.emit(EngineEvent::SecondsElapsed(seconds));
    }

    /// Enter Failed and report `error`; pending work is dropped
    fn fail(&mut self, error: PlaybackError) {
        self.loader.cancel();
        self.abandon_seek();
        self.timer.pause(Instant::now());
        self.reporter.stop();

        warn!("Playback failed: {}", error);
        if self.transition(PlayerState::Failed(error.clone())) {
            self.dispatcher
                .emit(EngineEvent::FailedWithError(Some(error)));
        }
    }

    /// Complete a pending seek with `did_finish = false`
    fn abandon_seek(&mut self) {
        if let Some(task) = self.seek_task.take() {
            task.abort();
        }
        if let Some(outcome) = self.seeks.cancel() {
            self.dispatcher.emit(EngineEvent::SeekCompleted {
                seconds: outcome.seconds,
                did_finish: outcome.did_finish,
            });
        }
    }

    /// Apply a state change; returns false when the graph has no such edge
    fn transition(&mut self, to: PlayerState) -> bool {
        match self.machine.transition(to.clone()) {
            Ok(from) => {
                self.logger.log_state_changed(&from, &to);
                if from != to {
                    self.push_playback_values();
                    self.dispatcher.emit(EngineEvent::StateChanged(to));
                }
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    fn push_playback_values(&mut self) {
        let reading = self.timer.reading(Instant::now());
        self.sink.set(NowPlayingProperty::playback(
            reading.current_time,
            reading.duration_or_zero(),
            reading.rate,
        ));
    }

    fn publish(&self) {
        self.snapshot.send_replace(PlaybackSnapshot {
            state: self.machine.state().clone(),
            item: self.item.clone(),
            timer: self.timer,
        });
    }

    async fn teardown(mut self) {
        debug!(
            "Audio engine stopping (tick {} ms)",
            self.config.tick_interval_ms
        );
        self.loader.cancel();
        self.abandon_seek();
        self.reporter.stop();
        self.timer.pause(Instant::now());
        self.publish();

        let Self { dispatcher, .. } = self;
        dispatcher.close().await;
        info!("Audio engine stopped");
    }
}
