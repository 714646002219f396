use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::models::PlayerState;

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "AUDIO_MANAGER_LOG_LEVEL";

/// Resolution slower than this is reported as a performance warning
pub const SLOW_LOAD_THRESHOLD: Duration = Duration::from_millis(2_000);

/// Session event for logging and debugging
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: SessionEventType,
    pub duration: Option<Duration>,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventType {
    LoadStarted,
    LoadResolved,
    LoadFailed,
    StaleResultDiscarded,
    StateChanged,
    SeekOperation,
    ItemCompleted,
    CommandRejected,
    PerformanceWarning,
}

impl SessionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventType::LoadStarted => "LOAD_STARTED",
            SessionEventType::LoadResolved => "LOAD_RESOLVED",
            SessionEventType::LoadFailed => "LOAD_FAILED",
            SessionEventType::StaleResultDiscarded => "STALE_RESULT_DISCARDED",
            SessionEventType::StateChanged => "STATE_CHANGED",
            SessionEventType::SeekOperation => "SEEK_OPERATION",
            SessionEventType::ItemCompleted => "ITEM_COMPLETED",
            SessionEventType::CommandRejected => "COMMAND_REJECTED",
            SessionEventType::PerformanceWarning => "PERFORMANCE_WARNING",
        }
    }
}

/// Initialize the logging system.
///
/// The level comes from `AUDIO_MANAGER_LOG_LEVEL` (default `info`).
pub fn init() -> Result<(), log::SetLoggerError> {
    let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());

    let mut builder = env_logger::Builder::new();

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}:{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    builder.filter_level(parse_level(&log_level));
    builder.try_init()?;

    info!("Audio manager logging initialized with level: {}", log_level);
    Ok(())
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Bounded history of what happened to playback sessions, mirrored to `log`
#[derive(Clone)]
pub struct SessionLogger {
    events: Arc<Mutex<VecDeque<SessionEvent>>>,
    max_events: usize,
}

impl SessionLogger {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events,
        }
    }

    /// Record an event and forward it to the standard logger
    pub fn log_event(
        &self,
        event_type: SessionEventType,
        details: String,
        duration: Option<Duration>,
    ) {
        match event_type {
            SessionEventType::LoadStarted
            | SessionEventType::LoadResolved
            | SessionEventType::ItemCompleted => {
                info!("[{}] {}", event_type.as_str(), details);
            }
            SessionEventType::StateChanged => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            SessionEventType::SeekOperation => {
                debug!("[{}] {} (took: {:?})", event_type.as_str(), details, duration);
            }
            SessionEventType::StaleResultDiscarded => {
                trace!("[{}] {}", event_type.as_str(), details);
            }
            SessionEventType::LoadFailed | SessionEventType::CommandRejected => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            SessionEventType::PerformanceWarning => {
                warn!("[{}] {} (duration: {:?})", event_type.as_str(), details, duration);
            }
        }

        let event = SessionEvent {
            timestamp: Utc::now(),
            event_type,
            duration,
            details,
        };

        if let Ok(mut events) = self.events.lock() {
            events.push_back(event);
            while events.len() > self.max_events {
                events.pop_front();
            }
        }
    }

    pub fn log_load_started(&self, generation: u64, url: &str) {
        self.log_event(
            SessionEventType::LoadStarted,
            format!("Load #{} started: {}", generation, url),
            None,
        );
    }

    pub fn log_load_resolved(
        &self,
        generation: u64,
        url: &str,
        duration: Option<f64>,
        took: Duration,
    ) {
        let length = match duration {
            Some(seconds) => format!("{:.2}s", seconds),
            None => "unknown length".to_string(),
        };
        self.log_event(
            SessionEventType::LoadResolved,
            format!("Load #{} resolved: {} ({})", generation, url, length),
            Some(took),
        );
        if took > SLOW_LOAD_THRESHOLD {
            self.log_performance_warning("Resource resolution", took, SLOW_LOAD_THRESHOLD);
        }
    }

    pub fn log_load_failed(&self, generation: u64, url: &str, error: &str) {
        self.log_event(
            SessionEventType::LoadFailed,
            format!("Load #{} failed for '{}': {}", generation, url, error),
            None,
        );
    }

    pub fn log_stale_result(&self, what: &str, generation: u64, current: u64) {
        self.log_event(
            SessionEventType::StaleResultDiscarded,
            format!("Discarded {} result #{} (current #{})", what, generation, current),
            None,
        );
    }

    pub fn log_state_changed(&self, from: &PlayerState, to: &PlayerState) {
        self.log_event(
            SessionEventType::StateChanged,
            format!("{} -> {}", from, to),
            None,
        );
    }

    pub fn log_seek_operation(
        &self,
        from_seconds: f64,
        to_seconds: f64,
        did_finish: bool,
        took: Duration,
    ) {
        self.log_event(
            SessionEventType::SeekOperation,
            format!(
                "Seek from {:.2}s to {:.2}s ({})",
                from_seconds,
                to_seconds,
                if did_finish { "finished" } else { "abandoned" }
            ),
            Some(took),
        );
    }

    pub fn log_item_completed(&self, url: &str, duration: f64) {
        self.log_event(
            SessionEventType::ItemCompleted,
            format!("Played to end: {} ({:.2}s)", url, duration),
            None,
        );
    }

    pub fn log_command_rejected(&self, command: &str, reason: &str) {
        self.log_event(
            SessionEventType::CommandRejected,
            format!("{} rejected: {}", command, reason),
            None,
        );
    }

    pub fn log_performance_warning(
        &self,
        operation: &str,
        duration: Duration,
        threshold: Duration,
    ) {
        self.log_event(
            SessionEventType::PerformanceWarning,
            format!(
                "{} took {}ms (threshold: {}ms)",
                operation,
                duration.as_millis(),
                threshold.as_millis()
            ),
            Some(duration),
        );
    }

    /// Get recent events for debugging, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<SessionEvent> {
        match self.events.lock() {
            Ok(events) => {
                let skip = events.len().saturating_sub(count);
                events.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn clear_events(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    pub fn get_event_statistics(&self) -> EventStatistics {
        let mut stats = EventStatistics::default();
        if let Ok(events) = self.events.lock() {
            for event in events.iter() {
                match event.event_type {
                    SessionEventType::LoadStarted => stats.loads_started += 1,
                    SessionEventType::LoadFailed => stats.loads_failed += 1,
                    SessionEventType::StaleResultDiscarded => stats.stale_results += 1,
                    SessionEventType::SeekOperation => stats.seek_operations += 1,
                    SessionEventType::ItemCompleted => stats.items_completed += 1,
                    _ => {}
                }
            }
            stats.total_events = events.len();
        }
        stats
    }
}

impl Default for SessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about logged events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub loads_started: usize,
    pub loads_failed: usize,
    pub stale_results: usize,
    pub seek_operations: usize,
    pub items_completed: usize,
}

/// Timer utility for measuring operation durations
pub struct OperationTimer {
    start_time: Instant,
    operation_name: String,
}

impl OperationTimer {
    pub fn new(operation_name: impl Into<String>) -> Self {
        let operation_name = operation_name.into();
        trace!("Starting operation: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.elapsed();
        trace!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        duration
    }
}
