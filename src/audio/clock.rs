use std::time::Duration;

use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

use crate::models::PlaybackClock;

/// Playback position derived from an anchor instead of sampled updates.
///
/// While running, the position is `anchor + elapsed * rate`, capped at the
/// duration when one is known. The value is `Copy` so a reading can be taken
/// from a snapshot without access to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackTimer {
    /// Position at the anchor instant
    position: f64,
    /// Set while the clock is running
    anchored_at: Option<Instant>,
    rate: f32,
    duration: Option<f64>,
}

impl PlaybackTimer {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            anchored_at: None,
            rate: 1.0,
            duration: None,
        }
    }

    /// Back to zero with no known duration
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Attach the resolved length; non-finite or negative values count as unknown
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration.filter(|d| d.is_finite() && *d >= 0.0);
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.anchored_at.is_some()
    }

    /// Start (or re-anchor) the clock at `rate`
    pub fn start(&mut self, now: Instant, rate: f32) {
        self.position = self.position_at(now);
        self.anchored_at = Some(now);
        self.rate = rate;
    }

    /// Freeze the clock at its current position
    pub fn pause(&mut self, now: Instant) {
        self.position = self.position_at(now);
        self.anchored_at = None;
    }

    /// Jump to `seconds`, keeping the running/paused mode
    pub fn seek(&mut self, now: Instant, seconds: f64) {
        self.position = self.cap(seconds.max(0.0));
        if self.anchored_at.is_some() {
            self.anchored_at = Some(now);
        }
    }

    /// Stop at the end of the item
    pub fn finish(&mut self) {
        if let Some(duration) = self.duration {
            self.position = duration;
        }
        self.anchored_at = None;
    }

    pub fn position_at(&self, now: Instant) -> f64 {
        match self.anchored_at {
            Some(anchor) => {
                let elapsed = now.saturating_duration_since(anchor).as_secs_f64();
                self.cap(self.position + elapsed * f64::from(self.rate))
            }
            None => self.position,
        }
    }

    /// Rate the position advances at; 0.0 while stopped
    pub fn effective_rate(&self) -> f32 {
        if self.is_running() {
            self.rate
        } else {
            0.0
        }
    }

    /// Time left until the end of the item at the current rate.
    ///
    /// `None` while stopped, when the duration is unknown, or when the
    /// remaining time does not fit in a `Duration`.
    pub fn time_until_end(&self, now: Instant) -> Option<Duration> {
        let duration = self.duration?;
        if !self.is_running() || self.rate <= 0.0 {
            return None;
        }
        let remaining = (duration - self.position_at(now)).max(0.0) / f64::from(self.rate);
        Duration::try_from_secs_f64(remaining).ok()
    }

    /// Instant the item ends at the current rate, `None` if it never does
    pub fn end_deadline(&self, now: Instant) -> Option<Instant> {
        now.checked_add(self.time_until_end(now)?)
    }

    pub fn reading(&self, now: Instant) -> PlaybackClock {
        PlaybackClock {
            current_time: self.position_at(now),
            duration: self.duration,
            rate: self.effective_rate(),
        }
    }

    fn cap(&self, seconds: f64) -> f64 {
        match self.duration {
            Some(duration) => seconds.min(duration),
            None => seconds,
        }
    }
}

impl Default for PlaybackTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic trigger for `seconds_elapsed` samples.
///
/// Only fires while active; re-activating restarts the period so the first
/// sample comes one full interval after playback resumes.
pub struct SampleReporter {
    ticker: Interval,
    active: bool,
}

impl SampleReporter {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            ticker,
            active: false,
        }
    }

    pub fn resume(&mut self) {
        self.ticker.reset();
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Wait for the next sample; pends forever while stopped
    pub async fn tick(&mut self) {
        if !self.active {
            std::future::pending::<()>().await;
        }
        self.ticker.tick().await;
    }
}

/// Resolves at `deadline`, or never when there is none
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_timer_creation() {
        let timer = PlaybackTimer::new();
        let now = Instant::now();

        assert_eq!(timer.position_at(now), 0.0);
        assert_eq!(timer.duration(), None);
        assert_eq!(timer.effective_rate(), 0.0);
        assert!(!timer.is_running());
        assert_eq!(timer.time_until_end(now), None);
    }

    #[test]
    fn test_position_advances_with_rate() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(100.0));
        timer.start(start, 2.0);

        assert!((timer.position_at(start + secs(5)) - 10.0).abs() < 1e-9);
        assert_eq!(timer.effective_rate(), 2.0);
    }

    #[test]
    fn test_position_is_capped_at_duration() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(10.0));
        timer.start(start, 1.0);

        assert_eq!(timer.position_at(start + secs(60)), 10.0);
    }

    #[test]
    fn test_unknown_duration_is_unbounded() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(f64::NAN));
        assert_eq!(timer.duration(), None);

        timer.start(start, 1.0);
        assert_eq!(timer.position_at(start + secs(600)), 600.0);
        assert_eq!(timer.time_until_end(start), None);
    }

    #[test]
    fn test_pause_freezes_position() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(180.0));
        timer.start(start, 1.0);

        timer.pause(start + secs(10));
        assert!(!timer.is_running());
        assert_eq!(timer.position_at(start + secs(50)), 10.0);

        // Resuming continues from the paused position
        timer.start(start + secs(50), 1.0);
        assert_eq!(timer.position_at(start + secs(52)), 12.0);
    }

    #[test]
    fn test_rate_change_reanchors() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(180.0));
        timer.start(start, 1.0);

        timer.start(start + secs(10), 2.0);
        assert_eq!(timer.position_at(start + secs(15)), 20.0);
    }

    #[test]
    fn test_seek_keeps_mode() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(100.0));

        timer.seek(start, 40.0);
        assert!(!timer.is_running());
        assert_eq!(timer.position_at(start + secs(5)), 40.0);

        timer.start(start, 1.0);
        timer.seek(start + secs(3), 80.0);
        assert_eq!(timer.position_at(start + secs(8)), 85.0);

        timer.seek(start + secs(8), 500.0);
        assert_eq!(timer.position_at(start + secs(8)), 100.0);
    }

    #[test]
    fn test_time_until_end() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(120.0));
        assert_eq!(timer.time_until_end(start), None);

        timer.start(start, 1.0);
        assert_eq!(timer.time_until_end(start), Some(secs(120)));
        assert_eq!(timer.time_until_end(start + secs(20)), Some(secs(100)));
        assert_eq!(timer.time_until_end(start + secs(500)), Some(Duration::ZERO));

        timer.start(start, 2.0);
        assert_eq!(timer.time_until_end(start), Some(secs(60)));
    }

    #[test]
    fn test_unrepresentable_end_has_no_deadline() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();

        timer.set_duration(Some(1e20));
        timer.start(start, 1.0);
        assert_eq!(timer.time_until_end(start), None);
        assert_eq!(timer.end_deadline(start), None);

        timer.set_duration(Some(100.0));
        timer.start(start, 1e-30);
        assert_eq!(timer.end_deadline(start), None);
        assert!(timer.position_at(start + secs(3_600)) < 1e-20);
    }

    #[test]
    fn test_end_deadline() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(30.0));
        assert_eq!(timer.end_deadline(start), None);

        timer.start(start, 2.0);
        assert_eq!(timer.end_deadline(start), Some(start + secs(15)));

        timer.set_duration(Some(0.0));
        assert_eq!(timer.end_deadline(start), Some(start));
    }

    #[test]
    fn test_finish_and_reset() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(30.0));
        timer.start(start, 1.0);

        timer.finish();
        assert!(!timer.is_running());
        assert_eq!(timer.position_at(start + secs(100)), 30.0);

        timer.reset();
        assert_eq!(timer, PlaybackTimer::new());
    }

    #[test]
    fn test_reading() {
        let start = Instant::now();
        let mut timer = PlaybackTimer::new();
        timer.set_duration(Some(200.0));
        timer.start(start, 1.5);

        let reading = timer.reading(start + secs(10));
        assert_eq!(reading.current_time, 15.0);
        assert_eq!(reading.duration, Some(200.0));
        assert_eq!(reading.rate, 1.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_only_ticks_while_active() {
        let mut reporter = SampleReporter::new(Duration::from_millis(500));
        assert!(!reporter.is_active());

        let idle = tokio::time::timeout(secs(5), reporter.tick()).await;
        assert!(idle.is_err());

        reporter.resume();
        let started = Instant::now();
        reporter.tick().await;
        assert!(started.elapsed() >= Duration::from_millis(500));

        reporter.stop();
        assert!(tokio::time::timeout(secs(5), reporter.tick()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_reporter_is_pending() {
        let mut reporter = SampleReporter::new(Duration::from_millis(100));
        tokio::time::advance(Duration::from_secs(1)).await;

        let mut tick = tokio_test::task::spawn(reporter.tick());
        tokio_test::assert_pending!(tick.poll());
        tokio_test::assert_pending!(tick.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until() {
        let started = Instant::now();
        wait_until(Some(started + secs(3))).await;
        assert!(started.elapsed() >= secs(3));

        assert!(tokio::time::timeout(secs(60), wait_until(None)).await.is_err());
    }
}
