use std::io::{self, Write};

use crate::audio::AudioManager;
use crate::error::{ErrorSeverity, PlaybackError, PlayerError};
use crate::models::{AudioItem, PlaybackClock, PlayerState};
use crate::nowplaying::{NowPlayingInfo, NowPlayingValues};

/// Everything the status views show, captured at one instant
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: PlayerState,
    pub item: Option<AudioItem>,
    pub clock: PlaybackClock,
    pub now_playing: NowPlayingValues,
}

impl SessionStatus {
    pub fn capture(manager: &AudioManager, info: &NowPlayingInfo) -> Self {
        Self {
            state: manager.player_state(),
            item: manager.current_item(),
            clock: manager.clock(),
            now_playing: info.snapshot(),
        }
    }
}

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display session state, item metadata, position and now-playing values
    pub fn display_full_status(status: &SessionStatus) {
        println!("┌─ Session Status ────────────────────────────────────────┐");
        for line in Self::full_status_lines(status) {
            println!("│ {}", line);
        }
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Body lines of the full status box
    pub fn full_status_lines(status: &SessionStatus) -> Vec<String> {
        let mut lines = Vec::new();

        match &status.item {
            Some(item) => {
                lines.push(format!("Title: {}", Self::truncate(&item.display_name(), 50)));
                lines.push(format!("Artist: {}", Self::truncate(&item.artist_name(), 49)));
                if let Some(album) = item.album_title() {
                    lines.push(format!("Album: {}", Self::truncate(album, 50)));
                }
                lines.push(format!("Source: {}", Self::truncate(item.audio_url(), 49)));
            }
            None => lines.push("No item loaded".to_string()),
        }

        lines.push(String::new());
        lines.push(format!("State: {}", Self::format_player_state(&status.state)));

        if status.item.is_some() {
            let clock = &status.clock;
            match clock.duration {
                Some(_) => {
                    lines.push(format!(
                        "Position: {} / {}",
                        clock.position_formatted(),
                        clock.duration_formatted()
                    ));
                    lines.push(format!(
                        "Progress: [{}] {:.1}%",
                        Self::create_progress_bar(clock.progress(), 40),
                        clock.progress() * 100.0
                    ));
                    lines.push(format!(
                        "Remaining: {}",
                        Self::format_seconds(clock.remaining())
                    ));
                }
                None => lines.push(format!("Position: {} / --:--", clock.position_formatted())),
            }
            lines.push(format!("Rate: {:.2}x", clock.rate));
        }

        let now_playing = &status.now_playing;
        if now_playing.updates > 0 {
            lines.push(String::new());
            lines.push(format!(
                "Now playing: elapsed {} of {} at {:.2}x ({} updates)",
                Self::format_seconds(now_playing.elapsed_playback_time),
                Self::format_seconds(now_playing.duration),
                now_playing.playback_rate,
                now_playing.updates
            ));
        }

        lines
    }

    /// One-line status
    pub fn compact_status(status: &SessionStatus) -> String {
        match &status.item {
            Some(item) => {
                let title = Self::truncate(&item.display_name(), 30);
                let artist = Self::truncate(&item.artist_name(), 25);
                let duration = match status.clock.duration {
                    Some(_) => status.clock.duration_formatted(),
                    None => "--:--".to_string(),
                };
                format!(
                    "{} | {} - {} | {}/{} ({}%)",
                    status.state.as_str(),
                    artist,
                    title,
                    status.clock.position_formatted(),
                    duration,
                    (status.clock.progress() * 100.0) as u8
                )
            }
            None => format!("{} | No item loaded", status.state.as_str()),
        }
    }

    /// Overwrite the current terminal line with the compact status
    pub fn display_position_update(status: &SessionStatus) {
        print!("\r{}", Self::compact_status(status));
        let _ = io::stdout().flush();
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &PlayerError) {
        let severity = error.severity();
        eprintln!(
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            Self::severity_icon(severity),
            severity.as_str()
        );

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        if let Some(context) = Self::error_context(error) {
            eprintln!("│");
            eprintln!("│ {}", context);
        }

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Extra hint for specific error types
    fn error_context(error: &PlayerError) -> Option<&'static str> {
        match error {
            PlayerError::Playback(PlaybackError::SourceInvalid { .. }) => {
                Some("Examples: /music/a.flac, file:///music/a.flac")
            }
            PlayerError::Playback(PlaybackError::ResourceUnreachable(_)) => {
                Some("Use 'load <url>' to try again")
            }
            PlayerError::Config(_) => Some("Configuration will use default values"),
            _ => None,
        }
    }

    /// Display an error the engine surfaced through the observer
    pub fn display_playback_failure(error: Option<&PlaybackError>) {
        match error {
            Some(error) => Self::display_error(&PlayerError::Playback(error.clone())),
            None => eprintln!("[ERROR] Playback failed for an unknown reason"),
        }
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());

        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    fn severity_icon(severity: ErrorSeverity) -> &'static str {
        match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + word.chars().count() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
        lines
    }

    /// Format seconds as MM:SS, or HH:MM:SS for long items
    pub fn format_seconds(seconds: f64) -> String {
        let total_seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds as u64
        } else {
            0
        };
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    /// Truncate string to fit display width
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    /// Create a progress bar string
    pub fn create_progress_bar(progress: f64, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * width as f64) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_player_state(state: &PlayerState) -> String {
        match state {
            PlayerState::Idle => "⏹ Idle".to_string(),
            PlayerState::Loading => "… Loading".to_string(),
            PlayerState::Ready => "● Ready".to_string(),
            PlayerState::Playing(rate) if (*rate - 1.0).abs() > f32::EPSILON => {
                format!("▶ Playing ({:.2}x)", rate)
            }
            PlayerState::Playing(_) => "▶ Playing".to_string(),
            PlayerState::Paused => "⏸ Paused".to_string(),
            PlayerState::Seeking => "⇥ Seeking".to_string(),
            PlayerState::Completed => "✓ Completed".to_string(),
            PlayerState::Failed(error) => format!("✗ Failed: {}", error),
        }
    }
}
