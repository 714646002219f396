use crate::config::{is_valid_rate, MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};
use crate::models::AudioItem;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub mod status;
pub use status::StatusDisplay;

/// Audio playback session controller
#[derive(Debug, Parser)]
#[command(name = "audioctl")]
#[command(about = "Drive an audio playback session from the terminal")]
#[command(version = "0.1.0")]
pub struct CliApp {
    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Load the initial item without starting playback
    #[arg(long)]
    pub paused: bool,

    /// Artist shown in now-playing info for the initial item
    #[arg(long, value_name = "A")]
    pub artist: Option<String>,

    /// Title shown in now-playing info for the initial item
    #[arg(long, value_name = "T")]
    pub title: Option<String>,

    /// Album shown in now-playing info for the initial item
    #[arg(long, value_name = "B")]
    pub album: Option<String>,

    /// Item to load on start (plain path or scheme URL)
    pub url: Option<String>,
}

/// Commands accepted at the interactive prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Commands {
    /// Load a new item, replacing the current session
    Load { url: String },
    /// Play/pause
    Toggle,
    /// Seek to a position in seconds
    Seek { position: f64 },
    /// Change the playback rate
    Rate { rate: f32 },
    /// Show the session status
    Status,
    /// Leave the interactive session
    Quit,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// The item named on the command line, with its display metadata
    pub fn initial_item(&self) -> Option<AudioItem> {
        let url = self.url.as_deref()?;
        Some(AudioItem::with_metadata(
            Self::expand_url(url),
            self.artist.clone(),
            self.title.clone(),
            self.album.clone(),
        ))
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(rest)
            } else {
                PathBuf::from(path)
            }
        } else if path == "~" {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
        } else {
            PathBuf::from(path)
        }
    }

    /// Expand a leading tilde in plain paths; scheme URLs pass through untouched
    pub fn expand_url(url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else {
            Self::expand_path(url).to_string_lossy().into_owned()
        }
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        match args[0] {
            "load" | "open" => {
                // Plain paths keep their inner whitespace as typed
                let url = input
                    .trim_start()
                    .split_once(char::is_whitespace)
                    .map(|(_, rest)| rest.trim())
                    .unwrap_or_default();
                if !url.is_empty() {
                    Ok(Commands::Load {
                        url: Self::expand_url(url),
                    })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "load".to_string(),
                        argument: "url".to_string(),
                    })
                }
            }
            "toggle" | "play" | "pause" => Ok(Commands::Toggle),
            "seek" => {
                if args.len() > 1 {
                    let position = Self::parse_time(args[1])?;
                    Ok(Commands::Seek {
                        position: position.as_secs_f64(),
                    })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "seek".to_string(),
                        argument: "position".to_string(),
                    })
                }
            }
            "rate" => {
                if args.len() > 1 {
                    match args[1].trim_end_matches('x').parse::<f32>() {
                        Ok(rate) if is_valid_rate(rate) => Ok(Commands::Rate { rate }),
                        _ => Err(ParseError::InvalidArgument {
                            argument: "rate".to_string(),
                            value: args[1].to_string(),
                            expected: format!(
                                "a number between {} and {}",
                                MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE
                            ),
                        }),
                    }
                } else {
                    Err(ParseError::MissingArgument {
                        command: "rate".to_string(),
                        argument: "rate".to_string(),
                    })
                }
            }
            "status" => Ok(Commands::Status),
            "quit" | "exit" => Ok(Commands::Quit),
            "help" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].to_string(),
            }),
        }
    }

    /// Display help information
    pub fn display_help() {
        println!("audioctl - Available Commands:");
        println!();
        println!("Session:");
        println!("  load <url>      - Load an item (path or URL) and start a new session");
        println!("  toggle          - Play or pause (aliases: play, pause)");
        println!("  seek <time>     - Seek to position (e.g., '1:30', '90s')");
        println!("  rate <x>        - Set playback rate (e.g., '0.5', '2x')");
        println!();
        println!("Information:");
        println!("  status          - Show state, position and now-playing info");
        println!();
        println!("General:");
        println!("  help            - Show this help message");
        println!("  exit, quit      - End the session");
    }

    /// Parse time string to Duration
    pub fn parse_time(time_str: &str) -> Result<Duration, ParseError> {
        let trimmed = time_str.trim();
        let invalid = || ParseError::InvalidTimeFormat {
            input: time_str.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid());
        }

        // Handle different time formats: "1:30", "90", "90s", "1:30.5"
        let total_seconds = if trimmed.contains(':') {
            let parts: Vec<&str> = trimmed.split(':').collect();
            if parts.len() != 2 {
                return Err(invalid());
            }

            let minutes: u64 = parts[0].parse().map_err(|_| invalid())?;
            let seconds: f64 = parts[1].parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }

            minutes as f64 * 60.0 + seconds
        } else {
            let seconds: f64 = trimmed
                .trim_end_matches('s')
                .parse()
                .map_err(|_| invalid())?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }
            seconds
        };

        Ok(Duration::from_secs_f64(total_seconds))
    }

    /// Format seconds for display as MM:SS
    pub fn format_duration(seconds: f64) -> String {
        let total_seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds as u64
        } else {
            0
        };
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Invalid time format: {input}")]
    InvalidTimeFormat { input: String },

    #[error("Help requested")]
    HelpRequested,
}
