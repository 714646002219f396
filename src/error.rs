use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the engine and the `audioctl` binary
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),

    #[error("Playback engine is no longer running")]
    EngineStopped,
}

impl PlayerError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Playback(err) => err.user_message(),
            PlayerError::File(err) => Self::format_file_error(err),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::Parse(err) => format!("Command error: {}", err),
            PlayerError::EngineStopped => "The playback engine has shut down".to_string(),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Playback(err) => err.recovery_suggestions(),
            PlayerError::File(err) => Self::file_error_suggestions(err),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
            PlayerError::EngineStopped => vec!["Restart the application".to_string()],
        }
    }

    /// Check if this error allows for automatic recovery
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlayerError::Playback(err) => err.is_recoverable(),
            PlayerError::File(_) => false,
            PlayerError::Config(err) => err.is_recoverable(),
            PlayerError::Parse(_) => false,
            PlayerError::EngineStopped => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Playback(err) => err.severity(),
            PlayerError::File(_) => ErrorSeverity::Error,
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::Parse(_) => ErrorSeverity::Info,
            PlayerError::EngineStopped => ErrorSeverity::Critical,
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File or directory not found".to_string(),
            std::io::ErrorKind::PermissionDenied => {
                "Permission denied - cannot access file".to_string()
            }
            _ => format!("File system error: {}", err),
        }
    }

    fn file_error_suggestions(err: &std::io::Error) -> Vec<String> {
        match err.kind() {
            std::io::ErrorKind::NotFound => vec![
                "Check that the file path is correct".to_string(),
                "Try using absolute path instead of relative path".to_string(),
            ],
            std::io::ErrorKind::PermissionDenied => vec![
                "Check file permissions".to_string(),
            ],
            _ => vec!["Try the operation again".to_string()],
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Failures of a playback session.
///
/// Values are cheap to clone: the same error is carried by
/// [`PlayerState::Failed`](crate::models::PlayerState) and handed to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlaybackError {
    #[error("Invalid source '{url}': {reason}")]
    SourceInvalid { url: String, reason: String },

    #[error("Resource unreachable: {0}")]
    ResourceUnreachable(String),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Seek rejected while {state}")]
    SeekOutOfSession { state: String },

    /// Marker for a stale async result; never reaches an observer.
    #[error("Superseded by a newer request")]
    Superseded,
}

impl PlaybackError {
    pub fn source_invalid(url: &str, reason: impl Into<String>) -> Self {
        PlaybackError::SourceInvalid {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error is delivered through `failed_with_error`.
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, PlaybackError::SeekOutOfSession { .. } | PlaybackError::Superseded)
    }

    pub fn user_message(&self) -> String {
        match self {
            PlaybackError::SourceInvalid { url, reason } => {
                format!("'{}' is not a playable source ({})", url, reason)
            }
            PlaybackError::ResourceUnreachable(msg) => {
                format!("The audio resource could not be reached: {}", msg)
            }
            PlaybackError::DecodeFailure(msg) => {
                format!("The audio resource could not be decoded: {}", msg)
            }
            PlaybackError::SeekOutOfSession { state } => {
                format!("Cannot seek while the player is {}", state)
            }
            PlaybackError::Superseded => "The request was replaced by a newer one".to_string(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlaybackError::SourceInvalid { .. } => vec![
                "Check the URL for typos or stray whitespace".to_string(),
                "Use a 'file://' URL or a plain path for local files".to_string(),
            ],
            PlaybackError::ResourceUnreachable(_) => vec![
                "Check that the file exists or the host is reachable".to_string(),
                "Load the item again to retry".to_string(),
                "Increase 'load_timeout_ms' in the configuration for slow sources".to_string(),
            ],
            PlaybackError::DecodeFailure(_) => vec![
                "Supported containers: FLAC, WAV, MP3, OGG, MP4/M4A".to_string(),
                "Verify the file is not truncated or corrupted".to_string(),
            ],
            PlaybackError::SeekOutOfSession { .. } => vec![
                "Wait until the item has finished loading before seeking".to_string(),
            ],
            PlaybackError::Superseded => Vec::new(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            PlaybackError::SourceInvalid { .. } => false, // Requires a different URL
            PlaybackError::ResourceUnreachable(_) => true, // Caller may re-load
            PlaybackError::DecodeFailure(_) => false,
            PlaybackError::SeekOutOfSession { .. } => true,
            PlaybackError::Superseded => true,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlaybackError::SourceInvalid { .. } => ErrorSeverity::Error,
            PlaybackError::ResourceUnreachable(_) => ErrorSeverity::Error,
            PlaybackError::DecodeFailure(_) => ErrorSeverity::Error,
            PlaybackError::SeekOutOfSession { .. } => ErrorSeverity::Warning,
            PlaybackError::Superseded => ErrorSeverity::Info,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
            ConfigError::InvalidValue { field, reason } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/audio-manager/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
            ConfigError::InvalidValue { .. } => vec![
                "Edit the value or reset the configuration to defaults".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        // Every configuration problem can fall back to defaults
        true
    }
}
