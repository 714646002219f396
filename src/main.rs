use std::sync::Arc;

use audio_manager::audio::{AudioManager, PlayerObserver, SchemeResolver};
use audio_manager::cli::status::SessionStatus;
use audio_manager::cli::{CliApp, Commands, ParseError, StatusDisplay};
use audio_manager::config::{ConfigManager, EngineConfig};
use audio_manager::error::{ErrorSeverity, PlaybackError, PlayerError};
use audio_manager::logging;
use audio_manager::models::{AudioItem, PlayerState};
use audio_manager::nowplaying::NowPlayingInfo;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Prints engine events as they arrive
struct ConsoleObserver;

impl PlayerObserver for ConsoleObserver {
    fn player_did_change_state(&self, state: &PlayerState) {
        match state {
            // Failures are reported by failed_with_error
            PlayerState::Failed(_) => {}
            state => println!("[{}]", StatusDisplay::format_player_state(state)),
        }
    }

    fn item_did_complete(&self) {
        println!("Item finished");
    }

    fn failed_with_error(&self, error: Option<&PlaybackError>) {
        StatusDisplay::display_playback_failure(error);
    }

    fn seek_completed(&self, seconds: f64, did_finish: bool) {
        if !did_finish {
            info!("Seek to {:.1}s was abandoned", seconds);
        }
    }
}

/// Owns the engine and drives it from terminal input
pub struct AppController {
    manager: AudioManager,
    now_playing: NowPlayingInfo,
    config: EngineConfig,
    _observer: Arc<ConsoleObserver>,
}

impl AppController {
    /// Create the engine with the local-file resolver and an in-process now-playing store
    pub fn new(config_manager: &ConfigManager) -> Result<Self, PlayerError> {
        let config = config_manager.get_config().clone();
        let now_playing = NowPlayingInfo::new();
        let resolver = Arc::new(SchemeResolver::with_local_files());

        let manager = AudioManager::new(config.clone(), resolver, Box::new(now_playing.clone()))?;
        let observer = Arc::new(ConsoleObserver);
        manager.set_observer(&observer)?;

        info!(
            "Application controller initialized (config: {})",
            config_manager.config_path().display()
        );

        Ok(Self {
            manager,
            now_playing,
            config,
            _observer: observer,
        })
    }

    /// Execute a single command
    pub fn execute_command(&self, command: Commands) -> Result<(), PlayerError> {
        match command {
            Commands::Load { url } => {
                println!("Loading {}", url);
                self.manager
                    .load(AudioItem::new(url), self.config.play_when_ready)?;
            }
            Commands::Toggle => self.manager.toggle_playing()?,
            Commands::Seek { position } => self.manager.seek(position)?,
            Commands::Rate { rate } => {
                self.manager.set_rate(rate)?;
                println!("Rate set to {:.2}x", rate);
            }
            Commands::Status => {
                StatusDisplay::display_full_status(&SessionStatus::capture(
                    &self.manager,
                    &self.now_playing,
                ));
            }
            // Handled by the input loop
            Commands::Quit => {}
        }

        Ok(())
    }

    /// Read commands from stdin until quit, EOF or Ctrl-C
    pub async fn run_interactive_mode(&self) -> Result<(), PlayerError> {
        println!("audioctl v0.1.0");
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let (interrupt_tx, mut interrupt_rx) = mpsc::unbounded_channel::<()>();
        if let Err(e) = ctrlc::set_handler(move || {
            let _ = interrupt_tx.send(());
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                biased;

                _ = interrupt_rx.recv() => {
                    println!("\nReceived interrupt signal. Shutting down gracefully...");
                    break;
                }

                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => {
                            // EOF
                            println!();
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }

                    match CliApp::parse_command(&line) {
                        Ok(Commands::Quit) => {
                            println!("Goodbye!");
                            break;
                        }
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command) {
                                Self::handle_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Stop the engine and flush pending observer events
    pub async fn shutdown(self) {
        println!("Shutting down...");
        self.manager.shutdown().await;
        println!("Shutdown complete.");
    }

    fn handle_error(error: &PlayerError) {
        match error.severity() {
            ErrorSeverity::Info => info!("{}", error),
            ErrorSeverity::Warning => warn!("{}", error),
            ErrorSeverity::Error | ErrorSeverity::Critical => error!("{}", error),
        }
        StatusDisplay::display_error(error);
    }
}

#[tokio::main]
async fn main() -> Result<(), PlayerError> {
    let cli = CliApp::parse();

    if let Err(e) = logging::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(CliApp::expand_path(&path.to_string_lossy())),
        None => match ConfigManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                let e = PlayerError::from(e);
                StatusDisplay::display_simple_error(&e);
                std::process::exit(1);
            }
        },
    };

    let app = match AppController::new(&config_manager) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    if let Some(item) = cli.initial_item() {
        let play_when_ready = !cli.paused && app.config.play_when_ready;
        println!("Loading {}", item.display_name());
        if let Err(e) = app.manager.load(item, play_when_ready) {
            AppController::handle_error(&e);
        }
    }

    let result = app.run_interactive_mode().await;
    app.shutdown().await;

    if let Err(e) = &result {
        AppController::handle_error(e);
    }

    info!("Application shutdown complete");
    result
}
