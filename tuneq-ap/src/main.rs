//! tuneq - Main entry point
//!
//! Shows the playlist selection page, plays the chosen playlist through a
//! control-loop session, and goes back to selection when the session ends
//! until the user quits.

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::KeyEvent;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuneq_common::config::TomlConfig;

use tuneq_ap::audio::{AudioSink, CpalSink, SymphoniaDecoder, TrackDecoder};
use tuneq_ap::config::{Args, PlayerConfig};
use tuneq_ap::control::{Session, SessionOutcome};
use tuneq_ap::library::{DirectoryPlaylists, PlaylistSource};
use tuneq_ap::playback::{PlaybackControls, PlaybackEngine, TrackQueue};
use tuneq_ap::tui::{player_command, welcome_action, InputReader, Terminal, WelcomeAction, WelcomeView};

/// Everything that outlives a single playlist session
struct Player {
    config: PlayerConfig,
    playlists: DirectoryPlaylists,
    decoder: Arc<dyn TrackDecoder>,
    sink: Arc<dyn AudioSink>,
    controls: Arc<PlaybackControls>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for name in CpalSink::list_devices().context("Failed to list audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let toml = TomlConfig::load(args.config.as_deref()).context("Failed to load config file")?;
    let config = PlayerConfig::resolve(&args, &toml).context("Invalid configuration")?;

    init_tracing(&config)?;

    info!(
        "Starting tuneq {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Music root: {}", config.music_root.display());

    let sink = Arc::new(CpalSink::new(config.device.clone()));
    let output_rate = sink
        .init(config.sample_rate, config.buffer_frames())
        .context("Failed to open audio output")?;
    info!("Audio output running at {}Hz", output_rate);

    let player = Player {
        playlists: DirectoryPlaylists::new(config.music_root.clone()),
        decoder: Arc::new(SymphoniaDecoder::new(Some(output_rate))),
        sink: sink.clone(),
        controls: Arc::new(PlaybackControls::new(config.engine.volume)),
        config,
    };

    let result = {
        let mut terminal = Terminal::enter().context("Failed to set up terminal")?;
        let (key_tx, mut keys) = mpsc::unbounded_channel();
        let mut reader = InputReader::spawn(key_tx).context("Failed to start input thread")?;

        let result = run(&player, &mut terminal, &mut keys).await;
        reader.stop();
        result
    };

    // Release the device before exiting, on success and on error alike
    sink.release();
    info!("tuneq exiting");
    result
}

/// Log to a file; the terminal belongs to the player pages.
fn init_tracing(config: &PlayerConfig) -> Result<()> {
    if let Some(dir) = config.log_file.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tuneq_ap={level},tuneq_common={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

/// Alternate between playlist selection and playback until the user quits.
async fn run(
    player: &Player,
    terminal: &mut Terminal,
    keys: &mut mpsc::UnboundedReceiver<KeyEvent>,
) -> Result<()> {
    let mut shuffle = player.config.shuffle;

    loop {
        let names = player.playlists.playlists().context("Failed to list playlists")?;
        let mut view = WelcomeView::new(names, shuffle);

        let Some(playlist) = choose_playlist(&mut view, terminal, keys).await? else {
            return Ok(());
        };
        shuffle = view.shuffle;

        let tracks = player
            .playlists
            .tracks(&playlist)
            .with_context(|| format!("Failed to read playlist '{}'", playlist))?;
        if tracks.is_empty() {
            warn!("Playlist '{}' is empty", playlist);
            continue;
        }
        info!("Playing '{}' ({} tracks, shuffle={})", playlist, tracks.len(), shuffle);

        let mut queue = TrackQueue::new();
        queue.enqueue_many(tracks, shuffle);

        let (engine, notices) = PlaybackEngine::with_controls(
            Arc::clone(&player.decoder),
            Arc::clone(&player.sink),
            player.config.engine,
            Arc::clone(&player.controls),
        );
        let mut session = Session::new(engine, notices, queue, player.config.session_options());
        session.start().context("Failed to start playback")?;

        match play(&mut session, terminal, keys).await.context("Playback failed")? {
            SessionOutcome::Quit => return Ok(()),
            SessionOutcome::ReturnToSelection | SessionOutcome::QueueExhausted => continue,
        }
    }
}

/// Run the selection page. Returns None when the user quits.
async fn choose_playlist(
    view: &mut WelcomeView,
    terminal: &mut Terminal,
    keys: &mut mpsc::UnboundedReceiver<KeyEvent>,
) -> Result<Option<String>> {
    terminal.draw_welcome(view)?;

    while let Some(key) = keys.recv().await {
        match welcome_action(&key) {
            Some(WelcomeAction::Up) => view.up(),
            Some(WelcomeAction::Down) => view.down(),
            Some(WelcomeAction::ToggleShuffle) => view.shuffle = !view.shuffle,
            Some(WelcomeAction::Select) => {
                if let Some(name) = view.selected_playlist() {
                    return Ok(Some(name.to_string()));
                }
            }
            Some(WelcomeAction::Quit) => return Ok(None),
            None => continue,
        }
        terminal.draw_welcome(view)?;
    }

    Ok(None)
}

/// Feed player-page keys to the session until it ends.
async fn play(
    session: &mut Session,
    terminal: &mut Terminal,
    keys: &mut mpsc::UnboundedReceiver<KeyEvent>,
) -> tuneq_ap::Result<SessionOutcome> {
    let (command_tx, mut commands) = mpsc::unbounded_channel();

    let forward = async move {
        while let Some(key) = keys.recv().await {
            if let Some(command) = player_command(&key) {
                if command_tx.send(command).is_err() {
                    break;
                }
            }
        }
    };

    tokio::select! {
        outcome = session.run(&mut commands, terminal) => outcome,
        _ = forward => Ok(SessionOutcome::Quit),
    }
}
