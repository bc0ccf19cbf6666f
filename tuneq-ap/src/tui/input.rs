//! Keyboard input
//!
//! A dedicated thread blocks on crossterm events and forwards key presses to
//! the async side over an unbounded channel. The mapping from keys to actions
//! depends on the page, so it happens on the receiving end.

use crate::control::commands::Command;
use crate::error::{Error, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How long a read waits before checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Actions on the playlist selection page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WelcomeAction {
    Up,
    Down,
    ToggleShuffle,
    Select,
    Quit,
}

/// Key binding for the playlist selection page
pub fn welcome_action(key: &KeyEvent) -> Option<WelcomeAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match (key.code, key.modifiers) {
        (KeyCode::Up, _) => Some(WelcomeAction::Up),
        (KeyCode::Down, _) => Some(WelcomeAction::Down),
        (KeyCode::Char('s'), KeyModifiers::CONTROL) => Some(WelcomeAction::ToggleShuffle),
        (KeyCode::Enter, _) => Some(WelcomeAction::Select),
        (KeyCode::Esc, _) => Some(WelcomeAction::Quit),
        _ => None,
    }
}

/// Key binding for the player page
pub fn player_command(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match (key.code, key.modifiers) {
        (KeyCode::Char(' '), _) => Some(Command::TogglePause),
        (KeyCode::Right, _) => Some(Command::SeekForward),
        (KeyCode::Left, _) => Some(Command::SeekBackward),
        (KeyCode::Up, _) => Some(Command::VolumeUp),
        (KeyCode::Down, _) => Some(Command::VolumeDown),
        (KeyCode::Char('x'), KeyModifiers::CONTROL) => Some(Command::Skip),
        (KeyCode::Char('z'), KeyModifiers::CONTROL) => Some(Command::Rewind),
        (KeyCode::Char('r'), KeyModifiers::CONTROL) => Some(Command::ReturnToSelection),
        (KeyCode::Esc, _) => Some(Command::Quit),
        _ => None,
    }
}

/// Background thread reading key events from the terminal
pub struct InputReader {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputReader {
    /// Start forwarding key events to `tx`. Raw mode must already be on.
    pub fn spawn(tx: mpsc::UnboundedSender<KeyEvent>) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = std::thread::Builder::new()
            .name("tuneq-input".to_string())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    match event::poll(POLL_INTERVAL) {
                        Ok(false) => continue,
                        Ok(true) => {}
                        Err(e) => {
                            warn!("Terminal poll failed: {}", e);
                            break;
                        }
                    }

                    match event::read() {
                        Ok(Event::Key(key)) => {
                            if tx.send(key).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Terminal read failed: {}", e);
                            break;
                        }
                    }
                }
                debug!("Input thread exiting");
            })
            .map_err(|e| Error::InvalidState(format!("Failed to spawn input thread: {}", e)))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Input thread panicked");
            }
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}
