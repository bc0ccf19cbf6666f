//! Commands accepted by the control loop

/// One user action on the player page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    SeekForward,
    SeekBackward,
    VolumeUp,
    VolumeDown,
    /// Advance to the next track now
    Skip,
    /// Restart the current track, or go back one when near its start
    Rewind,
    /// Stop and go back to playlist selection
    ReturnToSelection,
    Quit,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::TogglePause => "toggle-pause",
            Command::SeekForward => "seek-forward",
            Command::SeekBackward => "seek-backward",
            Command::VolumeUp => "volume-up",
            Command::VolumeDown => "volume-down",
            Command::Skip => "skip",
            Command::Rewind => "rewind",
            Command::ReturnToSelection => "return-to-selection",
            Command::Quit => "quit",
        };
        f.write_str(name)
    }
}
