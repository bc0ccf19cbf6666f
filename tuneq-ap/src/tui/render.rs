//! Page drawing with crossterm
//!
//! Page content is built as plain lines first so layout can be tested
//! without a terminal; [`Terminal`] only positions and prints them.

use crate::control::session::StatusSurface;
use crate::error::Result;
use crate::playback::state::StatusSnapshot;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use std::io::{self, Stdout, Write};
use tracing::warn;
use tuneq_common::human_time::format_position;

/// Left margin of every page
const MARGIN: u16 = 5;

/// One row of a page. Empty text leaves a blank row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub highlighted: bool,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: false,
        }
    }

    fn blank() -> Self {
        Self::plain("")
    }
}

/// State of the playlist selection page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeView {
    pub playlists: Vec<String>,
    pub selected: usize,
    pub shuffle: bool,
}

impl WelcomeView {
    pub fn new(playlists: Vec<String>, shuffle: bool) -> Self {
        Self {
            playlists,
            selected: 0,
            shuffle,
        }
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.selected + 1 < self.playlists.len() {
            self.selected += 1;
        }
    }

    pub fn selected_playlist(&self) -> Option<&str> {
        self.playlists.get(self.selected).map(String::as_str)
    }
}

/// Lines of the playlist selection page
pub fn welcome_lines(view: &WelcomeView) -> Vec<Line> {
    let mut lines = vec![
        Line::plain("Welcome to tuneq"),
        Line::plain("Press Enter to start"),
        Line::plain(format!("Press Ctrl+S to shuffle. Shuffle: {}", view.shuffle)),
        Line::plain("Press Esc to exit"),
        Line::blank(),
        Line::plain("Playlists:"),
    ];

    if view.playlists.is_empty() {
        lines.push(Line::plain("(no playlists found)"));
    }
    for (i, name) in view.playlists.iter().enumerate() {
        if i == view.selected {
            lines.push(Line {
                text: format!("{} <-", name),
                highlighted: true,
            });
        } else {
            lines.push(Line::plain(name.clone()));
        }
    }
    lines
}

/// Lines of the player page
pub fn player_lines(snapshot: &StatusSnapshot) -> Vec<Line> {
    let mut title = snapshot
        .track_name
        .clone()
        .unwrap_or_else(|| format!("({})", snapshot.state));
    if snapshot.paused {
        title.push_str(" [paused]");
    }

    let mut volume = format!("Volume: {:.1}", snapshot.volume_percent);
    if snapshot.silent {
        volume.push_str(" [muted]");
    }

    let mut lines = vec![
        Line::plain(title),
        Line::plain(format_position(
            snapshot.position_frames,
            snapshot.total_frames,
            snapshot.sample_rate,
        )),
        Line::plain(volume),
        Line::blank(),
        Line::plain("Prev: Ctrl+Z, Next: Ctrl+X"),
        Line::plain("Volume Up: ↑, Volume Down: ↓"),
        Line::plain("Backward: ←, Forward: →"),
        Line::plain("Pause: Space"),
        Line::plain("Main Page: Ctrl+R"),
        Line::plain("Exit: Esc"),
        Line::blank(),
        Line::plain("Next:"),
    ];
    lines.extend(snapshot.upcoming.iter().map(|name| Line::plain(name.clone())));
    lines
}

/// Raw-mode alternate screen, restored on drop
pub struct Terminal {
    out: Stdout,
}

impl Terminal {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out })
    }

    pub fn draw(&mut self, lines: &[Line]) -> Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in lines.iter().enumerate() {
            queue!(self.out, cursor::MoveTo(MARGIN, row as u16 + 1))?;
            if line.highlighted {
                queue!(
                    self.out,
                    SetForegroundColor(Color::Blue),
                    Print(&line.text),
                    ResetColor
                )?;
            } else {
                queue!(self.out, Print(&line.text))?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn draw_welcome(&mut self, view: &WelcomeView) -> Result<()> {
        self.draw(&welcome_lines(view))
    }
}

impl StatusSurface for Terminal {
    fn render(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
        self.draw(&player_lines(snapshot))
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(e) = execute!(self.out, LeaveAlternateScreen, cursor::Show) {
            warn!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
    }
}
