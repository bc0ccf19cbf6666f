//! Directory-backed playlists
//!
//! Every directory directly under the music root is a playlist. A playlist's
//! tracks are its files in name order; a subdirectory contributes its own
//! files at the point where it sorts, one level deep only.

use crate::error::{Error, Result};
use crate::playback::queue::Track;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Names that are never playlists or tracks
const IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Source of playlists and their tracks
pub trait PlaylistSource {
    /// Playlist names in display order
    fn playlists(&self) -> Result<Vec<String>>;

    /// Tracks of playlist `name` in play order
    fn tracks(&self, name: &str) -> Result<Vec<Track>>;
}

/// Playlists as subdirectories of a music root folder
#[derive(Debug, Clone)]
pub struct DirectoryPlaylists {
    root: PathBuf,
}

impl DirectoryPlaylists {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::Playlist(format!(
                "Music root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}

/// Hidden and system files below the walk root.
///
/// The walk root itself is never ignored.
fn is_ignored(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || IGNORED_NAMES.contains(&name.as_ref())
}

impl PlaylistSource for DirectoryPlaylists {
    fn playlists(&self) -> Result<Vec<String>> {
        self.check_root()?;

        let mut names = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored(e));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
                Ok(_) => {}
                Err(e) => warn!("Error reading music root: {}", e),
            }
        }

        debug!("Found {} playlists in {}", names.len(), self.root.display());
        Ok(names)
    }

    fn tracks(&self, name: &str) -> Result<Vec<Track>> {
        self.check_root()?;

        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(Error::Playlist(format!("No playlist named '{}'", name)));
        }

        let mut tracks = Vec::new();
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored(e));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    tracks.push(Track::new(entry.into_path()));
                }
                Ok(_) => {}
                Err(e) => warn!("Error reading playlist '{}': {}", name, e),
            }
        }

        debug!("Playlist '{}' has {} tracks", name, tracks.len());
        Ok(tracks)
    }
}
