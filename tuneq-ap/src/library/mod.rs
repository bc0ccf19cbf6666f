//! Playlist discovery under the music root

pub mod playlists;

pub use playlists::{DirectoryPlaylists, PlaylistSource};
