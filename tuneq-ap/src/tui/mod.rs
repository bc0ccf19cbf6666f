//! Terminal front end: key handling and page drawing

pub mod input;
pub mod render;

pub use input::{player_command, welcome_action, InputReader, WelcomeAction};
pub use render::{player_lines, welcome_lines, Terminal, WelcomeView};
