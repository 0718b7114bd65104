//! Browser-side sequential player.
//!
//! The controller itself is `assets/playback.js`; the server serves it as-is
//! and hands it the completion notices through the page.

pub const PLAYBACK_SCRIPT: &str = include_str!("../assets/playback.js");

pub const DONE_NOTICE: &str = "All videos played once.";
pub const DONE_WITH_ERRORS_NOTICE: &str = "All videos played once (some errors occurred).";
