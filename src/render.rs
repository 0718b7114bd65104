//! HTML page for the browser route.

use anyhow::{Context, Result};
use askama::Template;
use serde::Serialize;

use crate::catalog::{Lookup, VideoRecord};
use crate::playback::{DONE_NOTICE, DONE_WITH_ERRORS_NOTICE};

pub const STORE_UNAVAILABLE_MESSAGE: &str = "Database connection failed";

/// Playlist entry as the browser script reads it.
#[derive(Debug, Serialize)]
struct PlaylistEntry<'a> {
    file_name: &'a str,
    cloudinary_url: &'a str,
}

impl<'a> From<&'a VideoRecord> for PlaylistEntry<'a> {
    fn from(record: &'a VideoRecord) -> Self {
        Self {
            file_name: &record.file_name,
            cloudinary_url: &record.url,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    result_count: usize,
    playlist_json: String,
    message: &'a str,
    done_notice: &'a str,
    done_with_errors_notice: &'a str,
}

/// What a single page view shows below the search form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    pub videos: Vec<VideoRecord>,
    pub message: String,
}

impl PageView {
    /// The bare search form.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            videos: Vec::new(),
            message: message.into(),
        }
    }

    pub fn from_lookup(lookup: Lookup) -> Self {
        let message = lookup
            .unmatched
            .iter()
            .map(|token| format!("No match for '{token}'."))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            videos: lookup.videos,
            message,
        }
    }

    pub fn render(&self) -> Result<String> {
        let entries: Vec<PlaylistEntry<'_>> =
            self.videos.iter().map(PlaylistEntry::from).collect();
        let page = IndexPage {
            result_count: self.videos.len(),
            playlist_json: script_safe_json(&entries)?,
            message: &self.message,
            done_notice: DONE_NOTICE,
            done_with_errors_notice: DONE_WITH_ERRORS_NOTICE,
        };
        page.render().context("rendering index page")
    }
}

/// Serializes `value` so it can sit inside a `<script>` element: characters
/// that could close the element or start markup are written as `\uXXXX`.
fn script_safe_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("serializing playlist")?;
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\'' => escaped.push_str("\\u0027"),
            _ => escaped.push(ch),
        }
    }
    Ok(escaped)
}
