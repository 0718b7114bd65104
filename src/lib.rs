#![forbid(unsafe_code)]

//! Keyword search over a video catalog, served as a browser page with a
//! sequential player and as a JSON API for the mobile client.

pub mod catalog;
pub mod config;
pub mod playback;
pub mod query;
pub mod render;
pub mod web;
