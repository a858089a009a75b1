//! SmartGlass Bridge
//!
//! Polls an Xbox One SmartGlass REST bridge for one console and presents it
//! as a media player.
//!
//! This library provides:
//! - A typed client for the bridge with snapshot-based status caching
//! - Media player state, feature and command mapping
//! - A polling scheduler publishing change events on a broadcast bus
//! - A small HTTP API exposing the player (feature `server`)

#[cfg(feature = "server")]
pub mod api;
pub mod bus;
pub mod config;
pub mod player;
pub mod poller;
pub mod smartglass;
