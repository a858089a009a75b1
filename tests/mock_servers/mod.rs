//! Mock servers for integration testing
#![allow(dead_code)]

pub mod smartglass;

pub use smartglass::{device_path, MockSmartGlassServer, LIVE_ID};
