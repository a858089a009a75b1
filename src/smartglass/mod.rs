//! Xbox One SmartGlass REST bridge

pub mod client;
pub mod error;
pub mod models;
pub mod registry;
pub mod version;

pub use client::{ConsoleSnapshot, SmartGlassClient};
pub use error::SmartGlassError;
