//! Launchable apps, keyed by display name.

use serde::Serialize;

use crate::smartglass::models::{ConsoleStatus, Pins};

pub const HOME_APP: &str = "Home";
pub const HOME_URI: &str = "ms-xbox-dashboard://home?view=home";
pub const TV_APP: &str = "TV";
pub const TV_URI: &str = "ms-xbox-livetv://";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppEntry {
    pub name: String,
    pub uri: String,
}

/// Display name → launch URI, in insertion order.
///
/// Rebuilt from scratch on every refresh: the two static entries first, then
/// pinned apps, then the focused title if it is not already known. Earlier
/// entries win on name collisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppRegistry {
    entries: Vec<AppEntry>,
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}

impl AppRegistry {
    pub fn seeded() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.insert(HOME_APP, HOME_URI);
        registry.insert(TV_APP, TV_URI);
        registry
    }

    pub fn build(pins: Option<&Pins>, console_status: Option<&ConsoleStatus>) -> Self {
        let mut registry = Self::seeded();

        if let Some(pins) = pins {
            for (title, uri) in pins.apps() {
                registry.insert(title, uri);
            }
        }

        if let Some(status) = console_status {
            for title in status.active_titles.iter().filter(|t| t.is_focused()) {
                if let (Some(name), Some(aum)) = (&title.name, &title.aum) {
                    registry.insert(name, aum);
                }
            }
        }

        registry
    }

    /// Add an entry unless the name is already registered.
    /// Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>, uri: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push(AppEntry {
            name,
            uri: uri.into(),
        });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn uri(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.uri.as_str())
    }

    /// A known display name maps to its URI; anything else is taken as a
    /// literal launch URI.
    pub fn resolve<'a>(&'a self, name_or_uri: &'a str) -> &'a str {
        self.uri(name_or_uri).unwrap_or(name_or_uri)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}
