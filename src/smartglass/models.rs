//! Typed views of the SmartGlass REST bridge payloads.
//!
//! Every field the bridge may omit is an `Option`. Decoding a payload field
//! goes through [`decode_field`], which reports a missing or `null` field as
//! absent (debug log) and a present-but-undecodable field as malformed
//! (warn log). Both resolve to `None` for callers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Raw media positions are reported in 100ns ticks.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// `success` flag carried by nearly every bridge response.
pub fn is_success(response: &Value) -> bool {
    flag(response, "success")
}

/// Boolean field lookup; anything but a JSON `true` is false.
pub fn flag(response: &Value, key: &str) -> bool {
    response.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Decode one field of a response into a typed structure.
pub fn decode_field<T: DeserializeOwned>(response: &Value, key: &str) -> Option<T> {
    match response.get(key) {
        None | Some(Value::Null) => {
            debug!(field = key, "Field absent from bridge response");
            None
        }
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(field = key, error = %e, "Malformed field in bridge response");
                None
            }
        },
    }
}

/// Connectivity of the console as seen by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unavailable,
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn from_flags(available: bool, connected: bool) -> Self {
        match (available, connected) {
            (false, _) => ConnectionState::Unavailable,
            (true, false) => ConnectionState::Disconnected,
            (true, true) => ConnectionState::Connected,
        }
    }
}

/// `/device/{id}` → `device`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_status: Option<String>,
    pub connection_state: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl DeviceInfo {
    pub fn is_unavailable(&self) -> bool {
        self.device_status.as_deref() == Some("Unavailable")
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state.as_deref() == Some("Connected")
    }
}

/// One running title in `console_status.active_titles`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveTitle {
    pub name: Option<String>,
    pub aum: Option<String>,
    #[serde(rename = "type")]
    pub title_type: Option<String>,
    pub image: Option<String>,
    pub has_focus: Option<bool>,
}

impl ActiveTitle {
    pub fn is_focused(&self) -> bool {
        self.has_focus.unwrap_or(false)
    }
}

/// `/device/{id}/console_status` → `console_status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleStatus {
    #[serde(default)]
    pub active_titles: Vec<ActiveTitle>,
}

impl ConsoleStatus {
    /// First title holding focus. A well-formed status has at most one.
    pub fn focused_title(&self) -> Option<&ActiveTitle> {
        self.active_titles.iter().find(|t| t.is_focused())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: Option<String>,
}

/// `/device/{id}/media_status` → `media_status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaStatus {
    pub playback_status: Option<String>,
    pub media_type: Option<String>,
    /// Kept as a raw number: only integral tick counts are meaningful.
    pub position: Option<Number>,
    pub media_end: Option<Number>,
    pub metadata: Option<MediaMetadata>,
}

impl MediaStatus {
    pub fn position_secs(&self) -> Option<f64> {
        self.position.as_ref().and_then(ticks_to_secs)
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.media_end.as_ref().and_then(ticks_to_secs)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref()?.title.as_deref()
    }
}

/// Integral tick count to seconds. Anything under one second is treated as
/// no data rather than zero.
pub fn ticks_to_secs(raw: &Number) -> Option<f64> {
    let ticks = raw.as_i64()?;
    if ticks < TICKS_PER_SECOND {
        return None;
    }
    Some(ticks as f64 / TICKS_PER_SECOND as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrButton {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrDevice {
    #[serde(default)]
    pub buttons: BTreeMap<String, IrButton>,
}

/// `/device/{id}/ir`: one entry per device class (`avr`, `tv`, `stb`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IrControls {
    pub devices: BTreeMap<String, IrDevice>,
}

impl IrControls {
    /// Collect every object-valued entry that decodes as a device class.
    /// Envelope fields such as `success` are skipped.
    pub fn from_response(response: &Value) -> Self {
        let mut devices = BTreeMap::new();
        if let Some(map) = response.as_object() {
            for (class, raw) in map {
                if !raw.is_object() {
                    continue;
                }
                match serde_json::from_value::<IrDevice>(raw.clone()) {
                    Ok(device) => {
                        devices.insert(class.clone(), device);
                    }
                    Err(e) => warn!(device = %class, error = %e, "Malformed IR device entry"),
                }
            }
        }
        Self { devices }
    }

    pub fn device(&self, class: &str) -> Option<&IrDevice> {
        self.devices.get(class)
    }

    pub fn button_url(&self, class: &str, button: &str) -> Option<&str> {
        self.device(class)?.buttons.get(button)?.url.as_deref()
    }

    pub fn has_button(&self, class: &str, button: &str) -> bool {
        self.device(class)
            .is_some_and(|d| d.buttons.contains_key(button))
    }

    /// Volume buttons of the AV receiver, falling back to the TV.
    pub fn volume_controls(&self) -> Option<VolumeControls> {
        let class = ["avr", "tv"]
            .into_iter()
            .find(|class| self.devices.contains_key(*class))?;
        Some(VolumeControls {
            mute: self.button_url(class, "btn.vol_mute")?.to_string(),
            up: self.button_url(class, "btn.vol_up")?.to_string(),
            down: self.button_url(class, "btn.vol_down")?.to_string(),
        })
    }
}

/// Volume commands relayed over IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeCommand {
    Mute,
    Up,
    Down,
}

impl VolumeCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeCommand::Mute => "mute",
            VolumeCommand::Up => "up",
            VolumeCommand::Down => "down",
        }
    }
}

/// Button URLs for the three volume commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeControls {
    pub mute: String,
    pub up: String,
    pub down: String,
}

impl VolumeControls {
    pub fn url(&self, command: VolumeCommand) -> &str {
        match command {
            VolumeCommand::Mute => &self.mute,
            VolumeCommand::Up => &self.up,
            VolumeCommand::Down => &self.down,
        }
    }
}

/// Commands advertised by `/device/{id}/media`. The bridge has reported them
/// both as a list and as a keyed object.
pub fn enabled_media_commands(response: &Value) -> Vec<String> {
    match response.get("commands") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PinItem {
    #[serde(rename = "ContentType")]
    pub content_type: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "ItemId")]
    pub item_id: Option<String>,
}

/// `/web/pins`, reduced to the pinned items. Entries that fail to decode are
/// dropped individually.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pins {
    pub items: Vec<PinItem>,
}

impl Pins {
    pub fn from_response(response: &Value) -> Self {
        let items = response
            .get("ListItems")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("Item"))
                    .filter_map(|item| serde_json::from_value::<PinItem>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self { items }
    }

    /// Pinned apps as (title, launch uri).
    pub fn apps(&self) -> impl Iterator<Item = (&str, String)> {
        self.items.iter().filter_map(|item| {
            if item.content_type.as_deref() != Some("DApp") {
                return None;
            }
            let title = item.title.as_deref()?;
            let id = item.item_id.as_deref()?;
            Some((title, format!("appx:{}!App", id)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ticks_below_one_second_are_absent() {
        for raw in [0i64, 1, 9_999_999, -20_000_000] {
            assert_eq!(ticks_to_secs(&Number::from(raw)), None, "raw={}", raw);
        }
    }

    #[test]
    fn ticks_convert_exactly() {
        assert_eq!(ticks_to_secs(&Number::from(10_000_000i64)), Some(1.0));
        assert_eq!(ticks_to_secs(&Number::from(25_000_000i64)), Some(2.5));
        assert_eq!(
            ticks_to_secs(&Number::from(36_000_000_000i64)),
            Some(3600.0)
        );
    }

    #[test]
    fn fractional_ticks_are_ignored() {
        let n = Number::from_f64(20_000_000.5).unwrap();
        assert_eq!(ticks_to_secs(&n), None);
    }

    #[test]
    fn focused_title_picks_focus() {
        let status: ConsoleStatus = serde_json::from_value(json!({
            "active_titles": [
                {"name": "Background", "aum": "bg", "type": "App", "has_focus": false},
                {"name": "Halo", "aum": "halo!App", "type": "Game", "image": "http://img", "has_focus": true}
            ]
        }))
        .unwrap();
        let title = status.focused_title().unwrap();
        assert_eq!(title.name.as_deref(), Some("Halo"));
        assert_eq!(title.title_type.as_deref(), Some("Game"));
    }

    #[test]
    fn focused_title_none_without_focus() {
        let status: ConsoleStatus = serde_json::from_value(json!({
            "active_titles": [{"name": "Background", "has_focus": null}]
        }))
        .unwrap();
        assert!(status.focused_title().is_none());
    }

    #[test]
    fn decode_field_absent_and_malformed() {
        let response = json!({"success": true, "console_status": "garbage", "media_status": null});
        assert!(decode_field::<ConsoleStatus>(&response, "console_status").is_none());
        assert!(decode_field::<MediaStatus>(&response, "media_status").is_none());
        assert!(decode_field::<DeviceInfo>(&response, "device").is_none());
    }

    #[test]
    fn ir_controls_skip_envelope_fields() {
        let controls = IrControls::from_response(&json!({
            "success": true,
            "stb": {"buttons": {"btn.ch_up": {"url": "/device/X/ir/stb/btn.ch_up"}}}
        }));
        assert_eq!(controls.devices.len(), 1);
        assert_eq!(
            controls.button_url("stb", "btn.ch_up"),
            Some("/device/X/ir/stb/btn.ch_up")
        );
        assert!(!controls.has_button("stb", "btn.ch_down"));
    }

    #[test]
    fn volume_controls_prefer_avr() {
        let buttons = |prefix: &str| {
            json!({"buttons": {
                "btn.vol_mute": {"url": format!("/{}/mute", prefix)},
                "btn.vol_up": {"url": format!("/{}/up", prefix)},
                "btn.vol_down": {"url": format!("/{}/down", prefix)}
            }})
        };
        let controls =
            IrControls::from_response(&json!({"avr": buttons("avr"), "tv": buttons("tv")}));
        let volume = controls.volume_controls().unwrap();
        assert_eq!(volume.url(VolumeCommand::Up), "/avr/up");

        let tv_only = IrControls::from_response(&json!({"tv": buttons("tv")}));
        assert_eq!(tv_only.volume_controls().unwrap().mute, "/tv/mute");
    }

    #[test]
    fn volume_controls_require_all_buttons() {
        let controls = IrControls::from_response(&json!({
            "tv": {"buttons": {"btn.vol_up": {"url": "/tv/up"}}}
        }));
        assert!(controls.volume_controls().is_none());
        assert!(IrControls::default().volume_controls().is_none());
    }

    #[test]
    fn media_commands_accept_list_or_object() {
        assert_eq!(
            enabled_media_commands(&json!({"commands": ["play", "pause"]})),
            vec!["play", "pause"]
        );
        let mut keyed = enabled_media_commands(&json!({"commands": {"stop": 1, "play": 2}}));
        keyed.sort();
        assert_eq!(keyed, vec!["play", "stop"]);
        assert!(enabled_media_commands(&json!({})).is_empty());
    }

    #[test]
    fn pins_keep_only_dapps() {
        let pins = Pins::from_response(&json!({"ListItems": [
            {"Item": {"ContentType": "DApp", "Title": "Netflix", "ItemId": "4DF9E0F8.Netflix_mcm4njqhnhss8"}},
            {"Item": {"ContentType": "DGame", "Title": "Forza", "ItemId": "forza"}},
            {"Item": {"ContentType": "DApp"}},
            {"NotAnItem": true}
        ]}));
        let apps: Vec<_> = pins.apps().collect();
        assert_eq!(
            apps,
            vec![("Netflix", "appx:4DF9E0F8.Netflix_mcm4njqhnhss8!App".to_string())]
        );
    }
}
