//! Media-player view of the console
//!
//! [`XboxOnePlayer`] re-derives every property from the client's latest
//! snapshot on each read; nothing derived is cached. Each getter reads a
//! single snapshot, and [`XboxOnePlayer::view`] evaluates all properties
//! against one snapshot for a consistent picture.

mod features;

pub use features::MediaPlayerFeatures;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::XboxConfig;
use crate::smartglass::client::{ConsoleSnapshot, SmartGlassClient};
use crate::smartglass::error::Result;
use crate::smartglass::models::VolumeCommand;
use crate::smartglass::registry::{HOME_APP, TV_APP};

/// Externally visible player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Off,
    On,
    Idle,
    Playing,
    Paused,
    Unknown,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Off => "off",
            PlayerState::On => "on",
            PlayerState::Idle => "idle",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Unknown => "unknown",
        }
    }

    /// Playing or paused: the states where media metadata is meaningful.
    pub fn is_active_media(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }

    /// Map a bridge `playback_status`. Unrecognized values yield `None`.
    pub fn from_playback_status(status: &str) -> Option<Self> {
        match status {
            "Closed" | "Changing" | "Stopped" => Some(PlayerState::Idle),
            "Playing" => Some(PlayerState::Playing),
            "Paused" => Some(PlayerState::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the player state. First match wins:
/// 1. a recognized media playback status
/// 2. console reachable: On for apps, games and Home, otherwise Unknown
/// 3. Off
pub fn derive_state(
    playback_status: Option<&str>,
    connected: bool,
    available: bool,
    active_app_type: Option<&str>,
    active_app: Option<&str>,
) -> PlayerState {
    if let Some(state) = playback_status.and_then(PlayerState::from_playback_status) {
        return state;
    }

    if connected || available {
        let is_app = matches!(active_app_type, Some("Application" | "App" | "Game"));
        if is_app || active_app == Some(HOME_APP) {
            PlayerState::On
        } else {
            PlayerState::Unknown
        }
    } else {
        PlayerState::Off
    }
}

pub fn snapshot_state(snapshot: &ConsoleSnapshot) -> PlayerState {
    derive_state(
        snapshot.media_playback_state(),
        snapshot.connected,
        snapshot.available,
        snapshot.active_app_type(),
        snapshot.active_app(),
    )
}

/// Supported features for a snapshot, starting from the full set:
/// - track skipping only while playing/paused, or inside a non-Home app
/// - volume mute/step only with IR volume controls
pub fn snapshot_features(snapshot: &ConsoleSnapshot) -> MediaPlayerFeatures {
    let state = snapshot_state(snapshot);
    let mut features = MediaPlayerFeatures::SUPPORT_XBOXONE;

    let in_app = matches!(snapshot.active_app_type(), Some("Application" | "App"));
    if !state.is_active_media() && (!in_app || snapshot.active_app() == Some(HOME_APP)) {
        features.remove(MediaPlayerFeatures::NEXT_TRACK | MediaPlayerFeatures::PREVIOUS_TRACK);
    }

    if snapshot.volume_controls().is_none() {
        features.remove(MediaPlayerFeatures::VOLUME_MUTE | MediaPlayerFeatures::VOLUME_STEP);
    }

    features
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaContentType {
    Music,
    Video,
}

impl MediaContentType {
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "Music" => Some(MediaContentType::Music),
            "Video" => Some(MediaContentType::Video),
            _ => None,
        }
    }
}

/// Commands the player accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    TurnOn,
    TurnOff,
    Mute,
    VolumeUp,
    VolumeDown,
    Play,
    Pause,
    Stop,
    PlayPause,
    Previous,
    Next,
    SelectSource(String),
}

impl PlayerCommand {
    /// Parse a control action name. Source selection needs an argument and is
    /// not parsed here.
    pub fn parse(action: &str) -> Option<Self> {
        Some(match action {
            "turn_on" | "power_on" => PlayerCommand::TurnOn,
            "turn_off" | "power_off" => PlayerCommand::TurnOff,
            "mute" => PlayerCommand::Mute,
            "volume_up" | "vol_up" => PlayerCommand::VolumeUp,
            "volume_down" | "vol_down" => PlayerCommand::VolumeDown,
            "play" => PlayerCommand::Play,
            "pause" => PlayerCommand::Pause,
            "stop" => PlayerCommand::Stop,
            "play_pause" => PlayerCommand::PlayPause,
            "previous" | "prev" | "previous_track" => PlayerCommand::Previous,
            "next" | "next_track" => PlayerCommand::Next,
            _ => return None,
        })
    }
}

/// All entity properties, evaluated against one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub unique_id: String,
    pub should_poll: bool,
    pub state: PlayerState,
    pub supported_features: u32,
    pub features: Vec<&'static str>,
    pub media_content_type: Option<MediaContentType>,
    pub media_duration: Option<f64>,
    pub media_position: Option<f64>,
    pub media_position_updated_at: Option<DateTime<Utc>>,
    pub media_title: Option<String>,
    pub media_image_url: Option<String>,
    pub source: Option<String>,
    pub source_list: Vec<String>,
}

/// Xbox One console presented as a media player.
pub struct XboxOnePlayer {
    client: SmartGlassClient,
    name: String,
    live_id: String,
}

impl XboxOnePlayer {
    pub fn new(config: &XboxConfig) -> Result<Self> {
        Ok(Self::with_client(
            SmartGlassClient::new(config)?,
            config.name.clone(),
        ))
    }

    pub fn with_client(client: SmartGlassClient, name: String) -> Self {
        let live_id = client.live_id().to_string();
        Self {
            client,
            name,
            live_id,
        }
    }

    pub fn client(&self) -> &SmartGlassClient {
        &self.client
    }

    fn snapshot(&self) -> Arc<ConsoleSnapshot> {
        self.client.snapshot()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Console Live ID
    pub fn unique_id(&self) -> &str {
        &self.live_id
    }

    pub fn should_poll(&self) -> bool {
        true
    }

    pub fn state(&self) -> PlayerState {
        snapshot_state(&self.snapshot())
    }

    pub fn supported_features(&self) -> MediaPlayerFeatures {
        snapshot_features(&self.snapshot())
    }

    pub fn media_content_type(&self) -> Option<MediaContentType> {
        let snapshot = self.snapshot();
        if !snapshot_state(&snapshot).is_active_media() {
            return None;
        }
        snapshot
            .media_type()
            .and_then(MediaContentType::from_media_type)
    }

    /// Duration in seconds
    pub fn media_duration(&self) -> Option<f64> {
        let snapshot = self.snapshot();
        snapshot_state(&snapshot)
            .is_active_media()
            .then(|| snapshot.media_duration())
            .flatten()
    }

    /// Position in seconds
    pub fn media_position(&self) -> Option<f64> {
        let snapshot = self.snapshot();
        snapshot_state(&snapshot)
            .is_active_media()
            .then(|| snapshot.media_position())
            .flatten()
    }

    /// Time of this read; the console does not timestamp positions.
    pub fn media_position_updated_at(&self) -> Option<DateTime<Utc>> {
        self.state().is_active_media().then(Utc::now)
    }

    pub fn media_image_url(&self) -> Option<String> {
        self.snapshot().active_app_image().map(str::to_string)
    }

    /// Media title while playing/paused, otherwise the active app name.
    pub fn media_title(&self) -> Option<String> {
        let snapshot = self.snapshot();
        if snapshot_state(&snapshot).is_active_media() {
            snapshot.media_title().map(str::to_string)
        } else {
            snapshot.active_app().map(str::to_string)
        }
    }

    pub fn source(&self) -> Option<String> {
        self.snapshot().active_app().map(str::to_string)
    }

    pub fn source_list(&self) -> Vec<String> {
        self.snapshot().apps.names()
    }

    pub fn view(&self) -> PlayerView {
        let snapshot = self.snapshot();
        let state = snapshot_state(&snapshot);
        let features = snapshot_features(&snapshot);
        let media = state.is_active_media();

        PlayerView {
            name: self.name.clone(),
            unique_id: self.live_id.clone(),
            should_poll: self.should_poll(),
            state,
            supported_features: features.bits(),
            features: features.names(),
            media_content_type: if media {
                snapshot
                    .media_type()
                    .and_then(MediaContentType::from_media_type)
            } else {
                None
            },
            media_duration: if media { snapshot.media_duration() } else { None },
            media_position: if media { snapshot.media_position() } else { None },
            media_position_updated_at: media.then(Utc::now),
            media_title: if media {
                snapshot.media_title().map(str::to_string)
            } else {
                snapshot.active_app().map(str::to_string)
            },
            media_image_url: snapshot.active_app_image().map(str::to_string),
            source: snapshot.active_app().map(str::to_string),
            source_list: snapshot.apps.names(),
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn update(&self) {
        self.client.refresh().await;
    }

    pub async fn turn_on(&self) -> Option<Value> {
        self.client.power_on().await
    }

    pub async fn turn_off(&self) -> Option<Value> {
        self.client.power_off().await
    }

    /// The IR mute button toggles; the requested flag cannot be honored.
    pub async fn mute_volume(&self, _mute: bool) -> Option<Value> {
        self.client.volume_command(VolumeCommand::Mute).await
    }

    pub async fn volume_up(&self) -> Option<Value> {
        self.client.volume_command(VolumeCommand::Up).await
    }

    pub async fn volume_down(&self) -> Option<Value> {
        self.client.volume_command(VolumeCommand::Down).await
    }

    pub async fn media_play(&self) -> Option<Value> {
        self.client.media_command("play").await
    }

    pub async fn media_pause(&self) -> Option<Value> {
        self.client.media_command("pause").await
    }

    pub async fn media_stop(&self) -> Option<Value> {
        self.client.media_command("stop").await
    }

    pub async fn media_play_pause(&self) -> Option<Value> {
        self.client.media_command("play_pause").await
    }

    /// On live TV this is channel down on the set-top box.
    pub async fn media_previous_track(&self) -> Option<Value> {
        if self.source().as_deref() == Some(TV_APP) {
            self.client.ir_command("stb", "btn.ch_down").await
        } else {
            self.client.media_command("prev_track").await
        }
    }

    /// On live TV this is channel up on the set-top box.
    pub async fn media_next_track(&self) -> Option<Value> {
        if self.source().as_deref() == Some(TV_APP) {
            self.client.ir_command("stb", "btn.ch_up").await
        } else {
            self.client.media_command("next_track").await
        }
    }

    pub async fn select_source(&self, source: &str) -> Option<Value> {
        self.client.launch_title(source).await
    }

    pub async fn execute(&self, command: PlayerCommand) -> Option<Value> {
        debug!(live_id = %self.live_id, ?command, "Player command");
        match command {
            PlayerCommand::TurnOn => self.turn_on().await,
            PlayerCommand::TurnOff => self.turn_off().await,
            PlayerCommand::Mute => self.mute_volume(true).await,
            PlayerCommand::VolumeUp => self.volume_up().await,
            PlayerCommand::VolumeDown => self.volume_down().await,
            PlayerCommand::Play => self.media_play().await,
            PlayerCommand::Pause => self.media_pause().await,
            PlayerCommand::Stop => self.media_stop().await,
            PlayerCommand::PlayPause => self.media_play_pause().await,
            PlayerCommand::Previous => self.media_previous_track().await,
            PlayerCommand::Next => self.media_next_track().await,
            PlayerCommand::SelectSource(source) => self.select_source(&source).await,
        }
    }
}
