//! SmartGlass REST bridge client
//!
//! Polls the bridge (xbox-smartglass-rest) for one console and keeps the
//! latest view of it as an immutable [`ConsoleSnapshot`].
//!
//! ## Snapshot publication
//!
//! `refresh()` builds the next snapshot privately and publishes it in one
//! `watch::Sender::send_replace`, so readers see either the previous or the
//! next snapshot, never a mix. Refreshes are serialized by an async mutex;
//! a second caller waits for the in-flight cycle instead of racing it.
//!
//! ## Caches
//!
//! - pins: fetched once, reused until process restart
//! - IR controls: fetched on the first connected refresh, dropped whenever
//!   the console or the bridge becomes unavailable
//! - incompatible server version: latched for the process lifetime

use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::XboxConfig;
use crate::smartglass::error::{Result, SmartGlassError};
use crate::smartglass::models::{
    decode_field, enabled_media_commands, flag, is_success, ActiveTitle, ConnectionState,
    ConsoleStatus, DeviceInfo, IrControls, MediaStatus, Pins, VolumeCommand, VolumeControls,
};
use crate::smartglass::registry::AppRegistry;
use crate::smartglass::version::{is_supported, MIN_REQUIRED_SERVER_VERSION};

/// Placeholder the bridge paths use for the console Live ID.
pub const LIVE_ID_PLACEHOLDER: &str = "<liveid>";

/// Version key reported by `/versions`.
const CORE_VERSION_KEY: &str = "xbox-smartglass-core";

/// Everything known about the console after the last refresh.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleSnapshot {
    pub server_up: bool,
    /// Cleared permanently once the bridge reports a too-old core version.
    pub server_compatible: bool,
    pub server_version: Option<String>,
    pub available: bool,
    pub connected: bool,
    pub device: Option<DeviceInfo>,
    pub console_status: Option<ConsoleStatus>,
    pub media_status: Option<MediaStatus>,
    pub ir_controls: Option<IrControls>,
    pub apps: AppRegistry,
}

impl Default for ConsoleSnapshot {
    fn default() -> Self {
        Self {
            server_up: false,
            server_compatible: true,
            server_version: None,
            available: false,
            connected: false,
            device: None,
            console_status: None,
            media_status: None,
            ir_controls: None,
            apps: AppRegistry::seeded(),
        }
    }
}

impl ConsoleSnapshot {
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_flags(self.available, self.connected)
    }

    fn focused_title(&self) -> Option<&ActiveTitle> {
        self.console_status.as_ref()?.focused_title()
    }

    pub fn active_app(&self) -> Option<&str> {
        self.focused_title()?.name.as_deref()
    }

    /// Empty image strings count as no image.
    pub fn active_app_image(&self) -> Option<&str> {
        self.focused_title()?
            .image
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn active_app_type(&self) -> Option<&str> {
        self.focused_title()?.title_type.as_deref()
    }

    pub fn media_playback_state(&self) -> Option<&str> {
        self.media_status.as_ref()?.playback_status.as_deref()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_status.as_ref()?.media_type.as_deref()
    }

    pub fn media_position(&self) -> Option<f64> {
        self.media_status.as_ref()?.position_secs()
    }

    pub fn media_duration(&self) -> Option<f64> {
        self.media_status.as_ref()?.duration_secs()
    }

    pub fn media_title(&self) -> Option<&str> {
        self.media_status.as_ref()?.title()
    }

    pub fn volume_controls(&self) -> Option<VolumeControls> {
        self.ir_controls.as_ref()?.volume_controls()
    }

    fn mark_unavailable(&mut self) {
        self.available = false;
        self.connected = false;
        self.device = None;
        self.console_status = None;
        self.media_status = None;
        self.ir_controls = None;
    }
}

/// State only the refresh cycle touches. Holding its lock is what
/// serializes refreshes.
#[derive(Default)]
struct RefreshState {
    pins: Option<Pins>,
}

/// Client for one console behind the REST bridge.
pub struct SmartGlassClient {
    http: Client,
    base_url: Url,
    live_id: String,
    ip_hint: Option<String>,
    auth_enabled: bool,
    snapshot: watch::Sender<Arc<ConsoleSnapshot>>,
    refresh_state: Mutex<RefreshState>,
}

impl SmartGlassClient {
    pub fn new(config: &XboxConfig) -> Result<Self> {
        let base = config.base_url();
        let base_url = Url::parse(&base).map_err(|source| SmartGlassError::InvalidUrl {
            url: base.clone(),
            source,
        })?;
        let http = Client::builder().build()?;
        let (snapshot, _) = watch::channel(Arc::new(ConsoleSnapshot::default()));

        Ok(Self {
            http,
            base_url,
            live_id: config.device.clone(),
            ip_hint: config.ip_hint().map(str::to_string),
            auth_enabled: config.authentication,
            snapshot,
            refresh_state: Mutex::new(RefreshState::default()),
        })
    }

    pub fn live_id(&self) -> &str {
        &self.live_id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<ConsoleSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConsoleSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn is_server_up(&self) -> bool {
        self.snapshot.borrow().server_up
    }

    pub fn available(&self) -> bool {
        self.snapshot.borrow().available
    }

    pub fn connected(&self) -> bool {
        self.snapshot.borrow().connected
    }

    pub fn all_apps(&self) -> AppRegistry {
        self.snapshot.borrow().apps.clone()
    }

    fn ip_params(&self) -> Vec<(&'static str, String)> {
        match &self.ip_hint {
            Some(ip) => vec![("addr", ip.clone())],
            None => Vec::new(),
        }
    }

    // =========================================================================
    // HTTP boundary
    // =========================================================================

    /// Substitute the Live ID and join onto the base URL. Absolute URLs pass
    /// through unchanged.
    pub fn resolve_url(&self, endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.replace(LIVE_ID_PLACEHOLDER, &self.live_id);
        self.base_url
            .join(&endpoint)
            .map_err(|source| SmartGlassError::InvalidUrl {
                url: endpoint,
                source,
            })
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.resolve_url(endpoint)?;
        debug!(url = %url, ?params, "SmartGlass request");

        let mut request = self.http.get(url.clone());
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = request.send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SmartGlassError::Status {
                status,
                url: url.to_string(),
                body,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| SmartGlassError::Json {
            url: url.to_string(),
            source,
        })
    }

    /// GET an endpoint. Any failure is logged and yields an empty object,
    /// which callers treat as "no data".
    pub async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Value {
        match self.request(endpoint, params).await {
            Ok(value) => value,
            Err(SmartGlassError::Status { status, url, body }) => {
                warn!("Invalid status_code {} from url {}", status, url);
                warn!("{}", body);
                Value::Object(Map::new())
            }
            Err(e) => {
                warn!("{}", e);
                Value::Object(Map::new())
            }
        }
    }

    // =========================================================================
    // Refresh cycle
    // =========================================================================

    /// Run one full update cycle and publish the resulting snapshot.
    /// Never fails; problems degrade the console to unavailable.
    pub async fn refresh(&self) {
        let mut state = self.refresh_state.lock().await;
        let mut next = (*self.snapshot()).clone();

        if !self.check_server(&mut next).await {
            // Bridge lost: nothing from the last poll can be trusted. A
            // latched incompatible server is left untouched.
            if next.server_compatible {
                next.mark_unavailable();
            }
            self.snapshot.send_replace(Arc::new(next));
            return;
        }

        self.check_authentication().await;
        self.refresh_device_list().await;
        next.apps = self
            .refresh_all_apps(&mut state, next.console_status.as_ref())
            .await;

        match self.get_device_info().await {
            Some(device) if !device.is_unavailable() => {
                next.available = true;
                next.connected = if device.is_connected() {
                    true
                } else {
                    let connected = self.connect().await;
                    if !connected {
                        error!("Failed to connect to {}", self.live_id);
                    }
                    connected
                };
                next.device = Some(device);
            }
            _ => next.mark_unavailable(),
        }

        if next.available && next.connected {
            if let Some(status) = self.fetch_console_status().await {
                next.console_status = Some(status);
            }
            if let Some(status) = self.fetch_media_status().await {
                next.media_status = Some(status);
            }
            if next.ir_controls.is_none() {
                next.ir_controls = self.fetch_ir_controls().await;
            }
        }

        debug!(
            live_id = %self.live_id,
            state = ?next.connection_state(),
            apps = next.apps.names().len(),
            "Refresh complete"
        );
        self.snapshot.send_replace(Arc::new(next));
    }

    /// Reachability and minimum-version check. Updates `server_up` and the
    /// compatibility latch on `next`.
    async fn check_server(&self, next: &mut ConsoleSnapshot) -> bool {
        if !next.server_compatible {
            return false;
        }

        let response = self.get("/versions", &[]).await;
        let Some(version) = response
            .get("versions")
            .and_then(|v| v.get(CORE_VERSION_KEY))
            .and_then(Value::as_str)
        else {
            next.server_up = false;
            return false;
        };

        next.server_version = Some(version.to_string());
        if !is_supported(version) {
            error!(
                "Invalid xbox-smartglass-core version: {}. Min Required: {}",
                version, MIN_REQUIRED_SERVER_VERSION
            );
            next.server_compatible = false;
            next.server_up = false;
            return false;
        }

        if !next.server_up {
            info!("SmartGlass bridge reachable at {} (core {})", self.base_url, version);
        }
        next.server_up = true;
        true
    }

    async fn check_authentication(&self) -> bool {
        let response = self.get("/auth", &[]).await;
        if flag(&response, "authenticated") {
            return true;
        }

        let response = self.get("/auth/refresh", &[]).await;
        if is_success(&response) {
            return true;
        }

        error!("Refreshing authentication tokens failed!");
        false
    }

    async fn refresh_device_list(&self) {
        self.get("/device", &self.ip_params()).await;
    }

    async fn refresh_all_apps(
        &self,
        state: &mut RefreshState,
        console_status: Option<&ConsoleStatus>,
    ) -> AppRegistry {
        if state.pins.is_none() && self.check_authentication().await {
            let response = self.get("/web/pins", &[]).await;
            if response.as_object().is_some_and(|m| !m.is_empty()) {
                state.pins = Some(Pins::from_response(&response));
            }
        }

        AppRegistry::build(state.pins.as_ref(), console_status)
    }

    async fn get_device_info(&self) -> Option<DeviceInfo> {
        let response = self.get("/device/<liveid>", &[]).await;
        if !is_success(&response) {
            debug!("Console {} not available", self.live_id);
            return None;
        }
        decode_field(&response, "device")
    }

    async fn connect(&self) -> bool {
        if self.auth_enabled && !self.check_authentication().await {
            return false;
        }

        let mut params = Vec::new();
        if !self.auth_enabled {
            params.push(("anonymous", "True".to_string()));
        }

        let response = self.get("/device/<liveid>/connect", &params).await;
        if !is_success(&response) {
            error!("Failed to connect to console {}: {}", self.live_id, response);
            return false;
        }
        true
    }

    async fn fetch_console_status(&self) -> Option<ConsoleStatus> {
        let response = self.get("/device/<liveid>/console_status", &[]).await;
        if !is_success(&response) {
            error!("Console {} not available", self.live_id);
            return None;
        }
        decode_field(&response, "console_status")
    }

    async fn fetch_media_status(&self) -> Option<MediaStatus> {
        let response = self.get("/device/<liveid>/media_status", &[]).await;
        if !is_success(&response) {
            error!("Console {} not available", self.live_id);
            return None;
        }
        decode_field(&response, "media_status")
    }

    async fn fetch_ir_controls(&self) -> Option<IrControls> {
        let response = self.get("/device/<liveid>/ir", &[]).await;
        if !is_success(&response) {
            error!("Console {} not available", self.live_id);
            return None;
        }
        Some(IrControls::from_response(&response))
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn success_or_none(response: Value) -> Option<Value> {
        is_success(&response).then_some(response)
    }

    pub async fn power_on(&self) -> Option<Value> {
        let response = self
            .get("/device/<liveid>/poweron", &self.ip_params())
            .await;
        if !is_success(&response) {
            error!("Failed to poweron {}", self.live_id);
            return None;
        }
        Some(response)
    }

    pub async fn power_off(&self) -> Option<Value> {
        let response = self.get("/device/<liveid>/poweroff", &[]).await;
        if !is_success(&response) {
            error!("Failed to poweroff {}", self.live_id);
            return None;
        }
        Some(response)
    }

    /// Press an IR button on a paired device (`stb`, `tv`, `avr`).
    /// The button must be listed in the current IR capabilities.
    pub async fn ir_command(&self, device: &str, command: &str) -> Option<Value> {
        let response = self.get("/device/<liveid>/ir", &[]).await;
        if !is_success(&response) {
            return None;
        }

        let controls = IrControls::from_response(&response);
        if !controls.has_button(device, command) {
            error!(
                "Provided command {} not enabled for current ir device {}",
                command, device
            );
            return None;
        }
        let Some(url) = controls.button_url(device, command) else {
            error!("IR button {} on {} has no url", command, device);
            return None;
        };

        Self::success_or_none(self.get(url, &[]).await)
    }

    /// Send a media transport command (`play`, `pause`, `next_track`, ...).
    pub async fn media_command(&self, command: &str) -> Option<Value> {
        let response = self.get("/device/<liveid>/media", &[]).await;
        if !is_success(&response) {
            return None;
        }

        if !enabled_media_commands(&response).iter().any(|c| c == command) {
            error!("Provided command {} not enabled for current media", command);
            return None;
        }

        let endpoint = format!("/device/<liveid>/media/{}", command);
        Self::success_or_none(self.get(&endpoint, &[]).await)
    }

    /// Press a volume button from the cached IR snapshot.
    pub async fn volume_command(&self, command: VolumeCommand) -> Option<Value> {
        let Some(controls) = self.snapshot().volume_controls() else {
            debug!("No volume controls for {}, ignoring {}", self.live_id, command.as_str());
            return None;
        };
        Self::success_or_none(self.get(controls.url(command), &[]).await)
    }

    /// Launch by registry display name or literal launch URI.
    pub async fn launch_title(&self, name_or_uri: &str) -> Option<Value> {
        let snapshot = self.snapshot();
        let uri = snapshot.apps.resolve(name_or_uri);
        let endpoint = format!("/device/<liveid>/launch/{}", uri);
        Self::success_or_none(self.get(&endpoint, &[]).await)
    }
}
