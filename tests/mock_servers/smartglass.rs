//! Mock SmartGlass REST bridge
//!
//! Serves canned JSON per path and records every request (path + query) so
//! tests can assert exactly which calls the client made. Unknown paths get a
//! 404 with `{"success": false}`. A key ending in `*` matches any path with
//! that prefix.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use smartglass_bridge::config::XboxConfig;

pub const LIVE_ID: &str = "FD00112233445566";

#[derive(Debug, Clone)]
pub enum MockResponse {
    Json(Value),
    Raw(StatusCode, String),
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, MockResponse>,
    requests: Vec<String>,
}

impl MockState {
    fn lookup(&self, path: &str) -> Option<MockResponse> {
        if let Some(response) = self.responses.get(path) {
            return Some(response.clone());
        }
        self.responses
            .iter()
            .filter_map(|(key, response)| {
                let prefix = key.strip_suffix('*')?;
                path.starts_with(prefix).then_some((prefix.len(), response))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, response)| response.clone())
    }
}

pub struct MockSmartGlassServer {
    addr: SocketAddr,
    state: Arc<RwLock<MockState>>,
    handle: JoinHandle<()>,
}

/// `/device/<LIVE_ID>` + suffix
pub fn device_path(suffix: &str) -> String {
    format!("/device/{}{}", LIVE_ID, suffix)
}

impl MockSmartGlassServer {
    /// Start with no routes configured (every request 404s)
    pub async fn start() -> Self {
        let state = Arc::new(RwLock::new(MockState::default()));

        let app = Router::new()
            .fallback(handle_request)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Start with a reachable bridge and a connected console watching Netflix.
    pub async fn start_healthy() -> Self {
        let server = Self::start().await;
        server.load_healthy_fixture().await;
        server
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Client settings pointing at this server
    pub fn config(&self) -> XboxConfig {
        XboxConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            ..XboxConfig::new(LIVE_ID)
        }
    }

    pub async fn set_response(&self, path: &str, body: Value) {
        self.state
            .write()
            .await
            .responses
            .insert(path.to_string(), MockResponse::Json(body));
    }

    pub async fn set_raw_response(&self, path: &str, status: StatusCode, body: &str) {
        self.state
            .write()
            .await
            .responses
            .insert(path.to_string(), MockResponse::Raw(status, body.to_string()));
    }

    pub async fn remove_response(&self, path: &str) {
        self.state.write().await.responses.remove(path);
    }

    /// Recorded requests as `path?query`
    pub async fn requests(&self) -> Vec<String> {
        self.state.read().await.requests.clone()
    }

    /// Recorded request paths without query strings
    pub async fn request_paths(&self) -> Vec<String> {
        self.requests()
            .await
            .into_iter()
            .map(|r| r.split('?').next().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn count(&self, path: &str) -> usize {
        self.request_paths()
            .await
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    pub async fn clear_requests(&self) {
        self.state.write().await.requests.clear();
    }

    pub async fn set_device(&self, device_status: &str, connection_state: &str) {
        self.set_response(
            &device_path(""),
            json!({
                "success": true,
                "device": {
                    "device_status": device_status,
                    "connection_state": connection_state,
                    "name": "XboxOne",
                    "address": "192.168.1.20"
                }
            }),
        )
        .await;
    }

    pub async fn set_focused_title(&self, name: &str, title_type: &str, aum: &str) {
        self.set_response(
            &device_path("/console_status"),
            json!({
                "success": true,
                "console_status": {
                    "active_titles": [{
                        "name": name,
                        "aum": aum,
                        "type": title_type,
                        "image": format!("http://store-images/{}.png", name.to_lowercase()),
                        "has_focus": true
                    }]
                }
            }),
        )
        .await;
    }

    pub async fn set_playback(&self, playback_status: Option<&str>) {
        let media_status = match playback_status {
            Some(status) => json!({
                "playback_status": status,
                "media_type": "Video",
                "position": 600_000_000i64,
                "media_end": 36_000_000_000i64,
                "metadata": {"title": "Stranger Things"}
            }),
            None => json!({}),
        };
        self.set_response(
            &device_path("/media_status"),
            json!({"success": true, "media_status": media_status}),
        )
        .await;
    }

    async fn load_healthy_fixture(&self) {
        let ok = json!({"success": true});

        self.set_response(
            "/versions",
            json!({"versions": {"xbox-smartglass-core": "1.2.1", "xbox-smartglass-rest": "0.9.9"}}),
        )
        .await;
        self.set_response("/auth", json!({"authenticated": true}))
            .await;
        self.set_response("/auth/refresh", ok.clone()).await;
        self.set_response("/device", json!({"success": true, "devices": {}}))
            .await;
        self.set_response(
            "/web/pins",
            json!({"ListItems": [
                {"Item": {"ContentType": "DApp", "Title": "Netflix", "ItemId": "4DF9E0F8.Netflix_mcm4njqhnhss8"}},
                {"Item": {"ContentType": "DGame", "Title": "Forza Horizon 4", "ItemId": "Forza"}}
            ]}),
        )
        .await;

        self.set_device("Available", "Connected").await;
        self.set_response(&device_path("/connect"), ok.clone()).await;
        self.set_focused_title(
            "Netflix",
            "Application",
            "4DF9E0F8.Netflix_mcm4njqhnhss8!App",
        )
        .await;
        self.set_playback(Some("Playing")).await;

        let button = |class: &str, name: &str| {
            json!({"url": device_path(&format!("/ir/{}/{}", class, name))})
        };
        self.set_response(
            &device_path("/ir"),
            json!({
                "success": true,
                "avr": {"buttons": {
                    "btn.vol_mute": button("avr", "btn.vol_mute"),
                    "btn.vol_up": button("avr", "btn.vol_up"),
                    "btn.vol_down": button("avr", "btn.vol_down")
                }},
                "stb": {"buttons": {
                    "btn.ch_up": button("stb", "btn.ch_up"),
                    "btn.ch_down": button("stb", "btn.ch_down")
                }}
            }),
        )
        .await;
        self.set_response(&device_path("/ir/*"), ok.clone()).await;

        self.set_response(
            &device_path("/media"),
            json!({
                "success": true,
                "commands": ["play", "pause", "play_pause", "stop", "next_track", "prev_track"]
            }),
        )
        .await;
        self.set_response(&device_path("/media/*"), ok.clone()).await;

        self.set_response(&device_path("/poweron"), ok.clone()).await;
        self.set_response(&device_path("/poweroff"), ok.clone()).await;
        self.set_response(&device_path("/launch/*"), ok).await;
    }

    pub async fn stop(self) {
        self.handle.abort();
    }
}

async fn handle_request(State(state): State<Arc<RwLock<MockState>>>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let recorded = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let response = {
        let mut state = state.write().await;
        state.requests.push(recorded);
        state.lookup(&path)
    };

    match response {
        Some(MockResponse::Json(body)) => (StatusCode::OK, Json(body)).into_response(),
        Some(MockResponse::Raw(status, body)) => (status, body).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"success": false}))).into_response(),
    }
}
