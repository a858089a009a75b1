//! Configuration management

use anyhow::{bail, Result};
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_BRIDGE_PORT: u16 = 5557;
pub const DEFAULT_NAME: &str = "Xbox One SmartGlass";
pub const DEFAULT_SSL: bool = false;
pub const DEFAULT_AUTHENTICATION: bool = true;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Port for the local HTTP API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between console refreshes
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    pub xbox: XboxConfig,
}

fn default_port() -> u16 {
    8089
}

fn default_poll_interval_secs() -> u64 {
    10
}

/// Console and bridge connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct XboxConfig {
    /// Console Live ID
    pub device: String,
    /// Console IP, passed to the bridge as a discovery/power-on hint
    #[serde(default)]
    pub ip_address: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_bridge_port")]
    pub port: u16,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_authentication")]
    pub authentication: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_bridge_port() -> u16 {
    DEFAULT_BRIDGE_PORT
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_authentication() -> bool {
    DEFAULT_AUTHENTICATION
}

impl XboxConfig {
    /// Settings for a console with every optional field at its default.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ip_address: String::new(),
            host: default_host(),
            port: DEFAULT_BRIDGE_PORT,
            name: default_name(),
            ssl: DEFAULT_SSL,
            authentication: DEFAULT_AUTHENTICATION,
        }
    }

    pub fn base_url(&self) -> String {
        let proto = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", proto, self.host, self.port)
    }

    pub fn ip_hint(&self) -> Option<&str> {
        let ip = self.ip_address.trim();
        (!ip.is_empty()).then_some(ip)
    }
}

/// Get config directory (SGB_CONFIG_DIR or platform default)
pub fn get_config_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("SGB_CONFIG_DIR") {
        return std::path::PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home)
                .join("Library/Application Support/smartglass-bridge");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return std::path::PathBuf::from(xdg).join("smartglass-bridge");
        }
        if let Ok(home) = std::env::var("HOME") {
            return std::path::PathBuf::from(home).join(".config/smartglass-bridge");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return std::path::PathBuf::from(appdata).join("smartglass-bridge");
        }
    }

    std::path::PathBuf::from(".")
}

/// Load configuration: defaults, then `<config dir>/config.*`, then `SGB_*`
/// environment variables (`SGB_PORT`, `SGB_XBOX__DEVICE`, ...).
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let builder = ::config::Config::builder()
        .set_default("port", default_port() as i64)?
        .set_default("poll_interval_secs", default_poll_interval_secs() as i64)?
        .set_default("xbox.device", "")?
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        .add_source(
            ::config::Environment::with_prefix("SGB")
                .prefix_separator("_")
                .separator("__"),
        );

    let config: Config = builder.build()?.try_deserialize()?;

    if config.xbox.device.trim().is_empty() {
        bail!("xbox.device (console Live ID) is required; set SGB_XBOX__DEVICE or add it to the config file");
    }
    if config.poll_interval_secs == 0 {
        bail!("poll_interval_secs must be at least 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        for key in [
            "SGB_PORT",
            "SGB_POLL_INTERVAL_SECS",
            "SGB_XBOX__DEVICE",
            "SGB_XBOX__HOST",
            "SGB_XBOX__PORT",
            "SGB_XBOX__SSL",
            "SGB_XBOX__AUTHENTICATION",
            "SGB_XBOX__IP_ADDRESS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_with_device_from_env() {
        clear_env();
        env::set_var("SGB_CONFIG_DIR", "/tmp/sgb-test-nonexistent");
        env::set_var("SGB_XBOX__DEVICE", "FD00112233445566");

        let config = load_config().expect("config should load");

        clear_env();
        env::remove_var("SGB_CONFIG_DIR");

        assert_eq!(config.port, 8089);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.xbox.device, "FD00112233445566");
        assert_eq!(config.xbox.host, "localhost");
        assert_eq!(config.xbox.port, 5557);
        assert_eq!(config.xbox.name, "Xbox One SmartGlass");
        assert!(!config.xbox.ssl);
        assert!(config.xbox.authentication);
        assert_eq!(config.xbox.ip_hint(), None);
        assert_eq!(config.xbox.base_url(), "http://localhost:5557");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("SGB_CONFIG_DIR", "/tmp/sgb-test-nonexistent");
        env::set_var("SGB_XBOX__DEVICE", "FD00112233445566");
        env::set_var("SGB_XBOX__HOST", "10.0.0.5");
        env::set_var("SGB_XBOX__SSL", "true");
        env::set_var("SGB_XBOX__AUTHENTICATION", "false");
        env::set_var("SGB_XBOX__IP_ADDRESS", "192.168.1.20");
        env::set_var("SGB_PORT", "9999");

        let config = load_config().expect("config should load");

        clear_env();
        env::remove_var("SGB_CONFIG_DIR");

        assert_eq!(config.port, 9999);
        assert_eq!(config.xbox.base_url(), "https://10.0.0.5:5557");
        assert!(!config.xbox.authentication);
        assert_eq!(config.xbox.ip_hint(), Some("192.168.1.20"));
    }

    #[test]
    #[serial]
    fn test_missing_device_is_an_error() {
        clear_env();
        env::set_var("SGB_CONFIG_DIR", "/tmp/sgb-test-nonexistent");

        let result = load_config();

        env::remove_var("SGB_CONFIG_DIR");

        let err = result.expect_err("device is required").to_string();
        assert!(err.contains("xbox.device"), "unexpected error: {}", err);
    }

    #[test]
    fn test_base_url_scheme() {
        let mut config = XboxConfig::new("abc");
        assert_eq!(config.base_url(), "http://localhost:5557");
        config.ssl = true;
        config.port = 443;
        assert_eq!(config.base_url(), "https://localhost:443");
    }
}
