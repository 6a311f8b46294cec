//! Node server settings, read from the host's custom parameters.

use std::collections::HashMap;
use std::time::Duration;

use log::{LevelFilter, info};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Settings for one node server instance.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use hue_node_rs::Settings;
///
/// let params = HashMap::from([
///     ("bridges".to_string(), r#"["192.168.1.10", "192.168.1.11"]"#.to_string()),
///     ("poll_interval".to_string(), "5".to_string()),
/// ]);
/// let settings = Settings::from_params(&params).unwrap();
/// assert_eq!(settings.bridges.len(), 2);
/// assert_eq!(settings.poll_interval.as_secs(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Configured bridge addresses; empty means auto-discover one bridge.
    pub bridges: Vec<String>,
    /// Credential seed from the legacy `ip`/`username` parameters.
    pub seed_credentials: HashMap<String, String>,
    pub debug: bool,
    /// Treat "on" as a no-op for lights already on.
    pub ignore_duplicate_on: bool,
    pub poll_interval: Duration,
    /// Application name used when registering with a bridge.
    pub devicetype: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bridges: Vec::new(),
            seed_credentials: HashMap::new(),
            debug: false,
            ignore_duplicate_on: false,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            devicetype: Self::DEFAULT_DEVICETYPE.to_string(),
        }
    }
}

impl Settings {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_DEVICETYPE: &'static str = "hue-node-rs#node";

    /// Build settings from the host's string parameters.
    ///
    /// Unknown keys are ignored. The legacy `ip` parameter adds one bridge
    /// address, and `username` becomes that bridge's stored credential.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(raw) = non_empty(params, "bridges") {
            settings.bridges = serde_json::from_str(raw)
                .map_err(|e| Error::invalid_setting("bridges", e))?;
        }

        if let Some(ip) = non_empty(params, "ip") {
            info!("Custom bridge address specified: {}", ip);
            if !settings.bridges.iter().any(|b| b == ip) {
                settings.bridges.push(ip.to_string());
            }
            if let Some(username) = non_empty(params, "username") {
                info!("Custom bridge username specified for {}", ip);
                settings
                    .seed_credentials
                    .insert(ip.to_string(), username.to_string());
            }
        }

        if let Some(raw) = non_empty(params, "debug") {
            settings.debug = parse_flag("debug", raw)?;
        }

        if let Some(raw) = non_empty(params, "ignore_duplicate_on") {
            settings.ignore_duplicate_on = parse_flag("ignore_duplicate_on", raw)?;
        }

        if let Some(raw) = non_empty(params, "poll_interval") {
            let secs: u64 = raw
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| Error::invalid_setting("poll_interval", raw))?;
            settings.poll_interval = Duration::from_secs(secs);
        }

        if let Some(raw) = non_empty(params, "devicetype") {
            settings.devicetype = raw.to_string();
        }

        Ok(settings)
    }

    /// Raise or restore the global log level.
    pub fn apply_log_level(&self) {
        if self.debug {
            log::set_max_level(LevelFilter::Debug);
        } else {
            log::set_max_level(LevelFilter::Info);
        }
    }

    /// Bridge list as passed to the registry; `None` means auto-discover.
    pub fn configured_bridges(&self) -> Option<&[String]> {
        if self.bridges.is_empty() {
            None
        } else {
            Some(&self.bridges)
        }
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_setting(key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_params(&HashMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.configured_bridges().is_none());
        assert_eq!(settings.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_legacy_ip_and_username() {
        let settings =
            Settings::from_params(&params(&[("ip", "10.0.0.2"), ("username", "abc123")])).unwrap();
        assert_eq!(settings.configured_bridges(), Some(&["10.0.0.2".to_string()][..]));
        assert_eq!(
            settings.seed_credentials.get("10.0.0.2").map(String::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn test_legacy_ip_not_duplicated() {
        let settings = Settings::from_params(&params(&[
            ("bridges", r#"["10.0.0.2"]"#),
            ("ip", "10.0.0.2"),
        ]))
        .unwrap();
        assert_eq!(settings.bridges.len(), 1);
    }

    #[test]
    fn test_flags() {
        let settings = Settings::from_params(&params(&[
            ("debug", "true"),
            ("ignore_duplicate_on", "1"),
        ]))
        .unwrap();
        assert!(settings.debug);
        assert!(settings.ignore_duplicate_on);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            Settings::from_params(&params(&[("poll_interval", "0")])).unwrap_err(),
            Error::invalid_setting("poll_interval", "0")
        );
        assert!(Settings::from_params(&params(&[("bridges", "10.0.0.2")])).is_err());
        assert!(Settings::from_params(&params(&[("debug", "maybe")])).is_err());
    }
}
