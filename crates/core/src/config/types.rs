use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::jobs::PipelineConfig;
use crate::maintenance::MonitorConfig;
use crate::runtime::RuntimeConfig;
use crate::schedule::OperatingHoursConfig;

/// Port used when the configured UDP port is unusable.
pub const DEFAULT_UDP_PORT: u16 = 8000;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub screens: ScreensConfig,
    #[serde(default)]
    pub maintenance: MonitorConfig,
    #[serde(default)]
    pub jobs: PipelineConfig,
    #[serde(default)]
    pub udp: UdpConfig,
    #[serde(default)]
    pub operating_hours: Option<OperatingHoursConfig>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Job server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL; also the health probe target.
    pub url: String,
}

/// Screen roles and per-screen timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScreensConfig {
    /// Visible at startup and the target of screen timeouts.
    #[serde(default = "default_main")]
    pub main: String,
    /// Restored when maintenance ends.
    #[serde(default = "default_main")]
    pub cta: String,
    #[serde(default = "default_maintenance")]
    pub maintenance: String,
    #[serde(default = "default_capture")]
    pub capture: String,
    #[serde(default = "default_validation")]
    pub validation: String,
    #[serde(default = "default_processing")]
    pub processing: String,
    #[serde(default = "default_thank_you")]
    pub thank_you: String,
    /// Additional screens (e.g. `instructions`). Role screens are always registered.
    #[serde(default)]
    pub registered: Vec<String>,
    /// Seconds on a screen before returning to `main`.
    #[serde(default)]
    pub timeouts: HashMap<String, f64>,
}

fn default_main() -> String {
    "cta".to_string()
}

fn default_maintenance() -> String {
    "maintenance".to_string()
}

fn default_capture() -> String {
    "capture".to_string()
}

fn default_validation() -> String {
    "validation".to_string()
}

fn default_processing() -> String {
    "processing".to_string()
}

fn default_thank_you() -> String {
    "thank-you".to_string()
}

impl Default for ScreensConfig {
    fn default() -> Self {
        Self {
            main: default_main(),
            cta: default_main(),
            maintenance: default_maintenance(),
            capture: default_capture(),
            validation: default_validation(),
            processing: default_processing(),
            thank_you: default_thank_you(),
            registered: Vec::new(),
            timeouts: HashMap::new(),
        }
    }
}

impl ScreensConfig {
    /// Names bound to a role, in declaration order.
    pub fn roles(&self) -> [(&'static str, &str); 7] {
        [
            ("main", self.main.as_str()),
            ("cta", self.cta.as_str()),
            ("maintenance", self.maintenance.as_str()),
            ("capture", self.capture.as_str()),
            ("validation", self.validation.as_str()),
            ("processing", self.processing.as_str()),
            ("thank_you", self.thank_you.as_str()),
        ]
    }

    /// Every screen that must be registered, sorted and deduplicated.
    pub fn all_screens(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .roles()
            .iter()
            .map(|(_, name)| name.to_string())
            .chain(self.registered.iter().cloned())
            .collect();
        names.into_iter().collect()
    }

    pub fn timeout_for(&self, screen: &str) -> Option<Duration> {
        self.timeouts
            .get(screen)
            .map(|secs| Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// UDP command channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UdpConfig {
    #[serde(default = "default_udp_port", deserialize_with = "lenient_port")]
    pub port: u16,
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,
}

fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            port: default_udp_port(),
            bind_host: default_bind_host(),
        }
    }
}

impl UdpConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }
}

/// Accept integers or numeric strings; anything unusable falls back to
/// [`DEFAULT_UDP_PORT`] with a warning.
fn lenient_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Int(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let raw = RawPort::deserialize(deserializer)?;
    let parsed = match &raw {
        RawPort::Int(n) => u16::try_from(*n).ok(),
        RawPort::Text(s) => s.trim().parse::<u16>().ok(),
        RawPort::Other(_) => None,
    };

    Ok(parsed.unwrap_or_else(|| {
        let shown = match raw {
            RawPort::Int(n) => n.to_string(),
            RawPort::Text(s) => s,
            RawPort::Other(_) => "<non-numeric>".to_string(),
        };
        warn!(value = %shown, "Invalid UDP port, using {}", DEFAULT_UDP_PORT);
        DEFAULT_UDP_PORT
    }))
}
