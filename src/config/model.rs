// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [usb]
/// media_root = "/media/alice"
/// poll_interval_ms = 200
/// ignore = [".Trash-*/**"]
///
/// [process]
/// cpu_threshold = 50.0
/// mem_threshold = 50.0
///
/// [ports]
/// target = "127.0.0.1"
///
/// [notify]
/// desktop = true
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; use [`ConfigFile`] (via `TryFrom`) everywhere else.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub usb: UsbSection,

    #[serde(default)]
    pub process: ProcessSection,

    #[serde(default)]
    pub ports: PortsSection,

    #[serde(default)]
    pub notify: NotifySection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub usb: UsbSection,
    pub process: ProcessSection,
    pub ports: PortsSection,
    pub notify: NotifySection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            usb: raw.usb,
            process: raw.process,
            ports: raw.ports,
            notify: raw.notify,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[usb]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsbSection {
    /// Directory whose immediate subdirectories are device mount points.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Interval between device snapshots.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a session sleeps after an empty event read.
    #[serde(default = "default_event_backoff_ms")]
    pub event_backoff_ms: u64,

    /// How long an unpaired move-away waits for its move-in before it is
    /// reported as a deletion.
    #[serde(default = "default_pending_move_ttl_ms")]
    pub pending_move_ttl_ms: u64,

    /// Glob patterns, relative to the device root, whose events are not
    /// reported.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl UsbSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn event_backoff(&self) -> Duration {
        Duration::from_millis(self.event_backoff_ms)
    }

    pub fn pending_move_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_move_ttl_ms)
    }
}

/// `/media/$USER` is where udisks mounts removable drives on most desktops.
fn default_media_root() -> PathBuf {
    match std::env::var("USER") {
        Ok(user) if !user.is_empty() => PathBuf::from("/media").join(user),
        _ => PathBuf::from("/media"),
    }
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_event_backoff_ms() -> u64 {
    100
}

fn default_pending_move_ttl_ms() -> u64 {
    2000
}

impl Default for UsbSection {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            poll_interval_ms: default_poll_interval_ms(),
            event_backoff_ms: default_event_backoff_ms(),
            pending_move_ttl_ms: default_pending_move_ttl_ms(),
            ignore: Vec::new(),
        }
    }
}

/// `[process]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSection {
    /// CPU usage (percent) above which a process counts as overusing.
    #[serde(default = "default_threshold")]
    pub cpu_threshold: f64,

    /// Memory usage (percent of MemTotal) above which a process counts as
    /// overusing.
    #[serde(default = "default_threshold")]
    pub mem_threshold: f64,

    /// Both thresholds must be exceeded for this long before alerting.
    #[serde(default = "default_alert_after_secs")]
    pub alert_after_secs: u64,

    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl ProcessSection {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn alert_after(&self) -> Duration {
        Duration::from_secs(self.alert_after_secs)
    }
}

fn default_threshold() -> f64 {
    50.0
}

fn default_alert_after_secs() -> u64 {
    10
}

fn default_sample_interval_ms() -> u64 {
    500
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            cpu_threshold: default_threshold(),
            mem_threshold: default_threshold(),
            alert_after_secs: default_alert_after_secs(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

/// `[ports]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortsSection {
    /// Address scanned by the port scanner.
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum number of connection attempts in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl PortsSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_target() -> String {
    "127.0.0.1".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    64
}

impl Default for PortsSection {
    fn default() -> Self {
        Self {
            target: default_target(),
            connect_timeout_ms: default_connect_timeout_ms(),
            concurrency: default_concurrency(),
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    /// Also hand every notification to `notify-send`.
    #[serde(default)]
    pub desktop: bool,
}
