// src/config/validate.rs

use std::net::IpAddr;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{GuardError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::GuardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every semantic check on an already-deserialized config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_usb(cfg)?;
    validate_process(cfg)?;
    validate_ports(cfg)?;
    Ok(())
}

fn validate_usb(cfg: &RawConfigFile) -> Result<()> {
    let usb = &cfg.usb;

    if usb.media_root.as_os_str().is_empty() {
        return Err(GuardError::ConfigError(
            "[usb].media_root must not be empty".to_string(),
        ));
    }

    for (field, value) in [
        ("poll_interval_ms", usb.poll_interval_ms),
        ("event_backoff_ms", usb.event_backoff_ms),
        ("pending_move_ttl_ms", usb.pending_move_ttl_ms),
    ] {
        if value == 0 {
            return Err(GuardError::ConfigError(format!(
                "[usb].{field} must be >= 1 (got 0)"
            )));
        }
    }

    for pattern in usb.ignore.iter() {
        Glob::new(pattern).map_err(|e| {
            GuardError::ConfigError(format!(
                "[usb].ignore pattern '{pattern}' is not a valid glob: {e}"
            ))
        })?;
    }

    Ok(())
}

fn validate_process(cfg: &RawConfigFile) -> Result<()> {
    let process = &cfg.process;

    for (field, value) in [
        ("cpu_threshold", process.cpu_threshold),
        ("mem_threshold", process.mem_threshold),
    ] {
        if !(value > 0.0 && value <= 100.0) {
            return Err(GuardError::ConfigError(format!(
                "[process].{field} must be within (0, 100] (got {value})"
            )));
        }
    }

    if process.sample_interval_ms == 0 {
        return Err(GuardError::ConfigError(
            "[process].sample_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_ports(cfg: &RawConfigFile) -> Result<()> {
    let ports = &cfg.ports;

    if ports.target.parse::<IpAddr>().is_err() {
        return Err(GuardError::ConfigError(format!(
            "[ports].target '{}' is not an IP address",
            ports.target
        )));
    }

    if ports.concurrency == 0 {
        return Err(GuardError::ConfigError(
            "[ports].concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if ports.connect_timeout_ms == 0 {
        return Err(GuardError::ConfigError(
            "[ports].connect_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn empty_file_is_valid() {
        let cfg = ConfigFile::try_from(raw("")).unwrap();
        assert_eq!(cfg.usb.poll_interval_ms, 200);
        assert_eq!(cfg.usb.event_backoff_ms, 100);
        assert_eq!(cfg.ports.target, "127.0.0.1");
        assert!(!cfg.notify.desktop);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = ConfigFile::try_from(raw("[usb]\npoll_interval_ms = 0\n")).unwrap_err();
        match err {
            GuardError::ConfigError(msg) => assert!(msg.contains("poll_interval_ms")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err = ConfigFile::try_from(raw("[process]\ncpu_threshold = 150.0\n")).unwrap_err();
        assert!(matches!(err, GuardError::ConfigError(msg) if msg.contains("cpu_threshold")));
    }

    #[test]
    fn bad_glob_is_rejected() {
        let err = ConfigFile::try_from(raw("[usb]\nignore = [\"a/[b\"]\n")).unwrap_err();
        assert!(matches!(err, GuardError::ConfigError(msg) if msg.contains("ignore")));
    }

    #[test]
    fn non_ip_target_is_rejected() {
        let err = ConfigFile::try_from(raw("[ports]\ntarget = \"localhost\"\n")).unwrap_err();
        assert!(matches!(err, GuardError::ConfigError(msg) if msg.contains("target")));
    }
}
