// src/config/mod.rs

//! Configuration loading and validation for mediaguard.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate intervals, thresholds, globs and addresses (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve};
pub use model::{
    ConfigFile, NotifySection, PortsSection, ProcessSection, RawConfigFile, UsbSection,
};
pub use validate::validate_config;
