// src/config/mod.rs

//! Configuration loading and validation for runonsave.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Compile and check command patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_and_validate};
pub use model::{CommandConfig, CommandRule, ConfigFile, ConfigSection, RawConfigFile};
