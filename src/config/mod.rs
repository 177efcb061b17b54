// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] is the serde shape of the TOML file.
//! - [`loader`] reads a file into the raw model.
//! - [`validate`] turns the raw model into a validated [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{AuctionConfig, ConfigFile, CoordinatorSection, RawConfigFile};
