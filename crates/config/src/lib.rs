//! Configuration loading, validation, and env substitution.
//!
//! Config files: `pinion.toml`, `pinion.yaml`, or `pinion.json`
//! Searched in `./` then `~/.config/pinion/`.
//!
//! Supports `${ENV_VAR}` substitution anywhere in the file.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config, load_config_value},
    schema::{PinConfig, PinionConfig, TransportConfig, TransportKind},
    validate::{Diagnostic, Severity, ValidationResult},
};
