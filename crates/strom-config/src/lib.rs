//! Presets and chain descriptions for the strom pipeline.
//!
//! This crate provides:
//!
//! - **Presets**: TOML files naming a stage list and an output format
//! - **Chain descriptions**: `"highpass 80 | gain -3"` strings
//! - **Validation**: checking stage ids and arguments against the registry
//! - **Factory presets**: built-in presets available by name
//!
//! ## Quick Start
//!
//! ```rust
//! use strom_config::{Preset, StageConfig, parse_chain};
//! use strom_registry::StageRegistry;
//!
//! let registry = StageRegistry::new();
//!
//! let preset = Preset::new("voice")
//!     .with_description("Speech cleanup")
//!     .with_effects(parse_chain("highpass 100 | compressor -20 3").unwrap())
//!     .with_effect(StageConfig::new("!echo").with_args(["200", "0.3"]));
//!
//! preset.validate(&registry).unwrap();
//! let stages = preset.build_stages(&registry).unwrap();
//! assert_eq!(stages.len(), 2);
//! ```
//!
//! ## Preset Format
//!
//! ```toml
//! name = "telephone"
//! description = "Narrow band voice"
//!
//! [output]
//! rate = 8000
//! channels = 1
//! bits = 16
//!
//! [[effects]]
//! type = "highpass"
//! args = ["300"]
//!
//! [[effects]]
//! type = "echo"
//! args = ["250", "0.4"]
//! bypassed = true
//! ```

mod chain;
mod error;
pub mod factory_presets;
mod preset;
mod stage_config;
mod validation;

pub use chain::{build_stages, format_chain, parse_chain};
pub use error::{ConfigError, Result};
pub use factory_presets::{
    factory_preset_names, factory_presets, get_factory_preset, is_factory_preset, resolve_preset,
};
pub use preset::{OutputConfig, Preset};
pub use stage_config::StageConfig;
pub use validation::{
    ValidationError, ValidationResult, validate_chain, validate_output, validate_preset,
    validate_stage,
};
