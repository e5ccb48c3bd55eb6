//! Stage and preset validation.
//!
//! Stages are checked by asking the registry to create and configure them,
//! so an argument is valid exactly when the stage itself accepts it.
//!
//! # Example
//!
//! ```rust
//! use strom_config::{StageConfig, validate_stage};
//! use strom_registry::StageRegistry;
//!
//! let registry = StageRegistry::new();
//! validate_stage(&StageConfig::new("gain").with_arg("-3"), &registry).unwrap();
//! assert!(validate_stage(&StageConfig::new("reverb"), &registry).is_err());
//! ```

use strom_core::UsageError;
use strom_registry::{RegistryError, StageRegistry};
use thiserror::Error;

use crate::preset::{OutputConfig, Preset};
use crate::stage_config::StageConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// No stage is registered under this id.
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// The stage rejected its arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] UsageError),

    /// The output section cannot be written.
    #[error("invalid output: {0}")]
    InvalidOutput(String),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl From<RegistryError> for ValidationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownStage(id) => ValidationError::UnknownStage(id),
            RegistryError::Usage(usage) => ValidationError::InvalidArguments(usage),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Checks that the stage exists and accepts its arguments.
///
/// Bypassed stages are checked too.
pub fn validate_stage(config: &StageConfig, registry: &StageRegistry) -> ValidationResult<()> {
    registry
        .create_configured(&config.stage_type, &config.args)
        .map(drop)
        .map_err(ValidationError::from)
}

/// Checks every stage, reporting all failures at once.
pub fn validate_chain(stages: &[StageConfig], registry: &StageRegistry) -> ValidationResult<()> {
    collect(
        stages
            .iter()
            .filter_map(|config| validate_stage(config, registry).err())
            .collect(),
    )
}

/// Checks the output section and every stage of a preset.
pub fn validate_preset(preset: &Preset, registry: &StageRegistry) -> ValidationResult<()> {
    let mut errors = Vec::new();
    if let Err(e) = validate_output(&preset.output) {
        errors.push(e);
    }
    errors.extend(
        preset
            .effects
            .iter()
            .filter_map(|config| validate_stage(config, registry).err()),
    );
    collect(errors)
}

/// Checks that the requested output format is one the WAV writer supports.
pub fn validate_output(output: &OutputConfig) -> ValidationResult<()> {
    if output.rate == Some(0) {
        return Err(ValidationError::InvalidOutput("rate must be positive".into()));
    }
    if output.channels == Some(0) {
        return Err(ValidationError::InvalidOutput(
            "channels must be positive".into(),
        ));
    }
    if let Some(bits) = output.bits
        && !output.float
        && !matches!(bits, 8 | 16 | 24 | 32)
    {
        return Err(ValidationError::InvalidOutput(format!(
            "{bits}-bit output is not supported (use 8, 16, 24 or 32)"
        )));
    }
    Ok(())
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
