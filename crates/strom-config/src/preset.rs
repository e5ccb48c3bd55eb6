//! Preset file format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use strom_core::{Encoding, SignalSpec, Stage};
use strom_registry::StageRegistry;

use crate::error::{ConfigError, Result};
use crate::stage_config::StageConfig;
use crate::validation::ValidationError;

/// Output format requested by a preset.
///
/// Every field is optional; missing ones are taken from the input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Sample rate in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<u32>,

    /// Channel count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,

    /// Integer bit depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<u16>,

    /// Write 32-bit float samples; overrides `bits`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub float: bool,
}

impl OutputConfig {
    /// True when nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.rate.is_none() && self.channels.is_none() && self.bits.is_none() && !self.float
    }

    /// Applies the overrides to `base`.
    pub fn apply(&self, base: SignalSpec) -> SignalSpec {
        let mut spec = base;
        if let Some(rate) = self.rate {
            spec = spec.with_rate(rate);
        }
        if let Some(channels) = self.channels {
            spec = spec.with_channels(channels);
        }
        if self.float {
            spec = spec.with_encoding(32, Encoding::Float);
        } else if let Some(bits) = self.bits {
            spec = spec.with_encoding(bits, Encoding::SignedInt);
        }
        spec
    }
}

/// A named processing chain with an optional output format.
///
/// # Example
///
/// ```rust
/// use strom_config::Preset;
///
/// let toml = r#"
/// name = "telephone"
/// description = "Narrow band voice"
///
/// [output]
/// rate = 8000
/// channels = 1
///
/// [[effects]]
/// type = "highpass"
/// args = ["300"]
///
/// [[effects]]
/// type = "lowpass"
/// args = ["3400"]
/// "#;
///
/// let preset = Preset::from_toml(toml).unwrap();
/// assert_eq!(preset.len(), 2);
/// assert_eq!(preset.output.rate, Some(8000));
/// assert_eq!(preset.to_chain_string(), "highpass 300 | lowpass 3400");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Preset name.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Output format overrides.
    #[serde(default, skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,

    /// Stages in processing order.
    #[serde(default)]
    pub effects: Vec<StageConfig>,
}

impl Preset {
    /// Create an empty preset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            output: OutputConfig::default(),
            effects: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the output overrides.
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Append a stage.
    pub fn with_effect(mut self, effect: StageConfig) -> Self {
        self.effects.push(effect);
        self
    }

    /// Append several stages.
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = StageConfig>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of stages, bypassed ones included.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// True when the preset has no stages.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Get a stage by index.
    pub fn get(&self, index: usize) -> Option<&StageConfig> {
        self.effects.get(index)
    }

    /// The stages as a `|`-separated chain description.
    pub fn to_chain_string(&self) -> String {
        crate::chain::format_chain(&self.effects)
    }

    /// Instantiates and configures every stage that is not bypassed.
    pub fn build_stages(&self, registry: &StageRegistry) -> Result<Vec<Box<dyn Stage>>> {
        crate::chain::build_stages(&self.effects, registry)
    }

    /// Checks every stage against `registry`, bypassed ones included.
    pub fn validate(&self, registry: &StageRegistry) -> std::result::Result<(), ValidationError> {
        crate::validation::validate_preset(self, registry)
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("untitled")
    }
}
