//! Stage configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of a preset or chain description.
///
/// A stage is named by its registry id and takes positional arguments, the
/// same ones [`Stage::configure`](strom_core::Stage::configure) receives.
/// Prefixing the id with `!` marks the stage bypassed: it stays in the
/// description but is left out when the chain is built.
///
/// # Example
///
/// ```rust
/// use strom_config::StageConfig;
///
/// let config = StageConfig::new("lowpass").with_args(["3000", "0.7"]);
/// assert_eq!(config.stage_type, "lowpass");
/// assert_eq!(config.to_string(), "lowpass 3000 0.7");
///
/// let skipped = StageConfig::new("!echo");
/// assert!(skipped.bypassed);
/// assert_eq!(skipped.stage_type, "echo");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageConfig {
    /// Registry id (e.g. "gain", "rate").
    #[serde(rename = "type")]
    pub stage_type: String,

    /// Positional arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Whether the stage is left out of the built chain.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bypassed: bool,
}

impl StageConfig {
    /// Create a stage configuration with no arguments.
    ///
    /// If the id starts with `!`, the stage is marked bypassed.
    pub fn new(stage_type: impl Into<String>) -> Self {
        let type_str = stage_type.into();
        let (stage_type, bypassed) = match type_str.strip_prefix('!') {
            Some(stripped) => (stripped.to_string(), true),
            None => (type_str, false),
        };

        Self {
            stage_type,
            args: Vec::new(),
            bypassed,
        }
    }

    /// Replace the arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append one argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set whether the stage is bypassed.
    pub fn with_bypass(mut self, bypassed: bool) -> Self {
        self.bypassed = bypassed;
        self
    }

    /// The id as written in a chain description, `!`-prefixed if bypassed.
    pub fn display_type(&self) -> String {
        if self.bypassed {
            format!("!{}", self.stage_type)
        } else {
            self.stage_type.clone()
        }
    }
}

impl fmt::Display for StageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bypassed {
            f.write_str("!")?;
        }
        f.write_str(&self.stage_type)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
