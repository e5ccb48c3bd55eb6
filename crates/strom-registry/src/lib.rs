//! Stage registry and factory for the strom pipeline.
//!
//! Maps stage ids to constructors and descriptors, so chains can be built
//! from command-line strings and presets, and so the chain builder can
//! instantiate its automatic `channels` and `rate` stages.
//!
//! # Example
//!
//! ```rust
//! use strom_core::Stage;
//! use strom_registry::{StageCategory, StageRegistry};
//!
//! let registry = StageRegistry::new();
//!
//! for stage in registry.all_stages() {
//!     println!("{}: {}", stage.id, stage.description);
//! }
//!
//! let gain = registry.create_configured("gain", &["-6".to_string()]).unwrap();
//! assert_eq!(gain.name(), "gain");
//!
//! for stage in registry.stages_in_category(StageCategory::Dynamics) {
//!     println!("dynamics: {}", stage.name);
//! }
//! ```

use strom_core::{Stage, StageFactory, StageFlags, UsageError};
use strom_effects::{
    ChannelMixer, Compressor, Echo, Filter, Gain, RateConverter, Remix, Stat, Trim,
};
use thiserror::Error;

/// Category of stage for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageCategory {
    /// Channel and rate conversion
    Conversion,
    /// Gain and level
    Utility,
    /// Lowpass, highpass
    Filter,
    /// Compressors
    Dynamics,
    /// Echo, trim and other time-domain edits
    TimeBased,
    /// Measurement without altering audio
    Analysis,
}

impl StageCategory {
    /// Human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            StageCategory::Conversion => "Conversion",
            StageCategory::Utility => "Utility",
            StageCategory::Filter => "Filter",
            StageCategory::Dynamics => "Dynamics",
            StageCategory::TimeBased => "Time-Based",
            StageCategory::Analysis => "Analysis",
        }
    }

    /// Description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            StageCategory::Conversion => "Channel-count and sample-rate converters",
            StageCategory::Utility => "Gain and level adjustment",
            StageCategory::Filter => "Lowpass, highpass and other filters",
            StageCategory::Dynamics => "Compressors and other dynamics processors",
            StageCategory::TimeBased => "Echo, trimming and other time-domain edits",
            StageCategory::Analysis => "Measurements reported without changing the audio",
        }
    }
}

/// Describes a stage in the registry.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// Unique identifier, as used in chain strings (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for organization.
    pub category: StageCategory,
    /// Capabilities the stage declares.
    pub flags: StageFlags,
    /// Argument synopsis.
    pub usage: &'static str,
}

/// Errors from creating a configured stage.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No stage is registered under this id.
    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    /// The stage rejected its arguments.
    #[error(transparent)]
    Usage(#[from] UsageError),
}

/// Factory function type for creating stages.
type Constructor = fn() -> Box<dyn Stage>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: StageDescriptor,
    constructor: Constructor,
}

/// Registry of all built-in stages.
pub struct StageRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StageRegistry {
    /// Create a registry with every built-in stage registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(10),
        };
        registry.register_builtin_stages();
        registry
    }

    fn register_builtin_stages(&mut self) {
        self.register(
            StageDescriptor {
                id: "channels",
                name: "Channels",
                description: "Averages channels down or duplicates them up to the output count",
                category: StageCategory::Conversion,
                flags: StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL),
                usage: "",
            },
            || Box::new(ChannelMixer::new()),
        );

        self.register(
            StageDescriptor {
                id: "rate",
                name: "Rate",
                description: "Windowed-sinc sample rate converter",
                category: StageCategory::Conversion,
                flags: StageFlags::RATE,
                usage: "",
            },
            || Box::new(RateConverter::new()),
        );

        self.register(
            StageDescriptor {
                id: "remix",
                name: "Remix",
                description: "Builds each output channel from a list of input channels",
                category: StageCategory::Conversion,
                flags: StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL),
                usage: "in-list... (e.g. 1,2 or 2 1)",
            },
            || Box::new(Remix::new()),
        );

        self.register(
            StageDescriptor {
                id: "gain",
                name: "Gain",
                description: "Fixed gain in decibels",
                category: StageCategory::Utility,
                flags: StageFlags::MULTICHANNEL,
                usage: "dB",
            },
            || Box::new(Gain::new()),
        );

        self.register(
            StageDescriptor {
                id: "lowpass",
                name: "Lowpass",
                description: "Two-pole lowpass filter",
                category: StageCategory::Filter,
                flags: StageFlags::NONE,
                usage: "frequency [q]",
            },
            || Box::new(Filter::lowpass()),
        );

        self.register(
            StageDescriptor {
                id: "highpass",
                name: "Highpass",
                description: "Two-pole highpass filter",
                category: StageCategory::Filter,
                flags: StageFlags::NONE,
                usage: "frequency [q]",
            },
            || Box::new(Filter::highpass()),
        );

        self.register(
            StageDescriptor {
                id: "compressor",
                name: "Compressor",
                description: "Feed-forward compressor with soft knee",
                category: StageCategory::Dynamics,
                flags: StageFlags::NONE,
                usage: "threshold-dB ratio [attack-ms release-ms makeup-dB]",
            },
            || Box::new(Compressor::new()),
        );

        self.register(
            StageDescriptor {
                id: "echo",
                name: "Echo",
                description: "Feedback echo whose tail rings out after the input ends",
                category: StageCategory::TimeBased,
                flags: StageFlags::UNBOUNDED_LENGTH,
                usage: "delay-ms decay",
            },
            || Box::new(Echo::new()),
        );

        self.register(
            StageDescriptor {
                id: "trim",
                name: "Trim",
                description: "Keeps a time window and stops reading after it",
                category: StageCategory::TimeBased,
                flags: StageFlags::MULTICHANNEL.union(StageFlags::UNBOUNDED_LENGTH),
                usage: "start [length]",
            },
            || Box::new(Trim::new()),
        );

        self.register(
            StageDescriptor {
                id: "stat",
                name: "Statistics",
                description: "Logs peak, RMS and length when the run ends",
                category: StageCategory::Analysis,
                flags: StageFlags::MULTICHANNEL.union(StageFlags::REPORT_ONLY),
                usage: "",
            },
            || Box::new(Stat::new()),
        );
    }

    fn register(&mut self, descriptor: StageDescriptor, constructor: Constructor) {
        self.entries.push(RegistryEntry {
            descriptor,
            constructor,
        });
    }

    /// Returns descriptors for all registered stages.
    pub fn all_stages(&self) -> Vec<&StageDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for stages in a specific category.
    pub fn stages_in_category(&self, category: StageCategory) -> Vec<&StageDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by stage id.
    pub fn get(&self, id: &str) -> Option<&StageDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Create an unconfigured stage by id.
    pub fn create(&self, id: &str) -> Option<Box<dyn Stage>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.constructor)())
    }

    /// Create a stage and pass it its arguments.
    pub fn create_configured(
        &self,
        id: &str,
        args: &[String],
    ) -> Result<Box<dyn Stage>, RegistryError> {
        let mut stage = self
            .create(id)
            .ok_or_else(|| RegistryError::UnknownStage(id.to_string()))?;
        stage.configure(args)?;
        Ok(stage)
    }

    /// Returns the number of registered stages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no stages are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StageFactory for StageRegistry {
    fn create_stage(&self, name: &str) -> Option<Box<dyn Stage>> {
        self.create(name)
    }
}
