//! Chain construction: automatic stage insertion and descriptor negotiation.

use crate::error::{PipelineError, Result};
use crate::pipeline::entry::ChainEntry;
use crate::signal::SignalSpec;
use crate::stage::{Stage, StageFactory, StageFlags};

/// Registry name of the automatic channel-mixdown stage.
pub const AUTO_CHANNELS: &str = "channels";
/// Registry name of the automatic rate-conversion stage.
pub const AUTO_RATE: &str = "rate";

/// Default block capacity in samples.
pub const DEFAULT_BLOCK_LEN: usize = 8192;

/// Tunables of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of every entry buffer, in samples (rounded down to whole
    /// frames per entry).
    pub block_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
        }
    }
}

/// An ordered, negotiated chain ready to be run.
///
/// Entry 0 is the input slot; every other entry wraps a stage or stage pair
/// whose input descriptor matches the previous entry's output descriptor.
pub struct Chain {
    pub(crate) entries: Vec<ChainEntry>,
    pub(crate) config: PipelineConfig,
    source: SignalSpec,
    sink: SignalSpec,
}

impl Chain {
    /// All entries, input slot first.
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Number of entries including the input slot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the chain has only the input slot.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Stage names in order, without the input slot.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().skip(1).map(ChainEntry::name).collect()
    }

    /// Descriptor the chain expects from its source.
    pub fn source_spec(&self) -> &SignalSpec {
        &self.source
    }

    /// Descriptor the chain delivers to its sink.
    pub fn sink_spec(&self) -> &SignalSpec {
        &self.sink
    }

    /// Run tunables.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Builds a [`Chain`] from user stages, inserting channel and rate converters.
///
/// Channel reductions and downsampling happen before the user stages;
/// channel expansion and upsampling happen after them. Both converters cost
/// time proportional to samples times channels, so doing the reduction early
/// and the expansion late keeps the work done by every other stage minimal.
///
/// # Example
///
/// ```rust,ignore
/// let chain = ChainBuilder::new(SignalSpec::new(48000, 2), SignalSpec::new(8000, 1))
///     .stage(registry.create_configured("gain", &["-3".into()])?)
///     .build(&registry)?;
/// assert_eq!(chain.names(), ["channels", "rate", "gain"]);
/// ```
pub struct ChainBuilder {
    source: SignalSpec,
    sink: SignalSpec,
    stages: Vec<Box<dyn Stage>>,
    config: PipelineConfig,
}

impl ChainBuilder {
    /// Starts a chain between two endpoint descriptors.
    pub fn new(source: SignalSpec, sink: SignalSpec) -> Self {
        Self {
            source,
            sink,
            stages: Vec::new(),
            config: PipelineConfig::default(),
        }
    }

    /// Appends a configured user stage.
    #[must_use]
    pub fn stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends several configured user stages.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = Box<dyn Stage>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Overrides the run tunables.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Decides the final chain.
    ///
    /// Fails with [`PipelineError::Configuration`] before instantiating any
    /// automatic stage if two user stages change the channel count.
    pub fn build(self, factory: &dyn StageFactory) -> Result<Chain> {
        let Self {
            source,
            sink,
            stages,
            config,
        } = self;

        if config.block_len < 2 {
            return Err(PipelineError::configuration(format!(
                "block length {} is too small",
                config.block_len
            )));
        }

        let need_channels = source.channels != sink.channels;
        let need_rate = source.rate != sink.rate;

        let changers: Vec<&str> = stages
            .iter()
            .filter(|s| s.flags().contains(StageFlags::CHANNELS))
            .map(|s| s.name())
            .collect();
        if changers.len() > 1 {
            return Err(PipelineError::configuration(format!(
                "only one stage may change the channel count, found {}",
                changers.join(", ")
            )));
        }
        let has_chan = !changers.is_empty();

        let rate_changers = stages
            .iter()
            .filter(|s| s.flags().contains(StageFlags::RATE))
            .count();
        if rate_changers > 1 {
            tracing::warn!(
                count = rate_changers,
                "multiple rate-changing stages; later ones see equal rates"
            );
        }
        let has_rate = rate_changers > 0;

        let mut chain = ChainState {
            entries: vec![ChainEntry::input_slot(source)],
            current: source,
            sink,
        };
        let mut channels_done = !need_channels || has_chan;
        let mut rate_done = !need_rate || has_rate;

        if !channels_done && source.channels > sink.channels {
            chain.push_auto(factory, AUTO_CHANNELS)?;
            channels_done = true;
        }
        if !rate_done && source.rate > sink.rate {
            chain.push_auto(factory, AUTO_RATE)?;
            rate_done = true;
        }
        for stage in stages {
            chain.push(stage, false)?;
        }
        if !rate_done {
            chain.push_auto(factory, AUTO_RATE)?;
        }
        if !channels_done {
            chain.push_auto(factory, AUTO_CHANNELS)?;
        }

        if !chain.current.same_shape(&sink) {
            return Err(PipelineError::configuration(format!(
                "chain ends at {} but the output needs {}",
                chain.current, sink
            )));
        }

        tracing::debug!(
            source = %source,
            sink = %sink,
            stages = ?chain.entries.iter().skip(1).map(ChainEntry::name).collect::<Vec<_>>(),
            "built chain"
        );
        Ok(Chain {
            entries: chain.entries,
            config,
            source,
            sink,
        })
    }
}

struct ChainState {
    entries: Vec<ChainEntry>,
    current: SignalSpec,
    sink: SignalSpec,
}

impl ChainState {
    fn push_auto(&mut self, factory: &dyn StageFactory, name: &str) -> Result<()> {
        let stage = factory.create_stage(name).ok_or_else(|| {
            PipelineError::configuration(format!("no '{name}' stage available for automatic insertion"))
        })?;
        self.push(stage, true)
    }

    fn push(&mut self, stage: Box<dyn Stage>, automatic: bool) -> Result<()> {
        let flags = stage.flags();
        let input = self.current;
        let mut output = input;
        if flags.contains(StageFlags::CHANNELS) {
            output = output.with_channels(self.sink.channels);
        }
        if flags.contains(StageFlags::RATE) {
            output = output.with_rate(self.sink.rate);
        }

        let native = flags.contains(StageFlags::MULTICHANNEL) || flags.contains(StageFlags::CHANNELS);
        let entry = if native || input.channels <= 1 {
            ChainEntry::single(stage, input, output, automatic)
        } else if input.channels == 2 {
            let right = stage.duplicate();
            ChainEntry::pair(stage, right, input, output, automatic)
        } else {
            return Err(PipelineError::configuration(format!(
                "stage '{}' handles one channel at a time and cannot take {} channels",
                stage.name(),
                input.channels
            )));
        };
        tracing::debug!(
            stage = entry.name(),
            automatic,
            pair = entry.is_pair(),
            input = %input,
            output = %output,
            "chain entry"
        );
        self.entries.push(entry);
        self.current = output;
        Ok(())
    }
}
