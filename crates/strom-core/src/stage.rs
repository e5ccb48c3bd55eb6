//! The stage contract implemented by every processing unit.
//!
//! A [`Stage`] is one link in a pipeline chain: a user-requested effect or a
//! channel/rate converter inserted by the [`ChainBuilder`](crate::ChainBuilder).
//! Stages exchange interleaved [`Sample`]s through caller-owned slices and
//! report how much they consumed and produced, which lets the scheduler cope
//! with stages whose input and output lengths differ.
//!
//! ## Lifecycle
//!
//! ```text
//! configure(args) → start(in, out) → process(..)* → drain(..)* → stop()
//! ```
//!
//! `stop` is called exactly once for every stage whose `start` was called,
//! whatever way the run ends.

use crate::error::{StageError, UsageError};
use crate::sample::Sample;
use crate::signal::SignalSpec;

/// Capabilities a stage declares when it is registered.
///
/// # Example
///
/// ```rust
/// use strom_core::StageFlags;
///
/// let flags = StageFlags::MULTICHANNEL.union(StageFlags::UNBOUNDED_LENGTH);
/// assert!(flags.contains(StageFlags::MULTICHANNEL));
/// assert!(!flags.contains(StageFlags::RATE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageFlags(u8);

impl StageFlags {
    /// No capabilities: a mono-only stage that preserves rate and channels.
    pub const NONE: Self = Self(0);
    /// Changes the channel count.
    pub const CHANNELS: Self = Self(1 << 0);
    /// Changes the sample rate.
    pub const RATE: Self = Self(1 << 1);
    /// Processes any number of interleaved channels in one call.
    pub const MULTICHANNEL: Self = Self(1 << 2);
    /// Observes audio without altering it.
    pub const REPORT_ONLY: Self = Self(1 << 3);
    /// May change the total number of samples (trimming, tails).
    pub const UNBOUNDED_LENGTH: Self = Self(1 << 4);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Short comma-separated label list, for listings.
    pub fn labels(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        for (flag, label) in [
            (Self::CHANNELS, "channels"),
            (Self::RATE, "rate"),
            (Self::MULTICHANNEL, "multichannel"),
            (Self::REPORT_ONLY, "report-only"),
            (Self::UNBOUNDED_LENGTH, "unbounded-length"),
        ] {
            if self.contains(flag) {
                out.push(label);
            }
        }
        out
    }
}

/// What a stage decided in [`Stage::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The stage takes part in the run.
    Proceed,
    /// The stage is a no-op for this signal and may be elided.
    Bypass,
}

/// Result of one [`Stage::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flow {
    /// Input samples taken from the front of the input slice.
    pub consumed: usize,
    /// Output samples written to the front of the output slice.
    pub produced: usize,
    /// The stage will accept no further input.
    pub end_of_stream: bool,
}

impl Flow {
    /// A flow result that keeps the stream open.
    #[inline]
    pub const fn new(consumed: usize, produced: usize) -> Self {
        Self {
            consumed,
            produced,
            end_of_stream: false,
        }
    }

    /// A flow result after which the stage wants no more input.
    #[inline]
    pub const fn finished(consumed: usize, produced: usize) -> Self {
        Self {
            consumed,
            produced,
            end_of_stream: true,
        }
    }
}

/// Result of one [`Stage::drain`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Drained {
    /// Output samples written to the front of the output slice.
    pub produced: usize,
    /// No further output will ever be produced.
    pub finished: bool,
}

impl Drained {
    /// More output may follow.
    #[inline]
    pub const fn more(produced: usize) -> Self {
        Self {
            produced,
            finished: false,
        }
    }

    /// This was the last output.
    #[inline]
    pub const fn done(produced: usize) -> Self {
        Self {
            produced,
            finished: true,
        }
    }
}

/// A processing unit in the pipeline.
///
/// # Example
///
/// ```rust
/// use strom_core::{Drained, Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome};
///
/// #[derive(Clone)]
/// struct Invert;
///
/// impl Stage for Invert {
///     fn name(&self) -> &str { "invert" }
///     fn flags(&self) -> StageFlags { StageFlags::MULTICHANNEL }
///     fn duplicate(&self) -> Box<dyn Stage> { Box::new(self.clone()) }
///
///     fn start(&mut self, _: &SignalSpec, _: &SignalSpec) -> Result<StartOutcome, StageError> {
///         Ok(StartOutcome::Proceed)
///     }
///
///     fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
///         let n = input.len().min(output.len());
///         for (o, i) in output[..n].iter_mut().zip(&input[..n]) {
///             *o = -*i;
///         }
///         Flow::new(n, n)
///     }
/// }
/// ```
pub trait Stage: Send {
    /// Stage identifier, as registered.
    fn name(&self) -> &str;

    /// Capabilities declared at registration time.
    fn flags(&self) -> StageFlags;

    /// Clone this configured, not yet started stage.
    ///
    /// Used to build the second half of a stage pair, so the copy must carry
    /// the configuration but not share any state.
    fn duplicate(&self) -> Box<dyn Stage>;

    /// Parse stage-specific arguments.
    ///
    /// Default accepts no arguments.
    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(UsageError::count(self.name(), "no arguments", args.len()))
        }
    }

    /// Prepare for the negotiated signal descriptors.
    fn start(
        &mut self,
        input: &SignalSpec,
        output: &SignalSpec,
    ) -> Result<StartOutcome, StageError>;

    /// Consume from `input` and produce into `output`.
    ///
    /// Must consume or produce at least one sample whenever `input` and
    /// `output` are both non-empty.
    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow;

    /// Flush buffered output after the last input.
    ///
    /// Called repeatedly until it reports `finished`. Default has nothing
    /// buffered.
    fn drain(&mut self, _output: &mut [Sample]) -> Drained {
        Drained::done(0)
    }

    /// Release resources. Called exactly once per started stage.
    fn stop(&mut self) {}
}

/// Creates stages by name.
///
/// The [`ChainBuilder`](crate::ChainBuilder) uses this to instantiate the
/// automatic channel-mixdown and rate-conversion stages.
pub trait StageFactory {
    /// Create an unconfigured stage, or `None` if the name is unknown.
    fn create_stage(&self, name: &str) -> Option<Box<dyn Stage>>;
}
