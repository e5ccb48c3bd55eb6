//! Fixed gain in decibels.

use strom_core::{
    Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome, UsageError,
    db_to_linear,
};

use crate::args;

/// Scales every sample by a constant gain.
///
/// Takes one argument, the gain in dB (`-6`, `+3`, `-6dB`). Bypasses at 0 dB.
/// Clipping from positive gain is clamped and counted by the pipeline.
///
/// # Example
///
/// ```rust
/// use strom_core::Stage;
/// use strom_effects::Gain;
///
/// let mut gain = Gain::new();
/// gain.configure(&["-6".to_string()]).unwrap();
/// assert!((gain.linear() - 0.501).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct Gain {
    gain_db: f32,
    linear: f32,
}

impl Gain {
    /// Create a unity-gain stage.
    pub fn new() -> Self {
        Self::with_db(0.0)
    }

    /// Create a stage with the given gain in dB.
    pub fn with_db(gain_db: f32) -> Self {
        Self {
            gain_db,
            linear: db_to_linear(gain_db),
        }
    }

    /// Gain in dB.
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Linear multiplier.
    pub fn linear(&self) -> f32 {
        self.linear
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Gain {
    fn name(&self) -> &str {
        "gain"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::MULTICHANNEL
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        args::arity(self.name(), args, 1, 1, "1 (gain in dB)")?;
        let db = args::number_in(self.name(), "gain", &args[0], -200.0..=200.0)?;
        *self = Self::with_db(db);
        Ok(())
    }

    fn start(&mut self, _: &SignalSpec, _: &SignalSpec) -> Result<StartOutcome, StageError> {
        if self.gain_db == 0.0 {
            Ok(StartOutcome::Bypass)
        } else {
            Ok(StartOutcome::Proceed)
        }
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let n = input.len().min(output.len());
        for (o, &i) in output[..n].iter_mut().zip(&input[..n]) {
            *o = i * self.linear;
        }
        Flow::new(n, n)
    }
}
