//! Second-order lowpass and highpass stages.
//!
//! Both wrap a [`Biquad`] designed from the RBJ cookbook once the sample rate
//! is known in [`Stage::start`]. They are mono: the chain builder runs a pair
//! for stereo material.

use strom_core::{
    Biquad, Coefficients, FilterShape, Flow, Sample, SignalSpec, Stage, StageError, StageFlags,
    StartOutcome, UsageError,
};

use crate::args;

/// Default Q, a maximally flat (Butterworth) response.
pub const DEFAULT_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Biquad filter stage, args `freq [q]`.
///
/// # Example
///
/// ```rust
/// use strom_core::{SignalSpec, Stage};
/// use strom_effects::Filter;
///
/// let mut lp = Filter::lowpass();
/// lp.configure(&["3400".to_string()]).unwrap();
/// let spec = SignalSpec::new(8000, 1);
/// lp.start(&spec, &spec).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    shape: FilterShape,
    frequency: f32,
    q: f32,
    biquad: Biquad,
}

impl Filter {
    /// Create a filter of the given shape at 1 kHz.
    pub fn new(shape: FilterShape) -> Self {
        Self {
            shape,
            frequency: 1000.0,
            q: DEFAULT_Q,
            biquad: Biquad::default(),
        }
    }

    /// Lowpass at 1 kHz.
    pub fn lowpass() -> Self {
        Self::new(FilterShape::Lowpass)
    }

    /// Highpass at 1 kHz.
    pub fn highpass() -> Self {
        Self::new(FilterShape::Highpass)
    }

    /// Corner frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Quality factor.
    pub fn q(&self) -> f32 {
        self.q
    }
}

impl Stage for Filter {
    fn name(&self) -> &str {
        match self.shape {
            FilterShape::Lowpass => "lowpass",
            FilterShape::Highpass => "highpass",
        }
    }

    fn flags(&self) -> StageFlags {
        StageFlags::NONE
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        let name = self.name().to_string();
        args::arity(&name, args, 1, 2, "1 or 2 (freq [q])")?;
        self.frequency = args::number_in(&name, "frequency", &args[0], 1.0..=1.0e6)?;
        if let Some(q) = args.get(1) {
            self.q = args::number_in(&name, "q", q, 0.01..=100.0)?;
        }
        Ok(())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        _output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        if input.channels != 1 {
            return Err(StageError::Unsupported(format!(
                "{} is mono, got {} channels",
                self.name(),
                input.channels
            )));
        }
        let nyquist = input.rate as f32 / 2.0;
        if self.frequency >= nyquist {
            tracing::warn!(
                stage = self.name(),
                frequency = self.frequency,
                nyquist,
                "corner frequency at or above Nyquist, clamping"
            );
        }
        let coeffs = Coefficients::design(self.shape, self.frequency, self.q, input.rate as f32);
        self.biquad = Biquad::new(coeffs);
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let n = input.len().min(output.len());
        for (o, &i) in output[..n].iter_mut().zip(&input[..n]) {
            *o = self.biquad.process(i);
        }
        Flow::new(n, n)
    }

    fn stop(&mut self) {
        self.biquad.clear();
    }
}
