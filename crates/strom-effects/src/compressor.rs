//! Feed-forward dynamics compressor with a soft knee.
//!
//! # Signal Flow
//!
//! ```text
//! Input → Envelope Follower → Gain Computer → Gain Reduction → Output
//!                                    ↓
//!                              Makeup Gain
//! ```
//!
//! # Arguments
//!
//! `threshold ratio [attack release makeup]`
//!
//! | Argument | Range | Default | Description |
//! |----------|-------|---------|-------------|
//! | threshold | -80 to 0 dB | - | Level where compression begins |
//! | ratio | 1 to 100 | - | Compression strength |
//! | attack | 0.1-1000 ms | 10 | How fast gain reduction engages |
//! | release | 1-5000 ms | 100 | How fast gain reduction releases |
//! | makeup | -40 to 40 dB | 0 | Output level compensation |

use strom_core::{
    EnvelopeFollower, Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome,
    UsageError, db_to_linear, from_unit, linear_to_db, to_unit,
};

use crate::args;

/// Width of the soft knee around the threshold, in dB.
const KNEE_DB: f32 = 6.0;

/// Static compression curve.
#[derive(Debug, Clone, Copy)]
struct GainComputer {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
}

impl GainComputer {
    /// Gain change in dB (zero or negative) for an input level in dB.
    #[inline]
    fn compute_gain_db(&self, input_db: f32) -> f32 {
        let overshoot = input_db - self.threshold_db;
        let slope = 1.0 - 1.0 / self.ratio;

        if overshoot <= -self.knee_db / 2.0 {
            0.0
        } else if overshoot > self.knee_db / 2.0 {
            -overshoot * slope
        } else {
            let knee_factor = (overshoot + self.knee_db / 2.0) / self.knee_db;
            -knee_factor * knee_factor * overshoot * slope
        }
    }
}

/// Compressor stage. Mono; stereo input runs as a pair.
///
/// # Example
///
/// ```rust
/// use strom_core::Stage;
/// use strom_effects::Compressor;
///
/// let mut comp = Compressor::new();
/// comp.configure(&["-20".into(), "4".into(), "5".into(), "50".into()]).unwrap();
/// assert_eq!(comp.ratio(), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    computer: GainComputer,
    attack_ms: f32,
    release_ms: f32,
    makeup_db: f32,
    envelope: EnvelopeFollower,
    makeup: f32,
    /// Deepest gain reduction seen this run, in dB.
    max_reduction_db: f32,
}

impl Compressor {
    /// Create a compressor at -18 dB, 4:1.
    pub fn new() -> Self {
        Self {
            computer: GainComputer {
                threshold_db: -18.0,
                ratio: 4.0,
                knee_db: KNEE_DB,
            },
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_db: 0.0,
            envelope: EnvelopeFollower::new(48000.0, 10.0, 100.0),
            makeup: 1.0,
            max_reduction_db: 0.0,
        }
    }

    /// Threshold in dBFS.
    pub fn threshold_db(&self) -> f32 {
        self.computer.threshold_db
    }

    /// Compression ratio.
    pub fn ratio(&self) -> f32 {
        self.computer.ratio
    }

    /// Deepest gain reduction applied so far, in dB (zero or negative).
    pub fn max_reduction_db(&self) -> f32 {
        self.max_reduction_db
    }

    #[inline]
    fn compress(&mut self, sample: Sample) -> Sample {
        let unit = to_unit(sample);
        let level_db = linear_to_db(self.envelope.process(unit));
        let gain_db = self.computer.compute_gain_db(level_db);
        self.max_reduction_db = self.max_reduction_db.min(gain_db);
        from_unit(unit * db_to_linear(gain_db) * self.makeup)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Compressor {
    fn name(&self) -> &str {
        "compressor"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::NONE
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        let name = self.name();
        args::arity(
            name,
            args,
            2,
            5,
            "2 to 5 (threshold ratio [attack release makeup])",
        )?;
        let threshold_db = args::number_in(name, "threshold", &args[0], -80.0..=0.0)?;
        let ratio = args::number_in(name, "ratio", &args[1], 1.0..=100.0)?;
        let attack_ms = match args.get(2) {
            Some(v) => args::number_in(name, "attack", v, 0.1..=1000.0)?,
            None => 10.0,
        };
        let release_ms = match args.get(3) {
            Some(v) => args::number_in(name, "release", v, 1.0..=5000.0)?,
            None => 100.0,
        };
        let makeup_db = match args.get(4) {
            Some(v) => args::number_in(name, "makeup", v, -40.0..=40.0)?,
            None => 0.0,
        };

        self.computer.threshold_db = threshold_db;
        self.computer.ratio = ratio;
        self.attack_ms = attack_ms;
        self.release_ms = release_ms;
        self.makeup_db = makeup_db;
        Ok(())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        _output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        if input.channels != 1 {
            return Err(StageError::Unsupported(format!(
                "compressor is mono, got {} channels",
                input.channels
            )));
        }
        self.envelope = EnvelopeFollower::new(input.rate as f32, self.attack_ms, self.release_ms);
        self.makeup = db_to_linear(self.makeup_db);
        self.max_reduction_db = 0.0;
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let n = input.len().min(output.len());
        for (o, &i) in output[..n].iter_mut().zip(&input[..n]) {
            *o = self.compress(i);
        }
        Flow::new(n, n)
    }

    fn stop(&mut self) {
        tracing::debug!(
            threshold_db = self.computer.threshold_db,
            ratio = self.computer.ratio,
            max_reduction_db = self.max_reduction_db,
            "compressor stopped"
        );
        self.envelope.reset();
    }
}
