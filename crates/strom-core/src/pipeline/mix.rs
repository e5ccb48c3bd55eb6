//! Multi-input front-ends: summing mix and sequential concatenation.
//!
//! Both present several [`Source`]s as one, so the scheduler reads them like
//! any other input.

use std::io;

use crate::error::{PipelineError, Result};
use crate::io::{Source, read_full};
use crate::sample::{Sample, clip_block};
use crate::signal::SignalSpec;

fn common_spec(inputs: &[Box<dyn Source>]) -> Result<SignalSpec> {
    let first = inputs
        .first()
        .ok_or_else(|| PipelineError::configuration("no inputs given"))?
        .spec();
    for (i, input) in inputs.iter().enumerate().skip(1) {
        let spec = input.spec();
        if !spec.same_shape(&first) {
            return Err(PipelineError::configuration(format!(
                "input {} is {} but input 1 is {}",
                i + 1,
                spec,
                first
            )));
        }
    }
    Ok(first)
}

/// Sums N inputs sample by sample, each scaled by its own gain.
///
/// Every input is read on every cycle; a shorter input contributes silence
/// once it ends. The block length is the longest read of the cycle.
pub struct Mixer {
    inputs: Vec<Box<dyn Source>>,
    ended: Vec<bool>,
    gains: Vec<f32>,
    spec: SignalSpec,
    scratch: Vec<Sample>,
    frames_primary: u64,
    clips: u64,
}

impl Mixer {
    /// Creates a mixer with every gain at `1/N`.
    pub fn new(inputs: Vec<Box<dyn Source>>) -> Result<Self> {
        let spec = common_spec(&inputs)?;
        let n = inputs.len();
        #[allow(clippy::cast_precision_loss)]
        let gain = 1.0 / n as f32;
        Ok(Self {
            ended: vec![false; n],
            gains: vec![gain; n],
            inputs,
            spec,
            scratch: Vec::new(),
            frames_primary: 0,
            clips: 0,
        })
    }

    /// Overrides the leading gains; inputs without a gain keep `1/N`.
    pub fn with_gains(mut self, gains: &[f32]) -> Result<Self> {
        if gains.len() > self.inputs.len() {
            return Err(PipelineError::configuration(format!(
                "{} gains given for {} inputs",
                gains.len(),
                self.inputs.len()
            )));
        }
        self.gains[..gains.len()].copy_from_slice(gains);
        Ok(self)
    }

    /// Per-input gains.
    pub fn gains(&self) -> &[f32] {
        &self.gains
    }

    /// Frames read from the first input, which drives progress reporting.
    pub fn frames_primary(&self) -> u64 {
        self.frames_primary
    }
}

impl Source for Mixer {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
        let want = self.spec.frame_aligned(buf.len());
        let out = &mut buf[..want];
        out.fill(0.0);
        if self.scratch.len() < want {
            self.scratch.resize(want, 0.0);
        }

        let mut longest = 0;
        for (i, input) in self.inputs.iter_mut().enumerate() {
            if self.ended[i] {
                continue;
            }
            let n = match read_full(input.as_mut(), &mut self.scratch[..want]) {
                Ok(n) => n,
                Err(err) => {
                    tracing::warn!(input = i + 1, error = %err, "mix input failed; treating as ended");
                    0
                }
            };
            if n < want {
                self.ended[i] = true;
            }
            let gain = self.gains[i];
            for (o, s) in out[..n].iter_mut().zip(&self.scratch[..n]) {
                *o += s * gain;
            }
            if i == 0 {
                self.frames_primary += self.spec.frames(n) as u64;
            }
            longest = longest.max(n);
        }

        self.clips += clip_block(&mut out[..longest]);
        Ok(longest)
    }

    fn frames_hint(&self) -> Option<u64> {
        self.inputs.first().and_then(|input| input.frames_hint())
    }

    fn clips(&self) -> u64 {
        self.clips
    }

    fn progress_frames(&self) -> Option<u64> {
        Some(self.frames_primary)
    }
}

/// Plays N inputs one after another.
pub struct Concatenate {
    inputs: Vec<Box<dyn Source>>,
    current: usize,
    spec: SignalSpec,
}

impl Concatenate {
    /// Creates a sequence over inputs sharing one rate and channel count.
    pub fn new(inputs: Vec<Box<dyn Source>>) -> Result<Self> {
        let spec = common_spec(&inputs)?;
        Ok(Self {
            inputs,
            current: 0,
            spec,
        })
    }

    /// Index of the input being read.
    pub fn current(&self) -> usize {
        self.current
    }
}

impl Source for Concatenate {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
        while let Some(input) = self.inputs.get_mut(self.current) {
            match input.read(buf) {
                Ok(0) => {}
                Ok(n) => return Ok(n),
                Err(err) => {
                    tracing::warn!(input = self.current + 1, error = %err, "input failed; skipping to next");
                }
            }
            self.current += 1;
            tracing::debug!(input = self.current + 1, "next input");
        }
        Ok(0)
    }

    fn frames_hint(&self) -> Option<u64> {
        self.inputs.iter().map(|input| input.frames_hint()).sum()
    }
}
