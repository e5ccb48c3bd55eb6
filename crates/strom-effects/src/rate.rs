//! Streaming rational-ratio sample rate conversion.
//!
//! The ratio `out/in` is reduced to `L/M`. Conceptually the input is
//! zero-stuffed by `L`, lowpass filtered with a Blackman-windowed sinc, and
//! decimated by `M`; the polyphase form only evaluates the taps that land on
//! real input samples, so each output costs `taps / L` multiplies.
//!
//! # Latency
//!
//! The filter is linear phase and its group delay is compensated: output
//! sample `k` is centred on input time `k·M/L`. Flow therefore lags the input
//! by half the filter span, and `drain` emits that look-ahead by padding with
//! zeros until `ceil(n·L/M)` samples have been produced for `n` inputs.

use std::collections::VecDeque;

use libm::{cos, sin};
use strom_core::{Drained, Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome};

/// Largest `L` or `M` the converter accepts.
pub const MAX_FACTOR: u64 = 8192;

/// Zero crossings of the sinc kept on each side, in input-rate samples.
const HALF_WIDTH: usize = 16;

/// Fraction of the lower Nyquist frequency left in the passband.
const PASSBAND: f64 = 0.95;

/// Designs a linear-phase lowpass FIR with a Blackman window.
///
/// `cutoff` is normalized to Nyquist (1.0 = half the sample rate). The taps
/// are scaled so they sum to `gain`.
///
/// # Example
///
/// ```rust
/// use strom_effects::rate::design_lowpass;
///
/// let taps = design_lowpass(63, 0.25, 1.0);
/// let sum: f32 = taps.iter().sum();
/// assert!((sum - 1.0).abs() < 1e-4);
/// assert_eq!(taps[0], taps[62]);
/// ```
pub fn design_lowpass(num_taps: usize, cutoff: f64, gain: f64) -> Vec<f32> {
    use core::f64::consts::PI;

    if num_taps == 0 {
        return Vec::new();
    }
    let m = (num_taps - 1) as f64;
    let raw: Vec<f64> = (0..num_taps)
        .map(|n| {
            let x = n as f64 - m / 2.0;
            let sinc = if x.abs() < 1e-9 {
                cutoff
            } else {
                sin(PI * cutoff * x) / (PI * x)
            };
            let window = if num_taps == 1 {
                1.0
            } else {
                let phase = 2.0 * PI * n as f64 / m;
                0.42 - 0.5 * cos(phase) + 0.08 * cos(2.0 * phase)
            };
            sinc * window
        })
        .collect();

    let sum: f64 = raw.iter().sum();
    let scale = if sum.abs() > 1e-12 { gain / sum } else { gain };
    raw.iter().map(|&c| (c * scale) as f32).collect()
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Polyphase decomposition of the interpolation filter.
#[derive(Debug, Clone)]
struct Polyphase {
    up: u64,
    down: u64,
    taps: Vec<f32>,
    /// Taps per phase, rounded up.
    span: usize,
    /// Group delay in upsampled samples.
    delay: u64,
}

impl Polyphase {
    fn new(in_rate: u32, out_rate: u32) -> Result<Self, StageError> {
        let g = gcd(u64::from(in_rate), u64::from(out_rate));
        let (up, down) = (u64::from(out_rate) / g, u64::from(in_rate) / g);
        let factor = up.max(down);
        if factor > MAX_FACTOR {
            return Err(StageError::Unsupported(format!(
                "{in_rate} Hz -> {out_rate} Hz reduces to {up}/{down}, above the limit of {MAX_FACTOR}"
            )));
        }

        let num_taps = 2 * HALF_WIDTH * factor as usize + 1;
        let taps = design_lowpass(num_taps, PASSBAND / factor as f64, up as f64);
        Ok(Self {
            up,
            down,
            span: num_taps.div_ceil(up as usize),
            delay: (num_taps as u64 - 1) / 2,
            taps,
        })
    }

    /// Position of output `k` in the upsampled stream: (newest input index, phase).
    #[inline]
    fn locate(&self, k: u64) -> (u64, usize) {
        let t = k * self.down + self.delay;
        (t / self.up, (t % self.up) as usize)
    }

    /// Outputs owed for `inputs` samples, `ceil(inputs·L/M)`.
    fn total_out(&self, inputs: u64) -> u64 {
        (inputs * self.up).div_ceil(self.down)
    }
}

/// Automatic (or user-requested) rate conversion stage. Mono; a pair handles
/// stereo.
#[derive(Debug, Clone, Default)]
pub struct RateConverter {
    kernel: Option<Polyphase>,
    history: VecDeque<Sample>,
    /// Absolute input index of `history[0]`.
    history_start: u64,
    received: u64,
    emitted: u64,
}

impl RateConverter {
    /// Create an unstarted converter; the ratio is fixed in `start`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduced `(L, M)` ratio once started.
    pub fn ratio(&self) -> Option<(u64, u64)> {
        self.kernel.as_ref().map(|k| (k.up, k.down))
    }

    /// Input sample at absolute index `newest - back`, zero outside the data.
    #[inline]
    fn input_at(&self, newest: u64, back: usize) -> Sample {
        match newest.checked_sub(back as u64) {
            Some(i) if i >= self.history_start && i < self.received => {
                self.history[(i - self.history_start) as usize]
            }
            _ => 0.0,
        }
    }

    fn compute(kernel: &Polyphase, this: &Self, k: u64) -> Sample {
        let (newest, phase) = kernel.locate(k);
        let step = kernel.up as usize;
        let mut acc = 0.0f32;
        for (j, &tap) in kernel.taps[phase..].iter().step_by(step).enumerate() {
            acc += tap * this.input_at(newest, j);
        }
        acc
    }

    /// Drops history no future output can reach.
    fn forget(&mut self, kernel: &Polyphase) {
        let (newest, _) = kernel.locate(self.emitted);
        let oldest = newest.saturating_sub(kernel.span as u64 - 1);
        while self.history_start < oldest && !self.history.is_empty() {
            self.history.pop_front();
            self.history_start += 1;
        }
    }
}

impl Stage for RateConverter {
    fn name(&self) -> &str {
        "rate"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::RATE
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(Self::new())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        if input.rate == output.rate {
            return Ok(StartOutcome::Bypass);
        }
        if input.channels != 1 {
            return Err(StageError::Unsupported(format!(
                "rate is mono, got {} channels",
                input.channels
            )));
        }
        let kernel = Polyphase::new(input.rate, output.rate)?;
        tracing::debug!(
            from = input.rate,
            to = output.rate,
            up = kernel.up,
            down = kernel.down,
            taps = kernel.taps.len(),
            "rate converter"
        );
        *self = Self {
            history: VecDeque::with_capacity(kernel.span + 1),
            kernel: Some(kernel),
            ..Self::default()
        };
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let Some(kernel) = self.kernel.take() else {
            return Flow::default();
        };
        let (mut consumed, mut produced) = (0, 0);
        loop {
            let (newest, _) = kernel.locate(self.emitted);
            if newest < self.received {
                if produced == output.len() {
                    break;
                }
                output[produced] = Self::compute(&kernel, self, self.emitted);
                produced += 1;
                self.emitted += 1;
                self.forget(&kernel);
            } else if consumed < input.len() {
                self.history.push_back(input[consumed]);
                consumed += 1;
                self.received += 1;
            } else {
                break;
            }
        }
        self.kernel = Some(kernel);
        Flow::new(consumed, produced)
    }

    fn drain(&mut self, output: &mut [Sample]) -> Drained {
        let Some(kernel) = self.kernel.take() else {
            return Drained::done(0);
        };
        let total = kernel.total_out(self.received);
        let mut produced = 0;
        while produced < output.len() && self.emitted < total {
            output[produced] = Self::compute(&kernel, self, self.emitted);
            produced += 1;
            self.emitted += 1;
        }
        let finished = self.emitted >= total;
        self.kernel = Some(kernel);
        if finished {
            Drained::done(produced)
        } else {
            Drained::more(produced)
        }
    }

    fn stop(&mut self) {
        if self.kernel.is_some() {
            tracing::debug!(received = self.received, emitted = self.emitted, "rate converter stopped");
        }
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(from: u32, to: u32) -> RateConverter {
        let mut rate = RateConverter::new();
        let outcome = rate
            .start(&SignalSpec::new(from, 1), &SignalSpec::new(to, 1))
            .unwrap();
        assert_eq!(outcome, StartOutcome::Proceed);
        rate
    }

    /// Runs the whole input through in `chunk`-sized calls, then drains.
    fn convert(rate: &mut RateConverter, input: &[Sample], chunk: usize) -> Vec<Sample> {
        let mut out = Vec::new();
        let mut buf = vec![0.0; chunk];
        let mut pos = 0;
        while pos < input.len() {
            let end = (pos + chunk).min(input.len());
            let flow = rate.process(&input[pos..end], &mut buf);
            assert!(flow.consumed + flow.produced > 0);
            out.extend_from_slice(&buf[..flow.produced]);
            pos += flow.consumed;
        }
        loop {
            let d = rate.drain(&mut buf);
            out.extend_from_slice(&buf[..d.produced]);
            if d.finished {
                return out;
            }
            assert!(d.produced > 0);
        }
    }

    #[test]
    fn equal_rates_bypass() {
        let spec = SignalSpec::new(44100, 2);
        assert_eq!(
            RateConverter::new().start(&spec, &spec),
            Ok(StartOutcome::Bypass)
        );
    }

    #[test]
    fn ratios_reduce() {
        assert_eq!(started(44100, 48000).ratio(), Some((160, 147)));
        assert_eq!(started(48000, 8000).ratio(), Some((1, 6)));
    }

    #[test]
    fn oversized_ratio_is_unsupported() {
        // 9973 is prime
        let err = RateConverter::new()
            .start(&SignalSpec::new(8000, 1), &SignalSpec::new(9973, 1))
            .unwrap_err();
        assert!(matches!(err, StageError::Unsupported(_)));
    }

    #[test]
    fn rejects_stereo() {
        let err = RateConverter::new()
            .start(&SignalSpec::new(48000, 2), &SignalSpec::new(8000, 2))
            .unwrap_err();
        assert!(matches!(err, StageError::Unsupported(_)));
    }

    #[test]
    fn output_length_follows_ratio() {
        let input = vec![0.0; 1000];
        assert_eq!(convert(&mut started(8000, 16000), &input, 64).len(), 2000);
        assert_eq!(convert(&mut started(48000, 8000), &input, 64).len(), 167);
        assert_eq!(convert(&mut started(44100, 48000), &input, 100).len(), 1089);
    }

    #[test]
    fn dc_level_is_preserved() {
        let input = vec![1.0e6; 2000];
        let out = convert(&mut started(8000, 11025), &input, 128);
        let mid = out.len() / 2;
        for &s in &out[mid - 50..mid + 50] {
            assert!((s / 1.0e6 - 1.0).abs() < 0.01, "dc drifted: {s}");
        }
    }

    #[test]
    fn chunking_does_not_change_output() {
        let input: Vec<Sample> = (0..600).map(|i| ((i * 37) % 101) as f32 * 1.0e5).collect();
        let a = convert(&mut started(16000, 12000), &input, 7);
        let b = convert(&mut started(16000, 12000), &input, 512);
        assert_eq!(a, b);
    }

    #[test]
    fn downsampling_rejects_aliases() {
        use core::f32::consts::PI;
        let input: Vec<Sample> = (0..4800)
            .map(|i| 1.0e9 * (2.0 * PI * 10_000.0 * i as f32 / 48000.0).sin())
            .collect();
        let out = convert(&mut started(48000, 8000), &input, 256);
        let peak = out[100..700].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak < 1.0e7, "alias leaked: {peak}");
    }

    #[test]
    fn history_stays_bounded() {
        let mut rate = started(8000, 48000);
        let mut out = vec![0.0; 4096];
        rate.process(&vec![1.0; 4096], &mut out);
        assert!(rate.history.len() <= 2 * HALF_WIDTH + 2);
    }
}
