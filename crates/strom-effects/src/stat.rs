//! Level statistics, reported when the stage stops.

use strom_core::{
    Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome, linear_to_db, to_unit,
};

/// Running statistics over every sample seen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatReport {
    /// Samples observed (all channels).
    pub samples: u64,
    /// Largest magnitude, normalized to full scale.
    pub peak: f32,
    /// Root mean square, normalized to full scale.
    pub rms: f32,
}

impl StatReport {
    /// Peak level in dBFS.
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak)
    }

    /// RMS level in dBFS.
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms)
    }
}

/// Passes audio through unchanged and logs peak, RMS and sample count at
/// `info` level when stopped.
#[derive(Debug, Clone, Default)]
pub struct Stat {
    samples: u64,
    peak: f32,
    sum_squares: f64,
    spec: Option<SignalSpec>,
}

impl Stat {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics accumulated so far.
    pub fn report(&self) -> StatReport {
        let rms = if self.samples == 0 {
            0.0
        } else {
            (self.sum_squares / self.samples as f64).sqrt() as f32
        };
        StatReport {
            samples: self.samples,
            peak: self.peak,
            rms,
        }
    }
}

impl Stage for Stat {
    fn name(&self) -> &str {
        "stat"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::MULTICHANNEL.union(StageFlags::REPORT_ONLY)
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(Self::new())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        _output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        *self = Self {
            spec: Some(*input),
            ..Self::default()
        };
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        for &s in &input[..n] {
            let unit = to_unit(s);
            self.peak = self.peak.max(unit.abs());
            self.sum_squares += f64::from(unit) * f64::from(unit);
        }
        self.samples += n as u64;
        Flow::new(n, n)
    }

    fn stop(&mut self) {
        let report = self.report();
        let seconds = self
            .spec
            .map_or(0.0, |spec| spec.frames(report.samples as usize) as f64 / f64::from(spec.rate));
        tracing::info!(
            samples = report.samples,
            seconds,
            peak_db = report.peak_db(),
            rms_db = report.rms_db(),
            "stat"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strom_core::from_unit;

    #[test]
    fn passes_audio_unchanged() {
        let spec = SignalSpec::new(8000, 2);
        let mut stat = Stat::new();
        stat.start(&spec, &spec).unwrap();
        let input = [1.0, -2.0, 3.0, -4.0];
        let mut out = [0.0; 4];
        assert_eq!(stat.process(&input, &mut out), Flow::new(4, 4));
        assert_eq!(out, input);
    }

    #[test]
    fn measures_peak_and_rms() {
        let spec = SignalSpec::new(8000, 1);
        let mut stat = Stat::new();
        stat.start(&spec, &spec).unwrap();
        let input = [from_unit(0.5), from_unit(-0.5), from_unit(0.5), from_unit(-0.5)];
        let mut out = [0.0; 4];
        stat.process(&input, &mut out);

        let report = stat.report();
        assert_eq!(report.samples, 4);
        assert!((report.peak - 0.5).abs() < 1e-6);
        assert!((report.rms - 0.5).abs() < 1e-6);
        assert!((report.peak_db() + 6.02).abs() < 0.01);
        stat.stop();
    }

    #[test]
    fn empty_report_is_silent() {
        let report = Stat::new().report();
        assert_eq!(report.samples, 0);
        assert_eq!(report.rms, 0.0);
        assert!(report.rms_db() <= -199.0);
    }

    #[test]
    fn start_resets() {
        let spec = SignalSpec::new(8000, 1);
        let mut stat = Stat::new();
        stat.start(&spec, &spec).unwrap();
        let mut out = [0.0; 1];
        stat.process(&[1.0e9], &mut out);
        stat.start(&spec, &spec).unwrap();
        assert_eq!(stat.report(), StatReport::default());
    }
}
