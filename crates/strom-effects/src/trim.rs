//! Keeps a window of the stream and ends it early.

use strom_core::{Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome, UsageError};

use crate::args;

/// Passes `length` seconds starting `start` seconds in, then reports
/// end-of-stream so nothing upstream is read any further.
///
/// Times accept `[[hh:]mm:]ss[.frac]`. Without `length` the rest of the
/// stream is kept.
///
/// # Example
///
/// ```rust
/// use strom_core::{Flow, SignalSpec, Stage};
/// use strom_effects::Trim;
///
/// let mut trim = Trim::new();
/// trim.configure(&["0.5".into(), "0.25".into()]).unwrap();
/// let spec = SignalSpec::new(8, 1);
/// trim.start(&spec, &spec).unwrap();
///
/// let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
/// let mut out = [0.0; 8];
/// assert_eq!(trim.process(&input, &mut out), Flow::finished(6, 2));
/// assert_eq!(&out[..2], &[4.0, 5.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trim {
    start_secs: f64,
    length_secs: Option<f64>,
    /// Samples still to discard.
    skip: u64,
    /// Samples still to pass, `None` for unlimited.
    keep: Option<u64>,
}

impl Trim {
    /// Create a trim that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Window start in seconds.
    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    /// Window length in seconds, if bounded.
    pub fn length_secs(&self) -> Option<f64> {
        self.length_secs
    }
}

fn samples_at(secs: f64, spec: &SignalSpec) -> u64 {
    let frames = (secs * f64::from(spec.rate)).round() as u64;
    frames * u64::from(spec.channels)
}

impl Stage for Trim {
    fn name(&self) -> &str {
        "trim"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::MULTICHANNEL.union(StageFlags::UNBOUNDED_LENGTH)
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        args::arity(self.name(), args, 1, 2, "1 or 2 (start [length])")?;
        self.start_secs = args::seconds(self.name(), "start", &args[0])?;
        self.length_secs = match args.get(1) {
            Some(v) => Some(args::seconds(self.name(), "length", v)?),
            None => None,
        };
        Ok(())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        _output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        self.skip = samples_at(self.start_secs, input);
        self.keep = self.length_secs.map(|secs| samples_at(secs, input));
        if self.skip == 0 && self.keep.is_none() {
            return Ok(StartOutcome::Bypass);
        }
        tracing::debug!(skip = self.skip, keep = ?self.keep, "trim window");
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let skipped = usize::try_from(self.skip).map_or(input.len(), |s| s.min(input.len()));
        self.skip -= skipped as u64;
        if self.skip > 0 {
            return Flow::new(skipped, 0);
        }

        let rest = &input[skipped..];
        let mut n = rest.len().min(output.len());
        if let Some(keep) = self.keep {
            n = usize::try_from(keep).map_or(n, |k| k.min(n));
        }
        output[..n].copy_from_slice(&rest[..n]);

        match self.keep.as_mut() {
            Some(keep) => {
                *keep -= n as u64;
                if *keep == 0 {
                    Flow::finished(skipped + n, n)
                } else {
                    Flow::new(skipped + n, n)
                }
            }
            None => Flow::new(skipped + n, n),
        }
    }
}
