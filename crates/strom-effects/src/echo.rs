//! Feedback echo with a drained tail.

use strom_core::{
    Drained, Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome, UsageError,
    ms_to_samples,
};

use crate::args;

/// Tail samples below this magnitude (half a 16-bit LSB) count as silence.
const SILENCE: Sample = 32768.0;

/// Feedback comb: `y[n] = x[n] + decay * y[n - D]`.
///
/// Args `delay_ms decay`. After the input ends the stage keeps emitting the
/// decaying repeats until a whole delay period has fallen below half a 16-bit
/// LSB, so the output is longer than the input.
///
/// # Example
///
/// ```rust
/// use strom_core::Stage;
/// use strom_effects::Echo;
///
/// let mut echo = Echo::new();
/// echo.configure(&["250".into(), "0.4".into()]).unwrap();
/// assert_eq!(echo.delay_ms(), 250.0);
/// ```
#[derive(Debug, Clone)]
pub struct Echo {
    delay_ms: f32,
    decay: f32,
    line: Vec<Sample>,
    pos: usize,
    /// Consecutive outputs at or below [`SILENCE`].
    quiet_run: usize,
}

impl Echo {
    /// Create an echo at 250 ms with decay 0.5.
    pub fn new() -> Self {
        Self {
            delay_ms: 250.0,
            decay: 0.5,
            line: Vec::new(),
            pos: 0,
            quiet_run: 0,
        }
    }

    /// Delay time in milliseconds.
    pub fn delay_ms(&self) -> f32 {
        self.delay_ms
    }

    /// Feedback gain per repeat.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    #[inline]
    fn tick(&mut self, input: Sample) -> Sample {
        let y = input + self.decay * self.line[self.pos];
        self.line[self.pos] = y;
        self.pos += 1;
        if self.pos == self.line.len() {
            self.pos = 0;
        }
        if y.abs() <= SILENCE {
            self.quiet_run += 1;
        } else {
            self.quiet_run = 0;
        }
        y
    }

    /// The whole delay line is silent, so every later repeat is too.
    fn tail_done(&self) -> bool {
        self.quiet_run >= self.line.len()
    }
}

impl Default for Echo {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::UNBOUNDED_LENGTH
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }

    fn configure(&mut self, args: &[String]) -> Result<(), UsageError> {
        args::arity(self.name(), args, 2, 2, "2 (delay_ms decay)")?;
        self.delay_ms = args::number_in(self.name(), "delay", &args[0], 1.0..=10_000.0)?;
        self.decay = args::number_in(self.name(), "decay", &args[1], 0.0..=0.95)?;
        Ok(())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        _output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        if input.channels != 1 {
            return Err(StageError::Unsupported(format!(
                "echo is mono, got {} channels",
                input.channels
            )));
        }
        let delay = ms_to_samples(self.delay_ms, input.rate).max(1);
        self.line = vec![0.0; delay];
        self.pos = 0;
        self.quiet_run = delay;
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let n = input.len().min(output.len());
        for (o, &i) in output[..n].iter_mut().zip(&input[..n]) {
            *o = self.tick(i);
        }
        Flow::new(n, n)
    }

    fn drain(&mut self, output: &mut [Sample]) -> Drained {
        let mut produced = 0;
        while produced < output.len() && !self.tail_done() {
            output[produced] = self.tick(0.0);
            produced += 1;
        }
        if self.tail_done() {
            Drained::done(produced)
        } else {
            Drained::more(produced)
        }
    }

    fn stop(&mut self) {
        self.line = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(delay_ms: &str, decay: &str, rate: u32) -> Echo {
        let spec = SignalSpec::new(rate, 1);
        let mut echo = Echo::new();
        echo.configure(&[delay_ms.to_string(), decay.to_string()])
            .unwrap();
        echo.start(&spec, &spec).unwrap();
        echo
    }

    #[test]
    fn repeats_after_delay() {
        // 1 ms at 4 kHz = 4 samples
        let mut echo = started("1", "0.5", 4000);
        let mut input = [0.0; 12];
        input[0] = 1.0e9;
        let mut out = [0.0; 12];
        assert_eq!(echo.process(&input, &mut out), Flow::new(12, 12));
        assert_eq!(out[0], 1.0e9);
        assert_eq!(out[4], 0.5e9);
        assert_eq!(out[8], 0.25e9);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn drain_emits_tail_then_finishes() {
        let mut echo = started("1", "0.5", 4000);
        let mut out = [0.0; 4];
        echo.process(&[1.0e9, 0.0, 0.0, 0.0], &mut out);

        let mut tail = Vec::new();
        let mut chunk = [0.0; 3];
        loop {
            let d = echo.drain(&mut chunk);
            tail.extend_from_slice(&chunk[..d.produced]);
            if d.finished {
                break;
            }
            assert!(d.produced > 0);
        }
        assert_eq!(tail[0], 0.5e9);
        assert!(tail.len() > 4 * 10);
        let last_period = &tail[tail.len() - 4..];
        assert!(last_period.iter().all(|s| s.abs() <= SILENCE));
    }

    #[test]
    fn silent_input_has_no_tail() {
        let mut echo = started("10", "0.9", 8000);
        let mut out = [0.0; 8];
        echo.process(&[0.0; 8], &mut out);
        assert_eq!(echo.drain(&mut out), Drained::done(0));
    }

    #[test]
    fn configure_limits_decay() {
        let mut echo = Echo::new();
        assert!(echo.configure(&["100".into(), "1.0".into()]).is_err());
        assert!(echo.configure(&["100".into()]).is_err());
        assert!(echo.configure(&["0".into(), "0.5".into()]).is_err());
    }
}
