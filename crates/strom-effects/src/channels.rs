//! Channel-count conversion.
//!
//! [`ChannelMixer`] is the automatic stage the chain builder inserts when the
//! source and sink channel counts differ. Reduction averages input channels
//! onto each output (`out[j]` takes every input `i` with `i % out == j`);
//! expansion duplicates (`out[j] = in[j % in]`). The user-facing
//! [`Remix`](crate::Remix) shares the same frame engine with an explicit map.

use strom_core::{
    Drained, Flow, Sample, SignalSpec, Stage, StageError, StageFlags, StartOutcome,
};

/// Per-output lists of 0-based input channels to average.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    inputs: usize,
    sources: Vec<Vec<usize>>,
}

impl ChannelMap {
    /// Builds a map from explicit source lists.
    ///
    /// An empty list produces silence on that output.
    pub fn new(inputs: usize, sources: Vec<Vec<usize>>) -> Result<Self, StageError> {
        if inputs == 0 || sources.is_empty() {
            return Err(StageError::Invalid("channel map needs at least one input and output".into()));
        }
        if let Some(bad) = sources.iter().flatten().find(|&&i| i >= inputs) {
            return Err(StageError::Invalid(format!(
                "input channel {} does not exist ({inputs} channels)",
                bad + 1
            )));
        }
        Ok(Self { inputs, sources })
    }

    /// The default mapping between two channel counts.
    pub fn automatic(inputs: usize, outputs: usize) -> Result<Self, StageError> {
        let sources = if outputs < inputs {
            (0..outputs)
                .map(|j| (j..inputs).step_by(outputs).collect())
                .collect()
        } else {
            (0..outputs).map(|j| vec![j % inputs.max(1)]).collect()
        };
        Self::new(inputs, sources)
    }

    /// Input channel count.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Output channel count.
    pub fn outputs(&self) -> usize {
        self.sources.len()
    }

    /// Source lists, one per output channel.
    pub fn sources(&self) -> &[Vec<usize>] {
        &self.sources
    }

    fn mix(&self, frame: &[Sample], out: &mut Vec<Sample>) {
        out.clear();
        for list in &self.sources {
            if list.is_empty() {
                out.push(0.0);
            } else {
                let sum: f64 = list.iter().map(|&i| f64::from(frame[i])).sum();
                out.push((sum / list.len() as f64) as Sample);
            }
        }
    }
}

/// Streams interleaved frames through a [`ChannelMap`].
///
/// Works sample by sample at the edges so partial frames on either side
/// never stall the caller.
#[derive(Debug, Clone)]
pub(crate) struct FrameMixer {
    map: ChannelMap,
    frame_in: Vec<Sample>,
    frame_out: Vec<Sample>,
    out_pos: usize,
}

impl FrameMixer {
    pub(crate) fn new(map: ChannelMap) -> Self {
        let (inputs, outputs) = (map.inputs(), map.outputs());
        Self {
            map,
            frame_in: Vec::with_capacity(inputs),
            frame_out: Vec::with_capacity(outputs),
            out_pos: 0,
        }
    }

    fn flush(&mut self, output: &mut [Sample]) -> usize {
        let n = (self.frame_out.len() - self.out_pos).min(output.len());
        output[..n].copy_from_slice(&self.frame_out[self.out_pos..self.out_pos + n]);
        self.out_pos += n;
        n
    }

    pub(crate) fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let (mut consumed, mut produced) = (0, 0);
        loop {
            produced += self.flush(&mut output[produced..]);
            if self.out_pos < self.frame_out.len() {
                break;
            }

            let want = self.map.inputs() - self.frame_in.len();
            let take = want.min(input.len() - consumed);
            self.frame_in
                .extend_from_slice(&input[consumed..consumed + take]);
            consumed += take;
            if self.frame_in.len() < self.map.inputs() {
                break;
            }

            self.map.mix(&self.frame_in, &mut self.frame_out);
            self.frame_in.clear();
            self.out_pos = 0;
        }
        Flow::new(consumed, produced)
    }

    /// Emits any half-written output frame; a partial input frame is dropped.
    pub(crate) fn drain(&mut self, output: &mut [Sample]) -> Drained {
        let produced = self.flush(output);
        if self.out_pos < self.frame_out.len() {
            Drained::more(produced)
        } else {
            self.frame_in.clear();
            Drained::done(produced)
        }
    }
}

/// Automatic channel mixdown / upmix stage.
#[derive(Debug, Clone, Default)]
pub struct ChannelMixer {
    mixer: Option<FrameMixer>,
}

impl ChannelMixer {
    /// Create an unstarted mixer; the mapping is fixed in `start`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for ChannelMixer {
    fn name(&self) -> &str {
        "channels"
    }

    fn flags(&self) -> StageFlags {
        StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL)
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(Self::new())
    }

    fn start(
        &mut self,
        input: &SignalSpec,
        output: &SignalSpec,
    ) -> Result<StartOutcome, StageError> {
        if input.channels == output.channels {
            return Ok(StartOutcome::Bypass);
        }
        let map = ChannelMap::automatic(usize::from(input.channels), usize::from(output.channels))?;
        tracing::debug!(
            from = input.channels,
            to = output.channels,
            sources = ?map.sources(),
            "channel map"
        );
        self.mixer = Some(FrameMixer::new(map));
        Ok(StartOutcome::Proceed)
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        match self.mixer.as_mut() {
            Some(mixer) => mixer.process(input, output),
            None => Flow::default(),
        }
    }

    fn drain(&mut self, output: &mut [Sample]) -> Drained {
        match self.mixer.as_mut() {
            Some(mixer) => mixer.drain(output),
            None => Drained::done(0),
        }
    }

    fn stop(&mut self) {
        self.mixer = None;
    }
}
