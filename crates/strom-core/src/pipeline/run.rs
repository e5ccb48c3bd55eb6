//! The pull scheduler: Filling → Draining → Done over a built chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PipelineError, Result};
use crate::io::{Sink, Source};
use crate::pipeline::builder::Chain;
use crate::pipeline::entry::ChainEntry;
use crate::stage::StartOutcome;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Reading source blocks and pushing them through the chain.
    Filling,
    /// Source exhausted; flushing stages one at a time.
    Draining,
    /// Every stage drained (or the run was aborted).
    Done,
}

/// Earliest entry that may still need fresh input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Index into the chain; only ever increases during a run.
    pub input_eff: usize,
    /// The entry at `input_eff` has signalled end-of-stream.
    pub input_eff_eof: bool,
}

/// Clip count of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageClips {
    /// Stage name.
    pub stage: String,
    /// Samples clamped at its output.
    pub clips: u64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames taken from the source.
    pub frames_read: u64,
    /// Samples handed to the sink.
    pub samples_written: u64,
    /// Per-stage clip counts, in chain order.
    pub stage_clips: Vec<StageClips>,
    /// Clips reported by the source (the mix front-end's summation).
    pub input_clips: u64,
    /// The abort flag stopped the run early.
    pub aborted: bool,
}

impl RunSummary {
    /// Clips across every stage and the source.
    pub fn total_clips(&self) -> u64 {
        self.input_clips + self.stage_clips.iter().map(|c| c.clips).sum::<u64>()
    }
}

/// One run of a pipeline over a source and a sink.
///
/// Owns the chain, the cursor and every buffer. Every stage that was started
/// is stopped exactly once, when [`run`](Self::run) returns or when the run is
/// dropped, whichever comes first.
pub struct PipelineRun {
    chain: Vec<ChainEntry>,
    block_len: usize,
    cursor: Cursor,
    state: RunState,
    abort: Option<Arc<AtomicBool>>,
    summary: RunSummary,
    used: bool,
}

impl PipelineRun {
    /// Wraps a built chain.
    pub fn new(chain: Chain) -> Self {
        Self {
            block_len: chain.config.block_len,
            chain: chain.entries,
            cursor: Cursor::default(),
            state: RunState::Filling,
            abort: None,
            summary: RunSummary::default(),
            used: false,
        }
    }

    /// Installs an external abort flag, checked once per cycle.
    #[must_use]
    pub fn with_abort(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Current scheduler state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Chain entries, input slot first. Bypassed stages are gone once the
    /// run has started.
    pub fn entries(&self) -> &[ChainEntry] {
        &self.chain
    }

    /// Streams `source` through the chain into `sink`.
    ///
    /// The sink is not finalized; call [`Sink::finish`] afterwards.
    pub fn run(&mut self, source: &mut dyn Source, sink: &mut dyn Sink) -> Result<RunSummary> {
        if self.used {
            return Err(PipelineError::configuration("a pipeline run can only be used once"));
        }
        self.used = true;
        self.check_endpoints(source, sink)?;

        let result = self.start().and_then(|()| self.drive(source, sink));
        self.stop_all();
        result?;

        self.summary.input_clips += source.clips();
        self.summary.stage_clips = self
            .chain
            .iter()
            .skip(1)
            .map(|e| StageClips {
                stage: e.name().to_string(),
                clips: e.clips(),
            })
            .collect();
        for c in self.summary.stage_clips.iter().filter(|c| c.clips > 0) {
            tracing::warn!(stage = %c.stage, clips = c.clips, "stage output clipped");
        }
        if self.summary.input_clips > 0 {
            tracing::warn!(clips = self.summary.input_clips, "input clipped");
        }
        Ok(self.summary.clone())
    }

    fn check_endpoints(&self, source: &dyn Source, sink: &dyn Sink) -> Result<()> {
        let expected = self.chain[0].output_spec();
        if !source.spec().same_shape(expected) {
            return Err(PipelineError::configuration(format!(
                "source delivers {} but the chain was built for {}",
                source.spec(),
                expected
            )));
        }
        let delivered = self.chain[self.chain.len() - 1].output_spec();
        if !sink.spec().same_shape(delivered) {
            return Err(PipelineError::configuration(format!(
                "chain delivers {} but the sink expects {}",
                delivered,
                sink.spec()
            )));
        }
        Ok(())
    }

    /// Starts every entry in order, eliding those that bypass.
    fn start(&mut self) -> Result<()> {
        let mut e = 0;
        while e < self.chain.len() {
            match self.chain[e].start(self.block_len)? {
                StartOutcome::Proceed => e += 1,
                StartOutcome::Bypass => {
                    let entry = &self.chain[e];
                    if !entry.input_spec().same_shape(entry.output_spec()) {
                        return Err(PipelineError::configuration(format!(
                            "stage '{}' bypassed while converting {} to {}",
                            entry.name(),
                            entry.input_spec(),
                            entry.output_spec()
                        )));
                    }
                    tracing::debug!(stage = entry.name(), "stage bypassed");
                    let mut entry = self.chain.remove(e);
                    entry.stop();
                }
            }
        }
        Ok(())
    }

    fn stop_all(&mut self) {
        for entry in &mut self.chain {
            entry.stop();
        }
    }

    fn aborted(&self) -> bool {
        self.abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn drive(&mut self, source: &mut dyn Source, sink: &mut dyn Sink) -> Result<()> {
        self.cursor = Cursor::default();
        self.state = RunState::Filling;
        while self.state != RunState::Done {
            if self.aborted() {
                let dropped: usize = self.chain.iter_mut().map(ChainEntry::discard).sum();
                tracing::info!(discarded = dropped, "run aborted");
                self.summary.aborted = true;
                self.state = RunState::Done;
                break;
            }
            match self.state {
                RunState::Filling => self.fill(source, sink)?,
                RunState::Draining => self.drain_step(sink)?,
                RunState::Done => {}
            }
        }
        Ok(())
    }

    /// Reads one block into slot 0 and pushes it as far as it goes.
    fn fill(&mut self, source: &mut dyn Source, sink: &mut dyn Sink) -> Result<()> {
        let spec = *self.chain[0].output_spec();
        let mut want = spec.frame_aligned(self.chain[0].buffer.reserve());
        if want == 0 {
            self.discard_stranded();
            want = spec.frame_aligned(self.chain[0].buffer.reserve());
            if want == 0 {
                return Err(self.stalled("process"));
            }
        }

        let slot = &mut self.chain[0].buffer;
        let read = match source.read(&mut slot.writable()[..want]) {
            Ok(n) => n.min(want),
            Err(err) => {
                tracing::warn!(error = %err, "read failed; treating as end of input");
                0
            }
        };
        if read == 0 {
            tracing::debug!("input exhausted");
            self.state = RunState::Draining;
            return Ok(());
        }
        self.summary.input_clips += slot.commit(read);
        self.summary.frames_read += spec.frames(read) as u64;

        self.flow_out(sink)?;
        if self.cursor.input_eff > 0 {
            self.state = RunState::Draining;
        }
        Ok(())
    }

    /// One step of the drain sequence.
    fn drain_step(&mut self, sink: &mut dyn Sink) -> Result<()> {
        if self.cursor.input_eff == 0 {
            let left = self.chain[0].discard();
            if left > 0 {
                tracing::warn!(samples = left, "discarding partial frame at end of input");
            }
            self.advance(1);
        }
        let e = self.cursor.input_eff;
        if e >= self.chain.len() {
            self.state = RunState::Done;
            return Ok(());
        }
        self.cursor.input_eff_eof = true;

        let drained = self.chain[e].drain()?;
        if self.chain[e].is_drained() && !self.chain[e].holds_data() {
            self.advance(e + 1);
            return Ok(());
        }
        let moved = self.flow_out(sink)?;
        if !drained && !moved && self.discard_stranded() == 0 {
            return Err(self.stalled("drain"));
        }
        Ok(())
    }

    fn advance(&mut self, to: usize) {
        self.cursor = Cursor {
            input_eff: to,
            input_eff_eof: false,
        };
        tracing::debug!(input_eff = to, "cursor advanced");
    }

    /// Repeats pull passes while they make progress. Returns `true` if any did.
    fn flow_out(&mut self, sink: &mut dyn Sink) -> Result<bool> {
        let mut any = false;
        while self.sweep(sink)? {
            any = true;
        }
        Ok(any)
    }

    /// One backward pull pass from the tail to the cursor, then a sink write.
    fn sweep(&mut self, sink: &mut dyn Sink) -> Result<bool> {
        let last = self.chain.len() - 1;
        let from = self.cursor.input_eff.max(1);
        let mut moved = false;

        for e in (from..=last).rev() {
            if e == self.cursor.input_eff && self.cursor.input_eff_eof {
                continue;
            }
            let (head, tail) = self.chain.split_at_mut(e);
            let upstream = &mut head[e - 1].buffer;
            let entry = &mut tail[0];
            if entry.can_flow(upstream) && entry.buffer.reserve() > 0 {
                let report = entry.flow(upstream)?;
                moved |= report.moved;
                if report.end_of_stream {
                    self.end_stream_at(e);
                    break;
                }
            }
            if e != last && !self.chain[e].buffer.is_empty() {
                break;
            }
        }

        let out = &mut self.chain[last].buffer;
        if !out.is_empty() {
            sink.write(out.readable()).map_err(PipelineError::Write)?;
            self.summary.samples_written += out.pending() as u64;
            out.clear();
            moved = true;
        }
        Ok(moved)
    }

    /// Entry `e` wants no more input: abandon everything upstream of it.
    fn end_stream_at(&mut self, e: usize) {
        let dropped: usize = self.chain[..e].iter_mut().map(ChainEntry::discard).sum();
        self.cursor = Cursor {
            input_eff: e,
            input_eff_eof: true,
        };
        tracing::debug!(
            stage = self.chain[e].name(),
            input_eff = e,
            discarded = dropped,
            "stage ended the stream"
        );
    }

    /// Drops samples that the next entry can never accept (partial frames
    /// in front of a stage pair). Returns the samples dropped.
    fn discard_stranded(&mut self) -> usize {
        let mut dropped = 0;
        for e in self.cursor.input_eff..self.chain.len() - 1 {
            let (head, tail) = self.chain.split_at_mut(e + 1);
            let buffer = &mut head[e].buffer;
            if !buffer.is_empty() && !tail[0].can_flow(buffer) {
                dropped += buffer.pending();
                buffer.clear();
            }
        }
        if dropped > 0 {
            tracing::warn!(samples = dropped, "discarding partial frames");
        }
        dropped
    }

    fn stalled(&self, call: &'static str) -> PipelineError {
        let stage = self
            .chain
            .get(self.cursor.input_eff.max(1))
            .or_else(|| self.chain.last())
            .map_or("input", ChainEntry::name);
        PipelineError::ContractViolation {
            stage: stage.to_string(),
            call,
            detail: "no stage can make progress".to_string(),
        }
    }
}

impl Drop for PipelineRun {
    fn drop(&mut self) {
        self.stop_all();
    }
}
