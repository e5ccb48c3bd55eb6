//! Chain entries: the input slot, single stages and stage pairs.
//!
//! Every entry owns one interleaved output [`StageBuffer`]. A stage pair
//! additionally owns two mono [`Lane`]s, each with its own de-interleaved
//! input and output scratch buffers, so the left and right halves keep
//! independent counters and a count mismatch never corrupts the stream.

use crate::error::PipelineError;
use crate::pipeline::buffer::StageBuffer;
use crate::signal::SignalSpec;
use crate::stage::{Stage, StageFlags, StartOutcome};

/// What one flow call on an entry achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FlowReport {
    /// Anything moved (consumed, produced, or shuffled between lanes).
    pub moved: bool,
    /// The stage asked for no further input.
    pub end_of_stream: bool,
}

/// One half of a stage pair.
pub(crate) struct Lane {
    stage: Box<dyn Stage>,
    input: StageBuffer,
    output: StageBuffer,
    clips: u64,
    started: bool,
    finished: bool,
}

impl Lane {
    fn new(stage: Box<dyn Stage>) -> Self {
        Self {
            stage,
            input: StageBuffer::new(0),
            output: StageBuffer::new(0),
            clips: 0,
            started: false,
            finished: false,
        }
    }

    fn holds_data(&self) -> bool {
        !self.input.is_empty() || !self.output.is_empty()
    }

    /// One `process` call from the lane input into the lane output.
    fn step(&mut self) -> Result<FlowReport, PipelineError> {
        let space = self.output.reserve();
        let input = self.input.readable();
        if input.is_empty() || space == 0 {
            return Ok(FlowReport::default());
        }
        let given = input.len();
        let flow = self.stage.process(input, self.output.writable());
        check_flow(self.stage.name(), given, space, flow.consumed, flow.produced)?;
        if flow.consumed == 0 && flow.produced == 0 && !flow.end_of_stream {
            return Err(stalled(self.stage.name(), given, space));
        }
        self.input.consume(flow.consumed);
        self.clips += self.output.commit(flow.produced);
        Ok(FlowReport {
            moved: flow.consumed + flow.produced > 0,
            end_of_stream: flow.end_of_stream,
        })
    }

    /// Output room if the lane is ready to drain, else zero.
    fn ready_room(&mut self) -> usize {
        if self.finished || !self.input.is_empty() {
            0
        } else {
            self.output.reserve()
        }
    }

    /// One `drain` call limited to `capacity` output samples.
    fn drain(&mut self, capacity: usize) -> Result<usize, PipelineError> {
        if self.finished || capacity == 0 {
            return Ok(0);
        }
        self.output.reserve();
        let out = &mut self.output.writable()[..capacity];
        let drained = self.stage.drain(out);
        check_drain(self.stage.name(), capacity, drained.produced, drained.finished)?;
        self.clips += self.output.commit(drained.produced);
        self.finished = drained.finished;
        Ok(drained.produced)
    }
}

/// Left/right instances standing in for one mono-only stage.
pub(crate) struct StagePair {
    left: Lane,
    right: Lane,
    mismatch_logged: bool,
}

impl StagePair {
    fn lanes_hold_data(&self) -> bool {
        self.left.holds_data() || self.right.holds_data()
    }

    /// Moves whole frames from the interleaved upstream into the lanes.
    fn deinterleave(&mut self, upstream: &mut StageBuffer) -> usize {
        let frames = (upstream.pending() / 2)
            .min(self.left.input.reserve())
            .min(self.right.input.reserve());
        if frames == 0 {
            return 0;
        }
        let src = upstream.readable();
        let left = self.left.input.writable();
        let right = self.right.input.writable();
        for (f, frame) in src.chunks_exact(2).take(frames).enumerate() {
            left[f] = frame[0];
            right[f] = frame[1];
        }
        self.left.input.commit(frames);
        self.right.input.commit(frames);
        upstream.consume(frames * 2);
        frames
    }

    /// Interleaves matching lane output into `out`; the shorter lane governs.
    fn interleave(&mut self, name: &str, out: &mut StageBuffer) -> usize {
        let (l, r) = (self.left.output.pending(), self.right.output.pending());
        if l != r && l > 0 && r > 0 && !self.mismatch_logged {
            tracing::warn!(stage = name, left = l, right = r, "stage pair produced unequal counts");
            self.mismatch_logged = true;
        }
        let frames = l.min(r).min(out.reserve() / 2);
        if frames == 0 {
            return 0;
        }
        let dst = out.writable();
        let (left, right) = (self.left.output.readable(), self.right.output.readable());
        for f in 0..frames {
            dst[2 * f] = left[f];
            dst[2 * f + 1] = right[f];
        }
        self.left.output.consume(frames);
        self.right.output.consume(frames);
        out.commit(frames * 2);
        frames * 2
    }

    /// Drops lane output that can never be matched because the other lane
    /// has finished and holds nothing. Returns the samples dropped.
    fn discard_unmatched(&mut self, name: &str) -> usize {
        let left_spent = self.left.finished && !self.left.holds_data();
        let right_spent = self.right.finished && !self.right.holds_data();
        let stranded = if left_spent {
            &mut self.right.output
        } else if right_spent {
            &mut self.left.output
        } else {
            return 0;
        };
        let dropped = stranded.pending();
        if dropped > 0 {
            tracing::warn!(stage = name, samples = dropped, "discarding unmatched stage pair output");
            stranded.clear();
        }
        dropped
    }
}

/// The processing behind an entry.
pub(crate) enum Processor {
    /// Slot 0: the raw input buffer filled by the driver.
    Input,
    /// A stage handling the whole interleaved stream.
    Single(Box<dyn Stage>),
    /// Two mono instances of a mono-only stage.
    Pair(Box<StagePair>),
}

/// One link of a built chain.
pub struct ChainEntry {
    name: String,
    flags: StageFlags,
    automatic: bool,
    input: SignalSpec,
    output: SignalSpec,
    pub(crate) processor: Processor,
    pub(crate) buffer: StageBuffer,
    clips: u64,
    started: bool,
    drained: bool,
}

impl ChainEntry {
    pub(crate) fn input_slot(spec: SignalSpec) -> Self {
        Self {
            name: "input".to_string(),
            flags: StageFlags::MULTICHANNEL,
            automatic: false,
            input: spec,
            output: spec,
            processor: Processor::Input,
            buffer: StageBuffer::new(0),
            clips: 0,
            started: false,
            drained: true,
        }
    }

    pub(crate) fn single(
        stage: Box<dyn Stage>,
        input: SignalSpec,
        output: SignalSpec,
        automatic: bool,
    ) -> Self {
        Self {
            name: stage.name().to_string(),
            flags: stage.flags(),
            automatic,
            input,
            output,
            processor: Processor::Single(stage),
            buffer: StageBuffer::new(0),
            clips: 0,
            started: false,
            drained: false,
        }
    }

    pub(crate) fn pair(
        left: Box<dyn Stage>,
        right: Box<dyn Stage>,
        input: SignalSpec,
        output: SignalSpec,
        automatic: bool,
    ) -> Self {
        Self {
            name: left.name().to_string(),
            flags: left.flags(),
            automatic,
            input,
            output,
            processor: Processor::Pair(Box::new(StagePair {
                left: Lane::new(left),
                right: Lane::new(right),
                mismatch_logged: false,
            })),
            buffer: StageBuffer::new(0),
            clips: 0,
            started: false,
            drained: false,
        }
    }

    /// Stage name (`input` for slot 0).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities declared by the stage.
    pub fn flags(&self) -> StageFlags {
        self.flags
    }

    /// True if the chain builder inserted this stage.
    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    /// True for a left/right stage pair.
    pub fn is_pair(&self) -> bool {
        matches!(self.processor, Processor::Pair(_))
    }

    /// True for slot 0.
    pub fn is_input(&self) -> bool {
        matches!(self.processor, Processor::Input)
    }

    /// Negotiated input descriptor.
    pub fn input_spec(&self) -> &SignalSpec {
        &self.input
    }

    /// Negotiated output descriptor.
    pub fn output_spec(&self) -> &SignalSpec {
        &self.output
    }

    /// The entry's interleaved output buffer.
    pub fn buffer(&self) -> &StageBuffer {
        &self.buffer
    }

    /// Samples clamped at this entry's output so far.
    pub fn clips(&self) -> u64 {
        let lanes = match &self.processor {
            Processor::Pair(pair) => pair.left.clips + pair.right.clips,
            _ => 0,
        };
        self.clips + lanes
    }

    /// True once `drain` has reported completion.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// True while any sample is held by this entry: its output buffer or,
    /// for a pair, the lane scratch buffers.
    pub fn holds_data(&self) -> bool {
        if !self.buffer.is_empty() {
            return true;
        }
        match &self.processor {
            Processor::Pair(pair) => pair.lanes_hold_data(),
            _ => false,
        }
    }

    /// Allocates buffers and starts the stage(s).
    ///
    /// On failure any lane already started stays marked as started so that
    /// [`stop`](Self::stop) tears it down.
    pub(crate) fn start(&mut self, block_len: usize) -> Result<StartOutcome, PipelineError> {
        let channels = usize::from(self.output.channels.max(1));
        let capacity = (block_len / channels).max(1) * channels;
        self.buffer = StageBuffer::new(capacity);
        self.drained = false;

        let name = self.name.clone();
        let failed = |source| PipelineError::Stage {
            stage: name.clone(),
            source,
        };
        match &mut self.processor {
            Processor::Input => {
                self.drained = true;
                Ok(StartOutcome::Proceed)
            }
            Processor::Single(stage) => {
                let outcome = stage.start(&self.input, &self.output).map_err(failed)?;
                self.started = true;
                Ok(outcome)
            }
            Processor::Pair(pair) => {
                let lane_in = self.input.with_channels(1);
                let lane_out = self.output.with_channels(1);
                let lane_len = (block_len / 2).max(1);
                let mut outcomes = [StartOutcome::Proceed; 2];
                for (lane, outcome) in [&mut pair.left, &mut pair.right]
                    .into_iter()
                    .zip(outcomes.iter_mut())
                {
                    lane.input = StageBuffer::new(lane_len);
                    lane.output = StageBuffer::new(lane_len);
                    *outcome = lane.stage.start(&lane_in, &lane_out).map_err(failed)?;
                    lane.started = true;
                }
                if outcomes.iter().all(|o| *o == StartOutcome::Bypass) {
                    Ok(StartOutcome::Bypass)
                } else {
                    Ok(StartOutcome::Proceed)
                }
            }
        }
    }

    /// Stops every started stage of this entry exactly once.
    pub(crate) fn stop(&mut self) {
        match &mut self.processor {
            Processor::Input => {}
            Processor::Single(stage) => {
                if self.started {
                    stage.stop();
                    self.started = false;
                }
            }
            Processor::Pair(pair) => {
                for lane in [&mut pair.left, &mut pair.right] {
                    if lane.started {
                        lane.stage.stop();
                        lane.started = false;
                    }
                }
            }
        }
    }

    /// Discards everything held by this entry.
    pub(crate) fn discard(&mut self) -> usize {
        let mut dropped = self.buffer.pending();
        self.buffer.clear();
        if let Processor::Pair(pair) = &mut self.processor {
            for lane in [&mut pair.left, &mut pair.right] {
                dropped += lane.input.pending() + lane.output.pending();
                lane.input.clear();
                lane.output.clear();
            }
        }
        dropped
    }

    /// True if a flow call could move data given `upstream`.
    pub(crate) fn can_flow(&self, upstream: &StageBuffer) -> bool {
        match &self.processor {
            Processor::Input => false,
            Processor::Single(_) => !upstream.is_empty(),
            Processor::Pair(pair) => upstream.pending() >= 2 || pair.lanes_hold_data(),
        }
    }

    /// One flow call: consume from `upstream`, append to this entry's buffer.
    pub(crate) fn flow(&mut self, upstream: &mut StageBuffer) -> Result<FlowReport, PipelineError> {
        match &mut self.processor {
            Processor::Input => Ok(FlowReport::default()),
            Processor::Single(stage) => {
                let space = self.buffer.reserve();
                let input = upstream.readable();
                if input.is_empty() || space == 0 {
                    return Ok(FlowReport::default());
                }
                let given = input.len();
                let flow = stage.process(input, self.buffer.writable());
                check_flow(&self.name, given, space, flow.consumed, flow.produced)?;
                if flow.consumed == 0 && flow.produced == 0 && !flow.end_of_stream {
                    return Err(stalled(&self.name, given, space));
                }
                upstream.consume(flow.consumed);
                self.clips += self.buffer.commit(flow.produced);
                Ok(FlowReport {
                    moved: flow.consumed + flow.produced > 0,
                    end_of_stream: flow.end_of_stream,
                })
            }
            Processor::Pair(pair) => {
                let fed = pair.deinterleave(upstream);
                let left = pair.left.step()?;
                let right = pair.right.step()?;
                let out = pair.interleave(&self.name, &mut self.buffer);
                Ok(FlowReport {
                    moved: fed > 0 || left.moved || right.moved || out > 0,
                    end_of_stream: left.end_of_stream || right.end_of_stream,
                })
            }
        }
    }

    /// One drain call. Returns `true` if anything moved or finished.
    pub(crate) fn drain(&mut self) -> Result<bool, PipelineError> {
        if self.drained {
            return Ok(false);
        }
        match &mut self.processor {
            Processor::Input => {
                self.drained = true;
                Ok(true)
            }
            Processor::Single(stage) => {
                let space = self.buffer.reserve();
                if space == 0 {
                    return Ok(false);
                }
                let drained = stage.drain(self.buffer.writable());
                check_drain(&self.name, space, drained.produced, drained.finished)?;
                self.clips += self.buffer.commit(drained.produced);
                self.drained = drained.finished;
                Ok(drained.produced > 0 || drained.finished)
            }
            Processor::Pair(pair) => {
                let mut progressed = false;
                // Input still parked in a lane goes through `process` first.
                for lane in [&mut pair.left, &mut pair.right] {
                    while !lane.input.is_empty() && lane.output.reserve() > 0 {
                        if !lane.step()?.moved {
                            break;
                        }
                        progressed = true;
                    }
                }

                // Lanes with room share one capacity; a full lane waits for
                // re-interleaving to free it.
                let left_room = pair.left.ready_room();
                let right_room = pair.right.ready_room();
                let capacity = match (left_room, right_room) {
                    (0, r) => r,
                    (l, 0) => l,
                    (l, r) => l.min(r),
                };
                if left_room > 0 {
                    progressed |= pair.left.drain(capacity)? > 0 || pair.left.finished;
                }
                if right_room > 0 {
                    progressed |= pair.right.drain(capacity)? > 0 || pair.right.finished;
                }

                progressed |= pair.interleave(&self.name, &mut self.buffer) > 0;
                progressed |= pair.discard_unmatched(&self.name) > 0;
                self.drained =
                    pair.left.finished && pair.right.finished && !pair.lanes_hold_data();
                Ok(progressed)
            }
        }
    }
}

fn check_flow(
    name: &str,
    given: usize,
    space: usize,
    consumed: usize,
    produced: usize,
) -> Result<(), PipelineError> {
    if consumed > given || produced > space {
        return Err(PipelineError::ContractViolation {
            stage: name.to_string(),
            call: "process",
            detail: format!(
                "reported {consumed} consumed / {produced} produced with {given} input and {space} output capacity"
            ),
        });
    }
    Ok(())
}

fn check_drain(
    name: &str,
    space: usize,
    produced: usize,
    finished: bool,
) -> Result<(), PipelineError> {
    if produced > space {
        return Err(PipelineError::ContractViolation {
            stage: name.to_string(),
            call: "drain",
            detail: format!("reported {produced} produced with {space} output capacity"),
        });
    }
    if produced == 0 && !finished && space > 0 {
        return Err(PipelineError::ContractViolation {
            stage: name.to_string(),
            call: "drain",
            detail: format!("produced nothing with {space} output capacity but is not finished"),
        });
    }
    Ok(())
}

fn stalled(name: &str, given: usize, space: usize) -> PipelineError {
    PipelineError::ContractViolation {
        stage: name.to_string(),
        call: "process",
        detail: format!(
            "took and gave no samples with {given} input and {space} output capacity"
        ),
    }
}
