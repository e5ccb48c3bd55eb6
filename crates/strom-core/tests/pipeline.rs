//! Integration tests for the strom-core pipeline.
//!
//! Exercises chain construction (automatic stage placement, stage pairs,
//! configuration errors) and full runs of the pull scheduler with probe
//! stages that buffer, stall, end the stream early or fail.

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use strom_core::{
    ChainBuilder, Concatenate, Drained, Flow, MemorySink, MemorySource, Mixer, PipelineConfig,
    PipelineError, PipelineRun, RunState, SAMPLE_MAX, Sample, SignalSpec, Sink, Source, Stage,
    StageError, StageFactory, StageFlags, StartOutcome,
};

// ============================================================================
// Probe stages
// ============================================================================

#[derive(Default)]
struct Log {
    starts: AtomicUsize,
    stops: AtomicUsize,
    process_calls: AtomicUsize,
}

impl Log {
    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug)]
enum Behavior {
    Identity,
    Scale(f32),
    Backlog(usize),
    /// Backlog on a lane whose first sample is negative, identity otherwise.
    LagNegative(usize),
    Stall,
    DrainStall,
    EndAfter(usize),
    Bypass,
    FailStart,
}

#[derive(Clone)]
struct Probe {
    name: &'static str,
    flags: StageFlags,
    behavior: Behavior,
    held: VecDeque<Sample>,
    seen: usize,
    lagging: Option<bool>,
    log: Arc<Log>,
}

impl Probe {
    fn backlog(&mut self, depth: usize, input: &[Sample], output: &mut [Sample]) -> Flow {
        let (mut consumed, mut produced) = (0, 0);
        loop {
            if self.held.len() > depth && produced < output.len() {
                output[produced] = self.held.pop_front().unwrap();
                produced += 1;
            } else if consumed < input.len() && self.held.len() <= depth {
                self.held.push_back(input[consumed]);
                consumed += 1;
            } else {
                break;
            }
        }
        Flow::new(consumed, produced)
    }

    fn boxed(name: &'static str, flags: StageFlags, behavior: Behavior) -> (Box<dyn Stage>, Arc<Log>) {
        let log = Arc::new(Log::default());
        let probe = Probe {
            name,
            flags,
            behavior,
            held: VecDeque::new(),
            seen: 0,
            lagging: None,
            log: Arc::clone(&log),
        };
        (Box::new(probe), log)
    }
}

impl Stage for Probe {
    fn name(&self) -> &str {
        self.name
    }

    fn flags(&self) -> StageFlags {
        self.flags
    }

    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }

    fn start(&mut self, _: &SignalSpec, _: &SignalSpec) -> Result<StartOutcome, StageError> {
        self.log.starts.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::FailStart => {
                self.log.starts.fetch_sub(1, Ordering::SeqCst);
                Err(StageError::Invalid("refusing to start".into()))
            }
            Behavior::Bypass => Ok(StartOutcome::Bypass),
            _ => Ok(StartOutcome::Proceed),
        }
    }

    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        self.log.process_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Stall => Flow::new(0, 0),
            Behavior::Backlog(depth) => self.backlog(depth, input, output),
            Behavior::LagNegative(depth) => {
                if self.lagging.is_none() && !input.is_empty() {
                    self.lagging = Some(input[0] < 0.0);
                }
                if self.lagging == Some(true) {
                    self.backlog(depth, input, output)
                } else {
                    let n = input.len().min(output.len());
                    output[..n].copy_from_slice(&input[..n]);
                    Flow::new(n, n)
                }
            }
            Behavior::EndAfter(limit) => {
                let n = input.len().min(output.len()).min(limit - self.seen);
                output[..n].copy_from_slice(&input[..n]);
                self.seen += n;
                if self.seen == limit {
                    Flow::finished(n, n)
                } else {
                    Flow::new(n, n)
                }
            }
            Behavior::Scale(gain) => {
                let n = input.len().min(output.len());
                for (o, i) in output[..n].iter_mut().zip(&input[..n]) {
                    *o = i * gain;
                }
                Flow::new(n, n)
            }
            _ => {
                let n = input.len().min(output.len());
                output[..n].copy_from_slice(&input[..n]);
                Flow::new(n, n)
            }
        }
    }

    fn drain(&mut self, output: &mut [Sample]) -> Drained {
        match self.behavior {
            Behavior::DrainStall => Drained::more(0),
            Behavior::Backlog(_) | Behavior::LagNegative(_) => {
                let n = output.len().min(self.held.len());
                for slot in &mut output[..n] {
                    *slot = self.held.pop_front().unwrap();
                }
                if self.held.is_empty() {
                    Drained::done(n)
                } else {
                    Drained::more(n)
                }
            }
            _ => Drained::done(0),
        }
    }

    fn stop(&mut self) {
        self.log.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Averages or duplicates channels, standing in for the real mixdown stage.
#[derive(Clone, Default)]
struct ChannelShim {
    cin: usize,
    cout: usize,
}

impl Stage for ChannelShim {
    fn name(&self) -> &str {
        "channels"
    }
    fn flags(&self) -> StageFlags {
        StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL)
    }
    fn duplicate(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }
    fn start(&mut self, input: &SignalSpec, output: &SignalSpec) -> Result<StartOutcome, StageError> {
        self.cin = usize::from(input.channels);
        self.cout = usize::from(output.channels);
        if self.cin == self.cout {
            return Ok(StartOutcome::Bypass);
        }
        Ok(StartOutcome::Proceed)
    }
    fn process(&mut self, input: &[Sample], output: &mut [Sample]) -> Flow {
        let frames = (input.len() / self.cin).min(output.len() / self.cout);
        for f in 0..frames {
            let frame = &input[f * self.cin..(f + 1) * self.cin];
            let avg = frame.iter().sum::<f32>() / self.cin as f32;
            for c in 0..self.cout {
                output[f * self.cout + c] = if self.cin > self.cout { avg } else { frame[0] };
            }
        }
        Flow::new(frames * self.cin, frames * self.cout)
    }
}

struct Factory {
    created: Cell<usize>,
}

impl Factory {
    fn new() -> Self {
        Self { created: Cell::new(0) }
    }
}

impl StageFactory for Factory {
    fn create_stage(&self, name: &str) -> Option<Box<dyn Stage>> {
        self.created.set(self.created.get() + 1);
        match name {
            "channels" => Some(Box::new(ChannelShim::default())),
            "rate" => Some(Probe::boxed("rate", StageFlags::RATE, Behavior::Identity).0),
            _ => None,
        }
    }
}

fn identity(name: &'static str, flags: StageFlags) -> Box<dyn Stage> {
    Probe::boxed(name, flags, Behavior::Identity).0
}

fn ramp(n: usize) -> Vec<Sample> {
    (0..n).map(|i| i as f32 * 256.0).collect()
}

fn run_chain(
    spec: SignalSpec,
    stages: Vec<Box<dyn Stage>>,
    input: Vec<Sample>,
    block_len: usize,
) -> (PipelineRun, Result<Vec<Sample>, PipelineError>) {
    let chain = ChainBuilder::new(spec, spec)
        .stages(stages)
        .config(PipelineConfig { block_len })
        .build(&Factory::new())
        .expect("chain builds");
    let mut run = PipelineRun::new(chain);
    let mut source = MemorySource::new(spec, input).with_chunk(3);
    let mut sink = MemorySink::new(spec);
    let result = run.run(&mut source, &mut sink).map(|_| sink.into_samples());
    (run, result)
}

// ============================================================================
// 1. Chain construction
// ============================================================================

#[test]
fn reductions_go_first() {
    let chain = ChainBuilder::new(SignalSpec::new(48000, 2), SignalSpec::new(8000, 1))
        .stage(identity("gain", StageFlags::MULTICHANNEL))
        .build(&Factory::new())
        .unwrap();
    assert_eq!(chain.names(), ["channels", "rate", "gain"]);
    assert!(chain.entries()[1].is_automatic());
    assert!(!chain.entries()[2].is_pair(), "rate runs after mixdown to mono");
}

#[test]
fn expansions_go_last() {
    let chain = ChainBuilder::new(SignalSpec::new(8000, 1), SignalSpec::new(48000, 2))
        .stage(identity("gain", StageFlags::MULTICHANNEL))
        .build(&Factory::new())
        .unwrap();
    assert_eq!(chain.names(), ["gain", "rate", "channels"]);
    let tail = chain.entries().last().unwrap();
    assert_eq!(tail.output_spec().channels, 2);
    assert_eq!(tail.input_spec().rate, 48000);
}

#[test]
fn mixed_directions() {
    let down_channels_up_rate =
        ChainBuilder::new(SignalSpec::new(8000, 2), SignalSpec::new(48000, 1))
            .stage(identity("gain", StageFlags::MULTICHANNEL))
            .build(&Factory::new())
            .unwrap();
    assert_eq!(down_channels_up_rate.names(), ["channels", "gain", "rate"]);

    let up_channels_down_rate =
        ChainBuilder::new(SignalSpec::new(48000, 1), SignalSpec::new(8000, 2))
            .stage(identity("gain", StageFlags::MULTICHANNEL))
            .build(&Factory::new())
            .unwrap();
    assert_eq!(up_channels_down_rate.names(), ["rate", "gain", "channels"]);
}

#[test]
fn downsampling_stereo_uses_a_pair() {
    let chain = ChainBuilder::new(SignalSpec::new(48000, 2), SignalSpec::new(8000, 2))
        .build(&Factory::new())
        .unwrap();
    assert_eq!(chain.names(), ["rate"]);
    assert!(chain.entries()[1].is_pair());
}

#[test]
fn conflicting_channel_changers_rejected() {
    let factory = Factory::new();
    let changer = StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL);
    let err = ChainBuilder::new(SignalSpec::new(48000, 2), SignalSpec::new(48000, 1))
        .stage(identity("remix", changer))
        .stage(identity("remix", changer))
        .build(&factory)
        .err()
        .expect("two channel changers must fail");
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert_eq!(factory.created.get(), 0, "no automatic stage may be created");
}

#[test]
fn user_channel_changer_replaces_automatic_one() {
    let changer = StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL);
    let chain = ChainBuilder::new(SignalSpec::new(48000, 2), SignalSpec::new(48000, 1))
        .stage(identity("lowpass", StageFlags::NONE))
        .stage(identity("remix", changer))
        .stage(identity("highpass", StageFlags::NONE))
        .build(&Factory::new())
        .unwrap();
    assert_eq!(chain.names(), ["lowpass", "remix", "highpass"]);
    assert!(chain.entries()[1].is_pair());
    assert!(!chain.entries()[3].is_pair());
}

#[test]
fn mono_stage_on_surround_rejected() {
    let result = ChainBuilder::new(SignalSpec::new(48000, 6), SignalSpec::new(48000, 6))
        .stage(identity("lowpass", StageFlags::NONE))
        .build(&Factory::new());
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

#[test]
fn missing_automatic_stage_rejected() {
    struct Empty;
    impl StageFactory for Empty {
        fn create_stage(&self, _: &str) -> Option<Box<dyn Stage>> {
            None
        }
    }
    let result = ChainBuilder::new(SignalSpec::new(44100, 1), SignalSpec::new(48000, 1)).build(&Empty);
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

// ============================================================================
// 2. Streaming runs
// ============================================================================

#[test]
fn empty_chain_copies_input() {
    let input = ramp(101);
    let (run, output) = run_chain(SignalSpec::new(8000, 1), Vec::new(), input.clone(), 16);
    assert_eq!(output.unwrap(), input);
    assert_eq!(run.state(), RunState::Done);
}

#[test]
fn stage_pair_round_trip() {
    let spec = SignalSpec::new(44100, 2);
    let input: Vec<Sample> = (0..200).map(|i| if i % 2 == 0 { i as f32 } else { -(i as f32) }).collect();
    let (stage, log) = Probe::boxed("identity", StageFlags::NONE, Behavior::Identity);
    let (run, output) = run_chain(spec, vec![stage], input.clone(), 10);
    assert!(run.entries()[1].is_pair());
    assert_eq!(output.unwrap(), input);
    assert_eq!(log.starts(), 2);
    assert_eq!(log.stops(), 2);
}

#[test]
fn drain_completeness() {
    let spec = SignalSpec::new(8000, 1);
    let stages = vec![
        Probe::boxed("a", StageFlags::MULTICHANNEL, Behavior::Backlog(5)).0,
        Probe::boxed("b", StageFlags::MULTICHANNEL, Behavior::Backlog(17)).0,
        Probe::boxed("c", StageFlags::MULTICHANNEL, Behavior::Backlog(2)).0,
    ];
    let input = ramp(97);
    let (run, output) = run_chain(spec, stages, input.clone(), 8);
    assert_eq!(output.unwrap(), input);
    assert_eq!(run.state(), RunState::Done);
    assert_eq!(run.cursor().input_eff, run.entries().len());
    for entry in run.entries() {
        assert_eq!(entry.buffer().produced(), 0, "{} not flushed", entry.name());
        assert_eq!(entry.buffer().consumed(), 0);
        assert!(!entry.holds_data());
    }
}

#[test]
fn stereo_backlog_pair_drains() {
    let spec = SignalSpec::new(8000, 2);
    let stages = vec![Probe::boxed("delay", StageFlags::NONE, Behavior::Backlog(7)).0];
    let input = ramp(64);
    let (run, output) = run_chain(spec, stages, input.clone(), 6);
    assert_eq!(output.unwrap(), input);
    assert_eq!(run.cursor().input_eff, run.entries().len());
}

#[test]
fn pair_lanes_with_unequal_output_keep_frame_order() {
    let spec = SignalSpec::new(8000, 2);
    let input: Vec<Sample> = (0..100)
        .map(|i| {
            let level = (i / 2 + 1) as f32 * 256.0;
            if i % 2 == 0 { level } else { -level }
        })
        .collect();
    let (stage, log) = Probe::boxed("lag", StageFlags::NONE, Behavior::LagNegative(5));
    let (run, output) = run_chain(spec, vec![stage], input.clone(), 8);
    assert!(run.entries()[1].is_pair());
    assert_eq!(output.unwrap(), input);
    assert_eq!(run.cursor().input_eff, run.entries().len());
    assert_eq!(run.state(), RunState::Done);
    assert_eq!(log.stops(), 2);
}

#[test]
fn end_of_stream_stops_reading_and_drains_downstream() {
    struct Counting {
        inner: MemorySource,
        reads: usize,
    }
    impl Source for Counting {
        fn spec(&self) -> SignalSpec {
            self.inner.spec()
        }
        fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }
    }

    let spec = SignalSpec::new(8000, 1);
    let input = ramp(100);
    let chain = ChainBuilder::new(spec, spec)
        .stage(Probe::boxed("trim", StageFlags::MULTICHANNEL, Behavior::EndAfter(10)).0)
        .stage(Probe::boxed("delay", StageFlags::MULTICHANNEL, Behavior::Backlog(4)).0)
        .config(PipelineConfig { block_len: 8 })
        .build(&Factory::new())
        .unwrap();
    let mut source = Counting {
        inner: MemorySource::new(spec, input.clone()).with_chunk(4),
        reads: 0,
    };
    let mut sink = MemorySink::new(spec);
    let mut run = PipelineRun::new(chain);
    let summary = run.run(&mut source, &mut sink).unwrap();
    assert_eq!(sink.samples(), &input[..10]);
    assert!(source.reads <= 3, "kept reading after end of stream: {}", source.reads);
    assert_eq!(summary.samples_written, 10);
    assert_eq!(run.cursor().input_eff, run.entries().len());
}

#[test]
fn bypassed_stage_is_elided() {
    let spec = SignalSpec::new(8000, 1);
    let (stage, log) = Probe::boxed("noop", StageFlags::MULTICHANNEL, Behavior::Bypass);
    let input = ramp(20);
    let (run, output) = run_chain(spec, vec![stage], input.clone(), 8);
    assert_eq!(output.unwrap(), input);
    assert_eq!(run.entries().len(), 1);
    assert_eq!(log.starts(), 1);
    assert_eq!(log.stops(), 1);
    assert_eq!(log.process_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn bypass_across_a_conversion_is_a_configuration_error() {
    struct AlwaysBypass;
    impl Stage for AlwaysBypass {
        fn name(&self) -> &str {
            "channels"
        }
        fn flags(&self) -> StageFlags {
            StageFlags::CHANNELS.union(StageFlags::MULTICHANNEL)
        }
        fn duplicate(&self) -> Box<dyn Stage> {
            Box::new(AlwaysBypass)
        }
        fn start(&mut self, _: &SignalSpec, _: &SignalSpec) -> Result<StartOutcome, StageError> {
            Ok(StartOutcome::Bypass)
        }
        fn process(&mut self, _: &[Sample], _: &mut [Sample]) -> Flow {
            Flow::default()
        }
    }
    let source_spec = SignalSpec::new(8000, 2);
    let sink_spec = SignalSpec::new(8000, 1);
    let chain = ChainBuilder::new(source_spec, sink_spec)
        .stage(Box::new(AlwaysBypass))
        .build(&Factory::new())
        .unwrap();
    let mut run = PipelineRun::new(chain);
    let result = run.run(
        &mut MemorySource::new(source_spec, ramp(8)),
        &mut MemorySink::new(sink_spec),
    );
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

#[test]
fn automatic_conversions_run_end_to_end() {
    let source_spec = SignalSpec::new(48000, 2);
    let sink_spec = SignalSpec::new(8000, 1);
    let chain = ChainBuilder::new(source_spec, sink_spec)
        .config(PipelineConfig { block_len: 32 })
        .build(&Factory::new())
        .unwrap();
    let input: Vec<Sample> = (0..40).flat_map(|i| [i as f32 * 2.0, 0.0]).collect();
    let mut sink = MemorySink::new(sink_spec);
    let summary = PipelineRun::new(chain)
        .run(&mut MemorySource::new(source_spec, input), &mut sink)
        .unwrap();
    let expected: Vec<Sample> = (0..40).map(|i| i as f32).collect();
    assert_eq!(sink.samples(), expected.as_slice());
    assert_eq!(summary.frames_read, 40);
}

#[test]
fn clips_are_counted_per_stage() {
    let spec = SignalSpec::new(8000, 1);
    let stages = vec![
        Probe::boxed("boost", StageFlags::MULTICHANNEL, Behavior::Scale(4.0)).0,
        Probe::boxed("cut", StageFlags::MULTICHANNEL, Behavior::Scale(0.5)).0,
    ];
    let input = vec![SAMPLE_MAX / 2.0, SAMPLE_MAX / 8.0, -SAMPLE_MAX];
    let chain = ChainBuilder::new(spec, spec).stages(stages).build(&Factory::new()).unwrap();
    let mut sink = MemorySink::new(spec);
    let summary = PipelineRun::new(chain)
        .run(&mut MemorySource::new(spec, input), &mut sink)
        .unwrap();
    assert_eq!(summary.stage_clips[0].stage, "boost");
    assert_eq!(summary.stage_clips[0].clips, 2);
    assert_eq!(summary.stage_clips[1].clips, 0);
    assert_eq!(summary.total_clips(), 2);
    assert_eq!(sink.samples(), &[SAMPLE_MAX / 2.0, SAMPLE_MAX / 4.0, -SAMPLE_MAX / 2.0]);
}

// ============================================================================
// 3. Failures and teardown
// ============================================================================

#[test]
fn stalled_stage_is_a_contract_violation() {
    let spec = SignalSpec::new(8000, 1);
    let (stage, log) = Probe::boxed("stuck", StageFlags::MULTICHANNEL, Behavior::Stall);
    let (_run, output) = run_chain(spec, vec![stage], ramp(10), 8);
    let err = output.unwrap_err();
    assert!(err.is_contract_violation());
    assert!(err.to_string().contains("stuck"));
    assert_eq!(log.starts(), 1);
    assert_eq!(log.stops(), 1);
}

#[test]
fn drain_without_progress_is_a_contract_violation() {
    let spec = SignalSpec::new(8000, 1);
    let (stage, log) = Probe::boxed("tail", StageFlags::MULTICHANNEL, Behavior::DrainStall);
    let (run, output) = run_chain(spec, vec![stage], ramp(10), 8);
    assert!(output.unwrap_err().is_contract_violation());
    drop(run);
    assert_eq!(log.stops(), 1);
}

#[test]
fn write_failure_aborts_and_stops_every_stage() {
    struct Full(SignalSpec);
    impl Sink for Full {
        fn spec(&self) -> SignalSpec {
            self.0
        }
        fn write(&mut self, _: &[Sample]) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }
    let spec = SignalSpec::new(8000, 2);
    let (a, log_a) = Probe::boxed("a", StageFlags::NONE, Behavior::Identity);
    let (b, log_b) = Probe::boxed("b", StageFlags::MULTICHANNEL, Behavior::Identity);
    let chain = ChainBuilder::new(spec, spec).stage(a).stage(b).build(&Factory::new()).unwrap();
    let mut run = PipelineRun::new(chain);
    let result = run.run(&mut MemorySource::new(spec, ramp(16)), &mut Full(spec));
    assert!(matches!(result, Err(PipelineError::Write(_))));
    drop(run);
    assert_eq!((log_a.starts(), log_a.stops()), (2, 2));
    assert_eq!((log_b.starts(), log_b.stops()), (1, 1));
}

#[test]
fn read_failure_becomes_end_of_input() {
    struct Flaky {
        spec: SignalSpec,
        served: bool,
    }
    impl Source for Flaky {
        fn spec(&self) -> SignalSpec {
            self.spec
        }
        fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated"));
            }
            self.served = true;
            buf[..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
            Ok(4)
        }
    }
    let spec = SignalSpec::new(8000, 1);
    let chain = ChainBuilder::new(spec, spec)
        .stage(Probe::boxed("delay", StageFlags::MULTICHANNEL, Behavior::Backlog(3)).0)
        .build(&Factory::new())
        .unwrap();
    let mut sink = MemorySink::new(spec);
    PipelineRun::new(chain)
        .run(&mut Flaky { spec, served: false }, &mut sink)
        .unwrap();
    assert_eq!(sink.samples(), &[1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn failed_start_stops_started_stages_only() {
    let spec = SignalSpec::new(8000, 1);
    let (a, log_a) = Probe::boxed("a", StageFlags::MULTICHANNEL, Behavior::Identity);
    let (b, log_b) = Probe::boxed("b", StageFlags::MULTICHANNEL, Behavior::FailStart);
    let (c, log_c) = Probe::boxed("c", StageFlags::MULTICHANNEL, Behavior::Identity);
    let chain = ChainBuilder::new(spec, spec).stages([a, b, c]).build(&Factory::new()).unwrap();
    let mut run = PipelineRun::new(chain);
    let result = run.run(&mut MemorySource::new(spec, ramp(4)), &mut MemorySink::new(spec));
    assert!(matches!(result, Err(PipelineError::Stage { ref stage, .. }) if stage == "b"));
    drop(run);
    assert_eq!((log_a.starts(), log_a.stops()), (1, 1));
    assert_eq!((log_b.starts(), log_b.stops()), (0, 0));
    assert_eq!((log_c.starts(), log_c.stops()), (0, 0));
}

#[test]
fn abort_flag_discards_and_tears_down() {
    let spec = SignalSpec::new(8000, 1);
    let (stage, log) = Probe::boxed("delay", StageFlags::MULTICHANNEL, Behavior::Backlog(4));
    let chain = ChainBuilder::new(spec, spec).stage(stage).build(&Factory::new()).unwrap();
    let flag = Arc::new(AtomicBool::new(true));
    let mut sink = MemorySink::new(spec);
    let summary = PipelineRun::new(chain)
        .with_abort(Arc::clone(&flag))
        .run(&mut MemorySource::new(spec, ramp(32)), &mut sink)
        .unwrap();
    assert!(summary.aborted);
    assert!(sink.samples().is_empty());
    assert_eq!(log.stops(), 1);
}

#[test]
fn mismatched_sink_rejected_before_start() {
    let spec = SignalSpec::new(8000, 1);
    let (stage, log) = Probe::boxed("a", StageFlags::MULTICHANNEL, Behavior::Identity);
    let chain = ChainBuilder::new(spec, spec).stage(stage).build(&Factory::new()).unwrap();
    let result = PipelineRun::new(chain).run(
        &mut MemorySource::new(spec, ramp(4)),
        &mut MemorySink::new(SignalSpec::new(8000, 2)),
    );
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
    assert_eq!(log.starts(), 0);
}

#[test]
fn run_is_single_use() {
    let spec = SignalSpec::new(8000, 1);
    let chain = ChainBuilder::new(spec, spec).build(&Factory::new()).unwrap();
    let mut run = PipelineRun::new(chain);
    let mut sink = MemorySink::new(spec);
    run.run(&mut MemorySource::new(spec, ramp(4)), &mut sink).unwrap();
    assert!(run.run(&mut MemorySource::new(spec, ramp(4)), &mut sink).is_err());
}

// ============================================================================
// 4. Mix and concatenate front-ends
// ============================================================================

fn mono_source(data: &[Sample]) -> Box<dyn Source> {
    Box::new(MemorySource::new(SignalSpec::new(8000, 1), data.to_vec()))
}

fn run_source(source: &mut dyn Source) -> (Vec<Sample>, strom_core::RunSummary) {
    let spec = source.spec();
    let chain = ChainBuilder::new(spec, spec).build(&Factory::new()).unwrap();
    let mut sink = MemorySink::new(spec);
    let summary = PipelineRun::new(chain).run(source, &mut sink).unwrap();
    (sink.into_samples(), summary)
}

#[test]
fn mix_summation() {
    let mut mixer = Mixer::new(vec![
        mono_source(&[1.0, 2.0, 3.0, 4.0]),
        mono_source(&[10.0, 20.0, 30.0, 40.0]),
    ])
    .unwrap()
    .with_gains(&[0.5, 0.5])
    .unwrap();
    let (output, summary) = run_source(&mut mixer);
    assert_eq!(output, vec![5.5, 11.0, 16.5, 22.0]);
    assert_eq!(summary.input_clips, 0);
}

#[test]
fn mix_pads_shorter_input_with_silence() {
    let mut mixer = Mixer::new(vec![mono_source(&[100.0, 200.0]), mono_source(&[1.0; 4])])
        .unwrap()
        .with_gains(&[1.0, 1.0])
        .unwrap();
    let (output, _) = run_source(&mut mixer);
    assert_eq!(output, vec![101.0, 201.0, 1.0, 1.0]);
    assert_eq!(mixer.frames_primary(), 2);
}

#[test]
fn mix_default_gain_averages() {
    let mut mixer = Mixer::new(vec![mono_source(&[SAMPLE_MAX; 3]), mono_source(&[SAMPLE_MAX; 3])]).unwrap();
    let (output, summary) = run_source(&mut mixer);
    assert_eq!(output, vec![SAMPLE_MAX; 3]);
    assert_eq!(summary.total_clips(), 0);
}

#[test]
fn concatenate_plays_in_order() {
    let mut cat = Concatenate::new(vec![mono_source(&[1.0, 2.0]), mono_source(&[3.0, 4.0, 5.0])]).unwrap();
    let (output, summary) = run_source(&mut cat);
    assert_eq!(output, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(summary.frames_read, 5);
}
