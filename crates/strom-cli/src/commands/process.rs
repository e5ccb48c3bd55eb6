//! File-based stream processing command.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use strom_config::{OutputConfig, build_stages, parse_chain, validate_chain, validate_output};
use strom_core::{
    ChainBuilder, Concatenate, DEFAULT_BLOCK_LEN, Mixer, PipelineConfig, PipelineRun, Sample,
    SignalSpec, Sink, Source, Stage,
};
use strom_io::{WavSink, WavSource};
use strom_registry::StageRegistry;

use super::common::load_preset;

/// How several inputs become one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Combine {
    /// Play the inputs one after another
    Concatenate,
    /// Sum the inputs sample by sample
    Mix,
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV files followed by the output WAV file
    #[arg(value_name = "INPUT... OUTPUT", required = true, num_args = 2..)]
    files: Vec<PathBuf>,

    /// Chain description (e.g. "highpass 80 | compressor -18 3 | gain -1")
    #[arg(short, long, conflicts_with = "preset")]
    chain: Option<String>,

    /// Preset file or factory preset name
    #[arg(short, long)]
    preset: Option<String>,

    /// How multiple inputs are combined
    #[arg(long, value_enum, default_value_t = Combine::Concatenate)]
    combine: Combine,

    /// Linear gain of each input when mixing, in input order (default 1/N)
    #[arg(long = "gain", value_name = "G", allow_negative_numbers = true)]
    gains: Vec<f32>,

    /// Output sample rate in Hz
    #[arg(short, long)]
    rate: Option<u32>,

    /// Output channel count
    #[arg(long)]
    channels: Option<u16>,

    /// Output integer bit depth (8, 16, 24 or 32)
    #[arg(short, long, conflicts_with = "float")]
    bits: Option<u16>,

    /// Write 32-bit float output
    #[arg(long)]
    float: bool,

    /// Buffer length per stage, in samples
    #[arg(long, default_value_t = DEFAULT_BLOCK_LEN)]
    buffer: usize,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let (output_path, input_paths) = args
        .files
        .split_last()
        .context("expected at least one input and an output")?;
    let registry = StageRegistry::new();

    let (stages, preset_output) = user_stages(&args, &registry)?;
    let output = OutputConfig {
        rate: args.rate.or(preset_output.rate),
        channels: args.channels.or(preset_output.channels),
        bits: args.bits.or(preset_output.bits),
        float: args.float || (preset_output.float && args.bits.is_none()),
    };
    validate_output(&output)?;

    let source = open_inputs(input_paths, args.combine, &args.gains)?;
    let in_spec = source.spec();
    let out_spec = output.apply(in_spec);

    let chain = ChainBuilder::new(in_spec, out_spec)
        .stages(stages)
        .config(PipelineConfig {
            block_len: args.buffer,
        })
        .build(&registry)?;
    tracing::info!(input = %in_spec, output = %out_spec, entries = chain.len(), "chain built");
    if chain.is_empty() {
        println!("Chain:  (copy)");
    } else {
        println!("Chain:  {}", chain.names().join(" -> "));
    }
    println!("Output: {} ({})", output_path.display(), out_spec);

    let mut sink = WavSink::create(output_path, out_spec)
        .with_context(|| format!("cannot create {}", output_path.display()))?;

    let abort = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&abort);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut source = ProgressSource::new(source, !args.no_progress);
    let summary = PipelineRun::new(chain)
        .with_abort(abort)
        .run(&mut source, &mut sink);
    source.finish();
    let summary = summary?;
    sink.finish()?;

    let out_frames = summary.samples_written / u64::from(out_spec.channels);
    println!(
        "\nRead {} frames, wrote {} frames ({:.2}s)",
        summary.frames_read,
        out_frames,
        out_frames as f64 / f64::from(out_spec.rate)
    );
    if summary.input_clips > 0 {
        println!("  mix clipped {} samples", summary.input_clips);
    }
    for stage in summary.stage_clips.iter().filter(|c| c.clips > 0) {
        println!("  {} clipped {} samples", stage.stage, stage.clips);
    }
    if sink.clips() > 0 {
        println!("  output clipped {} samples", sink.clips());
    }
    if summary.total_clips() > 0 || sink.clips() > 0 {
        tracing::warn!(
            pipeline = summary.total_clips(),
            output = sink.clips(),
            "clipping occurred"
        );
    }
    if summary.aborted {
        tracing::warn!(frames = summary.frames_read, "run interrupted");
        println!("Interrupted; output is truncated.");
    }

    Ok(())
}

/// Stages named by `--chain` or `--preset`, and any output overrides the
/// preset carries.
fn user_stages(
    args: &ProcessArgs,
    registry: &StageRegistry,
) -> anyhow::Result<(Vec<Box<dyn Stage>>, OutputConfig)> {
    if let Some(chain) = &args.chain {
        let configs = parse_chain(chain)?;
        validate_chain(&configs, registry)?;
        return Ok((build_stages(&configs, registry)?, OutputConfig::default()));
    }

    if let Some(name) = &args.preset {
        let preset = load_preset(name)?;
        preset
            .validate(registry)
            .with_context(|| format!("preset '{}'", preset.name))?;
        println!("Preset: {}", preset.name);
        return Ok((preset.build_stages(registry)?, preset.output));
    }

    Ok((Vec::new(), OutputConfig::default()))
}

fn open_inputs(
    paths: &[PathBuf],
    combine: Combine,
    gains: &[f32],
) -> anyhow::Result<Box<dyn Source>> {
    let mut inputs: Vec<Box<dyn Source>> = Vec::with_capacity(paths.len());
    for path in paths {
        let input = WavSource::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        println!("Input:  {} ({})", path.display(), input.spec());
        inputs.push(Box::new(input));
    }

    if combine == Combine::Mix || !gains.is_empty() {
        if combine == Combine::Concatenate && inputs.len() > 1 {
            anyhow::bail!("--gain applies only with --combine mix");
        }
        return Ok(Box::new(Mixer::new(inputs)?.with_gains(gains)?));
    }

    if inputs.len() == 1 {
        return Ok(inputs.remove(0));
    }
    Ok(Box::new(Concatenate::new(inputs)?))
}

/// Forwards reads and advances a progress bar by the frames delivered.
struct ProgressSource {
    inner: Box<dyn Source>,
    bar: ProgressBar,
}

impl ProgressSource {
    fn new(inner: Box<dyn Source>, visible: bool) -> Self {
        let bar = if !visible {
            ProgressBar::hidden()
        } else if let Some(frames) = inner.frames_hint() {
            let bar = ProgressBar::new(frames);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            bar
        } else {
            ProgressBar::new_spinner()
        };
        Self { inner, bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Source for ProgressSource {
    fn spec(&self) -> SignalSpec {
        self.inner.spec()
    }

    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        match self.inner.progress_frames() {
            Some(frames) => self.bar.set_position(frames),
            None => self.bar.inc(self.inner.spec().frames(n) as u64),
        }
        Ok(n)
    }

    fn frames_hint(&self) -> Option<u64> {
        self.inner.frames_hint()
    }

    fn clips(&self) -> u64 {
        self.inner.clips()
    }

    fn progress_frames(&self) -> Option<u64> {
        self.inner.progress_frames()
    }
}
