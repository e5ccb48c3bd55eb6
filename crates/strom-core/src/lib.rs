//! Strom Core - the streaming effects pipeline
//!
//! This crate wires configured processing stages into a chain and streams
//! interleaved audio through it block by block, so arbitrarily long inputs
//! never have to fit in memory.
//!
//! # Core Abstractions
//!
//! ## Stage Contract
//!
//! - [`Stage`] - Object-safe trait every processing unit implements
//! - [`StageFlags`] - Capabilities a stage declares (channel/rate changing, multichannel, ...)
//! - [`Flow`] / [`Drained`] - What a `process` or `drain` call achieved
//! - [`StageFactory`] - Name → stage lookup used for automatic stages
//!
//! ## Pipeline
//!
//! - [`ChainBuilder`] - Inserts channel mixdown and rate conversion, negotiates descriptors
//! - [`PipelineRun`] - Pull scheduler: Filling → Draining → Done
//! - [`StageBuffer`] - Fixed-capacity buffer with produced/consumed cursors
//! - [`Mixer`] / [`Concatenate`] - Multi-input front-ends
//!
//! ## Collaborators
//!
//! - [`Source`] / [`Sink`] - Stream endpoints implemented by codecs
//! - [`MemorySource`] / [`MemorySink`] - In-memory endpoints
//!
//! ## DSP Building Blocks
//!
//! - [`Biquad`] - RBJ cookbook second-order section
//! - [`EnvelopeFollower`] - Peak detector with attack/release
//! - [`db_to_linear`], [`linear_to_db`], [`ms_to_samples`]
//!
//! # Example
//!
//! ```rust,ignore
//! use strom_core::{ChainBuilder, MemorySink, MemorySource, PipelineRun, SignalSpec};
//!
//! let source_spec = SignalSpec::new(48000, 2);
//! let sink_spec = SignalSpec::new(8000, 1);
//! let chain = ChainBuilder::new(source_spec, sink_spec)
//!     .stage(registry.create_configured("gain", &["-6".into()])?)
//!     .build(&registry)?;
//!
//! let mut source = MemorySource::new(source_spec, samples);
//! let mut sink = MemorySink::new(sink_spec);
//! let summary = PipelineRun::new(chain).run(&mut source, &mut sink)?;
//! println!("{} samples written, {} clipped", summary.samples_written, summary.total_clips());
//! ```
//!
//! # Design Principles
//!
//! - **Single-threaded**: one call stack drives the whole run
//! - **Bounded memory**: buffers are allocated at start and reused in place
//! - **Guaranteed teardown**: every started stage is stopped exactly once
//! - **Object-safe stages**: chains are built at run time from trait objects

pub mod biquad;
pub mod envelope;
pub mod error;
pub mod io;
pub mod math;
pub mod pipeline;
pub mod sample;
pub mod signal;
pub mod stage;

// Re-export main types at crate root
pub use biquad::{Biquad, Coefficients, FilterShape};
pub use envelope::EnvelopeFollower;
pub use error::{PipelineError, Result, StageError, UsageError};
pub use io::{MemorySink, MemorySource, Sink, Source, read_full};
pub use math::{db_to_linear, linear_to_db, ms_to_samples};
pub use pipeline::{
    AUTO_CHANNELS, AUTO_RATE, Chain, ChainBuilder, ChainEntry, Concatenate, Cursor,
    DEFAULT_BLOCK_LEN, Mixer, PipelineConfig, PipelineRun, RunState, RunSummary, StageBuffer,
    StageClips,
};
pub use sample::{SAMPLE_MAX, SAMPLE_MIN, Sample, clip, clip_block, from_int, from_unit, to_int, to_unit};
pub use signal::{Encoding, SignalSpec};
pub use stage::{Drained, Flow, Stage, StageFactory, StageFlags, StartOutcome};
