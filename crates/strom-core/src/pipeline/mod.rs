//! Streaming pipeline: chain construction and the pull scheduler.
//!
//! # Architecture
//!
//! - [`ChainBuilder`] turns a source descriptor, a sink descriptor and the
//!   user's configured stages into a [`Chain`], inserting the automatic
//!   `channels` and `rate` stages where the endpoints differ.
//! - [`PipelineRun`] owns the chain, the [`Cursor`] and every
//!   [`StageBuffer`], and drives samples through it:
//!
//! ```text
//!            read block                 pull passes (tail → cursor)
//! Source ──▶ slot 0 ──▶ entry 1 ──▶ entry 2 ──▶ … ──▶ tail ──▶ Sink
//!                          ▲
//!                          └── cursor: earliest entry still needing input
//! ```
//!
//! A pull pass iterates backward from the tail so that downstream buffers
//! empty before upstream ones refill; it stops at the first entry that still
//! holds output. Once the source ends the cursor walks forward, draining one
//! entry at a time and pushing whatever it flushes through the rest of the
//! chain.
//!
//! # Stage pairs
//!
//! A stage without [`StageFlags::MULTICHANNEL`](crate::StageFlags::MULTICHANNEL)
//! facing a stereo stream is instantiated twice. The pair de-interleaves into
//! two mono lanes, runs each instance independently and re-interleaves the
//! output; each lane keeps its own counters so unequal counts stay inside the
//! lane until they can be matched.
//!
//! # Multiple inputs
//!
//! [`Mixer`] and [`Concatenate`] wrap several sources as one.

mod buffer;
mod builder;
mod entry;
mod mix;
mod run;

pub use buffer::StageBuffer;
pub use builder::{
    AUTO_CHANNELS, AUTO_RATE, Chain, ChainBuilder, DEFAULT_BLOCK_LEN, PipelineConfig,
};
pub use entry::ChainEntry;
pub use mix::{Concatenate, Mixer};
pub use run::{Cursor, PipelineRun, RunState, RunSummary, StageClips};
