//! Strom Effects - built-in processing stages
//!
//! Every type here implements [`strom_core::Stage`] and is registered by id
//! in `strom-registry`:
//!
//! - [`ChannelMixer`] (`channels`) - Automatic channel mixdown / upmix
//! - [`RateConverter`] (`rate`) - Streaming windowed-sinc resampler
//! - [`Gain`] (`gain`) - Fixed gain in dB
//! - [`Filter`] (`lowpass`, `highpass`) - RBJ biquad
//! - [`Compressor`] (`compressor`) - Soft-knee feed-forward compressor
//! - [`Echo`] (`echo`) - Feedback delay with a drained tail
//! - [`Trim`] (`trim`) - Keeps a time window, then ends the stream
//! - [`Stat`] (`stat`) - Peak/RMS report at stop
//! - [`Remix`] (`remix`) - User channel map
//!
//! Stages without the multichannel flag are mono; the chain builder runs a
//! left/right pair of them on stereo input.
//!
//! ## Example
//!
//! ```rust,ignore
//! use strom_core::{ChainBuilder, SignalSpec, Stage};
//! use strom_effects::{Echo, Gain};
//!
//! let mut echo = Echo::new();
//! echo.configure(&["300".into(), "0.4".into()])?;
//!
//! let spec = SignalSpec::new(48000, 2);
//! let chain = ChainBuilder::new(spec, spec)
//!     .stage(Box::new(Gain::with_db(-3.0)))
//!     .stage(Box::new(echo))
//!     .build(&registry)?;
//! ```

mod args;
pub mod channels;
pub mod compressor;
pub mod echo;
pub mod filter;
pub mod gain;
pub mod rate;
pub mod remix;
pub mod stat;
pub mod trim;

// Re-export main types at crate root
pub use channels::{ChannelMap, ChannelMixer};
pub use compressor::Compressor;
pub use echo::Echo;
pub use filter::Filter;
pub use gain::Gain;
pub use rate::RateConverter;
pub use remix::Remix;
pub use stat::{Stat, StatReport};
pub use trim::Trim;
