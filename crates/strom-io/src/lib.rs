//! WAV sources and sinks for the strom pipeline.
//!
//! This crate provides:
//!
//! - **Streaming input**: [`WavSource`] reads frames on demand
//! - **Streaming output**: [`WavSink`] writes incrementally and counts clips
//! - **Header inspection**: [`read_wav_info`] without touching sample data
//!
//! Integer PCM of 8, 16, 24 or 32 bits and 32-bit float are supported. All
//! samples cross the pipeline at 32-bit fixed-point scale (see
//! [`strom_core::Sample`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strom_core::{ChainBuilder, PipelineRun, Sink, Source};
//! use strom_io::{WavSink, WavSource};
//!
//! let mut source = WavSource::open("input.wav")?;
//! let mut sink = WavSink::create("output.wav", source.spec())?;
//! let chain = ChainBuilder::new(source.spec(), sink.spec()).build(&registry)?;
//! PipelineRun::new(chain).run(&mut source, &mut sink)?;
//! sink.finish()?;
//! ```

mod sink;
mod source;
mod wav;

pub use sink::WavSink;
pub use source::WavSource;
pub use wav::{WavFormat, WavInfo, read_wav_info};

/// Error types for audio file operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(io) | Error::Wav(hound::Error::IoError(io)) => io,
            other => std::io::Error::other(other),
        }
    }
}

/// Convenience result type for audio file operations.
pub type Result<T> = std::result::Result<T, Error>;
