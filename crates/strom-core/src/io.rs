//! Source and sink collaborators consumed by the scheduler.
//!
//! Codecs live in their own crates and implement these traits; the in-memory
//! versions here back the tests and small library uses.

use std::io;

use crate::sample::Sample;
use crate::signal::SignalSpec;

/// Produces interleaved samples at sample scale.
pub trait Source {
    /// Descriptor of the delivered stream.
    fn spec(&self) -> SignalSpec;

    /// Fills the front of `buf`; returns the count written, `0` at end of stream.
    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize>;

    /// Total frames, when known up front.
    fn frames_hint(&self) -> Option<u64> {
        None
    }

    /// Samples clamped by the source itself (mixing front-ends).
    fn clips(&self) -> u64 {
        0
    }

    /// Frames that count toward progress, for sources whose delivered length
    /// is not the progress measure (the mixer follows its first input).
    fn progress_frames(&self) -> Option<u64> {
        None
    }
}

/// Accepts interleaved samples at sample scale.
pub trait Sink {
    /// Descriptor the sink was opened with.
    fn spec(&self) -> SignalSpec;

    /// Writes all of `samples`.
    fn write(&mut self, samples: &[Sample]) -> io::Result<()>;

    /// Flushes and finalizes the output.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn spec(&self) -> SignalSpec {
        (**self).spec()
    }
    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
        (**self).read(buf)
    }
    fn frames_hint(&self) -> Option<u64> {
        (**self).frames_hint()
    }
    fn clips(&self) -> u64 {
        (**self).clips()
    }
    fn progress_frames(&self) -> Option<u64> {
        (**self).progress_frames()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn spec(&self) -> SignalSpec {
        (**self).spec()
    }
    fn write(&mut self, samples: &[Sample]) -> io::Result<()> {
        (**self).write(samples)
    }
    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Reads until `buf` is full or the source ends.
pub fn read_full(source: &mut dyn Source, buf: &mut [Sample]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// A source over an owned sample vector.
#[derive(Debug, Clone)]
pub struct MemorySource {
    spec: SignalSpec,
    data: Vec<Sample>,
    pos: usize,
    chunk: usize,
}

impl MemorySource {
    /// Creates a source delivering `data` in one go per read.
    pub fn new(spec: SignalSpec, data: Vec<Sample>) -> Self {
        Self {
            spec,
            data,
            pos: 0,
            chunk: usize::MAX,
        }
    }

    /// Limits every read to at most `frames` frames.
    #[must_use]
    pub fn with_chunk(mut self, frames: usize) -> Self {
        self.chunk = frames.max(1) * usize::from(self.spec.channels.max(1));
        self
    }

    /// Samples not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl Source for MemorySource {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining()).min(self.chunk);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn frames_hint(&self) -> Option<u64> {
        Some(self.spec.frames(self.data.len()) as u64)
    }
}

/// A sink collecting everything written into a vector.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    spec: SignalSpec,
    data: Vec<Sample>,
    writes: usize,
    finished: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new(spec: SignalSpec) -> Self {
        Self {
            spec,
            ..Self::default()
        }
    }

    /// Everything written so far.
    pub fn samples(&self) -> &[Sample] {
        &self.data
    }

    /// Consumes the sink, returning the collected samples.
    pub fn into_samples(self) -> Vec<Sample> {
        self.data
    }

    /// Number of `write` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// True after [`Sink::finish`].
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Sink for MemorySink {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn write(&mut self, samples: &[Sample]) -> io::Result<()> {
        self.data.extend_from_slice(samples);
        self.writes += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}
