//! Streaming WAV output.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use hound::WavWriter;
use strom_core::{Encoding, Sample, SignalSpec, Sink, to_int, to_unit};

use crate::wav::hound_spec;
use crate::{Error, Result};

/// Writes a WAV file incrementally.
///
/// Samples are narrowed to the file's bit depth with rounding; values that
/// saturate are counted as clips. [`Sink::finish`] writes the final header
/// sizes; a sink dropped without it is finalized on a best-effort basis.
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    spec: SignalSpec,
    clips: u64,
    written: u64,
}

impl WavSink {
    /// Creates (or truncates) `path` for writing `spec`.
    pub fn create<P: AsRef<Path>>(path: P, spec: SignalSpec) -> Result<Self> {
        let writer = WavWriter::create(path.as_ref(), hound_spec(&spec)?)?;
        tracing::debug!(path = %path.as_ref().display(), %spec, "created wav");
        Ok(Self {
            writer: Some(writer),
            spec,
            clips: 0,
            written: 0,
        })
    }

    /// Samples that saturated on output.
    pub fn clips(&self) -> u64 {
        self.clips
    }

    /// Samples written so far.
    pub fn samples_written(&self) -> u64 {
        self.written
    }

    fn write_all(&mut self, samples: &[Sample]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Io(io::Error::other("wav sink already finished")))?;

        match self.spec.encoding {
            Encoding::SignedInt => {
                let bits = self.spec.bits;
                for &sample in samples {
                    let (value, clipped) = to_int(sample, bits);
                    self.clips += u64::from(clipped);
                    writer.write_sample(value)?;
                }
            }
            Encoding::Float => {
                for &sample in samples {
                    let unit = to_unit(sample);
                    self.clips += u64::from(unit.abs() > 1.0);
                    writer.write_sample(unit.clamp(-1.0, 1.0))?;
                }
            }
        }
        self.written += samples.len() as u64;
        Ok(())
    }
}

impl Sink for WavSink {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn write(&mut self, samples: &[Sample]) -> io::Result<()> {
        Ok(self.write_all(samples)?)
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(Error::from)?;
            if self.clips > 0 {
                tracing::warn!(clips = self.clips, "output clipped");
            }
        }
        Ok(())
    }
}
