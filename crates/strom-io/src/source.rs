//! Streaming WAV input.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use hound::WavReader;
use strom_core::{Encoding, Sample, SignalSpec, Source, from_int, from_unit};

use crate::Result;
use crate::wav::signal_spec;

/// Reads a WAV file a block at a time.
///
/// Integer PCM is shifted up to 32-bit scale; float samples are scaled from
/// ±1.0. Reads always return whole frames.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: SignalSpec,
    /// Samples not yet delivered.
    remaining: u64,
}

impl WavSource {
    /// Opens `path` and parses its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        let spec = signal_spec(reader.spec())?;
        let remaining = u64::from(reader.len());
        tracing::debug!(path = %path.as_ref().display(), %spec, frames = reader.duration(), "opened wav");
        Ok(Self {
            reader,
            spec,
            remaining,
        })
    }
}

impl Source for WavSource {
    fn spec(&self) -> SignalSpec {
        self.spec
    }

    fn read(&mut self, buf: &mut [Sample]) -> io::Result<usize> {
        let want = self.spec.frame_aligned(buf.len());
        let n = usize::try_from(self.remaining).map_or(want, |r| r.min(want));
        let mut filled = 0;
        let mut failure = None;

        match self.spec.encoding {
            Encoding::SignedInt => {
                let bits = self.spec.bits;
                for sample in self.reader.samples::<i32>().take(n) {
                    match sample {
                        Ok(value) => buf[filled] = from_int(value, bits),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                    filled += 1;
                }
            }
            Encoding::Float => {
                for sample in self.reader.samples::<f32>().take(n) {
                    match sample {
                        Ok(value) => buf[filled] = from_unit(value),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                    filled += 1;
                }
            }
        }

        self.remaining -= filled as u64;
        if filled < n {
            // truncated or undecodable data chunk: hand over what was decoded
            self.remaining = 0;
            if filled == 0
                && let Some(err) = failure.take()
            {
                return Err(crate::Error::from(err).into());
            }
            tracing::warn!(
                expected = n,
                got = filled,
                error = ?failure,
                "wav data ended early"
            );
            filled = self.spec.frame_aligned(filled);
        }
        Ok(filled)
    }

    fn frames_hint(&self) -> Option<u64> {
        Some(u64::from(self.reader.duration()))
    }
}
