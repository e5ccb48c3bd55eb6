//! WAV header inspection and format mapping.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use strom_core::{Encoding, SignalSpec};

use crate::{Error, Result};

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

impl WavInfo {
    /// The pipeline descriptor for this file.
    pub fn spec(&self) -> SignalSpec {
        let encoding = match self.format {
            WavFormat::Pcm => Encoding::SignedInt,
            WavFormat::IeeeFloat => Encoding::Float,
        };
        SignalSpec::new(self.sample_rate, self.channels).with_encoding(self.bits_per_sample, encoding)
    }
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Maps a hound header onto a pipeline descriptor, rejecting layouts the
/// codecs cannot stream.
pub(crate) fn signal_spec(spec: hound::WavSpec) -> Result<SignalSpec> {
    let encoding = match spec.sample_format {
        SampleFormat::Int => Encoding::SignedInt,
        SampleFormat::Float => Encoding::Float,
    };
    check(spec.channels, spec.sample_rate, spec.bits_per_sample, encoding)?;
    Ok(SignalSpec::new(spec.sample_rate, spec.channels).with_encoding(spec.bits_per_sample, encoding))
}

/// The hound header for writing `spec`.
pub(crate) fn hound_spec(spec: &SignalSpec) -> Result<hound::WavSpec> {
    check(spec.channels, spec.rate, spec.bits, spec.encoding)?;
    Ok(hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.rate,
        bits_per_sample: spec.bits,
        sample_format: match spec.encoding {
            Encoding::SignedInt => SampleFormat::Int,
            Encoding::Float => SampleFormat::Float,
        },
    })
}

fn check(channels: u16, rate: u32, bits: u16, encoding: Encoding) -> Result<()> {
    if channels == 0 || rate == 0 {
        return Err(Error::UnsupportedFormat(format!(
            "{channels} channel(s) at {rate} Hz"
        )));
    }
    let supported = match encoding {
        Encoding::SignedInt => matches!(bits, 8 | 16 | 24 | 32),
        Encoding::Float => bits == 32,
    };
    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(format!(
            "{bits}-bit {}",
            encoding.label()
        )))
    }
}
