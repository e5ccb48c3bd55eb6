//! Signal descriptors attached to every stream endpoint and stage side.

use core::fmt;

/// Sample encoding of a stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Two's-complement integer PCM.
    #[default]
    SignedInt,
    /// IEEE 754 floating point.
    Float,
}

impl Encoding {
    /// Short lowercase label used in logs and CLI output.
    pub const fn label(&self) -> &'static str {
        match self {
            Encoding::SignedInt => "signed-integer",
            Encoding::Float => "floating-point",
        }
    }
}

/// Describes a stream of interleaved samples.
///
/// # Example
///
/// ```rust
/// use strom_core::SignalSpec;
///
/// let cd = SignalSpec::new(44100, 2);
/// let mono = cd.with_channels(1);
/// assert_eq!(mono.rate, 44100);
/// assert!(!cd.same_shape(&mono));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalSpec {
    /// Sample rate in Hz.
    pub rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Bit depth of the encoding.
    pub bits: u16,
    /// Sample encoding.
    pub encoding: Encoding,
}

impl SignalSpec {
    /// Creates a 16-bit integer descriptor with the given rate and channels.
    pub const fn new(rate: u32, channels: u16) -> Self {
        Self {
            rate,
            channels,
            bits: 16,
            encoding: Encoding::SignedInt,
        }
    }

    /// Returns a copy with a different channel count.
    pub const fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Returns a copy with a different sample rate.
    pub const fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// Returns a copy with a different bit depth and encoding.
    pub const fn with_encoding(mut self, bits: u16, encoding: Encoding) -> Self {
        self.bits = bits;
        self.encoding = encoding;
        self
    }

    /// True when both descriptors carry the same rate and channel count.
    ///
    /// Stages only ever see [`Sample`](crate::Sample)s, so bit depth and
    /// encoding do not take part in chain negotiation.
    pub const fn same_shape(&self, other: &SignalSpec) -> bool {
        self.rate == other.rate && self.channels == other.channels
    }

    /// Number of whole frames contained in `samples` interleaved samples.
    pub fn frames(&self, samples: usize) -> usize {
        samples / usize::from(self.channels.max(1))
    }

    /// Rounds `samples` down to a whole number of frames.
    pub fn frame_aligned(&self, samples: usize) -> usize {
        self.frames(samples) * usize::from(self.channels.max(1))
    }
}

impl Default for SignalSpec {
    fn default() -> Self {
        Self::new(48000, 1)
    }
}

impl fmt::Display for SignalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit {}",
            self.rate,
            self.channels,
            self.bits,
            self.encoding.label()
        )
    }
}
