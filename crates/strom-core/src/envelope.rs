//! Peak envelope follower for the dynamics stages.

use libm::expf;

/// Tracks signal amplitude with separate attack and release times.
///
/// Works in whatever units it is fed; the compressor feeds it normalized
/// magnitudes.
///
/// # Example
///
/// ```rust
/// use strom_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::new(48000.0, 10.0, 100.0);
/// let level = env.process(0.5);
/// assert!(level > 0.0 && level < 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl EnvelopeFollower {
    /// Creates a follower with the given times in milliseconds.
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        Self {
            envelope: 0.0,
            attack_coeff: time_coefficient(attack_ms.max(0.1), sample_rate),
            release_coeff: time_coefficient(release_ms.max(1.0), sample_rate),
        }
    }

    /// Feeds one value and returns the updated envelope.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let magnitude = input.abs();
        let coeff = if magnitude > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * magnitude;
        self.envelope
    }

    /// Current envelope without feeding input.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Drops the envelope to zero.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

// coeff = exp(-1 / (time_ms * sample_rate / 1000))
fn time_coefficient(ms: f32, sample_rate: f32) -> f32 {
    expf(-1.0 / (ms * sample_rate / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rises_and_falls() {
        let mut env = EnvelopeFollower::new(48000.0, 1.0, 50.0);
        for _ in 0..4800 {
            env.process(1.0);
        }
        assert!(env.level() > 0.99);
        for _ in 0..480 {
            env.process(0.0);
        }
        let after = env.level();
        assert!(after < 0.99 && after > 0.5, "release too fast or slow: {after}");
    }

    #[test]
    fn attack_faster_than_release() {
        let mut env = EnvelopeFollower::new(48000.0, 1.0, 100.0);
        for _ in 0..48 {
            env.process(1.0);
        }
        let risen = env.level();
        env.reset();
        assert_eq!(env.level(), 0.0);
        assert!(risen > 0.6);
    }

    #[test]
    fn negative_input_tracks_magnitude() {
        let mut a = EnvelopeFollower::new(8000.0, 5.0, 5.0);
        let mut b = a.clone();
        assert_eq!(a.process(-0.3), b.process(0.3));
    }
}
