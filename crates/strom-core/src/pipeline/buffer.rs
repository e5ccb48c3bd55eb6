//! Fixed-capacity sample buffers owned by chain entries.
//!
//! A [`StageBuffer`] is the output buffer of one chain entry. It is indexed by
//! two cursors: `produced` (samples written so far) and `consumed` (samples
//! taken by the downstream entry). The invariant
//! `consumed <= produced <= capacity` always holds, and the buffer rewinds to
//! offset zero as soon as everything produced has been consumed.
//!
//! Capacity is fixed at construction and never reallocated during a run.

use crate::sample::{Sample, clip_block};

/// Output buffer of a chain entry.
#[derive(Debug, Clone)]
pub struct StageBuffer {
    data: Vec<Sample>,
    produced: usize,
    consumed: usize,
}

impl StageBuffer {
    /// Creates an empty buffer holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            produced: 0,
            consumed: 0,
        }
    }

    /// Maximum number of samples the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total samples written since the last rewind.
    #[inline]
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Samples taken by the downstream entry since the last rewind.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Samples written but not yet consumed.
    #[inline]
    pub fn pending(&self) -> usize {
        self.produced - self.consumed
    }

    /// True when nothing is waiting to be consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.produced == self.consumed
    }

    /// Room left for new samples without rewinding.
    #[inline]
    pub fn space(&self) -> usize {
        self.data.len() - self.produced
    }

    /// Samples waiting to be consumed.
    #[inline]
    pub fn readable(&self) -> &[Sample] {
        &self.data[self.consumed..self.produced]
    }

    /// Free tail of the buffer, to be filled and then [`commit`](Self::commit)ted.
    #[inline]
    pub fn writable(&mut self) -> &mut [Sample] {
        &mut self.data[self.produced..]
    }

    /// Makes room at the tail by moving pending samples to offset zero.
    ///
    /// Only moves data when the tail is full and something was consumed.
    /// Returns the resulting free space.
    pub fn reserve(&mut self) -> usize {
        if self.space() == 0 && self.consumed > 0 {
            self.data.copy_within(self.consumed..self.produced, 0);
            self.produced -= self.consumed;
            self.consumed = 0;
        }
        self.space()
    }

    /// Marks `n` samples at the tail as written.
    ///
    /// Out-of-range values are clamped; returns the number clamped.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`space`](Self::space).
    pub fn commit(&mut self, n: usize) -> u64 {
        assert!(
            n <= self.space(),
            "commit of {n} samples exceeds free space {}",
            self.space()
        );
        let start = self.produced;
        self.produced += n;
        clip_block(&mut self.data[start..self.produced])
    }

    /// Marks `n` pending samples as consumed, rewinding when empty.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`pending`](Self::pending).
    pub fn consume(&mut self, n: usize) {
        assert!(
            n <= self.pending(),
            "consume of {n} samples exceeds pending {}",
            self.pending()
        );
        self.consumed += n;
        if self.consumed == self.produced {
            self.produced = 0;
            self.consumed = 0;
        }
    }

    /// Copies as many samples from `src` as fit; returns the count copied.
    pub fn push(&mut self, src: &[Sample]) -> usize {
        let n = src.len().min(self.reserve());
        self.writable()[..n].copy_from_slice(&src[..n]);
        self.produced += n;
        n
    }

    /// Discards all pending samples and rewinds.
    pub fn clear(&mut self) {
        self.produced = 0;
        self.consumed = 0;
    }
}
