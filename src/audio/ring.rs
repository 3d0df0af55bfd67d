//! Fixed-capacity ring buffer for `f32` audio samples.
//!
//! Backs the VAD pre-roll: while no speech is detected, incoming blocks are
//! written here so that when speech starts, the preceding ~300 ms can be
//! prepended and word onsets are not clipped.  When full, new samples
//! overwrite the oldest ones — only the most recent `capacity` samples are
//! ever kept.

// ---------------------------------------------------------------------------
// SampleRing
// ---------------------------------------------------------------------------

/// A fixed-capacity circular sample buffer.
///
/// ## Overflow behaviour
///
/// When [`push_slice`](Self::push_slice) would exceed `capacity`, the oldest
/// samples are silently overwritten.  The buffer never allocates beyond its
/// initial capacity.
pub struct SampleRing {
    buf: Vec<f32>,
    capacity: usize,
    /// Index of the next write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl SampleRing {
    /// Create a new ring with the given `capacity` in samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SampleRing capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `samples`, overwriting the oldest data when full.
    pub fn push_slice(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.buf[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            }
        }
    }

    /// Remove and return all stored samples in chronological order.
    pub fn take(&mut self) -> Vec<f32> {
        if self.len == 0 {
            return Vec::new();
        }

        // A buffer that never filled starts at index 0; once overflow has
        // happened the oldest sample sits at `write_pos`.
        let read_pos = if self.len < self.capacity {
            0
        } else {
            self.write_pos
        };

        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            out.push(self.buf[(read_pos + i) % self.capacity]);
        }

        self.clear();
        out
    }

    /// Discard all samples and reset the write position.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of valid samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
