//! Fixed-capacity circular sample buffer

/// Circular store holding the most recent `capacity` samples.
///
/// The buffer starts zero-filled, so it is always "full"; pushing N samples
/// evicts the N oldest. One buffer is exclusively owned by one pipeline;
/// consumers read post-tick snapshots, never the buffer mid-mutation.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    /// Index of the oldest sample
    head: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            data: vec![0.0; capacity],
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Append new samples, evicting the same number of oldest ones.
    ///
    /// When the incoming slice is at least as long as the buffer, only its
    /// trailing `capacity` samples survive.
    pub fn push(&mut self, samples: &[f64]) {
        let capacity = self.data.len();
        if samples.len() >= capacity {
            self.data.copy_from_slice(&samples[samples.len() - capacity..]);
            self.head = 0;
            return;
        }

        for &sample in samples {
            self.data[self.head] = sample;
            self.head = (self.head + 1) % capacity;
        }
    }

    /// Ordered copy of the contents, oldest first
    pub fn snapshot(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.data.len());
        out.extend_from_slice(&self.data[self.head..]);
        out.extend_from_slice(&self.data[..self.head]);
        out
    }

    /// Ordered copy of the most recent `n` samples (clamped to capacity)
    pub fn latest(&self, n: usize) -> Vec<f64> {
        let snapshot = self.snapshot();
        let n = n.min(snapshot.len());
        snapshot[snapshot.len() - n..].to_vec()
    }

    /// Reset the buffer to all zeros
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.head = 0;
    }
}
