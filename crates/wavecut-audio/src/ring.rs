//! Lock-free SPSC sample ring between the mixer thread and the audio
//! callback.
//!
//! Slots hold `f32` bits in `AtomicU32`, so the hot path needs no
//! unsafe aliasing: indices carry Acquire/Release ordering, slot data
//! is Relaxed (the index handoff publishes it). The consumer side
//! additionally counts every sample it has handed to the hardware,
//! which backs the device's playback-position query.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

pub struct AudioRing {
    slots: Box<[AtomicU32]>,
    /// One more than the usable capacity, to tell full from empty.
    capacity: usize,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
    consumed: AtomicU64,
}

impl AudioRing {
    /// Ring holding up to `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity + 1;
        let slots = (0..capacity).map(|_| AtomicU32::new(0)).collect();
        Self {
            slots,
            capacity,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            consumed: AtomicU64::new(0),
        }
    }

    /// Samples available for the consumer.
    pub fn len(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        if w >= r {
            w - r
        } else {
            self.capacity - r + w
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples the producer can push without overwriting.
    pub fn space(&self) -> usize {
        self.capacity - 1 - self.len()
    }

    /// Producer side: push samples, returning how many fit.
    pub fn push(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.space());
        let w = self.write_pos.load(Ordering::Relaxed);
        for (i, &sample) in data[..count].iter().enumerate() {
            self.slots[(w + i) % self.capacity].store(sample.to_bits(), Ordering::Relaxed);
        }
        self.write_pos
            .store((w + count) % self.capacity, Ordering::Release);
        count
    }

    /// Consumer side: pop into `out`, returning how many were live.
    /// Also advances the consumed-sample counter.
    pub fn pop(&self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.len());
        let r = self.read_pos.load(Ordering::Relaxed);
        for (i, slot) in out[..count].iter_mut().enumerate() {
            *slot = f32::from_bits(self.slots[(r + i) % self.capacity].load(Ordering::Relaxed));
        }
        self.read_pos
            .store((r + count) % self.capacity, Ordering::Release);
        self.consumed.fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Total samples ever popped by the consumer.
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Drop everything buffered (producer side, while the consumer is
    /// quiescent).
    pub fn clear(&self) {
        self.read_pos
            .store(self.write_pos.load(Ordering::Acquire), Ordering::Release);
    }
}
