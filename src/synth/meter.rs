use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::MAX_VOICES;

/// Per-voice envelope levels published by the render thread once per block
/// and read by the UI. Floats are stored as their bit patterns.
pub struct VoiceMeters {
    levels: [AtomicU32; MAX_VOICES],
    active: AtomicUsize,
}

impl Default for VoiceMeters {
    fn default() -> Self {
        Self {
            levels: std::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
            active: AtomicUsize::new(0),
        }
    }
}

impl VoiceMeters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_level(&self, voice: usize, level: f32) {
        if let Some(slot) = self.levels.get(voice) {
            slot.store(level.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn level(&self, voice: usize) -> f32 {
        self.levels
            .get(voice)
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    pub fn store_active(&self, count: usize) {
        self.active.store(count, Ordering::Relaxed);
    }

    /// Voices that produced sound in the last block.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn levels(&self, count: usize) -> Vec<f32> {
        (0..count.min(MAX_VOICES)).map(|v| self.level(v)).collect()
    }
}
