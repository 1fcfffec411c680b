use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A float parameter shared between the control side and the audio thread.
///
/// Writes are visible to the next processed block; the audio side only ever
/// reads it.
#[derive(Debug, Clone)]
pub struct AudioParam {
    bits: Arc<AtomicU32>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set_value(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// True when both handles point at the same parameter.
    pub fn same_as(&self, other: &AudioParam) -> bool {
        Arc::ptr_eq(&self.bits, &other.bits)
    }
}
