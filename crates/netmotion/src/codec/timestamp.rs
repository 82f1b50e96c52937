use crate::settings::EncodingSettings;

/// Session time folded into a fixed-width repeating counter.
///
/// Only intervals shorter than one ring period are meaningful. Use
/// [`TimestampRing::unwrap_near`] to lift a decoded value back next to a
/// locally tracked reference time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampRing {
    quantum: f32,
    bits: u32,
}

impl TimestampRing {
    /// `bits` must lie in `1..=32`.
    pub(crate) fn new(quantum: f32, bits: u32) -> Self {
        Self { quantum, bits }
    }

    pub(crate) fn from_settings(settings: &EncodingSettings) -> Self {
        Self::new(settings.timestamp_quantum, settings.timestamp_bits)
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        1u64 << self.bits
    }

    #[inline]
    pub fn mask(&self) -> u32 {
        (self.steps() - 1) as u32
    }

    pub fn quantum(&self) -> f32 {
        self.quantum
    }

    /// Length of one ring period in seconds.
    pub fn buffer(&self) -> f32 {
        self.buffer_f64() as f32
    }

    fn buffer_f64(&self) -> f64 {
        self.steps() as f64 * self.quantum as f64
    }

    pub fn compress(&self, timestamp: f32) -> u32 {
        let normalized = (timestamp as f64).rem_euclid(self.buffer_f64());
        let code = (normalized / self.quantum as f64).round() as u64;
        (code % self.steps()) as u32
    }

    pub fn decompress(&self, code: u32) -> f32 {
        ((code & self.mask()) as f64 * self.quantum as f64) as f32
    }

    /// Returns `decoded + k * buffer` for the integer `k` that lands closest
    /// to `reference`.
    pub fn unwrap_near(&self, decoded: f32, reference: f32) -> f32 {
        let buffer = self.buffer_f64();
        let laps = ((reference as f64 - decoded as f64) / buffer).round();
        (decoded as f64 + laps * buffer) as f32
    }
}
