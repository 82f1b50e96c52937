//! Fixed-size scalar quantization.
//!
//! Every function here is total: out-of-range input is clamped, and NaN
//! compresses to code 0.

#[inline]
fn max_step(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

#[inline]
fn compress_unit(normalized: f32, bits: u32) -> u32 {
    let steps = max_step(bits);
    (normalized.clamp(0.0, 1.0) * steps as f32).round() as u32
}

#[inline]
fn decompress_unit(code: u32, bits: u32) -> f32 {
    let steps = max_step(bits);
    (code & steps) as f32 / steps as f32
}

/// Quantizes `value` in `[0, max_value]` into `bits` bits.
pub fn compress_scaled_integer(value: f32, max_value: f32, bits: u32) -> u32 {
    compress_unit(value / max_value, bits)
}

pub fn decompress_scaled_integer(code: u32, max_value: f32, bits: u32) -> f32 {
    decompress_unit(code, bits) * max_value
}

/// Quantizes a signed `value` in `[-max_value, max_value]` into `bits` bits.
pub fn compress_velocity(value: f32, max_value: f32, bits: u32) -> u32 {
    compress_unit((value + max_value) / (2.0 * max_value), bits)
}

pub fn decompress_velocity(code: u32, max_value: f32, bits: u32) -> f32 {
    decompress_unit(code, bits) * 2.0 * max_value - max_value
}

/// Distance between two adjacent codes for a field spanning `range`.
pub fn quantization_step(range: f32, bits: u32) -> f32 {
    range / max_step(bits) as f32
}
