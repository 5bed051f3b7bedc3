// DSP utilities - Output hygiene and panning
//
// Small allocation-free helpers used on the render path.

use std::f32::consts::FRAC_PI_2;

/// Flush denormals to zero
///
/// Very small values can slow some CPUs down considerably; anything below
/// 1e-15 is far under 32-bit float noise and is forced to zero.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping with tanh
///
/// Smoothly limits output into [-1, 1]; nearly linear around 0.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Hard clipping into [-1, 1]
#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Constant-power pan law
///
/// `pan` goes from -1.0 (left) to 1.0 (right); returns (left gain, right gain)
/// with `left² + right² = 1`.
#[inline]
pub fn constant_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) * 0.5 + 0.5) * FRAC_PI_2;
    (angle.cos(), angle.sin())
}
