//! Phase-accumulator oscillators.
//!
//! - [`SineOscillator`] — CORDIC sine, 7-bit output centered at 64
//! - [`TriangleOscillator`] — piecewise-linear triangle, 7-bit output
//!
//! Both hold a 14-bit accumulator that advances by the channel's frequency
//! increment once per sample period, at [`TRIGGER_PHASE`]. The visible output
//! is latched on the last tick of the period ([`LATCH_PHASE`]), so a new
//! sample is present from phase 0 and held for the whole sample period.

mod sine;
mod triangle;

pub use sine::{angle_index, cordic_sine, Cordic, SineOscillator, CORDIC_ITERATIONS};
pub use triangle::{triangle_shape, TriangleOscillator};

use crate::phase::PHASE_PERIOD;
use crate::SAMPLE_RATE_HZ;

/// Accumulator width in bits.
pub const ACCUMULATOR_BITS: u32 = 14;
/// Accumulator (and frequency increment) mask.
pub const ACCUMULATOR_MASK: u16 = (1 << ACCUMULATOR_BITS) - 1;
/// Phase counter value at which the accumulators advance.
pub const TRIGGER_PHASE: u16 = 8;
/// Phase counter value on whose tick each oscillator latches its new sample.
/// The mixer captures at phase 0 and must already see it.
pub const LATCH_PHASE: u16 = PHASE_PERIOD - 1;
/// Largest 7-bit sample.
pub const SAMPLE_MAX: u8 = 127;

/// One accumulator step, wrapping modulo 2^14.
#[inline]
pub(crate) fn advance(accumulator: u16, freq_increment: u16) -> u16 {
    accumulator.wrapping_add(freq_increment & ACCUMULATOR_MASK) & ACCUMULATOR_MASK
}

/// Frequency increment for a tone at `hz`: `round(hz * 2^14 / SAMPLE_RATE_HZ)`.
///
/// Clamped to the 14-bit register range; negative or NaN input gives 0.
pub fn freq_to_increment(hz: f64) -> u16 {
    let step = (hz * (1u32 << ACCUMULATOR_BITS) as f64 / SAMPLE_RATE_HZ as f64).round();
    if step.is_nan() || step <= 0.0 {
        0
    } else {
        step.min(ACCUMULATOR_MASK as f64) as u16
    }
}

/// Tone frequency produced by a given increment.
pub fn increment_to_freq(freq_increment: u16) -> f64 {
    (freq_increment & ACCUMULATOR_MASK) as f64 * SAMPLE_RATE_HZ as f64
        / (1u32 << ACCUMULATOR_BITS) as f64
}

/// Chromatic run of `steps` frequencies starting at `start_hz`, one half step apart.
pub fn semitone_sweep(start_hz: f64, steps: usize) -> Vec<f64> {
    let half_step = 2f64.powf(1.0 / 12.0);
    (0..steps).map(|i| start_hz * half_step.powi(i as i32)).collect()
}
