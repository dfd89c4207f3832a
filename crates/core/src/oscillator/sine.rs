//! CORDIC sine oscillator.
//!
//! The top 9 bits of the accumulator select one of 512 angles per turn. A
//! rotation-mode CORDIC turns that angle into `63 * sin(angle)` using only
//! shifts and adds, one iteration per clock tick after the trigger. The
//! converged value is latched as the output on the last tick of the sample
//! period, so the output never shows a half-finished rotation.
//!
//! ## Fixed-point format
//!
//! - Angles are 16-bit binary angles (65536 = one turn), folded into
//!   [-90°, +90°] before rotating.
//! - `x`/`y` carry 8 fractional bits. The start vector is pre-scaled by the
//!   CORDIC gain so `y` ends at `63 * 256 * sin(angle)`.
//! - Output = `64 + round(y / 256)`, which stays within 1..=127.
//!
//! Ripple of about one LSB around the center value is inherent to the
//! 9-bit angle and the short iteration count.

use serde::{Deserialize, Serialize};

use super::{advance, ACCUMULATOR_BITS, LATCH_PHASE, SAMPLE_MAX, TRIGGER_PHASE};

/// Rotation iterations per sample.
pub const CORDIC_ITERATIONS: usize = 12;
/// Output at zero angle (silence).
pub const SINE_CENTER: u8 = 64;

/// Angle resolution taken from the top of the accumulator.
const ANGLE_BITS: u32 = 9;
const FRAC_BITS: u32 = 8;
const HALF_TURN: i32 = 1 << 15;
const QUARTER_TURN: i32 = 1 << 14;

/// atan(2^-i) in binary-angle units.
const CORDIC_ATAN: [i32; CORDIC_ITERATIONS] = [
    8192, 4836, 2555, 1297, 651, 326, 163, 81, 41, 20, 10, 5,
];

/// round(63 * 256 * K), K = prod(1 / sqrt(1 + 2^-2i)) over 12 iterations.
const CORDIC_X0: i32 = 9794;

/// Angle index (0..511) for an accumulator value.
#[inline]
pub fn angle_index(accumulator: u16) -> u16 {
    accumulator >> (ACCUMULATOR_BITS - ANGLE_BITS)
}

/// Map an angle index to a binary angle in [-QUARTER_TURN, QUARTER_TURN]
/// with the same sine.
fn fold_angle(angle: u16) -> i32 {
    let mut z = ((angle as i32) & ((1 << ANGLE_BITS) - 1)) << (16 - ANGLE_BITS);
    if z >= HALF_TURN {
        z -= 2 * HALF_TURN;
    }
    if z > QUARTER_TURN {
        HALF_TURN - z
    } else if z < -QUARTER_TURN {
        -HALF_TURN - z
    } else {
        z
    }
}

/// Iterative CORDIC rotation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cordic {
    x: i32,
    y: i32,
    /// Residual angle still to rotate through
    z: i32,
    /// Iterations completed
    step: u8,
}

impl Default for Cordic {
    fn default() -> Self {
        Cordic::idle()
    }
}

impl Cordic {
    /// Converged at zero angle; samples as [`SINE_CENTER`].
    pub fn idle() -> Self {
        Cordic { x: 0, y: 0, z: 0, step: CORDIC_ITERATIONS as u8 }
    }

    /// Start a rotation for an angle index (0..511).
    pub fn load(angle: u16) -> Self {
        Cordic { x: CORDIC_X0, y: 0, z: fold_angle(angle), step: 0 }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.step as usize >= CORDIC_ITERATIONS
    }

    /// One shift-add iteration. No-op once converged.
    pub fn step(&self) -> Self {
        if self.is_done() {
            return *self;
        }
        let i = self.step as u32;
        let atan = CORDIC_ATAN[self.step as usize];
        let (x, y, z) = if self.z >= 0 {
            (self.x - (self.y >> i), self.y + (self.x >> i), self.z - atan)
        } else {
            (self.x + (self.y >> i), self.y - (self.x >> i), self.z + atan)
        };
        Cordic { x, y, z, step: self.step + 1 }
    }

    /// Current `y` as a 7-bit unsigned sample.
    pub fn sample(&self) -> u8 {
        let rounded = (self.y + (1 << (FRAC_BITS - 1))) >> FRAC_BITS;
        (SINE_CENTER as i32 + rounded).clamp(0, SAMPLE_MAX as i32) as u8
    }
}

/// Pure form of the oscillator's sine: all iterations at once.
pub fn cordic_sine(angle: u16) -> u8 {
    let mut c = Cordic::load(angle);
    while !c.is_done() {
        c = c.step();
    }
    c.sample()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SineOscillator {
    accumulator: u16,
    cordic: Cordic,
    out: u8,
}

impl Default for SineOscillator {
    fn default() -> Self {
        SineOscillator::new()
    }
}

impl SineOscillator {
    pub fn new() -> Self {
        SineOscillator { accumulator: 0, cordic: Cordic::idle(), out: SINE_CENTER }
    }

    pub fn reset(&mut self) {
        *self = SineOscillator::new();
    }

    /// Latched output sample (0..127).
    #[inline]
    pub fn sample(&self) -> u8 {
        self.out
    }

    pub fn accumulator(&self) -> u16 {
        self.accumulator
    }

    pub fn cordic(&self) -> &Cordic {
        &self.cordic
    }

    /// Oscillator state after one tick at counter value `phase`.
    pub fn next(&self, phase: u16, freq_increment: u16) -> Self {
        let (accumulator, cordic) = if phase == TRIGGER_PHASE {
            let acc = advance(self.accumulator, freq_increment);
            (acc, Cordic::load(angle_index(acc)))
        } else {
            (self.accumulator, self.cordic.step())
        };
        let out = if phase == LATCH_PHASE { self.cordic.sample() } else { self.out };
        SineOscillator { accumulator, cordic, out }
    }

    pub fn tick(&mut self, phase: u16, freq_increment: u16) {
        *self = self.next(phase, freq_increment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oscillator::freq_to_increment;
    use crate::phase::{PhaseCounter, PHASE_PERIOD};
    use std::f64::consts::PI;

    /// Allowed error at the extremes and at the center; linear in between.
    const TOL_EXTREME: f64 = 1.0;
    const TOL_CENTER: f64 = 2.0;

    fn reference(turns: f64) -> f64 {
        64.0 + 63.0 * (2.0 * PI * turns).sin()
    }

    fn tolerance(expected: f64) -> f64 {
        let distance = ((expected - 64.0).abs() / 63.0).min(1.0);
        TOL_CENTER - (TOL_CENTER - TOL_EXTREME) * distance
    }

    fn run(osc: &mut SineOscillator, counter: &mut PhaseCounter, inc: u16, ticks: usize) {
        for _ in 0..ticks {
            osc.tick(counter.value(), inc);
            counter.tick();
        }
    }

    #[test]
    fn test_cordic_fixed_points() {
        assert_eq!(cordic_sine(0), 64);
        assert_eq!(cordic_sine(128), 127);
        assert_eq!(cordic_sine(256), 64);
        assert_eq!(cordic_sine(384), 1);
    }

    #[test]
    fn test_cordic_every_angle() {
        for angle in 0..512u16 {
            let s = cordic_sine(angle) as f64;
            let expected = reference(angle as f64 / 512.0);
            assert!((1.0..=127.0).contains(&s));
            assert!((s - expected).abs() <= tolerance(expected),
                "angle {}: got {} expected {:.2}", angle, s, expected);
        }
    }

    #[test]
    fn test_cordic_symmetry() {
        // sin(pi - a) = sin(a), sin(-a) = -sin(a)
        for angle in 1..256u16 {
            assert_eq!(cordic_sine(angle), cordic_sine(256 - angle), "angle {}", angle);
            let pos = cordic_sine(angle) as i32 - 64;
            let neg = cordic_sine(512 - angle) as i32 - 64;
            assert!((pos + neg).abs() <= 1, "angle {}: {} vs {}", angle, pos, neg);
        }
    }

    #[test]
    fn test_engine_converges_to_pure_result() {
        let mut c = Cordic::load(77);
        let mut ticks = 0;
        while !c.is_done() {
            c = c.step();
            ticks += 1;
        }
        assert_eq!(ticks, CORDIC_ITERATIONS);
        assert_eq!(c.sample(), cordic_sine(77));
        // Extra steps do nothing
        assert_eq!(c.step(), c);
    }

    #[test]
    fn test_silence_at_zero_increment() {
        let mut osc = SineOscillator::new();
        let mut counter = PhaseCounter::new();
        for _ in 0..10 * PHASE_PERIOD as usize {
            osc.tick(counter.value(), 0);
            counter.tick();
            assert_eq!(osc.sample(), 64);
        }
        assert_eq!(osc.accumulator(), 0);
    }

    #[test]
    fn test_accumulator_advances_once_per_period() {
        let mut osc = SineOscillator::new();
        let mut counter = PhaseCounter::new();
        run(&mut osc, &mut counter, 1000, 8);
        assert_eq!(osc.accumulator(), 0);
        run(&mut osc, &mut counter, 1000, 1);
        assert_eq!(osc.accumulator(), 1000);
        run(&mut osc, &mut counter, 1000, 20 * PHASE_PERIOD as usize);
        assert_eq!(osc.accumulator(), (21 * 1000) % 16384);
    }

    #[test]
    fn test_output_changes_only_at_latch() {
        let mut osc = SineOscillator::new();
        let mut counter = PhaseCounter::new();
        let inc = freq_to_increment(1000.0);
        for _ in 0..40 * PHASE_PERIOD as usize {
            let before = osc.sample();
            let phase = counter.value();
            osc.tick(phase, inc);
            counter.tick();
            if osc.sample() != before {
                assert_eq!(phase, LATCH_PHASE);
            }
        }
    }

    #[test]
    fn test_latched_sample_matches_accumulator() {
        let mut osc = SineOscillator::new();
        let mut counter = PhaseCounter::new();
        let inc = freq_to_increment(733.0);
        // Park before the trigger; each full period then covers one trigger
        // followed by one latch, and the two agree until the next trigger
        run(&mut osc, &mut counter, inc, 4);
        for _ in 0..64 {
            run(&mut osc, &mut counter, inc, PHASE_PERIOD as usize);
            assert_eq!(osc.sample(), cordic_sine(angle_index(osc.accumulator())));
        }
    }

    #[test]
    fn test_tracks_400hz_tone() {
        let mut osc = SineOscillator::new();
        let mut counter = PhaseCounter::new();
        let inc = freq_to_increment(400.0);
        let mut lo = 127u8;
        let mut hi = 0u8;
        run(&mut osc, &mut counter, inc, 4);
        for periods in 1..=300u64 {
            run(&mut osc, &mut counter, inc, PHASE_PERIOD as usize);
            let elapsed = periods * inc as u64;
            let expected = reference((elapsed % 16384) as f64 / 16384.0);
            let s = osc.sample();
            assert!((s as f64 - expected).abs() <= tolerance(expected),
                "period {}: got {} expected {:.2}", periods, s, expected);
            lo = lo.min(s);
            hi = hi.max(s);
        }
        assert!(hi >= 125 && lo <= 3, "range {}..{}", lo, hi);
    }

    #[test]
    fn test_reset_mid_rotation() {
        let mut osc = SineOscillator::new();
        let mut counter = PhaseCounter::new();
        let inc = freq_to_increment(2000.0);
        run(&mut osc, &mut counter, inc, 3 * PHASE_PERIOD as usize + 12);
        assert!(!osc.cordic().is_done());
        osc.reset();
        counter.reset();
        assert_eq!(osc.sample(), 64);
        assert_eq!(osc.accumulator(), 0);
        assert!(osc.cordic().is_done());
        run(&mut osc, &mut counter, 0, 2 * PHASE_PERIOD as usize);
        assert_eq!(osc.sample(), 64);
    }
}
