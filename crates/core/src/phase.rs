//! Free-running sample-rate phase counter.
//!
//! The only clock-like primitive in the core. It advances by one every clock
//! tick and wraps at [`PHASE_PERIOD`]. Oscillators read the full 10-bit value
//! to find their trigger and latch points; the PWM mixer reads the low 8 bits
//! as its period position, so one audio sample spans four PWM periods.

use serde::{Deserialize, Serialize};

/// Counter width in bits.
pub const PHASE_BITS: u32 = 10;
/// Ticks per audio sample (counter wraps here).
pub const PHASE_PERIOD: u16 = 1 << PHASE_BITS;
/// Ticks per PWM period.
pub const PWM_PERIOD: u16 = 256;

const PHASE_MASK: u16 = PHASE_PERIOD - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounter {
    value: u16,
}

impl PhaseCounter {
    pub fn new() -> Self {
        PhaseCounter { value: 0 }
    }

    /// Current count (0..1023), exposed on the pins as `subsample_phase`.
    #[inline]
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Position inside the current PWM period (0..255).
    #[inline]
    pub fn pwm_position(&self) -> u8 {
        (self.value & (PWM_PERIOD - 1)) as u8
    }

    /// Counter state after one more tick.
    #[inline]
    pub fn next(&self) -> Self {
        PhaseCounter { value: (self.value + 1) & PHASE_MASK }
    }

    /// Advance in place. Only for driving a counter on its own; the top-level
    /// tick uses [`next`](Self::next) so that every block sees the same snapshot.
    pub fn tick(&mut self) {
        *self = self.next();
    }

    pub fn reset(&mut self) {
        *self = PhaseCounter::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    #[test]
    fn test_counts_from_reset() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..16 {
            let n: u32 = rng.gen_range(0..5000);
            let mut c = PhaseCounter::new();
            for _ in 0..n { c.tick(); }
            assert_eq!(c.value() as u32, n % PHASE_PERIOD as u32);
        }
    }

    #[test]
    fn test_wraps_at_period() {
        let mut c = PhaseCounter::new();
        for _ in 0..PHASE_PERIOD - 1 { c.tick(); }
        assert_eq!(c.value(), 1023);
        c.tick();
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn test_pwm_position_is_low_byte() {
        let mut c = PhaseCounter::new();
        let mut period_starts = 0;
        for _ in 0..PHASE_PERIOD {
            assert_eq!(c.pwm_position() as u16, c.value() % PWM_PERIOD);
            if c.pwm_position() == 0 { period_starts += 1; }
            c.tick();
        }
        // Four PWM periods per audio sample
        assert_eq!(period_starts, 4);
    }

    #[test]
    fn test_reset() {
        let mut c = PhaseCounter::new();
        for _ in 0..77 { c.tick(); }
        c.reset();
        assert_eq!(c.value(), 0);
    }
}
