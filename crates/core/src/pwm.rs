//! Dual-channel one-bit PWM mixer.
//!
//! At the start of every 256-tick period (position 0) the two 7-bit channel
//! samples are summed into an 8-bit duty value. The comparator output is
//! registered, so `pwm_out` after the tick at position `p` is `p < duty`.
//! Over one full period the output is therefore high for exactly `duty`
//! ticks. Samples presented at any other position are ignored until the next
//! period start.

use serde::{Deserialize, Serialize};

/// Channel samples are 7 bits wide.
const CHANNEL_MASK: u8 = 0x7F;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmMixer {
    /// Latched ch1 + ch2 (0..254)
    duty: u8,
    out: bool,
}

impl PwmMixer {
    pub fn new() -> Self {
        PwmMixer { duty: 0, out: false }
    }

    pub fn reset(&mut self) {
        *self = PwmMixer::new();
    }

    #[inline]
    pub fn out(&self) -> bool {
        self.out
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    /// Mixer state after one tick at period `position` with the given channel samples.
    pub fn next(&self, position: u8, ch1: u8, ch2: u8) -> Self {
        let duty = if position == 0 {
            (ch1 & CHANNEL_MASK) + (ch2 & CHANNEL_MASK)
        } else {
            self.duty
        };
        PwmMixer { duty, out: position < duty }
    }

    pub fn tick(&mut self, position: u8, ch1: u8, ch2: u8) {
        *self = self.next(position, ch1, ch2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseCounter;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    /// Run positions 0..=255 and count high outputs.
    fn highs_over_period(pwm: &mut PwmMixer, ch1: u8, ch2: u8) -> u32 {
        let mut highs = 0;
        for position in 0..=255u8 {
            pwm.tick(position, ch1, ch2);
            if pwm.out() { highs += 1; }
        }
        highs
    }

    #[test]
    fn test_reset_output_low() {
        let mut pwm = PwmMixer::new();
        highs_over_period(&mut pwm, 100, 100);
        pwm.reset();
        assert!(!pwm.out());
        assert_eq!(pwm.duty(), 0);
    }

    #[test]
    fn test_duty_matches_sample_sum() {
        let mut pwm = PwmMixer::new();
        for (ch1, ch2) in [(0, 0), (10, 5), (50, 20), (127, 0), (100, 100), (127, 127)] {
            let highs = highs_over_period(&mut pwm, ch1, ch2);
            assert_eq!(highs, ch1 as u32 + ch2 as u32, "ch1={} ch2={}", ch1, ch2);
        }
    }

    #[test]
    fn test_duty_sum_every_pair() {
        let mut pwm = PwmMixer::new();
        for ch1 in 0..=127u8 {
            for ch2 in 0..=127u8 {
                assert_eq!(highs_over_period(&mut pwm, ch1, ch2), ch1 as u32 + ch2 as u32);
            }
        }
    }

    #[test]
    fn test_threshold_follows_previous_position() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pwm = PwmMixer::new();
        let mut counter = PhaseCounter::new();
        for _ in 0..256 {
            let sample: u8 = rng.gen();
            let ch1 = sample.min(127);
            let ch2 = (sample - ch1).min(127);
            let expected_duty = ch1 + ch2;
            // Run one full PWM period starting at its first position
            while counter.pwm_position() != 0 {
                pwm.tick(counter.pwm_position(), ch1, ch2);
                counter.tick();
            }
            for _ in 0..256 {
                pwm.tick(counter.pwm_position(), ch1, ch2);
                counter.tick();
                let prev = counter.pwm_position().wrapping_sub(1);
                assert_eq!(pwm.duty(), expected_duty);
                assert_eq!(pwm.out(), prev < expected_duty,
                    "position {} duty {}", counter.pwm_position(), expected_duty);
            }
        }
    }

    #[test]
    fn test_no_capture_mid_period() {
        let mut pwm = PwmMixer::new();
        pwm.tick(0, 20, 20);
        assert_eq!(pwm.duty(), 40);
        let mut highs = 1;
        for position in 1..=255u8 {
            // Different samples every tick; none may be latched
            pwm.tick(position, position & 0x7F, 127);
            assert_eq!(pwm.duty(), 40);
            if pwm.out() { highs += 1; }
        }
        assert_eq!(highs, 40);
        pwm.tick(0, 1, 2);
        assert_eq!(pwm.duty(), 3);
    }

    #[test]
    fn test_channel_bits_above_seven_ignored() {
        let mut pwm = PwmMixer::new();
        pwm.tick(0, 0x80 | 5, 0xFF);
        assert_eq!(pwm.duty(), 5 + 127);
    }
}
