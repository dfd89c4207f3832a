//! Triangle oscillator.
//!
//! The top 8 bits of the accumulator form a phase `P`; the output rises
//! 0..127 over the first half turn and falls 127..0 over the second.

use serde::{Deserialize, Serialize};

use super::{advance, ACCUMULATOR_BITS, LATCH_PHASE, TRIGGER_PHASE};

/// Triangle value for an 8-bit phase: `P` below 128, `255 - P` above.
#[inline]
pub fn triangle_shape(phase: u8) -> u8 {
    if phase < 128 { phase } else { 255 - phase }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleOscillator {
    accumulator: u16,
    out: u8,
}

impl TriangleOscillator {
    pub fn new() -> Self {
        TriangleOscillator { accumulator: 0, out: 0 }
    }

    pub fn reset(&mut self) {
        *self = TriangleOscillator::new();
    }

    #[inline]
    pub fn sample(&self) -> u8 {
        self.out
    }

    pub fn accumulator(&self) -> u16 {
        self.accumulator
    }

    /// 8-bit waveform phase (top of the accumulator).
    pub fn wave_phase(&self) -> u8 {
        (self.accumulator >> (ACCUMULATOR_BITS - 8)) as u8
    }

    pub fn next(&self, phase: u16, freq_increment: u16) -> Self {
        let accumulator = if phase == TRIGGER_PHASE {
            advance(self.accumulator, freq_increment)
        } else {
            self.accumulator
        };
        let out = if phase == LATCH_PHASE { triangle_shape(self.wave_phase()) } else { self.out };
        TriangleOscillator { accumulator, out }
    }

    pub fn tick(&mut self, phase: u16, freq_increment: u16) {
        *self = self.next(phase, freq_increment);
    }
}
