//! # pwm-synth-core
//!
//! Tick-accurate model of a two-channel audio synthesis core: a sine and a
//! triangle oscillator, programmed through a slow byte-wide register bus and
//! mixed into a single one-bit PWM output for an external reconstruction
//! filter.
//!
//! ## Architecture
//!
//! - [`Synth`] — Top level that wires every component to one clock tick
//! - [`phase::PhaseCounter`] — 10-bit free-running counter; the only time base
//! - [`sync::Synchronizer`] — 2-stage input synchronizer for `enable`/`phase`
//! - [`regfile::RegisterFile`] — two 16-bit frequency registers and the write protocol
//! - [`oscillator`] — 14-bit phase accumulators, CORDIC sine and triangle shapers
//! - [`pwm::PwmMixer`] — sums both 7-bit samples into an 8-bit duty cycle
//! - [`capture`] — `pwm_out` edge recording, edge-log/PWL export, PCM audition
//! - [`savestate`] — compressed save/restore of the full synth state
//!
//! ## Timing
//!
//! One audio sample spans 1024 clock ticks ([`SAMPLE_RATE_HZ`]). Within it:
//!
//! | `subsample_phase` | event |
//! |---|---|
//! | 0 | PWM period starts with the samples latched on the previous tick |
//! | 8 | accumulators add their increment; CORDIC loads the new angle |
//! | 9..20 | one CORDIC iteration per tick |
//! | 256, 512, 768 | further PWM period starts (same samples) |
//! | 1023 | oscillators latch the converged sample for the next period |
//!
//! Every component's next state is computed from the current state of all
//! components, then everything is committed at once.

pub mod phase;
pub mod sync;
pub mod regfile;
pub mod oscillator;
pub mod pwm;
pub mod capture;
pub mod savestate;

pub use capture::PwmCapture;
pub use oscillator::{freq_to_increment, SineOscillator, TriangleOscillator};
pub use phase::PhaseCounter;
pub use pwm::PwmMixer;
pub use regfile::{write_steps, RegisterFile, WriteBus};

use serde::{Deserialize, Serialize};

use phase::PHASE_PERIOD;
use regfile::MIN_STAGE_TICKS;

/// Core clock frequency: 28.83584 MHz
pub const CLOCK_HZ: u32 = 28_835_840;
/// Audio sample rate: one sample per full phase-counter turn (28.16 kHz)
pub const SAMPLE_RATE_HZ: u32 = CLOCK_HZ / PHASE_PERIOD as u32;
/// Bit of `uo_out` carrying `pwm_out`
pub const PWM_OUT_BIT: u8 = 0;

const UI_ADDRESS_MASK: u8 = 0x0F;
const UI_PHASE_BIT: u8 = 4;
const UI_ENABLE_BIT: u8 = 5;

/// Input pin levels for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    /// Active-low synchronous reset
    pub rst_n: bool,
    pub enable: bool,
    pub phase: bool,
    /// Register address; only the low 4 bits exist on the wire
    pub address: u8,
    /// Register data byte
    pub data: u8,
}

impl Default for Pins {
    /// Bus idle, reset released.
    fn default() -> Self {
        Pins { rst_n: true, enable: false, phase: false, address: 0, data: 0 }
    }
}

impl Pins {
    /// Bus idle with reset asserted.
    pub fn reset() -> Self {
        Pins { rst_n: false, ..Pins::default() }
    }

    pub fn from_bus(bus: WriteBus) -> Self {
        Pins {
            rst_n: true,
            enable: bus.enable,
            phase: bus.phase,
            address: bus.address,
            data: bus.data,
        }
    }

    /// Decode the chip-level packing: `ui_in` = {unused[2], enable, phase,
    /// address[3:0]}, `uio_in` = data.
    pub fn from_packed(ui_in: u8, uio_in: u8, rst_n: bool) -> Self {
        Pins {
            rst_n,
            enable: ui_in & (1 << UI_ENABLE_BIT) != 0,
            phase: ui_in & (1 << UI_PHASE_BIT) != 0,
            address: ui_in & UI_ADDRESS_MASK,
            data: uio_in,
        }
    }

    /// Encode into (`ui_in`, `uio_in`).
    pub fn to_packed(&self) -> (u8, u8) {
        let ui_in = (self.address & UI_ADDRESS_MASK)
            | ((self.phase as u8) << UI_PHASE_BIT)
            | ((self.enable as u8) << UI_ENABLE_BIT);
        (ui_in, self.data)
    }

    fn bus(&self) -> WriteBus {
        WriteBus {
            enable: self.enable,
            phase: self.phase,
            address: self.address,
            data: self.data,
        }
    }
}

/// The complete synthesis core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Synth {
    counter: PhaseCounter,
    registers: RegisterFile,
    sine: SineOscillator,
    triangle: TriangleOscillator,
    pwm: PwmMixer,
    /// Ticks since construction, including ticks held in reset
    cycles: u64,
    /// `rst_n` was low on the previous tick
    held_in_reset: bool,
    /// Optional `pwm_out` recorder, fed after every tick
    #[serde(skip)]
    capture: Option<PwmCapture>,
}

impl Synth {
    /// A synth in its reset state.
    pub fn new() -> Self {
        Synth::default()
    }

    /// Force every component to its initial value. Same effect as one tick with `rst_n` low,
    /// except that no time passes.
    pub fn reset(&mut self) {
        log::debug!("synth: reset at cycle {}", self.cycles);
        self.clear();
    }

    fn clear(&mut self) {
        self.counter.reset();
        self.registers.reset();
        self.sine.reset();
        self.triangle.reset();
        self.pwm.reset();
    }

    /// Advance one clock tick with `pins` applied.
    pub fn tick(&mut self, pins: &Pins) {
        if pins.rst_n {
            let phase = self.counter.value();
            let counter = self.counter.next();
            let registers = self.registers.next(&pins.bus());
            let sine = self.sine.next(phase, self.registers.get(0));
            let triangle = self.triangle.next(phase, self.registers.get(1));
            let pwm = self.pwm.next(
                self.counter.pwm_position(),
                self.sine.sample(),
                self.triangle.sample(),
            );

            self.counter = counter;
            self.registers = registers;
            self.sine = sine;
            self.triangle = triangle;
            self.pwm = pwm;
        } else if self.held_in_reset {
            self.clear();
        } else {
            self.reset();
        }
        self.held_in_reset = !pins.rst_n;
        self.cycles += 1;

        if let Some(capture) = self.capture.as_mut() {
            capture.push(self.cycles, self.pwm.out());
        }
    }

    /// Advance one tick from the packed chip-level pins. Returns `uo_out`.
    pub fn tick_packed(&mut self, ui_in: u8, uio_in: u8, rst_n: bool) -> u8 {
        self.tick(&Pins::from_packed(ui_in, uio_in, rst_n));
        self.uo_out()
    }

    /// Run `ticks` ticks with the bus idle and reset released.
    pub fn idle(&mut self, ticks: u64) {
        let pins = Pins::default();
        for _ in 0..ticks {
            self.tick(&pins);
        }
    }

    /// Clock one complete register write through the pins, then clear the bus.
    pub fn write_register(&mut self, address: u8, value: u16, hold: u32) {
        if hold < MIN_STAGE_TICKS {
            log::warn!("synth: write hold {} below {} ticks may not commit", hold, MIN_STAGE_TICKS);
        }
        for bus in write_steps(address, value, hold) {
            self.tick(&Pins::from_bus(bus));
        }
        self.tick(&Pins::default());
    }

    /// Start recording `pwm_out` from the current tick, discarding any previous capture.
    pub fn begin_capture(&mut self) {
        let mut capture = PwmCapture::new();
        capture.begin(self.cycles, self.pwm.out());
        self.capture = Some(capture);
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Stop recording and hand back what was captured.
    pub fn take_capture(&mut self) -> Option<PwmCapture> {
        self.capture.take()
    }

    #[inline]
    pub fn pwm_out(&self) -> bool {
        self.pwm.out()
    }

    /// Packed output byte; `pwm_out` on [`PWM_OUT_BIT`], all other bits 0.
    pub fn uo_out(&self) -> u8 {
        (self.pwm.out() as u8) << PWM_OUT_BIT
    }

    /// Position within the current audio sample (0..1023).
    pub fn subsample_phase(&self) -> u16 {
        self.counter.value()
    }

    pub fn register(&self, address: usize) -> u16 {
        self.registers.get(address)
    }

    /// Both registers packed as `reg1 << 16 | reg0`.
    pub fn registers_flat(&self) -> u32 {
        self.registers.registers_flat()
    }

    /// Current PWM channel 1 sample (sine).
    pub fn ch1_sample(&self) -> u8 {
        self.sine.sample()
    }

    /// Current PWM channel 2 sample (triangle).
    pub fn ch2_sample(&self) -> u8 {
        self.triangle.sample()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn counter(&self) -> &PhaseCounter {
        &self.counter
    }

    pub fn register_file(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn sine(&self) -> &SineOscillator {
        &self.sine
    }

    pub fn triangle(&self) -> &TriangleOscillator {
        &self.triangle
    }

    pub fn pwm(&self) -> &PwmMixer {
        &self.pwm
    }
}
