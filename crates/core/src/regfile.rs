//! Frequency register file and its multi-phase write protocol.
//!
//! Two 16-bit registers are written one byte at a time over a slow,
//! asynchronous bus (`address[3:0]`, `phase`, `enable`, `data[7:0]`). `phase`
//! and `enable` are synchronized first (see [`Synchronizer`]); `address` and
//! `data` are sampled raw, which is safe because the protocol requires them to
//! be stable around every control edge.
//!
//! ## Protocol
//!
//! ```text
//! stage  phase enable data   effect (after synchronization)
//!   1      1     0    high   -
//!   2      1     1    high   enable rising with phase=1: stage high byte
//!   3      1     1    low    -
//!   4      0     1    low    phase falling with enable=1: commit
//!   5      0     0    low    enable falling: transaction closed
//! ```
//!
//! Every stage must be held for at least [`MIN_STAGE_TICKS`] ticks. Any other
//! edge ordering leaves the registers untouched. A commit to an address of 2
//! or more is dropped silently.

use serde::{Deserialize, Serialize};

use crate::sync::Synchronizer;

/// Number of addressable registers; higher addresses are valid on the wire but ignored.
pub const REGISTER_COUNT: usize = 2;
/// Shortest stage hold that is reliably observed through the synchronizers.
pub const MIN_STAGE_TICKS: u32 = 3;

/// Raw write-bus levels for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteBus {
    pub enable: bool,
    pub phase: bool,
    /// 4-bit register address (upper bits ignored)
    pub address: u8,
    /// High or low register byte, selected by `phase`
    pub data: u8,
}

/// Progress of the single in-flight write transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteStage {
    /// No transaction; waiting for `enable` to rise while `phase` is high.
    #[default]
    Idle,
    /// High byte captured; waiting for `phase` to fall.
    HighStaged { address: u8, high: u8 },
    /// Committed (or dropped); waiting for `enable` to fall.
    AwaitRelease,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    registers: [u16; REGISTER_COUNT],
    enable_sync: Synchronizer,
    phase_sync: Synchronizer,
    /// Synchronized levels from the previous tick, for edge detection
    enable_prev: bool,
    phase_prev: bool,
    stage: WriteStage,
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile {
            registers: [0; REGISTER_COUNT],
            enable_sync: Synchronizer::new(),
            phase_sync: Synchronizer::new(),
            enable_prev: false,
            phase_prev: false,
            stage: WriteStage::Idle,
        }
    }

    pub fn reset(&mut self) {
        if self.stage != WriteStage::Idle {
            log::debug!("regfile: reset discards {:?}", self.stage);
        }
        *self = RegisterFile::new();
    }

    /// Register contents. Out-of-range addresses read as 0.
    pub fn get(&self, address: usize) -> u16 {
        self.registers.get(address).copied().unwrap_or(0)
    }

    /// Both registers packed as `reg1 << 16 | reg0`.
    pub fn registers_flat(&self) -> u32 {
        ((self.registers[1] as u32) << 16) | self.registers[0] as u32
    }

    pub fn stage(&self) -> WriteStage {
        self.stage
    }

    /// Register file state after one tick with `bus` on the pins.
    pub fn next(&self, bus: &WriteBus) -> Self {
        let enable = self.enable_sync.output();
        let phase = self.phase_sync.output();
        let enable_rose = enable && !self.enable_prev;
        let phase_fell = !phase && self.phase_prev;

        let mut registers = self.registers;
        let stage = match self.stage {
            WriteStage::Idle => {
                if enable_rose && phase {
                    let address = bus.address & 0x0F;
                    log::trace!("regfile: staged high byte {:#04x} for address {}", bus.data, address);
                    WriteStage::HighStaged { address, high: bus.data }
                } else {
                    WriteStage::Idle
                }
            }
            WriteStage::HighStaged { address, high } => {
                if !enable {
                    log::debug!("regfile: enable dropped before commit, address {} aborted", address);
                    WriteStage::Idle
                } else if phase_fell {
                    let value = ((high as u16) << 8) | bus.data as u16;
                    match registers.get_mut(address as usize) {
                        Some(reg) => {
                            *reg = value;
                            log::debug!("regfile: reg[{}] = {:#06x}", address, value);
                        }
                        None => log::debug!("regfile: write to address {} dropped", address),
                    }
                    WriteStage::AwaitRelease
                } else {
                    self.stage
                }
            }
            WriteStage::AwaitRelease => {
                if enable { WriteStage::AwaitRelease } else { WriteStage::Idle }
            }
        };

        RegisterFile {
            registers,
            enable_sync: self.enable_sync.next(bus.enable),
            phase_sync: self.phase_sync.next(bus.phase),
            enable_prev: enable,
            phase_prev: phase,
            stage,
        }
    }

    /// Advance in place (standalone use).
    pub fn tick(&mut self, bus: &WriteBus) {
        *self = self.next(bus);
    }
}

/// Pin sequence for one complete register write, each stage held `hold` ticks.
///
/// The bus is left at the stage-5 levels on the last item; callers return it
/// to idle ([`WriteBus::default`]) afterwards. `hold` below
/// [`MIN_STAGE_TICKS`] is produced as asked but will not reliably commit.
pub fn write_steps(address: u8, value: u16, hold: u32) -> impl Iterator<Item = WriteBus> {
    let high = (value >> 8) as u8;
    let low = value as u8;
    let stages = [
        WriteBus { enable: false, phase: true, address, data: high },
        WriteBus { enable: true, phase: true, address, data: high },
        WriteBus { enable: true, phase: true, address, data: low },
        WriteBus { enable: true, phase: false, address, data: low },
        WriteBus { enable: false, phase: false, address, data: low },
    ];
    stages.into_iter().flat_map(move |bus| std::iter::repeat(bus).take(hold as usize))
}
