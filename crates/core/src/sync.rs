//! Double-flop synchronizer for the asynchronous write-control lines.
//!
//! `enable` and `phase` come from outside the core's clock discipline, so each
//! passes through a fixed-depth shift register before the write state machine
//! looks at it. The output is the input as it was [`SYNC_STAGES`] ticks ago.

use serde::{Deserialize, Serialize};

/// Delay-buffer depth per signal.
pub const SYNC_STAGES: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synchronizer {
    stages: [bool; SYNC_STAGES],
}

impl Synchronizer {
    pub fn new() -> Self {
        Synchronizer { stages: [false; SYNC_STAGES] }
    }

    /// Synchronized level seen by the rest of the core.
    #[inline]
    pub fn output(&self) -> bool {
        self.stages[SYNC_STAGES - 1]
    }

    /// Shift `input` into the first stage.
    pub fn next(&self, input: bool) -> Self {
        let mut stages = [input; SYNC_STAGES];
        stages[1..].copy_from_slice(&self.stages[..SYNC_STAGES - 1]);
        Synchronizer { stages }
    }

    pub fn tick(&mut self, input: bool) {
        *self = self.next(input);
    }
}
