//! `pwm_out` edge capture and export.
//!
//! Records pin-level transitions with clock-tick timestamps while the synth
//! runs, then writes them in the formats the downstream analysis tools read:
//!
//! - **Edge log** — `time_ns,value`, one line per edge
//! - **PWL waveform** — `"<time_seconds> <voltage>"` for a circuit simulator,
//!   one line per edge, times with 9 decimals and voltages with 6
//!
//! [`PwmCapture::render_pcm`] turns the same edges into audio samples by
//! averaging the one-bit level over each output sample period, which is
//! enough to audition the result. It does not model the external
//! reconstruction filter.

use std::io::{self, Write};

use crate::CLOCK_HZ;

/// Logic-high level used for PWL export unless overridden.
pub const DEFAULT_VDD: f64 = 3.3;

/// A single `pwm_out` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmEdge {
    /// Clock tick at which the new level became visible.
    pub tick: u64,
    /// Level after the transition.
    pub level: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PwmCapture {
    edges: Vec<PwmEdge>,
    /// Level before the first recorded edge
    initial_level: bool,
    /// Current level (carried between pushes)
    level: bool,
    start_tick: u64,
    end_tick: u64,
}

impl Default for PwmCapture {
    fn default() -> Self {
        PwmCapture::new()
    }
}

impl PwmCapture {
    pub fn new() -> Self {
        PwmCapture {
            edges: Vec::with_capacity(4096),
            initial_level: false,
            level: false,
            start_tick: 0,
            end_tick: 0,
        }
    }

    /// Start a capture at `tick` with the pin currently at `level`.
    pub fn begin(&mut self, tick: u64, level: bool) {
        self.edges.clear();
        self.initial_level = level;
        self.level = level;
        self.start_tick = tick;
        self.end_tick = tick;
    }

    /// Record the pin level at `tick`. Only changes are stored.
    #[inline]
    pub fn push(&mut self, tick: u64, level: bool) {
        if level != self.level {
            self.edges.push(PwmEdge { tick, level });
            self.level = level;
        }
        self.end_tick = tick;
    }

    pub fn edges(&self) -> &[PwmEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Ticks covered by the capture.
    pub fn duration_ticks(&self) -> u64 {
        self.end_tick.saturating_sub(self.start_tick)
    }

    /// Ticks spent high between the start and end of the capture.
    pub fn high_ticks(&self) -> u64 {
        let mut level = self.initial_level;
        let mut cursor = self.start_tick;
        let mut high = 0;
        for edge in &self.edges {
            if level {
                high += edge.tick - cursor;
            }
            cursor = edge.tick;
            level = edge.level;
        }
        if level {
            high += self.end_tick.saturating_sub(cursor);
        }
        high
    }

    fn tick_to_seconds(&self, tick: u64) -> f64 {
        (tick - self.start_tick) as f64 / CLOCK_HZ as f64
    }

    /// Write the edge log (`time_ns,value`).
    pub fn write_edge_log<W: Write>(&self, mut out: W) -> io::Result<()> {
        for edge in &self.edges {
            writeln!(out, "{:.3},{}", self.tick_to_seconds(edge.tick) * 1e9, edge.level as u8)?;
        }
        out.flush()
    }

    /// Write the piecewise-linear waveform with `vdd` as the high level.
    pub fn write_pwl<W: Write>(&self, mut out: W, vdd: f64) -> io::Result<()> {
        let volts = |level: bool| if level { vdd } else { 0.0 };
        writeln!(out, "{:.9} {:.6}", 0.0, volts(self.initial_level))?;
        for edge in &self.edges {
            writeln!(out, "{:.9} {:.6}", self.tick_to_seconds(edge.tick), volts(edge.level))?;
        }
        out.flush()
    }

    /// Render mono f32 PCM at `sample_rate`, amplitude `volume`.
    ///
    /// Each output sample is the time-weighted average level over its period,
    /// mapped from duty [0, 1] to [-volume, +volume].
    pub fn render_pcm(&self, sample_rate: u32, volume: f32) -> Vec<f32> {
        let ticks = self.duration_ticks();
        if ticks == 0 || sample_rate == 0 {
            return Vec::new();
        }
        let tps = CLOCK_HZ as f64 / sample_rate as f64;
        let num_samples = (ticks as f64 / tps).floor() as usize;
        let mut out = Vec::with_capacity(num_samples);

        let start = self.start_tick as f64;
        let mut idx = 0usize;
        let mut level = self.initial_level;
        for i in 0..num_samples {
            let p_start = start + i as f64 * tps;
            let p_end = p_start + tps;
            let mut time_high = 0.0f64;
            let mut cursor = p_start;

            while idx < self.edges.len() && (self.edges[idx].tick as f64) < p_end {
                let edge_tick = self.edges[idx].tick as f64;
                if edge_tick > cursor {
                    if level {
                        time_high += edge_tick - cursor;
                    }
                    cursor = edge_tick;
                }
                level = self.edges[idx].level;
                idx += 1;
            }
            if level {
                time_high += p_end - cursor;
            }

            let duty = (time_high / tps) as f32;
            out.push(volume * (2.0 * duty - 1.0));
        }
        out
    }
}
