//! pwm-synth: drive the synthesis core through its pins, export what comes
//! out of `pwm_out`, and optionally listen to it.

mod args;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use log::info;

use pwm_synth_core::oscillator::{increment_to_freq, semitone_sweep};
use pwm_synth_core::phase::PHASE_PERIOD;
use pwm_synth_core::{freq_to_increment, savestate, PwmCapture, Synth, SAMPLE_RATE_HZ};

const DEFAULT_SINE_HZ: f64 = 440.0;
const DEFAULT_TRIANGLE_HZ: f64 = 220.0;
/// Three octaves, inclusive.
const SWEEP_STEPS: usize = 37;
const AUDIO_VOLUME: f32 = 0.25;

fn program(synth: &mut Synth, address: u8, hz: f64, hold: u32) {
    let inc = freq_to_increment(hz);
    synth.write_register(address, inc, hold);
    log::debug!("reg[{}] <- {} ({:.2} Hz requested, {:.2} Hz actual)",
        address, inc, hz, increment_to_freq(inc));
}

/// Split `samples` into `steps` equal runs; the last one also takes the remainder.
fn step_lengths(samples: u64, steps: usize) -> Vec<u64> {
    if steps == 0 {
        return Vec::new();
    }
    let per_step = samples / steps as u64;
    let mut lengths = vec![per_step; steps];
    lengths[steps - 1] += samples % steps as u64;
    lengths
}

fn write_capture<F>(path: &Path, what: &str, write: F) -> anyhow::Result<()>
where
    F: FnOnce(BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write(BufWriter::new(file))
        .with_context(|| format!("failed to write {} to {}", what, path.display()))?;
    info!("Wrote {} to {}", what, path.display());
    Ok(())
}

fn play(capture: &PwmCapture, sample_rate: u32) -> anyhow::Result<()> {
    let mut pcm = capture.render_pcm(sample_rate, AUDIO_VOLUME);
    if pcm.is_empty() {
        info!("Nothing to play");
        return Ok(());
    }
    // The one-bit output is never negative; drop its DC level
    let mean = pcm.iter().sum::<f32>() / pcm.len() as f32;
    pcm.iter_mut().for_each(|s| *s -= mean);

    let (_stream, handle) = rodio::OutputStream::try_default()
        .context("no audio output device")?;
    let sink = rodio::Sink::try_new(&handle)
        .context("failed to open audio sink")?;
    info!("Playing {:.2} s at {} Hz", pcm.len() as f64 / sample_rate as f64, sample_rate);
    sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, pcm));
    sink.sleep_until_end();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = args::parse();

    let (mut synth, defaults) = match &args.load_state {
        Some(path) => {
            let synth = savestate::load_from_file(path)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("failed to load state from {}", path.display()))?;
            info!("Resumed from {} at cycle {}", path.display(), synth.cycles());
            (synth, None)
        }
        None => (Synth::new(), Some((DEFAULT_SINE_HZ, DEFAULT_TRIANGLE_HZ))),
    };
    let sine_hz = args.sine_hz.or(defaults.map(|d| d.0));
    let triangle_hz = args.triangle_hz.or(defaults.map(|d| d.1));

    let samples = (args.seconds.max(0.0) * SAMPLE_RATE_HZ as f64).round() as u64;
    info!("Running {} samples ({:.3} s), sine {:?} Hz, triangle {:?} Hz{}",
        samples, args.seconds, sine_hz, triangle_hz, if args.sweep { ", sweep" } else { "" });

    synth.begin_capture();
    if args.sweep {
        let sines = semitone_sweep(sine_hz.unwrap_or(DEFAULT_SINE_HZ), SWEEP_STEPS);
        let triangles = semitone_sweep(triangle_hz.unwrap_or(DEFAULT_TRIANGLE_HZ), SWEEP_STEPS);
        let lengths = step_lengths(samples, SWEEP_STEPS);
        for ((sine, triangle), step) in sines.into_iter().zip(triangles).zip(lengths) {
            program(&mut synth, 0, sine, args.hold);
            program(&mut synth, 1, triangle, args.hold);
            synth.idle(step * PHASE_PERIOD as u64);
        }
    } else {
        if let Some(hz) = sine_hz {
            program(&mut synth, 0, hz, args.hold);
        }
        if let Some(hz) = triangle_hz {
            program(&mut synth, 1, hz, args.hold);
        }
        synth.idle(samples * PHASE_PERIOD as u64);
    }
    let capture = synth.take_capture()
        .ok_or_else(|| anyhow::anyhow!("capture was not running"))?;

    let ticks = capture.duration_ticks();
    let duty = if ticks == 0 { 0.0 } else { capture.high_ticks() as f64 / ticks as f64 };
    info!("Captured {} edges over {} ticks, average duty {:.4}", capture.len(), ticks, duty);

    if let Some(path) = &args.edges {
        write_capture(path, "edge log", |w| capture.write_edge_log(w))?;
    }
    if let Some(path) = &args.pwl {
        write_capture(path, "PWL waveform", |w| capture.write_pwl(w, args.vdd))?;
    }
    if let Some(path) = &args.save_state {
        savestate::save_to_file(&synth, path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("failed to save state to {}", path.display()))?;
        info!("Saved state to {}", path.display());
    }
    if args.play {
        play(&capture, args.sample_rate)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lengths_cover_duration() {
        for samples in [0u64, 36, 37, 28_160, 28_196, 140_800] {
            let lengths = step_lengths(samples, SWEEP_STEPS);
            assert_eq!(lengths.len(), SWEEP_STEPS);
            assert_eq!(lengths.iter().sum::<u64>(), samples, "samples {}", samples);
            assert!(lengths[..SWEEP_STEPS - 1].iter().all(|&n| n == samples / SWEEP_STEPS as u64));
        }
    }

    #[test]
    fn test_step_lengths_remainder_goes_last() {
        // 1 s at 28.16 kHz leaves 3 samples over after 37 steps
        let lengths = step_lengths(28_160, SWEEP_STEPS);
        assert_eq!(lengths[0], 761);
        assert_eq!(lengths[SWEEP_STEPS - 1], 764);
        assert!(step_lengths(100, 0).is_empty());
    }
}
