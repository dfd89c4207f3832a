use std::path::PathBuf;

pub struct Args {
    /// Register 0 tone; `None` keeps a loaded state's register
    pub sine_hz: Option<f64>,
    /// Register 1 tone; `None` keeps a loaded state's register
    pub triangle_hz: Option<f64>,
    pub seconds: f64,
    pub hold: u32,
    pub sweep: bool,
    pub edges: Option<PathBuf>,
    pub pwl: Option<PathBuf>,
    pub vdd: f64,
    pub save_state: Option<PathBuf>,
    pub load_state: Option<PathBuf>,
    pub play: bool,
    pub sample_rate: u32,
}

impl Args {
    fn parser() -> impl meap::Parser<Item = Self> {
        meap::let_map! {
            let {
                sine_hz = opt_opt::<f64, _>("HZ", "sine-hz")
                    .desc("sine channel frequency (default 440)");
                triangle_hz = opt_opt::<f64, _>("HZ", "triangle-hz")
                    .desc("triangle channel frequency (default 220)");
                seconds = opt_opt::<f64, _>("FLOAT", "seconds")
                    .name('s')
                    .with_default(1.0);
                hold = opt_opt::<u32, _>("INT", "hold")
                    .desc("ticks each register write stage is held")
                    .with_default(5);
                sweep = flag("sweep")
                    .desc("step both channels up a chromatic scale");
                edges = opt_opt::<PathBuf, _>("PATH", "edges")
                    .desc("write the pwm_out edge log (time_ns,value)");
                pwl = opt_opt::<PathBuf, _>("PATH", "pwl")
                    .desc("write a piecewise-linear waveform for circuit simulation");
                vdd = opt_opt::<f64, _>("VOLTS", "vdd")
                    .with_default(pwm_synth_core::capture::DEFAULT_VDD);
                save_state = opt_opt::<PathBuf, _>("PATH", "save-state");
                load_state = opt_opt::<PathBuf, _>("PATH", "load-state");
                play = flag("play")
                    .name('p')
                    .desc("audition the output on the default audio device");
                sample_rate = opt_opt::<u32, _>("INT", "sample-rate")
                    .with_default(48_000);
            } in {
                Self {
                    sine_hz,
                    triangle_hz,
                    seconds,
                    hold,
                    sweep,
                    edges,
                    pwl,
                    vdd,
                    save_state,
                    load_state,
                    play,
                    sample_rate,
                }
            }
        }
    }
}

pub fn parse() -> Args {
    use meap::Parser;
    Args::parser().with_help_default().parse_env_or_exit()
}
