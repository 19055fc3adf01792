use std::f64::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};

use fif_viewer::data::fiff::write::write_raw;
use fif_viewer::data::model::{
    Annotation, Annotations, ChannelInfo, ChannelKind, MeasDate, MeasInfo, RawSegment,
};
use fif_viewer::session::SEGMENT_PATH;

const SFREQ: f64 = 100.0;
const DURATION: f64 = 60.0;
const FIRST_SAMP: i64 = 1500;
const VOLTS: i32 = 107;

const EEG_NAMES: [&str; 8] = ["Fp1", "Fp2", "F3", "F4", "C3", "C4", "O1", "O2"];
const BAD_CHANNEL: &str = "C4";

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }
}

/// Background EEG: leaky-integrated noise plus a 10 Hz alpha rhythm, in volts.
fn eeg_trace(n: usize, alpha_amp: f64, rng: &mut SimpleRng) -> Vec<f64> {
    let phase = rng.next_f64() * 2.0 * PI;
    let mut drift = 0.0;
    (0..n)
        .map(|i| {
            let t = i as f64 / SFREQ;
            drift = 0.95 * drift + rng.gauss(0.0, 3e-6);
            drift + alpha_amp * (2.0 * PI * 10.0 * t + phase).sin() + rng.gauss(0.0, 2e-6)
        })
        .collect()
}

/// Blink shape: a smooth bump lasting `width` seconds.
fn blink(t: f64, onset: f64, width: f64) -> f64 {
    let x = (t - onset) / width;
    if (0.0..=1.0).contains(&x) {
        (PI * x).sin().powi(2)
    } else {
        0.0
    }
}

fn channel(name: &str, kind: ChannelKind) -> ChannelInfo {
    ChannelInfo {
        name: name.to_string(),
        kind,
        cal: 1.0,
        unit: VOLTS,
        bad: name == BAD_CHANNEL,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);
    let n = (SFREQ * DURATION) as usize;

    // Blink onsets every 3-7 s
    let mut blinks = Vec::new();
    let mut t = 2.0;
    while t < DURATION - 1.0 {
        blinks.push(t);
        t += 3.0 + 4.0 * rng.next_f64();
    }
    let blink_width = 0.3;
    let blink_wave: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / SFREQ;
            blinks.iter().map(|&onset| blink(t, onset, blink_width)).sum()
        })
        .collect();

    let mut channels = Vec::new();
    let mut data = Vec::new();
    for (k, name) in EEG_NAMES.iter().enumerate() {
        let alpha = if name.starts_with('O') { 15e-6 } else { 4e-6 };
        let mut trace = eeg_trace(n, alpha, &mut rng);
        // Frontal electrodes pick up the blinks
        let leak = if name.starts_with("Fp") { 60e-6 } else { 5e-6 / (k as f64 + 1.0) };
        for (v, b) in trace.iter_mut().zip(&blink_wave) {
            *v += leak * b;
        }
        if *name == BAD_CHANNEL {
            for v in trace.iter_mut() {
                *v = *v * 8.0 + rng.gauss(0.0, 40e-6);
            }
        }
        channels.push(channel(name, ChannelKind::Eeg));
        data.push(trace);
    }

    let eog_v: Vec<f64> = blink_wave
        .iter()
        .map(|b| 250e-6 * b + rng.gauss(0.0, 8e-6))
        .collect();
    let eog_h: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / SFREQ;
            // slow saccades
            40e-6 * (2.0 * PI * 0.15 * t).sin().signum() + rng.gauss(0.0, 8e-6)
        })
        .collect();
    channels.push(channel("EOG-V", ChannelKind::Eog));
    data.push(eog_v);
    channels.push(channel("EOG-H", ChannelKind::Eog));
    data.push(eog_h);

    let mut annotations: Vec<Annotation> = blinks
        .iter()
        .map(|&onset| Annotation {
            onset,
            duration: blink_width,
            description: "blink".to_string(),
        })
        .collect();
    annotations.push(Annotation {
        onset: 41.0,
        duration: 2.5,
        description: "BAD_segment".to_string(),
    });

    let segment = RawSegment {
        info: MeasInfo {
            channels,
            sfreq: SFREQ,
            meas_date: Some(MeasDate {
                secs: 1_700_000_000,
                usecs: 0,
            }),
            highpass: Some(0.1),
            lowpass: Some(40.0),
            line_freq: Some(50.0),
            bads: vec![BAD_CHANNEL.to_string()],
        },
        first_samp: FIRST_SAMP,
        data,
        annotations: Annotations::new(annotations),
    };

    let path = Path::new(SEGMENT_PATH);
    write_raw(path, &segment).with_context(|| format!("writing {}", path.display()))?;

    println!(
        "Wrote {} channels x {} samples with {} annotations ({} blinks) to {}",
        segment.n_channels(),
        segment.n_times(),
        segment.annotations.len(),
        blinks.len(),
        path.display()
    );
    Ok(())
}
