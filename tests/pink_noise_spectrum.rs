//! Spectral-slope check for the pink noise source: power should fall by
//! ~3 dB per octave across the audible band.

use rustfft::{num_complex::Complex, FftPlanner};

use polywave::io::events::NoteEvent;
use polywave::{Engine, MAX_BLOCK_SIZE};

const SAMPLE_RATE: f32 = 48_000.0;
const WINDOW: usize = 8192;
const WINDOWS: usize = 8;

/// Welch-style averaged power spectrum: Hann-windowed, non-overlapping.
fn averaged_power_spectrum(samples: &[f32]) -> Vec<f32> {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(WINDOW);

    let hann: Vec<f32> = (0..WINDOW)
        .map(|n| {
            let x = std::f32::consts::TAU * n as f32 / WINDOW as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect();

    let mut power = vec![0.0f32; WINDOW / 2];
    for w in 0..WINDOWS {
        let segment = &samples[w * WINDOW..(w + 1) * WINDOW];
        let mut buffer: Vec<Complex<f32>> = segment
            .iter()
            .zip(&hann)
            .map(|(&s, &h)| Complex::new(s * h, 0.0))
            .collect();
        fft.process(&mut buffer);

        for (bin, value) in buffer[..WINDOW / 2].iter().enumerate() {
            power[bin] += value.norm_sqr();
        }
    }
    for p in &mut power {
        *p /= WINDOWS as f32;
    }
    power
}

/// Mean power inside a frequency band.
fn band_power(power: &[f32], lo_hz: f32, hi_hz: f32) -> f32 {
    let bin_hz = SAMPLE_RATE / WINDOW as f32;
    let lo = (lo_hz / bin_hz).round() as usize;
    let hi = ((hi_hz / bin_hz).round() as usize).min(power.len() - 1);
    let band = &power[lo..=hi];
    band.iter().sum::<f32>() / band.len() as f32
}

#[test]
fn pink_noise_falls_three_db_per_octave() {
    let (mut engine, mut handles) = Engine::new(SAMPLE_RATE);
    // Noise only: every wavetable slot silent.
    engine.osc1.enabled = false;
    engine.osc2.enabled = false;
    engine.osc3.enabled = false;
    engine.sub.enabled = false;
    engine.noise.enabled = true;
    engine.noise.mix_level = 1.0;
    engine.noise.noise_type = polywave::dsp::noise::NoiseType::Pink;

    engine.amp_env.set_attack_ms(0.0).unwrap();
    engine.amp_env.set_decay_ms(0.0).unwrap();
    engine.amp_env.set_sustain_level(1.0).unwrap();
    engine.master_gain = 1.0;

    handles.notes.push(NoteEvent::note_on(60, 100));

    let total = WINDOW * WINDOWS; // > 1 second at 48 kHz
    let mut out = vec![0.0f32; total];
    for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
        engine.process_block(&mut [chunk]);
    }

    let power = averaged_power_spectrum(&out);

    // Octave bands covering [100 Hz, 10 kHz]: per-octave average powers,
    // then a least-squares slope in dB per octave.
    let edges = [100.0, 200.0, 400.0, 800.0, 1_600.0, 3_200.0, 6_400.0, 10_000.0];
    let db: Vec<f32> = edges
        .windows(2)
        .map(|e| 10.0 * band_power(&power, e[0], e[1]).log10())
        .collect();

    // x in octaves relative to the first band.
    let n = db.len() as f32;
    let mean_x = (0..db.len()).map(|i| i as f32).sum::<f32>() / n;
    let mean_y = db.iter().sum::<f32>() / n;
    let slope = (0..db.len())
        .map(|i| (i as f32 - mean_x) * (db[i] - mean_y))
        .sum::<f32>()
        / (0..db.len()).map(|i| (i as f32 - mean_x).powi(2)).sum::<f32>();

    assert!(
        (slope + 3.0).abs() < 1.5,
        "pink slope should be ≈ -3 dB/octave, measured {slope} dB/octave (bands {db:?})"
    );
}
