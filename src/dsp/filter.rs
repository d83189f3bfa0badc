//! State-variable and ladder filter cores.

/*
Two filter topologies share this module:

STATE-VARIABLE (Chamberlin). Two integrators with feedback produce lowpass,
bandpass, and highpass simultaneously from one state; notch is lp + hp.
Coefficients:

    f = 2·sin(π·cutoff/sample_rate)     integrator gain
    q = 1 - resonance                   damping

and the per-sample update, in this exact order:

    lowpass  += f·bandpass
    highpass  = input - lowpass - q·bandpass
    bandpass += f·highpass

The topology is only stable with cutoff kept below 0.45·sample_rate and
resonance below 1, so `svf_coeffs` clamps both before computing anything.
Modulation that pushes cutoff past the stable range is therefore safe by
construction.

LADDER (Moog-style). Four cascaded one-pole lowpasses with global feedback
from the last stage. Resonance maps [0, 1] onto a feedback gain of [0, 4]
(4 is the self-oscillation threshold of the topology). When drive exceeds
1.001 the input stage runs through tanh, which is what gives the ladder its
characteristic growl; below that the linear path is used and costs no
transcendental per sample.
*/

/// Cached SVF coefficient pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvfCoeffs {
    pub f: f32,
    pub q: f32,
}

/// Per-voice SVF integrator state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvfState {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
}

/// All three SVF responses for one sample.
#[derive(Debug, Clone, Copy)]
pub struct SvfOutputs {
    pub lp: f32,
    pub bp: f32,
    pub hp: f32,
}

/// Compute SVF coefficients, clamping into the stable region:
/// cutoff ∈ [20, 0.45·sample_rate], resonance ∈ [0, 0.99].
#[inline]
pub fn svf_coeffs(cutoff: f32, resonance: f32, sample_rate: f32) -> SvfCoeffs {
    let cutoff = cutoff.clamp(20.0, sample_rate * 0.45);
    let resonance = resonance.clamp(0.0, 0.99);

    SvfCoeffs {
        f: 2.0 * (std::f32::consts::PI * cutoff / sample_rate).sin(),
        q: 1.0 - resonance,
    }
}

/// One SVF step. Update order matters; see the module notes.
#[inline]
pub fn process_svf(state: &mut SvfState, input: f32, coeffs: &SvfCoeffs) -> SvfOutputs {
    state.lowpass += coeffs.f * state.bandpass;
    state.highpass = input - state.lowpass - coeffs.q * state.bandpass;
    state.bandpass += coeffs.f * state.highpass;

    SvfOutputs {
        lp: state.lowpass,
        bp: state.bandpass,
        hp: state.highpass,
    }
}

/// Per-voice 4-pole ladder state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LadderState {
    pub stages: [f32; 4],
}

/// Ladder frequency coefficient: `2·sin(π·cutoff/sample_rate)`, with the
/// same cutoff clamp as the SVF.
#[inline]
pub fn ladder_coeff(cutoff: f32, sample_rate: f32) -> f32 {
    let cutoff = cutoff.clamp(20.0, sample_rate * 0.45);
    2.0 * (std::f32::consts::PI * cutoff / sample_rate).sin()
}

/// Linear ladder step. `resonance` is the mapped feedback gain in [0, 4].
#[inline]
pub fn process_ladder(state: &mut LadderState, input: f32, coeff: f32, resonance: f32) -> f32 {
    let x = input - resonance * state.stages[3];
    ladder_stages(state, x, coeff)
}

/// Saturated ladder step: the input stage runs through tanh scaled by
/// `drive`, then the cascade proceeds linearly.
#[inline]
pub fn process_ladder_nonlinear(
    state: &mut LadderState,
    input: f32,
    coeff: f32,
    resonance: f32,
    drive: f32,
) -> f32 {
    let x = ((input - resonance * state.stages[3]) * drive).tanh();
    ladder_stages(state, x, coeff)
}

#[inline]
fn ladder_stages(state: &mut LadderState, x: f32, coeff: f32) -> f32 {
    let g = coeff / (1.0 + coeff);
    state.stages[0] += g * (x - state.stages[0]);
    state.stages[1] += g * (state.stages[0] - state.stages[1]);
    state.stages[2] += g * (state.stages[1] - state.stages[2]);
    state.stages[3] += g * (state.stages[2] - state.stages[3]);
    state.stages[3]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        buffer[buffer.len() / 4..]
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn coefficients_are_clamped() {
        let sr = 48_000.0;
        let wild = svf_coeffs(1_000_000.0, 5.0, sr);
        let edge = svf_coeffs(sr * 0.45, 0.99, sr);
        assert_eq!(wild.f, edge.f);
        assert_eq!(wild.q, edge.q);

        let low = svf_coeffs(-10.0, -1.0, sr);
        let floor = svf_coeffs(20.0, 0.0, sr);
        assert_eq!(low.f, floor.f);
        assert_eq!(low.q, floor.q);
    }

    #[test]
    fn svf_lowpass_passes_low_blocks_high() {
        let sr = 48_000.0;
        let coeffs = svf_coeffs(500.0, 0.0, sr);

        let mut state = SvfState::default();
        let low: Vec<f32> = sine(100.0, sr, 4096)
            .iter()
            .map(|&s| process_svf(&mut state, s, &coeffs).lp)
            .collect();

        let mut state = SvfState::default();
        let high: Vec<f32> = sine(8_000.0, sr, 4096)
            .iter()
            .map(|&s| process_svf(&mut state, s, &coeffs).lp)
            .collect();

        assert!(peak_after_transient(&low) > 0.9, "100 Hz should pass a 500 Hz LP");
        assert!(
            peak_after_transient(&high) < 0.05,
            "8 kHz should be strongly attenuated"
        );
    }

    #[test]
    fn svf_highpass_mirrors_lowpass() {
        let sr = 48_000.0;
        let coeffs = svf_coeffs(500.0, 0.0, sr);

        let mut state = SvfState::default();
        let low: Vec<f32> = sine(50.0, sr, 4096)
            .iter()
            .map(|&s| process_svf(&mut state, s, &coeffs).hp)
            .collect();

        let mut state = SvfState::default();
        let high: Vec<f32> = sine(8_000.0, sr, 4096)
            .iter()
            .map(|&s| process_svf(&mut state, s, &coeffs).hp)
            .collect();

        assert!(peak_after_transient(&low) < 0.05, "50 Hz should be blocked by HP");
        assert!(peak_after_transient(&high) > 0.9, "8 kHz should pass");
    }

    #[test]
    fn svf_stays_bounded_at_clamped_extremes() {
        // Cutoff far past the stable range, max resonance, full-scale
        // square input: output must stay finite and bounded (BIBO).
        let sr = 48_000.0;
        let coeffs = svf_coeffs(sr, 1.0, sr);
        let mut state = SvfState::default();
        for i in 0..48_000 {
            let input = if (i / 32) % 2 == 0 { 1.0 } else { -1.0 };
            let out = process_svf(&mut state, input, &coeffs);
            assert!(
                out.lp.is_finite() && out.lp.abs() < 100.0,
                "unstable at sample {i}: {}",
                out.lp
            );
        }
    }

    #[test]
    fn ladder_attenuates_above_cutoff() {
        let sr = 48_000.0;
        let coeff = ladder_coeff(500.0, sr);

        let mut state = LadderState::default();
        let low: Vec<f32> = sine(100.0, sr, 4096)
            .iter()
            .map(|&s| process_ladder(&mut state, s, coeff, 0.0))
            .collect();

        let mut state = LadderState::default();
        let high: Vec<f32> = sine(8_000.0, sr, 4096)
            .iter()
            .map(|&s| process_ladder(&mut state, s, coeff, 0.0))
            .collect();

        let low_peak = peak_after_transient(&low);
        let high_peak = peak_after_transient(&high);
        assert!(
            low_peak > high_peak * 20.0,
            "24 dB/oct slope expected: low {low_peak}, high {high_peak}"
        );
    }

    #[test]
    fn ladder_nonlinear_stays_bounded_under_drive() {
        let sr = 48_000.0;
        let coeff = ladder_coeff(2_000.0, sr);
        let mut state = LadderState::default();
        for (i, s) in sine(220.0, sr, 9_600).iter().enumerate() {
            let out = process_ladder_nonlinear(&mut state, s * 2.0, coeff, 3.8, 4.0);
            assert!(
                out.is_finite() && out.abs() < 10.0,
                "diverged at sample {i}: {out}"
            );
        }
    }

    #[test]
    fn resonance_boosts_cutoff_region() {
        let sr = 48_000.0;
        let coeff = ladder_coeff(1_000.0, sr);

        let run = |resonance: f32| -> f32 {
            let mut state = LadderState::default();
            let out: Vec<f32> = sine(1_000.0, sr, 9_600)
                .iter()
                .map(|&s| process_ladder(&mut state, s * 0.25, coeff, resonance))
                .collect();
            peak_after_transient(&out)
        };

        let flat = run(0.0);
        let resonant = run(3.0);
        assert!(
            resonant > flat * 1.5,
            "resonance should emphasize the cutoff: flat {flat}, resonant {resonant}"
        );
    }
}
