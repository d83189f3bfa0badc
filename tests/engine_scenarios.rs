//! End-to-end engine scenarios: rendered audio checked against closed-form
//! expectations.

use polywave::dsp::wavetable::WavetableBank;
use polywave::io::events::{NoteEvent, ParamEvent};
use polywave::synth::params::ParamId;
use polywave::{Engine, EngineHandles, MAX_BLOCK_SIZE, MAX_VOICES};

const SAMPLE_RATE: f32 = 48_000.0;

/// Engine with a sine bank on osc1 only, instant full-level envelope, all
/// filters off, unity gains everywhere they matter for measurement.
fn measurement_engine() -> (Engine, EngineHandles) {
    let (mut engine, handles) = Engine::new(SAMPLE_RATE);
    engine
        .load_bank(WavetableBank::sine("sine").unwrap())
        .unwrap();
    let bank = engine.bank("sine");
    engine.osc1.set_bank(bank);
    engine.osc2.enabled = false;
    engine.osc3.enabled = false;
    engine.sub.enabled = false;

    engine.amp_env.set_attack_ms(0.0).unwrap();
    engine.amp_env.set_decay_ms(0.0).unwrap();
    engine.amp_env.set_sustain_level(1.0).unwrap();
    engine.amp_env.set_release_ms(0.0).unwrap();

    engine.master_gain = 1.0;
    (engine, handles)
}

fn render(engine: &mut Engine, frames: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; frames];
    for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
        engine.process_block(&mut [chunk]);
    }
    out
}

/// Frequency from interpolated positive-going zero crossings.
fn measure_frequency(samples: &[f32], sample_rate: f32) -> f32 {
    let mut crossings = Vec::new();
    for i in 1..samples.len() {
        let (a, b) = (samples[i - 1], samples[i]);
        if a < 0.0 && b >= 0.0 {
            // Linear interpolation of the crossing instant.
            let frac = -a / (b - a);
            crossings.push((i - 1) as f32 + frac);
        }
    }
    assert!(crossings.len() >= 2, "not enough zero crossings to measure");
    let cycles = (crossings.len() - 1) as f32;
    let span = crossings.last().unwrap() - crossings.first().unwrap();
    cycles * sample_rate / span
}

#[test]
fn pure_tone_matches_closed_form_sine() {
    let (mut engine, mut handles) = measurement_engine();
    engine.osc1.mix_level = 0.5;

    assert!(handles.notes.push(NoteEvent::note_on(69, 100)));
    let out = render(&mut engine, 48_000);

    for (i, &got) in out.iter().enumerate() {
        let expected = 0.5 * (std::f32::consts::TAU * 440.0 * i as f32 / SAMPLE_RATE).sin();
        assert!(
            (got - expected).abs() < 0.01,
            "sample {i}: got {got}, expected {expected}"
        );
    }
}

#[test]
fn pool_overflow_steals_the_oldest_note() {
    let (mut engine, mut handles) = measurement_engine();

    // One more note-on than the pool holds, no note-offs.
    let notes: Vec<u8> = (0..=MAX_VOICES as u8).map(|i| 60 + 2 * i).collect();
    for &note in &notes {
        handles.notes.push(NoteEvent::note_on(note, 100));
        let _ = render(&mut engine, 64);
    }

    let active = engine.voices().active_notes();
    assert_eq!(active.len(), MAX_VOICES, "exactly MAX_VOICES voices active");
    assert!(
        !active.contains(&notes[0]),
        "oldest note {} should have been stolen, active: {active:?}",
        notes[0]
    );
    for &note in &notes[1..] {
        assert!(active.contains(&note), "note {note} missing, active: {active:?}");
    }
}

#[test]
fn retrigger_while_releasing_restarts_one_voice() {
    let (mut engine, mut handles) = measurement_engine();
    engine.amp_env.set_decay_ms(50.0).unwrap();
    engine.amp_env.set_sustain_level(0.5).unwrap();
    engine.amp_env.set_release_ms(500.0).unwrap();

    handles.notes.push(NoteEvent::note_on(60, 100));
    render(&mut engine, 512);
    handles.notes.push(NoteEvent::note_off(60));
    render(&mut engine, 512); // mid-release, far from idle

    handles.notes.push(NoteEvent::note_on(60, 100));
    render(&mut engine, 64);

    assert_eq!(
        engine.voices().active_count(),
        1,
        "re-striking a releasing note must not allocate a second voice"
    );
    let v = (0..MAX_VOICES)
        .find(|&v| engine.voices().is_active(v))
        .unwrap();
    assert_eq!(engine.voices().note(v), 60);
    assert!(
        !engine.voices().is_releasing(v),
        "the voice is held again after retrigger"
    );
}

#[test]
fn master_gain_zero_silences_everything() {
    let (mut engine, mut handles) = measurement_engine();

    handles
        .params
        .push(ParamEvent::new(ParamId::MasterGain.raw(), 0.0));
    handles.notes.push(NoteEvent::note_on(69, 127));

    let out = render(&mut engine, 4096);
    assert!(
        out.iter().all(|&s| s.abs() < 1e-6),
        "param published before the note must silence it"
    );
}

#[test]
fn pitch_bend_shifts_by_two_semitones() {
    let (mut engine, mut handles) = measurement_engine();
    engine.osc1.mix_level = 1.0;

    // Full-up bend: normalized 1.0 denormalizes to +2 semitones.
    handles
        .params
        .push(ParamEvent::new(ParamId::PitchBend.raw(), 1.0));
    handles.notes.push(NoteEvent::note_on(69, 100));

    let out = render(&mut engine, 48_000);
    let freq = measure_frequency(&out, SAMPLE_RATE);
    let expected = 440.0 * 2.0_f32.powf(2.0 / 12.0); // ≈ 493.88 Hz
    assert!(
        (freq - expected).abs() < 0.5,
        "measured {freq} Hz, expected {expected} Hz"
    );
}

#[test]
fn bend_centered_leaves_pitch_alone() {
    let (mut engine, mut handles) = measurement_engine();

    handles
        .params
        .push(ParamEvent::new(ParamId::PitchBend.raw(), 0.5));
    handles.notes.push(NoteEvent::note_on(69, 100));

    let out = render(&mut engine, 48_000);
    let freq = measure_frequency(&out, SAMPLE_RATE);
    assert!((freq - 440.0).abs() < 0.5, "measured {freq} Hz, expected 440 Hz");
}

#[test]
fn released_notes_decay_to_silence() {
    let (mut engine, mut handles) = measurement_engine();
    engine.amp_env.set_release_ms(20.0).unwrap();

    handles.notes.push(NoteEvent::note_on(64, 100));
    let during = render(&mut engine, 4096);
    let peak_during = during.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));

    handles.notes.push(NoteEvent::note_off(64));
    render(&mut engine, 4096);
    let after = render(&mut engine, 1024);
    let peak_after = after.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));

    assert!(peak_during > 0.5, "note should be audible, peak {peak_during}");
    assert_eq!(peak_after, 0.0, "fully released voice renders exact silence");
    assert_eq!(engine.voices().active_count(), 0);
}
