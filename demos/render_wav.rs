//! Render a short phrase offline and write it to a WAV file.
//!
//! Usage: cargo run --example render_wav [output.wav]
//!
//! Renders a bass line through the full chain (morphing wavetable, sub
//! oscillator, ladder filter swept by LFO) sample-accurately, block by
//! block, with note events applied at their scheduled frame.

use polywave::dsp::math::note_name_to_midi;
use polywave::dsp::wavetable::WavetableBank;
use polywave::io::events::NoteEvent;
use polywave::synth::mod_matrix::{ModDest, ModSrc};
use polywave::{Engine, MAX_BLOCK_SIZE};

const SAMPLE_RATE: f32 = 48_000.0;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "polywave.wav".into());

    let mut engine = build_patch()?;

    // (note name, start beat, length in beats) at 110 BPM.
    let phrase = [
        ("A1", 0.0, 0.75),
        ("A2", 1.0, 0.4),
        ("G1", 2.0, 0.75),
        ("E2", 3.0, 0.4),
        ("A1", 4.0, 1.5),
        ("C2", 6.0, 0.75),
        ("D2", 7.0, 0.75),
    ];
    let samples_per_beat = (60.0 / 110.0 * SAMPLE_RATE) as usize;
    let total_samples = samples_per_beat * 9;

    // Flatten to (frame, event), sorted by frame.
    let mut events: Vec<(usize, NoteEvent)> = Vec::new();
    for &(name, start, length) in &phrase {
        let note = note_name_to_midi(name)
            .ok_or_else(|| color_eyre::eyre::eyre!("bad note name {name}"))?;
        let on = (start * samples_per_beat as f32) as usize;
        let off = ((start + length) * samples_per_beat as f32) as usize;
        events.push((on, NoteEvent::note_on(note, 110)));
        events.push((off, NoteEvent::note_off(note)));
    }
    events.sort_by_key(|&(frame, _)| frame);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;

    let mut buffer = [0.0f32; MAX_BLOCK_SIZE];
    let mut next_event = 0;
    let mut rendered = 0;

    while rendered < total_samples {
        // Apply everything scheduled at or before this block's start.
        while next_event < events.len() && events[next_event].0 <= rendered {
            engine.apply_note_event(events[next_event].1);
            next_event += 1;
        }

        // Render up to the next event boundary (or a full block).
        let horizon = events
            .get(next_event)
            .map(|&(frame, _)| frame)
            .unwrap_or(total_samples);
        let frames = (horizon - rendered).clamp(1, MAX_BLOCK_SIZE).min(total_samples - rendered);

        let block = &mut buffer[..frames];
        engine.process_block(&mut [block]);
        for &sample in buffer[..frames].iter() {
            writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
        }
        rendered += frames;
    }

    writer.finalize()?;
    println!(
        "wrote {} ({:.2}s at {} Hz)",
        path,
        total_samples as f32 / SAMPLE_RATE,
        SAMPLE_RATE as u32
    );
    Ok(())
}

fn build_patch() -> color_eyre::Result<Engine> {
    let (mut engine, _handles) = Engine::new(SAMPLE_RATE);

    engine.load_bank(WavetableBank::morph("morph")?)?;
    engine.load_bank(WavetableBank::sine("sine")?)?;

    let morph = engine.bank("morph");
    engine.osc1.set_bank(morph.clone());
    engine.osc1.mix_level = 0.5;
    engine.osc1.scan_position = 0.6;

    engine.osc2.set_bank(morph);
    engine.osc2.mix_level = 0.3;
    engine.osc2.detune_cents = 9.0;
    engine.osc2.scan_position = 0.8;

    engine.osc3.enabled = false;

    let sine = engine.bank("sine");
    engine.sub.set_bank(sine);
    engine.sub.mix_level = 0.5;

    engine.amp_env.set_attack_ms(3.0)?;
    engine.amp_env.set_decay_ms(120.0)?;
    engine.amp_env.set_sustain_level(0.6)?;
    engine.amp_env.set_release_ms(180.0)?;

    engine.ladder.enabled = true;
    engine.ladder.cutoff = 900.0;
    engine.ladder.resonance = 0.45;
    engine.ladder.drive = 1.8;
    engine.ladder.update_coefficients(SAMPLE_RATE);

    engine.lfo1.rate_hz = 0.25;
    engine.mod_matrix.add_route(ModSrc::Lfo1, ModDest::FilterCutoff, 1.2);
    engine.mod_matrix.add_route(ModSrc::Lfo2, ModDest::ScanPosition, 0.3);
    engine.lfo2.rate_hz = 2.0;

    engine.master_gain = 0.8;
    Ok(engine)
}
