//! Play the synth live from the computer keyboard.
//!
//! The home row is a chromatic scale from E4 (`a w s e d f t g y h u j k o
//! l p`), `z`/`x` shift octaves, ESC quits. Audio goes to the default
//! output device through cpal; key input is read raw through crossterm.
//! Pressing a new key releases the previous note (typewriter legato).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossterm::event::{Event, KeyCode, KeyEventKind};

use polywave::dsp::wavetable::WavetableBank;
use polywave::io::events::NoteEvent;
use polywave::io::keys::{KeyAction, KeyboardMap};
use polywave::synth::mod_matrix::{ModDest, ModSrc};
use polywave::synth::oscillator::OscConfig;
use polywave::{Engine, MAX_BLOCK_SIZE};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| color_eyre::eyre::eyre!("no default output device"))?;
    let config = device.default_output_config()?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(color_eyre::eyre::eyre!("demo supports only f32 output"));
    }

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    // Both move into the audio closure, which owns and mutates them there.
    let (engine, mut handles) = build_patch(sample_rate)?;
    let buffer = vec![0.0f32; MAX_BLOCK_SIZE];
    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut written = 0;

            while written < total_frames {
                let frames = (total_frames - written).min(MAX_BLOCK_SIZE);
                let block = &mut buffer[..frames];
                engine.process_block(&mut [block]);

                let base = written * channels;
                for (i, &sample) in buffer[..frames].iter().enumerate() {
                    for ch in 0..channels {
                        data[base + i * channels + ch] = sample;
                    }
                }
                written += frames;
            }
        },
        move |err| tracing::error!("stream error: {err}"),
        None,
    )?;
    stream.play()?;

    println!("polywave: a..p play, z/x octave, ESC quits");

    crossterm::terminal::enable_raw_mode()?;
    let result = key_loop(&mut handles.notes);
    crossterm::terminal::disable_raw_mode()?;
    result
}

fn key_loop(notes: &mut polywave::io::queue::Producer<NoteEvent>) -> color_eyre::Result<()> {
    let mut map = KeyboardMap::new();
    let mut sounding: Option<u8> = None;

    loop {
        let Event::Key(key) = crossterm::event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Esc => {
                if let Some(note) = sounding.take() {
                    notes.push(NoteEvent::note_off(note));
                }
                return Ok(());
            }
            KeyCode::Char(c) => match map.handle_key(c) {
                KeyAction::Note(note) => {
                    if let Some(previous) = sounding.replace(note) {
                        notes.push(NoteEvent::note_off(previous));
                    }
                    if !notes.push(NoteEvent::note_on(note, 100)) {
                        tracing::warn!("note queue full, dropped note {note}");
                    }
                }
                KeyAction::OctaveChanged(shift) => {
                    print!("octave {shift:+}\r\n");
                }
                KeyAction::Unmapped => {}
            },
            _ => {}
        }
    }
}

fn build_patch(sample_rate: f32) -> color_eyre::Result<(Engine, polywave::EngineHandles)> {
    let (mut engine, handles) = Engine::new(sample_rate);

    engine.load_bank(WavetableBank::saw("saw")?)?;
    engine.load_bank(WavetableBank::square("square")?)?;

    let saw = engine.bank("saw");
    engine.osc1.update_config(&OscConfig {
        bank: saw.clone(),
        mix_level: 0.4,
        enabled: true,
        ..OscConfig::default()
    });

    let square = engine.bank("square");
    engine.osc2.update_config(&OscConfig {
        bank: square,
        mix_level: 0.25,
        detune_cents: 6.0,
        enabled: true,
        ..OscConfig::default()
    });

    engine.osc3.enabled = false;

    engine.sub.set_bank(saw);
    engine.sub.mix_level = 0.3;

    engine.amp_env.set_attack_ms(5.0)?;
    engine.amp_env.set_decay_ms(150.0)?;
    engine.amp_env.set_sustain_level(0.7)?;
    engine.amp_env.set_release_ms(250.0)?;

    engine.svf.enabled = true;
    engine.svf.cutoff = 2_500.0;
    engine.svf.resonance = 0.3;
    engine.svf.update_coefficients(sample_rate);

    engine.lfo1.rate_hz = 0.4;
    engine.mod_matrix.add_route(ModSrc::Lfo1, ModDest::FilterCutoff, 1.0);
    engine.mod_matrix.add_route(ModSrc::Velocity, ModDest::AmpLevel, 0.4);

    Ok((engine, handles))
}
