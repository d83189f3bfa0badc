//! The engine: owns every synthesis component and renders audio blocks.

/*
One `process_block` call, start to finish:

  1. DRAIN      Pop everything pending from the param queue, then the note
                queue (bounded by the queue capacity, so the drain can never
                spin). Parameter writes go through the binding table and
                recompute cached filter coefficients / envelope sample
                counts as needed. Note events drive the voice pool.
  2. MOD BLOCK  Sample every modulation source per voice (envelope levels,
                LFO block-start values, wheel/velocity/key-track/pressure)
                and roll the matrix: new targets, per-sample steps.
  3. RENDER     For each active voice, run the per-sample chain:

                   osc1 → osc2 → osc3 → sub  (FM taps earlier outputs)
                     └──────── sum ────────┘
                              + noise
                              → SVF → ladder
                              × amplitude envelope × AmpLevel mod

                and accumulate into the mono scratch buffer. Oscillator
                pitch, FM depth, filter cutoff/resonance, scan position,
                and amplitude all read the matrix's per-sample
                interpolated values.
  4. OUTPUT     Scratch × master gain, broadcast to every output channel.

The realtime rules hold throughout: no allocation (scratch and every
per-voice array are fixed-size engine fields), no locking (queues are
lock-free SPSC), no I/O, no panics. A disabled oscillator or missing
bank contributes silence, out-of-range modulation clamps.
*/

use std::sync::Arc;

use crate::dsp::envelope::AdsrParams;
use crate::dsp::math::{fast_exp2, semitones_to_ratio};
use crate::dsp::noise::{NoiseOscillator, NoiseType};
use crate::dsp::phase::to_fixed_phase_offset;
use crate::dsp::wavetable::{BankRegistry, WavetableBank};
use crate::error::SynthError;
use crate::io::events::{NoteEvent, NoteEventKind, ParamEvent};
use crate::io::queue::{event_queue, Consumer, Producer, QUEUE_SIZE};
use crate::synth::filters::{FilterMod, LadderFilterBank, SvFilterBank, SvfMode};
use crate::synth::lfo::{Lfo, LfoShape};
use crate::synth::mod_matrix::{ModDest, ModMatrix, ModSourceValues, ModSrc};
use crate::synth::oscillator::{FmSource, WavetableOscillator};
use crate::synth::params::ParamId;
use crate::synth::voice::VoicePool;
use crate::{MAX_BLOCK_SIZE, MAX_VOICES};

/// Producer halves of the engine's event queues. Hand these to the input
/// thread; the engine keeps the consumer halves.
pub struct EngineHandles {
    pub notes: Producer<NoteEvent>,
    pub params: Producer<ParamEvent>,
}

pub struct Engine {
    sample_rate: f32,

    pub osc1: WavetableOscillator,
    pub osc2: WavetableOscillator,
    pub osc3: WavetableOscillator,
    pub sub: WavetableOscillator,
    pub noise: NoiseOscillator,

    pub amp_env: AdsrParams,
    pub mod_env: AdsrParams,

    pub svf: SvFilterBank,
    pub ladder: LadderFilterBank,

    pub lfo1: Lfo,
    pub lfo2: Lfo,

    pub mod_matrix: ModMatrix,

    pool: VoicePool,
    registry: BankRegistry,

    pub master_gain: f32,
    mod_wheel: f32,
    aftertouch: f32,
    pitch_bend_semitones: f32,

    mod_sources: ModSourceValues,
    scratch: [f32; MAX_BLOCK_SIZE],

    note_rx: Consumer<NoteEvent>,
    param_rx: Consumer<ParamEvent>,
}

impl Engine {
    /// Create an engine and the producer handles for its event queues.
    pub fn new(sample_rate: f32) -> (Self, EngineHandles) {
        let (note_tx, note_rx) = event_queue();
        let (param_tx, param_rx) = event_queue();

        let mut engine = Self {
            sample_rate,
            osc1: WavetableOscillator::new(),
            osc2: WavetableOscillator::new(),
            osc3: WavetableOscillator::new(),
            sub: WavetableOscillator::new(),
            noise: NoiseOscillator::new(),
            amp_env: AdsrParams::new(sample_rate),
            mod_env: AdsrParams::new(sample_rate),
            svf: SvFilterBank::new(sample_rate),
            ladder: LadderFilterBank::new(sample_rate),
            lfo1: Lfo::new(LfoShape::Sine, 1.0),
            lfo2: Lfo::new(LfoShape::Sine, 1.0),
            mod_matrix: ModMatrix::new(),
            pool: VoicePool::new(),
            registry: BankRegistry::new(),
            master_gain: 0.8,
            mod_wheel: 0.0,
            aftertouch: 0.0,
            pitch_bend_semitones: 0.0,
            mod_sources: ModSourceValues::new(),
            scratch: [0.0; MAX_BLOCK_SIZE],
            note_rx,
            param_rx,
        };

        // Sub slot defaults an octave below the played note; the SubOctave
        // parameter overrides it.
        engine.sub.octave_offset = -1;

        (
            engine,
            EngineHandles {
                notes: note_tx,
                params: param_tx,
            },
        )
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Register a bank with the engine's registry. Setup thread only.
    pub fn load_bank(&mut self, bank: WavetableBank) -> Result<(), SynthError> {
        self.registry.register(Arc::new(bank))
    }

    /// Look up a registered bank by name.
    pub fn bank(&self, name: &str) -> Option<Arc<WavetableBank>> {
        self.registry.get(name)
    }

    pub fn voices(&self) -> &VoicePool {
        &self.pool
    }

    /// Render one block into deinterleaved channel buffers. The mono mix
    /// is broadcast to every channel. Frames beyond [`MAX_BLOCK_SIZE`] are
    /// not rendered; callers split oversized driver buffers.
    pub fn process_block(&mut self, outputs: &mut [&mut [f32]]) {
        let frames = match outputs.iter().map(|ch| ch.len()).min() {
            Some(f) => f.min(MAX_BLOCK_SIZE),
            None => return,
        };
        debug_assert!(
            outputs.iter().all(|ch| ch.len() <= MAX_BLOCK_SIZE),
            "block of {} frames exceeds MAX_BLOCK_SIZE {}",
            outputs.iter().map(|ch| ch.len()).max().unwrap_or(0),
            MAX_BLOCK_SIZE
        );
        if frames == 0 {
            return;
        }

        self.drain_events();
        self.begin_mod_block(frames);
        self.render_voices(frames);

        for sample in &mut self.scratch[..frames] {
            *sample *= self.master_gain;
        }
        for channel in outputs.iter_mut() {
            channel[..frames].copy_from_slice(&self.scratch[..frames]);
        }
    }

    /// Apply one note event immediately (bypassing the queue). Intended
    /// for offline rendering and tests; realtime input goes through the
    /// queue handles.
    pub fn apply_note_event(&mut self, event: NoteEvent) {
        match event.kind {
            NoteEventKind::NoteOn => self.note_on(event.note, event.velocity),
            NoteEventKind::NoteOff => self.pool.note_off(event.note),
        }
    }

    /// Apply one parameter event immediately. See [`Self::apply_note_event`].
    pub fn apply_param_event(&mut self, event: ParamEvent) {
        if let Some(id) = ParamId::from_raw(event.id) {
            self.set_param(id, event.value);
        }
    }

    fn drain_events(&mut self) {
        // Parameters first: a param published before a note-on must take
        // effect on that note. Bounded by the ring capacity.
        for _ in 0..QUEUE_SIZE {
            match self.param_rx.pop() {
                Some(event) => self.apply_param_event(event),
                None => break,
            }
        }
        for _ in 0..QUEUE_SIZE {
            match self.note_rx.pop() {
                Some(event) => self.apply_note_event(event),
                None => break,
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let Some(assignment) = self.pool.note_on(note, velocity) else {
            return;
        };
        let v = assignment.voice;

        self.osc1.init_voice(v, note, self.sample_rate);
        self.osc2.init_voice(v, note, self.sample_rate);
        self.osc3.init_voice(v, note, self.sample_rate);
        self.sub.init_voice(v, note, self.sample_rate);

        self.svf.init_voice(v);
        self.ladder.init_voice(v);
    }

    fn begin_mod_block(&mut self, frames: usize) {
        let lfo1 = self.lfo1.value();
        let lfo2 = self.lfo2.value();

        for v in 0..MAX_VOICES {
            if !self.pool.is_active(v) {
                continue;
            }
            self.mod_sources.set(ModSrc::Lfo1, v, lfo1);
            self.mod_sources.set(ModSrc::Lfo2, v, lfo2);
            self.mod_sources.set(ModSrc::Env1, v, self.pool.amp_env[v].level());
            self.mod_sources.set(ModSrc::Env2, v, self.pool.mod_env[v].level());
            self.mod_sources.set(ModSrc::ModWheel, v, self.mod_wheel);
            self.mod_sources
                .set(ModSrc::Velocity, v, self.pool.velocity(v) as f32 / 127.0);
            self.mod_sources
                .set(ModSrc::KeyTrack, v, (self.pool.note(v) as f32 - 60.0) / 12.0);
            self.mod_sources.set(ModSrc::Aftertouch, v, self.aftertouch);
        }

        self.mod_matrix.begin_block(&self.mod_sources, frames);
        self.lfo1.advance_block(frames, self.sample_rate);
        self.lfo2.advance_block(frames, self.sample_rate);
    }

    fn render_voices(&mut self, frames: usize) {
        self.scratch[..frames].fill(0.0);

        for v in 0..MAX_VOICES {
            if !self.pool.is_active(v) {
                continue;
            }
            self.render_voice(v, frames);
            if self.pool.amp_env[v].is_done() {
                self.pool.free_voice(v);
            }
        }
    }

    /// Pre-mix sample of an FM source oscillator. Sources earlier in the
    /// osc1 → osc2 → osc3 → sub order contribute their current sample;
    /// sources at or after the reader contribute the previous one.
    #[inline]
    fn fm_source_raw(&self, source: FmSource, voice: usize) -> f32 {
        match source {
            FmSource::None => 0.0,
            FmSource::Osc1 => self.osc1.raw_output(voice),
            FmSource::Osc2 => self.osc2.raw_output(voice),
            FmSource::Osc3 => self.osc3.raw_output(voice),
            FmSource::Sub => self.sub.raw_output(voice),
        }
    }

    fn render_voice(&mut self, v: usize, frames: usize) {
        let bend = self.pitch_bend_semitones;

        for i in 0..frames {
            let scan = self.mod_matrix.value(ModDest::ScanPosition, v, i);

            let o1 = {
                let pitch = self.mod_matrix.value(ModDest::Osc1Pitch, v, i) + bend;
                let fm = self.osc1.fm_depth + self.mod_matrix.value(ModDest::Osc1Fm, v, i);
                let offset = to_fixed_phase_offset(fm * self.fm_source_raw(self.osc1.fm_source, v));
                self.osc1.next_sample(v, semitones_to_ratio(pitch), scan, offset)
            };

            let o2 = {
                let pitch = self.mod_matrix.value(ModDest::Osc2Pitch, v, i) + bend;
                let fm = self.osc2.fm_depth + self.mod_matrix.value(ModDest::Osc2Fm, v, i);
                let offset = to_fixed_phase_offset(fm * self.fm_source_raw(self.osc2.fm_source, v));
                self.osc2.next_sample(v, semitones_to_ratio(pitch), scan, offset)
            };

            let o3 = {
                let pitch = self.mod_matrix.value(ModDest::Osc3Pitch, v, i) + bend;
                let fm = self.osc3.fm_depth + self.mod_matrix.value(ModDest::Osc3Fm, v, i);
                let offset = to_fixed_phase_offset(fm * self.fm_source_raw(self.osc3.fm_source, v));
                self.osc3.next_sample(v, semitones_to_ratio(pitch), scan, offset)
            };

            let os = {
                let pitch = self.mod_matrix.value(ModDest::SubPitch, v, i) + bend;
                let offset = to_fixed_phase_offset(
                    self.sub.fm_depth * self.fm_source_raw(self.sub.fm_source, v),
                );
                self.sub.next_sample(v, semitones_to_ratio(pitch), scan, offset)
            };

            let mixed = o1 + o2 + o3 + os + self.noise.process();

            let cutoff_octaves = self.mod_matrix.value(ModDest::FilterCutoff, v, i);
            let resonance_offset = self.mod_matrix.value(ModDest::FilterResonance, v, i);
            let modulated = cutoff_octaves != 0.0 || resonance_offset != 0.0;

            let svf_mod = modulated.then(|| FilterMod {
                cutoff_hz: effective_cutoff(self.svf.cutoff, cutoff_octaves),
                resonance: self.svf.resonance + resonance_offset,
            });
            let filtered = self.svf.process(v, mixed, svf_mod, self.sample_rate);

            let ladder_mod = modulated.then(|| FilterMod {
                cutoff_hz: effective_cutoff(self.ladder.cutoff, cutoff_octaves),
                resonance: self.ladder.resonance + resonance_offset,
            });
            let filtered = self.ladder.process(v, filtered, ladder_mod, self.sample_rate);

            let amplitude = self.pool.amp_env[v].next_sample(&self.amp_env);
            self.pool.mod_env[v].next_sample(&self.mod_env);

            let amp_mod = (1.0 + self.mod_matrix.value(ModDest::AmpLevel, v, i)).max(0.0);

            self.scratch[i] += filtered * amplitude * amp_mod;
        }
    }

    /// Write one denormalized parameter through the binding table.
    pub fn set_param(&mut self, id: ParamId, normalized: f32) {
        let value = id.spec().denormalize(normalized);
        let as_bool = value >= 0.5;
        let as_i8 = value.round() as i8;
        let as_choice = value.round() as usize;

        match id {
            ParamId::Osc1Scan => self.osc1.scan_position = value,
            ParamId::Osc1Mix => self.osc1.mix_level = value,
            ParamId::Osc1Detune => self.osc1.detune_cents = value,
            ParamId::Osc1Octave => self.osc1.octave_offset = as_i8,
            ParamId::Osc1FmDepth => self.osc1.fm_depth = value,
            ParamId::Osc1Enabled => self.osc1.enabled = as_bool,

            ParamId::Osc2Scan => self.osc2.scan_position = value,
            ParamId::Osc2Mix => self.osc2.mix_level = value,
            ParamId::Osc2Detune => self.osc2.detune_cents = value,
            ParamId::Osc2Octave => self.osc2.octave_offset = as_i8,
            ParamId::Osc2FmDepth => self.osc2.fm_depth = value,
            ParamId::Osc2Enabled => self.osc2.enabled = as_bool,

            ParamId::Osc3Scan => self.osc3.scan_position = value,
            ParamId::Osc3Mix => self.osc3.mix_level = value,
            ParamId::Osc3Detune => self.osc3.detune_cents = value,
            ParamId::Osc3Octave => self.osc3.octave_offset = as_i8,
            ParamId::Osc3FmDepth => self.osc3.fm_depth = value,
            ParamId::Osc3Enabled => self.osc3.enabled = as_bool,

            ParamId::SubScan => self.sub.scan_position = value,
            ParamId::SubMix => self.sub.mix_level = value,
            ParamId::SubDetune => self.sub.detune_cents = value,
            ParamId::SubOctave => self.sub.octave_offset = as_i8,
            ParamId::SubEnabled => self.sub.enabled = as_bool,

            ParamId::NoiseMix => self.noise.mix_level = value,
            ParamId::NoiseType => {
                self.noise.noise_type = if as_choice == 0 {
                    NoiseType::White
                } else {
                    NoiseType::Pink
                }
            }
            ParamId::NoiseEnabled => self.noise.enabled = as_bool,

            // Envelope setters cannot fail here: denormalized values are
            // already inside the validated ranges.
            ParamId::AmpAttack => {
                let _ = self.amp_env.set_attack_ms(value);
            }
            ParamId::AmpDecay => {
                let _ = self.amp_env.set_decay_ms(value);
            }
            ParamId::AmpSustain => {
                let _ = self.amp_env.set_sustain_level(value);
            }
            ParamId::AmpRelease => {
                let _ = self.amp_env.set_release_ms(value);
            }
            ParamId::ModAttack => {
                let _ = self.mod_env.set_attack_ms(value);
            }
            ParamId::ModDecay => {
                let _ = self.mod_env.set_decay_ms(value);
            }
            ParamId::ModSustain => {
                let _ = self.mod_env.set_sustain_level(value);
            }
            ParamId::ModRelease => {
                let _ = self.mod_env.set_release_ms(value);
            }

            ParamId::SvfCutoff => {
                self.svf.cutoff = value;
                self.svf.update_coefficients(self.sample_rate);
            }
            ParamId::SvfResonance => {
                self.svf.resonance = value;
                self.svf.update_coefficients(self.sample_rate);
            }
            ParamId::SvfMode => {
                self.svf.mode = match as_choice {
                    0 => SvfMode::Lowpass,
                    1 => SvfMode::Highpass,
                    2 => SvfMode::Bandpass,
                    _ => SvfMode::Notch,
                }
            }
            ParamId::SvfEnabled => self.svf.enabled = as_bool,

            ParamId::LadderCutoff => {
                self.ladder.cutoff = value;
                self.ladder.update_coefficients(self.sample_rate);
            }
            ParamId::LadderResonance => self.ladder.resonance = value,
            ParamId::LadderDrive => self.ladder.drive = value,
            ParamId::LadderEnabled => self.ladder.enabled = as_bool,

            ParamId::Lfo1Rate => self.lfo1.rate_hz = value,
            ParamId::Lfo1Shape => self.lfo1.shape = lfo_shape(as_choice),
            ParamId::Lfo2Rate => self.lfo2.rate_hz = value,
            ParamId::Lfo2Shape => self.lfo2.shape = lfo_shape(as_choice),

            ParamId::ModWheel => self.mod_wheel = value,
            ParamId::Aftertouch => self.aftertouch = value,
            ParamId::PitchBend => self.pitch_bend_semitones = value,

            ParamId::MasterGain => self.master_gain = value,
        }
    }
}

/// Cutoff modulated in octaves: `base · 2^octaves`. The filter cores clamp
/// the result into their stable range.
#[inline]
fn effective_cutoff(base: f32, octaves: f32) -> f32 {
    base * fast_exp2(octaves)
}

fn lfo_shape(choice: usize) -> LfoShape {
    match choice {
        0 => LfoShape::Sine,
        1 => LfoShape::Triangle,
        2 => LfoShape::Saw,
        _ => LfoShape::Square,
    }
}
