//! Generative audio driven by interaction energy.
//!
//! [`SoundManager`] turns the per-frame interaction energy into sparse notes
//! on a pentatonic scale. Notes are rate limited three ways: a voice cap, a
//! minimum spacing between onsets, and a probability that grows with energy
//! but never reaches certainty.
//!
//! The audio graph is pull based. Whatever drives the sound device calls
//! [`SoundManager::render`], and the graph's clock advances with the samples
//! it produces. Until [`SoundManager::initialize`] runs, or while the graph is
//! suspended, notes are silently dropped. The host must keep calling `render`,
//! even while muted, or note spacing and voice release never progress.
//!
//! ```ignore
//! let mut sound = SoundManager::new(AudioSettings::default())?;
//! sound.initialize();
//!
//! // Once per frame
//! sound.notify_energy(energy);
//!
//! // In the device callback
//! sound.render(&mut buffer);
//! ```

mod reverb;
mod schedule;
mod voice;

pub use reverb::{decaying_noise_ir, ConvolutionReverb};
pub use schedule::{ReleaseSchedule, VoiceId};
pub use voice::{Envelope, NoteSpec, Voice, Waveform, ATTACK_SECONDS, FLOOR, PEAK};

use crate::error::ConfigError;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Bright scale: C major pentatonic, C4 to A5.
pub const BRIGHT_SCALE: [f32; 10] = [
    261.63, 293.66, 329.63, 392.00, 440.00, 523.25, 587.33, 659.25, 783.99, 880.00,
];

/// Dark scale: A minor pentatonic, A2 to G4.
pub const DARK_SCALE: [f32; 10] = [
    110.00, 130.81, 146.83, 164.81, 196.00, 220.00, 261.63, 293.66, 329.63, 392.00,
];

/// Energy-to-probability slope.
const PROBABILITY_PER_ENERGY: f32 = 0.005;
/// Upper bound on the chance of a note per call.
const MAX_PROBABILITY: f32 = 0.5;
const DRY_LEVEL: f32 = 1.0;

/// Synthesizer settings, fixed for the life of a [`SoundManager`].
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSettings {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum simultaneously sounding notes.
    pub max_voices: usize,
    /// Minimum seconds between note onsets.
    pub note_density: f32,
    /// Master gain when unmuted.
    pub master_gain: f32,
    /// Time constant of the mute/unmute ramp, in seconds.
    pub mute_time_constant: f32,
    /// Length of the reverb impulse response, in seconds.
    pub reverb_seconds: f32,
    /// Level of the reverberant path relative to the dry path.
    pub reverb_mix: f32,
    /// Reverb partition size in samples.
    pub reverb_block: usize,
    /// Seed for note selection and the impulse response. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            max_voices: 8,
            note_density: 0.15,
            master_gain: 0.3,
            mute_time_constant: 0.1,
            reverb_seconds: 2.0,
            reverb_mix: 0.4,
            reverb_block: 512,
            seed: None,
        }
    }
}

impl AudioSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_voices == 0 {
            return Err(ConfigError::ZeroVoices);
        }
        let params = [
            ("note_density", self.note_density),
            ("master_gain", self.master_gain),
            ("mute_time_constant", self.mute_time_constant),
            ("reverb_seconds", self.reverb_seconds),
            ("reverb_mix", self.reverb_mix),
        ];
        for (name, value) in params {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
            if value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        Ok(())
    }
}

/// Timbre for the current scale mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timbre {
    pub waveform: Waveform,
    /// Decay in seconds.
    pub decay: f32,
    pub detune_cents: f32,
}

impl Timbre {
    pub fn for_mode(inverted: bool) -> Self {
        if inverted {
            Self { waveform: Waveform::Triangle, decay: 4.0, detune_cents: 12.0 }
        } else {
            Self { waveform: Waveform::Sine, decay: 2.5, detune_cents: 5.0 }
        }
    }
}

/// Lifecycle state of the audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    /// No graph exists yet.
    Uninitialized,
    /// Rendering and accepting notes.
    Running,
    /// Graph exists but the clock is stopped and notes are dropped.
    Suspended,
}

/// A note that was started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub voice: VoiceId,
    pub spec: NoteSpec,
    /// Audio time of the onset, in seconds.
    pub started_at: f64,
}

/// The live synthesis graph: voices, release queue, reverb and master gain.
struct AudioGraph {
    sample_rate: f32,
    clock: u64,
    voices: Vec<Voice>,
    releases: ReleaseSchedule,
    next_voice: VoiceId,
    last_onset: Option<u64>,
    reverb: ConvolutionReverb,
    reverb_mix: f32,
    gain: f32,
    gain_target: f32,
    gain_alpha: f32,
}

impl AudioGraph {
    fn new(settings: &AudioSettings, gain: f32, rng: &mut SmallRng) -> Self {
        let ir_len = (settings.reverb_seconds * settings.sample_rate).round() as usize;
        let ir = decaying_noise_ir(ir_len, rng);
        Self {
            sample_rate: settings.sample_rate,
            clock: 0,
            voices: Vec::with_capacity(settings.max_voices),
            releases: ReleaseSchedule::new(),
            next_voice: 0,
            last_onset: None,
            reverb: ConvolutionReverb::new(&ir, settings.reverb_block),
            reverb_mix: settings.reverb_mix,
            gain,
            gain_target: gain,
            gain_alpha: smoothing_alpha(1.0 / settings.sample_rate, settings.mute_time_constant),
        }
    }

    fn now(&self) -> f64 {
        self.clock as f64 / self.sample_rate as f64
    }

    fn release_due(&mut self) {
        while let Some(id) = self.releases.pop_due(self.clock) {
            self.voices.retain(|v| v.id() != id);
        }
    }

    fn start_voice(&mut self, spec: NoteSpec) -> VoiceId {
        let id = self.next_voice;
        self.next_voice += 1;
        let voice = Voice::new(id, &spec, self.sample_rate);
        self.releases.schedule(self.clock + voice.length(), id);
        self.voices.push(voice);
        self.last_onset = Some(self.clock);
        id
    }

    fn render(&mut self, out: &mut [f32]) {
        for sample in out {
            self.release_due();
            let dry: f32 = self.voices.iter_mut().map(|v| v.next_sample()).sum();
            let wet = self.reverb.process_sample(dry);
            self.gain += (self.gain_target - self.gain) * self.gain_alpha;
            *sample = (dry * DRY_LEVEL + wet * self.reverb_mix) * self.gain;
            self.clock += 1;
        }
    }

    fn cancel_all(&mut self) {
        self.releases.cancel_all();
        self.voices.clear();
        self.reverb.reset();
    }
}

enum Engine {
    Uninitialized,
    Running(AudioGraph),
    Suspended(AudioGraph),
}

/// Energy-driven note generator.
///
/// Audio time only moves inside [`render`](Self::render). Keep pulling
/// samples, even while muted, so rate limiting and voice release progress.
pub struct SoundManager {
    settings: AudioSettings,
    engine: Engine,
    rng: SmallRng,
    inverted: bool,
    muted: bool,
    notes_played: u64,
}

impl SoundManager {
    /// Create a manager. No audio graph is built until [`initialize`](Self::initialize).
    pub fn new(settings: AudioSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Ok(Self {
            settings,
            engine: Engine::Uninitialized,
            rng,
            inverted: false,
            muted: false,
            notes_played: 0,
        })
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Build the audio graph. Calling again while a graph exists does nothing.
    pub fn initialize(&mut self) {
        if !matches!(self.engine, Engine::Uninitialized) {
            return;
        }
        let gain = self.target_gain();
        self.engine = Engine::Running(AudioGraph::new(&self.settings, gain, &mut self.rng));
        log::info!(
            "audio initialized at {} Hz, {} voices",
            self.settings.sample_rate,
            self.settings.max_voices
        );
    }

    pub fn state(&self) -> AudioState {
        match self.engine {
            Engine::Uninitialized => AudioState::Uninitialized,
            Engine::Running(_) => AudioState::Running,
            Engine::Suspended(_) => AudioState::Suspended,
        }
    }

    /// Stop the audio clock. Notes are dropped until [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        self.engine = match std::mem::replace(&mut self.engine, Engine::Uninitialized) {
            Engine::Running(graph) => Engine::Suspended(graph),
            other => other,
        };
    }

    pub fn resume(&mut self) {
        self.engine = match std::mem::replace(&mut self.engine, Engine::Uninitialized) {
            Engine::Suspended(graph) => Engine::Running(graph),
            other => other,
        };
    }

    /// Tear down the graph, cancelling every scheduled release.
    pub fn close(&mut self) {
        if let Engine::Running(graph) | Engine::Suspended(graph) = &mut self.engine {
            graph.cancel_all();
        }
        self.engine = Engine::Uninitialized;
    }

    /// Switch between the bright and dark scale.
    pub fn set_scale_mode(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Ramp the master gain to silence or back to its nominal level.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        let target = self.target_gain();
        if let Some(graph) = self.graph_mut() {
            graph.gain_target = target;
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Current master gain, mid-ramp values included.
    pub fn master_gain(&self) -> f32 {
        match &self.engine {
            Engine::Running(graph) | Engine::Suspended(graph) => graph.gain,
            Engine::Uninitialized => 0.0,
        }
    }

    /// Scale for the current mode.
    pub fn scale(&self) -> &'static [f32; 10] {
        if self.inverted {
            &DARK_SCALE
        } else {
            &BRIGHT_SCALE
        }
    }

    /// Number of notes currently sounding.
    pub fn active_voices(&self) -> usize {
        match &self.engine {
            Engine::Running(graph) | Engine::Suspended(graph) => graph.voices.len(),
            Engine::Uninitialized => 0,
        }
    }

    /// Number of releases still waiting to fire.
    pub fn pending_releases(&self) -> usize {
        match &self.engine {
            Engine::Running(graph) | Engine::Suspended(graph) => graph.releases.len(),
            Engine::Uninitialized => 0,
        }
    }

    /// Audio time in seconds. Zero before initialization.
    pub fn now(&self) -> f64 {
        match &self.engine {
            Engine::Running(graph) | Engine::Suspended(graph) => graph.now(),
            Engine::Uninitialized => 0.0,
        }
    }

    /// Total notes started since construction.
    pub fn notes_played(&self) -> u64 {
        self.notes_played
    }

    /// Offer this frame's interaction energy. May start one note.
    ///
    /// Returns the started note, or `None` if the graph isn't running, the
    /// voice cap is reached, the last onset is too recent, or the probability
    /// roll fails.
    pub fn notify_energy(&mut self, energy: f32) -> Option<NoteEvent> {
        let max_voices = self.settings.max_voices;
        let density = (self.settings.note_density * self.settings.sample_rate) as u64;

        let Engine::Running(graph) = &mut self.engine else {
            log::debug!("audio not running, dropping energy {:.1}", energy);
            return None;
        };

        graph.release_due();
        if graph.voices.len() >= max_voices {
            return None;
        }
        if let Some(last) = graph.last_onset {
            if graph.clock.saturating_sub(last) < density {
                return None;
            }
        }

        if energy.is_nan() || energy <= 0.0 {
            return None;
        }
        let probability = (energy * PROBABILITY_PER_ENERGY).min(MAX_PROBABILITY);
        if self.rng.gen::<f32>() >= probability {
            return None;
        }

        let scale = if self.inverted { &DARK_SCALE } else { &BRIGHT_SCALE };
        let frequency = scale[self.rng.gen_range(0..scale.len())];
        let timbre = Timbre::for_mode(self.inverted);
        let spec = NoteSpec {
            frequency,
            waveform: timbre.waveform,
            decay: timbre.decay,
            detune_cents: timbre.detune_cents,
        };

        let started_at = graph.now();
        let voice = graph.start_voice(spec);
        self.notes_played += 1;
        log::debug!(
            "note {:.2} Hz at {:.3}s ({} voices)",
            frequency,
            started_at,
            graph.voices.len()
        );

        Some(NoteEvent { voice, spec, started_at })
    }

    /// Fill `out` with mono samples. Silent unless running.
    pub fn render(&mut self, out: &mut [f32]) {
        match &mut self.engine {
            Engine::Running(graph) => graph.render(out),
            _ => out.fill(0.0),
        }
    }

    fn target_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.settings.master_gain
        }
    }

    fn graph_mut(&mut self) -> Option<&mut AudioGraph> {
        match &mut self.engine {
            Engine::Running(graph) | Engine::Suspended(graph) => Some(graph),
            Engine::Uninitialized => None,
        }
    }
}

/// Per-sample coefficient for a one-pole approach with time constant `tau_sec`.
fn smoothing_alpha(dt: f32, tau_sec: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 1.0;
    }
    if !tau_sec.is_finite() || tau_sec <= 0.0 {
        return 1.0;
    }
    let alpha = 1.0 - (-dt / tau_sec).exp();
    if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> AudioSettings {
        AudioSettings {
            sample_rate: 8000.0,
            reverb_seconds: 0.25,
            reverb_block: 128,
            seed: Some(99),
            ..Default::default()
        }
    }

    fn running(settings: AudioSettings) -> SoundManager {
        let mut sound = SoundManager::new(settings).unwrap();
        sound.initialize();
        sound
    }

    fn render_seconds(sound: &mut SoundManager, seconds: f32) -> Vec<f32> {
        let len = (seconds * sound.settings().sample_rate).ceil() as usize;
        let mut buf = vec![0.0; len];
        sound.render(&mut buf);
        buf
    }

    /// Keep offering high energy, spaced past the density limit, until a note starts.
    fn force_note(sound: &mut SoundManager) -> NoteEvent {
        let spacing = sound.settings().note_density + 0.01;
        for _ in 0..200 {
            if let Some(note) = sound.notify_energy(1e6) {
                return note;
            }
            render_seconds(sound, spacing);
        }
        panic!("no note started");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = AudioSettings { sample_rate: 0.0, ..Default::default() };
        assert!(matches!(SoundManager::new(bad), Err(ConfigError::InvalidSampleRate(_))));

        let bad = AudioSettings { max_voices: 0, ..Default::default() };
        assert!(matches!(SoundManager::new(bad), Err(ConfigError::ZeroVoices)));

        let bad = AudioSettings { note_density: -1.0, ..Default::default() };
        assert!(matches!(SoundManager::new(bad), Err(ConfigError::Negative { .. })));
    }

    #[test]
    fn test_uninitialized_is_silent() {
        let mut sound = SoundManager::new(test_settings()).unwrap();
        assert_eq!(sound.state(), AudioState::Uninitialized);
        for _ in 0..100 {
            assert!(sound.notify_energy(1e6).is_none());
        }
        let out = render_seconds(&mut sound, 0.1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(sound.now(), 0.0);
    }

    #[test]
    fn test_initialize_idempotent() {
        let mut sound = running(test_settings());
        force_note(&mut sound);
        let now = sound.now();

        sound.initialize();

        assert_eq!(sound.state(), AudioState::Running);
        assert_eq!(sound.active_voices(), 1);
        assert_eq!(sound.now(), now);
    }

    #[test]
    fn test_suspended_drops_notes() {
        let mut sound = running(test_settings());
        sound.suspend();
        assert_eq!(sound.state(), AudioState::Suspended);
        for _ in 0..100 {
            assert!(sound.notify_energy(1e6).is_none());
        }
        let out = render_seconds(&mut sound, 0.1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(sound.now(), 0.0);

        sound.resume();
        assert_eq!(sound.state(), AudioState::Running);
        force_note(&mut sound);
    }

    #[test]
    fn test_density_limits_rapid_calls() {
        let mut sound = running(test_settings());
        force_note(&mut sound);
        let played = sound.notes_played();

        // No audio time passes between these calls.
        for _ in 0..500 {
            assert!(sound.notify_energy(1e6).is_none());
        }
        assert_eq!(sound.notes_played(), played);

        // Just short of the spacing is still too soon.
        let too_soon = sound.settings().note_density * 0.9;
        render_seconds(&mut sound, too_soon);
        for _ in 0..500 {
            assert!(sound.notify_energy(1e6).is_none());
        }
    }

    #[test]
    fn test_voice_cap() {
        let settings = AudioSettings { note_density: 0.01, ..test_settings() };
        let mut sound = running(settings);
        let mut max_seen = 0;

        for _ in 0..300 {
            sound.notify_energy(1e6);
            max_seen = max_seen.max(sound.active_voices());
            assert!(sound.active_voices() <= 8);
            render_seconds(&mut sound, 0.02);
        }

        assert_eq!(max_seen, 8);
    }

    #[test]
    fn test_zero_energy_never_plays() {
        let mut sound = running(test_settings());
        for _ in 0..200 {
            assert!(sound.notify_energy(0.0).is_none());
            assert!(sound.notify_energy(-5.0).is_none());
            assert!(sound.notify_energy(f32::NAN).is_none());
            render_seconds(&mut sound, 0.2);
        }
    }

    #[test]
    fn test_voice_released_after_tail() {
        let mut sound = running(test_settings());
        let note = force_note(&mut sound);
        assert_eq!(sound.active_voices(), 1);
        assert_eq!(sound.pending_releases(), 1);

        render_seconds(&mut sound, ATTACK_SECONDS + note.spec.decay - 0.1);
        assert_eq!(sound.active_voices(), 1);

        render_seconds(&mut sound, 0.2);
        assert_eq!(sound.active_voices(), 0);
        assert_eq!(sound.pending_releases(), 0);
    }

    #[test]
    fn test_muted_release_waits_for_render() {
        let mut sound = running(test_settings());
        let note = force_note(&mut sound);
        sound.set_muted(true);
        let before = sound.now();

        // Without render the clock is frozen, so nothing is released.
        for _ in 0..1000 {
            sound.notify_energy(0.0);
        }
        assert_eq!(sound.now(), before);
        assert_eq!(sound.active_voices(), 1);
        assert_eq!(sound.pending_releases(), 1);

        render_seconds(&mut sound, ATTACK_SECONDS + note.spec.decay + 0.1);
        assert!(sound.now() > before);
        assert_eq!(sound.active_voices(), 0);
        assert_eq!(sound.pending_releases(), 0);
    }

    #[test]
    fn test_note_produces_sound() {
        let mut sound = running(test_settings());
        force_note(&mut sound);
        let out = render_seconds(&mut sound, 0.5);
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.01);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_scale_modes() {
        let mut sound = running(test_settings());

        let bright = force_note(&mut sound);
        assert!(BRIGHT_SCALE.contains(&bright.spec.frequency));
        assert_eq!(bright.spec.waveform, Waveform::Sine);
        assert_eq!(bright.spec.decay, 2.5);

        sound.set_scale_mode(true);
        assert_eq!(sound.scale(), &DARK_SCALE);
        let dark = force_note(&mut sound);
        assert!(DARK_SCALE.contains(&dark.spec.frequency));
        assert_eq!(dark.spec.waveform, Waveform::Triangle);
        assert_eq!(dark.spec.decay, 4.0);
        assert!(dark.spec.detune_cents > bright.spec.detune_cents);
    }

    #[test]
    fn test_mute_ramps_smoothly() {
        let mut sound = running(test_settings());
        let nominal = sound.settings().master_gain;
        assert_eq!(sound.master_gain(), nominal);

        sound.set_muted(true);
        // One sample in, the gain has barely moved.
        render_seconds(&mut sound, 1.0 / 8000.0);
        assert!(sound.master_gain() > nominal * 0.95);

        render_seconds(&mut sound, 1.0);
        assert!(sound.master_gain() < nominal * 1e-3);

        sound.set_muted(false);
        render_seconds(&mut sound, 1.0);
        assert!((sound.master_gain() - nominal).abs() < nominal * 1e-3);
    }

    #[test]
    fn test_mute_before_initialize() {
        let mut sound = SoundManager::new(test_settings()).unwrap();
        sound.set_muted(true);
        sound.initialize();
        assert_eq!(sound.master_gain(), 0.0);
        assert!(sound.is_muted());
    }

    #[test]
    fn test_close_cancels_pending() {
        let mut sound = running(test_settings());
        force_note(&mut sound);
        assert_eq!(sound.pending_releases(), 1);

        sound.close();

        assert_eq!(sound.state(), AudioState::Uninitialized);
        assert_eq!(sound.active_voices(), 0);
        assert_eq!(sound.pending_releases(), 0);
        let out = render_seconds(&mut sound, 0.1);
        assert!(out.iter().all(|&s| s == 0.0));

        // A fresh graph starts clean.
        sound.initialize();
        assert_eq!(sound.active_voices(), 0);
        assert_eq!(sound.now(), 0.0);
    }

    #[test]
    fn test_smoothing_alpha() {
        assert_eq!(smoothing_alpha(0.0, 0.1), 1.0);
        assert_eq!(smoothing_alpha(0.01, 0.0), 1.0);
        let a = smoothing_alpha(0.01, 0.1);
        assert!((a - (1.0 - (-0.1f32).exp())).abs() < 1e-6);
    }
}
