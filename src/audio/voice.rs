//! A single synthesized note.
//!
//! Each voice is two oscillators (a primary and a detuned secondary at half
//! level) shaped by an attack/decay envelope: linear rise to [`PEAK`], then
//! exponential fall to [`FLOOR`].

use super::schedule::VoiceId;
use std::f32::consts::TAU;

/// Envelope peak level.
pub const PEAK: f32 = 0.5;
/// Level the exponential decay ends at.
pub const FLOOR: f32 = 0.001;
/// Attack duration in seconds.
pub const ATTACK_SECONDS: f32 = 0.05;

const SECONDARY_LEVEL: f32 = 0.5;

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// Value at `phase` in `[0, 1)`.
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Oscillator {
    waveform: Waveform,
    phase: f32,
    increment: f32,
}

impl Oscillator {
    fn new(waveform: Waveform, frequency: f32, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            increment: frequency / sample_rate,
        }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let v = self.waveform.at(self.phase);
        self.phase = (self.phase + self.increment).fract();
        v
    }
}

/// Attack/decay amplitude envelope, stepped per sample.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    attack: u64,
    decay: u64,
    ratio: f32,
    level: f32,
    age: u64,
}

impl Envelope {
    /// Build an envelope for the given durations in samples.
    pub fn new(attack: u64, decay: u64) -> Self {
        let decay = decay.max(1);
        Self {
            attack,
            decay,
            ratio: (FLOOR / PEAK).powf(1.0 / decay as f32),
            level: 0.0,
            age: 0,
        }
    }

    /// Total samples from onset to the end of the decay.
    pub fn length(&self) -> u64 {
        self.attack + self.decay
    }

    pub fn is_finished(&self) -> bool {
        self.age >= self.length()
    }

    /// Current level, then advance one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let out = if self.age < self.attack {
            PEAK * self.age as f32 / self.attack as f32
        } else if self.age == self.attack {
            self.level = PEAK;
            PEAK
        } else if self.age < self.length() {
            self.level *= self.ratio;
            self.level
        } else {
            0.0
        };
        self.age = self.age.saturating_add(1);
        out
    }
}

/// Sound parameters for one note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpec {
    pub frequency: f32,
    pub waveform: Waveform,
    /// Decay duration in seconds.
    pub decay: f32,
    /// Secondary oscillator detune in cents.
    pub detune_cents: f32,
}

/// One sounding note.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    primary: Oscillator,
    secondary: Oscillator,
    envelope: Envelope,
}

impl Voice {
    pub fn new(id: VoiceId, spec: &NoteSpec, sample_rate: f32) -> Self {
        let detuned = spec.frequency * 2f32.powf(spec.detune_cents / 1200.0);
        let attack = (ATTACK_SECONDS * sample_rate).round() as u64;
        let decay = (spec.decay * sample_rate).round() as u64;
        Self {
            id,
            primary: Oscillator::new(spec.waveform, spec.frequency, sample_rate),
            secondary: Oscillator::new(Waveform::Sine, detuned, sample_rate),
            envelope: Envelope::new(attack, decay),
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Samples from onset until the envelope has fully decayed.
    pub fn length(&self) -> u64 {
        self.envelope.length()
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }

    /// Next output sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let level = self.envelope.next();
        let mix = self.primary.next() + self.secondary.next() * SECONDARY_LEVEL;
        level * mix / (1.0 + SECONDARY_LEVEL)
    }
}
