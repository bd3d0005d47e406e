//! Simulation configuration.
//!
//! [`SimulationConfig`] holds every tunable that feeds the integration
//! equations. It can be built in code, or read from JSON where missing keys
//! fall back to the defaults:
//!
//! ```ignore
//! let config = SimulationConfig::from_json_str(r#"{ "particle_count": 5000 }"#)?;
//! assert_eq!(config.damping, 0.95);
//! ```

use crate::error::{ConfigError, SimulationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable simulation parameters.
///
/// Everything except `particle_count` can be changed while the simulation is
/// running without touching particle buffers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of particles in the field.
    pub particle_count: u32,
    /// Radius of the pointer's repulsion sphere, in world units.
    pub mouse_radius: f32,
    /// Peak repulsion strength at the pointer.
    pub mouse_force: f32,
    /// Spring strength pulling particles back to their origin.
    pub return_speed: f32,
    /// Field rotation per 60 Hz frame, in radians.
    pub rotation_speed: f32,
    /// Amplitude of per-axis noise jitter.
    pub noise_amount: f32,
    /// Strength of the slowly rotating wind.
    pub wind_strength: f32,
    /// How much per-particle turbulence modulates the wind.
    pub wind_turbulence: f32,
    /// Per-step velocity multiplier.
    pub damping: f32,
    /// Interaction energy that triggers an automatic shape change.
    pub transform_threshold: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 20_000,
            mouse_radius: 60.0,
            mouse_force: 2.0,
            return_speed: 0.02,
            rotation_speed: 0.001,
            noise_amount: 1.0,
            wind_strength: 0.5,
            wind_turbulence: 0.5,
            damping: 0.95,
            transform_threshold: 250.0,
        }
    }
}

impl SimulationConfig {
    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set pointer radius and force together.
    pub fn with_mouse(mut self, radius: f32, force: f32) -> Self {
        self.mouse_radius = radius;
        self.mouse_force = force;
        self
    }

    /// Set wind strength and turbulence together.
    pub fn with_wind(mut self, strength: f32, turbulence: f32) -> Self {
        self.wind_strength = strength;
        self.wind_turbulence = turbulence;
        self
    }

    /// Set the noise jitter amplitude.
    pub fn with_noise(mut self, amount: f32) -> Self {
        self.noise_amount = amount;
        self
    }

    /// Set the return spring strength.
    pub fn with_return_speed(mut self, speed: f32) -> Self {
        self.return_speed = speed;
        self
    }

    /// Set the velocity damping factor.
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// A config with every external force switched off.
    ///
    /// Only the return spring and damping act on particles.
    pub fn calm(self) -> Self {
        let radius = self.mouse_radius;
        self.with_mouse(radius, 0.0).with_wind(0.0, 0.0).with_noise(0.0)
    }

    /// Check every parameter once so the integration loop never sees NaNs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::ZeroParticles);
        }

        let params = [
            ("mouse_radius", self.mouse_radius),
            ("mouse_force", self.mouse_force),
            ("return_speed", self.return_speed),
            ("rotation_speed", self.rotation_speed),
            ("noise_amount", self.noise_amount),
            ("wind_strength", self.wind_strength),
            ("wind_turbulence", self.wind_turbulence),
            ("damping", self.damping),
            ("transform_threshold", self.transform_threshold),
        ];
        for (name, value) in params {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { name, value });
            }
        }

        // Rotation direction is free; everything else is a magnitude.
        for (name, value) in params {
            if name != "rotation_speed" && value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if self.damping > 1.0 {
            return Err(ConfigError::DampingOutOfRange(self.damping));
        }

        Ok(())
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
