//! Error types for swarmsong.
//!
//! Configuration is validated once, when a simulation or sound manager is
//! built. Nothing in the per-frame path returns an error.

use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The field needs at least one particle.
    #[error("particle count must be greater than zero")]
    ZeroParticles,
    /// A parameter is NaN or infinite.
    #[error("`{name}` must be finite, got {value}")]
    NonFinite { name: &'static str, value: f32 },
    /// A parameter that must not be negative is.
    #[error("`{name}` must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    /// Damping is a per-step multiplier and has to stay in `[0, 1]`.
    #[error("damping must be within [0, 1], got {0}")]
    DampingOutOfRange(f32),
    /// Audio sample rate is zero or not finite.
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),
    /// The synthesizer needs room for at least one voice.
    #[error("max voices must be greater than zero")]
    ZeroVoices,
}

/// Errors that can occur when building or reconfiguring a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// A configuration file is not valid JSON for [`SimulationConfig`](crate::SimulationConfig).
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A command name that does not match any known [`Command`](crate::input::Command).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command `{0}`")]
pub struct ParseCommandError(pub String);

/// A shape name that does not match any known [`Shape`](crate::shapes::Shape).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown shape `{0}` (expected sphere, cube or pyramid)")]
pub struct ParseShapeError(pub String);
