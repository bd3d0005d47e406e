//! # swarmsong - interactive particle swarm core
//!
//! Tens of thousands of points resting on a shape, pushed around by the
//! pointer, drifting in a slow wind, morphing between a sphere, a cube and a
//! pyramid, and humming a pentatonic response to how hard they are disturbed.
//!
//! This crate is the CPU core: physics, shape targets, input mapping and the
//! synthesizer. Rendering and the audio device are external and plug in
//! through [`RenderSink`] and [`SoundManager::render`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use swarmsong::prelude::*;
//!
//! let mut sim = Simulation::new(SimulationConfig::default())?;
//! let mut scheduler = Scheduler::new();
//! scheduler.start();
//!
//! // Per display refresh
//! scheduler.tick(&mut sim, &mut |frame: RenderFrame<'_>| {
//!     upload(frame.position_bytes());
//! });
//!
//! // Per window event
//! sim.handle_window_event(&event);
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! [`ParticleField`] keeps positions, origins, velocities, colors and sizes in
//! flat arrays. Each frame a particle is pushed by the pointer, carried by
//! the wind, pulled home by a spring and jittered by [`NoiseField`].
//!
//! ### Shapes
//!
//! A [`ShapeSet`] holds one point cloud per [`Shape`]. Morphing only swaps
//! the origins; the spring does the rest.
//!
//! ### Commands
//!
//! | Key | [`Command`] |
//! |-----|-------------|
//! | Space | toggle-shape |
//! | F | toggle-freeze |
//! | I | toggle-invert |
//! | M | toggle-mute |
//! | R | reset |
//!
//! ### Sound
//!
//! Frames with enough interaction energy may start a note. See [`audio`].

pub mod audio;
pub mod config;
pub mod error;
pub mod input;
pub mod noise;
pub mod particles;
pub mod shapes;
mod simulation;
pub mod time;

pub use audio::{AudioSettings, AudioState, NoteEvent, SoundManager};
pub use bytemuck;
pub use config::SimulationConfig;
pub use error::{ConfigError, ParseCommandError, ParseShapeError, SimulationError};
pub use glam::{Vec2, Vec3};
pub use input::{Camera, Command, InteractionInput, Ray};
pub use noise::NoiseField;
pub use particles::{FrameInput, ParticleField};
pub use shapes::{Shape, ShapeSet};
pub use simulation::{
    FrameReport, InteractionState, NullSink, RenderFrame, RenderSink, Scheduler, Simulation,
    SimulationState, NOTE_ENERGY_THRESHOLD, TRANSFORM_COOLDOWN,
};
pub use time::FrameClock;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use swarmsong::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audio::{AudioSettings, SoundManager};
    pub use crate::config::SimulationConfig;
    pub use crate::input::{Command, InteractionInput};
    pub use crate::shapes::Shape;
    pub use crate::simulation::{
        FrameReport, NullSink, RenderFrame, RenderSink, Scheduler, Simulation,
    };
    pub use crate::time::FrameClock;
    pub use crate::{Vec2, Vec3};
}
