//! The per-frame loop tying input, physics, audio and rendering together.
//!
//! Each [`Simulation::step`] runs in a fixed order:
//!
//! 1. read the interaction state, moving the pointer into the field's rotated frame
//! 2. integrate forces unless frozen
//! 3. advance the model rotation
//! 4. morph to the next shape if the interaction energy crosses the threshold
//! 5. offer the energy to the sound manager
//! 6. hand the particle buffers to the render sink
//!
//! [`Scheduler`] drives `step` from an external tick source and can be
//! started and stopped.

use crate::audio::{AudioSettings, NoteEvent, SoundManager};
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::input::{Command, InteractionInput};
use crate::particles::{FrameInput, ParticleField};
use crate::shapes::{Shape, ShapeSet};
use crate::time::FrameClock;
use glam::{Mat4, Quat, Vec3};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use winit::event::WindowEvent;

/// Frames to wait after an automatic morph before another can fire.
pub const TRANSFORM_COOLDOWN: u32 = 120;
/// Energy a frame needs before the sound manager hears about it.
pub const NOTE_ENERGY_THRESHOLD: f32 = 5.0;
/// Frame rate the per-frame rotation speed is expressed at.
const REFERENCE_FPS: f32 = 60.0;

/// Pointer and mode flags, written by input and read at the top of each step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionState {
    /// Pointer on the interaction plane in world space.
    pub point: Option<Vec3>,
    pub pressed: bool,
    pub shape: Shape,
    pub frozen: bool,
    pub inverted: bool,
    /// Frames left before an automatic morph is allowed.
    pub cooldown: u32,
}

/// Everything the loop reads each frame besides particle data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationState {
    pub config: SimulationConfig,
    pub interaction: InteractionState,
}

/// Read-only view of one frame, handed to a [`RenderSink`].
#[derive(Clone, Copy, Debug)]
pub struct RenderFrame<'a> {
    /// `x, y, z` per particle, in the field's local frame.
    pub positions: &'a [f32],
    /// `r, g, b` per particle.
    pub colors: &'a [f32],
    pub sizes: &'a [f32],
    /// Model rotation about Y, in radians.
    pub rotation: f32,
    /// Simulation time in seconds.
    pub time: f32,
}

impl RenderFrame<'_> {
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Local-to-world transform.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation)
    }

    /// Positions as raw bytes for a vertex buffer upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.positions)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.colors)
    }

    pub fn size_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.sizes)
    }
}

/// Receiver of rendered frames.
pub trait RenderSink {
    fn present(&mut self, frame: RenderFrame<'_>);
}

impl<F> RenderSink for F
where
    F: FnMut(RenderFrame<'_>),
{
    fn present(&mut self, frame: RenderFrame<'_>) {
        self(frame)
    }
}

/// Sink that drops every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn present(&mut self, _frame: RenderFrame<'_>) {}
}

/// What happened during one [`Simulation::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Interaction energy of the frame. Zero while frozen.
    pub energy: f32,
    /// Note started this frame, if any.
    pub note: Option<NoteEvent>,
    /// Shape the field started morphing to, if the threshold fired.
    pub morphed: Option<Shape>,
}

/// A running particle swarm with its input and sound.
pub struct Simulation {
    state: SimulationState,
    shapes: ShapeSet,
    field: ParticleField,
    sound: SoundManager,
    input: InteractionInput,
    rng: SmallRng,
    time: f32,
    frame: u64,
}

impl Simulation {
    /// Create a simulation with default audio and an entropy-seeded field.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_audio(config, AudioSettings::default(), None)
    }

    /// Create a simulation with explicit audio settings.
    ///
    /// `seed` fixes the particle layout; `audio.seed` fixes note choice.
    pub fn with_audio(
        config: SimulationConfig,
        audio: AudioSettings,
        seed: Option<u64>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let shapes = ShapeSet::generate(config.particle_count as usize, &mut rng);
        let field = ParticleField::new(&shapes, &mut rng);
        let sound = SoundManager::new(audio)?;

        log::info!("simulation created with {} particles", config.particle_count);

        Ok(Self {
            state: SimulationState {
                config,
                interaction: InteractionState::default(),
            },
            shapes,
            field,
            sound,
            input: InteractionInput::new(1280, 720),
            rng,
            time: 0.0,
            frame: 0,
        })
    }

    /// Advance one frame and present it to `sink`.
    pub fn step<S: RenderSink + ?Sized>(&mut self, dt: f32, sink: &mut S) -> FrameReport {
        let config = &self.state.config;
        let interaction = &mut self.state.interaction;

        let unrotate = Quat::from_rotation_y(-self.field.rotation());
        let frame_input = FrameInput {
            interaction_point: interaction.point.map(|p| unrotate * p),
            pressed: interaction.pressed,
            time: self.time,
        };

        let energy = if interaction.frozen {
            0.0
        } else {
            self.field.integrate(&frame_input, config)
        };

        let spin = config.rotation_speed * dt * REFERENCE_FPS;
        self.field.rotate(if interaction.inverted { -spin } else { spin });

        let mut morphed = None;
        if interaction.cooldown > 0 {
            interaction.cooldown -= 1;
        } else if energy > config.transform_threshold {
            let shape = self.field.morph_next(&self.shapes);
            interaction.shape = shape;
            interaction.cooldown = TRANSFORM_COOLDOWN;
            morphed = Some(shape);
            log::debug!("energy {:.1} triggered morph to {}", energy, shape);
        }

        let note = if energy > NOTE_ENERGY_THRESHOLD {
            self.sound.notify_energy(energy)
        } else {
            None
        };

        sink.present(RenderFrame {
            positions: self.field.positions(),
            colors: self.field.colors(),
            sizes: self.field.sizes(),
            rotation: self.field.rotation(),
            time: self.time,
        });

        self.time += dt;
        self.frame += 1;

        FrameReport {
            energy,
            note,
            morphed,
        }
    }

    /// Apply a user command. The first command also starts audio.
    pub fn apply(&mut self, command: Command) {
        self.sound.initialize();
        let interaction = &mut self.state.interaction;
        match command {
            Command::ToggleShape => {
                interaction.shape = self.field.morph_next(&self.shapes);
            }
            Command::ToggleFreeze => {
                interaction.frozen = !interaction.frozen;
            }
            Command::ToggleInvert => {
                interaction.inverted = !interaction.inverted;
                self.sound.set_scale_mode(interaction.inverted);
            }
            Command::ToggleMute => {
                let muted = !self.sound.is_muted();
                self.sound.set_muted(muted);
            }
            Command::Reset => self.field.reset(),
        }
        log::debug!("applied {}", command);
    }

    /// Replace the configuration.
    ///
    /// A new particle count rebuilds the shapes and the field, keeping the
    /// current shape and rotation. Other changes apply on the next step.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), SimulationError> {
        if let Err(err) = config.validate() {
            log::warn!("rejected configuration: {}", err);
            return Err(err.into());
        }

        if config.particle_count != self.state.config.particle_count {
            let shape = self.field.shape();
            let rotation = self.field.rotation();
            self.shapes = ShapeSet::generate(config.particle_count as usize, &mut self.rng);
            self.field = ParticleField::new(&self.shapes, &mut self.rng);
            if shape != Shape::Sphere {
                self.field.morph_to(shape, &self.shapes);
                self.field.reset();
            }
            self.field.rotate(rotation);
            log::info!("rebuilt field with {} particles", config.particle_count);
        }

        self.state.config = config;
        Ok(())
    }

    /// Feed a winit window event through the input adapter.
    ///
    /// Pointer state is copied into the interaction state; a pressed button
    /// counts as a user gesture and starts audio. Key commands are applied and
    /// returned.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<Command> {
        let command = self.input.handle_window_event(event);
        self.sync_pointer();
        if self.input.pressed() {
            self.sound.initialize();
        }
        if let Some(command) = command {
            self.apply(command);
        }
        command
    }

    /// Pointer moved to pixel coordinates.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.input.pointer_moved(x, y);
        self.sync_pointer();
    }

    pub fn pointer_pressed(&mut self) {
        self.input.pointer_pressed();
        self.sound.initialize();
        self.sync_pointer();
    }

    pub fn pointer_released(&mut self) {
        self.input.pointer_released();
        self.sync_pointer();
    }

    pub fn pointer_left(&mut self) {
        self.input.pointer_left();
        self.sync_pointer();
    }

    /// Set the world-space interaction point directly, bypassing the camera.
    pub fn set_interaction_point(&mut self, point: Option<Vec3>) {
        self.state.interaction.point = point;
    }

    pub fn set_pressed(&mut self, pressed: bool) {
        self.state.interaction.pressed = pressed;
    }

    fn sync_pointer(&mut self) {
        self.state.interaction.point = self.input.point();
        self.state.interaction.pressed = self.input.pressed();
    }

    /// Pull audio samples for the output device.
    pub fn render_audio(&mut self, out: &mut [f32]) {
        self.sound.render(out);
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.state.config
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ParticleField {
        &mut self.field
    }

    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    pub fn sound(&self) -> &SoundManager {
        &self.sound
    }

    pub fn sound_mut(&mut self) -> &mut SoundManager {
        &mut self.sound
    }

    pub fn input(&self) -> &InteractionInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InteractionInput {
        &mut self.input
    }

    /// Simulation time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.sound.close();
    }
}

/// Steps a [`Simulation`] once per external tick while running.
#[derive(Debug, Clone)]
pub struct Scheduler {
    clock: FrameClock,
    running: bool,
}

impl Scheduler {
    /// A stopped scheduler measuring wall-clock time.
    pub fn new() -> Self {
        let mut clock = FrameClock::new();
        clock.pause();
        Self {
            clock,
            running: false,
        }
    }

    /// A stopped scheduler that advances a constant `dt` per tick.
    pub fn fixed(dt: f32) -> Self {
        let mut scheduler = Self::new();
        scheduler.clock.set_fixed_delta(Some(dt));
        scheduler
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.clock.resume();
            log::debug!("scheduler started");
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.clock.pause();
            log::debug!("scheduler stopped at frame {}", self.clock.frame());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    /// Step once using wall-clock time. Does nothing while stopped.
    pub fn tick<S: RenderSink + ?Sized>(
        &mut self,
        simulation: &mut Simulation,
        sink: &mut S,
    ) -> Option<FrameReport> {
        if !self.running {
            return None;
        }
        let (_, dt) = self.clock.update();
        Some(simulation.step(dt, sink))
    }

    /// Step once, `raw_dt` seconds after the previous tick.
    pub fn tick_after<S: RenderSink + ?Sized>(
        &mut self,
        raw_dt: f32,
        simulation: &mut Simulation,
        sink: &mut S,
    ) -> Option<FrameReport> {
        if !self.running {
            return None;
        }
        let (_, dt) = self.clock.advance(raw_dt);
        Some(simulation.step(dt, sink))
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
