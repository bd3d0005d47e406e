//! Column-wise particle state and per-frame force integration.
//!
//! [`ParticleField`] stores every particle attribute in its own flat array so
//! renderers can upload them directly. The integration step applies, in order:
//!
//! 1. pointer repulsion with a small swirl,
//! 2. wind, stronger for particles already far from home,
//! 3. a return spring that stiffens with displacement,
//! 4. per-axis noise jitter,
//!
//! then advances positions and damps velocities.

use crate::config::SimulationConfig;
use crate::noise::NoiseField;
use crate::shapes::{Shape, ShapeSet};
use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

/// Pointer force multiplier while the pointer is held down.
pub const PRESS_MULTIPLIER: f32 = 2.5;
/// Repulsion magnitudes at or below this are left out of the interaction energy.
pub const ENERGY_FLOOR: f32 = 0.1;
/// Displacement below which the return spring is inactive.
pub const RETURN_DEADBAND: f32 = 0.1;

const SWIRL: f32 = 0.3;
const SWIRL_WEIGHT: f32 = 0.2;
const WIND_WEIGHT: f32 = 0.05;
const WIND_REACH: f32 = 50.0;
const WIND_FREQUENCY: f32 = 0.1;
const TURBULENCE_SCALE: f32 = 0.005;
const JITTER_SCALE: f32 = 0.01;

/// Per-frame inputs to [`ParticleField::integrate`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Pointer position in the field's local frame, if the pointer is over the scene.
    pub interaction_point: Option<Vec3>,
    /// Whether the pointer is held down.
    pub pressed: bool,
    /// Simulation time in seconds.
    pub time: f32,
}

/// Particle state for the whole swarm.
///
/// Vector attributes are stored as `x, y, z` triples. Lengths are fixed at
/// construction.
#[derive(Clone, Debug)]
pub struct ParticleField {
    count: usize,
    positions: Vec<f32>,
    origins: Vec<f32>,
    velocities: Vec<f32>,
    colors: Vec<f32>,
    sizes: Vec<f32>,
    shape: Shape,
    rotation: f32,
}

impl ParticleField {
    /// Create a field resting on the sphere cloud of `shapes`.
    ///
    /// The particle count is the shape set's count. Colors get a random
    /// brightness in `[0.7, 1.0]`, sizes a random scale in `[0.5, 1.0]`.
    pub fn new<R: Rng + ?Sized>(shapes: &ShapeSet, rng: &mut R) -> Self {
        let count = shapes.count();
        let origins = shapes.get(Shape::Sphere).to_vec();
        let positions = origins.clone();

        let mut colors = Vec::with_capacity(count * 3);
        let mut sizes = Vec::with_capacity(count);
        for _ in 0..count {
            let brightness = rng.gen_range(0.7..=1.0f32);
            colors.extend_from_slice(&[brightness, brightness, brightness]);
            sizes.push(rng.gen_range(0.5..=1.0f32));
        }

        log::debug!("allocated particle field with {} particles", count);

        Self {
            count,
            positions,
            origins,
            velocities: vec![0.0; count * 3],
            colors,
            sizes,
            shape: Shape::Sphere,
            rotation: 0.0,
        }
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Shape the particles are currently pulled toward.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Model rotation about the Y axis, in radians within `[0, TAU)`.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn origins(&self) -> &[f32] {
        &self.origins
    }

    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    /// Position of particle `i`.
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    /// Origin (morph target) of particle `i`.
    pub fn origin(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.origins[i * 3..i * 3 + 3])
    }

    /// Velocity of particle `i`.
    pub fn velocity(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.velocities[i * 3..i * 3 + 3])
    }

    /// Move particle `i` without touching its velocity.
    pub fn set_position(&mut self, i: usize, position: Vec3) {
        position.write_to_slice(&mut self.positions[i * 3..i * 3 + 3]);
    }

    pub fn set_velocity(&mut self, i: usize, velocity: Vec3) {
        velocity.write_to_slice(&mut self.velocities[i * 3..i * 3 + 3]);
    }

    /// Distance from particle `i` to its origin.
    pub fn displacement(&self, i: usize) -> f32 {
        self.position(i).distance(self.origin(i))
    }

    /// Mean distance of all particles from their origins.
    pub fn mean_displacement(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let total: f32 = (0..self.count).map(|i| self.displacement(i)).sum();
        total / self.count as f32
    }

    /// Retarget every particle to `shape`.
    ///
    /// Only origins change. The return spring carries particles to the new
    /// targets over the following frames.
    pub fn morph_to(&mut self, shape: Shape, shapes: &ShapeSet) {
        debug_assert_eq!(shapes.count(), self.count);
        self.origins.copy_from_slice(shapes.get(shape));
        self.shape = shape;
        log::debug!("morphing particle field to {}", shape);
    }

    /// Retarget to the next shape in the cycle and return it.
    pub fn morph_next(&mut self, shapes: &ShapeSet) -> Shape {
        let next = self.shape.next();
        self.morph_to(next, shapes);
        next
    }

    /// Snap every particle to its origin and stop it.
    pub fn reset(&mut self) {
        self.positions.copy_from_slice(&self.origins);
        self.velocities.fill(0.0);
    }

    /// Add to the model rotation.
    pub fn rotate(&mut self, delta: f32) {
        self.rotation = (self.rotation + delta).rem_euclid(TAU);
    }

    /// Advance every particle by one frame.
    ///
    /// Returns the frame's interaction energy: the sum of pointer repulsion
    /// magnitudes above [`ENERGY_FLOOR`].
    pub fn integrate(&mut self, input: &FrameInput, config: &SimulationConfig) -> f32 {
        let t = input.time;
        let phase = t * WIND_FREQUENCY;
        let wind = Vec3::new(phase.cos(), (phase + 1.3).sin() * 0.5, phase.sin())
            * config.wind_strength;
        let mouse_force = if input.pressed {
            config.mouse_force * PRESS_MULTIPLIER
        } else {
            config.mouse_force
        };
        let jitter = config.noise_amount * JITTER_SCALE;

        let mut energy = 0.0;

        for i in 0..self.count {
            let k = i * 3;
            let mut p = Vec3::from_slice(&self.positions[k..k + 3]);
            let mut v = Vec3::from_slice(&self.velocities[k..k + 3]);
            let to_home = Vec3::from_slice(&self.origins[k..k + 3]) - p;
            let displacement = to_home.length();

            if let Some(m) = input.interaction_point {
                let away = p - m;
                let d = away.length();
                if d > 0.0 && d < config.mouse_radius {
                    let falloff = 1.0 - d / config.mouse_radius;
                    let f = falloff * falloff * mouse_force;
                    let dir = away / d;
                    v += dir * f;
                    v += Vec3::new(-dir.y, dir.x, 0.0) * (SWIRL * f * SWIRL_WEIGHT);
                    if f > ENERGY_FLOOR {
                        energy += f;
                    }
                }
            }

            let wind_influence = (displacement / WIND_REACH).min(1.0) * 0.5;
            if wind_influence > 0.0 && config.wind_strength > 0.0 {
                let n = NoiseField::sample4(
                    p.x * TURBULENCE_SCALE,
                    p.y * TURBULENCE_SCALE,
                    p.z * TURBULENCE_SCALE,
                    phase,
                );
                v += wind * (1.0 + n * config.wind_turbulence) * wind_influence * WIND_WEIGHT;
            }

            if displacement > RETURN_DEADBAND {
                v += to_home * config.return_speed * (1.0 + displacement * 0.01);
            }

            if jitter > 0.0 {
                let q = p * JITTER_SCALE;
                v += Vec3::new(
                    NoiseField::sample4(q.x, q.y, q.z, t),
                    NoiseField::sample4(q.x, q.y, q.z, t + 31.7),
                    NoiseField::sample4(q.x, q.y, q.z, t + 63.1),
                ) * jitter;
            }

            p += v;
            v *= config.damping;

            p.write_to_slice(&mut self.positions[k..k + 3]);
            v.write_to_slice(&mut self.velocities[k..k + 3]);
        }

        energy
    }
}
