//! Pointer, touch and keyboard input.
//!
//! [`InteractionInput`] turns raw pixel coordinates into a world-space point on
//! a fixed interaction plane, and tracks whether the pointer is held down.
//! Discrete key actions are decoded into [`Command`]s.
//!
//! # Usage
//!
//! A front end forwards its window events, or calls the pointer methods
//! directly:
//!
//! ```ignore
//! let mut input = InteractionInput::new(1280, 720);
//! input.pointer_moved(640.0, 360.0);
//! input.pointer_pressed();
//! assert!(input.pressed());
//! assert!(input.point().is_some());
//!
//! // Or with winit:
//! if let Some(command) = input.handle_window_event(&event) {
//!     simulation.apply(command);
//! }
//! ```

use crate::error::ParseCommandError;
use glam::{Mat4, Vec2, Vec3};
use std::fmt;
use std::str::FromStr;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Discrete actions a front end can send to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Morph to the next shape in the cycle.
    ToggleShape,
    /// Pause or resume physics. Rotation and rendering continue.
    ToggleFreeze,
    /// Flip the color scheme, rotation direction and musical scale.
    ToggleInvert,
    /// Mute or unmute audio.
    ToggleMute,
    /// Snap every particle back to its target.
    Reset,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::ToggleShape,
        Command::ToggleFreeze,
        Command::ToggleInvert,
        Command::ToggleMute,
        Command::Reset,
    ];

    /// The command's wire name, e.g. `toggle-shape`.
    pub fn name(self) -> &'static str {
        match self {
            Command::ToggleShape => "toggle-shape",
            Command::ToggleFreeze => "toggle-freeze",
            Command::ToggleInvert => "toggle-invert",
            Command::ToggleMute => "toggle-mute",
            Command::Reset => "reset",
        }
    }

    /// Default key binding.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Space => Some(Command::ToggleShape),
            KeyCode::KeyF => Some(Command::ToggleFreeze),
            KeyCode::KeyI => Some(Command::ToggleInvert),
            KeyCode::KeyM => Some(Command::ToggleMute),
            KeyCode::KeyR => Some(Command::Reset),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| ParseCommandError(s.to_string()))
    }
}

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Intersect with the plane through `point` with normal `normal`.
    ///
    /// Returns `None` when the ray is parallel to the plane or the plane is
    /// behind the ray origin.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = normal.dot(point - self.origin) / denom;
        if t < 0.0 {
            return None;
        }
        Some(self.origin + self.direction * t)
    }
}

/// Perspective camera used to cast pointer rays.
///
/// Mirrors the camera the renderer draws with; only the projection matters
/// here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Camera position.
    pub eye: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a camera looking at the origin from `distance` along +Z.
    pub fn new(distance: f32, aspect: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, distance),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            aspect,
            near: 0.1,
            far: 2000.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray {
            origin: near,
            direction: (far - near).normalize_or_zero(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(500.0, 16.0 / 9.0)
    }
}

/// Pointer state projected onto the interaction plane.
///
/// No smoothing is applied; every move replaces the previous point.
#[derive(Debug, Clone)]
pub struct InteractionInput {
    viewport: (u32, u32),
    camera: Camera,
    plane_point: Vec3,
    plane_normal: Vec3,
    cursor: Option<Vec2>,
    ndc: Option<Vec2>,
    point: Option<Vec3>,
    pressed: bool,
}

impl InteractionInput {
    /// Create input tracking for a viewport of the given pixel size.
    ///
    /// The interaction plane is `z = 0`, facing the default camera.
    pub fn new(width: u32, height: u32) -> Self {
        let mut input = Self {
            viewport: (width, height),
            camera: Camera::default(),
            plane_point: Vec3::ZERO,
            plane_normal: Vec3::Z,
            cursor: None,
            ndc: None,
            point: None,
            pressed: false,
        };
        input.set_viewport(width, height);
        input
    }

    /// Replace the camera used for ray casting. Aspect follows the viewport.
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self.set_viewport(self.viewport.0, self.viewport.1);
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Update the viewport size, keeping the camera aspect in sync.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        if width > 0 && height > 0 {
            self.camera.aspect = width as f32 / height as f32;
        }
        if let Some(cursor) = self.cursor {
            self.pointer_moved(cursor.x, cursor.y);
        }
    }

    /// Pointer position in normalized device coordinates (-1 to 1, Y up).
    pub fn ndc(&self) -> Option<Vec2> {
        self.ndc
    }

    /// Pointer position on the interaction plane, if it hits.
    pub fn point(&self) -> Option<Vec3> {
        self.point
    }

    /// Whether the pointer (or a touch) is held down.
    pub fn pressed(&self) -> bool {
        self.pressed
    }

    /// Pointer moved to pixel coordinates `(x, y)`, origin top-left.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.cursor = Some(Vec2::new(x, y));

        let (w, h) = self.viewport;
        if w == 0 || h == 0 {
            self.ndc = None;
            self.point = None;
            return;
        }

        let ndc = Vec2::new(
            (x / w as f32) * 2.0 - 1.0,
            1.0 - (y / h as f32) * 2.0, // Y flipped
        );
        self.ndc = Some(ndc);
        self.point = self
            .camera
            .ray(ndc)
            .intersect_plane(self.plane_point, self.plane_normal);
    }

    pub fn pointer_pressed(&mut self) {
        self.pressed = true;
    }

    pub fn pointer_released(&mut self) {
        self.pressed = false;
    }

    /// Pointer left the viewport; no interaction until it returns.
    pub fn pointer_left(&mut self) {
        self.cursor = None;
        self.ndc = None;
        self.point = None;
    }

    pub fn touch_started(&mut self, x: f32, y: f32) {
        self.pointer_moved(x, y);
        self.pointer_pressed();
    }

    pub fn touch_moved(&mut self, x: f32, y: f32) {
        self.pointer_moved(x, y);
    }

    /// A lifted finger leaves nothing hovering, unlike a mouse.
    pub fn touch_ended(&mut self) {
        self.pointer_released();
        self.pointer_left();
    }

    /// Process a winit window event.
    ///
    /// Pointer and touch events update state in place; key presses that map
    /// to an action are returned as a [`Command`]. Key repeats are ignored.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<Command> {
        match event {
            WindowEvent::Resized(size) => {
                self.set_viewport(size.width, size.height);
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x as f32, position.y as f32);
                None
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer_left();
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if *button == MouseButton::Left {
                    match state {
                        ElementState::Pressed => self.pointer_pressed(),
                        ElementState::Released => self.pointer_released(),
                    }
                }
                None
            }
            WindowEvent::Touch(touch) => {
                let (x, y) = (touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => self.touch_started(x, y),
                    TouchPhase::Moved => self.touch_moved(x, y),
                    TouchPhase::Ended | TouchPhase::Cancelled => self.touch_ended(),
                }
                None
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return None;
                }
                match event.physical_key {
                    PhysicalKey::Code(code) => Command::from_key(code),
                    PhysicalKey::Unidentified(_) => None,
                }
            }
            _ => None,
        }
    }
}
