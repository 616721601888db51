//! Keyboard driven free flight.
//!
//! Key presses only toggle [`MovementFlags`]; the camera is moved once per frame by
//! [`MovementController::update`], which reads the flags without changing them.

use cgmath::{Quaternion, Rotation, Vector3, Zero};
use winit::keyboard::KeyCode;

use crate::camera::Camera;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// WASD and the arrow keys move in the view plane, Space and left Shift vertically.
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => Some(Direction::Forward),
            KeyCode::KeyS | KeyCode::ArrowDown => Some(Direction::Backward),
            KeyCode::KeyA | KeyCode::ArrowLeft => Some(Direction::Left),
            KeyCode::KeyD | KeyCode::ArrowRight => Some(Direction::Right),
            KeyCode::Space => Some(Direction::Up),
            KeyCode::ShiftLeft => Some(Direction::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementFlags {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MovementFlags {
    pub fn set(&mut self, direction: Direction, active: bool) {
        match direction {
            Direction::Forward => self.forward = active,
            Direction::Backward => self.backward = active,
            Direction::Left => self.left = active,
            Direction::Right => self.right = active,
            Direction::Up => self.up = active,
            Direction::Down => self.down = active,
        }
    }

    pub fn get(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.forward,
            Direction::Backward => self.backward,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    /// Apply a key transition. Unmapped keys are ignored and return false.
    pub fn handle_key(&mut self, code: KeyCode, pressed: bool) -> bool {
        match Direction::from_key(code) {
            Some(direction) => {
                self.set(direction, pressed);
                true
            }
            None => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// How far one frame advances the movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeStep {
    /// The same step every frame, regardless of frame time.
    Fixed(f32),
    /// The measured time since the previous frame.
    Elapsed,
}

impl TimeStep {
    pub fn seconds(&self, elapsed: instant::Duration) -> f32 {
        match self {
            TimeStep::Fixed(step) => *step,
            TimeStep::Elapsed => elapsed.as_secs_f32(),
        }
    }
}

impl Default for TimeStep {
    fn default() -> Self {
        TimeStep::Fixed(0.1)
    }
}

#[derive(Debug, Clone)]
pub struct MovementController {
    pub flags: MovementFlags,
    /// World units per second.
    pub speed: f32,
    pub time_step: TimeStep,
}

impl MovementController {
    pub fn new(speed: f32, time_step: TimeStep) -> Self {
        Self {
            flags: MovementFlags::default(),
            speed,
            time_step,
        }
    }

    /// Offset for one frame of `dt_secs` seconds.
    ///
    /// Planar movement follows the view orientation (including pitch, so looking up
    /// while moving forward climbs). Vertical movement is along world Y.
    pub fn displacement(&self, orientation: Quaternion<f32>, dt_secs: f32) -> Vector3<f32> {
        let flags = &self.flags;
        let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;

        let planar = Vector3::new(
            axis(flags.right, flags.left),
            0.0,
            axis(flags.backward, flags.forward),
        );
        let vertical = Vector3::new(0.0, axis(flags.up, flags.down), 0.0);

        if planar.is_zero() && vertical.is_zero() {
            return Vector3::zero();
        }
        let step = self.speed * dt_secs;
        orientation.rotate_vector(planar) * step + vertical * step
    }

    pub fn update(&self, camera: &mut Camera, elapsed: instant::Duration) {
        let dt = self.time_step.seconds(elapsed);
        camera.position += self.displacement(camera.orientation(), dt);
    }
}

impl Default for MovementController {
    fn default() -> Self {
        Self::new(10.0, TimeStep::default())
    }
}
