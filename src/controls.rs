//! Pointer-lock mouse look.
//!
//! The look state only changes while the pointer is locked. Locking itself is an
//! asynchronous request to the platform; the outcome comes back as a lock change
//! that is fed into [`PointerLockControls::set_locked`].

use std::f32::consts::FRAC_PI_2;

use cgmath::Rad;
use log::{info, warn};
use winit::window::{CursorGrabMode, Window};

use crate::camera::Camera;

#[derive(Debug, Clone)]
pub struct PointerLockControls {
    locked: bool,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
}

impl PointerLockControls {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            locked: false,
            sensitivity,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            info!("pointer {}", if locked { "locked" } else { "released" });
        }
        self.locked = locked;
    }

    /// Turn `camera` by a relative mouse motion. Returns whether the camera changed.
    pub fn look(&self, camera: &mut Camera, dx: f64, dy: f64) -> bool {
        if !self.locked {
            return false;
        }
        camera.yaw -= Rad(dx as f32 * self.sensitivity);
        camera.pitch -= Rad(dy as f32 * self.sensitivity);
        camera.pitch = Rad(camera.pitch.0.clamp(-FRAC_PI_2, FRAC_PI_2));
        true
    }
}

impl Default for PointerLockControls {
    fn default() -> Self {
        Self::new(0.002)
    }
}

/// Ask the platform to capture the pointer and hide the cursor.
///
/// Not every platform can lock the cursor in place, so confinement is tried second.
pub fn grab_cursor(window: &Window) -> anyhow::Result<()> {
    window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|err| {
            warn!("cursor lock unavailable ({err}), confining instead");
            window.set_cursor_grab(CursorGrabMode::Confined)
        })?;
    window.set_cursor_visible(false);
    Ok(())
}

pub fn release_cursor(window: &Window) {
    if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
        warn!("failed to release cursor: {err}");
    }
    window.set_cursor_visible(true);
}
