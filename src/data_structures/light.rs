//! Directional light description and its shadow camera.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};

use crate::{camera::OPENGL_TO_WGPU_MATRIX, data_structures::model::srgb_hex_to_linear};

/// Orthographic frustum the shadow map is rendered with, in light view space.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    /// Width and height of the square shadow map in texels.
    pub map_size: u32,
}

impl Default for ShadowCamera {
    fn default() -> Self {
        Self {
            left: -5.0,
            right: 5.0,
            top: 5.0,
            bottom: -5.0,
            near: 0.5,
            far: 500.0,
            map_size: 512,
        }
    }
}

/// A light infinitely far away shining from `position` towards `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Linear RGB.
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub cast_shadow: bool,
    pub shadow: ShadowCamera,
}

impl DirectionalLight {
    pub fn new(hex: u32, intensity: f32) -> Self {
        Self {
            color: srgb_hex_to_linear(hex),
            intensity,
            ..Default::default()
        }
    }

    /// Unit vector from the lit surface towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        (self.position - self.target).normalize()
    }

    pub fn radiance(&self) -> [f32; 3] {
        self.color.map(|c| c * self.intensity)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(self.position, self.target, up_for(self.direction()));
        let s = &self.shadow;
        let proj = cgmath::ortho(s.left, s.right, s.bottom, s.top, s.near, s.far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

// look_at breaks down when looking straight along the up vector
fn up_for(direction: Vector3<f32>) -> Vector3<f32> {
    if direction.dot(Vector3::unit_y()).abs() > 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: [1.0; 3],
            intensity: 1.0,
            position: Point3::new(0.0, 1.0, 0.0),
            target: Point3::origin(),
            cast_shadow: false,
            shadow: ShadowCamera::default(),
        }
    }
}
