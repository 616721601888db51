//! CPU-side geometry and the primitive shapes the viewer builds its test scene from.

use cgmath::Vector3;

use crate::data_structures::model::ModelVertex;

/// Triangle list geometry waiting to be uploaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Append one quad spanned by `u` and `v` around `center`.
    ///
    /// `u × v` must point along `normal` for the quad to wind counter-clockwise when
    /// seen from the front.
    fn push_quad(
        &mut self,
        center: Vector3<f32>,
        u: Vector3<f32>,
        v: Vector3<f32>,
        normal: Vector3<f32>,
    ) {
        let base = self.vertices.len() as u32;
        let corners = [
            (center - u - v, [0.0, 1.0]),
            (center + u - v, [1.0, 1.0]),
            (center + u + v, [1.0, 0.0]),
            (center - u + v, [0.0, 0.0]),
        ];
        for (position, tex_coords) in corners {
            self.vertices.push(ModelVertex {
                position: position.into(),
                tex_coords,
                normal: normal.into(),
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

/// Axis aligned box centred at the origin with one quad (own normals) per face.
pub fn box_geometry(width: f32, height: f32, depth: f32) -> MeshData {
    let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
    // (normal, u, v) with u × v == normal
    let faces = [
        (Vector3::unit_x(), -Vector3::unit_z() * hz, Vector3::unit_y() * hy, hx),
        (-Vector3::unit_x(), Vector3::unit_z() * hz, Vector3::unit_y() * hy, hx),
        (Vector3::unit_y(), Vector3::unit_x() * hx, -Vector3::unit_z() * hz, hy),
        (-Vector3::unit_y(), Vector3::unit_x() * hx, Vector3::unit_z() * hz, hy),
        (Vector3::unit_z(), Vector3::unit_x() * hx, Vector3::unit_y() * hy, hz),
        (-Vector3::unit_z(), -Vector3::unit_x() * hx, Vector3::unit_y() * hy, hz),
    ];

    let mut data = MeshData::default();
    for (normal, u, v, distance) in faces {
        data.push_quad(normal * distance, u, v, normal);
    }
    data
}

/// Flat rectangle in the XY plane facing +Z.
pub fn plane_geometry(width: f32, height: f32) -> MeshData {
    let mut data = MeshData::default();
    data.push_quad(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::unit_x() * (width / 2.0),
        Vector3::unit_y() * (height / 2.0),
        Vector3::unit_z(),
    );
    data
}
