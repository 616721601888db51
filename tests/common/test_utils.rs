#![allow(dead_code)]

use std::sync::{Mutex, Once};

use cgmath::{InnerSpace, Quaternion, Vector3};
use log::{Level, LevelFilter, Log, Metadata, Record};
use scene_walker::data_structures::{
    geometry::{MeshData, box_geometry},
    model::MaterialData,
    scene_graph::{ContainerNode, MeshNode, SceneNode},
};

pub const EPSILON: f32 = 1e-5;

pub fn assert_vec_eq(actual: Vector3<f32>, expected: Vector3<f32>) {
    assert!(
        (actual - expected).magnitude() < EPSILON,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

/// Quaternions `q` and `-q` describe the same rotation.
pub fn assert_rotation_eq(actual: Quaternion<f32>, expected: Quaternion<f32>) {
    let same = (actual - expected).magnitude() < EPSILON;
    let negated = (actual + expected).magnitude() < EPSILON;
    assert!(same || negated, "expected {:?}, got {:?}", expected, actual);
}

/// Face normal of triangle `i` from its winding.
pub fn face_normal(data: &MeshData, i: usize) -> Vector3<f32> {
    let corners = data
        .indices
        .get(i * 3..i * 3 + 3)
        .expect("triangle index in range");
    let [a, b, c] = [0, 1, 2].map(|k| {
        let vertex = data
            .vertices
            .get(corners[k] as usize)
            .expect("vertex index in range");
        Vector3::from(vertex.position)
    });
    (b - a).cross(c - a).normalize()
}

/// Records every log line emitted while a test binary runs.
pub struct CapturedLogs {
    records: Mutex<Vec<(Level, String)>>,
}

impl CapturedLogs {
    /// Messages at `level` that contain `needle`.
    pub fn matching(&self, level: Level, needle: &str) -> Vec<String> {
        self.records
            .lock()
            .expect("log capture poisoned")
            .iter()
            .filter(|(lvl, message)| *lvl == level && message.contains(needle))
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Log for CapturedLogs {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURED: CapturedLogs = CapturedLogs {
    records: Mutex::new(Vec::new()),
};

/// Install the capturing logger once per test binary. Tests running in parallel share it,
/// so filter by something unique to the test.
pub fn capture_logs() -> &'static CapturedLogs {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&CAPTURED).expect("no other logger installed");
        log::set_max_level(LevelFilter::Trace);
    });
    &CAPTURED
}

/// A loaded-model stand-in: a container with one mesh and one nested mesh.
pub fn fake_model() -> Box<dyn SceneNode> {
    let mut root = ContainerNode::new("model.glb");
    let mut wheel_group = ContainerNode::new("wheels");
    wheel_group.add_child(Box::new(MeshNode::new(
        "wheel",
        box_geometry(1.0, 1.0, 1.0),
        MaterialData::default(),
    )));
    root.add_child(Box::new(MeshNode::new(
        "body",
        box_geometry(2.0, 1.0, 4.0),
        MaterialData::from_hex("paint", 0xff0000),
    )));
    root.add_child(Box::new(wheel_group));
    Box::new(root)
}

/// Wrap a JSON document and a binary payload into a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

/// One triangle in the XY plane facing +Z: positions, normals and u16 indices (78 bytes).
pub fn triangle_bin() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let normals: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bin = Vec::new();
    for vertex in positions.iter().chain(normals.iter()) {
        for component in vertex {
            bin.extend_from_slice(&component.to_le_bytes());
        }
    }
    for index in indices {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    bin
}

const TRIANGLE_BUFFERS: &str = r#"
    "buffers": [{ "byteLength": 78 }],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
        { "buffer": 0, "byteOffset": 36, "byteLength": 36, "target": 34962 },
        { "buffer": 0, "byteOffset": 72, "byteLength": 6, "target": 34963 }
    ],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
          "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
        { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
        { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ],
    "materials": [
        { "name": "red", "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }
    ]
"#;

/// `root` (translated by (1, 2, 3)) with one child `tri` holding a red triangle.
pub fn triangle_glb() -> Vec<u8> {
    let json = format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scene": 0,
        "scenes": [{{ "nodes": [0] }}],
        "nodes": [
            {{ "name": "root", "translation": [1.0, 2.0, 3.0], "children": [1] }},
            {{ "name": "tri", "mesh": 0 }}
        ],
        "meshes": [{{
            "name": "triangle",
            "primitives": [{{ "attributes": {{ "POSITION": 0, "NORMAL": 1 }}, "indices": 2, "material": 0 }}]
        }}],
        {}
    }}"#,
        TRIANGLE_BUFFERS
    );
    glb(&json, &triangle_bin())
}

/// A single node whose mesh has two primitives; the second has no normals or material.
pub fn two_primitive_glb() -> Vec<u8> {
    let json = format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scenes": [{{ "nodes": [0] }}],
        "nodes": [{{ "name": "pair", "mesh": 0 }}],
        "meshes": [{{
            "primitives": [
                {{ "attributes": {{ "POSITION": 0, "NORMAL": 1 }}, "indices": 2, "material": 0 }},
                {{ "attributes": {{ "POSITION": 0 }} }}
            ]
        }}],
        {}
    }}"#,
        TRIANGLE_BUFFERS
    );
    glb(&json, &triangle_bin())
}

/// The red triangle as a JSON glTF whose only buffer is embedded as `buffer_uri`.
pub fn triangle_gltf_with_buffer_uri(buffer_uri: &str) -> Vec<u8> {
    let buffers = TRIANGLE_BUFFERS.replace(
        r#""buffers": [{ "byteLength": 78 }]"#,
        &format!(r#""buffers": [{{ "byteLength": 78, "uri": "{}" }}]"#, buffer_uri),
    );
    format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scenes": [{{ "nodes": [0] }}],
        "nodes": [{{ "name": "tri", "mesh": 0 }}],
        "meshes": [{{
            "primitives": [{{ "attributes": {{ "POSITION": 0, "NORMAL": 1 }}, "indices": 2, "material": 0 }}]
        }}],
        {}
    }}"#,
        buffers
    )
    .into_bytes()
}
