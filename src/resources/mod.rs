//! All logic for loading models and images from external files.
//!
//! Everything here produces CPU-side data only; GPU resources are created when the
//! scene is first written to the buffers.

use std::sync::Arc;

use anyhow::Context as _;
use base64::Engine as _;
use cgmath::Quaternion;
use log::{info, warn};

use crate::data_structures::{
    geometry::MeshData,
    instance::Instance,
    model::{MaterialData, ModelVertex},
    scene_graph::{ContainerNode, MeshNode, SceneNode},
};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("cannot read the page location: {:?}", e))?;
    let base = reqwest::Url::parse(&href)?;
    Ok(base.join(file_name)?)
}

/// Where a relative asset lives on disk: as given if it exists, otherwise under `./assets/`.
#[cfg(not(target_arch = "wasm32"))]
async fn resolve_path(file_name: &str) -> std::path::PathBuf {
    let path = std::path::Path::new(file_name);
    if path.is_absolute() || tokio::fs::try_exists(path).await.unwrap_or(false) {
        path.to_path_buf()
    } else {
        std::path::Path::new("./").join("assets").join(file_name)
    }
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = resolve_path(file_name).await;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?
    };

    Ok(data)
}

/// Fetch and parse a `.glb` (or `.gltf`) file into a detached scene subtree.
pub async fn load_model_glb(file_name: &str) -> anyhow::Result<Box<dyn SceneNode>> {
    let data = load_binary(file_name)
        .await
        .with_context(|| format!("failed to fetch {}", file_name))?;
    load_model_from_slice(&data, file_name)
        .await
        .with_context(|| format!("failed to parse {}", file_name))
}

/// Parse glTF data that is already in memory.
///
/// `file_name` names the root node and is the base for external buffer and image URIs.
/// The returned root is always a container, so its transform is free for the caller.
pub async fn load_model_from_slice(
    data: &[u8],
    file_name: &str,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let gltf = gltf::Gltf::from_slice(data)?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .clone()
                    .context("buffer refers to a missing GLB binary chunk")?;
                buffer_data.push(blob);
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_uri(file_name, uri).await?);
            }
        }
    }

    // Images that fail to decode are dropped; their materials fall back to the plain colour
    let mut images: Vec<Option<Arc<image::RgbaImage>>> = Vec::new();
    for image in gltf.images() {
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => buffer_data
                .get(view.buffer().index())
                .and_then(|buffer| buffer.get(view.offset()..view.offset() + view.length()))
                .context("image buffer view out of range")
                .and_then(|bytes| decode_image(bytes, Some(mime_type))),
            gltf::image::Source::Uri { uri, mime_type } => match load_uri(file_name, uri).await {
                Ok(bytes) => decode_image(&bytes, mime_type),
                Err(e) => Err(e),
            },
        };
        match decoded {
            Ok(rgba) => images.push(Some(Arc::new(rgba))),
            Err(e) => {
                warn!("image {} of {} skipped: {:#}", image.index(), file_name, e);
                images.push(None);
            }
        }
    }

    let materials: Vec<MaterialData> = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let texture = pbr
                .base_color_texture()
                .and_then(|info| images.get(info.texture().source().index()).cloned())
                .flatten();
            MaterialData {
                name: material.name().unwrap_or("material").to_string(),
                base_color: pbr.base_color_factor(),
                texture,
            }
        })
        .collect();

    let scenes: Vec<gltf::Scene> = match gltf.default_scene() {
        Some(scene) => vec![scene],
        None => gltf.scenes().collect(),
    };
    let mut root = ContainerNode::new(file_name);
    for scene in scenes {
        for node in scene.nodes() {
            root.add_child(to_scene_node(node, &buffer_data, &materials));
        }
    }
    info!(
        "parsed {}: {} top-level nodes, {} materials",
        file_name,
        root.children.len(),
        materials.len()
    );

    Ok(Box::new(root))
}

async fn load_uri(file_name: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    if let Some(data) = uri.strip_prefix("data:") {
        return decode_data_uri(data);
    }
    let path = match file_name.rfind('/') {
        Some(idx) => format!("{}/{}", &file_name[..idx], uri),
        None => uri.to_string(),
    };
    load_binary(&path)
        .await
        .with_context(|| format!("failed to fetch {}", path))
}

/// Payload of a `data:[<mime>];base64,<payload>` URI, without the `data:` prefix.
fn decode_data_uri(data: &str) -> anyhow::Result<Vec<u8>> {
    let (header, payload) = data
        .split_once(',')
        .context("data URI without a payload")?;
    if !header.ends_with(";base64") {
        anyhow::bail!("only base64 data URIs are supported, got {:?}", header);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("malformed base64 in data URI")
}

fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> anyhow::Result<image::RgbaImage> {
    let image = match mime_type.and_then(image::ImageFormat::from_mime_type) {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    Ok(image.to_rgba8())
}

fn to_scene_node(
    node: gltf::scene::Node,
    buffers: &[Vec<u8>],
    materials: &[MaterialData],
) -> Box<dyn SceneNode> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));

    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mut parts: Vec<MeshNode> = mesh
                .primitives()
                .enumerate()
                .filter_map(|(idx, primitive)| {
                    read_primitive(&primitive, buffers, materials, &format!("{}#{}", name, idx))
                })
                .collect();
            if parts.len() == 1 {
                let mut part = parts.remove(0);
                part.rename(&name);
                Box::new(part)
            } else {
                let mut container = ContainerNode::new(&name);
                for part in parts {
                    container.add_child(Box::new(part));
                }
                Box::new(container)
            }
        }
        None => Box::new(ContainerNode::new(&name)),
    };

    let (translation, rotation, scale) = node.transform().decomposed();
    scene_node.set_local_transform(Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    });
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers, materials));
    }

    scene_node
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    materials: &[MaterialData],
    name: &str,
) -> Option<MeshNode> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        warn!("{}: {:?} primitives are not supported", name, primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        warn!("{}: primitive without positions skipped", name);
        return None;
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            tex_coords: [0.0, 0.0],
            normal: [0.0, 1.0, 0.0],
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        vertices
            .iter_mut()
            .zip(normals)
            .for_each(|(vertex, normal)| vertex.normal = normal);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, tex_coords)| vertex.tex_coords = tex_coords);
    }
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    let material = primitive
        .material()
        .index()
        .and_then(|idx| materials.get(idx))
        .cloned()
        .unwrap_or_default();

    Some(MeshNode::new(name, MeshData { vertices, indices }, material))
}
