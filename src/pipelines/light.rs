use wgpu::util::DeviceExt;

use crate::data_structures::{light::DirectionalLight, texture};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    view_proj: [[f32; 4]; 4],
    // xyz is the unit vector towards the light, w unused
    direction: [f32; 4],
    // linear colour times intensity
    color: [f32; 4],
    // x: size of one shadow texel in uv, y: 1.0 if the light casts shadows
    shadow: [f32; 4],
}

impl From<&DirectionalLight> for LightUniform {
    fn from(light: &DirectionalLight) -> Self {
        let [r, g, b] = light.radiance();
        Self {
            view_proj: light.view_proj().into(),
            direction: light.direction().extend(0.0).into(),
            color: [r, g, b, 1.0],
            shadow: [
                1.0 / light.shadow.map_size.max(1) as f32,
                if light.cast_shadow { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }
}

/// Light uniform and shadow map plus the two bind groups exposing them.
///
/// `bind_group` is what the lit pipeline reads (uniform, shadow map, comparison sampler).
/// `shadow_bind_group` only carries the uniform, since the shadow pass writes the map.
#[derive(Debug)]
pub struct LightResources {
    pub buffer: wgpu::Buffer,
    pub shadow_map: texture::Texture,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, light: &DirectionalLight) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[LightUniform::from(light)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let shadow_bind_group_layout = mk_shadow_bind_group_layout(device);
        let shadow_map = texture::Texture::create_shadow_map(device, light.shadow.map_size);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, &shadow_map);
        let shadow_bind_group = mk_shadow_bind_group(device, &shadow_bind_group_layout, &buffer);

        Self {
            buffer,
            shadow_map,
            bind_group,
            bind_group_layout,
            shadow_bind_group,
            shadow_bind_group_layout,
        }
    }

    /// Upload `light`, recreating the shadow map when its size changed.
    pub fn configure(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, light: &DirectionalLight) {
        let size = light.shadow.map_size.max(1);
        if self.shadow_map.texture.width() != size {
            self.shadow_map = texture::Texture::create_shadow_map(device, size);
            self.bind_group = mk_bind_group(
                device,
                &self.bind_group_layout,
                &self.buffer,
                &self.shadow_map,
            );
        }
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::cast_slice(&[LightUniform::from(light)]),
        );
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_shadow_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("shadow_bind_group_layout"),
    })
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow_map: &texture::Texture,
) -> wgpu::BindGroup {
    let sampler = match &shadow_map.sampler {
        Some(sampler) => sampler.clone(),
        None => device.create_sampler(&wgpu::SamplerDescriptor {
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        }),
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}

fn mk_shadow_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("shadow_bind_group"),
    })
}
