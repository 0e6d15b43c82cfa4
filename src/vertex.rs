// vertex.rs
// Positions, colors and UVs sit back to back in one buffer, one vertex buffer slot per attribute.
use std::ops::Range;

use crate::cube::{self, Cube};

const FLOAT_SIZE: wgpu::BufferAddress = std::mem::size_of::<f32>() as wgpu::BufferAddress;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Color,
    Uv,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Attribute::Position, Attribute::Color, Attribute::Uv];

    /// Name of the matching vertex input in the vertex shader.
    pub fn shader_name(self) -> &'static str {
        match self {
            Attribute::Position => "sv_position",
            Attribute::Color => "sv_color",
            Attribute::Uv => "sv_uv",
        }
    }

    pub fn components(self) -> wgpu::BufferAddress {
        match self {
            Attribute::Position => 3,
            Attribute::Color => 4,
            Attribute::Uv => 2,
        }
    }

    fn element_count(self) -> wgpu::BufferAddress {
        let count = match self {
            Attribute::Position => cube::VERTICES,
            Attribute::Color => cube::COLORS,
            Attribute::Uv => cube::UVS,
        };
        count as wgpu::BufferAddress
    }

    pub fn format(self) -> wgpu::VertexFormat {
        match self {
            Attribute::Position => wgpu::VertexFormat::Float32x3,
            Attribute::Color => wgpu::VertexFormat::Float32x4,
            Attribute::Uv => wgpu::VertexFormat::Float32x2,
        }
    }

    pub fn stride(self) -> wgpu::BufferAddress {
        self.components() * FLOAT_SIZE
    }

    /// Byte range of this attribute's array inside the shared vertex buffer.
    pub fn region(self) -> Range<wgpu::BufferAddress> {
        let mut start = 0;
        for attribute in Self::ALL {
            let len = attribute.element_count() * attribute.stride();
            if attribute == self {
                return start..start + len;
            }
            start += len;
        }
        unreachable!("every attribute is listed in Attribute::ALL")
    }

    pub fn data(self, cube: &Cube) -> &[f32] {
        match self {
            Attribute::Position => cube.positions(),
            Attribute::Color => cube.colors(),
            Attribute::Uv => cube.uvs(),
        }
    }
}

/// Size of the vertex buffer holding all three attribute arrays.
pub fn vertex_buffer_size() -> wgpu::BufferAddress {
    Attribute::Uv.region().end
}

/// Per-attribute buffer layouts, slot `i` reads `Attribute::ALL[i]` at `locations[i]`.
pub struct VertexLayouts {
    attributes: [[wgpu::VertexAttribute; 1]; 3],
}

impl VertexLayouts {
    pub fn new(locations: [u32; 3]) -> Self {
        let attributes = std::array::from_fn(|i| {
            [wgpu::VertexAttribute {
                offset: 0,
                shader_location: locations[i],
                format: Attribute::ALL[i].format(),
            }]
        });
        Self { attributes }
    }

    pub fn buffers(&self) -> [wgpu::VertexBufferLayout<'_>; 3] {
        std::array::from_fn(|i| wgpu::VertexBufferLayout {
            array_stride: Attribute::ALL[i].stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes[i],
        })
    }
}

/// One queue write per attribute array, in buffer order.
pub fn vertex_uploads(cube: &Cube) -> [(wgpu::BufferAddress, &[u8]); 3] {
    Attribute::ALL.map(|attribute| (attribute.region().start, bytemuck::cast_slice(attribute.data(cube))))
}
