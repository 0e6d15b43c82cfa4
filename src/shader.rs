// shader.rs
use naga::{Binding, ResourceBinding, ShaderStage, TypeInner};

use crate::vertex::Attribute;

// VERTEX SHADER (offset, then MVP)
pub const VERTEX_SHADER: &str = r#"
struct EyeUniform {
    sv_mvp: mat4x4<f32>,
    sv_x_offset: f32,
    sv_y_offset: f32,
    sv_z_offset: f32,
};
@group(0) @binding(0) var<uniform> eye: EyeUniform;

struct VertexInput {
    @location(0) sv_position: vec3<f32>,
    @location(1) sv_color: vec4<f32>,
    @location(2) sv_uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(model: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.color = model.sv_color;
    out.uv = model.sv_uv;
    let offset = vec3<f32>(eye.sv_x_offset, eye.sv_y_offset, eye.sv_z_offset);
    out.clip_position = eye.sv_mvp * vec4<f32>(model.sv_position + offset, 1.0);
    return out;
}
"#;

// FRAGMENT SHADER (vertex color minus texel, not a multiply)
pub const FRAGMENT_SHADER: &str = r#"
@group(0) @binding(1) var f_texture: texture_2d<f32>;
@group(0) @binding(2) var f_sampler: sampler;

struct FragmentInput {
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    return in.color - textureSample(f_texture, f_sampler, in.uv);
}
"#;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub const UNIFORM_BLOCK: &str = "eye";
pub const MVP_UNIFORM: &str = "sv_mvp";
pub const OFFSET_UNIFORMS: [&str; 3] = ["sv_x_offset", "sv_y_offset", "sv_z_offset"];
pub const TEXTURE_UNIFORM: &str = "f_texture";
pub const SAMPLER_UNIFORM: &str = "f_sampler";

/// Parsed and validated WGSL, kept around to look names up in.
pub struct ShaderReflection {
    module: naga::Module,
}

impl ShaderReflection {
    /// Parses and validates `source`. The error string is ready for the log.
    pub fn compile(source: &str) -> Result<Self, String> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
            .validate(&module)
            .map_err(|e| e.to_string())?;
        Ok(Self { module })
    }

    /// `@location` of a vertex input, whether declared as a plain argument or a struct member.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        let entry = self.module.entry_points.iter().find(|ep| ep.stage == ShaderStage::Vertex)?;

        entry.function.arguments.iter().find_map(|arg| match (&arg.binding, &self.module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), _) if arg.name.as_deref() == Some(name) => Some(*location),
            (None, TypeInner::Struct { members, .. }) => members.iter().find_map(|member| match &member.binding {
                Some(Binding::Location { location, .. }) if member.name.as_deref() == Some(name) => Some(*location),
                _ => None,
            }),
            _ => None,
        })
    }

    /// Group/binding of a resource declared at module scope.
    pub fn resource_binding(&self, name: &str) -> Option<ResourceBinding> {
        self.module
            .global_variables
            .iter()
            .find(|(_, var)| var.name.as_deref() == Some(name))
            .and_then(|(_, var)| var.binding.clone())
    }

    /// Byte offset of `member` inside the uniform block bound as `block`.
    pub fn uniform_offset(&self, block: &str, member: &str) -> Option<u32> {
        let (_, var) = self.module.global_variables.iter().find(|(_, var)| var.name.as_deref() == Some(block))?;
        match &self.module.types[var.ty].inner {
            TypeInner::Struct { members, .. } => {
                members.iter().find(|m| m.name.as_deref() == Some(member)).map(|m| m.offset)
            }
            _ => None,
        }
    }
}

/// Locations and bindings resolved once after linking.
///
/// A name that fails to resolve is logged and left as `None`; callers fall back to the
/// slot the shader source declares, and the pipeline's own validation reports the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBindings {
    pub attributes: [Option<u32>; 3],
    pub uniform: Option<u32>,
    pub mvp_offset: Option<u32>,
    pub offsets: [Option<u32>; 3],
    pub texture: Option<u32>,
    pub sampler: Option<u32>,
}

impl ShaderBindings {
    pub fn resolve(vertex: Option<&ShaderReflection>, fragment: Option<&ShaderReflection>) -> Self {
        let attributes = Attribute::ALL.map(|attribute| {
            let location = vertex.and_then(|vs| vs.attribute_location(attribute.shader_name()));
            report(attribute.shader_name(), location)
        });

        let uniform = vertex.and_then(|vs| vs.resource_binding(UNIFORM_BLOCK)).map(|b| b.binding);
        let mvp_offset = vertex.and_then(|vs| vs.uniform_offset(UNIFORM_BLOCK, MVP_UNIFORM));
        let offsets = OFFSET_UNIFORMS.map(|name| report(name, vertex.and_then(|vs| vs.uniform_offset(UNIFORM_BLOCK, name))));

        let texture = fragment.and_then(|fs| fs.resource_binding(TEXTURE_UNIFORM)).map(|b| b.binding);
        let sampler = fragment.and_then(|fs| fs.resource_binding(SAMPLER_UNIFORM)).map(|b| b.binding);

        Self {
            attributes,
            uniform: report(UNIFORM_BLOCK, uniform),
            mvp_offset: report(MVP_UNIFORM, mvp_offset),
            offsets,
            texture: report(TEXTURE_UNIFORM, texture),
            sampler: report(SAMPLER_UNIFORM, sampler),
        }
    }

    /// Vertex locations with the declared defaults standing in for unresolved ones.
    pub fn attribute_locations(&self) -> [u32; 3] {
        [0, 1, 2].map(|i| self.attributes[i].unwrap_or(i as u32))
    }

    pub fn is_complete(&self) -> bool {
        self.attributes.iter().all(Option::is_some)
            && self.offsets.iter().all(Option::is_some)
            && self.uniform.is_some()
            && self.mvp_offset.is_some()
            && self.texture.is_some()
            && self.sampler.is_some()
    }
}

fn report(name: &str, resolved: Option<u32>) -> Option<u32> {
    if resolved.is_none() {
        log::error!("{name} not found");
    }
    resolved
}
