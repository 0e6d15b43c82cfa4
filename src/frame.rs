// frame.rs
// What one frame draws: the left eye into the left half, then the right eye into the right half.
use bytemuck::{Pod, Zeroable};

use crate::camera::{Eye, StereoCamera};
use crate::shader::{self, ShaderBindings};

/// Matches `EyeUniform` in the vertex shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct EyeUniform {
    pub mvp: [[f32; 4]; 4],
    pub x_offset: f32,
    pub y_offset: f32,
    pub z_offset: f32,
    pub _pad: f32, // 16-byte struct alignment
}

impl EyeUniform {
    // Offsets would place additional cubes, this scene has one at the origin
    pub fn new(mvp: glam::Mat4) -> Self {
        Self { mvp: mvp.to_cols_array_2d(), x_offset: 0.0, y_offset: 0.0, z_offset: 0.0, _pad: 0.0 }
    }

    /// Checks the reflected member offsets against this struct's layout, logging each mismatch.
    /// Members that did not resolve were already reported and are skipped.
    pub fn layout_matches(bindings: &ShaderBindings) -> bool {
        let expected = [
            (shader::MVP_UNIFORM, bindings.mvp_offset, std::mem::offset_of!(EyeUniform, mvp)),
            (shader::OFFSET_UNIFORMS[0], bindings.offsets[0], std::mem::offset_of!(EyeUniform, x_offset)),
            (shader::OFFSET_UNIFORMS[1], bindings.offsets[1], std::mem::offset_of!(EyeUniform, y_offset)),
            (shader::OFFSET_UNIFORMS[2], bindings.offsets[2], std::mem::offset_of!(EyeUniform, z_offset)),
        ];

        let mut matches = true;
        for (name, reflected, offset) in expected {
            if let Some(reflected) = reflected.filter(|r| *r as usize != offset) {
                log::error!("{name} is at byte {reflected} in the shader but {offset} in EyeUniform");
                matches = false;
            }
        }
        matches
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ViewportRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    /// The half of a `width` x `height` target that `eye` renders into.
    pub fn for_eye(eye: Eye, width: u32, height: u32) -> Self {
        let half = width / 2;
        match eye {
            Eye::Left => Self { x: 0, y: 0, width: half, height },
            Eye::Right => Self { x: half, y: 0, width: width - half, height },
        }
    }

    pub fn apply(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_viewport(self.x as f32, self.y as f32, self.width as f32, self.height as f32, 0.0, 1.0);
        render_pass.set_scissor_rect(self.x, self.y, self.width, self.height);
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EyePass {
    pub eye: Eye,
    pub viewport: ViewportRect,
    pub uniform: EyeUniform,
}

/// Both passes, in draw order.
pub fn plan(cameras: &StereoCamera, width: u32, height: u32) -> [EyePass; 2] {
    Eye::BOTH.map(|eye| EyePass {
        eye,
        viewport: ViewportRect::for_eye(eye, width, height),
        uniform: EyeUniform::new(cameras.eye(eye).mvp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::shader::ShaderReflection;

    fn bundled_bindings() -> ShaderBindings {
        let vs = ShaderReflection::compile(shader::VERTEX_SHADER).unwrap();
        let fs = ShaderReflection::compile(shader::FRAGMENT_SHADER).unwrap();
        ShaderBindings::resolve(Some(&vs), Some(&fs))
    }

    #[test]
    fn eye_uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<EyeUniform>(), 80);
        assert_eq!(std::mem::offset_of!(EyeUniform, x_offset), 64);
        assert_eq!(std::mem::offset_of!(EyeUniform, y_offset), 68);
        assert_eq!(std::mem::offset_of!(EyeUniform, z_offset), 72);
    }

    #[test]
    fn reflected_offsets_agree_with_eye_uniform() {
        assert!(EyeUniform::layout_matches(&bundled_bindings()));
    }

    #[test]
    fn shifted_shader_member_is_a_layout_mismatch() {
        let mut bindings = bundled_bindings();
        bindings.offsets[1] = Some(76);
        assert!(!EyeUniform::layout_matches(&bindings));

        let mut bindings = bundled_bindings();
        bindings.mvp_offset = Some(16);
        assert!(!EyeUniform::layout_matches(&bindings));
    }

    #[test]
    fn unresolved_members_are_not_a_mismatch() {
        let bindings = ShaderBindings { mvp_offset: None, offsets: [None; 3], ..bundled_bindings() };
        assert!(EyeUniform::layout_matches(&bindings));
    }

    #[test]
    fn window_splits_into_two_square_halves() {
        let left = ViewportRect::for_eye(Eye::Left, config::WINDOW_WIDTH, config::WINDOW_HEIGHT);
        let right = ViewportRect::for_eye(Eye::Right, config::WINDOW_WIDTH, config::WINDOW_HEIGHT);

        assert_eq!(left, ViewportRect { x: 0, y: 0, width: 400, height: 400 });
        assert_eq!(right, ViewportRect { x: 400, y: 0, width: 400, height: 400 });
    }

    #[test]
    fn odd_widths_still_cover_the_whole_target() {
        let left = ViewportRect::for_eye(Eye::Left, 801, 400);
        let right = ViewportRect::for_eye(Eye::Right, 801, 400);
        assert_eq!(left.width + right.width, 801);
        assert_eq!(right.x, left.width);
    }

    #[test]
    fn left_eye_is_drawn_first() {
        let passes = plan(&StereoCamera::new(), config::WINDOW_WIDTH, config::WINDOW_HEIGHT);
        assert_eq!(passes.map(|p| p.eye), [Eye::Left, Eye::Right]);
        assert!(passes[0].viewport.x < passes[1].viewport.x);
    }

    #[test]
    fn eyes_differ_only_in_mvp() {
        let mut cameras = StereoCamera::new();
        cameras.update(None);
        let [left, right] = plan(&cameras, config::WINDOW_WIDTH, config::WINDOW_HEIGHT);

        assert_ne!(left.uniform.mvp, right.uniform.mvp);
        assert_eq!(left.uniform.mvp, cameras.eye(Eye::Left).mvp.to_cols_array_2d());
        assert_eq!(right.uniform.mvp, cameras.eye(Eye::Right).mvp.to_cols_array_2d());
        assert_eq!(
            EyeUniform { mvp: right.uniform.mvp, ..left.uniform },
            right.uniform,
        );
    }

    #[test]
    fn offsets_are_always_zero() {
        let mut cameras = StereoCamera::new();
        for _ in 0..5 {
            cameras.update(Some(config::ROTATION_STEP));
            for pass in plan(&cameras, config::WINDOW_WIDTH, config::WINDOW_HEIGHT) {
                assert_eq!([pass.uniform.x_offset, pass.uniform.y_offset, pass.uniform.z_offset], [0.0; 3]);
            }
        }
    }
}
