// config.rs

pub const WINDOW_TITLE: &str = "Introduction to wgpu Texturing";
pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 400;

// --- Assets ---
// See assets/textures/ for the bundled grid
pub const TEXTURE_PATH: &str = "assets/textures/grid_wip.tga";

// --- Cameras ---
pub const FOV_Y: f32 = 45.0;
pub const ASPECT_RATIO: f32 = 4.0 / 3.0; // kept at 4:3 even though each eye is square
pub const Z_NEAR: f32 = 5.0;
pub const Z_FAR: f32 = 100.0;
pub const LEFT_EYE: [f32; 3] = [-4.0, 0.0, 10.0];
pub const RIGHT_EYE: [f32; 3] = [4.0, 0.0, 10.0];
pub const LOOK_TARGET: [f32; 3] = [0.0, 0.0, -10.5];

// Radians per frame while an arrow key is held
pub const ROTATION_STEP: f32 = 0.0005;

// --- Rendering ---
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// What the window's drawing context is asked for at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSettings {
    pub depth_bits: u8,
    pub antialiasing_level: u32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self { depth_bits: 24, antialiasing_level: 4 }
    }
}

impl ContextSettings {
    pub fn depth_format(&self) -> wgpu::TextureFormat {
        match self.depth_bits {
            0..=16 => wgpu::TextureFormat::Depth16Unorm,
            17..=24 => wgpu::TextureFormat::Depth24Plus,
            _ => wgpu::TextureFormat::Depth32Float,
        }
    }

    // wgpu only guarantees 1x and 4x for render attachments
    pub fn sample_count(&self) -> u32 {
        if self.antialiasing_level >= 4 { 4 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(16, wgpu::TextureFormat::Depth16Unorm)]
    #[case(24, wgpu::TextureFormat::Depth24Plus)]
    #[case(32, wgpu::TextureFormat::Depth32Float)]
    fn depth_bits_pick_depth_format(#[case] depth_bits: u8, #[case] expected: wgpu::TextureFormat) {
        let settings = ContextSettings { depth_bits, ..ContextSettings::default() };
        assert_eq!(settings.depth_format(), expected);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(2, 1)]
    #[case(4, 4)]
    #[case(8, 4)]
    fn antialiasing_level_maps_to_supported_sample_count(#[case] level: u32, #[case] expected: u32) {
        let settings = ContextSettings { antialiasing_level: level, ..ContextSettings::default() };
        assert_eq!(settings.sample_count(), expected);
    }
}
