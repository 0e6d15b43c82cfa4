// cube.rs
// One cube, six faces of four vertices each. Faces wind counter-clockwise seen from outside.

pub const FACES: usize = 6;
pub const VERTICES: usize = 24;
pub const COLORS: usize = 24;
pub const UVS: usize = 24;
pub const TRIANGLES: usize = 12;
pub const INDEX_COUNT: u32 = (TRIANGLES * 3) as u32;

// Floats in one face's UV quad
const QUAD_UV_FLOATS: usize = 4 * 2;

#[rustfmt::skip]
pub const POSITIONS: [f32; VERTICES * 3] = [
    // Front
    -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,
    // Top
    -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,   1.0,  1.0, -1.0,  -1.0,  1.0, -1.0,
    // Back
     1.0, -1.0, -1.0,  -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,   1.0,  1.0, -1.0,
    // Bottom
    -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,   1.0, -1.0,  1.0,  -1.0, -1.0,  1.0,
    // Left
    -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,
    // Right
     1.0, -1.0,  1.0,   1.0, -1.0, -1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,
];

#[rustfmt::skip]
pub const COLORS_RGBA: [f32; COLORS * 4] = [
    // Front
    1.0, 0.0, 0.0, 1.0,   1.0, 0.0, 0.0, 1.0,   1.0, 0.0, 0.0, 1.0,   1.0, 0.0, 0.0, 1.0,
    // Top
    0.0, 1.0, 0.0, 1.0,   0.0, 1.0, 0.0, 1.0,   0.0, 1.0, 0.0, 1.0,   0.0, 1.0, 0.0, 1.0,
    // Back
    0.0, 0.0, 1.0, 1.0,   0.0, 0.0, 1.0, 1.0,   0.0, 0.0, 1.0, 1.0,   0.0, 0.0, 1.0, 1.0,
    // Bottom
    1.0, 1.0, 0.0, 1.0,   1.0, 1.0, 0.0, 1.0,   1.0, 1.0, 0.0, 1.0,   1.0, 1.0, 0.0, 1.0,
    // Left
    0.0, 1.0, 1.0, 1.0,   0.0, 1.0, 1.0, 1.0,   0.0, 1.0, 1.0, 1.0,   0.0, 1.0, 1.0, 1.0,
    // Right
    1.0, 0.0, 1.0, 1.0,   1.0, 0.0, 1.0, 1.0,   1.0, 0.0, 1.0, 1.0,   1.0, 0.0, 1.0, 1.0,
];

/// Only the front face is authored, `Cube::new` copies it onto the other five.
#[rustfmt::skip]
const AUTHORED_UVS: [f32; UVS * 2] = {
    let mut uvs = [0.0; UVS * 2];
    let quad = [0.0, 1.0,  1.0, 1.0,  1.0, 0.0,  0.0, 0.0];
    let mut i = 0;
    while i < QUAD_UV_FLOATS {
        uvs[i] = quad[i];
        i += 1;
    }
    uvs
};

#[rustfmt::skip]
pub const INDICES: [u32; TRIANGLES * 3] = [
     0,  1,  2,   2,  3,  0, // Front
     4,  5,  6,   6,  7,  4, // Top
     8,  9, 10,  10, 11,  8, // Back
    12, 13, 14,  14, 15, 12, // Bottom
    16, 17, 18,  18, 19, 16, // Left
    20, 21, 22,  22, 23, 20, // Right
];

/// The cube's vertex attribute arrays, owned by the renderer and never written after `new`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    positions: [f32; VERTICES * 3],
    colors: [f32; COLORS * 4],
    uvs: [f32; UVS * 2],
}

impl Cube {
    pub fn new() -> Self {
        let mut uvs = AUTHORED_UVS;
        replicate_first_face(&mut uvs);
        Self { positions: POSITIONS, colors: COLORS_RGBA, uvs }
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    pub fn indices(&self) -> &'static [u32] {
        &INDICES
    }
}

impl Default for Cube {
    fn default() -> Self {
        Self::new()
    }
}

fn replicate_first_face(uvs: &mut [f32; UVS * 2]) {
    let (first, rest) = uvs.split_at_mut(QUAD_UV_FLOATS);
    debug_assert_eq!(rest.len(), (FACES - 1) * QUAD_UV_FLOATS);
    for face in rest.chunks_exact_mut(QUAD_UV_FLOATS) {
        face.copy_from_slice(first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn uv_quad_is_replicated_onto_every_face() {
        let cube = Cube::new();
        let authored = &AUTHORED_UVS[..QUAD_UV_FLOATS];

        let faces: Vec<&[f32]> = cube.uvs().chunks_exact(QUAD_UV_FLOATS).collect();
        assert_eq!(faces.len(), FACES);
        for face in faces {
            assert_eq!(face, authored);
        }
    }

    #[test]
    fn only_the_first_face_is_authored() {
        assert!(AUTHORED_UVS[QUAD_UV_FLOATS..].iter().all(|uv| *uv == 0.0));
    }

    #[test]
    fn indices_reference_existing_vertices() {
        assert_eq!(INDICES.len(), INDEX_COUNT as usize);
        assert!(INDICES.iter().all(|i| (*i as usize) < VERTICES));
    }

    #[test]
    fn triangles_face_outwards() {
        let cube = Cube::new();
        let vertex = |i: u32| {
            let p = &cube.positions()[i as usize * 3..i as usize * 3 + 3];
            Vec3::new(p[0], p[1], p[2])
        };

        for triangle in INDICES.chunks_exact(3) {
            let (a, b, c) = (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2]));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "triangle {triangle:?} winds inwards");
        }
    }
}
