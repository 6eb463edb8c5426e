use std::fmt;

use image::RgbImage;

use super::Color;
use crate::util::{Vector2f, Vector3f};

/// Anything able to give a color for a uv coordinate.
pub trait TextureSampler {
    fn sample(&self, uv: Vector2f) -> Color;
}

/// Texture with the same color everywhere. Used for models without a diffuse map.
pub struct SolidColor(pub Color);

impl TextureSampler for SolidColor {
    fn sample(&self, _uv: Vector2f) -> Color {
        return self.0;
    }
}

/// uv is normalized, (0, 0) is the first pixel of the image buffer. Coordinates outside of [0, 1]
/// are clamped to the border texel.
impl TextureSampler for RgbImage {
    fn sample(&self, uv: Vector2f) -> Color {
        // Nearest texel, picked by flooring.
        fn to_texel(t: f32, size: u32) -> u32 {
            let texel = (t * size as f32).floor();
            return texel.clamp(0.0, (size.max(1) - 1) as f32) as u32;
        }
        let pixel = self.get_pixel(to_texel(uv.x, self.width()), to_texel(uv.y, self.height()));
        return Color { r: pixel.0[0], g: pixel.0[1], b: pixel.0[2] };
    }
}

/// Triangle of a model: indices of its vertex positions and of the uv coordinates of its corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub vertices: [usize; 3],
    pub uvs: [usize; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    VertexIndexOutOfRange { face: usize, index: usize, count: usize },
    UvIndexOutOfRange { face: usize, index: usize, count: usize },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::VertexIndexOutOfRange { face, index, count } => write!(
                f,
                "face {} references vertex {}, but model has {} vertices",
                face, index, count
            ),
            ModelError::UvIndexOutOfRange { face, index, count } => write!(
                f,
                "face {} references uv {}, but model has {} uvs",
                face, index, count
            ),
        }
    }
}

impl std::error::Error for ModelError {}

/// Parsed geometry plus the texture. Load once, render many: nothing mutates it after construction.
pub struct Model {
    vertices: Vec<Vector3f>,
    uvs: Vec<Vector2f>,
    faces: Vec<Face>,
    texture: Box<dyn TextureSampler>,
}

impl Model {
    /// Builds the model, checking that every face index points into the vertex and uv lists.
    pub fn new(
        vertices: Vec<Vector3f>,
        uvs: Vec<Vector2f>,
        faces: Vec<Face>,
        texture: Box<dyn TextureSampler>,
    ) -> Result<Model, ModelError> {
        for (i, face) in faces.iter().enumerate() {
            for &index in &face.vertices {
                if index >= vertices.len() {
                    return Err(ModelError::VertexIndexOutOfRange { face: i, index, count: vertices.len() });
                }
            }
            for &index in &face.uvs {
                if index >= uvs.len() {
                    return Err(ModelError::UvIndexOutOfRange { face: i, index, count: uvs.len() });
                }
            }
        }

        return Ok(Model { vertices, uvs, faces, texture });
    }

    pub fn vertex_count(&self) -> usize {
        return self.vertices.len();
    }

    pub fn face_count(&self) -> usize {
        return self.faces.len();
    }

    /// Panics on an out of range index.
    pub fn vertex(&self, i: usize) -> Vector3f {
        assert!(i < self.vertices.len(), "vertex index {} out of range ({} vertices)", i, self.vertices.len());
        return self.vertices[i];
    }

    /// Vertex indices of a face. Panics on an out of range index.
    pub fn face(&self, i: usize) -> [usize; 3] {
        assert!(i < self.faces.len(), "face index {} out of range ({} faces)", i, self.faces.len());
        return self.faces[i].vertices;
    }

    /// Positions of the three face vertices in object space.
    pub fn face_positions(&self, i: usize) -> [Vector3f; 3] {
        let [a, b, c] = self.face(i);
        return [self.vertices[a], self.vertices[b], self.vertices[c]];
    }

    /// uv of one corner of a face. Panics on out of range indices.
    pub fn uv(&self, face: usize, corner: usize) -> Vector2f {
        assert!(face < self.faces.len(), "face index {} out of range ({} faces)", face, self.faces.len());
        assert!(corner < 3, "corner index {} out of range", corner);
        return self.uvs[self.faces[face].uvs[corner]];
    }

    pub fn face_uvs(&self, face: usize) -> [Vector2f; 3] {
        return [self.uv(face, 0), self.uv(face, 1), self.uv(face, 2)];
    }

    pub fn sample(&self, uv: Vector2f) -> Color {
        return self.texture.sample(uv);
    }

    pub fn texture(&self) -> &dyn TextureSampler {
        return self.texture.as_ref();
    }
}
