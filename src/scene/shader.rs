use std::fmt;

use log::trace;

use super::buffer::DepthBuffer;
use super::model::Model;
use super::transform::{Camera, CameraError, ScreenTransform};
use super::{draw_line, draw_triangle, Color, Fill, PixelTarget, ScreenVertex};
use crate::util::{normalize, MathError, Vector3f};

/// How faces that reach the rasterizer are colored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    /// Only edges of every face, no culling and no depth test.
    Wireframe(Color),
    /// One color per face, darkened by the face intensity.
    Flat(Color),
    /// Model texture, darkened by the face intensity.
    Textured,
}

/// Frame constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub camera: Camera,
    /// Direction towards the light, doesn't need to be normalized.
    pub light_direction: Vector3f,
    pub shading: Shading,
}

/// What happened to the faces of a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub faces_total: usize,
    /// Faces with non-positive light intensity.
    pub faces_culled: usize,
    /// Faces with zero area, a vertex behind the camera or one projected absurdly far off the target.
    pub faces_skipped: usize,
    pub faces_drawn: usize,
    /// Fragments that passed the depth test. Not counted in wireframe mode.
    pub pixels_written: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Light direction can't be normalized.
    InvalidLightDirection(MathError),
    InvalidCamera(CameraError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidLightDirection(e) => write!(f, "invalid light direction: {}", e),
            RenderError::InvalidCamera(e) => write!(f, "invalid camera: {}", e),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::InvalidLightDirection(e) => Some(e),
            RenderError::InvalidCamera(e) => Some(e),
        }
    }
}

/// Flat light intensity of a face: unit face normal dotted with a unit light direction.
/// Normal follows the winding of the vertices. None for faces with zero area.
pub fn face_intensity(positions: [Vector3f; 3], light_direction: Vector3f) -> Option<f32> {
    let face_normal = (positions[1] - positions[0]).cross(&(positions[2] - positions[0]));
    let face_normal = normalize(face_normal).ok()?;
    return Some(face_normal.dot(&light_direction));
}

/// Projected coordinates further than this from the origin mean the vertex is practically on the
/// camera plane. Such faces are dropped instead of rasterized.
const GUARD_BAND: u32 = 1 << 24;

fn inside_guard_band(v: &ScreenVertex) -> bool {
    return v.x.unsigned_abs() <= GUARD_BAND && v.y.unsigned_abs() <= GUARD_BAND && v.z.is_finite();
}

/// Projects all three vertices, None if any of them is behind the camera or outside the guard band.
fn project_face(transform: &ScreenTransform, positions: [Vector3f; 3]) -> Option<[ScreenVertex; 3]> {
    let screen = [
        transform.project(positions[0])?,
        transform.project(positions[1])?,
        transform.project(positions[2])?,
    ];
    if !screen.iter().all(inside_guard_band) {
        return None;
    }
    return Some(screen);
}

/// Renders every face of the model into target.
///
/// The depth buffer is cleared (and resized to the target if needed) before the first face, so the
/// caller only has to keep it alive between frames. Pixels outside of the target are clipped.
pub fn render_frame<T: PixelTarget + ?Sized>(
    model: &Model,
    target: &mut T,
    depth: &mut DepthBuffer,
    params: &RenderParams,
) -> Result<FrameStats, RenderError> {
    let light_direction = normalize(params.light_direction).map_err(RenderError::InvalidLightDirection)?;
    let transform = ScreenTransform::new(&params.camera).map_err(RenderError::InvalidCamera)?;

    if depth.width() != target.width() || depth.height() != target.height() {
        depth.resize(target.width(), target.height());
    } else {
        depth.clear();
    }

    let mut stats = FrameStats {
        faces_total: model.face_count(),
        ..Default::default()
    };

    for i in 0..model.face_count() {
        let positions = model.face_positions(i);

        if let Shading::Wireframe(color) = params.shading {
            let screen = match project_face(&transform, positions) {
                Some(screen) => screen,
                None => {
                    stats.faces_skipped += 1;
                    continue;
                }
            };
            for j in 0..3 {
                draw_line(target, screen[j].xy(), screen[(j + 1) % 3].xy(), color);
            }
            stats.faces_drawn += 1;
            continue;
        }

        let intensity = match face_intensity(positions, light_direction) {
            Some(intensity) => intensity,
            None => {
                trace!("face {} has zero area, skipping", i);
                stats.faces_skipped += 1;
                continue;
            }
        };
        // Backface culling, also drops faces lit from behind.
        if intensity <= 0.0 {
            stats.faces_culled += 1;
            continue;
        }

        let screen = match project_face(&transform, positions) {
            Some(screen) => screen,
            None => {
                trace!("face {} crosses or touches the camera plane, skipping", i);
                stats.faces_skipped += 1;
                continue;
            }
        };

        let fill = match params.shading {
            Shading::Flat(color) => Fill::Flat(color.scale(intensity)),
            _ => Fill::Textured {
                uvs: model.face_uvs(i),
                intensity,
                sampler: model.texture(),
            },
        };
        stats.pixels_written += draw_triangle(target, depth, screen, &fill);
        stats.faces_drawn += 1;
    }

    return Ok(stats);
}
