use std::fmt;

use nalgebra::DVector;

use super::ScreenVertex;
use crate::util::{from_hom_point, invert, to_hom_point, to_pixel, MathError, Matrix, Vector3f};

/// How object space is squashed before the viewport mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Camera on the z axis at camera_distance, looking towards -z. Points get divided by w = 1 - z / d.
    Perspective { camera_distance: f32 },
    /// No divide, object space [-1, 1] maps straight onto the viewport.
    Orthographic,
}

impl Projection {
    /// Identity, except for -1 / d in the bottom row for the perspective case.
    pub fn matrix(&self) -> Matrix {
        let mut m = Matrix::identity(4, 4);
        if let Projection::Perspective { camera_distance } = self {
            m[(3, 2)] = -1.0 / *camera_distance;
        }
        return m;
    }
}

/// Pixel rectangle and depth range the [-1, 1]^3 cube is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Viewport {
    /// Viewport covering a whole width x height target.
    pub fn full(width: u32, height: u32, depth: f32) -> Viewport {
        return Viewport {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            depth,
        };
    }

    pub fn matrix(&self) -> Matrix {
        let mut m = Matrix::identity(4, 4);
        m[(0, 0)] = self.width / 2.0;
        m[(0, 3)] = self.x + self.width / 2.0;
        m[(1, 1)] = self.height / 2.0;
        m[(1, 3)] = self.y + self.height / 2.0;
        m[(2, 2)] = self.depth / 2.0;
        m[(2, 3)] = self.depth / 2.0;
        return m;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Perspective camera has to sit at a positive, finite distance.
    InvalidCameraDistance(f32),
    /// Viewport with a non-finite entry.
    InvalidViewport,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::InvalidCameraDistance(d) => write!(f, "camera distance {} is not positive and finite", d),
            CameraError::InvalidViewport => write!(f, "viewport has non-finite entries"),
        }
    }
}

impl std::error::Error for CameraError {}

/// viewport * projection, applied to every vertex of a frame.
pub struct ScreenTransform {
    matrix: Matrix,
}

impl ScreenTransform {
    pub fn new(camera: &Camera) -> Result<ScreenTransform, CameraError> {
        if let Projection::Perspective { camera_distance } = camera.projection {
            if !(camera_distance.is_finite() && camera_distance > 0.0) {
                return Err(CameraError::InvalidCameraDistance(camera_distance));
            }
        }
        let v = camera.viewport;
        if ![v.x, v.y, v.width, v.height, v.depth].iter().all(|value| value.is_finite()) {
            return Err(CameraError::InvalidViewport);
        }

        return Ok(ScreenTransform {
            matrix: camera.viewport.matrix() * camera.projection.matrix(),
        });
    }

    pub fn matrix(&self) -> &Matrix {
        return &self.matrix;
    }

    /// Screen position of an object space point with the depth kept as a float.
    /// None for points on or behind the camera plane.
    pub fn apply(&self, v: Vector3f) -> Option<Vector3f> {
        let hom = &self.matrix * to_hom_point(v);
        if hom[3] <= 0.0 {
            return None;
        }
        return from_hom_point(&hom);
    }

    /// Same as apply, with x and y rounded to pixels.
    pub fn project(&self, v: Vector3f) -> Option<ScreenVertex> {
        let p = self.apply(v)?;
        return Some(ScreenVertex {
            x: to_pixel(p.x),
            y: to_pixel(p.y),
            z: p.z,
        });
    }

    /// Object space point, which projects onto the screen vertex. Inverts the transform on every call.
    pub fn unproject(&self, p: ScreenVertex) -> Result<Vector3f, MathError> {
        let inverse = invert(&self.matrix)?;
        let hom = inverse * DVector::from_column_slice(&[p.x as f32, p.y as f32, p.z, 1.0]);
        return from_hom_point(&hom).ok_or(MathError::SingularMatrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::vector;

    fn camera(projection: Projection) -> Camera {
        return Camera {
            projection,
            viewport: Viewport::full(100, 100, 255.0),
        };
    }

    #[test]
    fn test_orthographic_is_affine() {
        let transform = ScreenTransform::new(&camera(Projection::Orthographic)).unwrap();
        let p = transform.apply(vector![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(p, vector![50.0, 50.0, 127.5]);
        let p = transform.apply(vector![-1.0, -1.0, -1.0]).unwrap();
        assert_eq!(p, vector![0.0, 0.0, 0.0]);
        let p = transform.apply(vector![0.5, -0.5, 1.0]).unwrap();
        assert_eq!(p, vector![75.0, 25.0, 255.0]);
    }

    #[test]
    fn test_viewport_offset() {
        let viewport = Viewport { x: 10.0, y: 20.0, width: 40.0, height: 60.0, depth: 2.0 };
        let transform = ScreenTransform::new(&Camera { projection: Projection::Orthographic, viewport }).unwrap();
        let p = transform.project(vector![1.0, 1.0, 0.0]).unwrap();
        assert_eq!((p.x, p.y), (50, 80));
        assert!((p.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_perspective_divide() {
        let transform = ScreenTransform::new(&camera(Projection::Perspective { camera_distance: 2.0 })).unwrap();
        // z = 1 gives w = 1 - 1 / 2, so x and y double before the viewport mapping.
        let p = transform.apply(vector![0.25, -0.25, 1.0]).unwrap();
        assert!((p.x - 75.0).abs() < 1e-4);
        assert!((p.y - 25.0).abs() < 1e-4);
        // Points in the z = 0 plane are not affected.
        let p = transform.apply(vector![0.25, -0.25, 0.0]).unwrap();
        assert!((p.x - 62.5).abs() < 1e-4);
        assert!((p.y - 37.5).abs() < 1e-4);
    }

    #[test]
    fn test_behind_camera_is_rejected() {
        let transform = ScreenTransform::new(&camera(Projection::Perspective { camera_distance: 2.0 })).unwrap();
        assert!(transform.apply(vector![0.0, 0.0, 2.0]).is_none());
        assert!(transform.project(vector![0.0, 0.0, 3.0]).is_none());
    }

    #[test]
    fn test_round_trip() {
        let transform = ScreenTransform::new(&Camera {
            projection: Projection::Perspective { camera_distance: 3.0 },
            viewport: Viewport::full(800, 800, 255.0),
        })
        .unwrap();
        for v in [vector![0.3, -0.2, 0.0], vector![-0.7, 0.5, 0.8], vector![0.1, 0.9, -1.0]] {
            let screen = transform.project(v).unwrap();
            let back = transform.unproject(screen).unwrap();
            assert!((back.x - v.x).abs() < 0.01, "{} vs {}", back.x, v.x);
            assert!((back.y - v.y).abs() < 0.01, "{} vs {}", back.y, v.y);
        }
    }

    #[test]
    fn test_unproject_degenerate_viewport() {
        let transform = ScreenTransform::new(&Camera {
            projection: Projection::Orthographic,
            viewport: Viewport::full(100, 100, 0.0),
        })
        .unwrap();
        let screen = ScreenVertex { x: 1, y: 1, z: 0.0 };
        assert_eq!(transform.unproject(screen), Err(MathError::SingularMatrix));
    }

    #[test]
    fn test_composed_matrix() {
        let ortho = ScreenTransform::new(&camera(Projection::Orthographic)).unwrap();
        assert_eq!(ortho.matrix(), &Viewport::full(100, 100, 255.0).matrix());

        let perspective = ScreenTransform::new(&camera(Projection::Perspective { camera_distance: 4.0 })).unwrap();
        let m = perspective.matrix();
        assert_eq!(m.shape(), (4, 4));
        assert_eq!(m[(3, 2)], -0.25);
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn test_invalid_camera_distance_is_rejected() {
        for distance in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            let result = ScreenTransform::new(&camera(Projection::Perspective { camera_distance: distance }));
            assert!(matches!(result, Err(CameraError::InvalidCameraDistance(_))), "distance {} accepted", distance);
        }
        let mut bad_viewport = camera(Projection::Orthographic);
        bad_viewport.viewport.width = f32::NAN;
        assert!(matches!(ScreenTransform::new(&bad_viewport), Err(CameraError::InvalidViewport)));
    }
}
