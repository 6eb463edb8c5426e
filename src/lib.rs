//! CPU rasterizer: turns a triangle mesh into pixels with nothing but integer and float arithmetic.
//!
//! `util` holds the vector and matrix helpers, `scene` everything from the mesh to the depth tested
//! fragments. Windows, files and timing are left to the binary.

pub mod scene;
pub mod util;

pub use scene::buffer::DepthBuffer;
pub use scene::model::{Face, Model, ModelError, SolidColor, TextureSampler};
pub use scene::shader::{render_frame, FrameStats, RenderError, RenderParams, Shading};
pub use scene::transform::{Camera, CameraError, Projection, ScreenTransform, Viewport};
pub use scene::{Color, Frame, PixelTarget, ScreenVertex};
