pub mod buffer;
pub mod model;
pub mod shader;
pub mod transform;

use std::cmp::{max, min};
use std::mem::swap;

use image::{imageops, Rgb, RgbImage};

use crate::util::{to_pixel, Vector2f, Vector2i};
use buffer::DepthBuffer;
use model::TextureSampler;

/// Struct, representing raw rgb8 pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const WHITE: Color = Color { r: 255, g: 255, b: 255, };
pub const BLACK: Color = Color { r: 0,   g: 0,   b: 0,   };
pub const RED:   Color = Color { r: 255, g: 0,   b: 0,   };

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Color {
        return Color { r, g, b };
    }

    /// Get convex combination of two colors: t * c_1 + (1 - t) * c_2.
    /// t is unrestricted.
    pub fn blend(color_1: Color, color_2: Color, t: f32) -> Color {
        return Color {
            r: (t * color_1.r as f32 + (1.0 - t) * color_2.r as f32) as u8,
            g: (t * color_1.g as f32 + (1.0 - t) * color_2.g as f32) as u8,
            b: (t * color_1.b as f32 + (1.0 - t) * color_2.b as f32) as u8,
        }
    }

    /// Darkens the color by a light intensity, clamped to [0, 1].
    pub fn scale(self, intensity: f32) -> Color {
        return Color::blend(self, BLACK, intensity.clamp(0.0, 1.0));
    }
}

/// Anything rasterizers can write into. (0, 0) is the bottom left pixel, flipping for the display
/// is done by whoever presents the result.
pub trait PixelTarget {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Writes a single pixel. Writes outside of the target must be dropped silently.
    fn set_pixel(&mut self, p: Vector2i, color: Color);

    fn contains(&self, p: Vector2i) -> bool {
        return p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width() && (p.y as u32) < self.height();
    }
}

/// Owned rgb8 frame, rows are stored in rasterizer order (row 0 is the bottom one).
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Frame {
        return Frame { image: RgbImage::new(width, height) };
    }

    /// Fills the whole frame with one color.
    pub fn clear(&mut self, color: Color) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgb([color.r, color.g, color.b]);
        }
    }

    /// Color at a pixel, None outside of the frame.
    pub fn get_pixel(&self, p: Vector2i) -> Option<Color> {
        if !self.contains(p) {
            return None;
        }
        let Rgb([r, g, b]) = *self.image.get_pixel(p.x as u32, p.y as u32);
        return Some(Color { r, g, b });
    }

    /// Copy of the frame with the top row first, ready for the window.
    pub fn to_display_image(&self) -> RgbImage {
        return imageops::flip_vertical(&self.image);
    }
}

impl PixelTarget for Frame {
    fn width(&self) -> u32 {
        return self.image.width();
    }

    fn height(&self) -> u32 {
        return self.image.height();
    }

    fn set_pixel(&mut self, p: Vector2i, color: Color) {
        if !self.contains(p) {
            return;
        }
        self.image.put_pixel(p.x as u32, p.y as u32, Rgb([color.r, color.g, color.b]));
    }
}

/// Point in a scene - x, y give pixel index and z gives depth in depth buffer units.
/// z is kept as a float until the depth test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    pub x: i32,
    pub y: i32,
    pub z: f32,
}

impl ScreenVertex {
    pub fn xy(&self) -> Vector2i {
        return Vector2i::new(self.x, self.y);
    }
}

/// What a triangle is filled with.
pub enum Fill<'a> {
    /// One color for every fragment.
    Flat(Color),
    /// Texture looked up at linearly interpolated uv, darkened by a face intensity.
    Textured {
        uvs: [Vector2f; 3],
        intensity: f32,
        sampler: &'a dyn TextureSampler,
    },
}

/// Draws a line between a and b with specified color via integer Bresenham stepping.
/// No depth test, last write wins. Only steps inside the target are walked, so far off-screen
/// endpoints cost nothing.
pub fn draw_line<T: PixelTarget + ?Sized>(target: &mut T, a: Vector2i, b: Vector2i, color: Color) {
    // Widened, differences of saturated coordinates don't fit into i32.
    let (mut x_0, mut y_0, mut x_1, mut y_1) = (a.x as i64, a.y as i64, b.x as i64, b.y as i64);

    // Always stepping along the longer axis.
    let steep = (x_0 - x_1).abs() < (y_0 - y_1).abs();
    if steep {
        swap(&mut x_0, &mut y_0);
        swap(&mut x_1, &mut y_1);
    }
    if x_0 > x_1 {
        swap(&mut x_0, &mut x_1);
        swap(&mut y_0, &mut y_1);
    }

    let dx = x_1 - x_0;
    let dy = y_1 - y_0;
    let d_error = 2 * dy.abs();
    let y_step = if y_1 > y_0 { 1 } else { -1 };

    let major_size = if steep { target.height() } else { target.width() } as i64;
    let x_begin = max(x_0, 0);
    let x_end = min(x_1, major_size - 1);
    if x_begin > x_end {
        return;
    }

    // Jumping over the steps before x_begin. After every step error stays in (-dx, dx], which pins
    // down the number of minor axis increments exactly.
    let mut error = 0;
    let mut y = y_0;
    let skipped = (x_begin - x_0) as i128;
    if skipped > 0 {
        let accumulated = skipped * d_error as i128;
        let increments = ceil_div(accumulated - dx as i128, 2 * dx as i128).max(0);
        y += y_step * increments as i64;
        error = (accumulated - 2 * dx as i128 * increments) as i64;
    }

    for x in x_begin..=x_end {
        if steep {
            target.set_pixel(Vector2i::new(y as i32, x as i32), color);
        } else {
            target.set_pixel(Vector2i::new(x as i32, y as i32), color);
        }
        error += d_error;
        if error > dx {
            y += y_step;
            error -= 2 * dx;
        }
    }
}

/// Division rounding towards positive infinity, divisor must be positive.
fn ceil_div(numerator: i128, divisor: i128) -> i128 {
    return -((-numerator).div_euclid(divisor));
}

/// Corner of a triangle carried through sorting, so uv stays with its vertex.
#[derive(Clone, Copy)]
struct Corner {
    v: ScreenVertex,
    uv: Vector2f,
}

/// One end of a horizontal span.
#[derive(Clone, Copy)]
struct SpanEnd {
    x: i32,
    z: f32,
    uv: Vector2f,
}

/// Point at fraction t of an edge. x goes through f64, vertices can be billions of pixels apart.
fn edge_point(from: Corner, to: Corner, t: f64) -> SpanEnd {
    let x = from.v.x as f64 + (to.v.x as f64 - from.v.x as f64) * t;
    let t = t as f32;
    return SpanEnd {
        x: to_pixel(x as f32),
        z: from.v.z + (to.v.z - from.v.z) * t,
        uv: from.uv + (to.uv - from.uv) * t,
    };
}

/// Fills a triangle scanline by scanline, bottom to top, writing only fragments that pass the depth test.
/// Rows run from the lowest vertex up to, but not including, the highest one.
/// Returns number of written pixels.
pub fn draw_triangle<T: PixelTarget + ?Sized>(
    target: &mut T,
    depth: &mut DepthBuffer,
    vertices: [ScreenVertex; 3],
    fill: &Fill,
) -> usize {
    // Zero height triangles are never drawn.
    if vertices[0].y == vertices[1].y && vertices[0].y == vertices[2].y {
        return 0;
    }

    let uvs = match fill {
        Fill::Flat(_) => [Vector2f::zeros(); 3],
        Fill::Textured { uvs, .. } => *uvs,
    };
    let mut corners = [
        Corner { v: vertices[0], uv: uvs[0] },
        Corner { v: vertices[1], uv: uvs[1] },
        Corner { v: vertices[2], uv: uvs[2] },
    ];
    corners.sort_by_key(|corner| corner.v.y);
    let [c_0, c_1, c_2] = corners;

    let width = target.width() as i64;
    let height = target.height() as i64;
    // i64, so vertices far outside of the target can't overflow the differences.
    let y_0 = c_0.v.y as i64;
    let total_height = c_2.v.y as i64 - y_0;
    let lower_height = c_1.v.y as i64 - y_0;
    let mut written = 0;

    // Rows outside of the target are never visited.
    let first_row = max(0, -y_0);
    let last_row = min(total_height, height - y_0);
    for i in first_row..last_row {
        let y = (y_0 + i) as i32;

        // With a flat bottom there is no lower segment at all.
        let second_half = i > lower_height || c_1.v.y == c_0.v.y;
        let segment_height = if second_half { c_2.v.y as i64 - c_1.v.y as i64 } else { lower_height };
        let alpha = i as f64 / total_height as f64;
        let beta = (i - if second_half { lower_height } else { 0 }) as f64 / segment_height as f64;

        let mut a = edge_point(c_0, c_2, alpha);
        let mut b = if second_half {
            edge_point(c_1, c_2, beta)
        } else {
            edge_point(c_0, c_1, beta)
        };
        if a.x > b.x {
            swap(&mut a, &mut b);
        }

        // phi is computed on the unclipped span, so clipping doesn't shift interpolation.
        for x in max(a.x as i64, 0)..=min(b.x as i64, width - 1) {
            let phi = if a.x == b.x {
                1.0
            } else {
                (x - a.x as i64) as f32 / (b.x as i64 - a.x as i64) as f32
            };
            let x = x as i32;
            let z = a.z + (b.z - a.z) * phi;
            if !depth.test_and_set(x, y, to_pixel(z)) {
                continue;
            }

            let color = match fill {
                Fill::Flat(color) => *color,
                Fill::Textured { intensity, sampler, .. } => {
                    let uv = a.uv + (b.uv - a.uv) * phi;
                    sampler.sample(uv).scale(*intensity)
                }
            };
            target.set_pixel(Vector2i::new(x, y), color);
            written += 1;
        }
    }

    return written;
}
