use image::{GrayImage, Luma};

/// Per-pixel depth of the closest fragment drawn so far in the current frame.
/// Bigger values are closer to the camera. Row-major, indexed x + y * width.
///
/// Owned by whoever drives frames and reused between them: clear() resets it in place, so
/// nothing is reallocated unless the size changes.
pub struct DepthBuffer {
    width: u32,
    height: u32,
    data: Vec<i32>,
}

/// Number of cells, counted in usize since width * height can exceed u32.
fn pixel_count(width: u32, height: u32) -> usize {
    return width as usize * height as usize;
}

impl DepthBuffer {
    /// Value of a cell nothing was drawn into.
    pub const EMPTY: i32 = i32::MIN;

    pub fn new(width: u32, height: u32) -> DepthBuffer {
        return DepthBuffer {
            width,
            height,
            data: vec![DepthBuffer::EMPTY; pixel_count(width, height)],
        };
    }

    pub fn width(&self) -> u32 {
        return self.width;
    }

    pub fn height(&self) -> u32 {
        return self.height;
    }

    /// Resets every cell to EMPTY. Has to be called before the first face of a frame.
    pub fn clear(&mut self) {
        self.data.fill(DepthBuffer::EMPTY);
    }

    /// Changes the size, all cells end up EMPTY.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(pixel_count(width, height), DepthBuffer::EMPTY);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        return Some(x as usize + y as usize * self.width as usize);
    }

    /// Stored depth, None outside of the buffer.
    pub fn get(&self, x: i32, y: i32) -> Option<i32> {
        return self.index(x, y).map(|index| self.data[index]);
    }

    /// Depth test. Stores depth and returns true only if it is strictly greater than the current value,
    /// so on equal depth the first fragment stays. Coordinates outside of the buffer always fail.
    pub fn test_and_set(&mut self, x: i32, y: i32, depth: i32) -> bool {
        let index = match self.index(x, y) {
            Some(index) => index,
            None => return false,
        };
        if depth <= self.data[index] {
            return false;
        }
        self.data[index] = depth;
        return true;
    }

    /// Grayscale picture of the buffer, written cells normalized to [1, 255], empty cells black.
    /// Row 0 of the image is row 0 of the buffer.
    pub fn to_grayscale(&self) -> GrayImage {
        let written = self.data.iter().copied().filter(|&z| z != DepthBuffer::EMPTY);
        let (z_min, z_max) = written.fold((i32::MAX, i32::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)));
        let scale = (z_max as f32 - z_min as f32).max(1.0);

        return GrayImage::from_fn(self.width, self.height, |x, y| {
            let z = self.data[x as usize + y as usize * self.width as usize];
            if z == DepthBuffer::EMPTY {
                return Luma([0]);
            }
            let scaled = 1.0 + 254.0 * (z as f32 - z_min as f32) / scale;
            Luma([scaled as u8])
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = DepthBuffer::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(buffer.get(x, y), Some(DepthBuffer::EMPTY));
            }
        }
        assert_eq!(buffer.get(3, 0), None);
        assert_eq!(buffer.get(0, -1), None);
    }

    #[test]
    fn test_strictly_greater_wins() {
        let mut buffer = DepthBuffer::new(4, 4);
        assert!(buffer.test_and_set(1, 2, 5));
        assert!(!buffer.test_and_set(1, 2, 5));
        assert!(!buffer.test_and_set(1, 2, 3));
        assert!(buffer.test_and_set(1, 2, 8));
        assert_eq!(buffer.get(1, 2), Some(8));
    }

    #[test]
    fn test_min_depth_never_passes_on_empty() {
        let mut buffer = DepthBuffer::new(1, 1);
        assert!(!buffer.test_and_set(0, 0, DepthBuffer::EMPTY));
        assert!(buffer.test_and_set(0, 0, DepthBuffer::EMPTY + 1));
    }

    #[test]
    fn test_out_of_bounds_fails() {
        let mut buffer = DepthBuffer::new(2, 2);
        assert!(!buffer.test_and_set(-1, 0, 10));
        assert!(!buffer.test_and_set(0, 2, 10));
        assert!(!buffer.test_and_set(2, 0, 10));
    }

    #[test]
    fn test_clear_and_resize() {
        let mut buffer = DepthBuffer::new(2, 2);
        buffer.test_and_set(1, 1, 42);
        buffer.clear();
        assert_eq!(buffer.get(1, 1), Some(DepthBuffer::EMPTY));

        buffer.test_and_set(0, 0, 42);
        buffer.resize(3, 1);
        assert_eq!((buffer.width(), buffer.height()), (3, 1));
        assert_eq!(buffer.get(0, 0), Some(DepthBuffer::EMPTY));
        assert_eq!(buffer.get(2, 0), Some(DepthBuffer::EMPTY));
        assert_eq!(buffer.get(0, 1), None);
    }

    #[test]
    fn test_pixel_count_does_not_wrap() {
        assert_eq!(pixel_count(70000, 70000), 4_900_000_000usize);
        assert_eq!(pixel_count(u32::MAX, 2), 2 * u32::MAX as usize);

        let mut buffer = DepthBuffer::new(70000, 1);
        buffer.resize(1, 70000);
        assert!(buffer.test_and_set(0, 69999, 1));
        assert_eq!(buffer.get(0, 69999), Some(1));
    }

    #[test]
    fn test_grayscale() {
        let mut buffer = DepthBuffer::new(3, 1);
        buffer.test_and_set(0, 0, 10);
        buffer.test_and_set(1, 0, 20);
        let image = buffer.to_grayscale();
        assert_eq!(image.get_pixel(0, 0).0, [1]);
        assert_eq!(image.get_pixel(1, 0).0, [255]);
        assert_eq!(image.get_pixel(2, 0).0, [0]);
    }
}
