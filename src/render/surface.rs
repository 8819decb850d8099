//! RGBA pixel surfaces that rendered chunks are painted onto.

/// A CSS-resolution RGBA image produced by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Creates a fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let index = (y as usize * self.width as usize + x as usize) * 4;
        self.data[index..index + 4].copy_from_slice(&rgba);
    }
}

/// An owned drawing surface at physical (device) resolution.
///
/// Ownership moves to the spectrogram worker on registration and comes back on
/// unregistration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Resizes the surface; like a canvas, resizing clears it.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize * 4, 0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[index..index + 4]);
        Some(rgba)
    }

    /// Paints `image` stretched over the whole surface with nearest-neighbor sampling.
    pub fn draw_scaled(&mut self, image: &ImageData) {
        if image.width == 0 || image.height == 0 || self.width == 0 || self.height == 0 {
            return;
        }

        if image.width == self.width && image.height == self.height {
            self.pixels.copy_from_slice(&image.data);
            return;
        }

        let source_columns: Vec<usize> = (0..self.width as usize)
            .map(|x| (x * image.width as usize / self.width as usize).min(image.width as usize - 1))
            .collect();

        for y in 0..self.height as usize {
            let source_y = (y * image.height as usize / self.height as usize)
                .min(image.height as usize - 1);
            let source_row = source_y * image.width as usize * 4;
            let target_row = y * self.width as usize * 4;
            for (x, &source_x) in source_columns.iter().enumerate() {
                let from = source_row + source_x * 4;
                let to = target_row + x * 4;
                self.pixels[to..to + 4].copy_from_slice(&image.data[from..from + 4]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_size_clears() {
        let mut surface = PixelSurface::new(2, 2);
        let mut image = ImageData::new(2, 2);
        image.put_pixel(0, 0, [1, 2, 3, 255]);
        surface.draw_scaled(&image);
        assert_eq!(surface.pixel(0, 0), Some([1, 2, 3, 255]));

        surface.set_size(4, 4);
        assert_eq!(surface.pixels().len(), 64);
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_nearest_neighbor_upscale() {
        let mut image = ImageData::new(2, 1);
        image.put_pixel(0, 0, [255, 0, 0, 255]);
        image.put_pixel(1, 0, [0, 0, 255, 255]);

        let mut surface = PixelSurface::new(4, 2);
        surface.draw_scaled(&image);

        for y in 0..2 {
            assert_eq!(surface.pixel(0, y), Some([255, 0, 0, 255]));
            assert_eq!(surface.pixel(1, y), Some([255, 0, 0, 255]));
            assert_eq!(surface.pixel(2, y), Some([0, 0, 255, 255]));
            assert_eq!(surface.pixel(3, y), Some([0, 0, 255, 255]));
        }
        assert_eq!(surface.pixel(4, 0), None);
    }
}
