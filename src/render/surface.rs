//! Drawing surfaces owned by a renderer.

use std::path::Path;

use super::RenderError;

/// An offscreen RGBA8 drawing surface.
///
/// Whoever holds the value owns the pixels. The orchestrator hands it to the
/// animation worker by value, after which only the active renderer writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct OffscreenSurface {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    pixels: Vec<u8>,
}

impl OffscreenSurface {
    /// Create a surface of `width x height` device pixels, cleared to transparent.
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: pixel_ratio.max(0.1),
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Surface for a CSS-pixel viewport at the given device pixel ratio.
    pub fn for_viewport(css_width: f32, css_height: f32, pixel_ratio: f32) -> Self {
        let w = (css_width * pixel_ratio).round().max(1.0) as u32;
        let h = (css_height * pixel_ratio).round().max(1.0) as u32;
        Self::new(w, h, pixel_ratio)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Reallocate for a new size. Pixel contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width as usize) * (height as usize) * 4];
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio.max(0.1);
    }

    /// Replace the pixel contents. `data` must be exactly `width * height * 4` bytes.
    pub fn write_pixels(&mut self, data: &[u8]) -> Result<(), RenderError> {
        if data.len() != self.pixels.len() {
            return Err(RenderError::SurfaceSize {
                expected: self.pixels.len(),
                actual: data.len(),
            });
        }
        self.pixels.copy_from_slice(data);
        Ok(())
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
}

/// Owned copy of a surface's pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl SurfaceSnapshot {
    /// RGBA value at `(x, y)`, `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Write the snapshot as a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let img = self.to_image().ok_or(RenderError::SurfaceSize {
            expected: (self.width as usize) * (self.height as usize) * 4,
            actual: self.pixels.len(),
        })?;
        img.save(path.as_ref())?;
        Ok(())
    }
}
