//! Cached luma raster of the rendered page

use crate::error::{MeasureError, MeasureResult};

/// Luma plane of the currently rendered page, in view-space pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PageRaster {
    width: u32,
    height: u32,
    luma: Vec<f64>,
}

impl PageRaster {
    /// Build from tightly packed RGBA8 pixels
    ///
    /// Luma is `0.299 R + 0.587 G + 0.114 B`; alpha is ignored.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> MeasureResult<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(MeasureError::Render(format!(
                "expected {expected} RGBA bytes for {width}x{height}, got {}",
                rgba.len()
            )));
        }

        let luma = rgba
            .chunks_exact(4)
            .map(|px| px[0] as f64 * 0.299 + px[1] as f64 * 0.587 + px[2] as f64 * 0.114)
            .collect();

        Ok(Self { width, height, luma })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma at the nearest pixel, coordinates clamped to the raster
    pub fn luma_at(&self, x: f64, y: f64) -> f64 {
        if self.luma.is_empty() {
            return 0.0;
        }
        let xx = (x.round().max(0.0) as u32).min(self.width - 1);
        let yy = (y.round().max(0.0) as u32).min(self.height - 1);
        self.luma[(yy * self.width + xx) as usize]
    }

    /// Horizontal plus vertical central-difference gradient magnitude
    pub fn edge_strength(&self, x: f64, y: f64) -> f64 {
        let gx = (self.luma_at(x + 1.0, y) - self.luma_at(x - 1.0, y)).abs();
        let gy = (self.luma_at(x, y + 1.0) - self.luma_at(x, y - 1.0)).abs();
        gx + gy
    }
}
