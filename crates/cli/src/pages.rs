//! PNG-backed page source

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use pdf_measure_core::{MeasureError, MeasureResult, PageSize, PageSource, RgbaImage};
use std::path::Path;

/// Pages loaded from raster images, one file per page
///
/// Each image's pixel size is its document space; zoomed renders are
/// resampled from it.
pub struct PngPages {
    pages: Vec<image::RgbaImage>,
}

impl PngPages {
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let pages = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                image::open(path)
                    .map(|img| img.to_rgba8())
                    .with_context(|| format!("failed to read page image {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!("loaded {} page images", pages.len());
        Ok(Self { pages })
    }

    fn page(&self, page: u16) -> MeasureResult<&image::RgbaImage> {
        let index = usize::from(page).checked_sub(1);
        index.and_then(|i| self.pages.get(i)).ok_or(MeasureError::PageOutOfRange {
            page,
            page_count: self.page_count(),
        })
    }
}

impl PageSource for PngPages {
    fn page_count(&self) -> u16 {
        u16::try_from(self.pages.len()).unwrap_or(u16::MAX)
    }

    fn base_size(&self, page: u16) -> MeasureResult<PageSize> {
        let img = self.page(page)?;
        Ok(PageSize::new(img.width() as f64, img.height() as f64))
    }

    fn render(&self, page: u16, zoom: f64) -> MeasureResult<RgbaImage> {
        let img = self.page(page)?;
        let size = self.base_size(page)?.scaled(zoom);
        let width = size.width.round().max(1.0) as u32;
        let height = size.height.round().max(1.0) as u32;

        let rendered = if width == img.width() && height == img.height() {
            img.clone()
        } else {
            imageops::resize(img, width, height, FilterType::Triangle)
        };

        Ok(RgbaImage {
            width: rendered.width(),
            height: rendered.height(),
            pixels: rendered.into_raw(),
        })
    }
}
