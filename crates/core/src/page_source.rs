//! Interface to the page rendering collaborator

use crate::error::MeasureResult;
use crate::transform::PageSize;

/// RGBA8 pixels of a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Source of rendered pages
///
/// Pages are numbered from 1. The base size is the page size at zoom 1 and
/// defines document space for that page.
pub trait PageSource {
    fn page_count(&self) -> u16;
    fn base_size(&self, page: u16) -> MeasureResult<PageSize>;
    fn render(&self, page: u16, zoom: f64) -> MeasureResult<RgbaImage>;
}
