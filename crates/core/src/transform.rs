//! Mapping between document space and view space
//!
//! Document space is the unzoomed page as first rendered; view space is the
//! currently displayed raster. The mapping is a uniform per-axis scale with
//! no rotation or skew.

use crate::geometry::Point;

/// Width and height of a page or raster in pixels
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size scaled by `zoom`
    pub fn scaled(&self, zoom: f64) -> Self {
        Self::new(self.width * zoom, self.height * zoom)
    }

    /// Width with zero/non-finite values replaced by 1
    fn safe_width(&self) -> f64 {
        non_degenerate(self.width)
    }

    /// Height with zero/non-finite values replaced by 1
    fn safe_height(&self) -> f64 {
        non_degenerate(self.height)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

fn non_degenerate(value: f64) -> f64 {
    if value.is_finite() && value != 0.0 {
        value
    } else {
        1.0
    }
}

/// Current document/view mapping for the active page
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ViewMapping {
    /// Page size at zoom 1, fixed when the page is first rendered
    pub base: PageSize,
    /// Size of the current zoomed raster
    pub view: PageSize,
}

impl ViewMapping {
    pub fn new(base: PageSize, view: PageSize) -> Self {
        Self { base, view }
    }

    /// Convert a view-space point to document space
    pub fn to_doc(&self, view_point: Point) -> Point {
        Point::new(
            view_point.x * (self.base.safe_width() / self.view.safe_width()),
            view_point.y * (self.base.safe_height() / self.view.safe_height()),
        )
    }

    /// Convert a document-space point to view space
    pub fn to_view(&self, doc_point: Point) -> Point {
        Point::new(
            doc_point.x * (self.view.safe_width() / self.base.safe_width()),
            doc_point.y * (self.view.safe_height() / self.base.safe_height()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_across_zoom_levels() {
        let base = PageSize::new(612.0, 792.0);
        let samples = [
            Point::new(0.0, 0.0),
            Point::new(123.4, 567.8),
            Point::new(611.9, 0.25),
        ];

        for zoom in [0.4, 1.0, 1.3, 2.5, 4.0] {
            let mapping = ViewMapping::new(base, base.scaled(zoom));
            for p in samples {
                let back = mapping.to_doc(mapping.to_view(p));
                assert!((back.x - p.x).abs() < 1e-9);
                assert!((back.y - p.y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_to_doc_scales_by_base_over_view() {
        let mapping = ViewMapping::new(PageSize::new(100.0, 50.0), PageSize::new(200.0, 100.0));
        assert_eq!(mapping.to_doc(Point::new(40.0, 30.0)), Point::new(20.0, 15.0));
        assert_eq!(mapping.to_view(Point::new(20.0, 15.0)), Point::new(40.0, 30.0));
    }

    #[test]
    fn test_zero_sizes_fall_back_to_one() {
        let mapping = ViewMapping::new(PageSize::new(0.0, 0.0), PageSize::new(0.0, f64::NAN));
        let p = mapping.to_doc(Point::new(7.0, 9.0));
        assert_eq!(p, Point::new(7.0, 9.0));
    }
}
