//! PDF Measure Core Library
//!
//! Measurement engine for rasterized document pages: scale calibration,
//! snapping, geometry kernel, annotation store and the tool state machine.

pub mod annotation;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod measurement;
pub mod page_source;
pub mod raster;
pub mod session;
pub mod snapping;
pub mod tags;
pub mod transform;

pub use annotation::{AnnotationStore, Mark, MarkGroup, MarkId, MarkKind, TagSummary};
pub use config::{ConfigError, MeasureConfig};
pub use error::{MeasureError, MeasureResult, Severity, StatusMessage};
pub use geometry::{
    dimension_layout, distance_to_segment, point_in_polygon, polygon_metrics, segments_intersect,
    self_intersects, DimensionLayout, Point, PolygonMetrics,
};
pub use interaction::{InputEvent, Key, PolygonPreview, SelectionRect, TempState, Tool};
pub use measurement::{format_area, format_distance, PageScale, ScaleBook, Unit, UnknownUnit};
pub use page_source::{PageSource, RgbaImage};
pub use raster::PageRaster;
pub use session::MeasureSession;
pub use snapping::{SnapConfig, SnapEngine, SnapResult, SnapSource};
pub use tags::{normalize_count_tag, Color, CountSession, TagPalette, TagStyle};
pub use transform::{PageSize, ViewMapping};
