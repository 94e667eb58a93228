//! Snap engine
//!
//! Biases raw pointer positions toward existing mark anchors or toward
//! strong luma edges of the rendered page. Everything here works in view
//! space; callers convert anchors with the current view mapping first.

use crate::geometry::Point;
use crate::interaction::Tool;
use crate::raster::PageRaster;

/// Default snap radius in view pixels
pub const DEFAULT_SNAP_RADIUS: f64 = 12.0;

/// Minimum gradient magnitude for a pixel to count as an edge
pub const EDGE_THRESHOLD: f64 = 75.0;

/// Score penalty per pixel of distance for edge candidates
pub const DISTANCE_WEIGHT: f64 = 3.6;

/// Where a snapped point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapSource {
    /// Defining point of an existing mark
    Anchor,
    /// Detected image edge
    Edge,
}

/// A single snap candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    pub point: Point,
    /// Distance from the raw pointer position
    pub distance: f64,
    pub source: SnapSource,
    /// Edge score (strength minus distance penalty); 0 for anchors
    pub score: f64,
}

/// Outcome of snapping a pointer position
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SnapResult {
    pub point: Point,
    pub snapped: bool,
    pub source: Option<SnapSource>,
}

impl SnapResult {
    /// Raw point, not snapped
    pub fn none(point: Point) -> Self {
        Self { point, snapped: false, source: None }
    }

    fn from_candidate(candidate: SnapCandidate) -> Self {
        Self {
            point: candidate.point,
            snapped: true,
            source: Some(candidate.source),
        }
    }
}

/// Snapping configuration
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SnapConfig {
    pub enabled: bool,
    /// Search radius in view pixels
    pub radius: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: DEFAULT_SNAP_RADIUS,
        }
    }
}

/// Snap engine
#[derive(Debug, Clone, Default)]
pub struct SnapEngine {
    config: SnapConfig,
}

impl SnapEngine {
    /// Create a new snap engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snap engine with custom configuration
    pub fn with_config(config: SnapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Set the search radius; negative or non-finite values are ignored
    pub fn set_radius(&mut self, radius: f64) {
        if radius.is_finite() && radius >= 0.0 {
            self.config.radius = radius;
        }
    }

    /// Closest anchor within the radius
    pub fn anchor_snap(&self, view_point: Point, anchors: &[Point]) -> Option<SnapCandidate> {
        let radius = self.config.radius;
        anchors
            .iter()
            .map(|anchor| (anchor, anchor.distance_to(&view_point)))
            .filter(|(_, dist)| *dist <= radius)
            .fold(None, |best: Option<SnapCandidate>, (anchor, dist)| match best {
                Some(b) if b.distance <= dist => Some(b),
                _ => Some(SnapCandidate {
                    point: *anchor,
                    distance: dist,
                    source: SnapSource::Anchor,
                    score: 0.0,
                }),
            })
    }

    /// Best-scoring edge pixel within the radius
    ///
    /// Scans the square window around `view_point`, kept one pixel away
    /// from the raster border so every gradient sample is in range.
    pub fn edge_snap(&self, view_point: Point, raster: &PageRaster) -> Option<SnapCandidate> {
        let radius = self.config.radius;
        let x_min = (view_point.x - radius).floor().max(1.0) as i64;
        let x_max = ((view_point.x + radius).ceil() as i64).min(raster.width() as i64 - 2);
        let y_min = (view_point.y - radius).floor().max(1.0) as i64;
        let y_max = ((view_point.y + radius).ceil() as i64).min(raster.height() as i64 - 2);

        let mut best: Option<SnapCandidate> = None;
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let candidate = Point::new(x as f64, y as f64);
                let dist = candidate.distance_to(&view_point);
                if dist > radius {
                    continue;
                }

                let strength = raster.edge_strength(candidate.x, candidate.y);
                if strength < EDGE_THRESHOLD {
                    continue;
                }

                let score = strength - dist * DISTANCE_WEIGHT;
                if best.map_or(true, |b| score > b.score) {
                    best = Some(SnapCandidate {
                        point: candidate,
                        distance: dist,
                        source: SnapSource::Edge,
                        score,
                    });
                }
            }
        }
        best
    }

    /// Snap `view_point` for `tool`
    ///
    /// Anchors win over edges unless the edge is strictly closer. A missing
    /// raster only disables edge candidates.
    pub fn snap(
        &self,
        view_point: Point,
        tool: Tool,
        anchors: &[Point],
        raster: Option<&PageRaster>,
    ) -> SnapResult {
        if !self.config.enabled || !tool.uses_snap() {
            return SnapResult::none(view_point);
        }

        let anchor = self.anchor_snap(view_point, anchors);
        let edge = raster.and_then(|raster| self.edge_snap(view_point, raster));

        let chosen = match (anchor, edge) {
            (Some(a), Some(e)) => {
                if a.distance <= e.distance {
                    Some(a)
                } else {
                    Some(e)
                }
            }
            (a, e) => a.or(e),
        };

        match chosen {
            Some(candidate) => {
                log::debug!(
                    "snapped ({:.1}, {:.1}) to {:?} at ({:.1}, {:.1})",
                    view_point.x,
                    view_point.y,
                    candidate.source,
                    candidate.point.x,
                    candidate.point.y
                );
                SnapResult::from_candidate(candidate)
            }
            None => SnapResult::none(view_point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> PageRaster {
        let mut rgba = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = f(x, y);
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PageRaster::from_rgba(width, height, &rgba).unwrap()
    }

    #[test]
    fn test_uniform_raster_never_snaps() {
        let engine = SnapEngine::new();
        let flat = raster(64, 64, |_, _| 200);
        for (x, y) in [(0.0, 0.0), (10.5, 20.25), (32.0, 32.0), (63.0, 63.0)] {
            let result = engine.snap(Point::new(x, y), Tool::Distance, &[], Some(&flat));
            assert!(!result.snapped);
            assert_eq!(result.point, Point::new(x, y));
        }
    }

    #[test]
    fn test_edge_snap_finds_vertical_line() {
        let engine = SnapEngine::new();
        let page = raster(64, 64, |x, _| if x >= 30 { 0 } else { 255 });
        let result = engine.snap(Point::new(25.0, 20.0), Tool::Polygon, &[], Some(&page));
        assert!(result.snapped);
        assert_eq!(result.source, Some(SnapSource::Edge));
        // Gradient peaks on the two columns straddling the step; the closer wins
        assert_eq!(result.point, Point::new(29.0, 20.0));
    }

    #[test]
    fn test_anchor_snap_picks_closest() {
        let engine = SnapEngine::new();
        let anchors = [Point::new(10.0, 10.0), Point::new(4.0, 3.0), Point::new(100.0, 100.0)];
        let result = engine.snap(Point::new(0.0, 0.0), Tool::Count, &anchors, None);
        assert!(result.snapped);
        assert_eq!(result.source, Some(SnapSource::Anchor));
        assert_eq!(result.point, Point::new(4.0, 3.0));
    }

    #[test]
    fn test_anchor_wins_ties_and_loses_to_closer_edge() {
        let engine = SnapEngine::new();
        let page = raster(64, 64, |x, _| if x >= 30 { 0 } else { 255 });

        // Edge at distance 4 (x = 29), anchor at distance 4
        let tie = engine.snap(
            Point::new(25.0, 20.0),
            Tool::Distance,
            &[Point::new(25.0, 16.0)],
            Some(&page),
        );
        assert_eq!(tie.source, Some(SnapSource::Anchor));

        // Edge at distance 4, anchor at distance 6
        let farther = engine.snap(
            Point::new(25.0, 20.0),
            Tool::Distance,
            &[Point::new(25.0, 14.0)],
            Some(&page),
        );
        assert_eq!(farther.source, Some(SnapSource::Edge));
    }

    #[test]
    fn test_snap_skipped_for_non_placing_tools_and_when_disabled() {
        let mut engine = SnapEngine::new();
        let anchors = [Point::new(1.0, 1.0)];
        assert!(!engine.snap(Point::new(0.0, 0.0), Tool::None, &anchors, None).snapped);
        assert!(!engine.snap(Point::new(0.0, 0.0), Tool::PrintSelect, &anchors, None).snapped);

        engine.set_enabled(false);
        assert!(!engine.snap(Point::new(0.0, 0.0), Tool::Count, &anchors, None).snapped);
    }

    #[test]
    fn test_radius_bounds_candidates() {
        let mut engine = SnapEngine::new();
        engine.set_radius(3.0);
        let anchors = [Point::new(5.0, 0.0)];
        assert!(!engine.snap(Point::new(0.0, 0.0), Tool::Count, &anchors, None).snapped);

        engine.set_radius(-1.0);
        assert_eq!(engine.config().radius, 3.0);
    }
}
