//! Geometry kernel for measurement shapes
//!
//! Pure functions over page points: distances, polygon metrics, validity
//! checks and hit-testing primitives. Nothing here knows about pages,
//! zoom or scale; callers pass points in whichever space they work in.

use crate::error::{MeasureError, MeasureResult};

/// Tolerance used by the orientation test when deciding collinearity
pub const COLLINEAR_EPSILON: f64 = 1e-9;

/// Polygons with less area than this (in px²) are rejected on commit
pub const MIN_POLYGON_AREA: f64 = 1e-6;

/// 2D point
///
/// Used for both document space (unzoomed page pixels) and view space
/// (zoomed raster pixels). Origin is the top-left corner of the page,
/// X grows to the right and Y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Midpoint between this point and another
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Translate along `direction` scaled by `factor`
    pub fn offset(&self, direction: Vector, factor: f64) -> Point {
        Point::new(self.x + direction.x * factor, self.y + direction.y * factor)
    }
}

/// 2D direction vector
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    /// Vector from `a` to `b`
    pub fn between(a: &Point, b: &Point) -> Self {
        Self { x: b.x - a.x, y: b.y - a.y }
    }

    /// Length of the vector
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Area and perimeter of a closed polygon
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PolygonMetrics {
    /// Enclosed area in px²
    pub area: f64,
    /// Closed perimeter in px
    pub perimeter: f64,
}

/// Compute area (shoelace formula) and closed perimeter
///
/// Returns zero metrics for fewer than three points.
pub fn polygon_metrics(points: &[Point]) -> PolygonMetrics {
    let n = points.len();
    if n < 3 {
        return PolygonMetrics::default();
    }

    let mut area_sum = 0.0;
    let mut perimeter = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area_sum += a.x * b.y - b.x * a.y;
        perimeter += a.distance_to(&b);
    }

    PolygonMetrics {
        area: (area_sum / 2.0).abs(),
        perimeter,
    }
}

/// Signed orientation of the triangle (a, b, c)
///
/// Positive for one winding, negative for the other, zero when collinear.
pub fn orientation(a: &Point, b: &Point, c: &Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether `c` lies inside the bounding box of segment `a`-`b`
fn on_segment(a: &Point, b: &Point, c: &Point) -> bool {
    a.x.min(b.x) <= c.x && c.x <= a.x.max(b.x) && a.y.min(b.y) <= c.y && c.y <= a.y.max(b.y)
}

/// Whether segments `p1`-`p2` and `q1`-`q2` intersect or touch
pub fn segments_intersect(p1: &Point, p2: &Point, q1: &Point, q2: &Point) -> bool {
    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);

    if o1.abs() < COLLINEAR_EPSILON && on_segment(p1, p2, q1) {
        return true;
    }
    if o2.abs() < COLLINEAR_EPSILON && on_segment(p1, p2, q2) {
        return true;
    }
    if o3.abs() < COLLINEAR_EPSILON && on_segment(q1, q2, p1) {
        return true;
    }
    if o4.abs() < COLLINEAR_EPSILON && on_segment(q1, q2, p2) {
        return true;
    }

    (o1 > 0.0) != (o2 > 0.0) && (o3 > 0.0) != (o4 > 0.0)
}

/// Whether any two non-adjacent edges of the closed polygon intersect
///
/// Edges are taken with wrap-around; the first and last edges share a
/// vertex and are treated as adjacent. O(n²), fine for interactive sizes.
pub fn self_intersects(points: &[Point]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }

    for i in 0..n {
        let a1 = &points[i];
        let a2 = &points[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let b1 = &points[j];
            let b2 = &points[(j + 1) % n];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// Even-odd ray casting test
pub fn point_in_polygon(point: &Point, points: &[Point]) -> bool {
    let mut inside = false;
    let n = points.len();
    if n == 0 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i].x, points[i].y);
        let (xj, yj) = (points[j].x, points[j].y);

        let mut dy = yj - yi;
        if dy == 0.0 {
            dy = COLLINEAR_EPSILON;
        }
        let crosses = (yi > point.y) != (yj > point.y)
            && point.x < (xj - xi) * (point.y - yi) / dy + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `point` to the closest point of segment `a`-`b`
pub fn distance_to_segment(point: &Point, a: &Point, b: &Point) -> f64 {
    let ab = Vector::between(a, b);
    let len2 = ab.x * ab.x + ab.y * ab.y;
    if len2 == 0.0 {
        return point.distance_to(a);
    }

    let t = (((point.x - a.x) * ab.x + (point.y - a.y) * ab.y) / len2).clamp(0.0, 1.0);
    let projection = a.offset(ab, t);
    point.distance_to(&projection)
}

/// Lock `target` to the horizontal or vertical line through `origin`
///
/// The axis with the larger absolute delta wins; ties go horizontal.
pub fn constrain_to_orthogonal(origin: &Point, target: &Point) -> Point {
    let dx = target.x - origin.x;
    let dy = target.y - origin.y;
    if dx.abs() >= dy.abs() {
        Point::new(target.x, origin.y)
    } else {
        Point::new(origin.x, target.y)
    }
}

/// Check that a point set can be committed as a polygon
///
/// Rejects self-intersecting outlines and outlines enclosing less than
/// [`MIN_POLYGON_AREA`]. On success returns the metrics to store.
pub fn validate_polygon(points: &[Point]) -> MeasureResult<PolygonMetrics> {
    if self_intersects(points) {
        return Err(MeasureError::InvalidPolygon {
            reason: "segments cross each other".to_string(),
        });
    }

    let metrics = polygon_metrics(points);
    if metrics.area < MIN_POLYGON_AREA {
        return Err(MeasureError::InvalidPolygon {
            reason: "area is too small".to_string(),
        });
    }

    Ok(metrics)
}

/// Layout of a dimension line drawn beside a measured segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionLayout {
    /// Dimension line start (first point pushed out along the normal)
    pub start: Point,
    /// Dimension line end
    pub end: Point,
    /// Unit tangent along the dimension line, for end ticks
    pub tangent: Vector,
    /// Unit normal the line was offset along
    pub normal: Vector,
    /// Anchor for the value label
    pub label_anchor: Point,
}

/// Distance between the dimension line and its label
const LABEL_GAP: f64 = 10.0;

/// Lay out a dimension line for segment `p1`-`p2` offset by `offset` px
pub fn dimension_layout(p1: &Point, p2: &Point, offset: f64) -> DimensionLayout {
    let v = Vector::between(p1, p2);
    let len = v.length();
    let normal = if len < 0.0001 {
        Vector { x: 0.0, y: -1.0 }
    } else {
        Vector { x: -v.y / len, y: v.x / len }
    };

    let start = p1.offset(normal, offset);
    let end = p2.offset(normal, offset);

    let direction = Vector::between(&start, &end);
    let dir_len = match direction.length() {
        l if l == 0.0 => 1.0,
        l => l,
    };
    let tangent = Vector { x: direction.x / dir_len, y: direction.y / dir_len };

    DimensionLayout {
        start,
        end,
        tangent,
        normal,
        label_anchor: start.midpoint(&end).offset(normal, LABEL_GAP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn test_metrics_need_three_points() {
        assert_eq!(polygon_metrics(&[]), PolygonMetrics::default());
        let two = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let metrics = polygon_metrics(&two);
        assert_eq!(metrics.area, 0.0);
        assert_eq!(metrics.perimeter, 0.0);
    }

    #[test]
    fn test_square_metrics() {
        let metrics = polygon_metrics(&square(10.0));
        assert!((metrics.area - 100.0).abs() < 1e-9);
        assert!((metrics.perimeter - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_invariant_under_rotation_and_reversal() {
        let hexagon: Vec<Point> = (0..6)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::PI / 3.0;
                Point::new(50.0 + 20.0 * angle.cos(), 40.0 + 20.0 * angle.sin())
            })
            .collect();
        // Regular hexagon area: 3√3/2 · r²
        let expected = 3.0 * 3f64.sqrt() / 2.0 * 400.0;
        let base = polygon_metrics(&hexagon);
        assert!((base.area - expected).abs() < 1e-6);

        let mut rotated = hexagon.clone();
        rotated.rotate_left(2);
        let rotated_metrics = polygon_metrics(&rotated);
        assert!((rotated_metrics.area - base.area).abs() < 1e-9);
        assert!((rotated_metrics.perimeter - base.perimeter).abs() < 1e-9);

        let mut reversed = hexagon;
        reversed.reverse();
        let reversed_metrics = polygon_metrics(&reversed);
        assert!((reversed_metrics.area - base.area).abs() < 1e-9);
        assert!((reversed_metrics.perimeter - base.perimeter).abs() < 1e-9);
    }

    #[test]
    fn test_figure_eight_self_intersects() {
        let bow_tie = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(self_intersects(&bow_tie));
    }

    #[test]
    fn test_convex_polygon_does_not_self_intersect() {
        assert!(!self_intersects(&square(10.0)));
        let triangle = [Point::new(0.0, 0.0), Point::new(5.0, 8.0), Point::new(10.0, 0.0)];
        assert!(!self_intersects(&triangle));
    }

    #[test]
    fn test_touching_edges_count_as_intersection() {
        // Vertex 4 lies on the first edge
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(self_intersects(&points));
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = square(10.0);
        assert!(point_in_polygon(&Point::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(&Point::new(15.0, 5.0), &sq));
        assert!(!point_in_polygon(&Point::new(-1.0, -1.0), &sq));
        assert!(!point_in_polygon(&Point::new(1.0, 1.0), &[]));
    }

    #[test]
    fn test_distance_to_segment_clamps_projection() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_to_segment(&Point::new(5.0, 3.0), &a, &b) - 3.0).abs() < 1e-9);
        assert!((distance_to_segment(&Point::new(13.0, 4.0), &a, &b) - 5.0).abs() < 1e-9);
        assert!((distance_to_segment(&Point::new(3.0, 4.0), &a, &a) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_constrain_to_orthogonal() {
        let origin = Point::new(10.0, 10.0);
        assert_eq!(
            constrain_to_orthogonal(&origin, &Point::new(50.0, 14.0)),
            Point::new(50.0, 10.0)
        );
        assert_eq!(
            constrain_to_orthogonal(&origin, &Point::new(12.0, -30.0)),
            Point::new(10.0, -30.0)
        );
    }

    #[test]
    fn test_validate_polygon_rejects_degenerate_outline() {
        let collinear = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        assert!(matches!(
            validate_polygon(&collinear),
            Err(MeasureError::InvalidPolygon { .. })
        ));
        assert!(validate_polygon(&square(2.0)).is_ok());
    }

    #[test]
    fn test_dimension_layout_offsets_along_normal() {
        let layout = dimension_layout(&Point::new(0.0, 0.0), &Point::new(10.0, 0.0), 18.0);
        assert_eq!(layout.start, Point::new(0.0, 18.0));
        assert_eq!(layout.end, Point::new(10.0, 18.0));
        assert!((layout.tangent.x - 1.0).abs() < 1e-9);
        assert_eq!(layout.label_anchor, Point::new(5.0, 28.0));

        let degenerate = dimension_layout(&Point::new(3.0, 3.0), &Point::new(3.0, 3.0), 10.0);
        assert_eq!(degenerate.normal, Vector { x: 0.0, y: -1.0 });
    }
}
