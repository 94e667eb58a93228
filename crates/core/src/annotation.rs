//! Annotation store
//!
//! Committed marks live here, grouped per page in insertion order. Geometry
//! is stored in document space. Ids are global to the store and never
//! reused, even after deletion or page clears.

use crate::geometry::{distance_to_segment, point_in_polygon, Point};
use crate::measurement::{format_area, format_distance, format_number, PageScale, Unit};
use crate::tags::{Color, TagPalette};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Hit radius in view pixels; divided by zoom for document space
pub const HIT_RADIUS: f64 = 12.0;

/// Zoom floor used when scaling the hit radius
const MIN_HIT_ZOOM: f64 = 0.4;

/// Unique mark identifier, assigned at commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MarkId(pub u64);

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Geometry and values of a mark, one case per mark type
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MarkKind {
    /// Reference segment that established the page scale
    Calibration {
        p1: Point,
        p2: Point,
        pixel_distance: f64,
        real_value: f64,
        unit: Unit,
    },
    Distance {
        p1: Point,
        p2: Point,
        pixel_distance: f64,
    },
    Polygon {
        points: Vec<Point>,
        /// px²
        area: f64,
        /// px
        perimeter: f64,
    },
    Count {
        point: Point,
        tag: String,
        sequence: u32,
    },
}

impl MarkKind {
    /// Short type name, as used in group keys
    pub fn type_name(&self) -> &'static str {
        match self {
            MarkKind::Calibration { .. } => "calibration",
            MarkKind::Distance { .. } => "distance",
            MarkKind::Polygon { .. } => "polygon",
            MarkKind::Count { .. } => "count",
        }
    }

    /// Defining points usable as snap anchors
    pub fn anchors(&self) -> Vec<Point> {
        match self {
            MarkKind::Calibration { p1, p2, .. } | MarkKind::Distance { p1, p2, .. } => {
                vec![*p1, *p2]
            }
            MarkKind::Polygon { points, .. } => points.clone(),
            MarkKind::Count { point, .. } => vec![*point],
        }
    }

    /// Tag of a count mark
    pub fn tag(&self) -> Option<&str> {
        match self {
            MarkKind::Count { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

/// A committed annotation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mark {
    pub id: MarkId,
    #[serde(flatten)]
    pub kind: MarkKind,
}

impl Mark {
    /// Short list label: `A-3` for counts, `#7` otherwise
    pub fn label(&self) -> String {
        match &self.kind {
            MarkKind::Count { tag, sequence, .. } => format!("{tag}-{sequence}"),
            _ => self.id.to_string(),
        }
    }

    /// Value description using the page scale when present
    pub fn detail(&self, scale: Option<&PageScale>, unit: Unit) -> String {
        match &self.kind {
            MarkKind::Calibration { real_value, unit: calibration_unit, .. } => {
                format!("Reference: {} {calibration_unit}", format_number(*real_value))
            }
            MarkKind::Distance { pixel_distance, .. } => format_distance(*pixel_distance, scale, unit),
            MarkKind::Polygon { area, perimeter, .. } => format!(
                "Area: {} | Perimeter: {}",
                format_area(*area, scale, unit),
                format_distance(*perimeter, scale, unit)
            ),
            MarkKind::Count { tag, sequence, .. } => format!("Tag {tag} | Count {sequence}"),
        }
    }

    /// Distance from `point` if within `threshold`, or `Some(0.0)` inside a polygon
    fn hit_distance(&self, point: &Point, threshold: f64) -> Option<f64> {
        let within = |d: f64| (d <= threshold).then_some(d);
        match &self.kind {
            MarkKind::Count { point: p, .. } => within(point.distance_to(p)),
            MarkKind::Calibration { p1, p2, .. } | MarkKind::Distance { p1, p2, .. } => {
                within(distance_to_segment(point, p1, p2))
            }
            MarkKind::Polygon { points, .. } => {
                if points.len() < 3 {
                    return None;
                }
                if point_in_polygon(point, points) {
                    return Some(0.0);
                }
                let n = points.len();
                (0..n)
                    .map(|i| distance_to_segment(point, &points[i], &points[(i + 1) % n]))
                    .fold(None, |best: Option<f64>, d| match (best, within(d)) {
                        (Some(b), Some(d)) => Some(b.min(d)),
                        (b, d) => b.or(d),
                    })
            }
        }
    }
}

/// Display group of marks on one page
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MarkGroup {
    /// `count:<tag>` or `type:<type>`
    pub key: String,
    pub label: String,
    /// Count groups sort before shape groups
    pub priority: u8,
    pub open: bool,
    pub items: Vec<MarkId>,
}

/// Per-tag count summary row
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TagSummary {
    pub tag: String,
    pub quantity: usize,
    pub visible: bool,
    pub color: Color,
}

/// Marks and presentation state of one page
#[derive(Debug, Clone, Default)]
struct PageMarks {
    marks: Vec<Mark>,
    hidden_tags: HashSet<String>,
    group_open: HashMap<String, bool>,
}

impl PageMarks {
    fn is_visible(&self, mark: &Mark) -> bool {
        mark.kind.tag().map_or(true, |tag| !self.hidden_tags.contains(tag))
    }
}

/// Owner of all committed marks of a document
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    pages: HashMap<u16, PageMarks>,
    next_id: u64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            next_id: 1,
        }
    }

    /// Assign the next id to `kind` and append it to `page`
    pub fn commit(&mut self, page: u16, kind: MarkKind) -> MarkId {
        let id = MarkId(self.next_id);
        self.next_id += 1;
        log::info!("committed {} mark {id} on page {page}", kind.type_name());
        self.pages.entry(page).or_default().marks.push(Mark { id, kind });
        id
    }

    /// Remove the mark with `id` from `page`; marks on other pages are untouched
    pub fn delete(&mut self, page: u16, id: MarkId) -> Option<Mark> {
        let marks = &mut self.pages.get_mut(&page)?.marks;
        let index = marks.iter().position(|m| m.id == id)?;
        log::info!("deleted mark {id} from page {page}");
        Some(marks.remove(index))
    }

    /// Look up a mark by id
    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.pages.values().flat_map(|p| p.marks.iter()).find(|m| m.id == id)
    }

    /// Page holding the mark with `id`
    pub fn page_of(&self, id: MarkId) -> Option<u16> {
        self.pages
            .iter()
            .find(|(_, p)| p.marks.iter().any(|m| m.id == id))
            .map(|(page, _)| *page)
    }

    /// Marks of `page` in insertion order
    pub fn marks(&self, page: u16) -> &[Mark] {
        self.pages.get(&page).map_or(&[], |p| p.marks.as_slice())
    }

    /// Marks of `page` not hidden by tag visibility
    pub fn visible_marks(&self, page: u16) -> Vec<&Mark> {
        match self.pages.get(&page) {
            Some(p) => p.marks.iter().filter(|m| p.is_visible(m)).collect(),
            None => Vec::new(),
        }
    }

    /// Document-space anchors of every visible mark on `page`
    pub fn anchors(&self, page: u16) -> Vec<Point> {
        self.visible_marks(page)
            .into_iter()
            .flat_map(|m| m.kind.anchors())
            .collect()
    }

    /// Topmost mark under `point` (document space) at `zoom`
    ///
    /// Visible counts within the hit radius win immediately, as do polygons
    /// containing the point. Otherwise the closest segment or polygon edge
    /// within the radius is returned.
    pub fn hit_test(&self, page: u16, point: Point, zoom: f64) -> Option<MarkId> {
        let page = self.pages.get(&page)?;
        let threshold = HIT_RADIUS / zoom.max(MIN_HIT_ZOOM);

        let mut best: Option<(MarkId, f64)> = None;
        for mark in page.marks.iter().rev() {
            if !page.is_visible(mark) {
                continue;
            }
            let Some(distance) = mark.hit_distance(&point, threshold) else {
                continue;
            };
            match &mark.kind {
                MarkKind::Count { .. } => return Some(mark.id),
                MarkKind::Polygon { points, .. } if point_in_polygon(&point, points) => {
                    return Some(mark.id)
                }
                _ => {}
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((mark.id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Remove every mark of `page` along with its visibility and group state
    pub fn clear_page(&mut self, page: u16) -> usize {
        let removed = self.pages.remove(&page).map_or(0, |p| p.marks.len());
        log::info!("cleared page {page} ({removed} marks)");
        removed
    }

    pub fn is_tag_visible(&self, page: u16, tag: &str) -> bool {
        self.pages.get(&page).map_or(true, |p| !p.hidden_tags.contains(tag))
    }

    pub fn set_tag_visible(&mut self, page: u16, tag: &str, visible: bool) {
        let hidden = &mut self.pages.entry(page).or_default().hidden_tags;
        if visible {
            hidden.remove(tag);
        } else {
            hidden.insert(tag.to_string());
        }
    }

    /// Whether a display group is expanded; groups start expanded
    pub fn is_group_open(&self, page: u16, key: &str) -> bool {
        self.pages
            .get(&page)
            .and_then(|p| p.group_open.get(key).copied())
            .unwrap_or(true)
    }

    pub fn set_group_open(&mut self, page: u16, key: &str, open: bool) {
        self.pages
            .entry(page)
            .or_default()
            .group_open
            .insert(key.to_string(), open);
    }

    /// Visible marks of `page` grouped for display
    ///
    /// One group per count tag, one per other mark type. Count groups come
    /// first, then groups are ordered by label.
    pub fn groups(&self, page: u16) -> Vec<MarkGroup> {
        let mut groups: Vec<MarkGroup> = Vec::new();
        for mark in self.visible_marks(page) {
            let (key, label, priority) = match &mark.kind {
                MarkKind::Count { tag, .. } => (format!("count:{tag}"), format!("Count - Tag {tag}"), 0),
                kind => (
                    format!("type:{}", kind.type_name()),
                    group_label(kind).to_string(),
                    1,
                ),
            };
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.items.push(mark.id),
                None => groups.push(MarkGroup {
                    open: self.is_group_open(page, &key),
                    key,
                    label,
                    priority,
                    items: vec![mark.id],
                }),
            }
        }
        groups.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.label.cmp(&b.label)));
        groups
    }

    /// Count quantities per tag on `page`, sorted by tag
    ///
    /// Hidden tags are included, flagged as not visible.
    pub fn tag_summary(&self, page: u16, palette: &mut TagPalette) -> Vec<TagSummary> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for mark in self.marks(page) {
            if let Some(tag) = mark.kind.tag() {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .map(|(tag, quantity)| TagSummary {
                tag: tag.to_string(),
                quantity,
                visible: self.is_tag_visible(page, tag),
                color: palette.ensure(tag).color,
            })
            .collect()
    }

    /// Total number of committed marks across all pages
    pub fn len(&self) -> usize {
        self.pages.values().map(|p| p.marks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn group_label(kind: &MarkKind) -> &'static str {
    match kind {
        MarkKind::Calibration { .. } => "Scale",
        MarkKind::Distance { .. } => "Distance",
        MarkKind::Polygon { .. } => "Area",
        MarkKind::Count { .. } => "Count",
    }
}
