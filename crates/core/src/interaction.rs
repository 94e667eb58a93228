//! Interaction state machine
//!
//! Turns pointer and keyboard input into committed marks. Pointer positions
//! arrive in view space; everything stored is converted to document space
//! first. Every handler runs to completion synchronously and may return a
//! status message for the UI.

use crate::annotation::MarkKind;
use crate::error::StatusMessage;
use crate::geometry::{
    constrain_to_orthogonal, polygon_metrics, self_intersects, validate_polygon, Point,
    PolygonMetrics,
};
use crate::measurement::{format_area, format_distance, format_number};
use crate::session::MeasureSession;
use crate::snapping::SnapResult;
use std::fmt;

/// Minimum pixel distance between two placed segment points
const MIN_SEGMENT_PIXELS: f64 = 0.5;

/// Extra slack around the snap radius for closing a polygon on its first point
const CLOSE_SLACK: f64 = 2.0;

/// Smallest width and height of a usable marquee selection, in view px
pub const MIN_SELECTION_SIZE: f64 = 5.0;

/// Active tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Cursor: select and delete marks
    #[default]
    None,
    Calibrate,
    Distance,
    Polygon,
    Count,
    /// Marquee selection for print/export
    PrintSelect,
}

impl Tool {
    /// Tools that place measurement points snap their input
    pub fn uses_snap(self) -> bool {
        matches!(self, Tool::Calibrate | Tool::Distance | Tool::Polygon | Tool::Count)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tool::None => "Cursor",
            Tool::Calibrate => "Calibrate",
            Tool::Distance => "Distance",
            Tool::Polygon => "Area",
            Tool::Count => "Count",
            Tool::PrintSelect => "Print selection",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keys the state machine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Enter,
}

/// Input event, positions in view space
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown { position: Point },
    PointerMove { position: Point },
    PointerUp { position: Point },
    PointerLeave,
    DoubleClick,
    /// Secondary click
    ContextMenu,
    Key { key: Key },
}

/// Marquee rectangle in view space, never negative in size
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl SelectionRect {
    /// Rectangle spanned by two corners
    pub fn from_corners(start: Point, end: Point) -> Self {
        Self {
            x: start.x.min(end.x),
            y: start.y.min(end.y),
            w: (end.x - start.x).abs(),
            h: (end.y - start.y).abs(),
        }
    }

    /// Both sides are at least [`MIN_SELECTION_SIZE`]
    pub fn is_valid(&self) -> bool {
        self.w >= MIN_SELECTION_SIZE && self.h >= MIN_SELECTION_SIZE
    }

    /// Integer pixel rectangle `(x, y, w, h)` inside a `width` x `height` raster
    pub fn crop_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if !self.is_valid() {
            return None;
        }
        let sx = self.x.floor().max(0.0);
        let sy = self.y.floor().max(0.0);
        let sw = (width as f64 - sx).min(self.w.floor());
        let sh = (height as f64 - sy).min(self.h.floor());
        if sw <= 0.0 || sh <= 0.0 {
            return None;
        }
        Some((sx as u32, sy as u32, sw as u32, sh as u32))
    }
}

/// In-progress gesture state, discarded on completion, cancel, tool or page change
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TempState {
    /// Placed points of the current shape, document space
    pub points: Vec<Point>,
    /// Pointer position: document space for calibrate, distance and
    /// polygon, view space for the other tools
    pub hover: Option<Point>,
    pub snap: Option<SnapResult>,
    pub selection: Option<SelectionRect>,
    /// Marquee start while dragging, view space
    pub drag_origin: Option<Point>,
}

impl TempState {
    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    fn has_ongoing_action(&self) -> bool {
        !self.points.is_empty() || self.selection.is_some() || self.is_dragging()
    }

    fn clear_gesture(&mut self) {
        self.points.clear();
        self.hover = None;
        self.snap = None;
    }
}

/// Live metrics of the polygon being drawn, including the hover point
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PolygonPreview {
    pub points: Vec<Point>,
    /// `None` while fewer than three points or when the outline crosses itself
    pub metrics: Option<PolygonMetrics>,
    pub self_intersecting: bool,
    /// Next click on the first point would close the polygon
    pub close_hint: bool,
}

impl MeasureSession {
    /// Dispatch one input event
    pub fn handle(&mut self, event: InputEvent) -> Option<StatusMessage> {
        match event {
            InputEvent::PointerDown { position } => self.pointer_down(position),
            InputEvent::PointerMove { position } => self.pointer_move(position),
            InputEvent::PointerUp { position } => self.pointer_up(position),
            InputEvent::PointerLeave => {
                self.pointer_leave();
                None
            }
            InputEvent::DoubleClick => self.double_click(),
            InputEvent::ContextMenu => self.context_menu(),
            InputEvent::Key { key } => self.key_down(key),
        }
    }

    /// Switch tools, dropping any gesture in progress
    pub fn set_tool(&mut self, tool: Tool) -> Option<StatusMessage> {
        self.tool = tool;
        self.temp = TempState::default();
        log::debug!("tool switched to {tool:?}");

        if tool == Tool::Polygon {
            if let Err(err) = self.scales.require(self.page) {
                return self.report(StatusMessage::from(&err));
            }
        }
        self.report(StatusMessage::info(format!("Tool active: {tool}")))
    }

    /// Calibrate tool, or distance tool on an uncalibrated page
    pub fn in_calibration_mode(&self) -> bool {
        self.tool == Tool::Calibrate
            || (self.tool == Tool::Distance && !self.scales.is_calibrated(self.page))
    }

    /// Snap a raw view point for the active tool
    fn snap_view_point(&self, raw: Point) -> SnapResult {
        let anchors: Vec<Point> = self
            .store
            .anchors(self.page)
            .into_iter()
            .map(|p| self.mapping.to_view(p))
            .collect();
        self.snap.snap(raw, self.tool, &anchors, self.raster.as_ref())
    }

    pub fn pointer_down(&mut self, raw: Point) -> Option<StatusMessage> {
        if !self.has_document() {
            return None;
        }

        let snap = self.snap_view_point(raw);
        let view = snap.point;
        let doc = self.mapping.to_doc(view);
        self.temp.snap = self.tool.uses_snap().then_some(snap);

        match self.tool {
            Tool::None => self.select_at(doc),
            Tool::Calibrate | Tool::Distance => self.place_segment_point(doc),
            Tool::Polygon => self.place_polygon_point(doc, view),
            Tool::Count => self.place_count(doc),
            Tool::PrintSelect => {
                self.temp.drag_origin = Some(view);
                self.temp.selection = Some(SelectionRect::from_corners(view, view));
                None
            }
        }
    }

    fn select_at(&mut self, doc: Point) -> Option<StatusMessage> {
        self.selected = self.store.hit_test(self.page, doc, self.zoom);
        let status = match self.selected.and_then(|id| self.store.get(id)) {
            Some(mark) => StatusMessage::info(format!(
                "Selected: {} | {}",
                mark.label(),
                mark.detail(self.scales.get(self.page), self.unit)
            )),
            None => StatusMessage::info("Cursor active. Click a mark to select it."),
        };
        self.report(status)
    }

    fn place_segment_point(&mut self, doc: Point) -> Option<StatusMessage> {
        let calibrating = self.in_calibration_mode();
        let point = match self.temp.points.first() {
            Some(first) if calibrating && self.temp.points.len() == 1 => {
                constrain_to_orthogonal(first, &doc)
            }
            _ => doc,
        };
        self.temp.points.push(point);
        if self.temp.points.len() < 2 {
            return None;
        }

        let p1 = self.temp.points[0];
        let p2 = self.temp.points[1];
        self.temp.clear_gesture();

        let pixel_distance = p1.distance_to(&p2);
        if pixel_distance < MIN_SEGMENT_PIXELS {
            return self.report(StatusMessage::warning(
                "Points are too close. Mark two distinct points.",
            ));
        }

        if !calibrating {
            self.store.commit(self.page, MarkKind::Distance { p1, p2, pixel_distance });
            let label = format_distance(pixel_distance, self.scales.get(self.page), self.unit);
            return self.report(StatusMessage::success(format!("Distance recorded: {label}")));
        }

        let Some(real_value) = self.calibration_value else {
            return self.report(StatusMessage::error(
                "Invalid real distance. Enter a positive calibration value.",
            ));
        };
        match self.scales.calibrate(self.page, pixel_distance, real_value, self.unit) {
            Ok(scale) => {
                self.store.commit(
                    self.page,
                    MarkKind::Calibration {
                        p1,
                        p2,
                        pixel_distance,
                        real_value,
                        unit: scale.calibration_unit,
                    },
                );
                self.report(StatusMessage::success(format!(
                    "Scale calibrated on page {}: {} {}",
                    self.page,
                    format_number(real_value),
                    scale.calibration_unit
                )))
            }
            Err(err) => self.report(StatusMessage::from(&err)),
        }
    }

    fn place_polygon_point(&mut self, doc: Point, view: Point) -> Option<StatusMessage> {
        if let Err(err) = self.scales.require(self.page) {
            self.temp.snap = None;
            return self.report(StatusMessage::from(&err));
        }

        if self.temp.points.len() >= 3 {
            let first = self.mapping.to_view(self.temp.points[0]);
            if first.distance_to(&view) <= self.snap.config().radius + CLOSE_SLACK {
                return self.finish_polygon();
            }
        }
        self.temp.points.push(doc);
        None
    }

    fn place_count(&mut self, doc: Point) -> Option<StatusMessage> {
        let tag = self.counts.tag().to_string();
        self.palette.ensure(&tag);
        let sequence = self.counts.next_sequence(self.page);
        self.store.commit(
            self.page,
            MarkKind::Count { point: doc, tag: tag.clone(), sequence },
        );
        self.temp.snap = None;
        self.report(StatusMessage::success(format!("Count {tag}: {sequence}")))
    }

    pub fn pointer_move(&mut self, raw: Point) -> Option<StatusMessage> {
        if !self.has_document() {
            return None;
        }

        let snap = self.snap_view_point(raw);
        let view = snap.point;
        self.temp.snap = self.tool.uses_snap().then_some(snap);

        self.temp.hover = Some(match self.tool {
            Tool::Calibrate | Tool::Distance | Tool::Polygon => {
                let doc = self.mapping.to_doc(view);
                match self.temp.points.as_slice() {
                    [first] if self.in_calibration_mode() => constrain_to_orthogonal(first, &doc),
                    _ => doc,
                }
            }
            _ => view,
        });

        if self.tool == Tool::PrintSelect {
            if let Some(origin) = self.temp.drag_origin {
                self.temp.selection = Some(SelectionRect::from_corners(origin, raw));
            }
        }
        None
    }

    pub fn pointer_up(&mut self, raw: Point) -> Option<StatusMessage> {
        if !self.has_document() || self.tool != Tool::PrintSelect {
            return None;
        }
        let origin = self.temp.drag_origin.take()?;
        let selection = SelectionRect::from_corners(origin, raw);
        self.temp.selection = Some(selection);
        self.temp.snap = None;

        if selection.is_valid() {
            self.report(StatusMessage::info("Area selected."))
        } else {
            self.report(StatusMessage::warning("Selection is too small."))
        }
    }

    pub fn pointer_leave(&mut self) {
        self.temp.hover = None;
        self.temp.snap = None;
    }

    pub fn double_click(&mut self) -> Option<StatusMessage> {
        if self.tool != Tool::Polygon {
            return None;
        }
        self.finish_polygon()
    }

    pub fn context_menu(&mut self) -> Option<StatusMessage> {
        if self.tool == Tool::Polygon && self.temp.points.len() >= 3 {
            return self.finish_polygon();
        }
        None
    }

    /// Close the polygon being drawn
    ///
    /// Needs at least three points. Crossing or zero-area outlines are
    /// rejected and the gesture stays open for correction.
    pub fn finish_polygon(&mut self) -> Option<StatusMessage> {
        if self.temp.points.len() < 3 {
            return None;
        }

        let metrics = match validate_polygon(&self.temp.points) {
            Ok(metrics) => metrics,
            Err(err) => return self.report(StatusMessage::from(&err)),
        };

        let points = std::mem::take(&mut self.temp.points);
        self.temp.clear_gesture();
        self.store.commit(
            self.page,
            MarkKind::Polygon { points, area: metrics.area, perimeter: metrics.perimeter },
        );

        let scale = self.scales.get(self.page);
        let text = format!(
            "Area recorded: {} | Perimeter: {}",
            format_area(metrics.area, scale, self.unit),
            format_distance(metrics.perimeter, scale, self.unit)
        );
        self.report(StatusMessage::success(text))
    }

    /// Drop the gesture in progress, any marquee selection and the selected mark
    pub fn cancel_gesture(&mut self) -> Option<StatusMessage> {
        self.temp = TempState::default();
        self.selected = None;
        self.report(StatusMessage::info("Current drawing cancelled."))
    }

    pub fn key_down(&mut self, key: Key) -> Option<StatusMessage> {
        match key {
            Key::Escape if self.tool == Tool::None => {
                self.selected.take()?;
                self.report(StatusMessage::info("Selection cleared."))
            }
            Key::Escape => {
                if !self.temp.has_ongoing_action() {
                    return None;
                }
                self.temp = TempState::default();
                self.selected = None;
                self.report(StatusMessage::info("Action cancelled."))
            }
            Key::Delete | Key::Backspace if self.tool == Tool::None => {
                let id = self.selected?;
                self.delete_mark(id);
                self.report(StatusMessage::info(format!("Mark {id} removed.")))
            }
            Key::Enter => self.context_menu(),
            _ => None,
        }
    }

    /// Current polygon outline with the hover point appended
    pub fn polygon_preview(&self) -> Option<PolygonPreview> {
        if self.tool != Tool::Polygon || self.temp.points.is_empty() {
            return None;
        }

        let mut points = self.temp.points.clone();
        points.extend(self.temp.hover);

        let self_intersecting = points.len() >= 3 && self_intersects(&points);
        let metrics = (points.len() >= 3 && !self_intersecting).then(|| polygon_metrics(&points));

        let close_hint = match (self.temp.points.first(), self.temp.hover) {
            (Some(first), Some(hover)) if self.temp.points.len() >= 3 => {
                let first = self.mapping.to_view(*first);
                first.distance_to(&self.mapping.to_view(hover))
                    <= self.snap.config().radius + CLOSE_SLACK
            }
            _ => false,
        };

        Some(PolygonPreview { points, metrics, self_intersecting, close_hint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MarkId;
    use crate::error::{MeasureError, MeasureResult, Severity};
    use crate::measurement::Unit;
    use crate::page_source::{PageSource, RgbaImage};
    use crate::transform::PageSize;

    /// Blank white pages of a fixed size
    struct BlankPages {
        count: u16,
        size: PageSize,
    }

    impl PageSource for BlankPages {
        fn page_count(&self) -> u16 {
            self.count
        }

        fn base_size(&self, _page: u16) -> MeasureResult<PageSize> {
            Ok(self.size)
        }

        fn render(&self, _page: u16, zoom: f64) -> MeasureResult<RgbaImage> {
            let width = (self.size.width * zoom).round() as u32;
            let height = (self.size.height * zoom).round() as u32;
            Ok(RgbaImage {
                width,
                height,
                pixels: vec![255; (width * height * 4) as usize],
            })
        }
    }

    fn session() -> MeasureSession {
        let mut session = MeasureSession::default();
        let pages = BlankPages { count: 2, size: PageSize::new(400.0, 300.0) };
        session.open_document(&pages).unwrap();
        session
    }

    fn calibrated_session() -> MeasureSession {
        let mut session = session();
        session.set_scale_manually(1, 100.0, 5.0, Unit::M).unwrap();
        session
    }

    fn click(session: &mut MeasureSession, x: f64, y: f64) -> Option<StatusMessage> {
        session.handle(InputEvent::PointerDown { position: Point::new(x, y) })
    }

    #[test]
    fn test_events_ignored_without_document() {
        let mut session = MeasureSession::default();
        session.set_tool(Tool::Count);
        assert_eq!(click(&mut session, 10.0, 10.0), None);
        assert!(session.marks(1).is_empty());
    }

    #[test]
    fn test_calibration_gesture_commits_scale_and_mark() {
        let mut session = session();
        session.set_tool(Tool::Calibrate);
        session.set_calibration_value(5.0);

        click(&mut session, 10.0, 50.0);
        // Off-axis second click is locked horizontal
        let status = click(&mut session, 110.0, 53.0).unwrap();
        assert_eq!(status.severity, Severity::Success);

        let scale = session.scale(1).unwrap();
        assert!((scale.meters_per_pixel - 0.05).abs() < 1e-12);
        match &session.marks(1)[0].kind {
            MarkKind::Calibration { p2, pixel_distance, .. } => {
                assert_eq!(*p2, Point::new(110.0, 50.0));
                assert!((pixel_distance - 100.0).abs() < 1e-9);
            }
            other => panic!("unexpected mark {other:?}"),
        }
        assert!(session.temp().points.is_empty());
    }

    #[test]
    fn test_calibration_without_value_reports_error() {
        let mut session = session();
        session.set_tool(Tool::Calibrate);
        click(&mut session, 10.0, 10.0);
        let status = click(&mut session, 60.0, 10.0).unwrap();
        assert_eq!(status.severity, Severity::Error);
        assert!(session.scale(1).is_none());
        assert!(session.marks(1).is_empty());
        assert!(session.temp().points.is_empty());
    }

    #[test]
    fn test_points_too_close_abort() {
        let mut session = session();
        session.set_tool(Tool::Calibrate);
        session.set_calibration_value(1.0);
        click(&mut session, 10.0, 10.0);
        let status = click(&mut session, 10.2, 10.0).unwrap();
        assert_eq!(status.severity, Severity::Warning);
        assert!(session.marks(1).is_empty());
        assert!(session.temp().points.is_empty());
    }

    #[test]
    fn test_distance_tool_calibrates_uncalibrated_page() {
        let mut session = session();
        session.set_tool(Tool::Distance);
        session.set_calibration_value(2.0);
        assert!(session.in_calibration_mode());

        click(&mut session, 0.0, 0.0);
        click(&mut session, 0.0, 40.0);
        assert!(matches!(session.marks(1)[0].kind, MarkKind::Calibration { .. }));
        assert!(!session.in_calibration_mode());

        // Now a plain distance, without axis lock
        click(&mut session, 0.0, 0.0);
        let status = click(&mut session, 30.0, 40.0).unwrap();
        assert_eq!(status.text, "Distance recorded: 2.50 m");
        match &session.marks(1)[1].kind {
            MarkKind::Distance { pixel_distance, .. } => {
                assert!((pixel_distance - 50.0).abs() < 1e-9)
            }
            other => panic!("unexpected mark {other:?}"),
        }
    }

    #[test]
    fn test_polygon_requires_scale() {
        let mut session = session();
        let missing = StatusMessage::from(&MeasureError::MissingScale { page: 1 });
        assert_eq!(session.set_tool(Tool::Polygon), Some(missing.clone()));
        assert_eq!(missing.text, "page 1 has no scale; calibrate it first");

        assert_eq!(click(&mut session, 10.0, 10.0), Some(missing));
        assert!(session.temp().points.is_empty());
    }

    #[test]
    fn test_polygon_closes_near_first_point() {
        let mut session = calibrated_session();
        session.set_tool(Tool::Polygon);
        click(&mut session, 10.0, 10.0);
        click(&mut session, 110.0, 10.0);
        click(&mut session, 110.0, 110.0);
        assert_eq!(session.temp().points.len(), 3);

        // Within radius + 2 of the first point
        let status = click(&mut session, 20.0, 15.0).unwrap();
        assert_eq!(status.severity, Severity::Success);
        assert!(session.temp().points.is_empty());
        match &session.marks(1)[0].kind {
            MarkKind::Polygon { points, area, .. } => {
                assert_eq!(points.len(), 3);
                assert!((area - 5000.0).abs() < 1e-9);
            }
            other => panic!("unexpected mark {other:?}"),
        }
    }

    #[test]
    fn test_self_intersecting_polygon_stays_open() {
        let mut session = calibrated_session();
        session.set_tool(Tool::Polygon);
        for (x, y) in [(10.0, 10.0), (110.0, 110.0), (110.0, 10.0), (10.0, 110.0)] {
            click(&mut session, x, y);
        }
        let status = session.handle(InputEvent::DoubleClick).unwrap();
        assert_eq!(status.severity, Severity::Warning);
        assert_eq!(session.temp().points.len(), 4);
        assert!(session.marks(1).is_empty());

        session.handle(InputEvent::Key { key: Key::Escape });
        assert!(session.temp().points.is_empty());
    }

    #[test]
    fn test_flat_polygon_stays_open() {
        let mut session = calibrated_session();
        session.set_tool(Tool::Polygon);
        for x in [10.0, 60.0, 110.0] {
            click(&mut session, x, 10.0);
        }
        let status = session.handle(InputEvent::DoubleClick).unwrap();
        assert_eq!(status.severity, Severity::Warning);
        assert!(status.text.contains("area is too small"));
        assert_eq!(session.temp().points.len(), 3);
        assert!(session.marks(1).is_empty());
    }

    #[test]
    fn test_enter_and_context_menu_finish_polygon() {
        let mut session = calibrated_session();
        session.set_tool(Tool::Polygon);
        click(&mut session, 10.0, 10.0);
        click(&mut session, 110.0, 10.0);
        assert_eq!(session.handle(InputEvent::ContextMenu), None);
        click(&mut session, 110.0, 110.0);
        session.handle(InputEvent::Key { key: Key::Enter });
        assert_eq!(session.marks(1).len(), 1);
    }

    #[test]
    fn test_count_sequences_per_tag() {
        let mut session = session();
        session.set_tool(Tool::Count);
        click(&mut session, 10.0, 10.0);
        session.select_count_tag("B");
        click(&mut session, 50.0, 10.0);
        session.select_count_tag("A");
        click(&mut session, 90.0, 10.0);

        let sequences: Vec<(String, u32)> = session
            .marks(1)
            .iter()
            .filter_map(|m| match &m.kind {
                MarkKind::Count { tag, sequence, .. } => Some((tag.clone(), *sequence)),
                _ => None,
            })
            .collect();
        assert_eq!(
            sequences,
            [("A".to_string(), 1), ("B".to_string(), 1), ("A".to_string(), 2)]
        );
    }

    #[test]
    fn test_select_and_delete_with_keyboard() {
        let mut session = session();
        session.set_tool(Tool::Count);
        click(&mut session, 100.0, 100.0);
        session.set_tool(Tool::None);

        click(&mut session, 104.0, 100.0);
        assert_eq!(session.selected_mark(), Some(MarkId(1)));

        session.handle(InputEvent::Key { key: Key::Delete });
        assert!(session.marks(1).is_empty());
        assert_eq!(session.selected_mark(), None);

        // Nothing selected: no-op
        assert_eq!(session.handle(InputEvent::Key { key: Key::Backspace }), None);
    }

    #[test]
    fn test_escape_clears_selection_in_cursor_mode() {
        let mut session = session();
        session.set_tool(Tool::Count);
        click(&mut session, 100.0, 100.0);
        session.set_tool(Tool::None);
        click(&mut session, 100.0, 100.0);
        assert!(session.selected_mark().is_some());

        session.handle(InputEvent::Key { key: Key::Escape });
        assert_eq!(session.selected_mark(), None);
        assert_eq!(session.marks(1).len(), 1);
    }

    #[test]
    fn test_marquee_selection() {
        let mut session = session();
        session.set_tool(Tool::PrintSelect);
        click(&mut session, 80.0, 60.0);
        assert!(session.temp().is_dragging());

        session.handle(InputEvent::PointerMove { position: Point::new(20.0, 100.0) });
        assert_eq!(
            session.temp().selection,
            Some(SelectionRect { x: 20.0, y: 60.0, w: 60.0, h: 40.0 })
        );

        session.handle(InputEvent::PointerUp { position: Point::new(10.0, 110.0) });
        let selection = session.temp().selection.unwrap();
        assert!(!session.temp().is_dragging());
        assert!(selection.is_valid());
        assert_eq!(selection.crop_to(400, 300), Some((10, 60, 70, 50)));
        assert!(session.marks(1).is_empty());
    }

    #[test]
    fn test_small_selection_is_invalid() {
        let rect = SelectionRect::from_corners(Point::new(0.0, 0.0), Point::new(4.0, 20.0));
        assert!(!rect.is_valid());
        assert_eq!(rect.crop_to(100, 100), None);

        let outside = SelectionRect { x: 120.0, y: 0.0, w: 10.0, h: 10.0 };
        assert_eq!(outside.crop_to(100, 100), None);
    }

    #[test]
    fn test_tool_switch_clears_gesture() {
        let mut session = calibrated_session();
        session.set_tool(Tool::Polygon);
        click(&mut session, 10.0, 10.0);
        session.handle(InputEvent::PointerMove { position: Point::new(30.0, 30.0) });
        assert!(session.temp().hover.is_some());

        session.set_tool(Tool::Distance);
        assert_eq!(*session.temp(), TempState::default());
    }

    #[test]
    fn test_hover_is_axis_locked_while_calibrating() {
        let mut session = session();
        session.set_tool(Tool::Calibrate);
        click(&mut session, 10.0, 10.0);
        session.handle(InputEvent::PointerMove { position: Point::new(15.0, 80.0) });
        assert_eq!(session.temp().hover, Some(Point::new(10.0, 80.0)));

        session.handle(InputEvent::PointerLeave);
        assert_eq!(session.temp().hover, None);
        assert_eq!(session.temp().snap, None);
    }

    #[test]
    fn test_polygon_preview() {
        let mut session = calibrated_session();
        session.set_tool(Tool::Polygon);
        click(&mut session, 10.0, 10.0);
        click(&mut session, 110.0, 10.0);
        click(&mut session, 110.0, 110.0);

        session.handle(InputEvent::PointerMove { position: Point::new(10.0, 110.0) });
        let preview = session.polygon_preview().unwrap();
        assert_eq!(preview.points.len(), 4);
        assert!((preview.metrics.unwrap().area - 10_000.0).abs() < 1e-9);
        assert!(!preview.close_hint);

        session.handle(InputEvent::PointerMove { position: Point::new(12.0, 12.0) });
        assert!(session.polygon_preview().unwrap().close_hint);
    }
}
