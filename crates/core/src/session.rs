//! Per-document measurement session
//!
//! Owns everything a document accumulates while being measured: marks,
//! scales, tag colors, count counters, snapping settings and the active
//! gesture. Pointer and keyboard handling lives in
//! [`interaction`](crate::interaction).

use crate::annotation::{AnnotationStore, Mark, MarkGroup, MarkId, TagSummary};
use crate::config::{clamp_dimension_offset, clamp_zoom, MeasureConfig};
use crate::error::{MeasureError, MeasureResult, Severity, StatusMessage};
use crate::geometry::{dimension_layout, DimensionLayout, Point};
use crate::interaction::{TempState, Tool};
use crate::measurement::{PageScale, ScaleBook, Unit};
use crate::page_source::PageSource;
use crate::raster::PageRaster;
use crate::snapping::{SnapConfig, SnapEngine, SnapResult};
use crate::tags::{CountSession, TagPalette, TagStyle};
use crate::transform::{PageSize, ViewMapping};

/// Zoom change per zoom in/out step
pub const ZOOM_STEP: f64 = 0.1;

/// Measurement state of one open document
#[derive(Debug, Clone)]
pub struct MeasureSession {
    pub(crate) store: AnnotationStore,
    pub(crate) scales: ScaleBook,
    pub(crate) palette: TagPalette,
    pub(crate) counts: CountSession,
    pub(crate) snap: SnapEngine,
    pub(crate) unit: Unit,
    /// Real length entered for the next calibration
    pub(crate) calibration_value: Option<f64>,
    pub(crate) dimension_offset: f64,
    pub(crate) page: u16,
    pub(crate) page_count: u16,
    pub(crate) zoom: f64,
    pub(crate) mapping: ViewMapping,
    pub(crate) raster: Option<PageRaster>,
    pub(crate) selected: Option<MarkId>,
    pub(crate) tool: Tool,
    pub(crate) temp: TempState,
    pub(crate) last_status: Option<StatusMessage>,
}

impl Default for MeasureSession {
    fn default() -> Self {
        Self::new(MeasureConfig::default())
    }
}

impl MeasureSession {
    /// Create a session with no document open
    pub fn new(config: MeasureConfig) -> Self {
        let mut palette = TagPalette::new();
        let counts = CountSession::new(&config.count_tag);
        palette.ensure(counts.tag());

        let mut snap = SnapEngine::with_config(SnapConfig {
            enabled: config.snap_enabled,
            ..SnapConfig::default()
        });
        snap.set_radius(config.snap_radius);

        Self {
            store: AnnotationStore::new(),
            scales: ScaleBook::new(),
            palette,
            counts,
            snap,
            unit: config.unit,
            calibration_value: None,
            dimension_offset: clamp_dimension_offset(config.dimension_offset),
            page: 1,
            page_count: 0,
            zoom: clamp_zoom(config.zoom),
            mapping: ViewMapping::default(),
            raster: None,
            selected: None,
            tool: Tool::None,
            temp: TempState::default(),
            last_status: None,
        }
    }

    // ---- document and page lifecycle ----

    /// Start measuring a new document, discarding all previous state
    ///
    /// Snap settings, unit, dimension offset and zoom carry over. The
    /// first page is rendered before anything else changes.
    pub fn open_document(&mut self, source: &dyn PageSource) -> MeasureResult<()> {
        let page_count = source.page_count();
        if page_count == 0 {
            return Err(MeasureError::PageOutOfRange { page: 1, page_count });
        }

        let (mapping, raster) = render(source, 1, self.zoom)?;

        let tag = self.counts.tag().to_string();
        self.store = AnnotationStore::new();
        self.scales.clear();
        self.palette.clear();
        self.palette.ensure(&tag);
        self.counts.reset();
        self.selected = None;
        self.tool = Tool::None;
        self.page_count = page_count;
        self.install_page(1, self.zoom, mapping, raster);

        log::info!("opened document with {page_count} pages");
        self.report(StatusMessage::success(format!("Document loaded: {page_count} pages")));
        Ok(())
    }

    /// Whether a document is open
    pub fn has_document(&self) -> bool {
        self.page_count > 0
    }

    /// Show `page` (1-based)
    pub fn go_to_page(&mut self, source: &dyn PageSource, page: u16) -> MeasureResult<()> {
        if page == 0 || page > self.page_count {
            return Err(MeasureError::PageOutOfRange { page, page_count: self.page_count });
        }
        let (mapping, raster) = render(source, page, self.zoom)?;
        self.install_page(page, self.zoom, mapping, raster);
        log::info!("switched to page {page}");
        Ok(())
    }

    /// Advance one page; returns `false` on the last page
    pub fn next_page(&mut self, source: &dyn PageSource) -> MeasureResult<bool> {
        if !self.has_document() || self.page >= self.page_count {
            return Ok(false);
        }
        self.go_to_page(source, self.page + 1)?;
        Ok(true)
    }

    /// Go back one page; returns `false` on the first page
    pub fn prev_page(&mut self, source: &dyn PageSource) -> MeasureResult<bool> {
        if !self.has_document() || self.page <= 1 {
            return Ok(false);
        }
        self.go_to_page(source, self.page - 1)?;
        Ok(true)
    }

    /// Re-render the current page at `zoom`, clamped to the allowed range
    pub fn set_zoom(&mut self, source: &dyn PageSource, zoom: f64) -> MeasureResult<()> {
        let zoom = clamp_zoom((zoom * 10.0).round() / 10.0);
        if !self.has_document() {
            self.zoom = zoom;
            return Ok(());
        }
        let (mapping, raster) = render(source, self.page, zoom)?;
        self.install_page(self.page, zoom, mapping, raster);
        log::debug!("zoom set to {zoom:.1}");
        Ok(())
    }

    pub fn zoom_in(&mut self, source: &dyn PageSource) -> MeasureResult<()> {
        self.set_zoom(source, self.zoom + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self, source: &dyn PageSource) -> MeasureResult<()> {
        self.set_zoom(source, self.zoom - ZOOM_STEP)
    }

    /// Swap in a freshly rendered page in one step
    fn install_page(&mut self, page: u16, zoom: f64, mapping: ViewMapping, raster: PageRaster) {
        if page != self.page {
            self.selected = None;
        }
        self.page = page;
        self.zoom = zoom;
        self.mapping = mapping;
        self.raster = Some(raster);
        self.temp = TempState::default();
    }

    // ---- settings ----

    /// Set the display and calibration unit
    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    /// Real length used by the next calibration, in the session unit
    pub fn set_calibration_value(&mut self, value: f64) {
        self.calibration_value = Some(value);
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) -> Option<StatusMessage> {
        self.snap.set_enabled(enabled);
        self.temp.snap = None;
        self.report(StatusMessage::info(if enabled { "Snapping on." } else { "Snapping off." }))
    }

    /// Set the snap radius in view pixels; negative or non-finite values are ignored
    pub fn set_snap_radius(&mut self, radius: f64) {
        self.snap.set_radius(radius);
    }

    /// Set the dimension line offset, clamped to [4, 80] px
    pub fn set_dimension_offset(&mut self, offset: f64) {
        if offset.is_finite() {
            self.dimension_offset = clamp_dimension_offset(offset);
        }
    }

    /// Make `tag` the active count tag and show it on the current page
    pub fn select_count_tag(&mut self, tag: &str) -> Option<StatusMessage> {
        let tag = self.counts.select(tag).to_string();
        self.palette.ensure(&tag);
        self.store.set_tag_visible(self.page, &tag, true);
        self.report(StatusMessage::info(format!("Tag {tag} selected for counting.")))
    }

    /// Show or hide count marks of `tag` on the current page
    pub fn set_tag_visible(&mut self, tag: &str, visible: bool) {
        self.store.set_tag_visible(self.page, tag, visible);
        if !visible {
            if let Some(id) = self.selected {
                let hidden = self.store.get(id).and_then(|m| m.kind.tag()) == Some(tag);
                if hidden {
                    self.selected = None;
                }
            }
        }
    }

    pub fn set_group_open(&mut self, key: &str, open: bool) {
        self.store.set_group_open(self.page, key, open);
    }

    // ---- scales ----

    /// Calibrate `page` from known values without drawing a reference mark
    pub fn set_scale_manually(
        &mut self,
        page: u16,
        pixel_distance: f64,
        real_value: f64,
        unit: Unit,
    ) -> MeasureResult<PageScale> {
        self.scales.calibrate(page, pixel_distance, real_value, unit)
    }

    /// Remove the calibration of `page`
    pub fn reset_scale(&mut self, page: u16) -> Option<StatusMessage> {
        self.scales.reset(page);
        self.report(StatusMessage::info(format!("Scale of page {page} reset.")))
    }

    // ---- marks ----

    /// Delete a mark of the current page, clearing the selection if it pointed at it
    pub fn delete_mark(&mut self, id: MarkId) -> bool {
        let removed = self.store.delete(self.page, id).is_some();
        if self.selected == Some(id) {
            self.selected = None;
        }
        removed
    }

    /// Remove every mark on the current page
    pub fn clear_page(&mut self) -> Option<StatusMessage> {
        self.store.clear_page(self.page);
        if self.selected.is_some_and(|id| self.store.get(id).is_none()) {
            self.selected = None;
        }
        self.temp.selection = None;
        self.temp.snap = None;
        self.report(StatusMessage::info("Page marks removed."))
    }

    // ---- read access ----

    pub fn page(&self) -> u16 {
        self.page
    }

    pub fn page_count(&self) -> u16 {
        self.page_count
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn mapping(&self) -> &ViewMapping {
        &self.mapping
    }

    pub fn raster(&self) -> Option<&PageRaster> {
        self.raster.as_ref()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn snap_config(&self) -> &SnapConfig {
        self.snap.config()
    }

    pub fn dimension_offset(&self) -> f64 {
        self.dimension_offset
    }

    pub fn count_tag(&self) -> &str {
        self.counts.tag()
    }

    pub fn selected_mark(&self) -> Option<MarkId> {
        self.selected
    }

    pub fn temp(&self) -> &TempState {
        &self.temp
    }

    /// Last snap result, kept for rendering feedback
    pub fn last_snap(&self) -> Option<&SnapResult> {
        self.temp.snap.as_ref()
    }

    pub fn last_status(&self) -> Option<&StatusMessage> {
        self.last_status.as_ref()
    }

    /// Marks of `page` in insertion order
    pub fn marks(&self, page: u16) -> &[Mark] {
        self.store.marks(page)
    }

    pub fn mark(&self, id: MarkId) -> Option<&Mark> {
        self.store.get(id)
    }

    pub fn scale(&self, page: u16) -> Option<&PageScale> {
        self.scales.get(page)
    }

    pub fn tag_style(&self, tag: &str) -> Option<TagStyle> {
        self.palette.get(tag)
    }

    pub fn is_tag_visible(&self, tag: &str) -> bool {
        self.store.is_tag_visible(self.page, tag)
    }

    /// Display groups of the current page
    pub fn groups(&self) -> Vec<MarkGroup> {
        self.store.groups(self.page)
    }

    /// Count totals of the current page
    pub fn tag_summary(&mut self) -> Vec<TagSummary> {
        self.store.tag_summary(self.page, &mut self.palette)
    }

    /// Value description of a mark using its page's current scale
    pub fn mark_detail(&self, id: MarkId) -> Option<String> {
        let page = self.store.page_of(id)?;
        let mark = self.store.get(id)?;
        Some(mark.detail(self.scales.get(page), self.unit))
    }

    /// Scale line for the current page, e.g. "1 m = 20.00 px"
    pub fn scale_description(&self) -> String {
        match self.scales.get(self.page) {
            Some(scale) => format!("Page {} scale: {}", self.page, scale.describe(self.unit)),
            None => format!("Page {} scale: not calibrated", self.page),
        }
    }

    /// Dimension line for a segment given in document space, laid out in view space
    pub fn dimension_layout(&self, p1: Point, p2: Point) -> DimensionLayout {
        dimension_layout(
            &self.mapping.to_view(p1),
            &self.mapping.to_view(p2),
            self.dimension_offset,
        )
    }

    /// Record `status` as the latest message and hand it back
    pub(crate) fn report(&mut self, status: StatusMessage) -> Option<StatusMessage> {
        match status.severity {
            Severity::Warning | Severity::Error => log::warn!("{}", status.text),
            _ => log::debug!("{}", status.text),
        }
        self.last_status = Some(status.clone());
        Some(status)
    }
}

/// Render `page` at `zoom` and build its mapping and luma raster
fn render(source: &dyn PageSource, page: u16, zoom: f64) -> MeasureResult<(ViewMapping, PageRaster)> {
    let base = source.base_size(page)?;
    let image = source.render(page, zoom)?;
    let raster = PageRaster::from_rgba(image.width, image.height, &image.pixels)?;
    let view = PageSize::new(image.width as f64, image.height as f64);
    Ok((ViewMapping::new(base, view), raster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MarkKind;

    #[test]
    fn test_new_session_uses_config() {
        let config = MeasureConfig::default()
            .with_snap_enabled(false)
            .with_snap_radius(20.0)
            .with_unit(Unit::Cm)
            .with_count_tag("door");
        let session = MeasureSession::new(config);
        assert!(!session.snap_config().enabled);
        assert_eq!(session.snap_config().radius, 20.0);
        assert_eq!(session.unit(), Unit::Cm);
        assert_eq!(session.count_tag(), "door");
        assert!(session.tag_style("door").is_some());
        assert!(!session.has_document());
    }

    #[test]
    fn test_settings_validation() {
        let mut session = MeasureSession::default();
        session.set_snap_radius(f64::NAN);
        assert_eq!(session.snap_config().radius, 12.0);
        session.set_dimension_offset(1.0);
        assert_eq!(session.dimension_offset(), 4.0);

        let status = session.set_snap_enabled(false).unwrap();
        assert_eq!(status.text, "Snapping off.");
        assert_eq!(session.last_status(), Some(&status));
    }

    #[test]
    fn test_mark_detail_uses_current_unit() {
        let mut session = MeasureSession::default();
        session.set_scale_manually(1, 100.0, 5.0, Unit::M).unwrap();
        let id = session.store.commit(
            1,
            MarkKind::Distance {
                p1: Point::new(0.0, 0.0),
                p2: Point::new(200.0, 0.0),
                pixel_distance: 200.0,
            },
        );
        assert_eq!(session.mark_detail(id).as_deref(), Some("10.00 m"));

        session.set_unit(Unit::Cm);
        assert_eq!(session.mark_detail(id).as_deref(), Some("1000.00 cm"));
        assert_eq!(session.mark_detail(MarkId(42)), None);
    }

    #[test]
    fn test_manual_scale_rejects_invalid_input() {
        let mut session = MeasureSession::default();
        assert!(matches!(
            session.set_scale_manually(1, 100.0, -1.0, Unit::M),
            Err(MeasureError::InvalidCalibration(_))
        ));
        assert!(session.scale(1).is_none());
    }
}
