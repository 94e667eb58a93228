//! Event scripts replayed against a measurement session

use anyhow::{Context, Result};
use pdf_measure_core::{
    InputEvent, Key, MarkId, MeasureSession, PageSource, Point, StatusMessage, Tool, Unit,
};
use serde::Deserialize;
use std::path::Path;

/// One scripted user action; pointer positions are in view space
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Tool { tool: Tool },
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
    Leave,
    DoubleClick,
    ContextMenu,
    Key { key: Key },
    FinishPolygon,
    Cancel,
    Unit { unit: Unit },
    CalibrationValue { value: f64 },
    ScaleManual { pixel_distance: f64, real_value: f64, unit: Unit },
    ResetScale { page: Option<u16> },
    CountTag { tag: String },
    TagVisible { tag: String, visible: bool },
    Snap { enabled: bool },
    SnapRadius { radius: f64 },
    DimensionOffset { offset: f64 },
    DeleteMark { id: u64 },
    ClearPage,
    GoToPage { page: u16 },
    NextPage,
    PrevPage,
    Zoom { zoom: f64 },
    ZoomIn,
    ZoomOut,
}

/// Read a JSON array of steps
pub fn load(path: &Path) -> Result<Vec<Step>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse script {}", path.display()))
}

/// Apply `steps` in order, collecting every status message produced
pub fn replay(
    session: &mut MeasureSession,
    pages: &dyn PageSource,
    steps: &[Step],
) -> Result<Vec<StatusMessage>> {
    let mut statuses = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        log::debug!("step {index}: {step:?}");
        let status = apply(session, pages, step).with_context(|| format!("step {index} failed"))?;
        statuses.extend(status);
    }
    Ok(statuses)
}

fn apply(
    session: &mut MeasureSession,
    pages: &dyn PageSource,
    step: &Step,
) -> Result<Option<StatusMessage>> {
    let status = match step {
        Step::Tool { tool } => session.set_tool(*tool),
        Step::Down { x, y } => session.pointer_down(Point::new(*x, *y)),
        Step::Move { x, y } => session.pointer_move(Point::new(*x, *y)),
        Step::Up { x, y } => session.pointer_up(Point::new(*x, *y)),
        Step::Leave => session.handle(InputEvent::PointerLeave),
        Step::DoubleClick => session.handle(InputEvent::DoubleClick),
        Step::ContextMenu => session.handle(InputEvent::ContextMenu),
        Step::Key { key } => session.key_down(*key),
        Step::FinishPolygon => session.finish_polygon(),
        Step::Cancel => session.cancel_gesture(),
        Step::Unit { unit } => {
            session.set_unit(*unit);
            None
        }
        Step::CalibrationValue { value } => {
            session.set_calibration_value(*value);
            None
        }
        Step::ScaleManual { pixel_distance, real_value, unit } => {
            let page = session.page();
            let scale = session.set_scale_manually(page, *pixel_distance, *real_value, *unit)?;
            Some(StatusMessage::success(format!(
                "Page {page} scale set: {}",
                scale.describe(*unit)
            )))
        }
        Step::ResetScale { page } => session.reset_scale(page.unwrap_or(session.page())),
        Step::CountTag { tag } => session.select_count_tag(tag),
        Step::TagVisible { tag, visible } => {
            session.set_tag_visible(tag, *visible);
            None
        }
        Step::Snap { enabled } => session.set_snap_enabled(*enabled),
        Step::SnapRadius { radius } => {
            session.set_snap_radius(*radius);
            None
        }
        Step::DimensionOffset { offset } => {
            session.set_dimension_offset(*offset);
            None
        }
        Step::DeleteMark { id } => {
            session.delete_mark(MarkId(*id));
            None
        }
        Step::ClearPage => session.clear_page(),
        Step::GoToPage { page } => {
            session.go_to_page(pages, *page)?;
            None
        }
        Step::NextPage => {
            session.next_page(pages)?;
            None
        }
        Step::PrevPage => {
            session.prev_page(pages)?;
            None
        }
        Step::Zoom { zoom } => {
            session.set_zoom(pages, *zoom)?;
            None
        }
        Step::ZoomIn => {
            session.zoom_in(pages)?;
            None
        }
        Step::ZoomOut => {
            session.zoom_out(pages)?;
            None
        }
    };
    Ok(status)
}
