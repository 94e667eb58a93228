//! Scale model and unit conversion
//!
//! Each page carries at most one calibration. All stored geometry stays in
//! document pixels; this module converts pixel distances and areas into the
//! selected display unit on demand.

use crate::error::{MeasureError, MeasureResult};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Calibrations closer than this many pixels are rejected
pub const MIN_CALIBRATION_PIXELS: f64 = 0.5;

/// Real-world length unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    M,
    Cm,
    Mm,
    Km,
    In,
    Ft,
}

impl Unit {
    /// All supported units
    pub const ALL: [Unit; 6] = [Unit::M, Unit::Cm, Unit::Mm, Unit::Km, Unit::In, Unit::Ft];

    /// Length of one unit in meters
    pub fn to_meters(self) -> f64 {
        match self {
            Unit::M => 1.0,
            Unit::Cm => 0.01,
            Unit::Mm => 0.001,
            Unit::Km => 1000.0,
            Unit::In => 0.0254,
            Unit::Ft => 0.3048,
        }
    }

    /// Short symbol used in labels
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::M => "m",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
            Unit::Km => "km",
            Unit::In => "in",
            Unit::Ft => "ft",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unit symbol outside the fixed table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit '{0}'")]
pub struct UnknownUnit(pub String);

impl FromStr for Unit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownUnit(s.trim().to_string()))
    }
}

/// Calibration of a single page
///
/// `meters_per_pixel == real_value * calibration_unit.to_meters() / pixel_distance`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageScale {
    pub meters_per_pixel: f64,
    pub real_value: f64,
    pub pixel_distance: f64,
    pub calibration_unit: Unit,
}

impl PageScale {
    /// Build a scale from a measured pixel distance and its known length
    pub fn from_reference(pixel_distance: f64, real_value: f64, unit: Unit) -> MeasureResult<Self> {
        if !pixel_distance.is_finite() || pixel_distance <= MIN_CALIBRATION_PIXELS {
            return Err(MeasureError::InvalidCalibration(format!(
                "reference points are too close ({pixel_distance:.2} px)"
            )));
        }
        if !real_value.is_finite() || real_value <= 0.0 {
            return Err(MeasureError::InvalidCalibration(
                "real value must be a positive number".to_string(),
            ));
        }

        Ok(Self {
            meters_per_pixel: real_value * unit.to_meters() / pixel_distance,
            real_value,
            pixel_distance,
            calibration_unit: unit,
        })
    }

    /// Convert a pixel distance into `unit`
    pub fn distance_in(&self, px_distance: f64, unit: Unit) -> f64 {
        px_distance * self.meters_per_pixel / unit.to_meters()
    }

    /// Convert a pixel area into square `unit`
    pub fn area_in(&self, px_area: f64, unit: Unit) -> f64 {
        let factor = unit.to_meters();
        px_area * self.meters_per_pixel * self.meters_per_pixel / (factor * factor)
    }

    /// Human readable scale, e.g. "1 m = 20.00 px"
    pub fn describe(&self, unit: Unit) -> String {
        let px_per_unit = unit.to_meters() / self.meters_per_pixel;
        format!("1 {unit} = {} px", format_number(px_per_unit))
    }

    /// Human readable calibration reference, e.g. "5.00 m over 100.00 px"
    pub fn describe_reference(&self) -> String {
        format!(
            "{} {} over {} px",
            format_number(self.real_value),
            self.calibration_unit,
            format_number(self.pixel_distance)
        )
    }
}

/// Per-page scales for one document
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ScaleBook {
    scales: HashMap<u16, PageScale>,
}

impl ScaleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calibrate `page`, replacing any existing scale
    pub fn calibrate(
        &mut self,
        page: u16,
        pixel_distance: f64,
        real_value: f64,
        unit: Unit,
    ) -> MeasureResult<PageScale> {
        let scale = PageScale::from_reference(pixel_distance, real_value, unit)?;
        self.scales.insert(page, scale);
        log::info!(
            "calibrated page {page}: {:.6} m/px ({})",
            scale.meters_per_pixel,
            scale.describe_reference()
        );
        Ok(scale)
    }

    /// Scale of `page`, if calibrated
    pub fn get(&self, page: u16) -> Option<&PageScale> {
        self.scales.get(&page)
    }

    /// Check whether `page` has a scale
    pub fn is_calibrated(&self, page: u16) -> bool {
        self.scales.contains_key(&page)
    }

    /// Remove the scale of `page`, returning it
    pub fn reset(&mut self, page: u16) -> Option<PageScale> {
        let removed = self.scales.remove(&page);
        if removed.is_some() {
            log::info!("reset scale of page {page}");
        }
        removed
    }

    /// Remove all scales
    pub fn clear(&mut self) {
        self.scales.clear();
    }

    /// Pixel distance on `page` converted into `unit`, `None` if uncalibrated
    pub fn to_unit_distance(&self, px_distance: f64, page: u16, unit: Unit) -> Option<f64> {
        self.get(page).map(|scale| scale.distance_in(px_distance, unit))
    }

    /// Pixel area on `page` converted into square `unit`, `None` if uncalibrated
    pub fn to_unit_area(&self, px_area: f64, page: u16, unit: Unit) -> Option<f64> {
        self.get(page).map(|scale| scale.area_in(px_area, unit))
    }

    /// Require a scale on `page`
    pub fn require(&self, page: u16) -> MeasureResult<&PageScale> {
        self.get(page).ok_or(MeasureError::MissingScale { page })
    }
}

/// Format with two decimals, "-" for non-finite values
pub fn format_number(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "-".to_string()
    }
}

/// Distance label in `unit`, or in pixels when `scale` is `None`
pub fn format_distance(px_distance: f64, scale: Option<&PageScale>, unit: Unit) -> String {
    match scale {
        Some(scale) => format!("{} {unit}", format_number(scale.distance_in(px_distance, unit))),
        None => format!("{} px", format_number(px_distance)),
    }
}

/// Area label in square `unit`, or in square pixels when `scale` is `None`
pub fn format_area(px_area: f64, scale: Option<&PageScale>, unit: Unit) -> String {
    match scale {
        Some(scale) => format!("{} {unit}2", format_number(scale.area_in(px_area, unit))),
        None => format!("{} px2", format_number(px_area)),
    }
}
