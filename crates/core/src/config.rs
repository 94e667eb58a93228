//! Session configuration
//!
//! Initial settings for a [`MeasureSession`](crate::MeasureSession). Can be
//! loaded from a flat `key = value` file, from environment variables, or
//! built in code.

use crate::measurement::Unit;
use crate::snapping::DEFAULT_SNAP_RADIUS;
use crate::tags::{normalize_count_tag, DEFAULT_COUNT_TAG};
use std::fs;
use std::io;
use std::path::Path;

/// Default dimension line offset in view pixels
pub const DEFAULT_DIMENSION_OFFSET: f64 = 18.0;
/// Allowed dimension offset range
pub const DIMENSION_OFFSET_RANGE: (f64, f64) = (4.0, 80.0);

/// Allowed zoom range
pub const ZOOM_RANGE: (f64, f64) = (0.4, 4.0);

/// Initial settings of a measurement session
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureConfig {
    /// Snap to anchors and edges
    pub snap_enabled: bool,
    /// Snap radius in view pixels
    pub snap_radius: f64,
    /// Dimension line offset in view pixels, within [`DIMENSION_OFFSET_RANGE`]
    pub dimension_offset: f64,
    /// Display and calibration unit
    pub unit: Unit,
    /// Initial count tag
    pub count_tag: String,
    /// Initial zoom, within [`ZOOM_RANGE`]
    pub zoom: f64,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_radius: DEFAULT_SNAP_RADIUS,
            dimension_offset: DEFAULT_DIMENSION_OFFSET,
            unit: Unit::M,
            count_tag: DEFAULT_COUNT_TAG.to_string(),
            zoom: 1.0,
        }
    }
}

impl MeasureConfig {
    pub fn with_snap_enabled(mut self, enabled: bool) -> Self {
        self.snap_enabled = enabled;
        self
    }

    pub fn with_snap_radius(mut self, radius: f64) -> Self {
        self.snap_radius = radius;
        self
    }

    /// Sets the dimension offset, clamped to [`DIMENSION_OFFSET_RANGE`]
    pub fn with_dimension_offset(mut self, offset: f64) -> Self {
        self.dimension_offset = clamp_dimension_offset(offset);
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_count_tag(mut self, tag: &str) -> Self {
        self.count_tag = normalize_count_tag(tag);
        self
    }

    /// Sets the zoom, clamped to [`ZOOM_RANGE`]
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = clamp_zoom(zoom);
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PDF_MEASURE_SNAP`: `true`/`false` (default: true)
    /// - `PDF_MEASURE_SNAP_RADIUS`: snap radius in px (default: 12)
    /// - `PDF_MEASURE_UNIT`: one of m, cm, mm, km, in, ft (default: m)
    /// - `PDF_MEASURE_DIMENSION_OFFSET`: dimension offset in px (default: 18)
    /// - `PDF_MEASURE_COUNT_TAG`: initial count tag (default: A)
    ///
    /// # Errors
    /// Returns an error if any variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (var, key) in [
            ("PDF_MEASURE_SNAP", "snap_enabled"),
            ("PDF_MEASURE_SNAP_RADIUS", "snap_radius"),
            ("PDF_MEASURE_UNIT", "unit"),
            ("PDF_MEASURE_DIMENSION_OFFSET", "dimension_offset"),
            ("PDF_MEASURE_COUNT_TAG", "count_tag"),
        ] {
            if let Ok(value) = std::env::var(var) {
                config
                    .apply(key, &value)
                    .map_err(|_| ConfigError::InvalidValue(var.to_string()))?;
            }
        }

        Ok(config)
    }

    /// Loads configuration from a `key = value` file.
    ///
    /// Expected file format:
    /// ```text
    /// snap_enabled = true
    /// snap_radius = 12
    /// dimension_offset = 18
    /// unit = "m"
    /// count_tag = "A"
    /// zoom = 1
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::parse(&contents)
    }

    /// Parses configuration from `key = value` lines.
    ///
    /// Blank lines and `#` comments are skipped, unknown keys ignored.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                config.apply(key.trim(), value.trim().trim_matches('"'))?;
            }
        }

        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue(key.to_string());
        match key {
            "snap_enabled" => self.snap_enabled = value.parse().map_err(|_| invalid())?,
            "snap_radius" => {
                let radius: f64 = value.parse().map_err(|_| invalid())?;
                if !radius.is_finite() || radius < 0.0 {
                    return Err(invalid());
                }
                self.snap_radius = radius;
            }
            "dimension_offset" => {
                let offset: f64 = value.parse().map_err(|_| invalid())?;
                if !offset.is_finite() {
                    return Err(invalid());
                }
                self.dimension_offset = clamp_dimension_offset(offset);
            }
            "unit" => self.unit = value.parse().map_err(|_| invalid())?,
            "count_tag" => self.count_tag = normalize_count_tag(value),
            "zoom" => {
                let zoom: f64 = value.parse().map_err(|_| invalid())?;
                if !zoom.is_finite() {
                    return Err(invalid());
                }
                self.zoom = clamp_zoom(zoom);
            }
            _ => log::debug!("ignoring unknown config key {key}"),
        }
        Ok(())
    }

    /// Saves configuration to a `key = value` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_config_string())?;
        Ok(())
    }

    /// Converts configuration to the file format read by [`parse`](Self::parse).
    pub fn to_config_string(&self) -> String {
        format!(
            "# pdf-measure configuration\n\
             snap_enabled = {}\n\
             snap_radius = {}\n\
             dimension_offset = {}\n\
             unit = \"{}\"\n\
             count_tag = \"{}\"\n\
             zoom = {}\n",
            self.snap_enabled,
            self.snap_radius,
            self.dimension_offset,
            self.unit,
            self.count_tag,
            self.zoom
        )
    }
}

/// Clamp a dimension offset into [`DIMENSION_OFFSET_RANGE`]
pub fn clamp_dimension_offset(offset: f64) -> f64 {
    offset.clamp(DIMENSION_OFFSET_RANGE.0, DIMENSION_OFFSET_RANGE.1)
}

/// Clamp a zoom factor into [`ZOOM_RANGE`]
pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(ZOOM_RANGE.0, ZOOM_RANGE.1)
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
