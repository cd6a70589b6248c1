use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Maps host display dimensions onto a simulation domain.
///
/// Larger displays get a larger model area, but far less than linearly:
/// `model_area = area_base + width_px * height_px * area_factor`.
/// The domain keeps the display's aspect ratio.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DisplayCalibration {
    pub width_px: u32,
    pub height_px: u32,
    #[serde(default = "default_area_base")]
    pub area_base: f64,
    #[serde(default = "default_area_factor")]
    pub area_factor: f64,
}

fn default_area_base() -> f64 {
    8000.0
}

fn default_area_factor() -> f64 {
    0.012 // how strongly screen size impacts simulation area
}

impl Default for DisplayCalibration {
    fn default() -> Self {
        DisplayCalibration {
            width_px: 1280,
            height_px: 800,
            area_base: default_area_base(),
            area_factor: default_area_factor(),
        }
    }
}

impl DisplayCalibration {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        DisplayCalibration { width_px, height_px, ..Default::default() }
    }

    /// Model area in square simulation units.
    pub fn model_area(&self) -> f64 {
        self.area_base + self.width_px as f64 * self.height_px as f64 * self.area_factor
    }

    /// Returns `(width, height)` of the simulation domain.
    pub fn domain_size(&self) -> Result<(f64, f64)> {
        if self.width_px == 0 || self.height_px == 0 {
            anyhow::bail!(
                "Display dimensions must be non-zero (got {}x{}).",
                self.width_px,
                self.height_px
            );
        }
        let model_area = self.model_area();
        if !(model_area.is_finite() && model_area > 0.0) {
            anyhow::bail!("Calibrated model area must be positive (got {}).", model_area);
        }
        let height = (model_area * self.height_px as f64 / self.width_px as f64).sqrt();
        let width = model_area / height;
        Ok((width, height))
    }

    /// Screen pixels per simulation unit, for renderers that fill the display.
    pub fn pixels_per_unit(&self) -> Result<f64> {
        let (_, height) = self.domain_size()?;
        Ok(self.height_px as f64 / height)
    }
}
