use crate::error::{FlowError, FlowResult};
use crate::flowfield::FieldOptions;
use crate::grid::Domain;
use crate::panel::BodyShape;
use crate::presets::Preset;
use crate::singularity::Singularity;
use crate::solver::{Freestream, PanelMethod};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub xsteps: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
            xsteps: 300,
        }
    }
}

impl GridConfig {
    pub fn domain(&self) -> FlowResult<Domain> {
        Domain::new(self.xmin, self.xmax, self.ymin, self.ymax)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreestreamConfig {
    pub speed: f64,     // m/s
    pub alpha_deg: f64, // angle of attack in degrees
    pub density: f64,   // kg/m^3
}

impl Default for FreestreamConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            alpha_deg: 0.0,
            density: 1.225,
        }
    }
}

impl FreestreamConfig {
    pub fn freestream(&self) -> Freestream {
        Freestream::from_degrees(self.speed, self.alpha_deg).with_density(self.density)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub body: BodyShape,
    pub panels: usize,
    pub method: PanelMethod,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            body: BodyShape::default(),
            panels: 8,
            method: PanelMethod::Source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub start_deg: f64,
    pub end_deg: f64,
    pub step_deg: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_deg: -5.0,
            end_deg: 10.0,
            step_deg: 1.0,
        }
    }
}

/// Most angles a single sweep may produce
pub const MAX_SWEEP_ANGLES: usize = 10_000;

impl SweepConfig {
    /// Angles from start to end inclusive
    pub fn angles(&self) -> FlowResult<Vec<f64>> {
        if !(self.step_deg > 0.0) || !self.step_deg.is_finite() {
            return Err(FlowError::invalid("step_deg", "sweep step must be positive"));
        }
        if !self.start_deg.is_finite() || !self.end_deg.is_finite() {
            return Err(FlowError::invalid("end_deg", "sweep bounds must be finite"));
        }
        if self.end_deg < self.start_deg {
            return Err(FlowError::invalid("end_deg", "sweep end is before its start"));
        }
        let steps = ((self.end_deg - self.start_deg) / self.step_deg + 1e-9).floor();
        if steps >= MAX_SWEEP_ANGLES as f64 {
            return Err(FlowError::invalid(
                "step_deg",
                format!("sweep would produce more than {MAX_SWEEP_ANGLES} angles"),
            ));
        }
        let count = steps as usize + 1;
        Ok((0..count)
            .map(|i| self.start_deg + i as f64 * self.step_deg)
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub width: u32,
    pub height: u32,
    pub contour_levels: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            width: 800,
            height: 800,
            contour_levels: 15,
        }
    }
}

/// Full run configuration; every section falls back to its defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub grid: GridConfig,
    pub freestream: FreestreamConfig,
    pub panel: PanelConfig,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
    pub elements: Vec<Singularity>,
    pub preset: Option<Preset>,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> FlowResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> FlowResult<Self> {
        let config: RunConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FlowResult<()> {
        self.grid.domain()?;
        for element in &self.elements {
            element.validate()?;
        }
        if self.output.width == 0 || self.output.height == 0 {
            return Err(FlowError::invalid("output size", "image dimensions must be non-zero"));
        }
        Ok(())
    }

    pub fn field_options(&self) -> FieldOptions {
        FieldOptions {
            contour_levels: self.output.contour_levels,
            ..FieldOptions::default()
        }
    }
}
