use crate::error::{FlowError, FlowResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Closed bodies that can be discretized into panels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyShape {
    Cylinder {
        radius: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Naca4 {
        code: String,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
    },
}

impl Default for BodyShape {
    fn default() -> Self {
        BodyShape::Cylinder {
            radius: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

impl BodyShape {
    /// Discretize the body; `panels` is ignored for explicit point lists
    pub fn discretize(&self, panels: usize) -> FlowResult<PanelGeometry> {
        match self {
            BodyShape::Cylinder { radius, x, y } => PanelGeometry::circle(panels, *radius, (*x, *y)),
            BodyShape::Naca4 { code } => PanelGeometry::naca4(code, panels),
            BodyShape::Points { x, y } => PanelGeometry::from_xy(x, y),
        }
    }

    pub fn label(&self) -> String {
        match self {
            BodyShape::Cylinder { radius, .. } => format!("cylinder r={radius}"),
            BodyShape::Naca4 { code } => format!("NACA {code}"),
            BodyShape::Points { x, .. } => format!("{} point body", x.len()),
        }
    }
}

/// Panelled body: N+1 boundary points (first == last) and per-panel geometry
#[derive(Debug, Clone, PartialEq)]
pub struct PanelGeometry {
    pub xb: Vec<f64>,
    pub yb: Vec<f64>,
    pub xc: Vec<f64>,    // control point x (panel midpoint)
    pub yc: Vec<f64>,    // control point y
    pub s: Vec<f64>,     // panel length
    pub phi: Vec<f64>,   // panel angle from +x, in [0, 2pi)
    pub delta: Vec<f64>, // outward normal angle, phi + pi/2
    pub reversed: bool,  // input was counter-clockwise and got flipped
}

impl PanelGeometry {
    /// Build panels from boundary points, closing the list if needed
    pub fn from_points(points: &[(f64, f64)]) -> FlowResult<Self> {
        let mut xb: Vec<f64> = points.iter().map(|p| p.0).collect();
        let mut yb: Vec<f64> = points.iter().map(|p| p.1).collect();

        if let Some(bad) = points.iter().find(|p| !p.0.is_finite() || !p.1.is_finite()) {
            return Err(FlowError::Geometry(format!(
                "boundary point ({}, {}) is not finite",
                bad.0, bad.1
            )));
        }
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if first != last {
                xb.push(first.0);
                yb.push(first.1);
            }
        }
        let n = xb.len().saturating_sub(1);
        if n < 3 {
            return Err(FlowError::Geometry(format!(
                "a closed body needs at least 3 panels, got {n}"
            )));
        }

        // clockwise numbering keeps delta = phi + pi/2 pointing outward
        let edge_sum: f64 = (0..n)
            .map(|i| (xb[i + 1] - xb[i]) * (yb[i + 1] + yb[i]))
            .sum();
        let reversed = edge_sum < 0.0;
        if reversed {
            xb.reverse();
            yb.reverse();
        }

        let mut xc = Vec::with_capacity(n);
        let mut yc = Vec::with_capacity(n);
        let mut s = Vec::with_capacity(n);
        let mut phi = Vec::with_capacity(n);
        let mut delta = Vec::with_capacity(n);
        for i in 0..n {
            let dx = xb[i + 1] - xb[i];
            let dy = yb[i + 1] - yb[i];
            let length = dx.hypot(dy);
            if length == 0.0 {
                return Err(FlowError::Geometry(format!("panel {i} has zero length")));
            }
            let mut angle = dy.atan2(dx);
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            xc.push(0.5 * (xb[i] + xb[i + 1]));
            yc.push(0.5 * (yb[i] + yb[i + 1]));
            s.push(length);
            phi.push(angle);
            delta.push(angle + PI / 2.0);
        }

        debug!("built {n} panels (reversed: {reversed})");
        Ok(Self {
            xb,
            yb,
            xc,
            yc,
            s,
            phi,
            delta,
            reversed,
        })
    }

    pub fn from_xy(x: &[f64], y: &[f64]) -> FlowResult<Self> {
        if x.len() != y.len() {
            return Err(FlowError::Geometry(format!(
                "coordinate lengths differ: {} x values, {} y values",
                x.len(),
                y.len()
            )));
        }
        let points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        Self::from_points(&points)
    }

    /// Circle with boundary points offset by half a panel so no panel straddles the x axis
    pub fn circle(panels: usize, radius: f64, center: (f64, f64)) -> FlowResult<Self> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(FlowError::invalid("radius", format!("must be positive, got {radius}")));
        }
        if panels < 3 {
            return Err(FlowError::invalid("panels", format!("need at least 3, got {panels}")));
        }
        let offset = (360.0 / panels as f64) / 2.0;
        let points: Vec<(f64, f64)> = (0..panels)
            .map(|k| {
                let t = (360.0 * k as f64 / panels as f64 + offset).to_radians();
                (center.0 + radius * t.cos(), center.1 + radius * t.sin())
            })
            .collect();
        Self::from_points(&points)
    }

    /// NACA 4-digit airfoil of unit chord with cosine spacing and a closed trailing edge.
    ///
    /// Points run trailing edge, lower surface, leading edge, upper surface, trailing
    /// edge, so panels 0 and N-1 meet at the trailing edge.
    pub fn naca4(code: &str, panels: usize) -> FlowResult<Self> {
        let digits: Vec<u32> = code.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 4 || code.len() != 4 {
            return Err(FlowError::invalid("naca code", format!("expected 4 digits, got `{code}`")));
        }
        if panels < 4 || panels % 2 != 0 {
            return Err(FlowError::invalid(
                "panels",
                format!("airfoils need an even count of at least 4, got {panels}"),
            ));
        }
        let m = digits[0] as f64 / 100.0;
        let p = digits[1] as f64 / 10.0;
        let t = (digits[2] * 10 + digits[3]) as f64 / 100.0;
        if t == 0.0 {
            return Err(FlowError::invalid("naca code", "thickness must be non-zero"));
        }
        if m > 0.0 && p == 0.0 {
            return Err(FlowError::invalid("naca code", "cambered section needs a camber position"));
        }

        let half = panels / 2;
        let mut upper = Vec::with_capacity(half + 1);
        let mut lower = Vec::with_capacity(half + 1);
        for k in 0..=half {
            let x = 0.5 * (1.0 - (PI * k as f64 / half as f64).cos());
            let (yc, slope) = camber(m, p, x);
            let yt = 5.0
                * t
                * (0.2969 * x.sqrt() - 0.1260 * x - 0.3516 * x.powi(2) + 0.2843 * x.powi(3)
                    - 0.1036 * x.powi(4));
            let theta = slope.atan();
            upper.push((x - yt * theta.sin(), yc + yt * theta.cos()));
            lower.push((x + yt * theta.sin(), yc - yt * theta.cos()));
        }

        let mut points: Vec<(f64, f64)> = lower.iter().rev().copied().collect();
        points.extend(upper[1..half].iter().copied());
        points.push(points[0]);
        Self::from_points(&points)
    }

    /// Number of panels
    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    /// Angle between each outward normal and the freestream, in [0, 2pi)
    pub fn beta(&self, alpha: f64) -> Vec<f64> {
        self.delta
            .iter()
            .map(|d| (d - alpha).rem_euclid(2.0 * PI))
            .collect()
    }

    pub fn chord(&self) -> f64 {
        let (lo, hi) = self
            .xb
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        hi - lo
    }

    pub fn perimeter(&self) -> f64 {
        self.s.iter().sum()
    }

    pub fn boundary_points(&self) -> Vec<(f64, f64)> {
        self.xb.iter().copied().zip(self.yb.iter().copied()).collect()
    }

    /// Even-odd ray cast against the boundary polygon
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        let mut inside = false;
        for i in 0..self.len() {
            let (x1, y1) = (self.xb[i], self.yb[i]);
            let (x2, y2) = (self.xb[i + 1], self.yb[i + 1]);
            if (y1 > py) != (y2 > py) {
                let x_cross = x1 + (py - y1) * (x2 - x1) / (y2 - y1);
                if px < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn camber(m: f64, p: f64, x: f64) -> (f64, f64) {
    if m == 0.0 {
        (0.0, 0.0)
    } else if x < p {
        (
            m / (p * p) * (2.0 * p * x - x * x),
            2.0 * m / (p * p) * (p - x),
        )
    } else {
        (
            m / ((1.0 - p) * (1.0 - p)) * ((1.0 - 2.0 * p) + 2.0 * p * x - x * x),
            2.0 * m / ((1.0 - p) * (1.0 - p)) * (p - x),
        )
    }
}
