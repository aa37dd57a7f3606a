use crate::error::{ensure_finite, FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Elementary flows that can be superposed in a flow field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Singularity {
    Uniform { vx: f64, vy: f64 },
    Source { strength: f64, x: f64, y: f64 },
    Doublet { strength: f64, x: f64, y: f64, alpha: f64 },
    Vortex { strength: f64, x: f64, y: f64 },
    LineSource { strength: f64, x1: f64, y1: f64, x2: f64, y2: f64 },
}

/// All four quantities of one singularity at one point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowSample {
    pub potential: f64,
    pub stream_function: f64,
    pub u: f64,
    pub v: f64,
}

impl std::ops::AddAssign for FlowSample {
    fn add_assign(&mut self, rhs: Self) {
        self.potential += rhs.potential;
        self.stream_function += rhs.stream_function;
        self.u += rhs.u;
        self.v += rhs.v;
    }
}

/// Where a singularity sits, for marker drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementGeometry {
    None,
    Point { x: f64, y: f64 },
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl Singularity {
    /// Uniform flow from Cartesian components
    pub fn uniform(vx: f64, vy: f64) -> Self {
        Singularity::Uniform { vx, vy }
    }

    /// Uniform flow from speed and direction (radians)
    pub fn uniform_polar(magnitude: f64, angle: f64) -> Self {
        Singularity::Uniform {
            vx: magnitude * angle.cos(),
            vy: magnitude * angle.sin(),
        }
    }

    pub fn source(strength: f64, x: f64, y: f64) -> Self {
        Singularity::Source { strength, x, y }
    }

    /// A sink is a source with negative strength
    pub fn sink(strength: f64, x: f64, y: f64) -> Self {
        Singularity::Source {
            strength: -strength.abs(),
            x,
            y,
        }
    }

    pub fn doublet(strength: f64, x: f64, y: f64, alpha: f64) -> Self {
        Singularity::Doublet { strength, x, y, alpha }
    }

    pub fn vortex(strength: f64, x: f64, y: f64) -> Self {
        Singularity::Vortex { strength, x, y }
    }

    /// Line source carrying a total strength spread evenly between two distinct endpoints
    pub fn line_source(strength: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> FlowResult<Self> {
        let line = Singularity::LineSource { strength, x1, y1, x2, y2 };
        line.validate()?;
        Ok(line)
    }

    /// Check that every parameter is finite and line endpoints are distinct
    pub fn validate(&self) -> FlowResult<()> {
        match *self {
            Singularity::Uniform { vx, vy } => {
                ensure_finite("vx", vx)?;
                ensure_finite("vy", vy)?;
            }
            Singularity::Source { strength, x, y } | Singularity::Vortex { strength, x, y } => {
                ensure_finite("strength", strength)?;
                ensure_finite("x", x)?;
                ensure_finite("y", y)?;
            }
            Singularity::Doublet { strength, x, y, alpha } => {
                ensure_finite("strength", strength)?;
                ensure_finite("x", x)?;
                ensure_finite("y", y)?;
                ensure_finite("alpha", alpha)?;
            }
            Singularity::LineSource { strength, x1, y1, x2, y2 } => {
                ensure_finite("strength", strength)?;
                ensure_finite("x1", x1)?;
                ensure_finite("y1", y1)?;
                ensure_finite("x2", x2)?;
                ensure_finite("y2", y2)?;
                if x1 == x2 && y1 == y2 {
                    return Err(FlowError::invalid(
                        "line endpoints",
                        format!("start and end coincide at ({x1}, {y1})"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Display name; a negative-strength source reads as a sink
    pub fn kind_name(&self) -> &'static str {
        match self {
            Singularity::Uniform { .. } => "Uniform",
            Singularity::Source { .. } if self.is_sink() => "Sink",
            Singularity::Source { .. } => "Source",
            Singularity::Doublet { .. } => "Doublet",
            Singularity::Vortex { .. } => "Vortex",
            Singularity::LineSource { .. } => "LineSource",
        }
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, Singularity::Source { strength, .. } if *strength < 0.0)
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, Singularity::Uniform { .. })
    }

    /// Signed strength; uniform flow reports its speed
    pub fn strength(&self) -> f64 {
        match *self {
            Singularity::Uniform { vx, vy } => vx.hypot(vy),
            Singularity::Source { strength, .. }
            | Singularity::Doublet { strength, .. }
            | Singularity::Vortex { strength, .. }
            | Singularity::LineSource { strength, .. } => strength,
        }
    }

    pub fn set_strength(&mut self, value: f64) {
        match self {
            Singularity::Uniform { vx, vy } => {
                let speed = vx.hypot(*vy);
                if speed > 0.0 {
                    *vx *= value / speed;
                    *vy *= value / speed;
                } else {
                    *vx = value;
                    *vy = 0.0;
                }
            }
            Singularity::Source { strength, .. }
            | Singularity::Doublet { strength, .. }
            | Singularity::Vortex { strength, .. }
            | Singularity::LineSource { strength, .. } => *strength = value,
        }
    }

    /// Move a point singularity; line sources keep their length and direction
    pub fn set_position(&mut self, px: f64, py: f64) {
        match self {
            Singularity::Uniform { .. } => {}
            Singularity::Source { x, y, .. }
            | Singularity::Doublet { x, y, .. }
            | Singularity::Vortex { x, y, .. } => {
                *x = px;
                *y = py;
            }
            Singularity::LineSource { x1, y1, x2, y2, .. } => {
                let (dx, dy) = (*x2 - *x1, *y2 - *y1);
                *x1 = px;
                *y1 = py;
                *x2 = px + dx;
                *y2 = py + dy;
            }
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Singularity::Uniform { .. } => {}
            Singularity::Source { x, y, .. }
            | Singularity::Doublet { x, y, .. }
            | Singularity::Vortex { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Singularity::LineSource { x1, y1, x2, y2, .. } => {
                *x1 += dx;
                *y1 += dy;
                *x2 += dx;
                *y2 += dy;
            }
        }
    }

    pub fn geometry(&self) -> ElementGeometry {
        match *self {
            Singularity::Uniform { .. } => ElementGeometry::None,
            Singularity::Source { x, y, .. }
            | Singularity::Doublet { x, y, .. }
            | Singularity::Vortex { x, y, .. } => ElementGeometry::Point { x, y },
            Singularity::LineSource { x1, y1, x2, y2, .. } => {
                ElementGeometry::Line { x1, y1, x2, y2 }
            }
        }
    }

    /// Evaluate potential, stream function and velocity at (px, py).
    ///
    /// Points on top of a point singularity produce inf/NaN; nothing is filtered here.
    pub fn evaluate(&self, px: f64, py: f64) -> FlowSample {
        match *self {
            Singularity::Uniform { vx, vy } => FlowSample {
                potential: vx * px + vy * py,
                stream_function: vx * py - vy * px,
                u: vx,
                v: vy,
            },
            Singularity::Source { strength, x, y } => {
                let (r, theta) = polar(px - x, py - y);
                let k = strength / (2.0 * PI);
                let vr = k / r;
                FlowSample {
                    potential: k * r.ln(),
                    stream_function: k * theta,
                    u: vr * theta.cos(),
                    v: vr * theta.sin(),
                }
            }
            Singularity::Doublet { strength, x, y, alpha } => {
                let (r, theta) = polar(px - x, py - y);
                let rel = theta - alpha;
                let k = strength / (2.0 * PI);
                let vr = -k * rel.cos() / (r * r);
                let vt = -k * rel.sin() / (r * r);
                FlowSample {
                    potential: k * rel.cos() / r,
                    stream_function: -k * rel.sin() / r,
                    u: vr * theta.cos() - vt * theta.sin(),
                    v: vr * theta.sin() + vt * theta.cos(),
                }
            }
            Singularity::Vortex { strength, x, y } => {
                let (r, theta) = polar(px - x, py - y);
                let k = strength / (2.0 * PI);
                let vt = -k / r;
                FlowSample {
                    potential: -k * theta,
                    stream_function: k * r.ln(),
                    u: -vt * theta.sin(),
                    v: vt * theta.cos(),
                }
            }
            Singularity::LineSource { strength, x1, y1, x2, y2 } => {
                line_source_sample(strength, x1, y1, x2, y2, px, py)
            }
        }
    }

    pub fn potential(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y).potential
    }

    pub fn stream_function(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y).stream_function
    }

    pub fn velocity(&self, x: f64, y: f64) -> (f64, f64) {
        let s = self.evaluate(x, y);
        (s.u, s.v)
    }

    pub fn velocity_x(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y).u
    }

    pub fn velocity_y(&self, x: f64, y: f64) -> f64 {
        self.evaluate(x, y).v
    }

    /// Vectorized evaluation over paired coordinate slices
    pub fn evaluate_points(&self, xs: &[f64], ys: &[f64]) -> Vec<FlowSample> {
        xs.iter().zip(ys).map(|(&x, &y)| self.evaluate(x, y)).collect()
    }
}

fn polar(dx: f64, dy: f64) -> (f64, f64) {
    ((dx * dx + dy * dy).sqrt(), dy.atan2(dx))
}

/// Closed-form line source: integrals of a point source over the segment,
/// worked in segment-local coordinates (xi along, eta normal) and rotated back.
///
/// The stream function's branch cut runs along the segment and its backward
/// extension beyond `(x1, y1)`; crossing that extension changes psi by `strength`.
fn line_source_sample(
    strength: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    px: f64,
    py: f64,
) -> FlowSample {
    let (dx, dy) = (x2 - x1, y2 - y1);
    let length = dx.hypot(dy);
    let (cos_a, sin_a) = (dx / length, dy / length);
    let sigma = strength / length;
    let k = sigma / (2.0 * PI);

    let (rx, ry) = (px - x1, py - y1);
    let xi = rx * cos_a + ry * sin_a;
    let eta = -rx * sin_a + ry * cos_a;
    let eta2 = eta * eta;

    let us = 0.5 * k * ((xi * xi + eta2) / ((xi - length).powi(2) + eta2)).ln();
    let un = k * (eta.atan2(xi - length) - eta.atan2(xi));

    // antiderivative of ln(r) along the segment
    let log_integral = |t: f64| {
        let angular = if eta == 0.0 { 0.0 } else { eta * (t / eta).atan() };
        0.5 * t * (t * t + eta2).ln() - t + angular
    };
    // antiderivative of the polar angle along the segment
    let angle_integral = |t: f64| t * eta.atan2(t) + 0.5 * eta * (t * t + eta2).ln();

    FlowSample {
        potential: k * (log_integral(xi) - log_integral(xi - length)),
        stream_function: k
            * (angle_integral(xi) - angle_integral(xi - length) + length * dy.atan2(dx)),
        u: us * cos_a - un * sin_a,
        v: us * sin_a + un * cos_a,
    }
}
