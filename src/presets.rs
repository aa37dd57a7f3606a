use crate::error::{ensure_finite, FlowError, FlowResult};
use crate::singularity::Singularity;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Canonical element combinations with known analytic answers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preset {
    Cylinder {
        speed: f64,
        radius: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    RotatingCylinder {
        speed: f64,
        radius: f64,
        circulation: f64,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    RankineOval {
        speed: f64,
        strength: f64,
        separation: f64,
    },
}

impl Preset {
    pub fn cylinder(speed: f64, radius: f64) -> Self {
        Preset::Cylinder { speed, radius, x: 0.0, y: 0.0 }
    }

    pub fn rotating_cylinder(speed: f64, radius: f64, circulation: f64) -> Self {
        Preset::RotatingCylinder {
            speed,
            radius,
            circulation,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn rankine_oval(speed: f64, strength: f64, separation: f64) -> Self {
        Preset::RankineOval {
            speed,
            strength,
            separation,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Cylinder { .. } => "cylinder",
            Preset::RotatingCylinder { .. } => "rotating_cylinder",
            Preset::RankineOval { .. } => "rankine_oval",
        }
    }

    fn validate(&self) -> FlowResult<()> {
        match *self {
            Preset::Cylinder { speed, radius, x, y } => {
                positive("speed", speed)?;
                positive("radius", radius)?;
                ensure_finite("x", x)?;
                ensure_finite("y", y)?;
            }
            Preset::RotatingCylinder {
                speed,
                radius,
                circulation,
                x,
                y,
            } => {
                positive("speed", speed)?;
                positive("radius", radius)?;
                ensure_finite("circulation", circulation)?;
                ensure_finite("x", x)?;
                ensure_finite("y", y)?;
            }
            Preset::RankineOval {
                speed,
                strength,
                separation,
            } => {
                positive("speed", speed)?;
                positive("strength", strength)?;
                positive("separation", separation)?;
            }
        }
        Ok(())
    }

    /// Singularities that make up the preset
    pub fn elements(&self) -> FlowResult<Vec<Singularity>> {
        self.validate()?;
        let elements = match *self {
            Preset::Cylinder { speed, radius, x, y } => vec![
                Singularity::uniform(speed, 0.0),
                Singularity::doublet(2.0 * PI * speed * radius * radius, x, y, 0.0),
            ],
            Preset::RotatingCylinder {
                speed,
                radius,
                circulation,
                x,
                y,
            } => vec![
                Singularity::uniform(speed, 0.0),
                Singularity::doublet(2.0 * PI * speed * radius * radius, x, y, 0.0),
                Singularity::vortex(circulation, x, y),
            ],
            Preset::RankineOval {
                speed,
                strength,
                separation,
            } => {
                let b = separation / 2.0;
                vec![
                    Singularity::uniform(speed, 0.0),
                    Singularity::source(strength, -b, 0.0),
                    Singularity::source(-strength, b, 0.0),
                ]
            }
        };
        Ok(elements)
    }

    /// Surface pressure coefficient at body angle `theta` (cylinders only)
    pub fn surface_cp(&self, theta: f64) -> Option<f64> {
        match *self {
            Preset::Cylinder { .. } => Some(cylinder_cp(theta)),
            Preset::RotatingCylinder {
                speed,
                radius,
                circulation,
                ..
            } => Some(rotating_cylinder_cp(theta, speed, radius, circulation)),
            Preset::RankineOval { .. } => None,
        }
    }

    /// Kutta-Joukowski lift per unit span
    pub fn lift(&self, density: f64) -> f64 {
        match *self {
            Preset::RotatingCylinder {
                speed, circulation, ..
            } => kutta_joukowski_lift(density, speed, circulation),
            _ => 0.0,
        }
    }
}

fn positive(name: &'static str, value: f64) -> FlowResult<f64> {
    let value = ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(FlowError::invalid(name, format!("must be positive, got {value}")));
    }
    Ok(value)
}

/// Non-lifting cylinder: Cp = 1 - 4 sin^2(theta)
pub fn cylinder_cp(theta: f64) -> f64 {
    1.0 - 4.0 * theta.sin().powi(2)
}

/// Lifting cylinder with clockwise-positive circulation convention of `Vortex`
pub fn rotating_cylinder_cp(theta: f64, speed: f64, radius: f64, circulation: f64) -> f64 {
    let vt = 2.0 * theta.sin() + circulation / (2.0 * PI * radius * speed);
    1.0 - vt * vt
}

pub fn kutta_joukowski_lift(density: f64, speed: f64, circulation: f64) -> f64 {
    density * speed * circulation
}

/// Newton iteration controls for the Rankine oval contour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub points: usize,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-12,
            points: 250,
        }
    }
}

/// Closed body contour of a Rankine oval
#[derive(Debug, Clone, PartialEq)]
pub struct RankineContour {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub half_length: f64,
    pub half_thickness: f64,
    pub iterations: usize,
}

/// Distance from the oval centre to either stagnation point
pub fn rankine_half_length(speed: f64, strength: f64, separation: f64) -> FlowResult<f64> {
    Preset::rankine_oval(speed, strength, separation).validate()?;
    let b = separation / 2.0;
    Ok((b * b + strength * b / (PI * speed)).sqrt())
}

/// Trace the dividing streamline psi = 0 by per-angle Newton-Raphson in r
pub fn rankine_contour(
    speed: f64,
    strength: f64,
    separation: f64,
    options: &NewtonOptions,
) -> FlowResult<RankineContour> {
    let r0 = rankine_half_length(speed, strength, separation)?;
    if options.points < 3 {
        return Err(FlowError::invalid("points", "at least three contour points are required"));
    }
    let b = separation / 2.0;
    let k = strength / (2.0 * PI);
    let n = options.points;

    // theta = 0 and 2*pi leave psi identically zero; stay just inside them
    let thetas: Vec<f64> = (0..n)
        .map(|i| 1e-6 + (2.0 * PI - 2e-6) * i as f64 / (n - 1) as f64)
        .collect();
    let mut radii = vec![r0; n];

    let mut residual = f64::INFINITY;
    for iteration in 0..options.max_iterations {
        residual = 0.0;
        for (r, &t) in radii.iter_mut().zip(&thetas) {
            let (s, c) = t.sin_cos();
            let (x, y) = (*r * c, *r * s);
            let psi = speed * *r * s + k * (y.atan2(x + b) - y.atan2(x - b));
            let d1 = b * s / (*r * *r + 2.0 * *r * b * c + b * b);
            let d2 = -b * s / (*r * *r - 2.0 * *r * b * c + b * b);
            let dpsi = speed * s + k * (d1 - d2);
            residual = residual.max(psi.abs());
            if dpsi != 0.0 {
                *r -= psi / dpsi;
            }
        }
        if !residual.is_finite() {
            break;
        }
        if residual < options.tolerance {
            debug!("rankine contour converged in {iteration} iterations");
            let x = radii.iter().zip(&thetas).map(|(r, t)| r * t.cos()).collect();
            let y: Vec<f64> = radii.iter().zip(&thetas).map(|(r, t)| r * t.sin()).collect();
            let half_thickness = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            return Ok(RankineContour {
                x,
                y,
                half_length: r0,
                half_thickness,
                iterations: iteration,
            });
        }
    }
    Err(FlowError::NoConvergence {
        what: "rankine oval contour",
        iterations: options.max_iterations,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowfield::FlowField;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn cylinder_doublet_strength_scales_with_radius() {
        let elements = Preset::cylinder(2.0, 0.5).elements().unwrap();
        match elements[1] {
            Singularity::Doublet { strength, .. } => {
                assert_relative_eq!(strength, 2.0 * PI * 2.0 * 0.25)
            }
            ref other => panic!("unexpected element {other:?}"),
        }
        let field = FlowField::from_elements(elements).unwrap();
        let (u, v) = field.velocity_at(0.5, 0.0);
        assert_abs_diff_eq!(u, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn superposed_cylinder_matches_analytic_cp() {
        let preset = Preset::cylinder(1.0, 1.0);
        let field = FlowField::from_elements(preset.elements().unwrap()).unwrap();
        for k in 0..8 {
            let t = 0.2 + k as f64 * PI / 4.0;
            let (u, v) = field.velocity_at(t.cos(), t.sin());
            let cp = 1.0 - (u * u + v * v);
            assert_abs_diff_eq!(cp, preset.surface_cp(t).unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn rotating_cylinder_surface_speed() {
        let gamma = 1.5;
        let preset = Preset::rotating_cylinder(1.0, 1.0, gamma);
        let field = FlowField::from_elements(preset.elements().unwrap()).unwrap();
        let t: f64 = 1.1;
        let (u, v) = field.velocity_at(t.cos(), t.sin());
        let cp = 1.0 - (u * u + v * v);
        assert_abs_diff_eq!(cp, preset.surface_cp(t).unwrap(), epsilon = 1e-12);
        assert_relative_eq!(preset.lift(1.225), 1.225 * gamma);
    }

    #[test]
    fn rankine_oval_dimensions() {
        let contour = rankine_contour(1.0, 1.0, 1.0, &NewtonOptions::default()).unwrap();
        assert_abs_diff_eq!(contour.half_length, 0.63965, epsilon = 1e-5);
        assert_abs_diff_eq!(contour.half_thickness, 0.31917, epsilon = 1e-3);
        assert!(contour.iterations < 100);

        // every contour point sits on the dividing streamline
        let field = FlowField::from_elements(
            Preset::rankine_oval(1.0, 1.0, 1.0).elements().unwrap(),
        )
        .unwrap();
        for (x, y) in contour.x.iter().zip(&contour.y).step_by(17) {
            let psi = field.sample_point(*x, *y).stream_function;
            assert_abs_diff_eq!(psi, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn rankine_rejects_zero_speed() {
        assert!(matches!(
            rankine_contour(0.0, 1.0, 1.0, &NewtonOptions::default()),
            Err(FlowError::InvalidParameter { name: "speed", .. })
        ));
    }

    #[test]
    fn rankine_reports_iteration_cap() {
        let options = NewtonOptions {
            max_iterations: 1,
            ..NewtonOptions::default()
        };
        assert!(matches!(
            rankine_contour(1.0, 1.0, 1.0, &options),
            Err(FlowError::NoConvergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn preset_serde_tag() {
        let json = r#"{"kind":"cylinder","speed":1.0,"radius":2.0}"#;
        let preset: Preset = serde_json::from_str(json).unwrap();
        assert_eq!(preset, Preset::cylinder(1.0, 2.0));
    }
}
