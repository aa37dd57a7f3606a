use crate::error::{FlowError, FlowResult};
use crate::flowfield::FlowField;
use crate::grid::{Domain, SamplingGrid};
use crate::influence::{point_source_kernels, point_vortex_kernels};
use crate::panel::PanelGeometry;
use crate::solver::{Freestream, PanelStrengths};
use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use std::f64::consts::PI;

/// Velocity handed out for points inside the body so tracers stall there
pub const INTERIOR_VELOCITY: (f64, f64) = (0.0007, 0.0007);

/// Anything that can report a velocity at a point
pub trait VelocityProvider: Sync {
    fn velocity_at(&self, x: f64, y: f64) -> (f64, f64);

    /// Whether streamlines must stop at this point
    fn is_solid(&self, _x: f64, _y: f64) -> bool {
        false
    }
}

impl VelocityProvider for FlowField {
    fn velocity_at(&self, x: f64, y: f64) -> (f64, f64) {
        FlowField::velocity_at(self, x, y)
    }
}

/// Off-body velocity induced by solved panels plus the freestream
#[derive(Debug, Clone, Copy)]
pub struct FieldSampler<'a> {
    geometry: &'a PanelGeometry,
    strengths: &'a PanelStrengths,
    freestream: Freestream,
}

impl<'a> FieldSampler<'a> {
    /// Fails unless there is one source and one vortex strength per panel
    pub fn new(
        geometry: &'a PanelGeometry,
        strengths: &'a PanelStrengths,
        freestream: Freestream,
    ) -> FlowResult<Self> {
        let n = geometry.len();
        if strengths.lambda.len() != n || strengths.gamma.len() != n {
            return Err(FlowError::Geometry(format!(
                "{n} panels but {} source and {} vortex strengths",
                strengths.lambda.len(),
                strengths.gamma.len()
            )));
        }
        Ok(Self {
            geometry,
            strengths,
            freestream,
        })
    }

    /// Velocity ignoring the interior mask
    fn induced_velocity(&self, x: f64, y: f64) -> (f64, f64) {
        let source = point_source_kernels(self.geometry, x, y);
        let (nx, ny) = point_vortex_kernels(&source);
        let (mx, my) = source;

        let (sin_a, cos_a) = self.freestream.alpha.sin_cos();
        let mut vx = self.freestream.speed * cos_a;
        let mut vy = self.freestream.speed * sin_a;
        for j in 0..self.geometry.len() {
            let lambda = self.strengths.lambda[j];
            let gamma = self.strengths.gamma[j];
            vx += (lambda * mx[j] - gamma * nx[j]) / (2.0 * PI);
            vy += (lambda * my[j] - gamma * ny[j]) / (2.0 * PI);
        }
        (vx, vy)
    }

    pub fn velocity_at_points(&self, points: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
        points
            .par_iter()
            .map(|&(x, y)| VelocityProvider::velocity_at(self, x, y))
            .unzip()
    }

    /// Velocity, speed and Cp over a grid
    pub fn sample(&self, grid: &SamplingGrid) -> VelocityField {
        let shape = grid.shape();
        let samples: Vec<(f64, f64, bool)> = (0..grid.len())
            .into_par_iter()
            .map(|k| {
                let (x, y) = grid.flat_point(k);
                if self.geometry.contains_point(x, y) {
                    (INTERIOR_VELOCITY.0, INTERIOR_VELOCITY.1, true)
                } else {
                    let (vx, vy) = self.induced_velocity(x, y);
                    (vx, vy, false)
                }
            })
            .collect();

        let at = |j: usize, i: usize| samples[j * shape.1 + i];
        let vx = Array2::from_shape_fn(shape, |(j, i)| at(j, i).0);
        let vy = Array2::from_shape_fn(shape, |(j, i)| at(j, i).1);
        let inside = Array2::from_shape_fn(shape, |(j, i)| at(j, i).2);
        let speed = ndarray::Zip::from(&vx)
            .and(&vy)
            .map_collect(|&u, &v| (u * u + v * v).sqrt());
        let v_inf = self.freestream.speed;
        let cp = speed.mapv(|s| 1.0 - (s / v_inf).powi(2));

        let masked = inside.iter().filter(|&&m| m).count();
        debug!(
            "sampled {}x{} panel field, {masked} points inside the body",
            shape.1, shape.0
        );
        VelocityField {
            vx,
            vy,
            speed,
            cp,
            inside,
        }
    }
}

impl VelocityProvider for FieldSampler<'_> {
    fn velocity_at(&self, x: f64, y: f64) -> (f64, f64) {
        if self.geometry.contains_point(x, y) {
            INTERIOR_VELOCITY
        } else {
            self.induced_velocity(x, y)
        }
    }

    fn is_solid(&self, x: f64, y: f64) -> bool {
        self.geometry.contains_point(x, y)
    }
}

/// Sampled panel-method velocity field, arrays shaped (ny, nx)
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    pub vx: Array2<f64>,
    pub vy: Array2<f64>,
    pub speed: Array2<f64>,
    pub cp: Array2<f64>,
    pub inside: Array2<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamlineOptions {
    pub step: f64,           // arc length per step as a fraction of domain width
    pub max_steps: usize,
    pub min_speed: f64,      // below this a streamline is considered stalled
    pub seed_fraction: f64,  // seeds per y sample along the inflow edge
}

impl Default for StreamlineOptions {
    fn default() -> Self {
        Self {
            step: 0.005,
            max_steps: 2000,
            min_speed: 1e-3,
            seed_fraction: 0.3,
        }
    }
}

fn unit_velocity<P: VelocityProvider + ?Sized>(
    provider: &P,
    x: f64,
    y: f64,
    min_speed: f64,
) -> Option<(f64, f64)> {
    let (u, v) = provider.velocity_at(x, y);
    let speed = (u * u + v * v).sqrt();
    if !speed.is_finite() || speed < min_speed {
        None
    } else {
        Some((u / speed, v / speed))
    }
}

/// Trace one streamline with midpoint (RK2) steps of fixed arc length.
///
/// Stops when it leaves the domain, enters a solid, stalls or hits the step cap.
pub fn trace_streamline<P: VelocityProvider + ?Sized>(
    provider: &P,
    seed: (f64, f64),
    domain: &Domain,
    options: &StreamlineOptions,
) -> Vec<(f64, f64)> {
    let h = options.step * domain.width().max(domain.height());
    let mut points = vec![seed];
    let (mut x, mut y) = seed;
    if h <= 0.0 || provider.is_solid(x, y) {
        return points;
    }

    for _ in 0..options.max_steps {
        let Some((u1, v1)) = unit_velocity(provider, x, y, options.min_speed) else {
            break;
        };
        let (xm, ym) = (x + 0.5 * h * u1, y + 0.5 * h * v1);
        let Some((u2, v2)) = unit_velocity(provider, xm, ym, options.min_speed) else {
            break;
        };
        x += h * u2;
        y += h * v2;
        if !domain.contains(x, y) || provider.is_solid(x, y) {
            break;
        }
        points.push((x, y));
    }
    points
}

/// Streamlines seeded evenly along the left edge of the grid's domain
pub fn streamlines<P: VelocityProvider + ?Sized>(
    provider: &P,
    grid: &SamplingGrid,
    options: &StreamlineOptions,
) -> Vec<Vec<(f64, f64)>> {
    let domain = grid.domain;
    let count = ((options.seed_fraction * grid.ny() as f64).round() as usize).max(1);
    let seeds = crate::grid::linspace(domain.ymin, domain.ymax, count);
    debug!("tracing {count} streamlines");
    seeds
        .par_iter()
        .map(|&y| trace_streamline(provider, (domain.xmin, y), &domain, options))
        .filter(|line| line.len() > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::singularity::Singularity;
    use crate::solver::{CombinedPanelSolver, SourcePanelSolver};
    use approx::assert_abs_diff_eq;

    fn cylinder_sampler_parts() -> (PanelGeometry, PanelStrengths) {
        let geometry = PanelGeometry::circle(64, 1.0, (0.0, 0.0)).unwrap();
        let solution = SourcePanelSolver
            .solve(&geometry, &Freestream::default())
            .unwrap();
        let strengths = PanelStrengths {
            lambda: solution.lambda.clone(),
            gamma: vec![0.0; geometry.len()],
        };
        (geometry, strengths)
    }

    #[test]
    fn zero_strengths_give_freestream() {
        let geometry = PanelGeometry::circle(8, 1.0, (0.0, 0.0)).unwrap();
        let strengths = PanelStrengths {
            lambda: vec![0.0; 8],
            gamma: vec![0.0; 8],
        };
        let freestream = Freestream::new(2.0, 0.5);
        let sampler = FieldSampler::new(&geometry, &strengths, freestream).unwrap();
        let (vx, vy) = VelocityProvider::velocity_at(&sampler, 3.0, 1.0);
        assert_abs_diff_eq!(vx, 2.0 * 0.5_f64.cos(), epsilon = 1e-14);
        assert_abs_diff_eq!(vy, 2.0 * 0.5_f64.sin(), epsilon = 1e-14);
    }

    #[test]
    fn mismatched_strengths_are_rejected() {
        let geometry = PanelGeometry::circle(8, 1.0, (0.0, 0.0)).unwrap();
        let short = PanelStrengths {
            lambda: vec![0.0; 4],
            gamma: vec![0.0; 4],
        };
        let err = FieldSampler::new(&geometry, &short, Freestream::default()).unwrap_err();
        assert!(matches!(err, FlowError::Geometry(_)));

        let lopsided = PanelStrengths {
            lambda: vec![0.0; 8],
            gamma: vec![0.0; 9],
        };
        assert!(FieldSampler::new(&geometry, &lopsided, Freestream::default()).is_err());
    }

    #[test]
    fn interior_points_get_placeholder() {
        let (geometry, strengths) = cylinder_sampler_parts();
        let sampler = FieldSampler::new(&geometry, &strengths, Freestream::default()).unwrap();
        assert_eq!(
            VelocityProvider::velocity_at(&sampler, 0.1, 0.2),
            INTERIOR_VELOCITY
        );
        let grid = SamplingGrid::with_steps(Domain::new(-2.0, 2.0, -2.0, 2.0).unwrap(), 9, 9).unwrap();
        let field = sampler.sample(&grid);
        assert!(field.inside[[4, 4]]);
        assert_eq!(field.vx[[4, 4]], 0.0007);
        assert!(!field.inside[[0, 0]]);
    }

    #[test]
    fn cylinder_field_matches_analytic() {
        let (geometry, strengths) = cylinder_sampler_parts();
        let sampler = FieldSampler::new(&geometry, &strengths, Freestream::default()).unwrap();
        for (x, y) in [(-1.5, 0.0), (0.0, 1.5), (1.2, 0.9), (3.0, -2.0)] {
            let r2 = x * x + y * y;
            let t = f64::atan2(y, x);
            let vr = (1.0 - 1.0 / r2) * t.cos();
            let vt = -(1.0 + 1.0 / r2) * t.sin();
            let (u, v) = VelocityProvider::velocity_at(&sampler, x, y);
            assert_abs_diff_eq!(u, vr * t.cos() - vt * t.sin(), epsilon = 1.5e-2);
            assert_abs_diff_eq!(v, vr * t.sin() + vt * t.cos(), epsilon = 1.5e-2);
        }
    }

    #[test]
    fn contour_circulation_matches_solution() {
        let geometry = PanelGeometry::naca4("0012", 50).unwrap();
        let freestream = Freestream::from_degrees(1.0, 5.0);
        let solution = CombinedPanelSolver.solve(&geometry, &freestream).unwrap();
        let strengths = PanelStrengths {
            lambda: solution.lambda.clone(),
            gamma: vec![solution.gamma; geometry.len()],
        };
        let sampler = FieldSampler::new(&geometry, &strengths, freestream).unwrap();

        // counter-clockwise line integral; vortex strength is clockwise-positive
        let n = 2000;
        let radius = 3.0;
        let mut circulation = 0.0;
        for k in 0..n {
            let t = 2.0 * PI * (k as f64 + 0.5) / n as f64;
            let (u, v) =
                VelocityProvider::velocity_at(&sampler, 0.5 + radius * t.cos(), radius * t.sin());
            circulation += (-u * t.sin() + v * t.cos()) * radius * 2.0 * PI / n as f64;
        }
        assert_abs_diff_eq!(circulation, -solution.circulation, epsilon = 1e-4);
    }

    #[test]
    fn streamlines_follow_uniform_flow() {
        let field = FlowField::from_elements(vec![Singularity::uniform(1.0, 0.0)]).unwrap();
        let grid = SamplingGrid::new(Domain::default(), 20).unwrap();
        let options = StreamlineOptions::default();
        let lines = streamlines(&field, &grid, &options);
        assert_eq!(lines.len(), 6);
        for line in &lines {
            let y0 = line[0].1;
            assert!(line.iter().all(|p| (p.1 - y0).abs() < 1e-12));
            assert!(line.last().unwrap().0 > 0.98);
        }
    }

    #[test]
    fn streamlines_stop_at_the_body() {
        let (geometry, strengths) = cylinder_sampler_parts();
        let sampler = FieldSampler::new(&geometry, &strengths, Freestream::default()).unwrap();
        let domain = Domain::new(-3.0, 3.0, -2.0, 2.0).unwrap();
        let line = trace_streamline(&sampler, (-3.0, 0.0), &domain, &StreamlineOptions::default());
        // the stagnation streamline never crosses into the cylinder
        assert!(line.iter().all(|&(x, y)| !geometry.contains_point(x, y)));
        assert!(line.last().unwrap().0 < -0.9);
        let off_axis = trace_streamline(&sampler, (-3.0, 1.0), &domain, &StreamlineOptions::default());
        assert!(off_axis.last().unwrap().0 > 2.9);
    }
}
