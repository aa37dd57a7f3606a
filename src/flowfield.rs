use crate::error::{FlowError, FlowResult};
use crate::grid::{Domain, SamplingGrid};
use crate::singularity::{FlowSample, Singularity};
use log::{debug, warn};
use ndarray::Array2;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Scalar quantities that can be sampled from a flow field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Potential,
    StreamFunction,
    XVelocity,
    YVelocity,
    VelocityMagnitude,
    Pressure,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 6] = [
        ScalarKind::Potential,
        ScalarKind::StreamFunction,
        ScalarKind::XVelocity,
        ScalarKind::YVelocity,
        ScalarKind::VelocityMagnitude,
        ScalarKind::Pressure,
    ];

    /// Short key used on the command line and in file names
    pub fn key(&self) -> &'static str {
        match self {
            ScalarKind::Potential => "potential",
            ScalarKind::StreamFunction => "streamfunction",
            ScalarKind::XVelocity => "xvel",
            ScalarKind::YVelocity => "yvel",
            ScalarKind::VelocityMagnitude => "velmag",
            ScalarKind::Pressure => "pressure",
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            ScalarKind::Potential => "Velocity Potential",
            ScalarKind::StreamFunction => "Stream Function",
            ScalarKind::XVelocity => "x Velocity",
            ScalarKind::YVelocity => "y Velocity",
            ScalarKind::VelocityMagnitude => "Velocity Magnitude",
            ScalarKind::Pressure => "Pressure Coefficient",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            ScalarKind::Potential | ScalarKind::StreamFunction => "m^2 s^-1",
            ScalarKind::XVelocity | ScalarKind::YVelocity | ScalarKind::VelocityMagnitude => {
                "m s^-1"
            }
            ScalarKind::Pressure => "-",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ScalarKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.key() == s)
            .ok_or_else(|| FlowError::invalid("scalar kind", format!("unknown scalar `{s}`")))
    }
}

/// Rendering options passed alongside a draw request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOptions {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub contour_levels: usize,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            lower_percentile: 5.0,
            upper_percentile: 95.0,
            contour_levels: 15,
        }
    }
}

/// A sampled scalar field ready for a renderer
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArtifact {
    pub kind: ScalarKind,
    pub values: Array2<f64>, // shape (ny, nx)
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub extent: Domain,
    pub color_range: Option<(f64, f64)>, // percentile-based contour start/end
    pub contour_levels: usize,
}

impl FieldArtifact {
    /// Placeholder returned when there is nothing to draw
    pub fn empty(kind: ScalarKind, grid: &SamplingGrid, options: &FieldOptions) -> Self {
        Self {
            kind,
            values: Array2::zeros((0, 0)),
            x: grid.x.clone(),
            y: grid.y.clone(),
            extent: grid.domain,
            color_range: None,
            contour_levels: options.contour_levels,
        }
    }

    fn from_values(
        kind: ScalarKind,
        values: Array2<f64>,
        grid: &SamplingGrid,
        options: &FieldOptions,
    ) -> Self {
        let lo = nan_percentile(values.iter().copied(), options.lower_percentile);
        let hi = nan_percentile(values.iter().copied(), options.upper_percentile);
        let color_range = lo.zip(hi);
        Self {
            kind,
            values,
            x: grid.x.clone(),
            y: grid.y.clone(),
            extent: grid.domain,
            color_range,
            contour_levels: options.contour_levels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Spacing between contour levels inside the color range
    pub fn contour_step(&self) -> Option<f64> {
        let (lo, hi) = self.color_range?;
        if self.contour_levels == 0 || hi <= lo {
            return None;
        }
        Some((hi - lo) / self.contour_levels as f64)
    }
}

/// Every scalar of a superposition over one grid
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    pub potential: Array2<f64>,
    pub stream_function: Array2<f64>,
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub freestream_speed_squared: f64,
}

impl FieldSet {
    pub fn velocity_magnitude(&self) -> Array2<f64> {
        ndarray::Zip::from(&self.u)
            .and(&self.v)
            .map_collect(|&u, &v| (u * u + v * v).sqrt())
    }

    /// Cp = 1 - V^2 / V_inf^2 using the cumulative uniform-flow speed
    pub fn pressure_coefficient(&self) -> Array2<f64> {
        let v2_inf = self.freestream_speed_squared;
        ndarray::Zip::from(&self.u)
            .and(&self.v)
            .map_collect(|&u, &v| 1.0 - (u * u + v * v) / v2_inf)
    }

    pub fn scalar(&self, kind: ScalarKind) -> Array2<f64> {
        match kind {
            ScalarKind::Potential => self.potential.clone(),
            ScalarKind::StreamFunction => self.stream_function.clone(),
            ScalarKind::XVelocity => self.u.clone(),
            ScalarKind::YVelocity => self.v.clone(),
            ScalarKind::VelocityMagnitude => self.velocity_magnitude(),
            ScalarKind::Pressure => self.pressure_coefficient(),
        }
    }
}

/// Ordered collection of singularities evaluated by superposition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowField {
    elements: Vec<Singularity>,
}

impl FlowField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Singularity>) -> FlowResult<Self> {
        let mut field = Self::new();
        for element in elements {
            field.add(element)?;
        }
        Ok(field)
    }

    /// Append a singularity and return its index
    pub fn add(&mut self, element: Singularity) -> FlowResult<usize> {
        element.validate()?;
        debug!("adding {} element #{}", element.kind_name(), self.elements.len() + 1);
        self.elements.push(element);
        Ok(self.elements.len() - 1)
    }

    /// Remove by index, keeping the order of the rest
    pub fn remove(&mut self, index: usize) -> Option<Singularity> {
        if index < self.elements.len() {
            Some(self.elements.remove(index))
        } else {
            None
        }
    }

    /// Remove the first element equal to `element`
    pub fn remove_element(&mut self, element: &Singularity) -> bool {
        match self.elements.iter().position(|e| e == element) {
            Some(index) => {
                self.elements.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Singularity] {
        &self.elements
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Singularity> {
        self.elements.get_mut(index)
    }

    /// Display names in insertion order, e.g. "2. [Sink]"
    pub fn labels(&self) -> Vec<String> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. [{}]", i + 1, e.kind_name()))
            .collect()
    }

    /// Sum of every element's contribution at one point
    pub fn sample_point(&self, x: f64, y: f64) -> FlowSample {
        let mut total = FlowSample::default();
        for element in &self.elements {
            total += element.evaluate(x, y);
        }
        total
    }

    pub fn velocity_at(&self, x: f64, y: f64) -> (f64, f64) {
        let s = self.sample_point(x, y);
        (s.u, s.v)
    }

    /// Squared speed of the summed uniform flows, 1 when absent or zero
    pub fn freestream_speed_squared(&self) -> f64 {
        let (mut u, mut v) = (0.0, 0.0);
        let mut found = false;
        for element in &self.elements {
            if let Singularity::Uniform { vx, vy } = *element {
                u += vx;
                v += vy;
                found = true;
            }
        }
        let v2 = u * u + v * v;
        if !found {
            1.0
        } else if v2 == 0.0 {
            warn!("cumulative freestream speed is zero, using V_inf^2 = 1 for Cp");
            1.0
        } else {
            v2
        }
    }

    /// Superpose all elements on every grid point
    pub fn sample(&self, grid: &SamplingGrid) -> FieldSet {
        let shape = grid.shape();
        let samples: Vec<FlowSample> = (0..grid.len())
            .into_par_iter()
            .map(|k| {
                let (x, y) = grid.flat_point(k);
                self.sample_point(x, y)
            })
            .collect();

        let take = |f: fn(&FlowSample) -> f64| {
            Array2::from_shape_fn(shape, |(j, i)| f(&samples[j * shape.1 + i]))
        };

        FieldSet {
            potential: take(|s| s.potential),
            stream_function: take(|s| s.stream_function),
            u: take(|s| s.u),
            v: take(|s| s.v),
            freestream_speed_squared: self.freestream_speed_squared(),
        }
    }

    /// Sample one scalar kind and attach its color range
    pub fn evaluate(
        &self,
        kind: ScalarKind,
        grid: &SamplingGrid,
        options: &FieldOptions,
    ) -> FlowResult<FieldArtifact> {
        grid.domain.validate()?;
        if self.elements.is_empty() {
            return Ok(FieldArtifact::empty(kind, grid, options));
        }
        debug!(
            "evaluating {} over {}x{} grid with {} elements",
            kind,
            grid.nx(),
            grid.ny(),
            self.elements.len()
        );
        let values = self.sample(grid).scalar(kind);
        Ok(FieldArtifact::from_values(kind, values, grid, options))
    }

    /// Artifacts for every scalar kind from a single superposition pass
    pub fn evaluate_all(
        &self,
        grid: &SamplingGrid,
        options: &FieldOptions,
    ) -> FlowResult<Vec<FieldArtifact>> {
        grid.domain.validate()?;
        if self.elements.is_empty() {
            return Ok(ScalarKind::ALL
                .iter()
                .map(|&kind| FieldArtifact::empty(kind, grid, options))
                .collect());
        }
        let set = self.sample(grid);
        Ok(ScalarKind::ALL
            .iter()
            .map(|&kind| FieldArtifact::from_values(kind, set.scalar(kind), grid, options))
            .collect())
    }
}

/// Percentile with linear interpolation, ignoring NaN entries
pub fn nan_percentile(values: impl Iterator<Item = f64>, percentile: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    if lo == hi || frac == 0.0 {
        Some(sorted[lo])
    } else {
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid() -> SamplingGrid {
        SamplingGrid::new(Domain::new(-2.0, 2.0, -1.5, 1.5).unwrap(), 41).unwrap()
    }

    #[test]
    fn superposition_is_linear_for_every_scalar() {
        let a = Singularity::source(1.3, 0.25, 0.1);
        let b = Singularity::vortex(-0.8, -0.4, 0.3);
        let grid = grid();
        let fa = FlowField::from_elements(vec![a.clone()]).unwrap().sample(&grid);
        let fb = FlowField::from_elements(vec![b.clone()]).unwrap().sample(&grid);
        let fab = FlowField::from_elements(vec![a, b]).unwrap().sample(&grid);
        for (sum, (x, y)) in [
            (&fab.potential, (&fa.potential, &fb.potential)),
            (&fab.stream_function, (&fa.stream_function, &fb.stream_function)),
            (&fab.u, (&fa.u, &fb.u)),
            (&fab.v, (&fa.v, &fb.v)),
        ] {
            for ((s, p), q) in sum.iter().zip(x.iter()).zip(y.iter()) {
                assert_abs_diff_eq!(*s, p + q, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn element_order_does_not_change_field() {
        let elements = vec![
            Singularity::uniform(1.0, 0.0),
            Singularity::doublet(1.0, 0.0, 0.0, 0.0),
            Singularity::vortex(0.5, 0.1, 0.1),
        ];
        let mut reversed = elements.clone();
        reversed.reverse();
        let grid = grid();
        let a = FlowField::from_elements(elements).unwrap().sample(&grid);
        let b = FlowField::from_elements(reversed).unwrap().sample(&grid);
        for (p, q) in a.u.iter().zip(b.u.iter()) {
            assert_abs_diff_eq!(*p, *q, epsilon = 1e-12);
        }
    }

    #[test]
    fn cylinder_stagnation_points() {
        let field = FlowField::from_elements(vec![
            Singularity::uniform(1.0, 0.0),
            Singularity::doublet(2.0 * std::f64::consts::PI, 0.0, 0.0, 0.0),
        ])
        .unwrap();
        for x in [1.0, -1.0] {
            let (u, v) = field.velocity_at(x, 0.0);
            assert_abs_diff_eq!(u, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        }
        // the circle r = 1 is the dividing streamline
        for k in 0..12 {
            let t = k as f64 * std::f64::consts::PI / 6.0 + 0.1;
            let psi = field.sample_point(t.cos(), t.sin()).stream_function;
            assert_abs_diff_eq!(psi, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn pressure_uses_cumulative_uniform_speed() {
        let field = FlowField::from_elements(vec![
            Singularity::uniform(1.0, 0.0),
            Singularity::uniform(1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(field.freestream_speed_squared(), 4.0);
        let grid = SamplingGrid::with_steps(Domain::default(), 3, 3).unwrap();
        let artifact = field
            .evaluate(ScalarKind::Pressure, &grid, &FieldOptions::default())
            .unwrap();
        for cp in artifact.values.iter() {
            assert_abs_diff_eq!(*cp, 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn pressure_falls_back_to_unit_reference() {
        let cancelling = FlowField::from_elements(vec![
            Singularity::uniform(1.0, 0.0),
            Singularity::uniform(-1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(cancelling.freestream_speed_squared(), 1.0);
        let no_uniform =
            FlowField::from_elements(vec![Singularity::source(1.0, 0.0, 0.0)]).unwrap();
        assert_eq!(no_uniform.freestream_speed_squared(), 1.0);
    }

    #[test]
    fn velocity_magnitude_sums_components_first() {
        let field = FlowField::from_elements(vec![
            Singularity::uniform(3.0, 0.0),
            Singularity::uniform(0.0, 4.0),
        ])
        .unwrap();
        let grid = SamplingGrid::with_steps(Domain::default(), 2, 2).unwrap();
        let artifact = field
            .evaluate(ScalarKind::VelocityMagnitude, &grid, &FieldOptions::default())
            .unwrap();
        assert!(artifact.values.iter().all(|&v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn empty_field_gives_placeholder() {
        let artifact = FlowField::new()
            .evaluate(ScalarKind::Potential, &grid(), &FieldOptions::default())
            .unwrap();
        assert!(artifact.is_empty());
        assert_eq!(artifact.color_range, None);
    }

    #[test]
    fn color_range_ignores_singular_core() {
        let field = FlowField::from_elements(vec![Singularity::source(1.0, 0.0, 0.0)]).unwrap();
        let grid = SamplingGrid::with_steps(Domain::default(), 21, 21).unwrap();
        let artifact = field
            .evaluate(ScalarKind::XVelocity, &grid, &FieldOptions::default())
            .unwrap();
        let (lo, hi) = artifact.color_range.unwrap();
        assert!(lo.is_finite() && hi.is_finite());
        assert!(lo < hi);
        assert!(artifact.contour_step().unwrap() > 0.0);
    }

    #[test]
    fn percentile_interpolates_and_skips_nan() {
        let values = [f64::NAN, 4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(nan_percentile(values.iter().copied(), 50.0), Some(3.0));
        assert_eq!(nan_percentile(values.iter().copied(), 0.0), Some(1.0));
        assert_eq!(nan_percentile(values.iter().copied(), 100.0), Some(5.0));
        assert_abs_diff_eq!(
            nan_percentile(values.iter().copied(), 5.0).unwrap(),
            1.2,
            epsilon = 1e-12
        );
        assert_eq!(nan_percentile([f64::NAN].into_iter(), 50.0), None);
    }

    #[test]
    fn remove_keeps_order_and_labels() {
        let mut field = FlowField::new();
        field.add(Singularity::uniform(1.0, 0.0)).unwrap();
        field.add(Singularity::sink(1.0, 0.0, 0.0)).unwrap();
        field.add(Singularity::vortex(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(field.labels(), vec!["1. [Uniform]", "2. [Sink]", "3. [Vortex]"]);
        assert!(field.remove_element(&Singularity::sink(1.0, 0.0, 0.0)));
        assert_eq!(field.labels(), vec!["1. [Uniform]", "2. [Vortex]"]);
        assert!(field.remove(5).is_none());
        field.clear();
        assert!(field.is_empty());
    }

    #[test]
    fn scalar_kind_round_trips_through_key() {
        for kind in ScalarKind::ALL {
            assert_eq!(kind.key().parse::<ScalarKind>().unwrap(), kind);
        }
        assert!("vorticity".parse::<ScalarKind>().is_err());
    }

    #[test]
    fn non_finite_elements_are_rejected() {
        let mut field = FlowField::new();
        assert!(field.add(Singularity::vortex(f64::INFINITY, 0.0, 0.0)).is_err());
        assert!(field.is_empty());
    }
}
