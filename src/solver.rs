use crate::error::{ensure_finite, FlowError, FlowResult};
use crate::influence::{source_integrals, vortex_integrals};
use crate::panel::PanelGeometry;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Freestream conditions for a panel solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Freestream {
    pub speed: f64,   // V_inf
    pub alpha: f64,   // angle of attack in radians
    pub density: f64, // rho_inf, only used for dimensional lift
}

impl Default for Freestream {
    fn default() -> Self {
        Self {
            speed: 1.0,
            alpha: 0.0,
            density: 1.225,
        }
    }
}

impl Freestream {
    pub fn new(speed: f64, alpha: f64) -> Self {
        Self {
            speed,
            alpha,
            ..Self::default()
        }
    }

    pub fn from_degrees(speed: f64, alpha_degrees: f64) -> Self {
        Self::new(speed, alpha_degrees.to_radians())
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn alpha_degrees(&self) -> f64 {
        self.alpha.to_degrees()
    }

    pub fn validate(&self) -> FlowResult<()> {
        let speed = ensure_finite("speed", self.speed)?;
        if speed <= 0.0 {
            return Err(FlowError::invalid("speed", format!("must be positive, got {speed}")));
        }
        ensure_finite("alpha", self.alpha)?;
        ensure_finite("density", self.density)?;
        Ok(())
    }
}

/// Smallest allowed ratio of the smallest to the largest LU pivot magnitude
pub const PIVOT_RATIO_TOLERANCE: f64 = 1e-10;

/// Solve a dense system by LU, rejecting singular or non-finite results.
///
/// A system is singular when its pivot ratio falls below [`PIVOT_RATIO_TOLERANCE`].
fn solve_dense(a: DMatrix<f64>, b: &DVector<f64>) -> FlowResult<DVector<f64>> {
    let size = b.len();
    let lu = a.lu();
    let pivots = lu.u().diagonal();
    let largest = pivots.amax();
    let ratio = if largest > 0.0 { pivots.amin() / largest } else { 0.0 };
    if ratio.is_nan() || ratio < PIVOT_RATIO_TOLERANCE {
        warn!("panel system {size}x{size} rejected, pivot ratio {ratio:.3e}");
        return Err(FlowError::Solve { size });
    }
    let x = lu.solve(b).ok_or(FlowError::Solve { size })?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(FlowError::Solve { size });
    }
    Ok(x)
}

/// Pressure-integrated lift and drag coefficients, normalized by chord
fn pressure_forces(geometry: &PanelGeometry, beta: &[f64], cp: &[f64], alpha: f64) -> (f64, f64) {
    let mut normal = 0.0;
    let mut axial = 0.0;
    for ((&cp, &s), &b) in cp.iter().zip(&geometry.s).zip(beta) {
        normal += -cp * s * b.sin();
        axial += -cp * s * b.cos();
    }
    let chord = geometry.chord();
    let (sin_a, cos_a) = alpha.sin_cos();
    let cl = (normal * cos_a - axial * sin_a) / chord;
    let cd = (normal * sin_a + axial * cos_a) / chord;
    (cl, cd)
}

fn pressure_coefficients(vt: &[f64], speed: f64) -> Vec<f64> {
    vt.iter().map(|v| 1.0 - (v / speed).powi(2)).collect()
}

/// Source panel method result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSolution {
    pub lambda: Vec<f64>,
    pub beta: Vec<f64>,
    pub vt: Vec<f64>,
    pub cp: Vec<f64>,
    pub cl: f64,
    pub cd: f64,
}

impl SourceSolution {
    /// Net source strength, zero for a closed body
    pub fn mass_residual(&self, geometry: &PanelGeometry) -> f64 {
        self.lambda.iter().zip(&geometry.s).map(|(l, s)| l * s).sum()
    }
}

/// Vortex panel method result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VortexSolution {
    pub gamma: Vec<f64>,
    pub beta: Vec<f64>,
    pub vt: Vec<f64>,
    pub cp: Vec<f64>,
    pub cl: f64,
    pub cd: f64,
    pub circulation: f64,
    pub lift: f64,
    pub cl_kutta_joukowski: f64,
}

/// Source panels plus one shared vortex strength
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedSolution {
    pub lambda: Vec<f64>,
    pub gamma: f64,
    pub beta: Vec<f64>,
    pub vt: Vec<f64>,
    pub cp: Vec<f64>,
    pub cl: f64,
    pub cd: f64,
    pub circulation: f64,
    pub lift: f64,
    pub cl_kutta_joukowski: f64,
}

/// Constant-strength source panels with flow tangency at every control point
#[derive(Debug, Clone, Copy, Default)]
pub struct SourcePanelSolver;

impl SourcePanelSolver {
    pub fn system(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let (i_mat, _) = source_integrals(geometry);
        Self::assemble(geometry, freestream, i_mat)
    }

    fn assemble(
        geometry: &PanelGeometry,
        freestream: &Freestream,
        i_mat: DMatrix<f64>,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let beta = geometry.beta(freestream.alpha);
        let mut a = i_mat;
        a.fill_diagonal(PI);
        let b = DVector::from_iterator(
            geometry.len(),
            beta.iter().map(|b| -freestream.speed * 2.0 * PI * b.cos()),
        );
        (a, b)
    }

    pub fn solve(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> FlowResult<SourceSolution> {
        freestream.validate()?;
        let n = geometry.len();
        let (i_mat, j_mat) = source_integrals(geometry);
        let beta = geometry.beta(freestream.alpha);

        let (a, b) = Self::assemble(geometry, freestream, i_mat);
        debug!("source panel system: {n}x{n}");
        let lambda = solve_dense(a, &b)?;

        let vt: Vec<f64> = (0..n)
            .map(|i| {
                let induced: f64 = (0..n).map(|j| lambda[j] * j_mat[(i, j)]).sum();
                freestream.speed * beta[i].sin() + induced / (2.0 * PI)
            })
            .collect();
        let cp = pressure_coefficients(&vt, freestream.speed);
        let (cl, cd) = pressure_forces(geometry, &beta, &cp, freestream.alpha);

        let solution = SourceSolution {
            lambda: lambda.iter().copied().collect(),
            beta,
            vt,
            cp,
            cl,
            cd,
        };
        info!(
            "source panels: n={n}, CL={cl:.4}, CD={cd:.4}, sum(lambda*S)={:.3e}",
            solution.mass_residual(geometry)
        );
        Ok(solution)
    }
}

/// Constant-strength vortex panels closed by a trailing-edge Kutta row
#[derive(Debug, Clone, Copy, Default)]
pub struct VortexPanelSolver;

impl VortexPanelSolver {
    pub fn system(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let source = source_integrals(geometry);
        let (k_mat, _) = vortex_integrals(&source);
        Self::assemble(geometry, freestream, &k_mat)
    }

    fn assemble(
        geometry: &PanelGeometry,
        freestream: &Freestream,
        k_mat: &DMatrix<f64>,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let n = geometry.len();
        let beta = geometry.beta(freestream.alpha);
        let mut a = -k_mat;
        a.fill_diagonal(0.0);
        let mut b = DVector::from_iterator(
            n,
            beta.iter().map(|b| -freestream.speed * 2.0 * PI * b.cos()),
        );

        // Kutta condition replaces the last tangency row: gamma_0 + gamma_{N-1} = 0
        a.row_mut(n - 1).fill(0.0);
        a[(n - 1, 0)] = 1.0;
        a[(n - 1, n - 1)] = 1.0;
        b[n - 1] = 0.0;
        (a, b)
    }

    pub fn solve(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> FlowResult<VortexSolution> {
        freestream.validate()?;
        let n = geometry.len();
        let source = source_integrals(geometry);
        let (k_mat, l_mat) = vortex_integrals(&source);
        let beta = geometry.beta(freestream.alpha);

        let (a, b) = Self::assemble(geometry, freestream, &k_mat);
        debug!("vortex panel system: {n}x{n}");
        let gamma = solve_dense(a, &b)?;

        let vt: Vec<f64> = (0..n)
            .map(|i| {
                let induced: f64 = (0..n).map(|j| -gamma[j] * l_mat[(i, j)]).sum();
                freestream.speed * beta[i].sin() + gamma[i] / 2.0 + induced / (2.0 * PI)
            })
            .collect();
        let cp = pressure_coefficients(&vt, freestream.speed);
        let (cl, cd) = pressure_forces(geometry, &beta, &cp, freestream.alpha);
        let circulation: f64 = gamma.iter().zip(&geometry.s).map(|(g, s)| g * s).sum();
        let lift = freestream.density * freestream.speed * circulation;
        let cl_kutta_joukowski = 2.0 * circulation / (freestream.speed * geometry.chord());

        info!("vortex panels: n={n}, circulation={circulation:.5}, CL_KJ={cl_kutta_joukowski:.4}");
        Ok(VortexSolution {
            gamma: gamma.iter().copied().collect(),
            beta,
            vt,
            cp,
            cl,
            cd,
            circulation,
            lift,
            cl_kutta_joukowski,
        })
    }
}

/// Source panels and a single vortex strength shared by all panels
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedPanelSolver;

impl CombinedPanelSolver {
    pub fn system(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let source = source_integrals(geometry);
        let vortex = vortex_integrals(&source);
        Self::assemble(geometry, freestream, &source, &vortex)
    }

    fn assemble(
        geometry: &PanelGeometry,
        freestream: &Freestream,
        source: &(DMatrix<f64>, DMatrix<f64>),
        vortex: &(DMatrix<f64>, DMatrix<f64>),
    ) -> (DMatrix<f64>, DVector<f64>) {
        let n = geometry.len();
        let (i_mat, j_mat) = source;
        let (k_mat, l_mat) = vortex;
        let beta = geometry.beta(freestream.alpha);
        let v = freestream.speed;

        let mut a = DMatrix::zeros(n + 1, n + 1);
        let mut b = DVector::zeros(n + 1);
        for i in 0..n {
            for j in 0..n {
                a[(i, j)] = if i == j { PI } else { i_mat[(i, j)] };
            }
            a[(i, n)] = -k_mat.row(i).sum();
            b[i] = -v * 2.0 * PI * beta[i].cos();
        }

        // Kutta condition: equal and opposite tangential speed on the trailing-edge panels
        for j in 0..n {
            a[(n, j)] = j_mat[(0, j)] + j_mat[(n - 1, j)];
        }
        a[(n, n)] = -(l_mat.row(0).sum() + l_mat.row(n - 1).sum()) + 2.0 * PI;
        b[n] = -v * 2.0 * PI * (beta[0].sin() + beta[n - 1].sin());
        (a, b)
    }

    pub fn solve(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> FlowResult<CombinedSolution> {
        freestream.validate()?;
        let n = geometry.len();
        let source = source_integrals(geometry);
        let vortex = vortex_integrals(&source);
        let beta = geometry.beta(freestream.alpha);

        let (a, b) = Self::assemble(geometry, freestream, &source, &vortex);
        debug!("combined panel system: {}x{}", n + 1, n + 1);
        let x = solve_dense(a, &b)?;
        let lambda: Vec<f64> = x.rows(0, n).iter().copied().collect();
        let gamma = x[n];

        let (_, j_mat) = &source;
        let (_, l_mat) = &vortex;
        let vt: Vec<f64> = (0..n)
            .map(|i| {
                let from_sources: f64 = (0..n).map(|j| lambda[j] * j_mat[(i, j)]).sum();
                freestream.speed * beta[i].sin()
                    + from_sources / (2.0 * PI)
                    + gamma / 2.0
                    - gamma / (2.0 * PI) * l_mat.row(i).sum()
            })
            .collect();
        let cp = pressure_coefficients(&vt, freestream.speed);
        let (cl, cd) = pressure_forces(geometry, &beta, &cp, freestream.alpha);
        let circulation = gamma * geometry.perimeter();
        let lift = freestream.density * freestream.speed * circulation;
        let cl_kutta_joukowski = 2.0 * circulation / (freestream.speed * geometry.chord());

        info!(
            "combined panels: n={n}, gamma={gamma:.5}, CL={cl:.4}, CL_KJ={cl_kutta_joukowski:.4}"
        );
        Ok(CombinedSolution {
            lambda,
            gamma,
            beta,
            vt,
            cp,
            cl,
            cd,
            circulation,
            lift,
            cl_kutta_joukowski,
        })
    }
}

/// Which panel formulation to solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelMethod {
    #[default]
    Source,
    Vortex,
    Combined,
}

impl PanelMethod {
    pub fn solve(
        &self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
    ) -> FlowResult<PanelSolution> {
        Ok(match self {
            PanelMethod::Source => {
                PanelSolution::Source(SourcePanelSolver.solve(geometry, freestream)?)
            }
            PanelMethod::Vortex => {
                PanelSolution::Vortex(VortexPanelSolver.solve(geometry, freestream)?)
            }
            PanelMethod::Combined => {
                PanelSolution::Combined(CombinedPanelSolver.solve(geometry, freestream)?)
            }
        })
    }
}

impl fmt::Display for PanelMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PanelMethod::Source => "source",
            PanelMethod::Vortex => "vortex",
            PanelMethod::Combined => "combined",
        })
    }
}

impl FromStr for PanelMethod {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "spm" => Ok(PanelMethod::Source),
            "vortex" | "vpm" => Ok(PanelMethod::Vortex),
            "combined" | "spvp" => Ok(PanelMethod::Combined),
            other => Err(FlowError::invalid(
                "method",
                format!("unknown panel method `{other}` (source, vortex, combined)"),
            )),
        }
    }
}

/// Solved strengths in the form the field sampler consumes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelStrengths {
    pub lambda: Vec<f64>, // source strength per panel, zeros when absent
    pub gamma: Vec<f64>,  // vortex strength per panel, zeros when absent
}

/// Result of any of the three panel methods
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PanelSolution {
    Source(SourceSolution),
    Vortex(VortexSolution),
    Combined(CombinedSolution),
}

impl PanelSolution {
    pub fn method(&self) -> PanelMethod {
        match self {
            PanelSolution::Source(_) => PanelMethod::Source,
            PanelSolution::Vortex(_) => PanelMethod::Vortex,
            PanelSolution::Combined(_) => PanelMethod::Combined,
        }
    }

    pub fn beta(&self) -> &[f64] {
        match self {
            PanelSolution::Source(s) => &s.beta,
            PanelSolution::Vortex(s) => &s.beta,
            PanelSolution::Combined(s) => &s.beta,
        }
    }

    pub fn vt(&self) -> &[f64] {
        match self {
            PanelSolution::Source(s) => &s.vt,
            PanelSolution::Vortex(s) => &s.vt,
            PanelSolution::Combined(s) => &s.vt,
        }
    }

    pub fn cp(&self) -> &[f64] {
        match self {
            PanelSolution::Source(s) => &s.cp,
            PanelSolution::Vortex(s) => &s.cp,
            PanelSolution::Combined(s) => &s.cp,
        }
    }

    pub fn cl(&self) -> f64 {
        match self {
            PanelSolution::Source(s) => s.cl,
            PanelSolution::Vortex(s) => s.cl,
            PanelSolution::Combined(s) => s.cl,
        }
    }

    pub fn cd(&self) -> f64 {
        match self {
            PanelSolution::Source(s) => s.cd,
            PanelSolution::Vortex(s) => s.cd,
            PanelSolution::Combined(s) => s.cd,
        }
    }

    /// Zero for the non-lifting source method
    pub fn circulation(&self) -> f64 {
        match self {
            PanelSolution::Source(_) => 0.0,
            PanelSolution::Vortex(s) => s.circulation,
            PanelSolution::Combined(s) => s.circulation,
        }
    }

    pub fn lift(&self) -> f64 {
        match self {
            PanelSolution::Source(_) => 0.0,
            PanelSolution::Vortex(s) => s.lift,
            PanelSolution::Combined(s) => s.lift,
        }
    }

    pub fn cl_kutta_joukowski(&self) -> f64 {
        match self {
            PanelSolution::Source(_) => 0.0,
            PanelSolution::Vortex(s) => s.cl_kutta_joukowski,
            PanelSolution::Combined(s) => s.cl_kutta_joukowski,
        }
    }

    pub fn cp_min(&self) -> f64 {
        self.cp().iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn strengths(&self) -> PanelStrengths {
        match self {
            PanelSolution::Source(s) => PanelStrengths {
                lambda: s.lambda.clone(),
                gamma: vec![0.0; s.lambda.len()],
            },
            PanelSolution::Vortex(s) => PanelStrengths {
                lambda: vec![0.0; s.gamma.len()],
                gamma: s.gamma.clone(),
            },
            PanelSolution::Combined(s) => PanelStrengths {
                lambda: s.lambda.clone(),
                gamma: vec![s.gamma; s.lambda.len()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cylinder(n: usize) -> PanelGeometry {
        PanelGeometry::circle(n, 1.0, (0.0, 0.0)).unwrap()
    }

    fn naca0012() -> PanelGeometry {
        PanelGeometry::naca4("0012", 50).unwrap()
    }

    #[test]
    fn source_system_diagonal_is_pi() {
        let (a, b) = SourcePanelSolver.system(&cylinder(8), &Freestream::default());
        assert_eq!(a.nrows(), 8);
        for i in 0..8 {
            assert_eq!(a[(i, i)], PI);
        }
        assert!(b.iter().all(|v| v.abs() <= 2.0 * PI + 1e-12));
    }

    #[test]
    fn source_panels_conserve_mass() {
        for n in [8, 12, 16, 64] {
            let geometry = cylinder(n);
            let solution = SourcePanelSolver
                .solve(&geometry, &Freestream::default())
                .unwrap();
            assert!(solution.mass_residual(&geometry).abs() < 1e-6, "n = {n}");
        }
    }

    #[test]
    fn cylinder_cp_matches_analytic() {
        for n in [8, 16, 64] {
            let solution = SourcePanelSolver
                .solve(&cylinder(n), &Freestream::default())
                .unwrap();
            for (cp, beta) in solution.cp.iter().zip(&solution.beta) {
                assert_abs_diff_eq!(*cp, 1.0 - 4.0 * beta.sin().powi(2), epsilon = 1e-6);
            }
        }
        let eight = SourcePanelSolver
            .solve(&cylinder(8), &Freestream::default())
            .unwrap();
        let min = eight.cp.iter().copied().fold(f64::INFINITY, f64::min);
        let max = eight.cp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_abs_diff_eq!(min, -3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(max, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn cylinder_has_no_net_force() {
        let solution = SourcePanelSolver
            .solve(&cylinder(8), &Freestream::new(1.0, 0.3))
            .unwrap();
        assert_abs_diff_eq!(solution.cl, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(solution.cd, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn solve_is_idempotent() {
        let geometry = naca0012();
        let freestream = Freestream::from_degrees(1.0, 4.0);
        for method in [PanelMethod::Source, PanelMethod::Vortex, PanelMethod::Combined] {
            let first = method.solve(&geometry, &freestream).unwrap();
            let second = method.solve(&geometry, &freestream).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn vortex_kutta_row_cancels_trailing_edge_strengths() {
        let solution = VortexPanelSolver
            .solve(&naca0012(), &Freestream::from_degrees(1.0, 5.0))
            .unwrap();
        let n = solution.gamma.len();
        assert_abs_diff_eq!(solution.gamma[0], -solution.gamma[n - 1], epsilon = 1e-9);
    }

    #[test]
    fn combined_kutta_row_balances_trailing_edge_speeds() {
        let solution = CombinedPanelSolver
            .solve(&naca0012(), &Freestream::from_degrees(1.0, 5.0))
            .unwrap();
        let n = solution.vt.len();
        assert_abs_diff_eq!(solution.vt[0], -solution.vt[n - 1], epsilon = 1e-9);
    }

    #[test]
    fn symmetric_airfoil_at_zero_incidence_has_no_circulation() {
        let geometry = naca0012();
        let freestream = Freestream::default();
        let vortex = VortexPanelSolver.solve(&geometry, &freestream).unwrap();
        let combined = CombinedPanelSolver.solve(&geometry, &freestream).unwrap();
        assert_abs_diff_eq!(vortex.circulation, 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(combined.circulation, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn naca0012_lift_at_five_degrees() {
        let geometry = naca0012();
        let freestream = Freestream::from_degrees(1.0, 5.0);
        let vortex = VortexPanelSolver.solve(&geometry, &freestream).unwrap();
        assert_abs_diff_eq!(vortex.circulation, 0.3013, epsilon = 2e-3);
        assert_abs_diff_eq!(vortex.cl_kutta_joukowski, 0.6025, epsilon = 4e-3);

        let combined = CombinedPanelSolver.solve(&geometry, &freestream).unwrap();
        assert_abs_diff_eq!(combined.circulation, 0.3046, epsilon = 2e-3);
        assert_abs_diff_eq!(combined.cl_kutta_joukowski, 0.6093, epsilon = 4e-3);
        assert_abs_diff_eq!(combined.cl, 0.5989, epsilon = 5e-3);
        assert_abs_diff_eq!(combined.lift, 1.225 * combined.circulation, epsilon = 1e-12);
    }

    #[test]
    fn combined_system_is_square_with_extra_row() {
        let (a, b) = CombinedPanelSolver.system(&cylinder(8), &Freestream::default());
        assert_eq!(a.shape(), (9, 9));
        assert_eq!(b.len(), 9);
        let (a, b) = VortexPanelSolver.system(&naca0012(), &Freestream::default());
        assert_eq!(a[(49, 0)], 1.0);
        assert_eq!(a[(49, 49)], 1.0);
        assert_eq!(a[(49, 10)], 0.0);
        assert_eq!(b[49], 0.0);
    }

    #[test]
    fn vortex_panels_on_a_circle_are_singular() {
        for n in [8, 16, 64] {
            let err = VortexPanelSolver
                .solve(&cylinder(n), &Freestream::from_degrees(1.0, 5.0))
                .unwrap_err();
            assert!(matches!(err, FlowError::Solve { size } if size == n), "n = {n}");
        }
        let err = PanelMethod::Vortex
            .solve(&cylinder(12), &Freestream::default())
            .unwrap_err();
        assert!(matches!(err, FlowError::Solve { .. }));
    }

    #[test]
    fn well_posed_systems_pass_the_pivot_check() {
        let freestream = Freestream::from_degrees(1.0, 3.0);
        for code in ["0012", "2412", "4415"] {
            for n in [10, 50, 200] {
                let geometry = PanelGeometry::naca4(code, n).unwrap();
                for method in [PanelMethod::Source, PanelMethod::Vortex, PanelMethod::Combined] {
                    assert!(method.solve(&geometry, &freestream).is_ok(), "{code} {n} {method}");
                }
            }
        }
        assert!(CombinedPanelSolver.solve(&cylinder(8), &freestream).is_ok());
    }

    #[test]
    fn zero_matrix_is_rejected() {
        let err = solve_dense(DMatrix::zeros(3, 3), &DVector::zeros(3)).unwrap_err();
        assert!(matches!(err, FlowError::Solve { size: 3 }));
    }

    #[test]
    fn invalid_freestream_is_rejected() {
        let err = SourcePanelSolver
            .solve(&cylinder(8), &Freestream::new(0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidParameter { name: "speed", .. }));
    }

    #[test]
    fn strengths_expand_shared_gamma() {
        let solution = PanelMethod::Combined
            .solve(&naca0012(), &Freestream::from_degrees(1.0, 2.0))
            .unwrap();
        let strengths = solution.strengths();
        assert_eq!(strengths.lambda.len(), 50);
        assert!(strengths.gamma.iter().all(|&g| g == strengths.gamma[0]));
        assert_eq!(solution.method(), PanelMethod::Combined);
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("SPVP".parse::<PanelMethod>().unwrap(), PanelMethod::Combined);
        assert_eq!("vortex".parse::<PanelMethod>().unwrap(), PanelMethod::Vortex);
        assert!("doublet".parse::<PanelMethod>().is_err());
    }
}
