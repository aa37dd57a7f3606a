use crate::error::FlowResult;
use crate::panel::PanelGeometry;
use crate::solver::{Freestream, PanelMethod, PanelSolution};
use log::info;
use serde::{Deserialize, Serialize};

/// Aerodynamic coefficients at one angle of attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    pub alpha_degrees: f64,
    pub cl: f64,                 // pressure-integrated lift coefficient
    pub cd: f64,                 // pressure-integrated drag coefficient
    pub cl_kutta_joukowski: f64, // 2 Gamma / (V c)
    pub circulation: f64,        // m^2/s
    pub lift: f64,               // N per unit span
    pub cp_min: f64,             // suction peak
}

impl PolarPoint {
    pub fn from_solution(alpha_degrees: f64, solution: &PanelSolution) -> Self {
        Self {
            alpha_degrees,
            cl: solution.cl(),
            cd: solution.cd(),
            cl_kutta_joukowski: solution.cl_kutta_joukowski(),
            circulation: solution.circulation(),
            lift: solution.lift(),
            cp_min: solution.cp_min(),
        }
    }
}

/// Angle-of-attack sweep over a fixed body
pub struct PolarAnalyzer {
    pub method: PanelMethod,
    pub history: Vec<PolarPoint>,
}

impl PolarAnalyzer {
    pub fn new(method: PanelMethod) -> Self {
        Self {
            method,
            history: Vec::new(),
        }
    }

    /// Solve once per angle, keeping speed and density from `freestream`
    pub fn sweep(
        &mut self,
        geometry: &PanelGeometry,
        freestream: &Freestream,
        alphas_degrees: &[f64],
    ) -> FlowResult<&[PolarPoint]> {
        let start = self.history.len();
        for &alpha in alphas_degrees {
            let conditions = Freestream {
                alpha: alpha.to_radians(),
                ..*freestream
            };
            let solution = self.method.solve(geometry, &conditions)?;
            self.history.push(PolarPoint::from_solution(alpha, &solution));
        }
        info!(
            "{} sweep over {} angles complete",
            self.method,
            alphas_degrees.len()
        );
        Ok(&self.history[start..])
    }

    /// Angle with the highest lift coefficient
    pub fn max_lift(&self) -> Option<&PolarPoint> {
        self.history
            .iter()
            .max_by(|a, b| a.lift_coefficient().total_cmp(&b.lift_coefficient()))
    }

    /// Lift slope dCL/dalpha per degree from a least-squares fit
    pub fn lift_slope(&self) -> Option<f64> {
        let n = self.history.len();
        if n < 2 {
            return None;
        }
        let mean_a = self.history.iter().map(|p| p.alpha_degrees).sum::<f64>() / n as f64;
        let mean_c = self.history.iter().map(|p| p.lift_coefficient()).sum::<f64>() / n as f64;
        let mut num = 0.0;
        let mut den = 0.0;
        for p in &self.history {
            num += (p.alpha_degrees - mean_a) * (p.lift_coefficient() - mean_c);
            den += (p.alpha_degrees - mean_a).powi(2);
        }
        if den == 0.0 {
            None
        } else {
            Some(num / den)
        }
    }

    pub fn save_metrics<P: AsRef<std::path::Path>>(&self, filename: P) -> FlowResult<()> {
        let json = serde_json::to_string_pretty(&self.history)?;
        std::fs::write(filename, json)?;
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\n📊 Polar Summary ({} panels)", self.method);
        println!("================================");
        println!(
            "{:>8} {:>9} {:>9} {:>9} {:>10} {:>9}",
            "alpha", "CL", "CD", "CL_KJ", "Gamma", "Cp_min"
        );
        for p in &self.history {
            println!(
                "{:>8.2} {:>9.4} {:>9.4} {:>9.4} {:>10.5} {:>9.3}",
                p.alpha_degrees, p.cl, p.cd, p.cl_kutta_joukowski, p.circulation, p.cp_min
            );
        }
        if let Some(best) = self.max_lift() {
            println!("\n🏆 Max lift at {:.1}° (CL = {:.4})", best.alpha_degrees, best.lift_coefficient());
        }
        if let Some(slope) = self.lift_slope() {
            println!("   Lift slope: {:.4} per degree ({:.3} per radian)", slope, slope.to_degrees());
        }
    }
}

impl PolarPoint {
    /// Kutta-Joukowski coefficient when circulation exists, pressure CL otherwise
    pub fn lift_coefficient(&self) -> f64 {
        if self.circulation != 0.0 {
            self.cl_kutta_joukowski
        } else {
            self.cl
        }
    }
}
