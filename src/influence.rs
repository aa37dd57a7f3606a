//! Geometric influence integrals between panels.
//!
//! Every coefficient comes from one closed-form integral over a constant-strength
//! panel `j`, evaluated either at another panel's control point or at a free
//! point. Only the `C` and `D` constants change between the normal and tangential
//! variants of the source and vortex integrals.

use crate::panel::PanelGeometry;
use log::warn;
use nalgebra::DMatrix;

/// `0.5 C ln((S^2 + 2AS + B) / B) + (D - AC)/E (atan2(S + A, E) - atan2(A, E))`.
///
/// Returns zero when `E = sqrt(B - A^2)` is zero or not real, or when the
/// result is not finite.
pub fn geometric_integral(a: f64, b: f64, c: f64, d: f64, s: f64) -> f64 {
    let e = (b - a * a).sqrt();
    if !e.is_finite() || e == 0.0 {
        return 0.0;
    }
    let term1 = 0.5 * c * ((s * s + 2.0 * a * s + b) / b).ln();
    let term2 = ((d - a * c) / e) * ((s + a).atan2(e) - a.atan2(e));
    let value = term1 + term2;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `A` and `B` for panel `j` seen from point `(x, y)`
fn panel_constants(geometry: &PanelGeometry, j: usize, x: f64, y: f64) -> (f64, f64, f64, f64) {
    let dx = x - geometry.xb[j];
    let dy = y - geometry.yb[j];
    let (sin_j, cos_j) = geometry.phi[j].sin_cos();
    let a = -dx * cos_j - dy * sin_j;
    let b = dx * dx + dy * dy;
    (a, b, dx, dy)
}

/// Source integrals at control points: normal `I` and tangential `J`, zero diagonal
pub fn source_integrals(geometry: &PanelGeometry) -> (DMatrix<f64>, DMatrix<f64>) {
    let n = geometry.len();
    let mut i_mat = DMatrix::zeros(n, n);
    let mut j_mat = DMatrix::zeros(n, n);
    let mut zeroed = 0usize;

    for i in 0..n {
        let (sin_i, cos_i) = geometry.phi[i].sin_cos();
        for j in 0..n {
            if i == j {
                continue;
            }
            let (a, b, dx, dy) = panel_constants(geometry, j, geometry.xc[i], geometry.yc[i]);
            let dphi = geometry.phi[i] - geometry.phi[j];

            let c_n = dphi.sin();
            let d_n = -dx * sin_i + dy * cos_i;
            let c_t = -dphi.cos();
            let d_t = dx * cos_i + dy * sin_i;

            i_mat[(i, j)] = geometric_integral(a, b, c_n, d_n, geometry.s[j]);
            j_mat[(i, j)] = geometric_integral(a, b, c_t, d_t, geometry.s[j]);
            if i_mat[(i, j)] == 0.0 && j_mat[(i, j)] == 0.0 {
                zeroed += 1;
            }
        }
    }
    if zeroed > 0 {
        warn!("{zeroed} panel pairs have degenerate geometry; their influence is zero");
    }
    (i_mat, j_mat)
}

/// Vortex integrals at control points: normal `K` and tangential `L`.
///
/// A vortex panel's normal influence is the source panel's tangential one and its
/// tangential influence is the negated source normal one: `K = J`, `L = -I`.
pub fn vortex_integrals(source: &(DMatrix<f64>, DMatrix<f64>)) -> (DMatrix<f64>, DMatrix<f64>) {
    let (i_mat, j_mat) = source;
    (j_mat.clone(), -i_mat)
}

/// Source velocity kernels `(Mx, My)` of every panel at a free point
pub fn point_source_kernels(geometry: &PanelGeometry, x: f64, y: f64) -> (Vec<f64>, Vec<f64>) {
    let n = geometry.len();
    let mut mx = Vec::with_capacity(n);
    let mut my = Vec::with_capacity(n);
    for j in 0..n {
        let (a, b, dx, dy) = panel_constants(geometry, j, x, y);
        let (sin_j, cos_j) = geometry.phi[j].sin_cos();
        mx.push(geometric_integral(a, b, -cos_j, dx, geometry.s[j]));
        my.push(geometric_integral(a, b, -sin_j, dy, geometry.s[j]));
    }
    (mx, my)
}

/// Vortex velocity kernels `(Nx, Ny)` from the source ones: `Nx = -My`, `Ny = Mx`
pub fn point_vortex_kernels(source: &(Vec<f64>, Vec<f64>)) -> (Vec<f64>, Vec<f64>) {
    let (mx, my) = source;
    (my.iter().map(|v| -v).collect(), mx.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Midpoint-rule reference for a source panel's normal and tangential influence
    fn quadrature(geometry: &PanelGeometry, i: usize, j: usize) -> (f64, f64) {
        let steps = 20_000;
        let (xi, yi) = (geometry.xc[i], geometry.yc[i]);
        let (sin_j, cos_j) = geometry.phi[j].sin_cos();
        let (ni, ti) = (geometry.delta[i], geometry.phi[i]);
        let ds = geometry.s[j] / steps as f64;
        let (mut normal, mut tangential) = (0.0, 0.0);
        for k in 0..steps {
            let t = (k as f64 + 0.5) * ds;
            let x = geometry.xb[j] + t * cos_j;
            let y = geometry.yb[j] + t * sin_j;
            let (rx, ry) = (xi - x, yi - y);
            let r2 = rx * rx + ry * ry;
            normal += (rx * ni.cos() + ry * ni.sin()) / r2 * ds;
            tangential += (rx * ti.cos() + ry * ti.sin()) / r2 * ds;
        }
        (normal, tangential)
    }

    #[test]
    fn closed_form_matches_quadrature() {
        let geometry = PanelGeometry::circle(10, 1.0, (0.0, 0.0)).unwrap();
        let (i_mat, j_mat) = source_integrals(&geometry);
        for (i, j) in [(0, 3), (2, 7), (5, 6), (9, 0)] {
            let (normal, tangential) = quadrature(&geometry, i, j);
            assert_abs_diff_eq!(i_mat[(i, j)], normal, epsilon = 1e-6);
            assert_abs_diff_eq!(j_mat[(i, j)], tangential, epsilon = 1e-6);
        }
    }

    #[test]
    fn diagonal_is_left_at_zero() {
        let geometry = PanelGeometry::circle(8, 1.0, (0.0, 0.0)).unwrap();
        let source = source_integrals(&geometry);
        let (k_mat, l_mat) = vortex_integrals(&source);
        for i in 0..8 {
            assert_eq!(source.0[(i, i)], 0.0);
            assert_eq!(source.1[(i, i)], 0.0);
            assert_eq!(k_mat[(i, i)], 0.0);
            assert_eq!(l_mat[(i, i)], 0.0);
        }
    }

    #[test]
    fn vortex_kernels_follow_from_source_kernels() {
        let geometry = PanelGeometry::naca4("2412", 20).unwrap();
        let source = source_integrals(&geometry);
        let (k_mat, l_mat) = vortex_integrals(&source);
        assert_eq!(k_mat, source.1);
        assert_eq!(l_mat, -source.0.clone());
    }

    #[test]
    fn degenerate_terms_are_zero() {
        // point on the extension of the panel: B - A^2 = 0
        assert_eq!(geometric_integral(-2.0, 4.0, 1.0, 1.0, 1.0), 0.0);
        // B - A^2 < 0 from rounding
        assert_eq!(geometric_integral(1.0, 1.0 - 1e-15, 1.0, 1.0, 1.0), 0.0);
        assert_eq!(geometric_integral(f64::NAN, 1.0, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn point_kernels_match_control_point_integrals() {
        // at another panel's control point, M projected on that panel's normal is I
        let geometry = PanelGeometry::circle(12, 1.0, (0.0, 0.0)).unwrap();
        let (i_mat, j_mat) = source_integrals(&geometry);
        let i = 4;
        let (mx, my) = point_source_kernels(&geometry, geometry.xc[i], geometry.yc[i]);
        let (nx, ny) = (geometry.delta[i].cos(), geometry.delta[i].sin());
        let (tx, ty) = (geometry.phi[i].cos(), geometry.phi[i].sin());
        for j in (0..12).filter(|&j| j != i) {
            assert_abs_diff_eq!(mx[j] * nx + my[j] * ny, i_mat[(i, j)], epsilon = 1e-10);
            assert_abs_diff_eq!(mx[j] * tx + my[j] * ty, j_mat[(i, j)], epsilon = 1e-10);
        }
        let (vx, vy) = point_vortex_kernels(&(mx.clone(), my.clone()));
        assert_eq!(vx[0], -my[0]);
        assert_eq!(vy[0], mx[0]);
    }
}
