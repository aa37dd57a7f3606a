use crate::flowfield::FieldArtifact;
use crate::grid::Domain;
use crate::panel::PanelGeometry;
use crate::sampler::VelocityField;
use crate::singularity::{ElementGeometry, Singularity};
use crate::solver::PanelSolution;
use log::info;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

type DrawResult = Result<(), Box<dyn std::error::Error>>;

/// PNG rendering of sampled fields and panel results
pub struct Visualizer {
    width: u32,
    height: u32,
}

/// Maps world coordinates of a domain onto a pixel area
#[derive(Debug, Clone, Copy)]
struct ScreenMap {
    extent: Domain,
    width: f64,
    height: f64,
}

impl ScreenMap {
    fn new(extent: Domain, (width, height): (u32, u32)) -> Self {
        Self {
            extent,
            width: width as f64,
            height: height as f64,
        }
    }

    fn to_px(&self, x: f64, y: f64) -> (i32, i32) {
        let w = self.extent.width().max(f64::EPSILON);
        let h = self.extent.height().max(f64::EPSILON);
        (
            ((x - self.extent.xmin) / w * self.width) as i32,
            ((self.extent.ymax - y) / h * self.height) as i32,
        )
    }
}

impl Visualizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Blue-cyan-green-yellow-red ramp for a value inside [min_val, max_val]
    pub fn get_sci_color(val: f64, min_val: f64, max_val: f64) -> (u8, u8, u8) {
        let d = max_val - min_val;
        let t = if d <= 0.0 {
            0.5
        } else {
            ((val - min_val) / d).clamp(0.0, 0.9999)
        };
        let band = (t / 0.25).floor() as i32;
        let s = (t - band as f64 * 0.25) / 0.25;
        let (r, g, b) = match band {
            0 => (0.0, s, 1.0),
            1 => (0.0, 1.0, 1.0 - s),
            2 => (s, 1.0, 0.0),
            _ => (1.0, 1.0 - s, 0.0),
        };
        ((255.0 * r) as u8, (255.0 * g) as u8, (255.0 * b) as u8)
    }

    /// Filled-contour cells; values snap to the contour level below them
    fn draw_cells<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        values: &Array2<f64>,
        range: Option<(f64, f64)>,
        step: Option<f64>,
        mask: Option<&Array2<bool>>,
    ) -> DrawResult
    where
        <DB as DrawingBackend>::ErrorType: 'static,
    {
        let (w, h) = area.dim_in_pixel();
        let (ny, nx) = values.dim();
        if nx == 0 || ny == 0 {
            return Ok(());
        }
        let cell_width = w as f64 / nx as f64;
        let cell_height = h as f64 / ny as f64;

        for ((j, i), &value) in values.indexed_iter() {
            let masked = mask.map_or(false, |m| m[[j, i]]);
            let color = match range {
                Some((lo, hi)) if value.is_finite() && !masked => {
                    let level = match step {
                        Some(step) => lo + ((value - lo) / step).floor() * step,
                        None => value,
                    };
                    let (r, g, b) = Self::get_sci_color(level, lo, hi);
                    RGBColor(r, g, b)
                }
                _ => RGBColor(90, 90, 90),
            };

            let x1 = (i as f64 * cell_width) as i32;
            let y1 = ((ny - j - 1) as f64 * cell_height) as i32;
            let x2 = ((i + 1) as f64 * cell_width).ceil() as i32;
            let y2 = ((ny - j) as f64 * cell_height).ceil() as i32;
            area.draw(&Rectangle::new([(x1, y1), (x2, y2)], color.filled()))?;
        }
        Ok(())
    }

    /// Markers for point singularities and segments for line sources
    fn draw_elements<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        map: &ScreenMap,
        elements: &[Singularity],
    ) -> DrawResult
    where
        <DB as DrawingBackend>::ErrorType: 'static,
    {
        for element in elements {
            let color = match element {
                Singularity::Source { .. } if element.is_sink() => &BLUE,
                Singularity::Source { .. } | Singularity::LineSource { .. } => &RED,
                Singularity::Vortex { .. } => &MAGENTA,
                _ => &BLACK,
            };
            match element.geometry() {
                ElementGeometry::None => {}
                ElementGeometry::Point { x, y } => {
                    area.draw(&Circle::new(map.to_px(x, y), 5, color.filled()))?;
                    area.draw(&Circle::new(map.to_px(x, y), 5, BLACK.stroke_width(1)))?;
                }
                ElementGeometry::Line { x1, y1, x2, y2 } => {
                    area.draw(&PathElement::new(
                        vec![map.to_px(x1, y1), map.to_px(x2, y2)],
                        color.stroke_width(3),
                    ))?;
                }
            }
        }
        Ok(())
    }

    fn draw_body<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        map: &ScreenMap,
        geometry: &PanelGeometry,
        filled: bool,
    ) -> DrawResult
    where
        <DB as DrawingBackend>::ErrorType: 'static,
    {
        let outline: Vec<(i32, i32)> = geometry
            .boundary_points()
            .iter()
            .map(|&(x, y)| map.to_px(x, y))
            .collect();
        if filled {
            area.draw(&Polygon::new(outline.clone(), BLACK.filled()))?;
        }
        area.draw(&PathElement::new(outline, BLACK.stroke_width(2)))?;
        Ok(())
    }

    fn draw_streamlines<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        map: &ScreenMap,
        lines: &[Vec<(f64, f64)>],
    ) -> DrawResult
    where
        <DB as DrawingBackend>::ErrorType: 'static,
    {
        for line in lines {
            let points: Vec<(i32, i32)> = line.iter().map(|&(x, y)| map.to_px(x, y)).collect();
            if points.len() > 1 {
                area.draw(&PathElement::new(points, BLACK.stroke_width(1)))?;
            }
        }
        Ok(())
    }

    /// Draw one scalar artifact with element markers onto an area
    pub fn draw_artifact<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        artifact: &FieldArtifact,
        elements: &[Singularity],
    ) -> DrawResult
    where
        <DB as DrawingBackend>::ErrorType: 'static,
    {
        if artifact.is_empty() {
            area.draw(&Text::new(
                "No flow elements",
                (10, 10),
                ("sans-serif", 20).into_font(),
            ))?;
            return Ok(());
        }
        Self::draw_cells(
            area,
            &artifact.values,
            artifact.color_range,
            artifact.contour_step(),
            None,
        )?;
        let map = ScreenMap::new(artifact.extent, area.dim_in_pixel());
        Self::draw_elements(area, &map, elements)?;
        Ok(())
    }

    /// Save a single scalar field, optionally with streamlines
    pub fn save_field<P: AsRef<Path>>(
        &self,
        artifact: &FieldArtifact,
        elements: &[Singularity],
        lines: &[Vec<(f64, f64)>],
        filename: P,
    ) -> DrawResult {
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        self.draw_artifact(&root, artifact, elements)?;
        let map = ScreenMap::new(artifact.extent, root.dim_in_pixel());
        Self::draw_streamlines(&root, &map, lines)?;
        root.present()?;
        info!("{} field saved to {:?}", artifact.kind, filename.as_ref());
        Ok(())
    }

    /// Every scalar kind on one sheet, two rows of three
    pub fn save_overview<P: AsRef<Path>>(
        &self,
        artifacts: &[FieldArtifact],
        elements: &[Singularity],
        filename: P,
    ) -> DrawResult {
        let root = BitMapBackend::new(&filename, (self.width * 3 / 2, self.height))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((2, 3));
        for (area, artifact) in areas.iter().zip(artifacts) {
            let inner = area.titled(artifact.kind.long_name(), ("sans-serif", 18))?;
            self.draw_artifact(&inner, artifact, elements)?;
        }
        root.present()?;
        info!("overview saved to {:?}", filename.as_ref());
        Ok(())
    }

    /// Boundary, control points and outward normals of a panel body
    pub fn save_panel_geometry<P: AsRef<Path>>(
        &self,
        geometry: &PanelGeometry,
        filename: P,
    ) -> DrawResult {
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let extent = padded_extent(geometry, 0.25);
        let map = ScreenMap::new(extent, root.dim_in_pixel());
        Self::draw_body(&root, &map, geometry, false)?;

        let normal_length = 0.1 * geometry.chord();
        for i in 0..geometry.len() {
            let (xc, yc) = (geometry.xc[i], geometry.yc[i]);
            let tip = (
                xc + normal_length * geometry.delta[i].cos(),
                yc + normal_length * geometry.delta[i].sin(),
            );
            root.draw(&PathElement::new(
                vec![map.to_px(xc, yc), map.to_px(tip.0, tip.1)],
                BLUE.stroke_width(1),
            ))?;
            root.draw(&Circle::new(map.to_px(xc, yc), 3, RED.filled()))?;
        }
        root.present()?;
        info!("panel geometry saved to {:?}", filename.as_ref());
        Ok(())
    }

    /// Surface Cp against x, upper and lower surfaces marked separately
    pub fn save_surface_cp<P: AsRef<Path>>(
        &self,
        geometry: &PanelGeometry,
        solution: &PanelSolution,
        filename: P,
    ) -> DrawResult {
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let cp = solution.cp();
        let (x_lo, x_hi) = min_max(geometry.xc.iter().copied());
        let (cp_lo, cp_hi) = min_max(cp.iter().copied());
        let pad = 0.1 * (cp_hi - cp_lo).max(0.1);

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Surface Cp, {} panels (N = {})", solution.method(), geometry.len()),
                ("sans-serif", 24),
            )
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi.max(x_lo + 1e-9), (cp_lo - pad)..(cp_hi + pad))?;
        chart
            .configure_mesh()
            .x_desc("x")
            .y_desc("Cp")
            .draw()?;

        let upper: Vec<(f64, f64)> = (0..geometry.len())
            .filter(|&i| geometry.yc[i] >= 0.0)
            .map(|i| (geometry.xc[i], cp[i]))
            .collect();
        let lower: Vec<(f64, f64)> = (0..geometry.len())
            .filter(|&i| geometry.yc[i] < 0.0)
            .map(|i| (geometry.xc[i], cp[i]))
            .collect();
        chart
            .draw_series(upper.iter().map(|&p| Circle::new(p, 4, RED.filled())))?
            .label("upper")
            .legend(|(x, y)| Circle::new((x, y), 4, RED.filled()));
        chart
            .draw_series(lower.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))?
            .label("lower")
            .legend(|(x, y)| Circle::new((x, y), 4, BLUE.filled()));
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        info!("surface Cp saved to {:?}", filename.as_ref());
        Ok(())
    }

    /// Cp of the panel flow with the body filled in and streamlines on top
    pub fn save_panel_field<P: AsRef<Path>>(
        &self,
        field: &VelocityField,
        extent: Domain,
        geometry: &PanelGeometry,
        lines: &[Vec<(f64, f64)>],
        filename: P,
    ) -> DrawResult {
        let root = BitMapBackend::new(&filename, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let outside = field
            .cp
            .iter()
            .zip(field.inside.iter())
            .filter(|&(_, &inside)| !inside)
            .map(|(&cp, _)| cp);
        let lo = crate::flowfield::nan_percentile(outside.clone(), 5.0);
        let hi = crate::flowfield::nan_percentile(outside, 95.0);
        Self::draw_cells(&root, &field.cp, lo.zip(hi), None, Some(&field.inside))?;

        let map = ScreenMap::new(extent, root.dim_in_pixel());
        Self::draw_streamlines(&root, &map, lines)?;
        Self::draw_body(&root, &map, geometry, true)?;
        root.present()?;
        info!("panel field saved to {:?}", filename.as_ref());
        Ok(())
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Square bounding box of the body with a relative margin
fn padded_extent(geometry: &PanelGeometry, margin: f64) -> Domain {
    let (x_lo, x_hi) = min_max(geometry.xb.iter().copied());
    let (y_lo, y_hi) = min_max(geometry.yb.iter().copied());
    let half = 0.5 * (x_hi - x_lo).max(y_hi - y_lo) * (1.0 + margin);
    let (cx, cy) = (0.5 * (x_lo + x_hi), 0.5 * (y_lo + y_hi));
    Domain {
        xmin: cx - half,
        xmax: cx + half,
        ymin: cy - half,
        ymax: cy + half,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_ramp_endpoints() {
        assert_eq!(Visualizer::get_sci_color(0.0, 0.0, 1.0), (0, 0, 255));
        assert_eq!(Visualizer::get_sci_color(1.0, 0.0, 1.0).0, 255);
        assert_eq!(Visualizer::get_sci_color(-5.0, 0.0, 1.0), (0, 0, 255));
        // degenerate range falls in the middle of the ramp
        assert_eq!(Visualizer::get_sci_color(3.0, 3.0, 3.0), (0, 255, 0));
    }

    #[test]
    fn screen_map_flips_y() {
        let map = ScreenMap::new(Domain::default(), (200, 100));
        assert_eq!(map.to_px(-1.0, 1.0), (0, 0));
        assert_eq!(map.to_px(1.0, -1.0), (200, 100));
        assert_eq!(map.to_px(0.0, 0.0), (100, 50));
    }

    #[test]
    fn extent_is_square_around_body() {
        let geometry = PanelGeometry::naca4("0012", 20).unwrap();
        let extent = padded_extent(&geometry, 0.0);
        assert!((extent.width() - extent.height()).abs() < 1e-12);
        assert!((extent.width() - 1.0).abs() < 1e-12);
    }
}
