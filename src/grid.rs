use crate::error::{FlowError, FlowResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Rectangular sampling domain [xmin, xmax] x [ymin, ymax]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
        }
    }
}

impl Domain {
    /// Build a domain, failing fast on inverted bounds
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> FlowResult<Self> {
        let domain = Self { xmin, xmax, ymin, ymax };
        domain.validate()?;
        Ok(domain)
    }

    pub fn validate(&self) -> FlowResult<()> {
        if !(self.xmin <= self.xmax) {
            return Err(FlowError::Domain {
                axis: 'x',
                min: self.xmin,
                max: self.xmax,
            });
        }
        if !(self.ymin <= self.ymax) {
            return Err(FlowError::Domain {
                axis: 'y',
                min: self.ymin,
                max: self.ymax,
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}

/// Evenly spaced points from start to end inclusive
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Meshgrid of sample points; rows vary in y, columns vary in x
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingGrid {
    pub domain: Domain,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl SamplingGrid {
    /// Grid with `xsteps` points in x and a y count matched to keep cells square
    pub fn new(domain: Domain, xsteps: usize) -> FlowResult<Self> {
        domain.validate()?;
        if xsteps == 0 {
            return Err(FlowError::invalid("xsteps", "at least one step is required"));
        }
        let aspect = if domain.width() > 0.0 {
            domain.height() / domain.width()
        } else {
            1.0
        };
        let ysteps = ((xsteps as f64 * aspect) as usize).max(1);
        Self::with_steps(domain, xsteps, ysteps)
    }

    pub fn with_steps(domain: Domain, xsteps: usize, ysteps: usize) -> FlowResult<Self> {
        domain.validate()?;
        if xsteps == 0 || ysteps == 0 {
            return Err(FlowError::invalid("steps", "at least one step per axis is required"));
        }
        Ok(Self {
            domain,
            x: linspace(domain.xmin, domain.xmax, xsteps),
            y: linspace(domain.ymin, domain.ymax, ysteps),
        })
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// Array shape as (rows, columns) = (ny, nx)
    pub fn shape(&self) -> (usize, usize) {
        (self.ny(), self.nx())
    }

    pub fn len(&self) -> usize {
        self.nx() * self.ny()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the point in row `j`, column `i`
    pub fn point(&self, j: usize, i: usize) -> (f64, f64) {
        (self.x[i], self.y[j])
    }

    /// Coordinates of a row-major flat index
    pub fn flat_point(&self, k: usize) -> (f64, f64) {
        self.point(k / self.nx(), k % self.nx())
    }

    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let shape = self.shape();
        (
            Array2::from_shape_fn(shape, |(_, i)| self.x[i]),
            Array2::from_shape_fn(shape, |(j, _)| self.y[j]),
        )
    }

    pub fn dx(&self) -> f64 {
        if self.nx() > 1 {
            self.x[1] - self.x[0]
        } else {
            0.0
        }
    }

    pub fn dy(&self) -> f64 {
        if self.ny() > 1 {
            self.y[1] - self.y[0]
        } else {
            0.0
        }
    }
}
