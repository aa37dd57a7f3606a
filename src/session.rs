use crate::error::{FlowError, FlowResult};
use crate::flowfield::{FieldArtifact, FieldOptions, FlowField, ScalarKind};
use crate::grid::{Domain, SamplingGrid};
use crate::panel::{BodyShape, PanelGeometry};
use crate::presets::Preset;
use crate::sampler::{FieldSampler, VelocityField};
use crate::singularity::Singularity;
use crate::solver::{Freestream, PanelMethod, PanelSolution};
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Body, freestream and method for the panel solver, plus cached results
#[derive(Debug, Clone)]
pub struct PanelState {
    pub body: BodyShape,
    pub panels: usize,
    pub method: PanelMethod,
    pub freestream: Freestream,
    geometry: Option<PanelGeometry>,
    solution: Option<PanelSolution>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            body: BodyShape::default(),
            panels: 8,
            method: PanelMethod::default(),
            freestream: Freestream::default(),
            geometry: None,
            solution: None,
        }
    }
}

/// Everything one user of the application works on
#[derive(Debug, Clone)]
pub struct Session {
    field: FlowField,
    domain: Domain,
    xsteps: usize,
    grid: SamplingGrid,
    options: FieldOptions,
    cache: HashMap<ScalarKind, FieldArtifact>,
    panel: PanelState,
}

impl Session {
    pub fn new(domain: Domain, xsteps: usize) -> FlowResult<Self> {
        let grid = SamplingGrid::new(domain, xsteps)?;
        Ok(Self {
            field: FlowField::new(),
            domain,
            xsteps,
            grid,
            options: FieldOptions::default(),
            cache: HashMap::new(),
            panel: PanelState::default(),
        })
    }

    fn invalidate_field(&mut self) {
        if !self.cache.is_empty() {
            debug!("clearing {} cached field artifacts", self.cache.len());
        }
        self.cache.clear();
    }

    fn invalidate_solution(&mut self) {
        self.panel.solution = None;
    }

    fn invalidate_geometry(&mut self) {
        self.panel.geometry = None;
        self.panel.solution = None;
    }

    // --- flow field -------------------------------------------------------

    pub fn field(&self) -> &FlowField {
        &self.field
    }

    pub fn add_element(&mut self, element: Singularity) -> FlowResult<usize> {
        let index = self.field.add(element)?;
        self.invalidate_field();
        Ok(index)
    }

    pub fn remove_element(&mut self, index: usize) -> Option<Singularity> {
        let removed = self.field.remove(index);
        if removed.is_some() {
            self.invalidate_field();
        }
        removed
    }

    pub fn clear_elements(&mut self) {
        self.field.clear();
        self.invalidate_field();
    }

    /// Edit one element in place; the edit is rolled back if it leaves the element invalid
    pub fn edit_element<F>(&mut self, index: usize, edit: F) -> FlowResult<()>
    where
        F: FnOnce(&mut Singularity),
    {
        let element = self
            .field
            .get_mut(index)
            .ok_or_else(|| FlowError::invalid("index", format!("no element at {index}")))?;
        let before = element.clone();
        edit(element);
        if let Err(err) = element.validate() {
            *element = before;
            return Err(err);
        }
        self.invalidate_field();
        Ok(())
    }

    /// Append the preset's elements, returning their indices
    pub fn apply_preset(&mut self, preset: &Preset) -> FlowResult<Vec<usize>> {
        let elements = preset.elements()?;
        let mut indices = Vec::with_capacity(elements.len());
        for element in elements {
            indices.push(self.field.add(element)?);
        }
        self.invalidate_field();
        Ok(indices)
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn xsteps(&self) -> usize {
        self.xsteps
    }

    pub fn grid(&self) -> &SamplingGrid {
        &self.grid
    }

    /// Change the sampling domain; the session is untouched on error
    pub fn set_domain(&mut self, domain: Domain) -> FlowResult<()> {
        self.grid = SamplingGrid::new(domain, self.xsteps)?;
        self.domain = domain;
        self.invalidate_field();
        Ok(())
    }

    pub fn set_xsteps(&mut self, xsteps: usize) -> FlowResult<()> {
        self.grid = SamplingGrid::new(self.domain, xsteps)?;
        self.xsteps = xsteps;
        self.invalidate_field();
        Ok(())
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FieldOptions) {
        self.options = options;
        self.invalidate_field();
    }

    /// Cached artifact for one scalar kind
    pub fn draw(&mut self, kind: ScalarKind) -> FlowResult<&FieldArtifact> {
        let artifact = match self.cache.entry(kind) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(self.field.evaluate(kind, &self.grid, &self.options)?)
            }
        };
        Ok(artifact)
    }

    pub fn is_cached(&self, kind: ScalarKind) -> bool {
        self.cache.contains_key(&kind)
    }

    // --- panel method -----------------------------------------------------

    pub fn panel_state(&self) -> &PanelState {
        &self.panel
    }

    pub fn set_freestream(&mut self, freestream: Freestream) -> FlowResult<()> {
        freestream.validate()?;
        if freestream != self.panel.freestream {
            self.panel.freestream = freestream;
            self.invalidate_solution();
        }
        Ok(())
    }

    pub fn set_panels(&mut self, panels: usize) {
        if panels != self.panel.panels {
            self.panel.panels = panels;
            self.invalidate_geometry();
        }
    }

    pub fn set_body(&mut self, body: BodyShape) {
        if body != self.panel.body {
            self.panel.body = body;
            self.invalidate_geometry();
        }
    }

    pub fn set_method(&mut self, method: PanelMethod) {
        if method != self.panel.method {
            self.panel.method = method;
            self.invalidate_solution();
        }
    }

    pub fn geometry(&mut self) -> FlowResult<&PanelGeometry> {
        let geometry = match self.panel.geometry.take() {
            Some(geometry) => geometry,
            None => self.panel.body.discretize(self.panel.panels)?,
        };
        Ok(self.panel.geometry.insert(geometry))
    }

    /// Panel geometry and its solution, solving only when inputs changed
    pub fn solved(&mut self) -> FlowResult<(&PanelGeometry, &PanelSolution)> {
        let geometry = match self.panel.geometry.take() {
            Some(geometry) => geometry,
            None => self.panel.body.discretize(self.panel.panels)?,
        };
        let solution = match self.panel.solution.take() {
            Some(solution) => solution,
            None => match self.panel.method.solve(&geometry, &self.panel.freestream) {
                Ok(solution) => solution,
                Err(err) => {
                    self.panel.geometry = Some(geometry);
                    return Err(err);
                }
            },
        };
        let geometry = &*self.panel.geometry.insert(geometry);
        let solution = &*self.panel.solution.insert(solution);
        Ok((geometry, solution))
    }

    pub fn solve(&mut self) -> FlowResult<&PanelSolution> {
        Ok(self.solved()?.1)
    }

    pub fn has_solution(&self) -> bool {
        self.panel.solution.is_some()
    }

    /// Off-body velocity of the solved panel flow over `grid`
    pub fn panel_field(&mut self, grid: &SamplingGrid) -> FlowResult<VelocityField> {
        let freestream = self.panel.freestream;
        let (geometry, solution) = self.solved()?;
        let strengths = solution.strengths();
        Ok(FieldSampler::new(geometry, &strengths, freestream)?.sample(grid))
    }
}

impl Default for Session {
    fn default() -> Self {
        let domain = Domain::default();
        Self {
            field: FlowField::new(),
            domain,
            xsteps: 300,
            grid: SamplingGrid {
                domain,
                x: crate::grid::linspace(domain.xmin, domain.xmax, 300),
                y: crate::grid::linspace(domain.ymin, domain.ymax, 300),
            },
            options: FieldOptions::default(),
            cache: HashMap::new(),
            panel: PanelState::default(),
        }
    }
}
