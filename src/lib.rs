//! 2D inviscid, incompressible potential flow.
//!
//! Two halves share the crate: superposition of elementary singularities sampled on a
//! grid (`singularity`, `flowfield`, `presets`), and source/vortex panel methods for
//! flow around closed bodies (`panel`, `influence`, `solver`, `sampler`).

pub mod analysis;
pub mod config;
pub mod error;
pub mod flowfield;
pub mod grid;
pub mod influence;
pub mod panel;
pub mod presets;
pub mod sampler;
pub mod session;
pub mod singularity;
pub mod solver;
pub mod visualizer;

pub use error::{FlowError, FlowResult};
pub use flowfield::{FieldArtifact, FieldOptions, FlowField, ScalarKind};
pub use grid::{Domain, SamplingGrid};
pub use panel::{BodyShape, PanelGeometry};
pub use presets::Preset;
pub use sampler::{FieldSampler, VelocityField};
pub use session::Session;
pub use singularity::Singularity;
pub use solver::{
    CombinedPanelSolver, Freestream, PanelMethod, PanelSolution, PanelStrengths,
    SourcePanelSolver, VortexPanelSolver,
};
