//! Pressure projection for incompressible flow on dense 3D cell grids.
//!
//! [`PressureProjector`] removes the divergence of a velocity field over the
//! fluid cells of a [`FlagField`] by solving a 7-point Poisson problem with
//! matrix-free PCG and a MIC(0) preconditioner.

mod config;
mod divergence;
mod error;
mod field;
mod flags;
mod grid;
mod laplacian;
mod pcg;
mod preconditioner;
mod projection;
mod vec3;
mod velocity;

pub use config::{PreconditionerKind, ProjectionConfig, SweepOrder};
pub use divergence::{divergence, divergence_into, max_divergence, Divergence};
pub use error::{ProjectionError, ProjectionResult};
pub use field::Field3;
pub use flags::{CellType, FlagField, FLUID, SOLID};
pub use grid::{Axis, Grid3};
pub use laplacian::PoissonStencil;
pub use pcg::{solve_pressure_pcg, solve_pressure_pcg_into, PcgScratch, SolveReport, SolveStatus};
pub use preconditioner::{
    JacobiPreconditioner, MicPreconditioner, Preconditioner, PressurePreconditioner,
};
pub use projection::{
    enforce_incompressibility, subtract_pressure_gradient, PressureProjector, Projection,
    ProjectionReport, ProjectionStatus,
};
pub use vec3::Vec3;
pub use velocity::{SplitVelocity3, VelocityField};
