use crate::{
    config::ProjectionConfig,
    divergence::{divergence, max_divergence},
    error::{ProjectionError, ProjectionResult},
    field::Field3,
    flags::FlagField,
    grid::Axis,
    laplacian::PoissonStencil,
    pcg::{solve_pressure_pcg, SolveReport, SolveStatus},
    preconditioner::PressurePreconditioner,
    velocity::VelocityField,
};
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionStatus {
    /// The input was already within tolerance and was left untouched.
    AlreadyDivergenceFree,
    Solved,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionReport {
    pub status: ProjectionStatus,
    pub divergence_before: f64,
    pub divergence_after: f64,
    pub solve: Option<SolveReport>,
}

impl ProjectionReport {
    pub fn iterations(&self) -> usize {
        self.solve.map_or(0, |solve| solve.iterations)
    }

    pub fn converged(&self) -> bool {
        self.solve.map_or(true, |solve| solve.converged())
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    pub report: ProjectionReport,
    pub pressure: Field3<f64>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PressureProjector {
    config: ProjectionConfig,
}

impl PressureProjector {
    pub fn new(config: ProjectionConfig) -> ProjectionResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Makes `velocity` discretely divergence free over the fluid cells of `flags`.
    pub fn enforce_incompressibility<V: VelocityField>(
        &self,
        velocity: &mut V,
        flags: &FlagField,
    ) -> ProjectionResult<ProjectionReport> {
        self.project(velocity, flags).map(|projection| projection.report)
    }

    pub fn project<V: VelocityField>(
        &self,
        velocity: &mut V,
        flags: &FlagField,
    ) -> ProjectionResult<Projection> {
        let grid = velocity.grid();
        ProjectionError::check_resolution("flags", grid, flags.grid())?;
        check_finite(&*velocity)?;

        let div = divergence(&*velocity, Some(flags));
        if div.max_abs <= self.config.tolerance {
            debug!(
                "projection skipped: max divergence {:.3e} within tolerance",
                div.max_abs
            );
            return Ok(Projection {
                report: ProjectionReport {
                    status: ProjectionStatus::AlreadyDivergenceFree,
                    divergence_before: div.max_abs,
                    divergence_after: div.max_abs,
                    solve: None,
                },
                pressure: Field3::new(grid, 0.0),
            });
        }

        let stencil = PoissonStencil::build(flags);
        let rhs = div.field.map_with_index(|_, _, _, value| -value);
        let mut preconditioner = PressurePreconditioner::build(&stencil, &self.config);
        let (pressure, solve) =
            solve_pressure_pcg(&rhs, &stencil, &mut preconditioner, &self.config);
        let divergence_after = if solve.status == SolveStatus::NonFinite {
            div.max_abs
        } else {
            subtract_pressure_gradient(velocity, &pressure, flags);
            max_divergence(&*velocity, flags)
        };
        debug!(
            "projection on {:?}: max divergence {:.3e} -> {:.3e} after {} iterations",
            grid.resolution(),
            div.max_abs,
            divergence_after,
            solve.iterations
        );
        Ok(Projection {
            report: ProjectionReport {
                status: ProjectionStatus::Solved,
                divergence_before: div.max_abs,
                divergence_after,
                solve: Some(solve),
            },
            pressure,
        })
    }
}

fn check_finite<V: VelocityField>(velocity: &V) -> ProjectionResult<()> {
    let grid = velocity.grid();
    for idx in 0..grid.size() {
        let (x, y, z) = grid.coords(idx);
        for axis in Axis::ALL {
            if !velocity
                .component(axis, x as i32, y as i32, z as i32)
                .is_finite()
            {
                return Err(ProjectionError::NonFinite {
                    what: "velocity",
                    axis,
                    cell: (x, y, z),
                });
            }
        }
    }
    Ok(())
}

/// Projects with [`ProjectionConfig::default`].
pub fn enforce_incompressibility<V: VelocityField>(
    velocity: &mut V,
    flags: &FlagField,
) -> ProjectionResult<ProjectionReport> {
    PressureProjector::default().enforce_incompressibility(velocity, flags)
}

/// Open faces lose the pressure difference across them, closed faces are zeroed.
pub fn subtract_pressure_gradient<V: VelocityField>(
    velocity: &mut V,
    pressure: &Field3<f64>,
    flags: &FlagField,
) {
    assert_eq!(velocity.grid(), pressure.grid(), "field grid mismatch");
    assert_eq!(velocity.grid(), flags.grid(), "field grid mismatch");
    for axis in Axis::ALL {
        let (ox, oy, oz) = axis.offset();
        velocity.update_axis(axis, |x, y, z, value| {
            let (x, y, z) = (x as i32, y as i32, z as i32);
            if flags.is_face_open(x, y, z, axis) {
                value - (pressure.value(x + ox, y + oy, z + oz) - pressure.value(x, y, z))
            } else {
                0.0
            }
        });
    }
}
