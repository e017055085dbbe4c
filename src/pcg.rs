use crate::{
    config::ProjectionConfig, field::Field3, grid::Grid3, laplacian::PoissonStencil,
    preconditioner::Preconditioner,
};
use log::{debug, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    Converged,
    MaxIterationsReached,
    /// A NaN or infinity showed up in the right-hand side or the iteration.
    /// The pressure holds the last finite iterate.
    NonFinite,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub iterations: usize,
    pub initial_residual: f64,
    pub max_residual: f64,
    /// Steps where `dot(A s, s)` or `sigma` was exactly zero and got replaced by 1.
    pub degenerate_steps: usize,
}

impl SolveReport {
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

#[derive(Clone, Debug)]
pub struct PcgScratch {
    r: Field3<f64>,
    z: Field3<f64>,
    s: Field3<f64>,
}

impl PcgScratch {
    pub fn new(grid: Grid3) -> Self {
        Self {
            r: Field3::new(grid, 0.0),
            z: Field3::new(grid, 0.0),
            s: Field3::new(grid, 0.0),
        }
    }

    pub fn grid(&self) -> Grid3 {
        self.r.grid()
    }
}

fn non_finite_report(
    iterations: usize,
    initial_residual: f64,
    max_residual: f64,
    degenerate_steps: usize,
) -> SolveReport {
    warn!("PCG stopped after {iterations} iterations on a non-finite value");
    SolveReport {
        status: SolveStatus::NonFinite,
        iterations,
        initial_residual,
        max_residual,
        degenerate_steps,
    }
}

fn nonzero_or_one(value: f64, degenerate_steps: &mut usize) -> f64 {
    if value == 0.0 {
        *degenerate_steps += 1;
        1.0
    } else {
        value
    }
}

/// Solves `A p = rhs` starting from `p = 0`.
pub fn solve_pressure_pcg<P: Preconditioner>(
    rhs: &Field3<f64>,
    stencil: &PoissonStencil,
    preconditioner: &mut P,
    config: &ProjectionConfig,
) -> (Field3<f64>, SolveReport) {
    let grid = rhs.grid();
    let mut pressure = Field3::new(grid, 0.0);
    let mut scratch = PcgScratch::new(grid);
    let report = solve_pressure_pcg_into(
        &mut pressure,
        rhs,
        stencil,
        preconditioner,
        config,
        &mut scratch,
    );
    (pressure, report)
}

pub fn solve_pressure_pcg_into<P: Preconditioner>(
    pressure: &mut Field3<f64>,
    rhs: &Field3<f64>,
    stencil: &PoissonStencil,
    preconditioner: &mut P,
    config: &ProjectionConfig,
    scratch: &mut PcgScratch,
) -> SolveReport {
    pressure.assert_same_grid(rhs);
    stencil.adiag.assert_same_grid(rhs);
    assert_eq!(scratch.grid(), rhs.grid(), "field grid mismatch");
    let tol = config.tolerance;
    let mut degenerate_steps = 0;

    pressure.fill(0.0);
    scratch.r.copy_from(rhs);
    let initial_residual = scratch.r.max_abs();
    if !initial_residual.is_finite() {
        return non_finite_report(0, initial_residual, initial_residual, degenerate_steps);
    }
    if initial_residual <= tol {
        debug!("PCG: initial residual {initial_residual:.3e} within tolerance");
        return SolveReport {
            status: SolveStatus::Converged,
            iterations: 0,
            initial_residual,
            max_residual: initial_residual,
            degenerate_steps,
        };
    }

    preconditioner.apply_into(&scratch.r, &mut scratch.z);
    scratch.s.copy_from(&scratch.z);
    let mut sigma = scratch.z.dot(&scratch.r);
    let mut max_residual = initial_residual;
    if !sigma.is_finite() {
        return non_finite_report(0, initial_residual, max_residual, degenerate_steps);
    }

    for iteration in 1..=config.max_iterations {
        let ps = stencil.apply_into_and_dot(&scratch.s, &mut scratch.z);
        let alpha = sigma / nonzero_or_one(ps, &mut degenerate_steps);
        if !alpha.is_finite() {
            return non_finite_report(
                iteration - 1,
                initial_residual,
                max_residual,
                degenerate_steps,
            );
        }
        pressure.add_scaled_in_place(&scratch.s, alpha);
        max_residual = scratch.r.add_scaled_in_place_and_max_abs(&scratch.z, -alpha);
        trace!(
            "PCG iter {}: alpha = {:.6e}, sigma = {:.6e}, residual = {:.6e}",
            iteration,
            alpha,
            sigma,
            max_residual
        );
        if max_residual <= tol {
            debug!(
                "PCG converged in {} iterations: residual {:.3e} -> {:.3e}",
                iteration, initial_residual, max_residual
            );
            return SolveReport {
                status: SolveStatus::Converged,
                iterations: iteration,
                initial_residual,
                max_residual,
                degenerate_steps,
            };
        }
        if !max_residual.is_finite() {
            return non_finite_report(iteration, initial_residual, max_residual, degenerate_steps);
        }
        preconditioner.apply_into(&scratch.r, &mut scratch.z);
        let sigma_new = scratch.z.dot(&scratch.r);
        if !sigma_new.is_finite() {
            return non_finite_report(iteration, initial_residual, max_residual, degenerate_steps);
        }
        let beta = sigma_new / nonzero_or_one(sigma, &mut degenerate_steps);
        scratch.s.scale_and_add_in_place(beta, &scratch.z);
        sigma = sigma_new;
    }

    warn!(
        "PCG hit the iteration cap ({}) with residual {:.3e} (tolerance {:.1e})",
        config.max_iterations, max_residual, tol
    );
    SolveReport {
        status: SolveStatus::MaxIterationsReached,
        iterations: config.max_iterations,
        initial_residual,
        max_residual,
        degenerate_steps,
    }
}
