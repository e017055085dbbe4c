use crate::error::{ProjectionError, ProjectionResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepOrder {
    /// Plain ascending/descending `(x, y, z)` loops on one thread.
    #[default]
    Lexicographic,
    /// Anti-diagonal planes `x + y + z = d`, each plane evaluated on rayon.
    /// Bit-identical to [`SweepOrder::Lexicographic`].
    Wavefront,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreconditionerKind {
    #[default]
    ModifiedIncompleteCholesky,
    Jacobi,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// MIC(0) damping constant, 0 gives plain IC(0), 1 full modification.
    pub mic_tuning: f64,
    /// Pivots smaller than `mic_safety * Adiag` fall back to `Adiag`.
    pub mic_safety: f64,
    pub pivot_epsilon: f64,
    /// Absolute bound on `max |r|` for convergence; also the early-exit
    /// threshold on the initial divergence.
    pub tolerance: f64,
    pub max_iterations: usize,
    pub sweep: SweepOrder,
    /// Wavefront planes with at least this many cells are evaluated on rayon.
    pub plane_parallel_min: usize,
    pub preconditioner: PreconditionerKind,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            mic_tuning: 0.97,
            mic_safety: 0.25,
            pivot_epsilon: 1e-30,
            tolerance: 1e-6,
            max_iterations: 100,
            sweep: SweepOrder::Lexicographic,
            plane_parallel_min: 2048,
            preconditioner: PreconditionerKind::ModifiedIncompleteCholesky,
        }
    }
}

impl ProjectionConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_mic_tuning(mut self, mic_tuning: f64) -> Self {
        self.mic_tuning = mic_tuning;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepOrder) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_plane_parallel_min(mut self, plane_parallel_min: usize) -> Self {
        self.plane_parallel_min = plane_parallel_min;
        self
    }

    pub fn with_preconditioner(mut self, preconditioner: PreconditionerKind) -> Self {
        self.preconditioner = preconditioner;
        self
    }

    pub fn validate(&self) -> ProjectionResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ProjectionError::invalid_config(
                "tolerance",
                format!("must be finite and >= 0, got {}", self.tolerance),
            ));
        }
        if !(0.0..=1.0).contains(&self.mic_tuning) {
            return Err(ProjectionError::invalid_config(
                "mic_tuning",
                format!("must lie in [0, 1], got {}", self.mic_tuning),
            ));
        }
        if !(0.0..=1.0).contains(&self.mic_safety) {
            return Err(ProjectionError::invalid_config(
                "mic_safety",
                format!("must lie in [0, 1], got {}", self.mic_safety),
            ));
        }
        if !self.pivot_epsilon.is_finite() || self.pivot_epsilon < 0.0 {
            return Err(ProjectionError::invalid_config(
                "pivot_epsilon",
                format!("must be finite and >= 0, got {}", self.pivot_epsilon),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = ProjectionConfig::default();
        assert_eq!(config.mic_tuning, 0.97);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.plane_parallel_min, 2048);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_tuning = ProjectionConfig::default().with_mic_tuning(1.5);
        assert!(matches!(
            bad_tuning.validate(),
            Err(ProjectionError::InvalidConfig {
                parameter: "mic_tuning",
                ..
            })
        ));
        let bad_tol = ProjectionConfig::default().with_tolerance(f64::NAN);
        assert!(matches!(
            bad_tol.validate(),
            Err(ProjectionError::InvalidConfig {
                parameter: "tolerance",
                ..
            })
        ));
        let mut bad_eps = ProjectionConfig::default();
        bad_eps.pivot_epsilon = -1.0;
        assert!(bad_eps.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ProjectionConfig =
            serde_json::from_str(r#"{ "tolerance": 1e-8, "sweep": "Wavefront" }"#)
                .expect("config should parse");
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.sweep, SweepOrder::Wavefront);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(
            config.preconditioner,
            PreconditionerKind::ModifiedIncompleteCholesky
        );
    }
}
