use crate::grid::{Axis, Grid3};
use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("{what} resolution {found:?} does not match domain resolution {expected:?}")]
    ResolutionMismatch {
        what: &'static str,
        expected: Grid3,
        found: Grid3,
    },

    #[error("{what} has a non-finite {axis:?} component at cell {cell:?}")]
    NonFinite {
        what: &'static str,
        axis: Axis,
        cell: (usize, usize, usize),
    },

    #[error("invalid configuration: {parameter} {message}")]
    InvalidConfig {
        parameter: &'static str,
        message: String,
    },
}

impl ProjectionError {
    pub fn invalid_config(parameter: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter,
            message: message.into(),
        }
    }

    pub(crate) fn check_resolution(
        what: &'static str,
        expected: Grid3,
        found: Grid3,
    ) -> ProjectionResult<()> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::ResolutionMismatch {
                what,
                expected,
                found,
            })
        }
    }
}
