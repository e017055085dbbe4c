//! Dense 3D storage with a single out-of-range policy.
//!
//! Every stencil in the crate reads neighbors through [`Field3::value`]. Any
//! coordinate outside `[0, res)` on some axis yields the field's background
//! value instead of panicking, so domain edges behave like a frame of
//! background cells. Writes through [`Field3::set`] outside the domain are
//! dropped and reported by the `false` return value.

use crate::grid::Grid3;
use rayon::prelude::*;
use std::sync::OnceLock;

const PAR_THRESHOLD_DEFAULT: usize = 262_144;
const PAR_MIN_WORK_PER_THREAD: usize = 4096;

fn parallel_threshold() -> usize {
    static THRESHOLD: OnceLock<usize> = OnceLock::new();
    *THRESHOLD.get_or_init(|| {
        std::env::var("PROJECTION_PAR_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(PAR_THRESHOLD_DEFAULT)
    })
}

pub(crate) fn should_parallel(len: usize) -> bool {
    if len < parallel_threshold() {
        return false;
    }
    let threads = rayon::current_num_threads().max(1);
    len / threads >= PAR_MIN_WORK_PER_THREAD
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field3<T> {
    grid: Grid3,
    background: T,
    data: Vec<T>,
}

impl<T> Field3<T>
where
    T: Copy + Default + Send + Sync,
{
    pub fn new(grid: Grid3, fill: T) -> Self {
        Self::with_background(grid, fill, T::default())
    }

    pub fn with_background(grid: Grid3, fill: T, background: T) -> Self {
        Self {
            grid,
            background,
            data: vec![fill; grid.size()],
        }
    }

    pub fn from_fn(grid: Grid3, f: impl Fn(usize, usize, usize) -> T + Sync) -> Self {
        let mut field = Self::new(grid, T::default());
        field.fill_with_index(f);
        field
    }

    pub fn from_data(grid: Grid3, data: Vec<T>) -> Self {
        assert_eq!(data.len(), grid.size(), "field data mismatch");
        Self {
            grid,
            background: T::default(),
            data,
        }
    }

    pub fn grid(&self) -> Grid3 {
        self.grid
    }

    pub fn resolution(&self) -> (usize, usize, usize) {
        self.grid.resolution()
    }

    pub fn background(&self) -> T {
        self.background
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.grid.idx(x, y, z)]
    }

    pub fn value(&self, x: i32, y: i32, z: i32) -> T {
        match self.grid.checked_idx(x, y, z) {
            Some(idx) => self.data[idx],
            None => self.background,
        }
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, value: T) -> bool {
        match self.grid.checked_idx(x, y, z) {
            Some(idx) => {
                self.data[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn copy_from(&mut self, other: &Self) {
        self.assert_same_grid(other);
        self.data.copy_from_slice(&other.data);
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize, usize) -> T + Sync) {
        let grid = self.grid;
        if should_parallel(self.data.len()) {
            self.data.par_iter_mut().enumerate().for_each(|(i, value)| {
                let (x, y, z) = grid.coords(i);
                *value = f(x, y, z);
            });
        } else {
            for (i, value) in self.data.iter_mut().enumerate() {
                let (x, y, z) = grid.coords(i);
                *value = f(x, y, z);
            }
        }
    }

    pub fn update_with_index(&mut self, f: impl Fn(usize, usize, usize, T) -> T + Sync) {
        let grid = self.grid;
        if should_parallel(self.data.len()) {
            self.data.par_iter_mut().enumerate().for_each(|(i, value)| {
                let (x, y, z) = grid.coords(i);
                *value = f(x, y, z, *value);
            });
        } else {
            for (i, value) in self.data.iter_mut().enumerate() {
                let (x, y, z) = grid.coords(i);
                *value = f(x, y, z, *value);
            }
        }
    }

    pub fn map_with_index<U>(&self, f: impl Fn(usize, usize, usize, T) -> U + Sync) -> Field3<U>
    where
        U: Copy + Default + Send + Sync,
    {
        let mut out = Field3::new(self.grid, U::default());
        out.fill_with_index(|x, y, z| f(x, y, z, self.get(x, y, z)));
        out
    }

    pub(crate) fn assert_same_grid<U>(&self, other: &Field3<U>) {
        assert_eq!(self.grid, other.grid, "field grid mismatch");
    }
}

/// `|value|`, with NaN mapped to infinity so max reductions can not drop it.
fn magnitude(value: f64) -> f64 {
    if value.is_nan() {
        f64::INFINITY
    } else {
        value.abs()
    }
}

impl Field3<f64> {
    pub fn sum(&self) -> f64 {
        if should_parallel(self.data.len()) {
            self.data.par_iter().sum()
        } else {
            self.data.iter().sum()
        }
    }

    pub fn max_abs(&self) -> f64 {
        if should_parallel(self.data.len()) {
            self.data
                .par_iter()
                .map(|value| magnitude(*value))
                .reduce(|| 0.0_f64, f64::max)
        } else {
            self.data
                .iter()
                .map(|value| magnitude(*value))
                .fold(0.0_f64, f64::max)
        }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.assert_same_grid(other);
        if should_parallel(self.data.len()) {
            self.data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(a, b)| a * b)
                .sum()
        } else {
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a * b)
                .sum()
        }
    }

    /// Fills `self` from `f` and returns `dot(self, other)` in the same pass.
    pub fn fill_with_index_and_dot(
        &mut self,
        other: &Self,
        f: impl Fn(usize, usize, usize) -> f64 + Sync,
    ) -> f64 {
        self.assert_same_grid(other);
        let grid = self.grid;
        if should_parallel(self.data.len()) {
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .enumerate()
                .map(|(i, (value, other_value))| {
                    let (x, y, z) = grid.coords(i);
                    *value = f(x, y, z);
                    *value * other_value
                })
                .sum()
        } else {
            let mut dot = 0.0;
            let pairs = self.data.iter_mut().zip(other.data.iter()).enumerate();
            for (i, (value, other_value)) in pairs {
                let (x, y, z) = grid.coords(i);
                *value = f(x, y, z);
                dot += *value * other_value;
            }
            dot
        }
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    /// `self += scale * other`
    pub fn add_scaled_in_place(&mut self, other: &Self, scale: f64) {
        self.assert_same_grid(other);
        if should_parallel(self.data.len()) {
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .for_each(|(value, other_value)| *value += other_value * scale);
        } else {
            for (value, other_value) in self.data.iter_mut().zip(other.data.iter()) {
                *value += other_value * scale;
            }
        }
    }

    /// `self += scale * other`, returning the new `max |self|`.
    pub fn add_scaled_in_place_and_max_abs(&mut self, other: &Self, scale: f64) -> f64 {
        self.assert_same_grid(other);
        if should_parallel(self.data.len()) {
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .map(|(value, other_value)| {
                    *value += other_value * scale;
                    magnitude(*value)
                })
                .reduce(|| 0.0_f64, f64::max)
        } else {
            let mut max_abs = 0.0_f64;
            for (value, other_value) in self.data.iter_mut().zip(other.data.iter()) {
                *value += other_value * scale;
                max_abs = max_abs.max(magnitude(*value));
            }
            max_abs
        }
    }

    /// `self = other + scale * self`
    pub fn scale_and_add_in_place(&mut self, scale: f64, other: &Self) {
        self.assert_same_grid(other);
        if should_parallel(self.data.len()) {
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .for_each(|(value, other_value)| *value = other_value + scale * *value);
        } else {
            for (value, other_value) in self.data.iter_mut().zip(other.data.iter()) {
                *value = other_value + scale * *value;
            }
        }
    }
}
