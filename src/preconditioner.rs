use crate::{
    config::{PreconditionerKind, ProjectionConfig, SweepOrder},
    field::Field3,
    grid::Grid3,
    laplacian::PoissonStencil,
};
use rayon::prelude::*;

pub trait Preconditioner {
    /// `z = M^-1 r`
    fn apply_into(&mut self, r: &Field3<f64>, z: &mut Field3<f64>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

/// Visits every cell so that each cell comes after all cells it depends on.
///
/// `cell` reads the partially written `target` and returns the new value for
/// one cell. Ascending sweeps may read the three minus neighbors, descending
/// sweeps the three plus neighbors. Wavefront planes of at least
/// `plane_parallel_min` cells run on rayon.
fn sweep(
    order: SweepOrder,
    planes: &[Vec<(usize, usize, usize)>],
    plane_parallel_min: usize,
    direction: Direction,
    target: &mut Field3<f64>,
    cell: impl Fn(&Field3<f64>, usize, usize, usize) -> f64 + Sync,
) {
    let grid = target.grid();
    match order {
        SweepOrder::Lexicographic => {
            let mut visit = |idx: usize| {
                let (x, y, z) = grid.coords(idx);
                let value = cell(target, x, y, z);
                target.as_mut_slice()[idx] = value;
            };
            match direction {
                Direction::Ascending => (0..grid.size()).for_each(&mut visit),
                Direction::Descending => (0..grid.size()).rev().for_each(&mut visit),
            }
        }
        SweepOrder::Wavefront => {
            let mut visit = |plane: &Vec<(usize, usize, usize)>| {
                let view: &Field3<f64> = target;
                let values: Vec<f64> = if plane.len() >= plane_parallel_min {
                    plane
                        .par_iter()
                        .map(|&(x, y, z)| cell(view, x, y, z))
                        .collect()
                } else {
                    plane.iter().map(|&(x, y, z)| cell(view, x, y, z)).collect()
                };
                let data = target.as_mut_slice();
                for (&(x, y, z), value) in plane.iter().zip(values) {
                    data[grid.idx(x, y, z)] = value;
                }
            };
            match direction {
                Direction::Ascending => planes.iter().for_each(&mut visit),
                Direction::Descending => planes.iter().rev().for_each(&mut visit),
            }
        }
    }
}

fn wavefront_planes(grid: Grid3, order: SweepOrder) -> Vec<Vec<(usize, usize, usize)>> {
    match order {
        SweepOrder::Lexicographic => Vec::new(),
        SweepOrder::Wavefront => (0..grid.wavefront_count())
            .map(|d| grid.wavefront(d))
            .collect(),
    }
}

/// Modified incomplete Cholesky, zero fill-in, applied as `(L L^T)^-1`.
#[derive(Clone, Debug)]
pub struct MicPreconditioner<'a> {
    stencil: &'a PoissonStencil,
    weights: Field3<f64>,
    order: SweepOrder,
    planes: Vec<Vec<(usize, usize, usize)>>,
    plane_parallel_min: usize,
    q: Field3<f64>,
}

impl<'a> MicPreconditioner<'a> {
    pub fn build(stencil: &'a PoissonStencil, config: &ProjectionConfig) -> Self {
        let grid = stencil.grid();
        let order = config.sweep;
        let planes = wavefront_planes(grid, order);
        let plane_parallel_min = config.plane_parallel_min;
        let mut weights = Field3::new(grid, 0.0);
        let tuning = config.mic_tuning;
        let safety = config.mic_safety;
        let epsilon = config.pivot_epsilon;
        let pivot = |m: &Field3<f64>, x: usize, y: usize, z: usize| {
            let ad = stencil.adiag.get(x, y, z);
            if ad == 0.0 {
                return 0.0;
            }
            let (x, y, z) = (x as i32, y as i32, z as i32);
            let (ai, aj, ak) = (&stencil.plus_i, &stencil.plus_j, &stencil.plus_k);
            let pi = m.value(x - 1, y, z);
            let pj = m.value(x, y - 1, z);
            let pk = m.value(x, y, z - 1);
            let ai_i = ai.value(x - 1, y, z);
            let aj_i = aj.value(x - 1, y, z);
            let ak_i = ak.value(x - 1, y, z);
            let ai_j = ai.value(x, y - 1, z);
            let aj_j = aj.value(x, y - 1, z);
            let ak_j = ak.value(x, y - 1, z);
            let ai_k = ai.value(x, y, z - 1);
            let aj_k = aj.value(x, y, z - 1);
            let ak_k = ak.value(x, y, z - 1);
            let mut e = ad
                - (ai_i * pi) * (ai_i * pi)
                - (aj_j * pj) * (aj_j * pj)
                - (ak_k * pk) * (ak_k * pk)
                - tuning
                    * (ai_i * (aj_i + ak_i) * pi * pi
                        + aj_j * (ai_j + ak_j) * pj * pj
                        + ak_k * (ai_k + aj_k) * pk * pk);
            if e < safety * ad {
                e = ad;
            }
            1.0 / (e + epsilon).sqrt()
        };
        sweep(
            order,
            &planes,
            plane_parallel_min,
            Direction::Ascending,
            &mut weights,
            pivot,
        );
        Self {
            stencil,
            weights,
            order,
            planes,
            plane_parallel_min,
            q: Field3::new(grid, 0.0),
        }
    }

    pub fn weights(&self) -> &Field3<f64> {
        &self.weights
    }
}

impl Preconditioner for MicPreconditioner<'_> {
    fn apply_into(&mut self, r: &Field3<f64>, z: &mut Field3<f64>) {
        self.weights.assert_same_grid(r);
        self.weights.assert_same_grid(z);
        let stencil = self.stencil;
        let m = &self.weights;

        // L q = r
        let forward = |q: &Field3<f64>, x: usize, y: usize, z: usize| {
            let (x, y, z) = (x as i32, y as i32, z as i32);
            let t = r.value(x, y, z)
                - stencil.plus_i.value(x - 1, y, z) * m.value(x - 1, y, z) * q.value(x - 1, y, z)
                - stencil.plus_j.value(x, y - 1, z) * m.value(x, y - 1, z) * q.value(x, y - 1, z)
                - stencil.plus_k.value(x, y, z - 1) * m.value(x, y, z - 1) * q.value(x, y, z - 1);
            t * m.value(x, y, z)
        };
        sweep(
            self.order,
            &self.planes,
            self.plane_parallel_min,
            Direction::Ascending,
            &mut self.q,
            forward,
        );

        // L^T z = q
        let q = &self.q;
        let backward = |out: &Field3<f64>, x: usize, y: usize, z: usize| {
            let (x, y, z) = (x as i32, y as i32, z as i32);
            let mc = m.value(x, y, z);
            let t = q.value(x, y, z)
                - stencil.plus_i.value(x, y, z) * mc * out.value(x + 1, y, z)
                - stencil.plus_j.value(x, y, z) * mc * out.value(x, y + 1, z)
                - stencil.plus_k.value(x, y, z) * mc * out.value(x, y, z + 1);
            t * mc
        };
        sweep(
            self.order,
            &self.planes,
            self.plane_parallel_min,
            Direction::Descending,
            z,
            backward,
        );
    }
}

#[derive(Clone, Debug)]
pub struct JacobiPreconditioner {
    inv_diag: Field3<f64>,
}

impl JacobiPreconditioner {
    pub fn build(stencil: &PoissonStencil) -> Self {
        let inv_diag = stencil.adiag.map_with_index(|_, _, _, ad| {
            if ad == 0.0 {
                0.0
            } else {
                1.0 / ad
            }
        });
        Self { inv_diag }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply_into(&mut self, r: &Field3<f64>, z: &mut Field3<f64>) {
        self.inv_diag.assert_same_grid(r);
        let inv_diag = &self.inv_diag;
        z.fill_with_index(|x, y, z| r.get(x, y, z) * inv_diag.get(x, y, z));
    }
}

/// Preconditioner selected by [`ProjectionConfig::preconditioner`].
#[derive(Clone, Debug)]
pub enum PressurePreconditioner<'a> {
    Mic(MicPreconditioner<'a>),
    Jacobi(JacobiPreconditioner),
}

impl<'a> PressurePreconditioner<'a> {
    pub fn build(stencil: &'a PoissonStencil, config: &ProjectionConfig) -> Self {
        match config.preconditioner {
            PreconditionerKind::ModifiedIncompleteCholesky => {
                Self::Mic(MicPreconditioner::build(stencil, config))
            }
            PreconditionerKind::Jacobi => Self::Jacobi(JacobiPreconditioner::build(stencil)),
        }
    }
}

impl Preconditioner for PressurePreconditioner<'_> {
    fn apply_into(&mut self, r: &Field3<f64>, z: &mut Field3<f64>) {
        match self {
            Self::Mic(mic) => mic.apply_into(r, z),
            Self::Jacobi(jacobi) => jacobi.apply_into(r, z),
        }
    }
}
