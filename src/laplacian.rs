use crate::{
    field::Field3,
    flags::FlagField,
    grid::{Axis, Grid3},
};

/// Implicit 7-point Poisson operator over the fluid cells.
///
/// Only the diagonal and the coupling to the `+x`, `+y` and `+z` neighbors are
/// stored. The coupling to a minus neighbor is that neighbor's plus value.
#[derive(Clone, Debug, PartialEq)]
pub struct PoissonStencil {
    pub adiag: Field3<f64>,
    pub plus_i: Field3<f64>,
    pub plus_j: Field3<f64>,
    pub plus_k: Field3<f64>,
}

impl PoissonStencil {
    pub fn build(flags: &FlagField) -> Self {
        let grid = flags.grid();
        let coupling = |axis: Axis| {
            Field3::from_fn(grid, |x, y, z| {
                if flags.is_face_open(x as i32, y as i32, z as i32, axis) {
                    -1.0
                } else {
                    0.0
                }
            })
        };
        let adiag = Field3::from_fn(grid, |x, y, z| {
            let (x, y, z) = (x as i32, y as i32, z as i32);
            if !flags.is_fluid(x, y, z) {
                return 0.0;
            }
            let mut count = 0.0;
            for axis in Axis::ALL {
                let (ox, oy, oz) = axis.offset();
                if flags.is_fluid(x + ox, y + oy, z + oz) {
                    count += 1.0;
                }
                if flags.is_fluid(x - ox, y - oy, z - oz) {
                    count += 1.0;
                }
            }
            count
        });
        Self {
            adiag,
            plus_i: coupling(Axis::X),
            plus_j: coupling(Axis::Y),
            plus_k: coupling(Axis::Z),
        }
    }

    pub fn grid(&self) -> Grid3 {
        self.adiag.grid()
    }

    pub fn plus(&self, axis: Axis) -> &Field3<f64> {
        match axis {
            Axis::X => &self.plus_i,
            Axis::Y => &self.plus_j,
            Axis::Z => &self.plus_k,
        }
    }

    fn row_product(&self, s: &Field3<f64>, x: usize, y: usize, z: usize) -> f64 {
        let (xi, yi, zi) = (x as i32, y as i32, z as i32);
        self.adiag.get(x, y, z) * s.get(x, y, z)
            + self.plus_i.value(xi - 1, yi, zi) * s.value(xi - 1, yi, zi)
            + self.plus_i.get(x, y, z) * s.value(xi + 1, yi, zi)
            + self.plus_j.value(xi, yi - 1, zi) * s.value(xi, yi - 1, zi)
            + self.plus_j.get(x, y, z) * s.value(xi, yi + 1, zi)
            + self.plus_k.value(xi, yi, zi - 1) * s.value(xi, yi, zi - 1)
            + self.plus_k.get(x, y, z) * s.value(xi, yi, zi + 1)
    }

    /// `out = A * s`
    pub fn apply_into(&self, s: &Field3<f64>, out: &mut Field3<f64>) {
        self.adiag.assert_same_grid(s);
        self.adiag.assert_same_grid(out);
        out.fill_with_index(|x, y, z| self.row_product(s, x, y, z));
    }

    /// `out = A * s`, returning `dot(out, s)` from the same pass.
    pub fn apply_into_and_dot(&self, s: &Field3<f64>, out: &mut Field3<f64>) -> f64 {
        self.adiag.assert_same_grid(s);
        out.fill_with_index_and_dot(s, |x, y, z| self.row_product(s, x, y, z))
    }

    pub fn apply(&self, s: &Field3<f64>) -> Field3<f64> {
        let mut out = Field3::new(self.grid(), 0.0);
        self.apply_into(s, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn random_flags(grid: Grid3, rng: &mut StdRng) -> FlagField {
        let mut flags = FlagField::all_fluid(grid);
        for _ in 0..3 {
            let min = (
                rng.gen_range(0..grid.width()),
                rng.gen_range(0..grid.height()),
                rng.gen_range(0..grid.depth()),
            );
            let max = (
                min.0 + rng.gen_range(1..4),
                min.1 + rng.gen_range(1..4),
                min.2 + rng.gen_range(1..4),
            );
            flags.fill_solid_box(min, max);
        }
        flags
    }

    fn random_field(grid: Grid3, rng: &mut StdRng) -> Field3<f64> {
        let data = (0..grid.size()).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Field3::from_data(grid, data)
    }

    #[test]
    fn interior_fluid_cell_has_six_neighbors() {
        let grid = Grid3::cube(3);
        let stencil = PoissonStencil::build(&FlagField::all_fluid(grid));
        assert_close(stencil.adiag.get(1, 1, 1), 6.0, 0.0);
        assert_close(stencil.adiag.get(0, 0, 0), 3.0, 0.0);
        assert_close(stencil.adiag.get(1, 0, 0), 4.0, 0.0);
        assert_close(stencil.plus_i.get(1, 1, 1), -1.0, 0.0);
        assert_close(stencil.plus_i.get(2, 1, 1), 0.0, 0.0);
    }

    #[test]
    fn constant_field_is_in_the_null_space() {
        let grid = Grid3::new(5, 4, 3);
        let mut flags = FlagField::all_fluid(grid);
        flags.fill_solid_box((1, 1, 1), (3, 2, 2));
        let stencil = PoissonStencil::build(&flags);
        let ones = Field3::from_fn(grid, |x, y, z| {
            if flags.get(x, y, z) != 0 {
                1.0
            } else {
                0.0
            }
        });
        assert_close(stencil.apply(&ones).max_abs(), 0.0, 0.0);
    }

    #[test]
    fn solid_cells_are_decoupled() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..8 {
            let grid = Grid3::new(7, 6, 5);
            let flags = random_flags(grid, &mut rng);
            let stencil = PoissonStencil::build(&flags);
            for z in 0..grid.depth() {
                for y in 0..grid.height() {
                    for x in 0..grid.width() {
                        let (xi, yi, zi) = (x as i32, y as i32, z as i32);
                        if flags.is_fluid(xi, yi, zi) {
                            continue;
                        }
                        assert_eq!(stencil.adiag.get(x, y, z), 0.0);
                        for axis in Axis::ALL {
                            let (ox, oy, oz) = axis.offset();
                            let plus = stencil.plus(axis);
                            assert_eq!(plus.get(x, y, z), 0.0);
                            assert_eq!(plus.value(xi - ox, yi - oy, zi - oz), 0.0);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn operator_is_self_adjoint() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..6 {
            let grid = Grid3::new(6, 7, 5);
            let flags = random_flags(grid, &mut rng);
            let stencil = PoissonStencil::build(&flags);
            let u = random_field(grid, &mut rng);
            let v = random_field(grid, &mut rng);
            let au_v = stencil.apply(&u).dot(&v);
            let u_av = u.dot(&stencil.apply(&v));
            assert_close(au_v, u_av, 1e-9);
        }
    }

    #[test]
    fn apply_and_dot_matches_separate_product() {
        let mut rng = StdRng::seed_from_u64(14);
        let grid = Grid3::new(5, 6, 4);
        let flags = random_flags(grid, &mut rng);
        let stencil = PoissonStencil::build(&flags);
        let s = random_field(grid, &mut rng);
        let mut out = Field3::new(grid, 0.0);
        let dot = stencil.apply_into_and_dot(&s, &mut out);
        let product = stencil.apply(&s);
        assert_eq!(out, product);
        assert_close(dot, product.dot(&s), 1e-12);
    }

    #[test]
    fn operator_is_positive_on_fluid() {
        let mut rng = StdRng::seed_from_u64(9);
        let grid = Grid3::cube(6);
        let flags = random_flags(grid, &mut rng);
        let stencil = PoissonStencil::build(&flags);
        let u = random_field(grid, &mut rng);
        let mut au = Field3::new(grid, 0.0);
        let energy = stencil.apply_into_and_dot(&u, &mut au);
        assert!(energy > 0.0, "expected positive energy, got {energy}");
    }
}
