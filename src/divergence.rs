use crate::{
    field::Field3,
    flags::FlagField,
    grid::{Axis, Grid3},
    velocity::VelocityField,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Divergence {
    pub field: Field3<f64>,
    pub max_abs: f64,
}

fn is_fluid(grid: Grid3, flags: Option<&FlagField>, x: i32, y: i32, z: i32) -> bool {
    match flags {
        Some(flags) => flags.is_fluid(x, y, z),
        None => grid.contains(x, y, z),
    }
}

/// Flux through the positive `axis` face of cell `(x, y, z)`, zero unless
/// both adjacent cells are fluid.
pub(crate) fn face_flux<V: VelocityField>(
    velocity: &V,
    flags: Option<&FlagField>,
    axis: Axis,
    x: i32,
    y: i32,
    z: i32,
) -> f64 {
    let grid = velocity.grid();
    let (ox, oy, oz) = axis.offset();
    if is_fluid(grid, flags, x, y, z) && is_fluid(grid, flags, x + ox, y + oy, z + oz) {
        velocity.component(axis, x, y, z)
    } else {
        0.0
    }
}

fn cell_divergence<V: VelocityField>(
    velocity: &V,
    flags: Option<&FlagField>,
    x: usize,
    y: usize,
    z: usize,
) -> f64 {
    let (x, y, z) = (x as i32, y as i32, z as i32);
    if !is_fluid(velocity.grid(), flags, x, y, z) {
        return 0.0;
    }
    Axis::ALL
        .iter()
        .map(|&axis| {
            let (ox, oy, oz) = axis.offset();
            face_flux(velocity, flags, axis, x, y, z)
                - face_flux(velocity, flags, axis, x - ox, y - oy, z - oz)
        })
        .sum()
}

pub fn divergence<V: VelocityField>(velocity: &V, flags: Option<&FlagField>) -> Divergence {
    let mut field = Field3::new(velocity.grid(), 0.0);
    let max_abs = divergence_into(&mut field, velocity, flags);
    Divergence { field, max_abs }
}

pub fn divergence_into<V: VelocityField>(
    out: &mut Field3<f64>,
    velocity: &V,
    flags: Option<&FlagField>,
) -> f64 {
    assert_eq!(out.grid(), velocity.grid(), "field grid mismatch");
    if let Some(flags) = flags {
        assert_eq!(flags.grid(), velocity.grid(), "field grid mismatch");
    }
    out.fill_with_index(|x, y, z| cell_divergence(velocity, flags, x, y, z));
    out.max_abs()
}

pub fn max_divergence<V: VelocityField>(velocity: &V, flags: &FlagField) -> f64 {
    divergence(velocity, Some(flags)).max_abs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{velocity::SplitVelocity3, vec3::Vec3};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    #[test]
    fn zero_velocity_has_zero_divergence() {
        let grid = Grid3::cube(4);
        let velocity = SplitVelocity3::new(grid, Vec3::zero());
        let flags = FlagField::all_fluid(grid);
        let div = divergence(&velocity, Some(&flags));
        assert_close(div.max_abs, 0.0, 0.0);
    }

    #[test]
    fn uniform_flow_diverges_only_at_walls() {
        let grid = Grid3::cube(4);
        let velocity = SplitVelocity3::new(grid, Vec3::new(1.0, 0.0, 0.0));
        let div = divergence(&velocity, None);
        assert_close(div.field.get(0, 1, 2), 1.0, 0.0);
        assert_close(div.field.get(1, 1, 2), 0.0, 0.0);
        assert_close(div.field.get(2, 3, 0), 0.0, 0.0);
        assert_close(div.field.get(3, 1, 2), -1.0, 0.0);
        assert_close(div.max_abs, 1.0, 0.0);
    }

    #[test]
    fn missing_flags_match_all_fluid_flags() {
        let grid = Grid3::new(3, 4, 2);
        let velocity = SplitVelocity3::from_fn(grid, |x, y, z| {
            Vec3::new((x * y) as f64, z as f64 - 0.5, (x + y + z) as f64 * 0.25)
        });
        let flags = FlagField::all_fluid(grid);
        assert_eq!(divergence(&velocity, None), divergence(&velocity, Some(&flags)));
    }

    #[test]
    fn solid_cells_report_zero_and_block_flux() {
        let grid = Grid3::new(3, 1, 1);
        let velocity = SplitVelocity3::new(grid, Vec3::new(2.0, 0.0, 0.0));
        let mut flags = FlagField::all_fluid(grid);
        flags.set(1, 0, 0, 0);
        let div = divergence(&velocity, Some(&flags));
        assert_close(div.field.get(0, 0, 0), 0.0, 0.0);
        assert_close(div.field.get(1, 0, 0), 0.0, 0.0);
        assert_close(div.field.get(2, 0, 0), 0.0, 0.0);
    }

    #[test]
    fn single_face_flux_is_balanced() {
        let grid = Grid3::new(2, 1, 1);
        let mut velocity = SplitVelocity3::new(grid, Vec3::zero());
        velocity.axis_mut(Axis::X).set(0, 0, 0, 0.75);
        let div = divergence(&velocity, None);
        assert_close(div.field.get(0, 0, 0), 0.75, 0.0);
        assert_close(div.field.get(1, 0, 0), -0.75, 0.0);
        assert_close(div.field.sum(), 0.0, 0.0);
    }
}
