use crate::{field::Field3, grid::Axis, grid::Grid3};

pub const SOLID: u8 = 0;
pub const FLUID: u8 = 1;

/// Per-cell classification: 0 is solid, anything else is fluid.
///
/// The background value is always [`SOLID`], so the outside of the domain
/// reads as an obstacle.
pub type FlagField = Field3<u8>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellType {
    Solid,
    Fluid,
}

impl CellType {
    pub fn from_flag(flag: u8) -> Self {
        if flag == SOLID {
            CellType::Solid
        } else {
            CellType::Fluid
        }
    }
}

impl Field3<u8> {
    pub fn all_fluid(grid: Grid3) -> Self {
        Self::with_background(grid, FLUID, SOLID)
    }

    pub fn cell_type(&self, x: i32, y: i32, z: i32) -> CellType {
        CellType::from_flag(self.value(x, y, z))
    }

    pub fn is_fluid(&self, x: i32, y: i32, z: i32) -> bool {
        self.value(x, y, z) != SOLID
    }

    /// A face is open when the cells on both sides of it are fluid.
    pub fn is_face_open(&self, x: i32, y: i32, z: i32, axis: Axis) -> bool {
        let (ox, oy, oz) = axis.offset();
        self.is_fluid(x, y, z) && self.is_fluid(x + ox, y + oy, z + oz)
    }

    pub fn fluid_count(&self) -> usize {
        self.as_slice().iter().filter(|flag| **flag != SOLID).count()
    }

    /// Marks the half-open box `[min, max)` solid, clipped to the domain.
    pub fn fill_solid_box(&mut self, min: (usize, usize, usize), max: (usize, usize, usize)) {
        self.fill_box(min, max, SOLID);
    }

    pub fn fill_box(&mut self, min: (usize, usize, usize), max: (usize, usize, usize), flag: u8) {
        let grid = self.grid();
        let max = (
            max.0.min(grid.width()),
            max.1.min(grid.height()),
            max.2.min(grid.depth()),
        );
        for z in min.2..max.2 {
            for y in min.1..max.1 {
                for x in min.0..max.0 {
                    self.set(x as i32, y as i32, z as i32, flag);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_domain_is_solid() {
        let flags = FlagField::all_fluid(Grid3::cube(3));
        assert_eq!(flags.cell_type(-1, 1, 1), CellType::Solid);
        assert_eq!(flags.cell_type(1, 1, 3), CellType::Solid);
        assert_eq!(flags.cell_type(1, 1, 1), CellType::Fluid);
    }

    #[test]
    fn nonzero_flags_count_as_fluid() {
        let mut flags = FlagField::new(Grid3::cube(2), SOLID);
        flags.set(0, 0, 0, 7);
        assert!(flags.is_fluid(0, 0, 0));
        assert_eq!(flags.fluid_count(), 1);
    }

    #[test]
    fn solid_box_closes_adjacent_faces() {
        let mut flags = FlagField::all_fluid(Grid3::cube(4));
        flags.fill_solid_box((1, 1, 1), (3, 3, 3));
        assert_eq!(flags.fluid_count(), 64 - 8);
        assert!(!flags.is_face_open(0, 1, 1, Axis::X));
        assert!(flags.is_face_open(0, 0, 0, Axis::X));
        assert!(!flags.is_face_open(3, 0, 0, Axis::X));
    }

    #[test]
    fn fill_box_clips_to_domain() {
        let mut flags = FlagField::all_fluid(Grid3::cube(2));
        flags.fill_solid_box((1, 0, 0), (9, 9, 9));
        assert_eq!(flags.fluid_count(), 4);
    }
}
