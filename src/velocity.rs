use crate::{field::Field3, grid::Axis, grid::Grid3, vec3::Vec3};

/// Velocity sampled on a cell grid.
///
/// The axis-`a` component stored at cell `c` is the flux through the positive
/// `a` face of `c`. Reads use the background-value policy of [`Field3`].
pub trait VelocityField: Sync {
    fn grid(&self) -> Grid3;

    fn component(&self, axis: Axis, x: i32, y: i32, z: i32) -> f64;

    fn update_axis<F>(&mut self, axis: Axis, f: F)
    where
        F: Fn(usize, usize, usize, f64) -> f64 + Sync;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SplitVelocity3 {
    u: Field3<f64>,
    v: Field3<f64>,
    w: Field3<f64>,
}

impl SplitVelocity3 {
    pub fn new(grid: Grid3, fill: Vec3) -> Self {
        Self {
            u: Field3::new(grid, fill.x),
            v: Field3::new(grid, fill.y),
            w: Field3::new(grid, fill.z),
        }
    }

    pub fn from_fn(grid: Grid3, f: impl Fn(usize, usize, usize) -> Vec3 + Sync) -> Self {
        let u = Field3::from_fn(grid, |x, y, z| f(x, y, z).x);
        let v = Field3::from_fn(grid, |x, y, z| f(x, y, z).y);
        let w = Field3::from_fn(grid, |x, y, z| f(x, y, z).z);
        Self { u, v, w }
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Vec3 {
        Vec3::new(self.u.get(x, y, z), self.v.get(x, y, z), self.w.get(x, y, z))
    }

    pub fn axis(&self, axis: Axis) -> &Field3<f64> {
        match axis {
            Axis::X => &self.u,
            Axis::Y => &self.v,
            Axis::Z => &self.w,
        }
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut Field3<f64> {
        match axis {
            Axis::X => &mut self.u,
            Axis::Y => &mut self.v,
            Axis::Z => &mut self.w,
        }
    }
}

impl VelocityField for SplitVelocity3 {
    fn grid(&self) -> Grid3 {
        self.u.grid()
    }

    fn component(&self, axis: Axis, x: i32, y: i32, z: i32) -> f64 {
        self.axis(axis).value(x, y, z)
    }

    fn update_axis<F>(&mut self, axis: Axis, f: F)
    where
        F: Fn(usize, usize, usize, f64) -> f64 + Sync,
    {
        self.axis_mut(axis).update_with_index(f);
    }
}

impl VelocityField for Field3<Vec3> {
    fn grid(&self) -> Grid3 {
        Field3::grid(self)
    }

    fn component(&self, axis: Axis, x: i32, y: i32, z: i32) -> f64 {
        self.value(x, y, z).component(axis)
    }

    fn update_axis<F>(&mut self, axis: Axis, f: F)
    where
        F: Fn(usize, usize, usize, f64) -> f64 + Sync,
    {
        self.update_with_index(|x, y, z, value| {
            value.with_component(axis, f(x, y, z, value.component(axis)))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_from_fn_samples_components() {
        let grid = Grid3::new(3, 2, 2);
        let velocity = SplitVelocity3::from_fn(grid, |x, y, z| {
            Vec3::new(x as f64, y as f64, z as f64)
        });
        assert_eq!(velocity.get(2, 1, 1), Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(velocity.component(Axis::X, 3, 0, 0), 0.0);
    }

    #[test]
    fn layouts_agree_on_components() {
        let grid = Grid3::cube(3);
        let sample = |x: usize, y: usize, z: usize| {
            Vec3::new(x as f64 + 0.5, -(y as f64), z as f64 * 2.0)
        };
        let split = SplitVelocity3::from_fn(grid, sample);
        let packed = Field3::from_fn(grid, sample);
        for axis in Axis::ALL {
            for (x, y, z) in [(0, 0, 0), (2, 1, 0), (-1, 0, 0), (1, 1, 3)] {
                assert_eq!(
                    split.component(axis, x, y, z),
                    packed.component(axis, x, y, z)
                );
            }
        }
    }

    #[test]
    fn update_axis_touches_one_component() {
        let grid = Grid3::cube(2);
        let mut packed = Field3::new(grid, Vec3::new(1.0, 1.0, 1.0));
        packed.update_axis(Axis::Y, |x, _y, _z, value| value + x as f64);
        assert_eq!(packed.get(1, 0, 0), Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(packed.get(0, 0, 0), Vec3::new(1.0, 1.0, 1.0));
    }
}
