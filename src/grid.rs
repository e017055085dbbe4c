use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Axis::X => (1, 0, 0),
            Axis::Y => (0, 1, 0),
            Axis::Z => (0, 0, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid3 {
    width: usize,
    height: usize,
    depth: usize,
}

impl Grid3 {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        assert!(width > 0, "width must be > 0");
        assert!(height > 0, "height must be > 0");
        assert!(depth > 0, "depth must be > 0");
        assert!(
            width <= i32::MAX as usize && height <= i32::MAX as usize && depth <= i32::MAX as usize,
            "grid axis exceeds signed coordinate range"
        );
        assert!(
            width
                .checked_mul(height)
                .and_then(|area| area.checked_mul(depth))
                .is_some(),
            "grid cell count overflows usize"
        );
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn cube(n: usize) -> Self {
        Self::new(n, n, n)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn resolution(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.depth)
    }

    pub fn size(&self) -> usize {
        self.width * self.height * self.depth
    }

    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        (z * self.height + y) * self.width + x
    }

    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        debug_assert!(idx < self.size());
        let x = idx % self.width;
        let y = (idx / self.width) % self.height;
        let z = idx / (self.width * self.height);
        (x, y, z)
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && (z as usize) < self.depth
    }

    pub fn checked_idx(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if self.contains(x, y, z) {
            Some(self.idx(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    /// Number of anti-diagonal planes `x + y + z = d` covering the grid.
    pub fn wavefront_count(&self) -> usize {
        self.width + self.height + self.depth - 2
    }

    /// Cells on the plane `x + y + z = d`, in ascending lexicographic order.
    pub fn wavefront(&self, d: usize) -> Vec<(usize, usize, usize)> {
        let mut cells = Vec::new();
        for z in 0..self.depth.min(d + 1) {
            for y in 0..self.height.min(d - z + 1) {
                let x = d - z - y;
                if x < self.width {
                    cells.push((x, y, z));
                }
            }
        }
        cells.sort_by_key(|&(x, y, z)| self.idx(x, y, z));
        cells
    }
}
