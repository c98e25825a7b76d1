use super::{BufferData, GeometrySource};
use crate::buffer::BucketKind;
use crate::color::{self, Color};
use crate::scene::BucketSet;
use glamx::Vec3;

/// Error returned when building a [`Grid`] with an odd number of cells.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("grid cell counts must be even, got nx = {nx} and ny = {ny}")]
pub struct OddCellCount {
    pub nx: u32,
    pub ny: u32,
}

/// The ground grid, centered on the world origin in the XY plane.
///
/// The half axes from the origin are highlighted: +X in red, +Y in green and,
/// optionally, +Z in blue.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    dx: f32,
    nx: u32,
    dy: f32,
    ny: u32,
    show_z: bool,
    color: Color,
}

impl Grid {
    /// Creates a `dx` by `dy` grid split into `nx` by `ny` cells.
    ///
    /// The cell counts must be even so that grid lines pass through the origin.
    pub fn new(dx: f32, nx: u32, dy: f32, ny: u32) -> Result<Self, OddCellCount> {
        if nx % 2 == 1 || ny % 2 == 1 {
            return Err(OddCellCount { nx, ny });
        }

        Ok(Grid {
            dx,
            nx,
            dy,
            ny,
            show_z: true,
            color: color::GRAY,
        })
    }

    /// Shows or hides the +Z axis.
    pub fn with_z_axis(mut self, show: bool) -> Self {
        self.show_z = show;
        self
    }

    /// Sets the color of the non-axis lines.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    fn x(&self, i: u32) -> f32 {
        -self.dx * 0.5 + self.dx * i as f32 / self.nx.max(1) as f32
    }

    fn y(&self, j: u32) -> f32 {
        -self.dy * 0.5 + self.dy * j as f32 / self.ny.max(1) as f32
    }
}

impl GeometrySource for Grid {
    fn buckets(&self) -> BucketSet {
        BucketSet::LINES
    }

    fn read(&self, kind: BucketKind) -> Option<BufferData> {
        if kind != BucketKind::Lines {
            return None;
        }

        let mut data = BufferData::default();
        let mut segment = |a: Vec3, b: Vec3, color: Color| {
            let i = data.positions.len() as u32;
            data.positions.extend_from_slice(&[a, b]);
            data.colors.extend_from_slice(&[color, color]);
            data.elements.extend_from_slice(&[i, i + 1]);
        };

        let (cx, cy) = (self.nx / 2, self.ny / 2);

        // Lines parallel to X, one segment per cell so the axis half can be colored.
        for j in 0..=self.ny {
            for i in 0..self.nx {
                let color = if j == cy && i >= cx {
                    color::RED
                } else {
                    self.color
                };
                segment(
                    Vec3::new(self.x(i), self.y(j), 0.0),
                    Vec3::new(self.x(i + 1), self.y(j), 0.0),
                    color,
                );
            }
        }

        for i in 0..=self.nx {
            for j in 0..self.ny {
                let color = if i == cx && j >= cy {
                    color::LIME
                } else {
                    self.color
                };
                segment(
                    Vec3::new(self.x(i), self.y(j), 0.0),
                    Vec3::new(self.x(i), self.y(j + 1), 0.0),
                    color,
                );
            }
        }

        if self.show_z {
            segment(
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, (self.dx + self.dy) / 4.0),
                color::BLUE,
            );
        }

        Some(data)
    }

    fn bounding_box_center(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn is_grid(&self) -> bool {
        true
    }
}
