//! Producers turning geometry into per-bucket vertex data.
//!
//! Each producer exposes up to four [`BufferData`] triples, one per
//! [`BucketKind`]. The buffer manager reads them at ingestion and again when an
//! object's data is refreshed.

pub use self::grid::Grid;
pub use self::mesh::TriMesh;
pub use self::pointcloud::PointCloud;
pub use self::polyline::Polyline;

mod grid;
mod mesh;
mod pointcloud;
mod polyline;

use crate::buffer::BucketKind;
use crate::color::Color;
use crate::scene::BucketSet;
use glamx::Vec3;

/// Positions, colors and element indices of one bucket of one object.
///
/// `elements` is flat: one index per point, two per line segment and three per
/// triangle. Indices refer to `positions` of the same triple.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BufferData {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub elements: Vec<u32>,
}

impl BufferData {
    /// Builds a triple from its parts.
    pub fn new(positions: Vec<Vec3>, colors: Vec<Color>, elements: Vec<u32>) -> Self {
        BufferData {
            positions,
            colors,
            elements,
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if there is nothing to draw.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Something the viewer can draw.
pub trait GeometrySource {
    /// The buckets [`read`](Self::read) may return data for.
    fn buckets(&self) -> BucketSet;

    /// Computes the vertex data of one bucket, or `None` if the geometry has none.
    fn read(&self, kind: BucketKind) -> Option<BufferData>;

    /// Center of the axis-aligned bounding box, in local coordinates.
    fn bounding_box_center(&self) -> Vec3;

    /// Whether this is the ground grid, drawn only while the grid is enabled.
    fn is_grid(&self) -> bool {
        false
    }
}

/// Center of the axis-aligned bounding box of `points`, or the origin if there are none.
pub(crate) fn aabb_center(points: &[Vec3]) -> Vec3 {
    let Some(first) = points.first() else {
        return Vec3::ZERO;
    };

    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
    (min + max) * 0.5
}
