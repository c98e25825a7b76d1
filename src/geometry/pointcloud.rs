use super::{aabb_center, BufferData, GeometrySource};
use crate::buffer::BucketKind;
use crate::color::{self, Color};
use crate::scene::BucketSet;
use glamx::Vec3;

/// A set of points drawn with a single color or one color per point.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    points: Vec<Vec3>,
    colors: Vec<Color>,
}

impl PointCloud {
    /// Creates a black point cloud.
    pub fn new(points: Vec<Vec3>) -> Self {
        PointCloud {
            points,
            colors: vec![color::BLACK],
        }
    }

    /// Paints every point with `color`.
    pub fn with_color(mut self, color: Color) -> Self {
        self.colors = vec![color];
        self
    }

    /// Sets per-point colors.
    ///
    /// A shorter list repeats its last color, a longer one is truncated when
    /// the points are ingested.
    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = colors;
        self
    }

    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Mutable access to the points. The topology is kept if the count does not change.
    #[inline]
    pub fn points_mut(&mut self) -> &mut Vec<Vec3> {
        &mut self.points
    }
}

impl GeometrySource for PointCloud {
    fn buckets(&self) -> BucketSet {
        BucketSet::POINTS
    }

    fn read(&self, kind: BucketKind) -> Option<BufferData> {
        if kind != BucketKind::Points || self.points.is_empty() {
            return None;
        }

        let n = self.points.len();
        let colors = match self.colors[..] {
            [single] => vec![single; n],
            _ => self.colors.clone(),
        };
        Some(BufferData::new(
            self.points.clone(),
            colors,
            (0..n as u32).collect(),
        ))
    }

    fn bounding_box_center(&self) -> Vec3 {
        aabb_center(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_color_paints_every_point() {
        let cloud = PointCloud::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]).with_color(color::RED);
        let data = cloud.read(BucketKind::Points).unwrap();
        assert_eq!(data.colors, vec![color::RED; 3]);
        assert_eq!(data.elements, vec![0, 1, 2]);
        assert!(cloud.read(BucketKind::Lines).is_none());
    }
}
