use super::{aabb_center, BufferData, GeometrySource};
use crate::buffer::BucketKind;
use crate::color::{self, Color};
use crate::scene::BucketSet;
use glamx::Vec3;

/// A chain of line segments through a list of points.
///
/// The polyline contributes its vertices to the points bucket and its segments
/// to the lines bucket. Each segment gets its own pair of vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    points: Vec<Vec3>,
    closed: bool,
    points_color: Color,
    lines_color: Color,
}

impl Polyline {
    /// Creates an open black polyline.
    pub fn new(points: Vec<Vec3>) -> Self {
        Polyline {
            points,
            closed: false,
            points_color: color::BLACK,
            lines_color: color::BLACK,
        }
    }

    /// Joins the last point back to the first.
    pub fn with_closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Sets the color of the vertices.
    pub fn with_points_color(mut self, color: Color) -> Self {
        self.points_color = color;
        self
    }

    /// Sets the color of the segments.
    pub fn with_lines_color(mut self, color: Color) -> Self {
        self.lines_color = color;
        self
    }

    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut Vec<Vec3> {
        &mut self.points
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The segments as pairs of points.
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        let closing = if self.closed && self.points.len() > 2 {
            self.points.last().copied().zip(self.points.first().copied())
        } else {
            None
        };

        self.points
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }
}

impl GeometrySource for Polyline {
    fn buckets(&self) -> BucketSet {
        BucketSet::POINTS | BucketSet::LINES
    }

    fn read(&self, kind: BucketKind) -> Option<BufferData> {
        match kind {
            BucketKind::Points if !self.points.is_empty() => Some(BufferData::new(
                self.points.clone(),
                vec![self.points_color; self.points.len()],
                (0..self.points.len() as u32).collect(),
            )),
            BucketKind::Lines if self.points.len() > 1 => {
                let mut data = BufferData::default();
                for (a, b) in self.segments() {
                    let i = data.positions.len() as u32;
                    data.positions.extend_from_slice(&[a, b]);
                    data.elements.extend_from_slice(&[i, i + 1]);
                }
                data.colors = vec![self.lines_color; data.positions.len()];
                Some(data)
            }
            _ => None,
        }
    }

    fn bounding_box_center(&self) -> Vec3 {
        aabb_center(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_polyline_adds_closing_segment() {
        let square = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];

        let open = Polyline::new(square.clone());
        let closed = Polyline::new(square).with_closed(true);

        let open_lines = open.read(BucketKind::Lines).unwrap();
        let closed_lines = closed.read(BucketKind::Lines).unwrap();
        assert_eq!(open_lines.elements.len(), 6);
        assert_eq!(closed_lines.elements.len(), 8);
        assert_eq!(closed_lines.positions[7], Vec3::ZERO);
        assert_eq!(closed_lines.colors.len(), closed_lines.positions.len());
    }

    #[test]
    fn single_point_has_no_lines() {
        let p = Polyline::new(vec![Vec3::X]);
        assert!(p.read(BucketKind::Lines).is_none());
        assert_eq!(p.read(BucketKind::Points).unwrap().elements, vec![0]);
    }
}
