use super::{aabb_center, BufferData, GeometrySource};
use crate::buffer::BucketKind;
use crate::color::{self, Color};
use crate::scene::BucketSet;
use glamx::Vec3;
use std::collections::BTreeSet;

/// A triangle mesh.
///
/// Faces are drawn flat: every triangle gets its own three vertices in the
/// face buckets so it can carry its own color. The back faces reuse the same
/// vertices with reversed winding. Unique edges go to the lines bucket and the
/// vertices to the points bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct TriMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    face_colors: Vec<Color>,
    points_color: Color,
    lines_color: Color,
}

impl TriMesh {
    /// Creates a gray mesh with black edges and vertices.
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        TriMesh {
            vertices,
            faces,
            face_colors: vec![color::GRAY],
            points_color: color::BLACK,
            lines_color: color::BLACK,
        }
    }

    /// Creates a mesh from convex polygons, fan-triangulated from their first vertex.
    ///
    /// Polygons with less than three vertices are ignored.
    pub fn from_polygons(vertices: Vec<Vec3>, polygons: &[Vec<u32>]) -> Self {
        let faces = polygons
            .iter()
            .filter(|p| p.len() >= 3)
            .flat_map(|p| (1..p.len() - 1).map(move |i| [p[0], p[i], p[i + 1]]))
            .collect();
        Self::new(vertices, faces)
    }

    /// Creates a cuboid centered at the origin with the given full extents.
    pub fn cuboid(extents: Vec3) -> Self {
        let h = extents * 0.5;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(h.x, h.y, h.z),
        ];

        let faces = vec![
            [4, 5, 0],
            [5, 1, 0],
            [5, 6, 1],
            [6, 2, 1],
            [6, 7, 3],
            [2, 6, 3],
            [7, 4, 0],
            [3, 7, 0],
            [0, 1, 2],
            [3, 0, 2],
            [7, 6, 5],
            [4, 7, 5],
        ];

        Self::new(vertices, faces)
    }

    /// Paints every face with `color`. An alpha below one makes the mesh transparent.
    pub fn with_color(mut self, color: Color) -> Self {
        self.face_colors = vec![color];
        self
    }

    /// Sets one color per face. Missing colors repeat the last one.
    pub fn with_face_colors(mut self, colors: Vec<Color>) -> Self {
        self.face_colors = colors;
        self
    }

    pub fn with_points_color(mut self, color: Color) -> Self {
        self.points_color = color;
        self
    }

    pub fn with_lines_color(mut self, color: Color) -> Self {
        self.lines_color = color;
        self
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Mutable access to the vertices. Moving vertices keeps the topology.
    #[inline]
    pub fn vertices_mut(&mut self) -> &mut Vec<Vec3> {
        &mut self.vertices
    }

    #[inline]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// The unique undirected edges, each as `[min, max]`.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut edges = BTreeSet::new();
        for f in &self.faces {
            for (a, b) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
                let _ = edges.insert([a.min(b), a.max(b)]);
            }
        }
        edges.into_iter().collect()
    }

    fn face_color(&self, i: usize) -> Color {
        self.face_colors
            .get(i)
            .or(self.face_colors.last())
            .copied()
            .unwrap_or(color::GRAY)
    }

    fn read_faces(&self, reversed: bool) -> BufferData {
        let mut data = BufferData::default();
        for (i, face) in self.faces.iter().enumerate() {
            let base = data.positions.len() as u32;
            for &v in face {
                data.positions
                    .push(self.vertices.get(v as usize).copied().unwrap_or(Vec3::ZERO));
            }
            data.colors.extend_from_slice(&[self.face_color(i); 3]);

            if reversed {
                data.elements.extend_from_slice(&[base, base + 2, base + 1]);
            } else {
                data.elements.extend_from_slice(&[base, base + 1, base + 2]);
            }
        }
        data
    }
}

impl GeometrySource for TriMesh {
    fn buckets(&self) -> BucketSet {
        BucketSet::all()
    }

    fn read(&self, kind: BucketKind) -> Option<BufferData> {
        if self.vertices.is_empty() {
            return None;
        }

        match kind {
            BucketKind::Points => Some(BufferData::new(
                self.vertices.clone(),
                vec![self.points_color; self.vertices.len()],
                (0..self.vertices.len() as u32).collect(),
            )),
            BucketKind::Lines if !self.faces.is_empty() => Some(BufferData::new(
                self.vertices.clone(),
                vec![self.lines_color; self.vertices.len()],
                self.edges().into_iter().flatten().collect(),
            )),
            BucketKind::FrontFaces if !self.faces.is_empty() => Some(self.read_faces(false)),
            BucketKind::BackFaces if !self.faces.is_empty() => Some(self.read_faces(true)),
            _ => None,
        }
    }

    fn bounding_box_center(&self) -> Vec3 {
        aabb_center(&self.vertices)
    }
}
