//! Combined per-category geometry arrays.

use crate::buffer::ingest::{self, Prepared};
use crate::error::Result;
use crate::resource::{BufferId, BufferKind, GpuBackend, GpuVec};
use std::fmt;

/// A category of geometry with its own combined arrays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BucketKind {
    Points,
    Lines,
    FrontFaces,
    BackFaces,
}

impl BucketKind {
    /// Every bucket kind, in storage order.
    pub const ALL: [BucketKind; 4] = [
        BucketKind::Points,
        BucketKind::Lines,
        BucketKind::FrontFaces,
        BucketKind::BackFaces,
    ];

    /// The two face kinds, in draw order.
    pub const FACES: [BucketKind; 2] = [BucketKind::FrontFaces, BucketKind::BackFaces];

    #[inline]
    pub fn is_face(self) -> bool {
        matches!(self, BucketKind::FrontFaces | BucketKind::BackFaces)
    }

    /// Number of element indices per primitive.
    #[inline]
    pub fn arity(self) -> usize {
        match self {
            BucketKind::Points => 1,
            BucketKind::Lines => 2,
            BucketKind::FrontFaces | BucketKind::BackFaces => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BucketKind::Points => "points",
            BucketKind::Lines => "lines",
            BucketKind::FrontFaces => "frontfaces",
            BucketKind::BackFaces => "backfaces",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// GPU handles of one uploaded bucket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BucketHandles {
    pub positions: BufferId,
    pub colors: BufferId,
    pub object_indices: BufferId,
    /// Points and lines: every element. Faces: the opaque triangles.
    pub elements: BufferId,
    /// Faces only: the transparent triangles.
    pub transparent: Option<BufferId>,
}

/// The concatenated data of every object contributing to one [`BucketKind`].
///
/// Element indices are stored already offset into the combined vertex arrays.
/// For faces, `elements` keeps every triangle in ingestion order while the
/// opaque and transparent lists partition them for drawing.
pub struct GeometryBucket {
    kind: BucketKind,
    pub(crate) positions: GpuVec<[f32; 3]>,
    pub(crate) colors: GpuVec<[f32; 4]>,
    pub(crate) object_indices: GpuVec<f32>,
    pub(crate) elements: Vec<u32>,
    /// Faces only: one flag per triangle of `elements`.
    triangle_transparent: Vec<bool>,
    pub(crate) primary: GpuVec<u32>,
    pub(crate) transparent: GpuVec<u32>,
}

impl GeometryBucket {
    pub(crate) fn new(kind: BucketKind) -> Self {
        let (positions, colors, object_indices, primary, transparent) = match kind {
            BucketKind::Points => (
                "points positions",
                "points colors",
                "points object indices",
                "points elements",
                "points transparent elements",
            ),
            BucketKind::Lines => (
                "lines positions",
                "lines colors",
                "lines object indices",
                "lines elements",
                "lines transparent elements",
            ),
            BucketKind::FrontFaces => (
                "frontfaces positions",
                "frontfaces colors",
                "frontfaces object indices",
                "frontfaces opaque elements",
                "frontfaces transparent elements",
            ),
            BucketKind::BackFaces => (
                "backfaces positions",
                "backfaces colors",
                "backfaces object indices",
                "backfaces opaque elements",
                "backfaces transparent elements",
            ),
        };

        GeometryBucket {
            kind,
            positions: GpuVec::new(BufferKind::Vertex, positions),
            colors: GpuVec::new(BufferKind::Vertex, colors),
            object_indices: GpuVec::new(BufferKind::Vertex, object_indices),
            elements: Vec::new(),
            triangle_transparent: Vec::new(),
            primary: GpuVec::new(BufferKind::Index, primary),
            transparent: GpuVec::new(BufferKind::Index, transparent),
        }
    }

    #[inline]
    pub fn kind(&self) -> BucketKind {
        self.kind
    }

    /// Number of vertices from all objects.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[[f32; 3]] {
        self.positions.data()
    }

    #[inline]
    pub fn colors(&self) -> &[[f32; 4]] {
        self.colors.data()
    }

    /// Owning object slot of every vertex.
    #[inline]
    pub fn object_indices(&self) -> &[f32] {
        self.object_indices.data()
    }

    /// Every stored element, in ingestion order.
    #[inline]
    pub fn elements(&self) -> &[u32] {
        &self.elements
    }

    /// Elements drawn in the opaque pass. Every element for points and lines.
    #[inline]
    pub fn opaque_elements(&self) -> &[u32] {
        self.primary.data()
    }

    /// Face elements drawn in the transparent pass. Always empty for points and lines.
    #[inline]
    pub fn transparent_elements(&self) -> &[u32] {
        self.transparent.data()
    }

    /// GPU handles, if this bucket was uploaded.
    pub fn handles(&self) -> Option<BucketHandles> {
        Some(BucketHandles {
            positions: self.positions.buffer()?,
            colors: self.colors.buffer()?,
            object_indices: self.object_indices.buffer()?,
            elements: self.primary.buffer()?,
            transparent: self.transparent.buffer(),
        })
    }

    /// Vertex range owned by `slot`: the first matching vertex and the number of
    /// consecutive vertices sharing it.
    pub(crate) fn vertex_range(&self, slot: usize) -> Option<(usize, usize)> {
        let slot = slot as f32;
        let indices = self.object_indices.data();
        let start = indices.iter().position(|&i| i == slot)?;
        let count = indices[start..].iter().take_while(|&&i| i == slot).count();
        Some((start, count))
    }

    /// Appends one object's data, offsetting its elements past the stored vertices.
    pub(crate) fn append(&mut self, slot: usize, data: Prepared) {
        debug_assert_eq!(data.kind, self.kind);

        let offset = self.vertex_count() as u32;
        let vertex_count = data.positions.len();

        self.positions.extend_from_slice(&data.positions);
        self.colors.extend_from_slice(&data.colors);
        self.object_indices
            .extend(std::iter::repeat_n(slot as f32, vertex_count));

        let elements = data.elements.iter().map(|&i| i + offset);
        if self.kind.is_face() {
            let elements: Vec<u32> = elements.collect();
            for (triangle, &transparent) in elements.chunks_exact(3).zip(&data.transparent) {
                if transparent {
                    self.transparent.extend_from_slice(triangle);
                } else {
                    self.primary.extend_from_slice(triangle);
                }
            }
            self.elements.extend_from_slice(&elements);
            self.triangle_transparent.extend_from_slice(&data.transparent);
        } else {
            let start = self.elements.len();
            self.elements.extend(elements);
            self.primary.extend_from_slice(&self.elements[start..]);
        }
    }

    /// Whether recoloring the faces of `slot` with `colors`, or changing its
    /// opacity, would move any of its triangles between the opaque and
    /// transparent lists.
    ///
    /// `colors` are the object's own vertex colors. `None` keeps the stored ones.
    pub(crate) fn partition_changes(
        &self,
        slot: usize,
        colors: Option<&[[f32; 4]]>,
        opacity: f32,
    ) -> bool {
        let Some((start, count)) = self.vertex_range(slot) else {
            return false;
        };
        let colors = colors.unwrap_or(&self.colors.data()[start..start + count]);

        self.elements
            .chunks_exact(3)
            .zip(&self.triangle_transparent)
            .filter(|(t, _)| (start..start + count).contains(&(t[0] as usize)))
            .any(|(t, &was)| {
                let local = [t[0] - start as u32];
                ingest::is_transparent(colors, &local, opacity) != was
            })
    }

    /// Uploads the bucket. Empty buckets get no GPU resources.
    pub(crate) fn upload<B: GpuBackend>(&mut self, backend: &mut B) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let _ = self.positions.load_to_gpu(backend)?;
        let _ = self.colors.load_to_gpu(backend)?;
        let _ = self.object_indices.load_to_gpu(backend)?;
        let _ = self.primary.load_to_gpu(backend)?;
        if self.kind.is_face() {
            let _ = self.transparent.load_to_gpu(backend)?;
        }
        Ok(())
    }

    /// Releases the GPU resources and empties every array.
    pub(crate) fn clear<B: GpuBackend>(&mut self, backend: &mut B) {
        self.positions.clear(backend);
        self.colors.clear(backend);
        self.object_indices.clear(backend);
        self.primary.clear(backend);
        self.transparent.clear(backend);
        self.elements.clear();
        self.triangle_transparent.clear();
    }
}
