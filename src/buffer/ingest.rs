//! Validation and repair of producer output before it is appended to a bucket.

use crate::buffer::BucketKind;
use crate::color::{self, Color};
use crate::config::ElementPolicy;
use crate::error::{BufferError, Result};
use crate::geometry::BufferData;
use crate::scene::ObjectId;

/// One bucket of one object, ready to be appended.
#[derive(Debug, PartialEq)]
pub(crate) struct Prepared {
    pub kind: BucketKind,
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    /// Local element indices, complete primitives only.
    pub elements: Vec<u32>,
    /// Faces only: whether each triangle goes to the transparent pass.
    pub transparent: Vec<bool>,
}

/// Makes `colors` exactly `vertex_count` long.
///
/// Extra colors are dropped, missing ones repeat the last color (or black if
/// there is none). Both repairs are logged.
pub(crate) fn repair_colors(
    object: ObjectId,
    kind: BucketKind,
    colors: &[Color],
    vertex_count: usize,
) -> Vec<[f32; 4]> {
    if colors.len() > vertex_count {
        log::warn!(
            "{} ({}): {} colors for {} positions, the remaining colors are ignored",
            object,
            kind,
            colors.len(),
            vertex_count
        );
    } else if colors.len() < vertex_count {
        log::warn!(
            "{} ({}): {} colors for {} positions, the last color is repeated",
            object,
            kind,
            colors.len(),
            vertex_count
        );
    }

    let last = colors.last().copied().unwrap_or(color::BLACK);
    colors
        .iter()
        .copied()
        .chain(std::iter::repeat(last))
        .take(vertex_count)
        .map(|c| [c.r, c.g, c.b, c.a])
        .collect()
}

/// Whether a triangle is drawn in the transparent pass.
///
/// The first vertex of the triangle decides for the whole triangle.
#[inline]
pub(crate) fn is_transparent(colors: &[[f32; 4]], triangle: &[u32], opacity: f32) -> bool {
    opacity < 1.0 || colors[triangle[0] as usize][3] < 1.0
}

/// Validates and converts one bucket of producer output.
pub(crate) fn prepare(
    object: ObjectId,
    kind: BucketKind,
    data: BufferData,
    policy: ElementPolicy,
    opacity: f32,
) -> Result<Prepared> {
    let vertex_count = data.positions.len();
    let arity = kind.arity();

    let colors = repair_colors(object, kind, &data.colors, vertex_count);
    let positions = data.positions.iter().map(|p| p.to_array()).collect();

    let complete = data.elements.len() - data.elements.len() % arity;
    if complete != data.elements.len() {
        log::warn!(
            "{} ({}): {} trailing element indices do not form a primitive and are ignored",
            object,
            kind,
            data.elements.len() - complete
        );
    }

    let mut elements = Vec::with_capacity(complete);
    let mut dangling = 0;
    for primitive in data.elements[..complete].chunks_exact(arity) {
        if let Some(&index) = primitive.iter().find(|&&i| i as usize >= vertex_count) {
            match policy {
                ElementPolicy::Strict => {
                    log::error!(
                        "{} ({}): element index {} out of range for {} vertices",
                        object,
                        kind,
                        index,
                        vertex_count
                    );
                    return Err(BufferError::DanglingElement {
                        object,
                        kind,
                        index,
                        vertex_count,
                    });
                }
                ElementPolicy::Lenient => dangling += 1,
            }
        } else {
            elements.extend_from_slice(primitive);
        }
    }

    if dangling > 0 {
        log::warn!(
            "{} ({}): skipped {} primitives referencing vertices past {}",
            object,
            kind,
            dangling,
            vertex_count
        );
    }

    let transparent = if kind.is_face() {
        elements
            .chunks_exact(3)
            .map(|t| is_transparent(&colors, t, opacity))
            .collect()
    } else {
        Vec::new()
    };

    Ok(Prepared {
        kind,
        positions,
        colors,
        elements,
        transparent,
    })
}
