//! The per-object records read by the shaders.

use crate::color::Color;
use crate::scene::ObjectStyle;
use bytemuck::{Pod, Zeroable};
use glamx::Mat4;

/// Size in bytes of one transform table entry.
pub const TRANSFORM_STRIDE: u64 = 16 * 4;
/// Size in bytes of one settings table entry.
pub const SETTINGS_STRIDE: u64 = 12 * 4;

/// Flattens a transform, column after column.
#[inline]
pub fn transform_record(transformation: Option<Mat4>) -> [f32; 16] {
    transformation.unwrap_or(Mat4::IDENTITY).to_cols_array()
}

/// Display settings of one object as three rows of four floats.
///
/// Layout must match the `settings` table in `model.wgsl`:
///
/// | row | x              | y           | z           | w            |
/// |-----|----------------|-------------|-------------|--------------|
/// | 0   | show           | show_points | show_lines  | show_faces   |
/// | 1   | instance r     | instance g  | instance b  | is_selected  |
/// | 2   | parent slot/-1 | opacity     | pointsize   | linewidth    |
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectSettings {
    pub visibility: [f32; 4],
    pub instance: [f32; 4],
    pub style: [f32; 4],
}

impl ObjectSettings {
    /// Uploaded when the scene is empty so that the table is never unbound.
    pub const PLACEHOLDER: ObjectSettings = ObjectSettings {
        visibility: [0.0; 4],
        instance: [0.0; 4],
        style: [-1.0, 1.0, 1.0, 1.0],
    };

    /// Builds the record of an object.
    ///
    /// Objects without an instance color get black.
    pub fn new(style: &ObjectStyle, instance_color: Option<Color>, parent_slot: Option<usize>) -> Self {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let rgb = instance_color.map_or([0.0; 3], |c| [c.r, c.g, c.b]);

        ObjectSettings {
            visibility: [
                flag(style.show),
                flag(style.show_points),
                flag(style.show_lines),
                flag(style.show_faces),
            ],
            instance: [rgb[0], rgb[1], rgb[2], flag(style.is_selected)],
            style: [
                parent_slot.map_or(-1.0, |s| s as f32),
                style.opacity,
                style.pointsize,
                style.linewidth,
            ],
        }
    }

    #[inline]
    pub fn show(&self) -> bool {
        self.visibility[0] != 0.0
    }

    #[inline]
    pub fn is_selected(&self) -> bool {
        self.instance[3] != 0.0
    }

    /// Slot of the parent object.
    #[inline]
    pub fn parent_slot(&self) -> Option<usize> {
        let p = self.style[0];
        (p >= 0.0).then_some(p as usize)
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.style[1]
    }
}
