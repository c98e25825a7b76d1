//! Colors used by scene objects, the grid and the selection highlight.
//!
//! Components are RGBA `f32` in the range [0.0, 1.0]. The constants are a small
//! subset of the [SVG/CSS3 named colors](https://www.w3.org/TR/css-color-3/#svg-color)
//! plus the viewer defaults.
//!
//! # Example
//! ```
//! use geoview::color::{self, Color};
//!
//! let translucent = Color::new(1.0, 0.0, 0.0, 0.5);
//! assert!(translucent.a < color::RED.a);
//! ```

pub use rgb::Rgba;

/// The color type used throughout geoview. RGBA with f32 components in [0.0, 1.0].
pub type Color = Rgba<f32>;

/// <div style="margin:2px 0"><span style="background-color:rgb(0, 0, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Black (0, 0, 0)</div>
pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(255, 255, 255);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>White (255, 255, 255)</div>
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(255, 0, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Red (255, 0, 0)</div>
pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(0, 255, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Lime (0, 255, 0) - CSS "lime", pure green</div>
pub const LIME: Color = Color::new(0.0, 1.0, 0.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(0, 0, 255);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Blue (0, 0, 255)</div>
pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(255, 255, 0);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Yellow (255, 255, 0)</div>
pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(128, 128, 128);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Gray (128, 128, 128)</div>
pub const GRAY: Color = Color::new(0.5019608, 0.5019608, 0.5019608, 1.0);

/// <div style="margin:2px 0"><span style="background-color:rgb(238, 238, 238);padding:0 0.7em;margin-right:0.5em;border:1px solid"></span>Viewer background (238, 238, 238)</div>
pub const BACKGROUND: Color = Color::new(0.93333334, 0.93333334, 0.93333334, 1.0);

/// Largest number of distinct instance colors (24-bit RGB, black excluded).
pub const MAX_INSTANCE_COLORS: u32 = 0x00FF_FFFF;

/// Encodes an instance index as a unique opaque color.
///
/// Index `n` maps to the 24-bit value `n + 1`, so pure black never identifies an
/// object and can stand for "background" in an instance map. Returns `None` when
/// the index does not fit in 24 bits.
pub fn instance_color(index: u32) -> Option<Color> {
    if index >= MAX_INSTANCE_COLORS {
        return None;
    }

    let code = index + 1;
    let r = (code >> 16) & 0xFF;
    let g = (code >> 8) & 0xFF;
    let b = code & 0xFF;

    Some(Color::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        1.0,
    ))
}

/// Decodes a pixel read back from an instance map into the instance index.
///
/// Returns `None` for black (no object).
pub fn instance_index(rgb: [u8; 3]) -> Option<u32> {
    let code = ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32;
    code.checked_sub(1)
}

/// Quantizes a color to the 8-bit RGB triple a framebuffer readback would produce.
#[inline]
pub fn to_rgb8(color: Color) -> [u8; 3] {
    let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(color.r), q(color.g), q(color.b)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_colors_survive_8bit_readback() {
        for index in [0, 1, 254, 255, 256, 65_535, 1_000_000, MAX_INSTANCE_COLORS - 1] {
            let color = instance_color(index).unwrap();
            assert_eq!(instance_index(to_rgb8(color)), Some(index));
        }
    }

    #[test]
    fn black_is_never_an_instance() {
        assert_eq!(instance_index([0, 0, 0]), None);
        assert!(instance_color(MAX_INSTANCE_COLORS).is_none());
    }
}
