//! Render configuration.
//!
//! Loading and saving these values is left to the host application; the types
//! derive `serde` traits when the `serde` feature is enabled.

use crate::color::{self, Color};
use std::fmt;
use std::str::FromStr;

/// How faces are shaded and which passes run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RenderMode {
    /// Flat vertex colors.
    #[default]
    Shaded,
    /// Vertex colors modulated by a headlight.
    Lighted,
    /// Every face goes through the transparent pass at a reduced, uniform opacity.
    Ghosted,
    /// Faces are skipped; only points and lines are drawn.
    Wireframe,
}

impl RenderMode {
    /// Whether faces are skipped entirely.
    #[inline]
    pub fn is_wireframe(self) -> bool {
        self == RenderMode::Wireframe
    }

    /// Whether faces are lit.
    #[inline]
    pub fn is_lighted(self) -> bool {
        self == RenderMode::Lighted
    }

    /// Whether all faces are drawn through the transparent pass.
    #[inline]
    pub fn is_ghosted(self) -> bool {
        self == RenderMode::Ghosted
    }

    /// The lowercase name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Shaded => "shaded",
            RenderMode::Lighted => "lighted",
            RenderMode::Ghosted => "ghosted",
            RenderMode::Wireframe => "wireframe",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown render or view mode name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mode `{0}`")]
pub struct UnknownMode(pub String);

impl FromStr for RenderMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shaded" => Ok(RenderMode::Shaded),
            "lighted" => Ok(RenderMode::Lighted),
            "ghosted" => Ok(RenderMode::Ghosted),
            "wireframe" => Ok(RenderMode::Wireframe),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Camera projection used by the frame driver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ViewMode {
    #[default]
    Perspective,
    Top,
    Front,
    Right,
}

impl FromStr for ViewMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perspective" => Ok(ViewMode::Perspective),
            "top" => Ok(ViewMode::Top),
            "front" => Ok(ViewMode::Front),
            "right" => Ok(ViewMode::Right),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// What to do with face, line or point elements that index past the supplied vertices.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElementPolicy {
    /// Drop the offending primitive and log a warning.
    #[default]
    Lenient,
    /// Reject the object with [`BufferError::DanglingElement`](crate::BufferError::DanglingElement).
    Strict,
}

/// Settings shared by the frame driver and the buffer manager.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderConfig {
    /// Clear color of the main view.
    pub background_color: Color,
    /// Initial render mode.
    pub rendermode: RenderMode,
    /// Initial camera projection.
    pub viewmode: ViewMode,
    /// Global opacity applied in [`RenderMode::Ghosted`].
    pub ghost_opacity: f32,
    /// Color mixed into selected objects.
    pub selection_color: Color,
    /// Whether grid objects are drawn.
    pub show_grid: bool,
    /// Handling of out-of-range element indices at ingestion.
    pub element_policy: ElementPolicy,
    /// Re-sort transparent triangles back to front every frame.
    pub sort_transparent: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_color: color::BACKGROUND,
            rendermode: RenderMode::default(),
            viewmode: ViewMode::default(),
            ghost_opacity: 0.7,
            selection_color: color::YELLOW,
            show_grid: true,
            element_policy: ElementPolicy::default(),
            sort_transparent: true,
        }
    }
}

impl RenderConfig {
    /// Sets the clear color.
    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Sets the initial render mode.
    pub fn with_rendermode(mut self, rendermode: RenderMode) -> Self {
        self.rendermode = rendermode;
        self
    }

    /// Sets the initial camera projection.
    pub fn with_viewmode(mut self, viewmode: ViewMode) -> Self {
        self.viewmode = viewmode;
        self
    }

    /// Sets the opacity used by the ghosted render mode. Clamped to [0, 1].
    pub fn with_ghost_opacity(mut self, opacity: f32) -> Self {
        self.ghost_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Sets the selection highlight color.
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Shows or hides the grid.
    pub fn with_grid(mut self, show: bool) -> Self {
        self.show_grid = show;
        self
    }

    /// Sets how out-of-range element indices are handled.
    pub fn with_element_policy(mut self, policy: ElementPolicy) -> Self {
        self.element_policy = policy;
        self
    }

    /// Enables or disables per-frame sorting of transparent triangles.
    pub fn with_transparent_sorting(mut self, enabled: bool) -> Self {
        self.sort_transparent = enabled;
        self
    }

    /// The global opacity uniform for the configured render mode.
    pub fn opacity(&self) -> f32 {
        if self.rendermode.is_ghosted() {
            self.ghost_opacity
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendermode_names_round_trip() {
        for mode in [
            RenderMode::Shaded,
            RenderMode::Lighted,
            RenderMode::Ghosted,
            RenderMode::Wireframe,
        ] {
            assert_eq!(mode.to_string().parse::<RenderMode>(), Ok(mode));
        }
        assert!("solid".parse::<RenderMode>().is_err());
    }

    #[test]
    fn only_ghosted_mode_reduces_opacity() {
        let config = RenderConfig::default().with_ghost_opacity(0.25);
        assert_eq!(config.opacity(), 1.0);

        let ghosted = config.with_rendermode(RenderMode::Ghosted);
        assert_eq!(ghosted.opacity(), 0.25);
    }

    #[test]
    fn ghost_opacity_is_clamped() {
        assert_eq!(RenderConfig::default().with_ghost_opacity(3.0).ghost_opacity, 1.0);
    }
}
