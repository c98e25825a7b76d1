//! View and projection matrices, and frame-rate bookkeeping.

use crate::config::ViewMode;
use glamx::{Mat4, Vec3};
use web_time::{Duration, Instant};

/// A camera looking at a target point.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Up direction of the perspective view.
    pub up: Vec3,
    /// Vertical field of view, in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            position: Vec3::new(-10.0, -10.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Moves the eye and the target.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        self.position = eye;
        self.target = target;
    }

    /// Moves the target to `point`, keeping the eye offset.
    pub fn focus(&mut self, point: Vec3) {
        let offset = self.position - self.target;
        self.target = point;
        self.position = point + offset;
    }

    /// Distance from the eye to the target.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Eye position and up vector for a view mode. Axis-aligned views keep the
    /// current distance to the target.
    fn eye(&self, viewmode: ViewMode) -> (Vec3, Vec3) {
        let d = self.distance();
        match viewmode {
            ViewMode::Perspective => (self.position, self.up),
            ViewMode::Top => (self.target + Vec3::Z * d, Vec3::Y),
            ViewMode::Front => (self.target - Vec3::Y * d, Vec3::Z),
            ViewMode::Right => (self.target + Vec3::X * d, Vec3::Z),
        }
    }

    /// World-to-view transform.
    pub fn viewworld(&self, viewmode: ViewMode) -> Mat4 {
        let (eye, up) = self.eye(viewmode);
        Mat4::look_at_rh(eye, self.target, up)
    }

    /// View-to-clip transform for a `width` by `height` viewport.
    ///
    /// Axis-aligned views are orthographic and frame the same height at the
    /// target as the perspective view.
    pub fn projection(&self, width: u32, height: u32, viewmode: ViewMode) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        match viewmode {
            ViewMode::Perspective => Mat4::perspective_rh(self.fov, aspect, self.near, self.far),
            _ => {
                let half_height = self.distance() * (self.fov * 0.5).tan();
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    -self.far,
                    self.far,
                )
            }
        }
    }
}

/// Counts frames and reports the frame rate once per second.
#[derive(Clone, Debug)]
pub struct FrameStats {
    frames: u32,
    since: Instant,
    fps: Option<f32>,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        FrameStats {
            frames: 0,
            since: Instant::now(),
            fps: None,
        }
    }

    /// Records a frame. Returns the new frame rate when a second has elapsed.
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    /// Records a frame finished at `now`.
    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;

        let elapsed = now.saturating_duration_since(self.since);
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.since = now;
        self.fps = Some(fps);
        Some(fps)
    }

    /// The last computed frame rate.
    #[inline]
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_is_reported_once_per_second() {
        let mut stats = FrameStats::new();
        let start = stats.since;

        for i in 1..30 {
            assert_eq!(stats.tick_at(start + Duration::from_millis(i * 10)), None);
        }
        let fps = stats.tick_at(start + Duration::from_secs(1)).unwrap();
        assert!((fps - 30.0).abs() < 1.0e-3);
        assert_eq!(stats.fps(), Some(fps));
        assert_eq!(stats.tick_at(start + Duration::from_millis(1500)), None);
    }

    #[test]
    fn target_is_in_front_of_the_camera() {
        let camera = Camera::default();
        for mode in [
            ViewMode::Perspective,
            ViewMode::Top,
            ViewMode::Front,
            ViewMode::Right,
        ] {
            let view = camera.viewworld(mode).transform_point3(camera.target);
            assert!(view.z < 0.0, "{:?}", mode);
        }
    }
}
