//! Provides [`ZoomLimits`] settings and the scroll-to-distance mapping.

use bevy_reflect::Reflect;

/// How strongly the current distance scales a scroll step. Zooming covers more ground the further
/// away the camera already is.
pub const ZOOM_DISTANCE_SCALE: f32 = 0.3;

/// Bound the camera's distance from the pivot.
#[derive(Debug, Clone, Copy, Reflect)]
pub struct ZoomLimits {
    /// The closest the camera may get to the pivot when zooming in.
    pub min_distance: f32,
    /// The farthest the camera may get from the pivot when zooming out. The lateral offset of
    /// [`DistancePolicy::Shifted`](super::distance::DistancePolicy::Shifted) reaches its maximum at
    /// this distance.
    pub max_distance: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 20.0,
        }
    }
}

impl ZoomLimits {
    /// Clamp a distance into the limits. Values outside are clamped silently; a NaN resolves to the
    /// minimum.
    pub fn clamp(&self, distance: f32) -> f32 {
        let min = self.min_distance.max(0.0);
        let max = self.max_distance.max(min);
        if distance.is_nan() {
            return min;
        }
        distance.clamp(min, max)
    }

    /// Is this distance within the limits?
    pub fn contains(&self, distance: f32) -> bool {
        (self.min_distance..=self.max_distance).contains(&distance)
    }
}

/// The change in target distance requested by a scroll input. Positive scroll zooms in.
pub fn zoom_delta(scroll: f32, sensitivity: f32, current_distance: f32) -> f32 {
    if scroll.abs() <= f32::EPSILON || !scroll.is_finite() {
        return 0.0;
    }
    -scroll * sensitivity * (current_distance.abs() * ZOOM_DISTANCE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_silent() {
        let limits = ZoomLimits {
            min_distance: 2.0,
            max_distance: 8.0,
        };
        assert_eq!(limits.clamp(-5.0), 2.0);
        assert_eq!(limits.clamp(50.0), 8.0);
        assert_eq!(limits.clamp(f32::NAN), 2.0);
        assert_eq!(limits.clamp(4.0), 4.0);
    }

    #[test]
    fn zoom_is_proportional_to_distance() {
        let near = zoom_delta(1.0, 1.0, 2.0);
        let far = zoom_delta(1.0, 1.0, 20.0);
        assert!(near < 0.0);
        assert!((far / near - 10.0).abs() < 1e-5);
        assert_eq!(zoom_delta(0.0, 1.0, 20.0), 0.0);
    }
}
