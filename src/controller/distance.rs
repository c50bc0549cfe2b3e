//! The camera's along-axis offset from the pivot, and how it responds to zoom and collisions.

use bevy_math::prelude::*;
use bevy_reflect::prelude::*;

use super::{collision::ProbeResult, smoothing, zoom::ZoomLimits};

/// Smoothed distance of the camera from the pivot, along the pivot's local +Z axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct DistanceState {
    /// The distance currently applied to the camera.
    pub current: f32,
    /// The distance `current` is being smoothed toward. Always within the zoom limits, except when
    /// pulled in further by a collision.
    pub target: f32,
}

/// How the camera's lateral offset relates to its distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum DistancePolicy {
    /// Only the along-axis distance changes. The lateral offset stays where it is.
    #[default]
    Fixed,
    /// The lateral offset scales with `current / max_distance`, so the camera slides toward the
    /// pivot axis as it zooms in. `max_offset` is the offset at the maximum zoom distance.
    Shifted {
        /// Lateral (x, y) offset at [`ZoomLimits::max_distance`].
        max_offset: Vec2,
    },
}

/// Tunables of the distance controller.
#[derive(Debug, Clone, Reflect)]
pub struct DistanceSettings {
    /// Near and far limits.
    pub zoom_limits: ZoomLimits,
    /// Scales scroll input into distance.
    pub scroll_sensitivity: f32,
    /// Rate at which the current distance follows the target, per second.
    pub scroll_dampening: f32,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            zoom_limits: ZoomLimits::default(),
            scroll_sensitivity: 0.2,
            scroll_dampening: 4.0,
        }
    }
}

/// Maintains the [`DistanceState`] and the camera local offset derived from it.
#[derive(Debug, Clone, Default)]
pub struct DistanceController {
    /// Distance tunables.
    pub settings: DistanceSettings,
    /// Lateral offset behavior.
    pub policy: DistancePolicy,
    state: DistanceState,
    lateral: Vec2,
    start_distance: f32,
}

impl DistanceController {
    /// Create a distance controller.
    pub fn new(settings: DistanceSettings, policy: DistancePolicy) -> Self {
        Self {
            settings,
            policy,
            ..Default::default()
        }
    }

    /// The current distance state.
    pub fn state(&self) -> DistanceState {
        self.state
    }

    /// The distance the camera had when the rig took control of it.
    pub fn start_distance(&self) -> f32 {
        self.start_distance
    }

    /// Adopt a camera local offset as both the current and target distance. Called once when the
    /// rig first sees its camera.
    pub fn initialize(&mut self, camera_local: Vec3) {
        let distance = camera_local.z.max(0.0);
        self.state = DistanceState {
            current: distance,
            target: self.settings.zoom_limits.clamp(distance),
        };
        self.start_distance = distance;
        self.lateral = camera_local.truncate();
        self.refresh_cam_pos(camera_local);
    }

    /// Set the distance to smooth toward, clamped to the zoom limits.
    pub fn set_target(&mut self, distance: f32) {
        self.state.target = self.settings.zoom_limits.clamp(distance);
    }

    /// The target change requested by a scroll input.
    pub fn requested_delta(&self, scroll: f32) -> f32 {
        super::zoom::zoom_delta(scroll, self.settings.scroll_sensitivity, self.state.target)
    }

    /// Advance one tick and return the new current distance.
    ///
    /// `requested_delta` is applied to the target and clamped. If `collision` reports an active hit,
    /// outward deltas are dropped for this tick. The current distance then moves toward the target
    /// by `damping * dt`.
    pub fn update(
        &mut self,
        requested_delta: f32,
        damping: f32,
        dt: f32,
        collision: Option<&ProbeResult>,
    ) -> f32 {
        let blocked = requested_delta > 0.0 && collision.is_some_and(|c| c.hit);
        if requested_delta.is_finite() && !blocked {
            self.state.target = self
                .settings
                .zoom_limits
                .clamp(self.state.target + requested_delta);
        }
        self.state.current = smoothing::damp(self.state.current, self.state.target, damping, dt);
        self.update_lateral();
        self.state.current
    }

    /// Pull the camera in to a probe's safe distance. The target follows, so the camera does not
    /// spring back into the wall once the probe stops reporting a hit.
    pub fn apply_constraint(&mut self, result: &ProbeResult) -> f32 {
        if result.hit && result.safe_distance < self.state.current {
            self.state.current = result.safe_distance.max(0.0);
            self.state.target = self.state.current;
        }
        self.state.current
    }

    /// The camera's position relative to the pivot.
    pub fn local_position(&self) -> Vec3 {
        self.lateral.extend(self.state.current)
    }

    /// Recompute internal references from the camera's offset after an external move, so zoom
    /// continues from where the camera actually is.
    ///
    /// For [`DistancePolicy::Shifted`] this re-derives the maximum lateral offset from the current
    /// offset. It is left untouched when the camera sits on the pivot.
    pub fn refresh_cam_pos(&mut self, camera_local: Vec3) {
        self.state.current = camera_local.z.max(0.0);
        self.lateral = camera_local.truncate();
        if let DistancePolicy::Shifted { ref mut max_offset } = self.policy {
            let ratio = camera_local.z / self.settings.zoom_limits.max_distance;
            if ratio.is_finite() && ratio > f32::EPSILON {
                *max_offset = camera_local.truncate() / ratio;
            }
        }
    }

    /// Re-derive the target from the current offset, see
    /// [`OrbitRotation::stop_current_rotation`](super::orbit::OrbitRotation::stop_current_rotation).
    pub fn stop_current_motion(&mut self, camera_local: Vec3) {
        self.state.current = camera_local.z.max(0.0);
        self.state.target = self.state.current;
    }

    fn update_lateral(&mut self) {
        if let DistancePolicy::Shifted { max_offset } = self.policy {
            let max = self.settings.zoom_limits.max_distance;
            let ratio = if max > f32::EPSILON {
                self.state.current / max
            } else {
                0.0
            };
            self.lateral = Vec2::ZERO.lerp(max_offset, ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn controller(min: f32, max: f32) -> DistanceController {
        let mut distance = DistanceController::new(
            DistanceSettings {
                zoom_limits: ZoomLimits {
                    min_distance: min,
                    max_distance: max,
                },
                ..Default::default()
            },
            DistancePolicy::Fixed,
        );
        distance.initialize(Vec3::new(0.0, 0.0, 10.0));
        distance
    }

    #[test]
    fn single_tick_matches_linear_step() {
        let mut distance = controller(1.0, 20.0);
        distance.set_target(2.0);
        let current = distance.update(0.0, 2.0, 0.1, None);
        assert!((current - 8.4).abs() < 1e-5);
    }

    #[test]
    fn converges_with_strictly_decreasing_error() {
        let mut distance = controller(1.0, 20.0);
        distance.set_target(2.0);
        let mut last_error = f32::MAX;
        let mut ticks = 0;
        while last_error > 1e-3 {
            let current = distance.update(0.0, 2.0, 0.1, None);
            let error = (current - 2.0).abs();
            assert!(error < last_error);
            last_error = error;
            ticks += 1;
            assert!(ticks < 100, "did not converge");
        }
    }

    #[test]
    fn random_scroll_stays_in_limits() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let mut distance = controller(1.5, 12.0);
        for _ in 0..2_000 {
            let scroll = rng.gen_range(-3.0..3.0);
            let delta = distance.requested_delta(scroll);
            distance.update(delta, 4.0, 0.02, None);
            assert!(distance.settings.zoom_limits.contains(distance.state().target));
        }
        for _ in 0..500 {
            distance.update(0.0, 4.0, 0.02, None);
        }
        assert!(distance.settings.zoom_limits.contains(distance.state().current));
    }

    #[test]
    fn outward_zoom_is_blocked_while_hit() {
        let mut distance = controller(1.0, 20.0);
        let hit = ProbeResult {
            hit: true,
            safe_distance: 10.0,
            clip_distance: 10.0,
        };
        distance.update(5.0, 2.0, 0.1, Some(&hit));
        assert_eq!(distance.state().target, 10.0);

        distance.update(-3.0, 2.0, 0.1, Some(&hit));
        assert_eq!(distance.state().target, 7.0);
    }

    #[test]
    fn constraint_caps_current_distance() {
        let mut distance = controller(1.0, 20.0);
        distance.set_target(15.0);
        distance.update(0.0, 2.0, 0.1, None);
        let result = ProbeResult {
            hit: true,
            safe_distance: 2.5,
            clip_distance: 2.5,
        };
        assert_eq!(distance.apply_constraint(&result), 2.5);
        assert_eq!(distance.state().target, 2.5);
        assert_eq!(distance.local_position(), Vec3::new(0.0, 0.0, 2.5));
    }

    #[test]
    fn shifted_policy_slides_laterally() {
        let mut distance = DistanceController::new(
            DistanceSettings {
                zoom_limits: ZoomLimits {
                    min_distance: 0.0,
                    max_distance: 10.0,
                },
                ..Default::default()
            },
            DistancePolicy::Shifted {
                max_offset: Vec2::ZERO,
            },
        );
        distance.initialize(Vec3::new(1.0, 0.5, 10.0));
        assert_eq!(
            distance.policy,
            DistancePolicy::Shifted {
                max_offset: Vec2::new(1.0, 0.5)
            }
        );

        distance.set_target(5.0);
        distance.update(0.0, 10.0, 0.1, None);
        let local = distance.local_position();
        assert!((local.z - 5.0).abs() < 1e-5);
        assert!((local.x - 0.5).abs() < 1e-5);
        assert!((local.y - 0.25).abs() < 1e-5);
    }

    #[test]
    fn refresh_rebases_shift_after_external_move() {
        let mut distance = DistanceController::new(
            DistanceSettings {
                zoom_limits: ZoomLimits {
                    min_distance: 0.0,
                    max_distance: 10.0,
                },
                ..Default::default()
            },
            DistancePolicy::Shifted {
                max_offset: Vec2::new(1.0, 0.0),
            },
        );
        distance.initialize(Vec3::new(1.0, 0.0, 10.0));
        distance.refresh_cam_pos(Vec3::new(2.0, 0.0, 5.0));
        assert_eq!(
            distance.policy,
            DistancePolicy::Shifted {
                max_offset: Vec2::new(4.0, 0.0)
            }
        );
        distance.stop_current_motion(Vec3::new(2.0, 0.0, 5.0));
        distance.update(0.0, 2.0, 0.1, None);
        assert_eq!(distance.local_position(), Vec3::new(2.0, 0.0, 5.0));

        distance.refresh_cam_pos(Vec3::ZERO);
        assert_eq!(
            distance.policy,
            DistancePolicy::Shifted {
                max_offset: Vec2::new(4.0, 0.0)
            }
        );
    }
}
