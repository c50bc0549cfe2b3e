//! Yaw/pitch orbit state and the damped pivot rotation built from it.

use std::f32::consts::{FRAC_PI_2, TAU};

use bevy_input::mouse::MouseButton;
use bevy_math::prelude::*;
use bevy_math::EulerRot;
use bevy_reflect::prelude::*;

use super::smoothing::damp_factor;

/// Lowest allowed pitch, straight down.
pub const MIN_PITCH: f32 = -FRAC_PI_2;
/// Highest allowed pitch, straight up.
pub const MAX_PITCH: f32 = FRAC_PI_2;

/// Target rotation of an orbit, in radians.
///
/// Pitch is always within [`MIN_PITCH`]..=[`MAX_PITCH`]. Yaw is unbounded in meaning but stored
/// wrapped to `[0, TAU)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct OrbitState {
    /// Rotation about the world up axis.
    pub yaw: f32,
    /// Rotation about the pivot's local right axis.
    pub pitch: f32,
}

impl OrbitState {
    /// Build a state, wrapping yaw and clamping pitch.
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw: wrap_yaw(yaw),
            pitch: clamp_pitch(pitch, MIN_PITCH, MAX_PITCH),
        }
    }

    /// Recover yaw and pitch from an orientation, discarding roll.
    pub fn from_rotation(rotation: Quat) -> Self {
        let (yaw, pitch, _roll) = rotation.normalize().to_euler(EulerRot::YXZ);
        Self::new(yaw, pitch)
    }

    /// The orientation this state describes, with zero roll.
    pub fn rotation(&self) -> Quat {
        yaw_pitch_rotation(self.yaw, self.pitch)
    }

    /// Accumulate a scaled pointer delta: `yaw += x * sx`, `pitch -= y * sy`, then clamp pitch to
    /// `[min_pitch, max_pitch]`.
    pub fn apply_delta(&mut self, delta: Vec2, sensitivity: Vec2, min_pitch: f32, max_pitch: f32) {
        self.yaw = wrap_yaw(self.yaw + delta.x * sensitivity.x);
        self.pitch = clamp_pitch(self.pitch - delta.y * sensitivity.y, min_pitch, max_pitch);
    }
}

/// Clamp a pitch angle to the given bounds, which are themselves limited to straight up/down.
pub fn clamp_pitch(pitch: f32, min: f32, max: f32) -> f32 {
    let min = min.max(MIN_PITCH);
    let max = max.min(MAX_PITCH).max(min);
    if pitch.is_nan() {
        return 0.0f32.clamp(min, max);
    }
    pitch.clamp(min, max)
}

/// Wrap a yaw angle into `[0, TAU)`.
pub fn wrap_yaw(yaw: f32) -> f32 {
    if !yaw.is_finite() {
        return 0.0;
    }
    let wrapped = yaw.rem_euclid(TAU);
    // rem_euclid can round up to TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Yaw about world up, then pitch about the resulting local right axis.
pub fn yaw_pitch_rotation(yaw: f32, pitch: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0)
}

/// Spherically interpolate `current` toward `target` by `rate * dt`, then drop any roll that the
/// interpolation introduced.
pub fn damp_rotation(current: Quat, target: Quat, rate: f32, dt: f32) -> Quat {
    let step = current
        .normalize()
        .slerp(target.normalize(), damp_factor(rate, dt));
    let (yaw, pitch, _roll) = step.to_euler(EulerRot::YXZ);
    yaw_pitch_rotation(yaw, pitch)
}

/// Tunables of the orbit rotation.
#[derive(Debug, Clone, Reflect)]
pub struct OrbitSettings {
    /// Radians of yaw and pitch per unit of pointer delta.
    pub sensitivity: Vec2,
    /// Rate at which the pivot orientation catches up with the target orientation, per second.
    pub dampening: f32,
    /// When true, pointer motion only rotates the orbit while [`OrbitSettings::button`] is held.
    pub controlled_on_button: bool,
    /// The button gating orbit input when [`OrbitSettings::controlled_on_button`] is set.
    pub button: MouseButton,
    /// Pointer units injected per frame by the arrow keys when the orbit is not button gated.
    pub keyboard_rate: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            sensitivity: Vec2::splat(0.007),
            dampening: 6.0,
            controlled_on_button: true,
            button: MouseButton::Right,
            keyboard_rate: 8.0,
        }
    }
}

/// Integrates pointer input into an [`OrbitState`] and damps the pivot toward it.
#[derive(Debug, Clone, Default)]
pub struct OrbitRotation {
    /// Orbit tunables.
    pub settings: OrbitSettings,
    state: OrbitState,
}

impl OrbitRotation {
    /// Create an orbit rotation model with the given settings.
    pub fn new(settings: OrbitSettings) -> Self {
        Self {
            settings,
            state: OrbitState::default(),
        }
    }

    /// The current target rotation.
    pub fn state(&self) -> OrbitState {
        self.state
    }

    /// Advance one tick. Pointer deltas are only integrated when `gate` is true, but the pivot is
    /// always damped toward the target so motion settles after input stops.
    pub fn update(&mut self, pointer_delta: Vec2, gate: bool, dt: f32, pivot_rotation: &mut Quat) {
        if gate && pointer_delta.is_finite() && pointer_delta != Vec2::ZERO {
            self.state
                .apply_delta(pointer_delta, self.settings.sensitivity, MIN_PITCH, MAX_PITCH);
        }
        *pivot_rotation = damp_rotation(
            *pivot_rotation,
            self.state.rotation(),
            self.settings.dampening,
            dt,
        );
    }

    /// Hard reset the target rotation and the pivot to `rotation`, without damping.
    pub fn set_start_rotation(&mut self, rotation: OrbitState, pivot_rotation: &mut Quat) {
        self.state = OrbitState::new(rotation.yaw, rotation.pitch);
        *pivot_rotation = self.state.rotation();
    }

    /// Re-derive the target rotation from the pivot as it is now, so an externally written pose
    /// is not undone on the next tick.
    pub fn stop_current_rotation(&mut self, pivot_rotation: Quat) {
        self.state = OrbitState::from_rotation(pivot_rotation);
    }

    /// Forget the target rotation.
    pub fn reset(&mut self) {
        self.state = OrbitState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn pitch_stays_in_bounds_for_random_input() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut orbit = OrbitRotation::default();
        let mut pivot = Quat::IDENTITY;
        for _ in 0..5_000 {
            let delta = Vec2::new(rng.gen_range(-400.0..400.0), rng.gen_range(-400.0..400.0));
            orbit.update(delta, rng.gen_bool(0.8), 1.0 / 50.0, &mut pivot);
            let pitch = orbit.state().pitch;
            assert!((MIN_PITCH..=MAX_PITCH).contains(&pitch), "pitch {pitch}");
            assert!((0.0..TAU).contains(&orbit.state().yaw));
        }
    }

    #[test]
    fn gate_blocks_input_but_damping_continues() {
        let mut orbit = OrbitRotation::default();
        let mut pivot = Quat::IDENTITY;
        orbit.update(Vec2::new(100.0, 0.0), true, 0.02, &mut pivot);
        let target = orbit.state();
        let after_first = pivot;

        orbit.update(Vec2::new(100.0, 0.0), false, 0.02, &mut pivot);
        assert_eq!(orbit.state(), target);
        assert!(pivot.angle_between(target.rotation()) < after_first.angle_between(target.rotation()));
    }

    #[test]
    fn rotation_never_snaps() {
        let mut orbit = OrbitRotation::default();
        let mut pivot = Quat::IDENTITY;
        orbit.update(Vec2::new(0.0, -100.0), true, 0.02, &mut pivot);
        let remaining = pivot.angle_between(orbit.state().rotation());
        assert!(remaining > 0.0);
        assert!(pivot.angle_between(Quat::IDENTITY) > 0.0);
    }

    #[test]
    fn set_start_rotation_is_exact() {
        let mut orbit = OrbitRotation::default();
        let mut pivot = Quat::IDENTITY;
        let start = OrbitState::new(1.2, -0.4);
        orbit.set_start_rotation(start, &mut pivot);
        assert_eq!(orbit.state(), start);
        assert_eq!(pivot, start.rotation());
    }

    #[test]
    fn stop_current_rotation_adopts_external_pose() {
        let mut orbit = OrbitRotation::default();
        let external = yaw_pitch_rotation(0.8, 0.3);
        let mut pivot = external;
        orbit.stop_current_rotation(external);
        orbit.update(Vec2::ZERO, true, 0.02, &mut pivot);
        assert!(pivot.dot(external).abs() > 1.0 - 1e-5);
        assert!((orbit.state().yaw - 0.8).abs() < 1e-4);
        assert!((orbit.state().pitch - 0.3).abs() < 1e-4);
    }

    #[test]
    fn clamp_pitch_respects_narrow_limits() {
        assert_eq!(clamp_pitch(1.0, -0.5, 0.5), 0.5);
        assert_eq!(clamp_pitch(-3.0, -4.0, 4.0), MIN_PITCH);
        assert_eq!(clamp_pitch(f32::NAN, -0.5, 0.5), 0.0);
    }
}
