//! A first-person look model: the pivot sits at the subject's head and turns with the pointer.

use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use super::{
    orbit::{clamp_pitch, damp_rotation, yaw_pitch_rotation, OrbitState, MAX_PITCH, MIN_PITCH},
    transition::RigPose,
};

/// Tunables of the first-person look.
#[derive(Debug, Clone, Reflect)]
pub struct FirstPersonSettings {
    /// Radians of yaw and pitch per unit of pointer delta.
    pub sensitivity: Vec2,
    /// Lowest pitch, in radians.
    pub min_pitch: f32,
    /// Highest pitch, in radians.
    pub max_pitch: f32,
    /// Smooth the view toward the target rotation instead of snapping to it.
    pub smooth: bool,
    /// Catch-up rate used when [`FirstPersonSettings::smooth`] is set, per second.
    pub smooth_rate: f32,
    /// Position of the pivot relative to the subject.
    pub head_offset: Vec3,
    /// Turn the subject in yaw along with the view.
    pub rotate_subject: bool,
}

impl Default for FirstPersonSettings {
    fn default() -> Self {
        Self {
            sensitivity: Vec2::splat(0.002),
            min_pitch: MIN_PITCH,
            max_pitch: MAX_PITCH,
            smooth: true,
            smooth_rate: 10.0,
            head_offset: Vec3::new(0.0, 0.8, 0.0),
            rotate_subject: true,
        }
    }
}

/// Yaw/pitch look driven straight from the pointer.
#[derive(Debug, Clone, Default)]
pub struct FirstPersonLook {
    /// Look tunables.
    pub settings: FirstPersonSettings,
    target: OrbitState,
}

impl FirstPersonLook {
    /// Create a first-person look model.
    pub fn new(settings: FirstPersonSettings) -> Self {
        Self {
            settings,
            target: OrbitState::default(),
        }
    }

    /// The rotation the view is heading toward.
    pub fn target(&self) -> OrbitState {
        self.target
    }

    /// Mouse-look for one tick. The pivot follows the subject's head, the camera sits on the pivot.
    pub fn tick(
        &mut self,
        pointer_delta: Vec2,
        dt: f32,
        pose: &mut RigPose,
        subject: Option<&mut Transform>,
    ) {
        if pointer_delta.is_finite() && pointer_delta != Vec2::ZERO {
            self.target.apply_delta(
                pointer_delta,
                self.settings.sensitivity,
                self.settings.min_pitch,
                self.settings.max_pitch,
            );
        }
        let target = self.target.rotation();
        pose.pivot_rotation = if self.settings.smooth {
            damp_rotation(pose.pivot_rotation, target, self.settings.smooth_rate, dt)
        } else {
            target
        };
        pose.camera_local = Vec3::ZERO;

        if let Some(subject) = subject {
            if self.settings.rotate_subject {
                let heading = Quat::from_rotation_y(self.target.yaw);
                subject.rotation = if self.settings.smooth {
                    damp_rotation(subject.rotation, heading, self.settings.smooth_rate, dt)
                } else {
                    heading
                };
            }
            pose.pivot_translation = subject.translation + self.settings.head_offset;
        }
    }

    /// Snapshot the look rotation and reset it to zero, so nothing stale survives while another
    /// camera behavior is active.
    pub fn take_rotation(&mut self) -> OrbitState {
        std::mem::take(&mut self.target)
    }

    /// Put back a target taken with [`FirstPersonLook::take_rotation`], without touching the pose.
    pub fn restore_target(&mut self, rotation: OrbitState) {
        self.target = rotation;
    }

    /// Restore a look rotation exactly.
    pub fn set_rotation(&mut self, rotation: OrbitState, pose: &mut RigPose) {
        self.target = OrbitState {
            yaw: rotation.yaw,
            pitch: clamp_pitch(
                rotation.pitch,
                self.settings.min_pitch,
                self.settings.max_pitch,
            ),
        };
        pose.pivot_rotation = yaw_pitch_rotation(self.target.yaw, self.target.pitch);
        pose.camera_local = Vec3::ZERO;
    }

    /// Adopt the pivot's current orientation as the look target.
    pub fn sync(&mut self, pivot_rotation: Quat) {
        let state = OrbitState::from_rotation(pivot_rotation);
        self.target = OrbitState {
            yaw: state.yaw,
            pitch: clamp_pitch(state.pitch, self.settings.min_pitch, self.settings.max_pitch),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_follows_subject_head() {
        let mut look = FirstPersonLook::default();
        let mut pose = RigPose::default();
        let mut subject = Transform::from_xyz(3.0, 0.0, -2.0);
        look.tick(Vec2::new(50.0, 0.0), 0.02, &mut pose, Some(&mut subject));
        assert_eq!(pose.pivot_translation, Vec3::new(3.0, 0.8, -2.0));
        assert!(subject.rotation.angle_between(Quat::IDENTITY) > 0.0);
    }

    #[test]
    fn pitch_respects_narrow_limits() {
        let mut look = FirstPersonLook::new(FirstPersonSettings {
            min_pitch: -0.5,
            max_pitch: 0.5,
            smooth: false,
            ..Default::default()
        });
        let mut pose = RigPose::default();
        look.tick(Vec2::new(0.0, -10_000.0), 0.02, &mut pose, None);
        assert_eq!(look.target().pitch, 0.5);
        assert_eq!(pose.pivot_rotation, yaw_pitch_rotation(0.0, 0.5));
    }

    #[test]
    fn take_then_set_round_trips_the_view() {
        let mut look = FirstPersonLook::default();
        let mut pose = RigPose::default();
        for _ in 0..10 {
            look.tick(Vec2::new(30.0, 12.0), 0.02, &mut pose, None);
        }
        let snapshot = look.take_rotation();
        assert_eq!(look.target(), OrbitState::default());

        look.set_rotation(snapshot, &mut pose);
        assert_eq!(look.target(), snapshot);
        assert_eq!(pose.pivot_rotation, snapshot.rotation());
    }
}
