//! The primary [`Component`] of the controller, [`CameraRig`], and the events used to drive it.

use std::time::Duration;

use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_time::prelude::*;
use bevy_transform::prelude::*;
use bevy_window::RequestRedraw;

use super::{
    collision::{CollisionProbe, CollisionWorld, ProbeSettings, SceneColliders},
    distance::{DistanceController, DistancePolicy, DistanceSettings},
    first_person::{FirstPersonLook, FirstPersonSettings},
    inputs::RigInput,
    mode::{CameraMode, ModeController},
    orbit::{OrbitRotation, OrbitSettings},
    transition::{OnComplete, RigPose, TransitionId, TransitionSettings, TransitionTarget},
};

/// Drives a camera entity that is a child of a pivot entity.
///
/// The pivot's [`Transform`] is treated as world space, so the pivot should not itself have a
/// parent. The camera's [`Transform`] is its offset from the pivot; the camera looks down the
/// pivot's -Z axis from `+Z`. An optional subject entity is the tracked character: the first-person
/// camera sits at its head and turns it in yaw.
///
/// # Moving the Camera
///
/// Input is sampled into [`RigInput`] each frame and consumed on the fixed step. To move the camera
/// from your own systems:
///
/// - Send [`SwitchCameraMode`] or call [`CameraRig::switch_mode`] to hand control to the other
///   behavior with an animated transition.
/// - Send [`AnimateCameraTo`] or call [`CameraRig::animate`] to refocus the camera without changing
///   behavior.
/// - Send [`CameraPause`] to freeze every rig.
///
/// [`TransitionFinished`] is sent for every transition that completes.
///
/// ```rust,ignore
/// let pivot = commands.spawn(Transform::from_xyz(0.0, 1.5, 0.0)).id();
/// commands.spawn((
///     Camera3d::default(),
///     Transform::from_xyz(0.0, 0.0, 8.0),
///     CameraRig::new(pivot).with_subject(player),
/// )).set_parent(pivot);
/// ```
#[derive(Debug, Component, Deref, DerefMut)]
#[require(RigInput, Transform)]
pub struct CameraRig {
    /// The entity the camera orbits around.
    pub pivot: Entity,
    /// The tracked character, if any.
    pub subject: Option<Entity>,
    /// Behaviors and the state machine switching between them.
    #[deref]
    pub controller: ModeController,
}

impl CameraRig {
    /// Create a rig orbiting `pivot` with default settings.
    pub fn new(pivot: Entity) -> Self {
        Self {
            pivot,
            subject: None,
            controller: ModeController::default(),
        }
    }

    /// Track a subject.
    pub fn with_subject(mut self, subject: Entity) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Start in the given mode.
    pub fn with_mode(mut self, mode: CameraMode) -> Self {
        self.controller.set_initial_mode(mode);
        self
    }

    /// Configure wall clipping protection, or disable it with `None`.
    pub fn with_probe(mut self, settings: Option<ProbeSettings>) -> Self {
        self.controller.probe = settings.map(CollisionProbe::new);
        self
    }

    /// Set how the camera's lateral offset follows its distance.
    pub fn with_distance_policy(mut self, policy: DistancePolicy) -> Self {
        self.controller.distance.policy = policy;
        self
    }

    /// Set the orbit tunables.
    pub fn with_orbit(mut self, settings: OrbitSettings) -> Self {
        self.controller.orbit = OrbitRotation::new(settings);
        self
    }

    /// Set the zoom tunables.
    pub fn with_distance(mut self, settings: DistanceSettings) -> Self {
        let policy = self.controller.distance.policy;
        self.controller.distance = DistanceController::new(settings, policy);
        self
    }

    /// Set the first-person tunables.
    pub fn with_first_person(mut self, settings: FirstPersonSettings) -> Self {
        self.controller.first_person = FirstPersonLook::new(settings);
        self
    }

    /// Set the transition defaults.
    pub fn with_transition(mut self, settings: TransitionSettings) -> Self {
        self.controller.transition = settings;
        self
    }

    /// See [`ModeController::switch_to`]. Writes the pivot and camera only if they change.
    #[allow(clippy::too_many_arguments)]
    pub fn switch_mode(
        &mut self,
        mode: CameraMode,
        target: Option<TransitionTarget>,
        duration: Option<Duration>,
        pivot: &mut Transform,
        camera: &mut Transform,
        subject: Option<&Transform>,
        on_complete: Option<OnComplete>,
    ) -> Option<TransitionId> {
        let mut pose = RigPose::from_transforms(pivot, camera);
        let id = self
            .controller
            .switch_to(mode, target, duration, &mut pose, subject, on_complete);
        if pose != RigPose::from_transforms(pivot, camera) {
            pose.write(pivot, camera);
        }
        id
    }

    /// See [`ModeController::animate_to`].
    pub fn animate(
        &mut self,
        target: TransitionTarget,
        duration: Option<Duration>,
        pivot: &Transform,
        camera: &Transform,
        on_complete: Option<OnComplete>,
    ) -> TransitionId {
        let pose = RigPose::from_transforms(pivot, camera);
        self.controller
            .animate_to(target, duration, &pose, on_complete)
    }

    /// Tick every rig on the fixed step. Sends [`RequestRedraw`] when a rig moved, and
    /// [`TransitionFinished`] when a transition completed.
    pub fn update_rigs(
        mut rigs: Query<(Entity, &mut CameraRig, &mut RigInput, &mut Transform)>,
        mut others: Query<&mut Transform, Without<CameraRig>>,
        scene: Res<SceneColliders>,
        time: Res<Time>,
        mut finished: EventWriter<TransitionFinished>,
        mut redraw: EventWriter<RequestRedraw>,
    ) {
        let dt = time.delta();
        let world: &dyn CollisionWorld = &scene.0;

        for (entity, mut rig, mut input, mut camera) in &mut rigs {
            let frame = *input;
            if frame.pointer_delta != bevy_math::Vec2::ZERO || frame.scroll != 0.0 {
                input.take();
            }
            if rig.is_paused() {
                continue;
            }

            let CameraRig {
                pivot,
                subject,
                controller,
            } = &mut *rig;
            let Some((done, moved)) =
                with_pose(*pivot, *subject, &mut camera, &mut others, |pose, subject| {
                    controller.tick(frame, dt, pose, subject, Some(world))
                })
            else {
                continue;
            };

            if moved {
                redraw.send(RequestRedraw);
            }
            if let Some(done) = done {
                finished.send(TransitionFinished {
                    camera: entity,
                    id: done.id,
                    mode: done.mode,
                });
            }
        }
    }
}

/// Run `f` on the pose of a rig, then write the pivot, camera and subject back only if they changed.
/// Returns `None`, and does nothing, when the pivot entity is missing.
fn with_pose<R>(
    pivot: Entity,
    subject: Option<Entity>,
    camera: &mut Mut<Transform>,
    others: &mut Query<&mut Transform, Without<CameraRig>>,
    f: impl FnOnce(&mut RigPose, Option<&mut Transform>) -> R,
) -> Option<(R, bool)> {
    let tracked = subject.filter(|&subject| subject != pivot && others.contains(subject));
    if subject.is_some() && tracked.is_none() {
        warn_once!("camera rig subject {subject:?} has no Transform or is the pivot, ignoring it");
    }

    let (mut pivot_transform, subject_transform) = match tracked {
        Some(subject) => {
            let Ok([pivot_transform, subject_transform]) = others.get_many_mut([pivot, subject])
            else {
                warn_once!("camera rig pivot {pivot:?} has no Transform");
                return None;
            };
            (pivot_transform, Some(subject_transform))
        }
        None => {
            let Ok(pivot_transform) = others.get_mut(pivot) else {
                warn_once!("camera rig pivot {pivot:?} has no Transform");
                return None;
            };
            (pivot_transform, None)
        }
    };

    let before = RigPose::from_transforms(&pivot_transform, camera);
    let mut pose = before;
    let mut subject_copy = subject_transform.as_deref().copied();
    let out = f(&mut pose, subject_copy.as_mut());

    let moved = pose != before;
    if moved {
        pose.write(&mut pivot_transform, camera);
    }
    if let (Some(mut subject_transform), Some(copy)) = (subject_transform, subject_copy) {
        subject_transform.set_if_neq(copy);
    }
    Some((out, moved))
}

/// Send this event to hand a camera over to another behavior with an animated transition. See
/// [`ModeController::switch_to`] for the defaults used when `target` or `duration` are missing.
#[derive(Debug, Clone, Event)]
pub struct SwitchCameraMode {
    /// The camera to switch.
    pub camera: Entity,
    /// The behavior to switch to.
    pub mode: CameraMode,
    /// Where the transition ends.
    pub target: Option<TransitionTarget>,
    /// How long the transition takes.
    pub duration: Option<Duration>,
}

impl SwitchCameraMode {
    /// Apply switch requests sent this frame.
    pub fn receive(
        mut events: EventReader<Self>,
        mut rigs: Query<(&mut CameraRig, &mut Transform)>,
        mut others: Query<&mut Transform, Without<CameraRig>>,
        mut redraw: EventWriter<RequestRedraw>,
    ) {
        for event in events.read() {
            let Ok((mut rig, mut camera)) = rigs.get_mut(event.camera) else {
                warn_once!("camera mode switch sent to {:?}, which has no CameraRig", event.camera);
                continue;
            };
            let CameraRig {
                pivot,
                subject,
                controller,
            } = &mut *rig;
            if let Some((Some(_), _)) =
                with_pose(*pivot, *subject, &mut camera, &mut others, |pose, subject| {
                    controller.switch_to(
                        event.mode,
                        event.target,
                        event.duration,
                        pose,
                        subject.as_deref(),
                        None,
                    )
                })
            {
                redraw.send(RequestRedraw);
            }
        }
    }
}

/// Send this event to animate a camera to a new pose without changing its behavior.
#[derive(Debug, Clone, Event)]
pub struct AnimateCameraTo {
    /// The camera to move.
    pub camera: Entity,
    /// Where the animation ends.
    pub target: TransitionTarget,
    /// How long the animation takes, [`TransitionSettings::default_duration`] if `None`.
    pub duration: Option<Duration>,
}

impl AnimateCameraTo {
    /// Start animations requested this frame.
    pub fn receive(
        mut events: EventReader<Self>,
        mut rigs: Query<(&mut CameraRig, &Transform)>,
        others: Query<&Transform, Without<CameraRig>>,
        mut redraw: EventWriter<RequestRedraw>,
    ) {
        for event in events.read() {
            let Ok((mut rig, camera)) = rigs.get_mut(event.camera) else {
                warn_once!("camera animation sent to {:?}, which has no CameraRig", event.camera);
                continue;
            };
            let Ok(pivot) = others.get(rig.pivot) else {
                warn_once!("camera rig pivot {:?} has no Transform", rig.pivot);
                continue;
            };
            rig.animate(event.target, event.duration, pivot, camera, None);
            redraw.send(RequestRedraw);
        }
    }
}

/// Send this event when the application pauses or resumes. Paused rigs do no per-tick work at all.
#[derive(Debug, Clone, Copy, Event)]
pub struct CameraPause {
    /// Is the application paused?
    pub paused: bool,
}

impl CameraPause {
    /// Apply the latest pause state to every rig.
    pub fn receive(mut events: EventReader<Self>, mut rigs: Query<&mut CameraRig>) {
        let Some(latest) = events.read().last() else {
            return;
        };
        for mut rig in &mut rigs {
            if rig.is_paused() != latest.paused {
                rig.set_paused(latest.paused);
            }
        }
    }
}

/// Sent once for every transition that reached its target. Cancelled transitions never send it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Event)]
pub struct TransitionFinished {
    /// The camera that finished moving.
    pub camera: Entity,
    /// The transition that finished.
    pub id: TransitionId,
    /// The camera's active behavior after the transition.
    pub mode: CameraMode,
}

#[cfg(test)]
mod tests {
    use bevy_math::prelude::*;

    use super::*;
    use crate::controller::transition::CameraTarget;

    #[test]
    fn builders_configure_the_controller() {
        let pivot = Entity::from_raw(7);
        let rig = CameraRig::new(pivot)
            .with_mode(CameraMode::FirstPerson)
            .with_probe(None)
            .with_distance_policy(DistancePolicy::Shifted {
                max_offset: Vec2::new(1.0, 0.0),
            })
            .with_distance(DistanceSettings {
                scroll_sensitivity: 1.0,
                ..Default::default()
            });
        assert_eq!(rig.pivot, pivot);
        assert_eq!(rig.mode(), CameraMode::FirstPerson);
        assert!(rig.probe.is_none());
        assert_eq!(rig.distance.settings.scroll_sensitivity, 1.0);
        assert!(matches!(
            rig.distance.policy,
            DistancePolicy::Shifted { .. }
        ));
    }

    #[test]
    fn switch_mode_writes_only_on_change() {
        let mut rig = CameraRig::new(Entity::from_raw(1));
        let mut pivot = Transform::IDENTITY;
        let mut camera = Transform::from_xyz(0.0, 0.0, 5.0);
        assert!(rig
            .switch_mode(
                CameraMode::Orbit,
                None,
                None,
                &mut pivot,
                &mut camera,
                None,
                None
            )
            .is_none());
        assert_eq!(camera, Transform::from_xyz(0.0, 0.0, 5.0));

        let id = rig.switch_mode(
            CameraMode::FirstPerson,
            Some(TransitionTarget {
                pivot_translation: Vec3::Y,
                pivot_rotation: Quat::IDENTITY,
                camera: CameraTarget::LocalPosition(Vec3::ZERO),
            }),
            Some(Duration::from_secs(1)),
            &mut pivot,
            &mut camera,
            None,
            None,
        );
        assert!(id.is_some());
        assert_eq!(rig.pending_mode(), Some(CameraMode::FirstPerson));
    }
}
