//! Chooses which camera behavior is in control, and hands control over with an animated transition.
//!
//! Exactly one of the first-person look and the orbit receives per-tick input. Switching between
//! them starts a transition; for its whole duration neither behavior runs and input is dropped.
//! The incoming behavior takes over when the transition completes.

use std::time::Duration;

use bevy_log::prelude::*;
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use super::{
    collision::{CollisionProbe, CollisionWorld},
    distance::DistanceController,
    first_person::FirstPersonLook,
    inputs::RigInput,
    orbit::{OrbitRotation, OrbitState},
    transition::{
        CameraTarget, Completion, OnComplete, RigPose, TransitionAnimator, TransitionId,
        TransitionSettings, TransitionStatus, TransitionTarget,
    },
};

/// The camera behaviors a rig can switch between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub enum CameraMode {
    /// Mouse-look from the subject's head.
    FirstPerson,
    /// Orbit around the pivot with zoom and wall clipping protection.
    #[default]
    Orbit,
}

/// A transition that finished, and the mode that was active once it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedTransition {
    /// The transition that finished.
    pub id: TransitionId,
    /// The active mode after the transition.
    pub mode: CameraMode,
}

#[derive(Debug, Clone, Copy)]
struct PendingSwitch {
    mode: CameraMode,
    look: Option<OrbitState>,
}

/// State machine over the first-person and orbit behaviors of one camera.
#[derive(Debug)]
pub struct ModeController {
    /// The orbit behavior's rotation model.
    pub orbit: OrbitRotation,
    /// The orbit behavior's distance from the pivot.
    pub distance: DistanceController,
    /// Wall clipping protection. Without a probe the camera never collides.
    pub probe: Option<CollisionProbe>,
    /// The first-person behavior.
    pub first_person: FirstPersonLook,
    /// Defaults for transitions.
    pub transition: TransitionSettings,
    animator: TransitionAnimator,
    mode: CameraMode,
    pending: Option<PendingSwitch>,
    /// First-person rotation saved when first-person control was handed to the orbit.
    look_snapshot: Option<OrbitState>,
    paused: bool,
    initialized: bool,
    pivot_rotation: Quat,
}

impl Default for ModeController {
    fn default() -> Self {
        Self {
            orbit: OrbitRotation::default(),
            distance: DistanceController::default(),
            probe: Some(CollisionProbe::default()),
            first_person: FirstPersonLook::default(),
            transition: TransitionSettings::default(),
            animator: TransitionAnimator::default(),
            mode: CameraMode::default(),
            pending: None,
            look_snapshot: None,
            paused: false,
            initialized: false,
            pivot_rotation: Quat::IDENTITY,
        }
    }
}

impl ModeController {
    /// The behavior that currently receives input. Unchanged until a switch completes.
    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    /// Set the starting behavior. Has no effect once the controller has seen its first pose.
    pub fn set_initial_mode(&mut self, mode: CameraMode) {
        if !self.initialized {
            self.mode = mode;
        }
    }

    /// The mode being switched to, if a switch is in flight.
    pub fn pending_mode(&self) -> Option<CameraMode> {
        self.pending.map(|pending| pending.mode)
    }

    /// Is a transition running? Per-tick input is dropped while it is.
    pub fn is_transitioning(&self) -> bool {
        self.animator.is_running()
    }

    /// The running transition, if any.
    pub fn current_transition(&self) -> Option<TransitionId> {
        self.animator.current()
    }

    /// The transition animator.
    pub fn animator(&self) -> &TransitionAnimator {
        &self.animator
    }

    /// World orientation of the pivot as of the last tick.
    pub fn pivot_rotation(&self) -> Quat {
        self.pivot_rotation
    }

    /// Is the orbit rotated only while its button is held?
    pub fn is_controlled_on_button(&self) -> bool {
        self.orbit.settings.controlled_on_button
    }

    /// Is per-tick work frozen?
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freeze or resume all per-tick work, including transitions.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!("camera rig {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Has the controller adopted its starting pose yet?
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Adopt the pose as the starting state of every behavior. Only the first call has an effect.
    pub fn initialize(&mut self, pose: &RigPose) {
        if self.initialized {
            return;
        }
        self.distance.initialize(pose.camera_local);
        self.orbit.stop_current_rotation(pose.pivot_rotation);
        self.first_person.sync(pose.pivot_rotation);
        self.pivot_rotation = pose.pivot_rotation;
        self.initialized = true;
    }

    /// Switch the active behavior to `mode`, animating to `target` over `duration`.
    ///
    /// Does nothing when `mode` is already active and no transition is running. A switch that
    /// arrives mid-transition cancels the running one and starts from the current pose. Without a
    /// `target`, the first-person camera returns to the subject's head with its remembered view,
    /// and the orbit keeps the current pivot and returns to its starting distance. Without a
    /// `duration`, [`TransitionSettings::default_duration`] is used.
    pub fn switch_to(
        &mut self,
        mode: CameraMode,
        target: Option<TransitionTarget>,
        duration: Option<Duration>,
        pose: &mut RigPose,
        subject: Option<&Transform>,
        on_complete: Option<OnComplete>,
    ) -> Option<TransitionId> {
        if !self.animator.is_running() && self.mode == mode {
            debug!("camera already in {mode:?}");
            return None;
        }
        self.initialize(pose);

        let (target, look) = match mode {
            CameraMode::Orbit => {
                if self.mode == CameraMode::FirstPerson && self.look_snapshot.is_none() {
                    let look = self.first_person.take_rotation();
                    self.orbit.set_start_rotation(look, &mut pose.pivot_rotation);
                    self.look_snapshot = Some(look);
                }
                let target = target.unwrap_or(TransitionTarget {
                    pivot_translation: pose.pivot_translation,
                    pivot_rotation: pose.pivot_rotation,
                    camera: CameraTarget::Distance(self.default_orbit_distance()),
                });
                (target, None)
            }
            CameraMode::FirstPerson => {
                let look = self
                    .look_snapshot
                    .unwrap_or_else(|| OrbitState::from_rotation(pose.pivot_rotation));
                let target = target.unwrap_or_else(|| TransitionTarget {
                    pivot_translation: subject
                        .map(|subject| subject.translation + self.first_person.settings.head_offset)
                        .unwrap_or(pose.pivot_translation),
                    pivot_rotation: look.rotation(),
                    camera: CameraTarget::LocalPosition(Vec3::ZERO),
                });
                (target, Some(look))
            }
        };

        let duration = duration.unwrap_or(self.transition.default_duration);
        debug!("switching camera from {:?} to {mode:?}", self.mode);
        self.pending = Some(PendingSwitch { mode, look });
        Some(self.animator.start(
            *pose,
            target,
            duration,
            self.transition.curve.clone(),
            on_complete,
        ))
    }

    /// Animate the camera to `target` without changing the active behavior. Cancels any running
    /// transition, including a mode switch.
    pub fn animate_to(
        &mut self,
        target: TransitionTarget,
        duration: Option<Duration>,
        pose: &RigPose,
        on_complete: Option<OnComplete>,
    ) -> TransitionId {
        self.initialize(pose);
        self.abandon_pending();
        let duration = duration.unwrap_or(self.transition.default_duration);
        self.animator.start(
            *pose,
            target,
            duration,
            self.transition.curve.clone(),
            on_complete,
        )
    }

    /// Cancel the running transition where it is. Its completion callback is dropped and the active
    /// behavior resumes from the current pose.
    pub fn stop_transition(&mut self, pose: &RigPose) {
        if !self.animator.is_running() {
            return;
        }
        self.animator.stop();
        self.abandon_pending();
        self.reconcile(pose, false);
    }

    /// Drop the in-flight switch. Leaving first person is undone, so the look resumes from
    /// whatever pose the rig ends up in instead of the view saved for the switch.
    fn abandon_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        debug!("camera switch to {:?} abandoned", pending.mode);
        if self.mode == CameraMode::FirstPerson {
            if let Some(look) = self.look_snapshot.take() {
                self.first_person.restore_target(look);
            }
        }
    }

    /// Advance one fixed step.
    ///
    /// While paused nothing happens. While a transition runs it is stepped and `input` is dropped.
    /// Otherwise the active behavior consumes `input`. The finished transition is returned on
    /// the tick it completes, after its callback ran.
    pub fn tick(
        &mut self,
        input: RigInput,
        dt: Duration,
        pose: &mut RigPose,
        subject: Option<&mut Transform>,
        world: Option<&dyn CollisionWorld>,
    ) -> Option<FinishedTransition> {
        if self.paused {
            return None;
        }
        self.initialize(pose);

        let finished = if self.animator.is_running() {
            match self.animator.step(dt, pose) {
                TransitionStatus::Completed(completion) => Some(self.finish(completion, pose)),
                TransitionStatus::Running(_) | TransitionStatus::Idle => None,
            }
        } else {
            let dt = dt.as_secs_f32();
            match self.mode {
                CameraMode::FirstPerson => {
                    self.first_person.tick(input.pointer_delta, dt, pose, subject)
                }
                CameraMode::Orbit => self.tick_orbit(input, dt, pose, world),
            }
            None
        };
        self.pivot_rotation = pose.pivot_rotation;
        finished
    }

    fn tick_orbit(
        &mut self,
        input: RigInput,
        dt: f32,
        pose: &mut RigPose,
        world: Option<&dyn CollisionWorld>,
    ) {
        let gate = !self.orbit.settings.controlled_on_button || input.button_held;
        self.orbit
            .update(input.pointer_delta, gate, dt, &mut pose.pivot_rotation);

        let last_probe = self
            .probe
            .as_ref()
            .and_then(|probe| probe.last_result().copied());
        let requested = self.distance.requested_delta(input.scroll);
        let damping = self.distance.settings.scroll_dampening;
        let unclipped = self
            .distance
            .update(requested, damping, dt, last_probe.as_ref());

        if let Some(probe) = self.probe.as_mut() {
            let unclipped_pose = RigPose {
                camera_local: self.distance.local_position(),
                ..*pose
            };
            let result = probe.probe(
                world,
                pose.pivot_translation,
                unclipped_pose.camera_world(),
                unclipped,
                dt,
            );
            self.distance.apply_constraint(&result);
        }
        pose.camera_local = self.distance.local_position();
    }

    fn finish(&mut self, completion: Completion, pose: &mut RigPose) -> FinishedTransition {
        let switched = self.pending.take();
        if let Some(PendingSwitch { mode, look }) = switched {
            if mode == CameraMode::FirstPerson {
                self.orbit.reset();
                let look = look.unwrap_or_else(|| OrbitState::from_rotation(pose.pivot_rotation));
                self.first_person.set_rotation(look, pose);
                self.look_snapshot = None;
            }
            self.mode = mode;
            debug!("camera now in {mode:?}");
        }
        self.reconcile(pose, switched.is_some());

        let id = completion.id;
        completion.notify();
        FinishedTransition {
            id,
            mode: self.mode,
        }
    }

    /// Rebase the active behavior on a pose written from outside it.
    fn reconcile(&mut self, pose: &RigPose, switched: bool) {
        match self.mode {
            CameraMode::Orbit => {
                self.orbit.stop_current_rotation(pose.pivot_rotation);
                self.distance.stop_current_motion(pose.camera_local);
                self.distance.refresh_cam_pos(pose.camera_local);
            }
            CameraMode::FirstPerson if !switched && self.look_snapshot.is_none() => {
                self.first_person.sync(pose.pivot_rotation);
            }
            CameraMode::FirstPerson => {}
        }
        self.pivot_rotation = pose.pivot_rotation;
    }

    fn default_orbit_distance(&self) -> f32 {
        self.distance
            .settings
            .zoom_limits
            .clamp(self.distance.start_distance())
    }
}
