//! Time driven blends of the pivot and camera from one pose to another.
//!
//! A [`TransitionAnimator`] holds at most one running job. Starting a new job replaces the old
//! one, and the replaced job's completion callback is dropped without being called. Each fixed
//! step the owner calls [`TransitionAnimator::step`], which writes the blended pose until the
//! duration has elapsed, then lands exactly on the target and hands back a [`Completion`].

use std::time::Duration;

use bevy_log::prelude::*;
use bevy_math::{cubic_splines::CubicSegment, prelude::*};
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

/// The two transforms the rig writes: the pivot in world space, and the camera relative to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigPose {
    /// World position of the pivot.
    pub pivot_translation: Vec3,
    /// World orientation of the pivot.
    pub pivot_rotation: Quat,
    /// Camera position relative to the pivot. The camera looks down the pivot's -Z axis, so the
    /// distance from the pivot is the `z` component.
    pub camera_local: Vec3,
}

impl Default for RigPose {
    fn default() -> Self {
        Self {
            pivot_translation: Vec3::ZERO,
            pivot_rotation: Quat::IDENTITY,
            camera_local: Vec3::ZERO,
        }
    }
}

impl RigPose {
    /// Read a pose from the pivot's transform and the camera's local transform.
    pub fn from_transforms(pivot: &Transform, camera: &Transform) -> Self {
        Self {
            pivot_translation: pivot.translation,
            pivot_rotation: pivot.rotation,
            camera_local: camera.translation,
        }
    }

    /// Write this pose back into the pivot and camera transforms.
    pub fn write(&self, pivot: &mut Transform, camera: &mut Transform) {
        pivot.translation = self.pivot_translation;
        pivot.rotation = self.pivot_rotation;
        camera.translation = self.camera_local;
    }

    /// World position of the camera.
    pub fn camera_world(&self) -> Vec3 {
        self.pivot_translation + self.pivot_rotation * self.camera_local
    }
}

/// How the camera's local offset is blended during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum CameraTarget {
    /// Blend the whole local offset toward this position.
    LocalPosition(Vec3),
    /// Blend only the distance from the pivot, keeping the lateral offset.
    Distance(f32),
}

/// Where a transition ends.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct TransitionTarget {
    /// Final world position of the pivot.
    pub pivot_translation: Vec3,
    /// Final world orientation of the pivot.
    pub pivot_rotation: Quat,
    /// Final camera offset.
    pub camera: CameraTarget,
}

impl TransitionTarget {
    /// A target that holds the given pose.
    pub fn from_pose(pose: &RigPose) -> Self {
        Self {
            pivot_translation: pose.pivot_translation,
            pivot_rotation: pose.pivot_rotation,
            camera: CameraTarget::LocalPosition(pose.camera_local),
        }
    }

    /// Look from a [`Transform`] acting as the pivot, with the camera at `camera_local`.
    pub fn from_pivot(pivot: &Transform, camera_local: Vec3) -> Self {
        Self {
            pivot_translation: pivot.translation,
            pivot_rotation: pivot.rotation,
            camera: CameraTarget::LocalPosition(camera_local),
        }
    }

    fn resolve(&self, start: &RigPose) -> RigPose {
        RigPose {
            pivot_translation: self.pivot_translation,
            pivot_rotation: self.pivot_rotation.normalize(),
            camera_local: match self.camera {
                CameraTarget::LocalPosition(local) => local,
                CameraTarget::Distance(distance) => start.camera_local.truncate().extend(distance),
            },
        }
    }
}

/// Easing applied to the normalized progress of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionCurve {
    /// No easing.
    Linear,
    /// A cubic bezier easing curve.
    Cubic(CubicSegment<Vec2>),
}

impl Default for TransitionCurve {
    fn default() -> Self {
        Self::Cubic(CubicSegment::new_bezier((0.42, 0.0), (0.58, 1.0)))
    }
}

impl TransitionCurve {
    /// Eased progress for a normalized time, which is clamped to `[0, 1]` first.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
        match self {
            TransitionCurve::Linear => t,
            TransitionCurve::Cubic(segment) => segment.ease(t),
        }
    }
}

/// Defaults for transitions started without an explicit duration or curve.
#[derive(Debug, Clone, Reflect)]
pub struct TransitionSettings {
    /// Duration used when a transition request does not give one.
    pub default_duration: Duration,
    /// Easing of every transition.
    #[reflect(ignore)]
    pub curve: TransitionCurve,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            default_duration: Duration::from_secs(2),
            curve: TransitionCurve::default(),
        }
    }
}

/// Called once when a transition finishes. Never called for a cancelled transition.
pub type OnComplete = Box<dyn FnOnce() + Send + Sync>;

/// Identifies one started transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct TransitionId(pub u64);

/// Lifecycle of the animator's most recent job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum TransitionState {
    /// No job was ever started.
    #[default]
    Idle,
    /// A job is blending the pose.
    Running,
    /// The last job reached its target.
    Completed,
    /// The last job was stopped or replaced before reaching its target.
    Cancelled,
}

/// A finished transition. Dropping it discards the callback; [`Completion::notify`] runs it.
pub struct Completion {
    /// The job that finished.
    pub id: TransitionId,
    callback: Option<OnComplete>,
}

impl Completion {
    /// Run the completion callback, consuming it.
    pub fn notify(self) {
        if let Some(callback) = self.callback {
            callback();
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.id)
            .field("callback", &self.callback.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// Result of advancing the animator by one step.
#[derive(Debug)]
pub enum TransitionStatus {
    /// Nothing is running.
    Idle,
    /// The job is still blending. Holds the eased progress.
    Running(f32),
    /// The job just reached its target.
    Completed(Completion),
}

struct TransitionJob {
    id: TransitionId,
    start: RigPose,
    target: RigPose,
    camera: CameraTarget,
    duration: Duration,
    curve: TransitionCurve,
    elapsed: Duration,
    on_complete: Option<OnComplete>,
}

impl TransitionJob {
    fn sample(&self, t: f32) -> RigPose {
        let camera_local = match self.camera {
            CameraTarget::LocalPosition(_) => {
                self.start.camera_local.lerp(self.target.camera_local, t)
            }
            CameraTarget::Distance(distance) => self
                .start
                .camera_local
                .truncate()
                .extend(self.start.camera_local.z.lerp(distance, t)),
        };
        RigPose {
            pivot_translation: self
                .start
                .pivot_translation
                .lerp(self.target.pivot_translation, t),
            pivot_rotation: self
                .start
                .pivot_rotation
                .normalize()
                .slerp(self.target.pivot_rotation, t)
                .normalize(),
            camera_local,
        }
    }
}

/// Owns the single running transition of a rig.
#[derive(Default)]
pub struct TransitionAnimator {
    job: Option<TransitionJob>,
    state: TransitionState,
    next_id: u64,
}

impl std::fmt::Debug for TransitionAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionAnimator")
            .field("state", &self.state)
            .field("job", &self.job.as_ref().map(|job| job.id))
            .finish()
    }
}

impl TransitionAnimator {
    /// Lifecycle state of the latest job.
    pub fn state(&self) -> TransitionState {
        self.state
    }

    /// Is a job currently blending the pose?
    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    /// The id of the running job.
    pub fn current(&self) -> Option<TransitionId> {
        self.job.as_ref().map(|job| job.id)
    }

    /// Progress of the running job in `[0, 1]`, before easing.
    pub fn progress(&self) -> Option<f32> {
        self.job.as_ref().map(|job| {
            if job.duration.is_zero() {
                0.0
            } else {
                (job.elapsed.as_secs_f32() / job.duration.as_secs_f32()).clamp(0.0, 1.0)
            }
        })
    }

    /// Begin blending from `current` to `target`. A running job is cancelled first and its callback
    /// dropped. A zero `duration` lands on the target at the next step.
    pub fn start(
        &mut self,
        current: RigPose,
        target: TransitionTarget,
        duration: Duration,
        curve: TransitionCurve,
        on_complete: Option<OnComplete>,
    ) -> TransitionId {
        self.stop();
        let id = TransitionId(self.next_id);
        self.next_id += 1;
        debug!("starting camera transition {id:?} over {duration:?}");
        self.job = Some(TransitionJob {
            id,
            start: current,
            target: target.resolve(&current),
            camera: target.camera,
            duration,
            curve,
            elapsed: Duration::ZERO,
            on_complete,
        });
        self.state = TransitionState::Running;
        id
    }

    /// Cancel the running job without calling its completion callback.
    pub fn stop(&mut self) {
        if let Some(job) = self.job.take() {
            debug!("cancelled camera transition {:?}", job.id);
            self.state = TransitionState::Cancelled;
        }
    }

    /// Advance the running job by `dt` and write the blended pose.
    pub fn step(&mut self, dt: Duration, pose: &mut RigPose) -> TransitionStatus {
        let Some(job) = self.job.as_mut() else {
            return TransitionStatus::Idle;
        };
        job.elapsed = job.elapsed.saturating_add(dt);

        if job.elapsed >= job.duration {
            *pose = job.target;
            self.state = TransitionState::Completed;
            let Some(job) = self.job.take() else {
                return TransitionStatus::Idle;
            };
            debug!("finished camera transition {:?}", job.id);
            return TransitionStatus::Completed(Completion {
                id: job.id,
                callback: job.on_complete,
            });
        }

        let t = job
            .curve
            .evaluate(job.elapsed.as_secs_f32() / job.duration.as_secs_f32());
        *pose = job.sample(t);
        TransitionStatus::Running(t)
    }
}
