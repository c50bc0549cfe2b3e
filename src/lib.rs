//! A third-person camera rig for Bevy: orbit a pivot with damped rotation and zoom, keep the camera
//! out of walls, and hand over to a first-person view with animated transitions.
//!
//! # Getting Started
//!
//! Add the [`DefaultThirdPersonCamPlugins`] to your app, spawn a pivot entity, and spawn a camera
//! as its child with a [`CameraRig`](crate::controller::component::CameraRig) component pointing
//! at the pivot. Add [`ProbeCollider`](crate::controller::collision::ProbeCollider)s to the level
//! geometry the camera should not clip through.
//!
//! # Behaviors
//!
//! - **Orbit**: yaw/pitch around the pivot, damped toward the pointer input, optionally only while
//!   a mouse button is held. Scrolling zooms proportionally to the current distance, within
//!   [`ZoomLimits`](crate::controller::zoom::ZoomLimits).
//! - **First person**: mouse-look from the tracked subject's head, turning the subject in yaw.
//! - **Wall clipping protection**: every tick the
//!   [`CollisionProbe`](crate::controller::collision::CollisionProbe) checks whether the camera is
//!   inside geometry, and pulls it in front of the nearest obstruction along the pivot-camera ray.
//! - **Transitions**: switching behavior, or refocusing the camera, animates the pivot and camera
//!   over time. Only one transition runs at a time; a new request cancels the old one.
//!
//! # Scheduling
//!
//! Input is sampled every frame in `PreUpdate`, and consumed on the fixed step in `FixedUpdate` so
//! damping does not depend on the frame rate. Requests sent as events are applied in `PostUpdate`.

#![warn(missing_docs)]

pub mod controller;
pub mod extensions;

/// Common imports.
pub mod prelude {
    pub use crate::{
        controller::{
            collision::{
                CollisionLayers, CollisionProbe, CollisionWorld, ProbeCollider, ProbeIgnore,
                ProbeResult, ProbeSettings,
            },
            component::{
                AnimateCameraTo, CameraPause, CameraRig, SwitchCameraMode, TransitionFinished,
            },
            distance::{DistancePolicy, DistanceSettings},
            first_person::FirstPersonSettings,
            inputs::RigInput,
            mode::{CameraMode, ModeController},
            orbit::{OrbitSettings, OrbitState},
            transition::{
                CameraTarget, OnComplete, RigPose, TransitionCurve, TransitionId,
                TransitionSettings, TransitionTarget,
            },
            zoom::ZoomLimits,
            ThirdPersonCamPlugin,
        },
        DefaultThirdPersonCamPlugins,
    };
}

/// Adds [`ThirdPersonCamPlugin`](crate::controller::ThirdPersonCamPlugin) and the default
/// extensions.
pub struct DefaultThirdPersonCamPlugins;

impl bevy_app::PluginGroup for DefaultThirdPersonCamPlugins {
    #[allow(clippy::let_and_return)]
    fn build(self) -> bevy_app::PluginGroupBuilder {
        let group = bevy_app::PluginGroupBuilder::start::<Self>()
            .add(crate::controller::ThirdPersonCamPlugin)
            .add(crate::extensions::cursor_lock::CursorLockPlugin);

        #[cfg(feature = "extension_pivot_indicator")]
        let group = group.add(crate::extensions::pivot_indicator::PivotIndicatorPlugin);

        group
    }
}
