//! The core camera rig: behaviors, collision, transitions, and the plugin that schedules them.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_transform::TransformSystem;
use bevy_window::RequestRedraw;

pub mod collision;
pub mod component;
pub mod distance;
pub mod first_person;
pub mod inputs;
pub mod mode;
pub mod orbit;
pub mod picking;
pub mod smoothing;
pub mod transition;
pub mod zoom;

use collision::{gather_colliders, SceneColliders};
use component::{AnimateCameraTo, CameraPause, CameraRig, SwitchCameraMode, TransitionFinished};
use inputs::RigInput;

/// Adds [`CameraRig`] functionality to the app.
pub struct ThirdPersonCamPlugin;

/// System sets of the camera rig, in the order they run each frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SystemSet)]
pub enum RigSystems {
    /// Samples device input into [`RigInput`], in `PreUpdate`.
    Input,
    /// Ticks the rigs on the fixed step, in `FixedUpdate`.
    Update,
    /// Applies mode switch, animation, and pause requests, in `PostUpdate`.
    Requests,
}

impl Plugin for ThirdPersonCamPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneColliders>()
            .add_event::<SwitchCameraMode>()
            .add_event::<AnimateCameraTo>()
            .add_event::<CameraPause>()
            .add_event::<TransitionFinished>()
            .add_event::<RequestRedraw>()
            .add_systems(
                PreUpdate,
                RigInput::sample
                    .after(bevy_input::InputSystem)
                    .in_set(RigSystems::Input),
            )
            .add_systems(
                FixedUpdate,
                (gather_colliders, CameraRig::update_rigs)
                    .chain()
                    .in_set(RigSystems::Update),
            )
            // In PostUpdate so requests sent during Update are applied before transforms propagate.
            .add_systems(
                PostUpdate,
                (
                    CameraPause::receive,
                    SwitchCameraMode::receive,
                    AnimateCameraTo::receive,
                )
                    .chain()
                    .in_set(RigSystems::Requests)
                    .before(TransformSystem::TransformPropagate),
            )
            .register_type::<RigInput>()
            .register_type::<mode::CameraMode>()
            .register_type::<collision::ProbeCollider>()
            .register_type::<collision::ProbeIgnore>()
            .register_type::<collision::CollisionLayers>()
            .register_type::<orbit::OrbitSettings>()
            .register_type::<distance::DistanceSettings>()
            .register_type::<first_person::FirstPersonSettings>()
            .register_type::<collision::ProbeSettings>()
            .register_type::<transition::TransitionSettings>();
    }
}
