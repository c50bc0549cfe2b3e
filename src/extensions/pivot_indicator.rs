//! A `bevy_third_person_cam` extension that draws the pivot while the orbit is being rotated. The
//! arm from the pivot to the camera is drawn too, and where the probe pulled the camera in front of
//! a wall, the clipping point is marked.

use bevy_app::prelude::*;
use bevy_color::{Alpha, Color};
use bevy_ecs::prelude::*;
use bevy_gizmos::prelude::*;
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use crate::prelude::*;

/// See the [module](self) docs.
pub struct PivotIndicatorPlugin;

impl Plugin for PivotIndicatorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            draw_pivot.after(bevy_transform::TransformSystem::TransformPropagate),
        )
        .register_type::<PivotIndicator>();
    }
}

/// Optional. Configures whether or not a [`CameraRig`] should show its pivot while orbiting. The
/// indicator will be enabled if this component is not present.
#[derive(Debug, Component, Reflect)]
pub struct PivotIndicator {
    /// Should the indicator be visible on this camera?
    pub enabled: bool,
}

impl Default for PivotIndicator {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Is the rig's orbit being steered right now?
fn is_orbiting(rig: &CameraRig, input: &RigInput) -> bool {
    rig.mode() == CameraMode::Orbit
        && !rig.is_transitioning()
        && (!rig.is_controlled_on_button() || input.button_held)
}

/// Use gizmos to draw the pivot, the camera arm, and the clipping point in world space.
pub fn draw_pivot(
    rigs: Query<(
        &CameraRig,
        &RigInput,
        &GlobalTransform,
        Option<&PivotIndicator>,
    )>,
    pivots: Query<&GlobalTransform, Without<CameraRig>>,
    mut gizmos: Gizmos,
) {
    for (rig, input, cam_transform, _) in rigs
        .iter()
        .filter(|(.., indicator)| indicator.map(|i| i.enabled).unwrap_or(true))
    {
        if !is_orbiting(rig, input) {
            continue;
        }
        let Ok(pivot) = pivots.get(rig.pivot) else {
            continue;
        };
        let pivot = pivot.translation();
        let camera = cam_transform.translation();
        let scale = camera.distance(pivot).max(1.0) * 0.015;
        let white = Color::srgb(1.0, 1.0, 1.0);

        let facing = Isometry3d::new(pivot, cam_transform.rotation());
        gizmos.circle(facing, scale, white);
        gizmos.line(pivot, camera, white.with_alpha(0.3));

        let Some(probe) = rig.probe.as_ref() else {
            continue;
        };
        let Some(result) = probe.last_result().filter(|result| result.hit) else {
            continue;
        };
        let Ok(direction) = Dir3::new(camera - pivot) else {
            continue;
        };
        let clip_point = pivot + *direction * result.clip_distance;
        gizmos.sphere(
            Isometry3d::from_translation(clip_point),
            scale * 0.5,
            Color::srgb(1.0, 0.3, 0.2),
        );
    }
}
