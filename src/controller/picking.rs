//! Read-only "what is the camera looking at" queries for interaction.

use bevy_ecs::prelude::*;
use bevy_math::prelude::*;
use bevy_render::prelude::*;
use bevy_transform::prelude::*;

use super::{
    collision::{CollisionLayers, CollisionWorld, RayHit},
    mode::CameraMode,
};

/// The ray interaction should test along. In first-person mode it is the view direction through
/// the center of the screen; in orbit mode it passes through the cursor, so there is no ray when
/// the cursor is outside the window.
pub fn interaction_ray(
    mode: CameraMode,
    camera: &Camera,
    camera_transform: &GlobalTransform,
    cursor: Option<Vec2>,
) -> Option<Ray3d> {
    match mode {
        CameraMode::FirstPerson => Some(Ray3d::new(
            camera_transform.translation(),
            camera_transform.forward(),
        )),
        CameraMode::Orbit => camera
            .viewport_to_world(camera_transform, cursor?)
            .ok(),
    }
}

/// The closest hit along `ray` within `max_distance`.
pub fn nearest_hit(world: &dyn CollisionWorld, ray: Ray3d, max_distance: f32) -> Option<RayHit> {
    world
        .cast_ray_all(ray, max_distance, CollisionLayers::NONE)
        .into_iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Is `target` the first thing `ray` hits within `max_distance`?
pub fn ray_hits(world: &dyn CollisionWorld, ray: Ray3d, max_distance: f32, target: Entity) -> bool {
    nearest_hit(world, ray, max_distance).is_some_and(|hit| hit.entity == Some(target))
}
