//! Keeps the camera from clipping through level geometry.
//!
//! The [`CollisionProbe`] asks a [`CollisionWorld`] whether the camera is inside something, and if
//! so, casts from the pivot toward the camera to find how close the camera must come to see the
//! pivot unobstructed. Any physics backend can implement [`CollisionWorld`]; the crate ships a
//! small one, [`ColliderSet`], fed from [`ProbeCollider`] components.

use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_math::{
    bounding::{Aabb3d, BoundingSphere, IntersectsVolume, RayCast3d},
    prelude::*,
};
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use super::smoothing::smooth_damp;

/// A bitmask of collision layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect)]
pub struct CollisionLayers(pub u32);

impl CollisionLayers {
    /// No layers.
    pub const NONE: Self = Self(0);
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// The default layer that colliders are placed on.
    pub const DEFAULT: Self = Self(1);

    /// A mask containing only layer `index` (`0..32`).
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index % 32))
    }

    /// Do these masks share any layer?
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Combine two masks.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// One intersection of a ray with a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The entity owning the collider, if it came from the ECS.
    pub entity: Option<Entity>,
    /// Distance along the ray.
    pub distance: f32,
    /// World space point of the hit.
    pub point: Vec3,
}

/// Geometric queries the probe needs from the scene.
///
/// `ignore` holds the layers the query must not report.
pub trait CollisionWorld {
    /// Does any collider overlap the sphere?
    fn overlaps_sphere(&self, center: Vec3, radius: f32, ignore: CollisionLayers) -> bool;

    /// Every intersection along the ray up to `max_distance`, in no particular order.
    fn cast_ray_all(&self, ray: Ray3d, max_distance: f32, ignore: CollisionLayers) -> Vec<RayHit>;
}

/// Collider geometry, in the collider's local space.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum ColliderShape {
    /// A sphere centered on the origin.
    Sphere {
        /// Sphere radius.
        radius: f32,
    },
    /// A box centered on the origin.
    Cuboid {
        /// Half of the box size on each axis.
        half_size: Vec3,
    },
}

impl ColliderShape {
    fn scaled(self, scale: Vec3) -> Self {
        match self {
            ColliderShape::Sphere { radius } => ColliderShape::Sphere {
                radius: radius * scale.abs().max_element(),
            },
            ColliderShape::Cuboid { half_size } => ColliderShape::Cuboid {
                half_size: half_size * scale.abs(),
            },
        }
    }
}

/// A collider placed in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedCollider {
    /// Owning entity, if any.
    pub entity: Option<Entity>,
    /// Shape with scale already applied.
    pub shape: ColliderShape,
    /// World position of the shape's center.
    pub translation: Vec3,
    /// World orientation of the shape.
    pub rotation: Quat,
    /// Layers this collider is on.
    pub layers: CollisionLayers,
}

impl PlacedCollider {
    /// Place an axis aligned box spanning `min..max`.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        Self {
            entity: None,
            shape: ColliderShape::Cuboid {
                half_size: (max - min).abs() / 2.0,
            },
            translation: (min + max) / 2.0,
            rotation: Quat::IDENTITY,
            layers: CollisionLayers::DEFAULT,
        }
    }

    /// Place a sphere.
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self {
            entity: None,
            shape: ColliderShape::Sphere { radius },
            translation: center,
            rotation: Quat::IDENTITY,
            layers: CollisionLayers::DEFAULT,
        }
    }

    /// Set the owning entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Set the collision layers.
    pub fn with_layers(mut self, layers: CollisionLayers) -> Self {
        self.layers = layers;
        self
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let local = self.rotation.inverse() * (center - self.translation);
        let probe = BoundingSphere::new(local, radius);
        match self.shape {
            ColliderShape::Sphere { radius } => {
                BoundingSphere::new(Vec3::ZERO, radius).intersects(&probe)
            }
            ColliderShape::Cuboid { half_size } => {
                Aabb3d::new(Vec3::ZERO, half_size).intersects(&probe)
            }
        }
    }

    fn ray_distance(&self, ray: Ray3d, max_distance: f32) -> Option<f32> {
        let inverse = self.rotation.inverse();
        let origin = inverse * (ray.origin - self.translation);
        let direction = Dir3::new(inverse * *ray.direction).ok()?;
        let cast = RayCast3d::new(origin, direction, max_distance);
        match self.shape {
            ColliderShape::Sphere { radius } => {
                cast.sphere_intersection_at(&BoundingSphere::new(Vec3::ZERO, radius))
            }
            ColliderShape::Cuboid { half_size } => {
                cast.aabb_intersection_at(&Aabb3d::new(Vec3::ZERO, half_size))
            }
        }
    }
}

/// A flat list of colliders, queried by brute force.
#[derive(Debug, Clone, Default)]
pub struct ColliderSet {
    colliders: Vec<PlacedCollider>,
}

impl ColliderSet {
    /// Add a collider.
    pub fn push(&mut self, collider: PlacedCollider) {
        self.colliders.push(collider);
    }

    /// Remove every collider.
    pub fn clear(&mut self) {
        self.colliders.clear();
    }

    /// Number of colliders.
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn visible(&self, ignore: CollisionLayers) -> impl Iterator<Item = &PlacedCollider> {
        self.colliders
            .iter()
            .filter(move |collider| !collider.layers.intersects(ignore))
    }
}

impl FromIterator<PlacedCollider> for ColliderSet {
    fn from_iter<T: IntoIterator<Item = PlacedCollider>>(iter: T) -> Self {
        Self {
            colliders: iter.into_iter().collect(),
        }
    }
}

impl CollisionWorld for ColliderSet {
    fn overlaps_sphere(&self, center: Vec3, radius: f32, ignore: CollisionLayers) -> bool {
        self.visible(ignore)
            .any(|collider| collider.overlaps_sphere(center, radius))
    }

    fn cast_ray_all(&self, ray: Ray3d, max_distance: f32, ignore: CollisionLayers) -> Vec<RayHit> {
        self.visible(ignore)
            .filter_map(|collider| {
                let distance = collider.ray_distance(ray, max_distance)?;
                Some(RayHit {
                    entity: collider.entity,
                    distance,
                    point: ray.get_point(distance),
                })
            })
            .collect()
    }
}

/// Marks an entity as solid for the camera's [`CollisionProbe`].
#[derive(Debug, Clone, Component, Reflect)]
#[require(Transform)]
pub struct ProbeCollider {
    /// Collider geometry in the entity's local space.
    pub shape: ColliderShape,
    /// Layers the collider is on.
    pub layers: CollisionLayers,
}

impl ProbeCollider {
    /// A box collider with the given half size, on the default layer.
    pub fn cuboid(half_size: Vec3) -> Self {
        Self {
            shape: ColliderShape::Cuboid { half_size },
            layers: CollisionLayers::DEFAULT,
        }
    }

    /// A sphere collider on the default layer.
    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
            layers: CollisionLayers::DEFAULT,
        }
    }
}

/// Colliders on entities with this marker are never seen by the probe. Put it on the tracked
/// subject so the camera does not avoid the character it follows.
#[derive(Debug, Clone, Copy, Default, Component, Reflect)]
pub struct ProbeIgnore;

/// The scene's colliders as of the current fixed step.
#[derive(Debug, Default, Resource, Deref, DerefMut)]
pub struct SceneColliders(pub ColliderSet);

/// Rebuild [`SceneColliders`] from [`ProbeCollider`] components.
pub fn gather_colliders(
    mut scene: ResMut<SceneColliders>,
    colliders: Query<(Entity, &ProbeCollider, &GlobalTransform), Without<ProbeIgnore>>,
) {
    scene.clear();
    for (entity, collider, transform) in &colliders {
        let (scale, rotation, translation) = transform.to_scale_rotation_translation();
        scene.push(PlacedCollider {
            entity: Some(entity),
            shape: collider.shape.scaled(scale),
            translation,
            rotation,
            layers: collider.layers,
        });
    }
}

/// Outcome of one collision probe.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ProbeResult {
    /// Did the probe find the camera obstructed this tick?
    pub hit: bool,
    /// The distance the camera should use this tick. Equals the unclipped distance when nothing was
    /// hit, otherwise the smoothed approach toward [`ProbeResult::clip_distance`].
    pub safe_distance: f32,
    /// The unsmoothed distance at which the camera clears the nearest obstruction.
    pub clip_distance: f32,
}

impl ProbeResult {
    fn clear(distance: f32) -> Self {
        Self {
            hit: false,
            safe_distance: distance,
            clip_distance: distance,
        }
    }
}

/// Tunables of the collision probe.
#[derive(Debug, Clone, Reflect)]
pub struct ProbeSettings {
    /// Radius of the overlap test at the camera, and the margin added to the ray.
    pub probe_radius: f32,
    /// Smallest allowed gap between the camera and an obstruction, along the ray.
    pub min_clearance: f32,
    /// Seconds to pull the camera in front of a new obstruction.
    pub tighten_time: f32,
    /// Seconds to let the camera back out toward its unclipped distance.
    pub relax_time: f32,
    /// Layers the probe never collides with.
    pub ignore_layers: CollisionLayers,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            probe_radius: 0.1,
            min_clearance: 0.5,
            tighten_time: 0.05,
            relax_time: 0.4,
            ignore_layers: CollisionLayers::NONE,
        }
    }
}

/// Computes a distance at which the camera does not clip geometry between it and the pivot.
#[derive(Debug, Clone, Default)]
pub struct CollisionProbe {
    /// Probe tunables.
    pub settings: ProbeSettings,
    velocity: f32,
    last: Option<ProbeResult>,
}

impl CollisionProbe {
    /// Create a probe with the given settings.
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings,
            velocity: 0.0,
            last: None,
        }
    }

    /// The result of the previous probe, if any.
    pub fn last_result(&self) -> Option<&ProbeResult> {
        self.last.as_ref()
    }

    /// Is the camera currently obstructed?
    pub fn hit_something(&self) -> bool {
        self.last.is_some_and(|last| last.hit)
    }

    /// Probe from `pivot` toward `camera`.
    ///
    /// `unclipped` is the distance the camera would like to be at. Without a `world` the probe never
    /// hits anything. When the camera sits on the pivot there is no direction to probe along, so the
    /// previous result is reused.
    pub fn probe(
        &mut self,
        world: Option<&dyn CollisionWorld>,
        pivot: Vec3,
        camera: Vec3,
        unclipped: f32,
        dt: f32,
    ) -> ProbeResult {
        let result = self.compute(world, pivot, camera, unclipped, dt);
        trace!("camera probe: {result:?}");
        self.last = Some(result);
        result
    }

    fn compute(
        &mut self,
        world: Option<&dyn CollisionWorld>,
        pivot: Vec3,
        camera: Vec3,
        unclipped: f32,
        dt: f32,
    ) -> ProbeResult {
        let Some(world) = world else {
            return ProbeResult::clear(unclipped);
        };
        let Ok(direction) = Dir3::new(camera - pivot) else {
            return self.last.unwrap_or(ProbeResult::clear(unclipped));
        };
        let settings = &self.settings;

        if !world.overlaps_sphere(camera, settings.probe_radius, settings.ignore_layers) {
            self.velocity = 0.0;
            return ProbeResult::clear(unclipped);
        }

        // Start just past the pivot so the ray does not report the pivot's own surroundings.
        let ray = Ray3d::new(pivot + *direction * settings.probe_radius, direction);
        let mut hits = world.cast_ray_all(
            ray,
            unclipped + settings.probe_radius,
            settings.ignore_layers,
        );
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let clip_distance = hits
            .first()
            .map(|nearest| (pivot.distance(nearest.point) - settings.min_clearance).max(0.0))
            .unwrap_or(unclipped)
            .min(unclipped);

        let smooth_time = if unclipped > clip_distance {
            settings.tighten_time
        } else {
            settings.relax_time
        };
        let safe_distance =
            smooth_damp(unclipped, clip_distance, &mut self.velocity, smooth_time, dt);

        ProbeResult {
            hit: true,
            safe_distance,
            clip_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A slab filling `3..20` along +Z, so a camera at `z = 10` sits inside it.
    fn wall() -> ColliderSet {
        [PlacedCollider::cuboid(
            Vec3::new(-5.0, -5.0, 3.0),
            Vec3::new(5.0, 5.0, 20.0),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn clear_camera_reports_no_hit() {
        let world = wall();
        let mut probe = CollisionProbe::default();
        let result = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 2.0, 0.02);
        assert_eq!(result, ProbeResult::clear(2.0));
        assert!(!probe.hit_something());
    }

    #[test]
    fn occluder_sets_clip_distance_regardless_of_zoom() {
        let world = wall();
        for unclipped in [5.0, 10.0, 15.0] {
            let mut probe = CollisionProbe::default();
            let camera = Vec3::new(0.0, 0.0, unclipped);
            let result = probe.probe(Some(&world), Vec3::ZERO, camera, unclipped, 0.02);
            assert!(result.hit);
            assert!((result.clip_distance - 2.5).abs() < 1e-4);
            assert!(result.safe_distance < unclipped);
            assert!(result.safe_distance >= 2.5);
        }
    }

    #[test]
    fn camera_settles_in_front_of_wall() {
        let world = wall();
        let mut probe = CollisionProbe::default();
        let mut distance = 10.0;
        for _ in 0..200 {
            let camera = Vec3::new(0.0, 0.0, distance);
            distance = probe
                .probe(Some(&world), Vec3::ZERO, camera, distance, 1.0 / 50.0)
                .safe_distance;
        }
        assert!((2.5..3.0).contains(&distance), "settled at {distance}");
    }

    #[test]
    fn overlapping_colliders_use_the_nearest_hit() {
        let world: ColliderSet = [
            PlacedCollider::cuboid(Vec3::new(-5.0, -5.0, 6.0), Vec3::new(5.0, 5.0, 20.0)),
            PlacedCollider::cuboid(Vec3::new(-5.0, -5.0, 4.0), Vec3::new(5.0, 5.0, 8.0)),
        ]
        .into_iter()
        .collect();
        let mut probe = CollisionProbe::default();
        let result = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 10.0, 0.02);
        assert!((result.clip_distance - 3.5).abs() < 1e-4);
    }

    #[test]
    fn ignored_layers_are_invisible() {
        let subject = CollisionLayers::layer(3);
        let world: ColliderSet = [PlacedCollider::cuboid(
            Vec3::new(-5.0, -5.0, 3.0),
            Vec3::new(5.0, 5.0, 20.0),
        )
        .with_layers(subject)]
        .into_iter()
        .collect();
        let mut probe = CollisionProbe::new(ProbeSettings {
            ignore_layers: subject,
            ..Default::default()
        });
        let result = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 10.0, 0.02);
        assert!(!result.hit);
    }

    #[test]
    fn overlap_without_ray_hit_still_counts() {
        // The camera overlaps the sphere's edge, but the ray along the axis passes beside it.
        let world: ColliderSet = [PlacedCollider::sphere(Vec3::new(0.3, 0.0, 10.0), 0.22)]
            .into_iter()
            .collect();
        let mut probe = CollisionProbe::default();
        let result = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 10.0, 0.02);
        assert!(result.hit);
        assert_eq!(result.clip_distance, 10.0);
        assert_eq!(result.safe_distance, 10.0);
    }

    #[test]
    fn degenerate_direction_reuses_previous_result() {
        let world = wall();
        let mut probe = CollisionProbe::default();
        let first = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 10.0, 0.02);
        let second = probe.probe(Some(&world), Vec3::ZERO, Vec3::ZERO, 0.0, 0.02);
        assert_eq!(first, second);
    }

    #[test]
    fn safe_distance_never_exceeds_desired() {
        let world = wall();
        let mut probe = CollisionProbe::new(ProbeSettings {
            min_clearance: 0.05,
            ..Default::default()
        });
        // Grazing the wall: the overlap reaches past z = 3 while the nearest hit is beyond the camera.
        let result = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 2.92), 2.92, 0.02);
        assert!(result.hit);
        assert!(result.clip_distance <= 2.92);
        assert!(result.safe_distance <= 2.92);
    }

    #[test]
    fn missing_world_never_hits() {
        let mut probe = CollisionProbe::default();
        let result = probe.probe(None, Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), 4.0, 0.02);
        assert!(!result.hit);
        assert_eq!(result.safe_distance, 4.0);
    }

    #[test]
    fn rotated_cuboid_is_hit_in_its_own_frame() {
        let world: ColliderSet = [PlacedCollider {
            entity: None,
            shape: ColliderShape::Cuboid {
                half_size: Vec3::new(8.0, 5.0, 5.0),
            },
            translation: Vec3::new(0.0, 0.0, 11.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            layers: CollisionLayers::DEFAULT,
        }]
        .into_iter()
        .collect();
        let mut probe = CollisionProbe::default();
        let result = probe.probe(Some(&world), Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 10.0, 0.02);
        assert!((result.clip_distance - 2.5).abs() < 1e-3);
    }
}
