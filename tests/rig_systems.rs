use std::time::Duration;

use bevy::{prelude::*, window::RequestRedraw};
use bevy_third_person_cam::prelude::*;

const STEP: Duration = Duration::from_millis(20);

fn app() -> App {
    let mut app = App::new();
    app.add_plugins(ThirdPersonCamPlugin);
    app.init_resource::<Time>();
    app
}

fn step(app: &mut App) {
    app.world_mut().resource_mut::<Time>().advance_by(STEP);
    app.world_mut().run_schedule(FixedUpdate);
    app.world_mut().run_schedule(PostUpdate);
}

fn spawn_rig(app: &mut App, rig: impl FnOnce(Entity) -> CameraRig, camera_local: Vec3) -> (Entity, Entity) {
    let pivot = app.world_mut().spawn(Transform::IDENTITY).id();
    let camera = app
        .world_mut()
        .spawn((Transform::from_translation(camera_local), rig(pivot)))
        .id();
    (camera, pivot)
}

fn spawn_wall(app: &mut App, min: Vec3, max: Vec3) -> Entity {
    let transform = Transform::from_translation((min + max) / 2.0);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            ProbeCollider::cuboid((max - min) / 2.0),
        ))
        .id()
}

fn finished(app: &mut App) -> Vec<TransitionFinished> {
    app.world_mut()
        .resource_mut::<Events<TransitionFinished>>()
        .drain()
        .collect()
}

fn transform(app: &App, entity: Entity) -> Transform {
    *app.world()
        .get::<Transform>(entity)
        .expect("entity should have a transform")
}

#[test]
fn orbit_settles_in_front_of_wall() {
    let mut app = app();
    spawn_wall(&mut app, Vec3::new(-5.0, -5.0, 3.0), Vec3::new(5.0, 5.0, 20.0));
    let (camera, _) = spawn_rig(&mut app, CameraRig::new, Vec3::new(0.0, 0.0, 10.0));

    for _ in 0..100 {
        step(&mut app);
    }
    let z = transform(&app, camera).translation.z;
    assert!((2.5 - 1e-3..3.0).contains(&z), "camera at {z}");
    assert!(!app
        .world()
        .resource::<Events<RequestRedraw>>()
        .is_empty());
}

#[test]
fn ignored_subject_does_not_push_camera() {
    let mut app = app();
    let subject = spawn_wall(&mut app, Vec3::new(-5.0, -5.0, 3.0), Vec3::new(5.0, 5.0, 20.0));
    app.world_mut().entity_mut(subject).insert(ProbeIgnore);
    let (camera, _) = spawn_rig(
        &mut app,
        |pivot| CameraRig::new(pivot).with_subject(subject),
        Vec3::new(0.0, 0.0, 10.0),
    );

    for _ in 0..50 {
        step(&mut app);
    }
    assert!((transform(&app, camera).translation.z - 10.0).abs() < 1e-3);
}

#[test]
fn switch_by_event_finishes_once() {
    let mut app = app();
    let subject = app.world_mut().spawn(Transform::from_xyz(2.0, 0.0, 0.0)).id();
    let (camera, pivot) = spawn_rig(
        &mut app,
        |pivot| {
            CameraRig::new(pivot)
                .with_subject(subject)
                .with_mode(CameraMode::FirstPerson)
        },
        Vec3::ZERO,
    );
    step(&mut app);
    assert_eq!(transform(&app, pivot).translation, Vec3::new(2.0, 0.8, 0.0));

    let target = TransitionTarget {
        pivot_translation: Vec3::new(0.0, 2.0, 0.0),
        pivot_rotation: Quat::from_rotation_y(0.5),
        camera: CameraTarget::LocalPosition(Vec3::new(0.0, 0.0, 6.0)),
    };
    app.world_mut().send_event(SwitchCameraMode {
        camera,
        mode: CameraMode::Orbit,
        target: Some(target),
        duration: Some(Duration::from_secs(1)),
    });
    app.world_mut().run_schedule(PostUpdate);
    assert_eq!(
        app.world().get::<CameraRig>(camera).and_then(|rig| rig.pending_mode()),
        Some(CameraMode::Orbit)
    );

    for _ in 0..80 {
        step(&mut app);
    }
    let events = finished(&mut app);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].camera, camera);
    assert_eq!(events[0].mode, CameraMode::Orbit);
    assert_eq!(transform(&app, pivot).translation, Vec3::new(0.0, 2.0, 0.0));
    assert!((transform(&app, camera).translation.z - 6.0).abs() < 1e-3);
}

#[test]
fn switching_to_active_mode_leaves_rig_alone() {
    let mut app = app();
    let (camera, pivot) = spawn_rig(&mut app, CameraRig::new, Vec3::new(0.0, 0.0, 8.0));
    for _ in 0..5 {
        step(&mut app);
    }
    let pivot_before = transform(&app, pivot);
    let camera_before = transform(&app, camera);

    app.world_mut().send_event(SwitchCameraMode {
        camera,
        mode: CameraMode::Orbit,
        target: None,
        duration: None,
    });
    app.world_mut().run_schedule(PostUpdate);

    assert_eq!(transform(&app, pivot), pivot_before);
    assert_eq!(transform(&app, camera), camera_before);
    let rig = app.world().get::<CameraRig>(camera).expect("rig");
    assert!(!rig.is_transitioning());
    assert!(finished(&mut app).is_empty());
}

#[test]
fn pause_freezes_animation() {
    let mut app = app();
    let (camera, pivot) = spawn_rig(&mut app, CameraRig::new, Vec3::new(0.0, 0.0, 8.0));
    step(&mut app);

    app.world_mut().send_event(CameraPause { paused: true });
    app.world_mut().send_event(AnimateCameraTo {
        camera,
        target: TransitionTarget {
            pivot_translation: Vec3::new(4.0, 0.0, 0.0),
            pivot_rotation: Quat::IDENTITY,
            camera: CameraTarget::Distance(4.0),
        },
        duration: Some(Duration::from_millis(200)),
    });
    app.world_mut().run_schedule(PostUpdate);

    for _ in 0..30 {
        step(&mut app);
    }
    assert_eq!(transform(&app, pivot).translation, Vec3::ZERO);

    app.world_mut().send_event(CameraPause { paused: false });
    app.world_mut().run_schedule(PostUpdate);
    for _ in 0..20 {
        step(&mut app);
    }
    assert_eq!(transform(&app, pivot).translation, Vec3::new(4.0, 0.0, 0.0));
    assert!((transform(&app, camera).translation.z - 4.0).abs() < 1e-3);
    assert_eq!(finished(&mut app).len(), 1);
}
