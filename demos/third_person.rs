//! Walk around a small room in first person with WASD. Press Tab to hand over to the orbit camera
//! and back, F to refocus the orbit on the far wall, and P to pause the camera. Orbit by dragging
//! with the right mouse button and zoom with the scroll wheel; the camera will not clip into the
//! walls.

use std::time::Duration;

use bevy::prelude::*;
use bevy_third_person_cam::prelude::*;

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, DefaultThirdPersonCamPlugins))
        .add_systems(Startup, setup)
        .add_systems(Update, (toggle_mode, refocus, toggle_pause, walk, report))
        .run();
}

#[derive(Component)]
struct Player;

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(40.0, 40.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.5, 0.3))),
    ));

    let wall_material = materials.add(Color::srgb(0.6, 0.6, 0.65));
    let walls = [
        (Vec3::new(0.0, 2.0, -8.0), Vec3::new(16.0, 4.0, 0.5)),
        (Vec3::new(0.0, 2.0, 8.0), Vec3::new(16.0, 4.0, 0.5)),
        (Vec3::new(-8.0, 2.0, 0.0), Vec3::new(0.5, 4.0, 16.0)),
        (Vec3::new(8.0, 2.0, 0.0), Vec3::new(0.5, 4.0, 16.0)),
        (Vec3::new(3.0, 1.0, 2.0), Vec3::new(2.0, 2.0, 2.0)),
    ];
    for (translation, size) in walls {
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(wall_material.clone()),
            Transform::from_translation(translation),
            ProbeCollider::cuboid(size / 2.0),
        ));
    }

    let player = commands
        .spawn((
            Player,
            Mesh3d(meshes.add(Capsule3d::new(0.4, 1.0))),
            MeshMaterial3d(materials.add(Color::srgb(0.8, 0.4, 0.2))),
            Transform::from_xyz(0.0, 0.9, 0.0),
            ProbeIgnore,
        ))
        .id();

    let pivot = commands
        .spawn((Transform::from_xyz(0.0, 1.7, 0.0), Visibility::default()))
        .id();
    commands
        .spawn((
            Camera3d::default(),
            Transform::IDENTITY,
            CameraRig::new(pivot)
                .with_subject(player)
                .with_mode(CameraMode::FirstPerson),
        ))
        .set_parent(pivot);

    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn toggle_mode(
    keys: Res<ButtonInput<KeyCode>>,
    rigs: Query<(Entity, &CameraRig)>,
    players: Query<&Transform, With<Player>>,
    mut switch: EventWriter<SwitchCameraMode>,
) {
    if !keys.just_pressed(KeyCode::Tab) {
        return;
    }
    for (camera, rig) in &rigs {
        let next = match rig.pending_mode().unwrap_or(rig.mode()) {
            CameraMode::FirstPerson => CameraMode::Orbit,
            CameraMode::Orbit => CameraMode::FirstPerson,
        };
        let target = match next {
            CameraMode::Orbit => players.get_single().ok().map(|player| TransitionTarget {
                pivot_translation: player.translation + Vec3::Y,
                pivot_rotation: Quat::from_euler(EulerRot::YXZ, 0.6, -0.35, 0.0),
                camera: CameraTarget::LocalPosition(Vec3::new(0.0, 0.0, 7.0)),
            }),
            CameraMode::FirstPerson => None,
        };
        switch.send(SwitchCameraMode {
            camera,
            mode: next,
            target,
            duration: Some(Duration::from_millis(1500)),
        });
    }
}

fn refocus(
    keys: Res<ButtonInput<KeyCode>>,
    rigs: Query<(Entity, &CameraRig)>,
    mut animate: EventWriter<AnimateCameraTo>,
) {
    if !keys.just_pressed(KeyCode::KeyF) {
        return;
    }
    for (camera, rig) in &rigs {
        if rig.mode() != CameraMode::Orbit {
            continue;
        }
        animate.send(AnimateCameraTo {
            camera,
            target: TransitionTarget {
                pivot_translation: Vec3::new(0.0, 2.0, -6.0),
                pivot_rotation: Quat::from_euler(EulerRot::YXZ, 0.0, -0.2, 0.0),
                camera: CameraTarget::Distance(5.0),
            },
            duration: None,
        });
    }
}

fn toggle_pause(
    keys: Res<ButtonInput<KeyCode>>,
    mut paused: Local<bool>,
    mut pause: EventWriter<CameraPause>,
) {
    if keys.just_pressed(KeyCode::KeyP) {
        *paused = !*paused;
        pause.send(CameraPause { paused: *paused });
    }
}

fn walk(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    rigs: Query<&CameraRig>,
    mut players: Query<&mut Transform, With<Player>>,
) {
    let Ok(rig) = rigs.get_single() else {
        return;
    };
    if rig.mode() != CameraMode::FirstPerson || rig.is_transitioning() || rig.is_paused() {
        return;
    }
    let Ok(mut player) = players.get_single_mut() else {
        return;
    };
    let mut direction = Vec3::ZERO;
    for (key, heading) in [
        (KeyCode::KeyW, *player.forward()),
        (KeyCode::KeyS, *player.back()),
        (KeyCode::KeyA, *player.left()),
        (KeyCode::KeyD, *player.right()),
    ] {
        if keys.pressed(key) {
            direction += heading;
        }
    }
    player.translation += direction.normalize_or_zero() * 4.0 * time.delta_secs();
}

fn report(mut finished: EventReader<TransitionFinished>) {
    for event in finished.read() {
        info!("camera {:?} is now in {:?}", event.camera, event.mode);
    }
}
