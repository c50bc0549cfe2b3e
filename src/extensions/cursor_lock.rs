//! A `bevy_third_person_cam` extension that locks and hides the cursor while a first-person camera
//! is in control.
//!
//! The lock is taken as soon as a switch to first-person starts, and released once a switch to the
//! orbit completes or the rig is paused. Pressing [`CursorLock::release_key`] frees the cursor until
//! [`CursorLock::relock_button`] is clicked.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_input::prelude::*;
use bevy_reflect::prelude::*;
use bevy_window::{CursorGrabMode, PrimaryWindow, Window};

use crate::prelude::*;

/// See the [module](self) docs.
pub struct CursorLockPlugin;

impl Plugin for CursorLockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CursorLock>()
            .add_systems(
                PostUpdate,
                CursorLock::update.after(crate::controller::RigSystems::Requests),
            )
            .register_type::<CursorLock>();
    }
}

/// Settings and state of the cursor lock.
#[derive(Debug, Resource, Reflect)]
pub struct CursorLock {
    /// Should the cursor be locked at all?
    pub enabled: bool,
    /// Frees the cursor while the first-person camera is active.
    pub release_key: KeyCode,
    /// Locks the cursor again after it was freed.
    pub relock_button: MouseButton,
    released: bool,
}

impl Default for CursorLock {
    fn default() -> Self {
        Self {
            enabled: true,
            release_key: KeyCode::Escape,
            relock_button: MouseButton::Left,
            released: false,
        }
    }
}

/// Does this rig want the cursor locked?
pub fn wants_lock(rig: &ModeController) -> bool {
    if rig.is_paused() {
        return false;
    }
    match rig.pending_mode() {
        Some(mode) => mode == CameraMode::FirstPerson || rig.mode() == CameraMode::FirstPerson,
        None => rig.mode() == CameraMode::FirstPerson,
    }
}

impl CursorLock {
    /// Has the user freed the cursor with the release key?
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Combine what the rigs want with the user's release and relock input. Returns the lock state.
    pub fn resolve(&mut self, wanted: bool, release_pressed: bool, relock_pressed: bool) -> bool {
        if !wanted || !self.enabled {
            self.released = false;
            return false;
        }
        if release_pressed {
            self.released = true;
        } else if relock_pressed {
            self.released = false;
        }
        !self.released
    }

    fn update(
        mut lock: ResMut<Self>,
        rigs: Query<&CameraRig>,
        keys: Res<ButtonInput<KeyCode>>,
        mouse_buttons: Res<ButtonInput<MouseButton>>,
        mut windows: Query<&mut Window, With<PrimaryWindow>>,
    ) {
        let wanted = rigs.iter().any(|rig| wants_lock(rig));
        let release = keys.just_released(lock.release_key);
        let relock = mouse_buttons.just_released(lock.relock_button);
        let locked = lock.resolve(wanted, release, relock);

        let Ok(mut window) = windows.get_single_mut() else {
            return;
        };
        let grab_mode = if locked {
            CursorGrabMode::Locked
        } else {
            CursorGrabMode::None
        };
        if window.cursor_options.grab_mode != grab_mode {
            window.cursor_options.grab_mode = grab_mode;
        }
        if window.cursor_options.visible == locked {
            window.cursor_options.visible = !locked;
        }
    }
}
