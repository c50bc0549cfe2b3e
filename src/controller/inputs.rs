//! Samples device input into each rig's [`RigInput`] once per frame, for the fixed step to consume.

use bevy_ecs::prelude::*;
use bevy_input::{
    mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit},
    prelude::*,
};
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;

use super::{component::CameraRig, mode::CameraMode};

/// Scroll distance reported in pixels that counts as one line.
pub const PIXELS_PER_LINE: f32 = 120.0;

/// Input accumulated for a rig since its last fixed step.
///
/// `pointer_delta.x` turns the view to the left when positive and `pointer_delta.y` tilts the view
/// down when positive. Positive `scroll` zooms in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Component, Reflect)]
pub struct RigInput {
    /// Accumulated pointer motion.
    pub pointer_delta: Vec2,
    /// Accumulated scroll, in lines.
    pub scroll: f32,
    /// Is the orbit button held?
    pub button_held: bool,
}

impl RigInput {
    /// Take the accumulated deltas, leaving the button state in place.
    pub fn take(&mut self) -> RigInput {
        let taken = *self;
        self.pointer_delta = Vec2::ZERO;
        self.scroll = 0.0;
        taken
    }

    /// Accumulate this frame's mouse and keyboard input into every rig.
    ///
    /// An orbit that is not controlled on button-down is driven by the arrow keys instead of the
    /// mouse.
    pub fn sample(
        mouse_motion: Res<AccumulatedMouseMotion>,
        mouse_scroll: Res<AccumulatedMouseScroll>,
        mouse_buttons: Res<ButtonInput<MouseButton>>,
        keys: Res<ButtonInput<KeyCode>>,
        mut rigs: Query<(&CameraRig, &mut RigInput)>,
    ) {
        let scroll = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / PIXELS_PER_LINE,
        };
        let mouse = Vec2::new(-mouse_motion.delta.x, mouse_motion.delta.y);
        let axis = |positive: KeyCode, negative: KeyCode| {
            keys.pressed(positive) as i8 as f32 - keys.pressed(negative) as i8 as f32
        };
        let arrows = Vec2::new(
            axis(KeyCode::ArrowRight, KeyCode::ArrowLeft),
            axis(KeyCode::ArrowUp, KeyCode::ArrowDown),
        );

        for (rig, mut input) in &mut rigs {
            let settings = &rig.orbit.settings;
            let keyboard_driven = rig.mode() == CameraMode::Orbit && !settings.controlled_on_button;
            let pointer = if keyboard_driven {
                arrows * settings.keyboard_rate
            } else {
                mouse
            };
            let button_held = mouse_buttons.pressed(settings.button);

            if pointer == Vec2::ZERO && scroll == 0.0 && input.button_held == button_held {
                continue;
            }
            input.pointer_delta += pointer;
            input.scroll += scroll;
            input.button_held = button_held;
        }
    }
}
