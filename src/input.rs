//! Translates Bevy's window and input events into [`InputEvent`]s for every attached
//! [`TrackballCam`].
//!
//! Window logical coordinates play the role of page coordinates: the origin is the top left
//! corner of the window, y grows downward.

use std::collections::HashMap;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_input::{
    mouse::{MouseButton, MouseScrollUnit},
    ButtonState, InputSystem,
};
use bevy_math::{DVec2, Vec2};
use bevy_render::camera::{Camera, RenderTarget};
use bevy_window::{PrimaryWindow, Window, WindowEvent};

use crate::controller::{
    component::TrackballCam,
    gesture::ViewportRect,
    inputs::{InputEvent, InputSource, PointerButton, PointerKind, WheelDeltaMode},
};

/// Feeds mouse, wheel, keyboard and resize events to every attached [`TrackballCam`], and
/// attaches newly added cameras that have [`TrackballCam::auto_attach`] set.
pub struct TrackballCamInputPlugin;

impl Plugin for TrackballCamInputPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WindowEvent>().add_systems(
            PreUpdate,
            (attach_new_cameras, forward_input_events)
                .chain()
                .after(InputSystem),
        );
    }
}

impl From<MouseButton> for PointerButton {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Middle => PointerButton::Auxiliary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Back => PointerButton::Other(3),
            MouseButton::Forward => PointerButton::Other(4),
            MouseButton::Other(index) => PointerButton::Other(index),
        }
    }
}

impl From<MouseScrollUnit> for WheelDeltaMode {
    fn from(unit: MouseScrollUnit) -> Self {
        match unit {
            MouseScrollUnit::Line => WheelDeltaMode::Line,
            MouseScrollUnit::Pixel => WheelDeltaMode::Pixel,
        }
    }
}

/// The window a camera renders to, if it renders to a window at all.
fn camera_window(camera: Option<&Camera>, primary: Option<Entity>) -> Option<Entity> {
    match &camera?.target {
        RenderTarget::Window(window) => window.normalize(primary).map(|w| w.entity()),
        _ => None,
    }
}

/// The camera's screen rectangle in window logical coordinates.
fn viewport_for(camera: Option<&Camera>, window: &Window) -> ViewportRect {
    let scale = window.scale_factor() as f64;
    match camera.and_then(|c| c.viewport.as_ref()) {
        Some(viewport) if scale > 0.0 => ViewportRect {
            left: viewport.physical_position.x as f64 / scale,
            top: viewport.physical_position.y as f64 / scale,
            width: viewport.physical_size.x as f64 / scale,
            height: viewport.physical_size.y as f64 / scale,
        },
        _ => ViewportRect::from_size(window.width() as f64, window.height() as f64),
    }
}

fn attach_new_cameras(
    mut cameras: Query<(&mut TrackballCam, Option<&Camera>), Added<TrackballCam>>,
    primary: Query<Entity, With<PrimaryWindow>>,
    windows: Query<&Window>,
) {
    let primary = primary.single().ok();
    for (mut controller, camera) in cameras.iter_mut() {
        if !controller.auto_attach || controller.is_attached() {
            continue;
        }
        let window = camera_window(camera, primary);
        if let Some(window) = window.and_then(|w| windows.get(w).ok()) {
            controller.set_viewport(viewport_for(camera, window));
        }
        let source = window.map_or_else(InputSource::any, InputSource::window);
        controller.attach(source);
    }
}

/// Sends `event` to every camera listening to `window`. With a `page` position, only cameras
/// whose viewport contains it receive the event.
fn dispatch(
    cameras: &mut Query<(&mut TrackballCam, Option<&Camera>)>,
    window: Entity,
    page: Option<DVec2>,
    event: &InputEvent,
) {
    for (mut controller, _) in cameras.iter_mut() {
        if !controller
            .input_source()
            .is_some_and(|source| source.accepts(window))
        {
            continue;
        }
        if page.is_some_and(|page| !controller.viewport().contains(page)) {
            continue;
        }
        controller.handle_input(event);
    }
}

/// Reads the window event stream so that a press, moves and a release arriving in the same
/// frame reach the cameras in the order they happened.
fn forward_input_events(
    mut window_events: EventReader<WindowEvent>,
    mut last_cursor: Local<HashMap<Entity, Vec2>>,
    windows: Query<&Window>,
    mut cameras: Query<(&mut TrackballCam, Option<&Camera>)>,
) {
    for window_event in window_events.read() {
        match window_event {
            WindowEvent::KeyboardInput(key) => {
                let event = match key.state {
                    ButtonState::Pressed => InputEvent::KeyDown(key.key_code),
                    ButtonState::Released => InputEvent::KeyUp(key.key_code),
                };
                dispatch(&mut cameras, key.window, None, &event);
            }
            WindowEvent::CursorMoved(moved) => {
                last_cursor.insert(moved.window, moved.position);
                let event = InputEvent::PointerMove {
                    pointer: PointerKind::Mouse,
                    position: moved.position.as_dvec2(),
                };
                dispatch(&mut cameras, moved.window, None, &event);
            }
            WindowEvent::MouseButtonInput(press) => {
                let position = last_cursor
                    .get(&press.window)
                    .copied()
                    .or_else(|| windows.get(press.window).ok()?.cursor_position())
                    .map_or(DVec2::ZERO, |p| p.as_dvec2());
                let pointer = PointerKind::Mouse;
                let button = PointerButton::from(press.button);
                match press.state {
                    ButtonState::Pressed => {
                        let event = InputEvent::PointerDown {
                            pointer,
                            button,
                            position,
                        };
                        dispatch(&mut cameras, press.window, Some(position), &event);
                    }
                    // Releases end drags that left the viewport, so every camera sees them.
                    ButtonState::Released => {
                        let event = InputEvent::PointerUp {
                            pointer,
                            button,
                            position,
                        };
                        dispatch(&mut cameras, press.window, None, &event);
                    }
                }
            }
            WindowEvent::MouseWheel(scroll) => {
                // Positive y scrolls up in Bevy, positive delta scrolls down on the page.
                let event = InputEvent::Wheel {
                    delta_y: -scroll.y as f64,
                    mode: scroll.unit.into(),
                };
                let page = last_cursor.get(&scroll.window).map(|p| p.as_dvec2());
                dispatch(&mut cameras, scroll.window, page, &event);
            }
            WindowEvent::WindowResized(resize) => {
                let window = windows.get(resize.window).ok();
                for (mut controller, camera) in cameras.iter_mut() {
                    if !controller
                        .input_source()
                        .is_some_and(|source| source.accepts(resize.window))
                    {
                        continue;
                    }
                    let viewport = match window {
                        Some(window) => viewport_for(camera, window),
                        None => {
                            ViewportRect::from_size(resize.width as f64, resize.height as f64)
                        }
                    };
                    controller.set_viewport(viewport);
                }
            }
            _ => {}
        }
    }
}
