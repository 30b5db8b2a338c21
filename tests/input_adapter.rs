#![cfg(feature = "input")]

use approx::assert_abs_diff_eq;
use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_input::{
    keyboard::{Key, KeyCode, KeyboardInput},
    mouse::{MouseButton, MouseButtonInput, MouseScrollUnit, MouseWheel},
    ButtonState,
};
use bevy_math::{DVec3, Vec2};
use bevy_render::prelude::*;
use bevy_transform::prelude::*;
use bevy_trackball_cam::prelude::*;
use bevy_window::{CursorMoved, WindowEvent, WindowResized};

#[derive(Resource, Default)]
struct PoseLog(Vec<PoseChanged>);

fn collect(mut events: EventReader<PoseChanged>, mut log: ResMut<PoseLog>) {
    log.0.extend(events.read().copied());
}

struct Harness {
    app: App,
    window: Entity,
    camera: Entity,
}

impl Harness {
    fn new(controller: TrackballCam) -> Self {
        let mut app = App::new();
        app.add_plugins(DefaultTrackballCamPlugins)
            .init_resource::<PoseLog>()
            .add_systems(Last, collect);
        let window = app.world_mut().spawn_empty().id();
        let camera = app
            .world_mut()
            .spawn((controller, Transform::default(), Projection::default()))
            .id();
        app.update();
        Self {
            app,
            window,
            camera,
        }
    }

    fn controller(&self) -> &TrackballCam {
        self.app
            .world()
            .get::<TrackballCam>(self.camera)
            .expect("camera exists")
    }

    fn take_log(&mut self) -> Vec<PoseChanged> {
        std::mem::take(&mut self.app.world_mut().resource_mut::<PoseLog>().0)
    }

    fn cursor(&mut self, x: f32, y: f32) {
        let window = self.window;
        self.app
            .world_mut()
            .send_event(WindowEvent::CursorMoved(CursorMoved {
                window,
                position: Vec2::new(x, y),
                delta: None,
            }));
    }

    fn button(&mut self, button: MouseButton, state: ButtonState) {
        let window = self.window;
        self.app
            .world_mut()
            .send_event(WindowEvent::MouseButtonInput(MouseButtonInput {
                button,
                state,
                window,
            }));
    }

    fn key(&mut self, key_code: KeyCode, logical_key: Key, state: ButtonState) {
        let window = self.window;
        self.app
            .world_mut()
            .send_event(WindowEvent::KeyboardInput(KeyboardInput {
                key_code,
                logical_key,
                state,
                text: None,
                repeat: false,
                window,
            }));
    }

    fn wheel(&mut self, unit: MouseScrollUnit, y: f32) {
        let window = self.window;
        self.app
            .world_mut()
            .send_event(WindowEvent::MouseWheel(MouseWheel {
                unit,
                x: 0.0,
                y,
                window,
            }));
    }
}

fn camera_at_z5() -> TrackballCam {
    TrackballCam::looking_at(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, DVec3::Y)
        .with_viewport(ViewportRect::from_size(800.0, 600.0))
}

#[test]
fn new_cameras_are_attached() {
    let h = Harness::new(camera_at_z5());
    assert!(h.controller().is_attached());

    let h = Harness::new(camera_at_z5().without_auto_attach());
    assert!(!h.controller().is_attached());
}

#[test]
fn left_drag_orbits_the_camera() {
    let mut h = Harness::new(camera_at_z5());
    h.cursor(400.0, 300.0);
    h.button(MouseButton::Left, ButtonState::Pressed);
    h.app.update();
    assert!(h.take_log().is_empty());

    h.cursor(600.0, 300.0);
    h.app.update();
    let log = h.take_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].camera, h.camera);
    assert_abs_diff_eq!(log[0].pose.position.x, -2.397, epsilon = 1e-3);
    assert_abs_diff_eq!(log[0].pose.position.z, 4.388, epsilon = 1e-3);

    let transform = h.app.world().get::<Transform>(h.camera).unwrap();
    assert_abs_diff_eq!(transform.translation.x, -2.397, epsilon = 1e-3);
    assert_abs_diff_eq!(transform.translation.z, 4.388, epsilon = 1e-3);

    h.button(MouseButton::Left, ButtonState::Released);
    h.app.update();
    h.cursor(700.0, 300.0);
    h.app.update();
    assert!(h.take_log().is_empty());
}

#[test]
fn events_within_a_frame_keep_their_order() {
    let mut h = Harness::new(camera_at_z5());
    h.cursor(400.0, 300.0);
    h.button(MouseButton::Left, ButtonState::Pressed);
    h.app.update();

    // The move after the release must not extend the drag.
    h.cursor(600.0, 300.0);
    h.button(MouseButton::Left, ButtonState::Released);
    h.cursor(800.0, 300.0);
    h.app.update();

    let log = h.take_log();
    assert_eq!(log.len(), 1);
    assert_abs_diff_eq!(log[0].pose.position.x, -2.397, epsilon = 1e-3);
    assert_abs_diff_eq!(log[0].pose.position.y, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(log[0].pose.position.z, 4.388, epsilon = 1e-3);
}

#[test]
fn presses_outside_the_viewport_are_ignored() {
    let inset = ViewportRect {
        left: 100.0,
        top: 100.0,
        width: 400.0,
        height: 300.0,
    };
    let mut h = Harness::new(camera_at_z5().with_viewport(inset));
    h.cursor(50.0, 50.0);
    h.button(MouseButton::Left, ButtonState::Pressed);
    h.app.update();
    h.cursor(300.0, 250.0);
    h.app.update();
    h.button(MouseButton::Left, ButtonState::Released);
    h.cursor(520.0, 50.0);
    h.wheel(MouseScrollUnit::Line, -10.0);
    h.app.update();
    assert!(h.take_log().is_empty());
    assert_abs_diff_eq!(h.controller().position().x, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(h.controller().distance(), 5.0, epsilon = 1e-12);

    // (300, 250) is the centre of the inset viewport.
    h.cursor(300.0, 250.0);
    h.button(MouseButton::Left, ButtonState::Pressed);
    h.app.update();
    h.cursor(400.0, 250.0);
    h.app.update();
    assert_eq!(h.take_log().len(), 1);
    assert_abs_diff_eq!(h.controller().position().x, -2.397, epsilon = 1e-3);
}

#[test]
fn wheel_scroll_zooms() {
    let mut h = Harness::new(camera_at_z5());
    // Scrolling down 100 pixels nudges the zoom start by 0.025.
    h.wheel(MouseScrollUnit::Pixel, -100.0);
    h.app.update();
    let expected = 5.0 / (1.0 + 0.025 * 1.2);
    assert_abs_diff_eq!(h.controller().distance(), expected, epsilon = 1e-9);
    assert_eq!(h.take_log().len(), 1);
}

#[test]
fn held_key_overrides_the_button_channel() {
    let mut h = Harness::new(camera_at_z5());
    h.key(KeyCode::ShiftLeft, Key::Shift, ButtonState::Pressed);
    h.cursor(400.0, 300.0);
    h.button(MouseButton::Left, ButtonState::Pressed);
    h.app.update();
    h.cursor(480.0, 300.0);
    h.app.update();

    let controller = h.controller();
    assert_abs_diff_eq!(controller.distance(), 5.0, epsilon = 1e-9);
    assert!(controller.target().x < -0.1);
}

#[test]
fn cameras_bound_to_a_window_ignore_other_windows() {
    let mut controller = camera_at_z5();
    controller.attach(InputSource::window(Entity::from_raw(4242)));
    let mut h = Harness::new(controller);

    h.wheel(MouseScrollUnit::Line, -10.0);
    h.app.update();
    assert_abs_diff_eq!(h.controller().distance(), 5.0, epsilon = 1e-9);
}

#[test]
fn resize_updates_the_viewport() {
    let mut h = Harness::new(camera_at_z5());
    let window = h.window;
    h.app
        .world_mut()
        .send_event(WindowEvent::WindowResized(WindowResized {
            window,
            width: 400.0,
            height: 200.0,
        }));
    h.app.update();
    let viewport = h.controller().viewport();
    assert_eq!(viewport.width, 400.0);
    assert_eq!(viewport.height, 200.0);
}
