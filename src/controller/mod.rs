//! The trackball camera controller: gesture input, pose update, and the Bevy systems driving it.

pub mod command;
pub mod component;
pub mod gesture;
pub mod inputs;
pub mod motion;
pub mod pose;
pub mod projections;
pub mod rig;
pub mod zoom;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_transform::TransformSystem;

/// Adds the per-frame pose update for every [`TrackballCam`](component::TrackballCam), and the
/// [`CameraCommandEvent`](command::CameraCommandEvent) handler.
pub struct TrackballCamPlugin;

impl Plugin for TrackballCamPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<pose::PoseChanged>()
            .add_event::<command::CameraCommandEvent>()
            .add_systems(
                PostUpdate,
                (
                    command::CameraCommandEvent::receive,
                    component::TrackballCam::update_camera_positions,
                )
                    .chain()
                    .before(TransformSystem::TransformPropagate),
            )
            .register_type::<component::TrackballCam>()
            .register_type::<component::Sensitivity>()
            .register_type::<component::EnabledMotion>()
            .register_type::<motion::RotationPolicy>()
            .register_type::<zoom::DistanceLimits>()
            .register_type::<inputs::KeyBindings>()
            .register_type::<projections::ProjectionSettings>()
            .register_type::<pose::CameraPose>();
    }
}
