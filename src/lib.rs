#![warn(missing_docs)]

//! A trackball camera controller for remote-controlled point cloud viewers.
//!
//! The controller turns pointer drags, wheel scrolls and held keys into four gesture channels
//! (rotate, zoom, pan and roll) and consumes them once per frame to update the camera pose:
//!
//! - **Rotate** orbits the eye around the target, either as a free trackball or, with roll
//!   locked, as a yaw and a pitch that stops short of the poles.
//! - **Zoom** divides the orbit distance, or the orthographic frustum when a frustum height is
//!   configured. The distance is always clamped to [`DistanceLimits`](controller::zoom).
//! - **Pan** moves the target in the view plane, keeping the distance.
//! - **Roll** turns the up vector about the view axis.
//!
//! A pose snapshot is announced through [`PoseChanged`](controller::pose::PoseChanged) whenever
//! it changes materially, which is what a remote observer subscribes to with the
//! [`subscriptions`](extensions::subscriptions) extension. Programmatic changes, like those
//! received from a remote controller, are sent as
//! [`CameraCommandEvent`](controller::command::CameraCommandEvent)s.
//!
//! # Getting started
//!
//! Add [`DefaultTrackballCamPlugins`], then add a [`TrackballCam`](prelude::TrackballCam) to a
//! camera entity.
//!
//! ```ignore
//! commands.spawn((
//!     Camera3d::default(),
//!     TrackballCam::looking_at(DVec3::new(-1.0, -1.0, -1.0), DVec3::ZERO, DVec3::Y),
//! ));
//! ```
//!
//! The core is engine agnostic: [`TrackballCam::handle_input`](prelude::TrackballCam) accepts
//! abstract [`InputEvent`](controller::inputs::InputEvent)s, so the controller can be driven from
//! any input source.

pub mod controller;
pub mod extensions;
#[cfg(feature = "input")]
pub mod input;

/// Common imports.
pub mod prelude {
    pub use crate::{
        controller::{
            command::{CameraCommand, CameraCommandEvent, CommandError},
            component::{EnabledMotion, Sensitivity, TrackballCam},
            gesture::{GestureChannel, ViewportRect},
            inputs::{InputEvent, InputSource, KeyBindings, Propagation},
            motion::RotationPolicy,
            pose::{CameraPose, PoseChanged},
            projections::{FovMode, ProjectionMode, ProjectionSettings},
            zoom::DistanceLimits,
            TrackballCamPlugin,
        },
        extensions::subscriptions::{PoseSubscriptionPlugin, PoseSubscriptions},
        DefaultTrackballCamPlugins,
    };
}

use bevy_app::{prelude::*, PluginGroupBuilder};

/// Adds [`TrackballCamPlugin`](controller::TrackballCamPlugin), the input adapter when the
/// `input` feature is enabled, and the pose subscription extension.
pub struct DefaultTrackballCamPlugins;

impl PluginGroup for DefaultTrackballCamPlugins {
    fn build(self) -> PluginGroupBuilder {
        let group = PluginGroupBuilder::start::<Self>()
            .add(controller::TrackballCamPlugin)
            .add(extensions::subscriptions::PoseSubscriptionPlugin);
        #[cfg(feature = "input")]
        let group = group.add(input::TrackballCamInputPlugin);
        group
    }
}
