//! Programmatic camera commands, as received from a remote controller.

use std::f64::consts::PI;

use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_math::DVec3;
use thiserror::Error;

use super::component::TrackballCam;

/// A direct request to change the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    /// Switch to an orthographic projection and move the eye so the frustum is this tall.
    OrthographicFrustumHeight(f64),
    /// Switch to an orthographic projection.
    Orthographic,
    /// Switch to a perspective projection.
    Perspective,
    /// Set the field of view in radians and switch to a perspective projection.
    PerspectiveFov(f64),
    /// Move the eye.
    Position(DVec3),
    /// Move the target.
    Target(DVec3),
    /// Roll the camera to an absolute angle in radians about the view axis, measured from `up`.
    Roll {
        /// The roll angle. Callers holding degrees convert with `f64::to_radians`.
        radians: f64,
        /// The reference up direction. Defaults to `+Y`.
        up: Option<DVec3>,
    },
    /// Lock or unlock roll.
    RollLock(bool),
}

/// Why a [`CameraCommand`] was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CommandError {
    /// A scalar argument was NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFinite {
        /// Which argument.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A vector argument had a NaN or infinite component.
    #[error("{name} must be finite, got {value}")]
    NonFiniteVector {
        /// Which argument.
        name: &'static str,
        /// The rejected value.
        value: DVec3,
    },
    /// A scalar argument that must be strictly positive was not.
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Which argument.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A scalar argument reached its exclusive upper bound.
    #[error("{name} must be less than {max}, got {value}")]
    TooLarge {
        /// Which argument.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// The exclusive upper bound.
        max: f64,
    },
    /// The up hint of a roll command had zero length.
    #[error("roll up hint must have a non-zero length")]
    ZeroUp,
    /// The eye and target coincide, so there is no view direction to work with.
    #[error("camera position and target coincide")]
    DegenerateOrbit,
    /// The viewport is empty, so no frustum can be derived.
    #[error("cannot derive a frustum from an empty viewport")]
    DegenerateViewport,
    /// The command was addressed to an entity without a controller.
    #[error("entity {0} has no trackball camera")]
    NoSuchCamera(Entity),
}

fn finite(name: &'static str, value: f64) -> Result<f64, CommandError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CommandError::NonFinite { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, CommandError> {
    if finite(name, value)? > 0.0 {
        Ok(value)
    } else {
        Err(CommandError::NonPositive { name, value })
    }
}

fn finite_vector(name: &'static str, value: DVec3) -> Result<DVec3, CommandError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CommandError::NonFiniteVector { name, value })
    }
}

impl CameraCommand {
    /// Check the command's arguments without applying it.
    pub fn validate(&self) -> Result<(), CommandError> {
        match *self {
            CameraCommand::OrthographicFrustumHeight(height) => {
                positive("frustum height", height)?;
            }
            CameraCommand::PerspectiveFov(fov) => {
                positive("field of view", fov)?;
                if fov >= PI {
                    return Err(CommandError::TooLarge {
                        name: "field of view",
                        value: fov,
                        max: PI,
                    });
                }
            }
            CameraCommand::Position(position) => {
                finite_vector("position", position)?;
            }
            CameraCommand::Target(target) => {
                finite_vector("target", target)?;
            }
            CameraCommand::Roll { radians, up } => {
                finite("roll angle", radians)?;
                let up = finite_vector("roll up hint", up.unwrap_or(DVec3::Y))?;
                if up.length_squared() == 0.0 {
                    return Err(CommandError::ZeroUp);
                }
            }
            CameraCommand::Orthographic
            | CameraCommand::Perspective
            | CameraCommand::RollLock(_) => {}
        }
        Ok(())
    }
}

/// Send this event to apply a [`CameraCommand`] to a camera.
#[derive(Debug, Clone, Copy, Event)]
pub struct CameraCommandEvent {
    /// The camera to update.
    pub camera: Entity,
    /// What to do.
    pub command: CameraCommand,
}

impl CameraCommandEvent {
    /// Apply every pending command. Rejected commands are logged and dropped.
    ///
    /// Runs before [`TrackballCam::update_camera_positions`], which reports the resulting pose.
    pub fn receive(mut events: EventReader<Self>, mut cameras: Query<&mut TrackballCam>) {
        for event in events.read() {
            let Ok(mut controller) = cameras.get_mut(event.camera) else {
                warn!("{}", CommandError::NoSuchCamera(event.camera));
                continue;
            };
            if let Err(error) = controller.apply_command(event.command) {
                warn!("Rejected camera command {:?}: {error}", event.command);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(
            CameraCommand::OrthographicFrustumHeight(0.0).validate(),
            Err(CommandError::NonPositive {
                name: "frustum height",
                value: 0.0
            })
        );
        assert!(matches!(
            CameraCommand::Roll {
                radians: f64::NAN,
                up: None
            }
            .validate(),
            Err(CommandError::NonFinite { .. })
        ));
        assert_eq!(
            CameraCommand::Roll {
                radians: 0.5,
                up: Some(DVec3::ZERO)
            }
            .validate(),
            Err(CommandError::ZeroUp)
        );
        assert!(matches!(
            CameraCommand::Position(DVec3::new(f64::INFINITY, 0.0, 0.0)).validate(),
            Err(CommandError::NonFiniteVector { .. })
        ));
        assert!(matches!(
            CameraCommand::PerspectiveFov(4.0).validate(),
            Err(CommandError::TooLarge { .. })
        ));
    }

    #[test]
    fn accepts_good_arguments() {
        assert_eq!(CameraCommand::PerspectiveFov(0.6).validate(), Ok(()));
        assert_eq!(
            CameraCommand::Roll {
                radians: -1.0,
                up: Some(DVec3::Z)
            }
            .validate(),
            Ok(())
        );
        assert_eq!(CameraCommand::RollLock(true).validate(), Ok(()));
    }

    #[test]
    fn errors_render_their_arguments() {
        let message = CommandError::NonPositive {
            name: "frustum height",
            value: -2.0,
        }
        .to_string();
        assert_eq!(message, "frustum height must be positive, got -2");
    }
}
