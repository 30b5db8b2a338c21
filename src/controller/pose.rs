//! Pose snapshots and change notification.

use bevy_ecs::prelude::*;
use bevy_math::DVec3;
use bevy_reflect::prelude::*;

use super::{motion::EPSILON, projections::ProjectionMode};

/// A snapshot of everything a remote observer needs to reproduce the view.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct CameraPose {
    /// Eye position.
    pub position: DVec3,
    /// The point the camera orbits and looks at.
    pub target: DVec3,
    /// Unit up vector.
    pub up: DVec3,
    /// Perspective or orthographic.
    pub projection_mode: ProjectionMode,
    /// Field of view in radians.
    pub fov: f64,
    /// Height of the view volume at the target, in world units.
    pub frustum_height: f64,
    /// Is roll locked?
    pub roll_locked: bool,
}

impl CameraPose {
    /// The orbit vector, `target - position`.
    pub fn orbit(&self) -> DVec3 {
        self.target - self.position
    }

    /// Distance between the eye and the target.
    pub fn distance(&self) -> f64 {
        self.orbit().length()
    }

    /// Does `other` differ from `self` by more than the notification tolerance?
    pub fn differs_from(&self, other: &CameraPose) -> bool {
        self.position.distance_squared(other.position) > EPSILON
            || self.target.distance_squared(other.target) > EPSILON
            || self.up.distance_squared(other.up) > EPSILON
            || (self.fov - other.fov).abs() > EPSILON
            || (self.frustum_height - other.frustum_height).abs() > EPSILON
            || self.projection_mode != other.projection_mode
            || self.roll_locked != other.roll_locked
    }
}

/// Remembers the last notified pose and decides whether a new one is worth announcing.
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct ChangeNotifier {
    last: Option<CameraPose>,
}

impl ChangeNotifier {
    /// Compare `pose` to the last notified snapshot. Returns the pose if it changed, storing it as
    /// the new snapshot. The first pose ever seen is stored without being reported.
    pub fn observe(&mut self, pose: CameraPose) -> Option<CameraPose> {
        match self.last {
            None => {
                self.last = Some(pose);
                None
            }
            Some(last) if pose.differs_from(&last) => {
                self.last = Some(pose);
                Some(pose)
            }
            Some(_) => None,
        }
    }

    /// The last notified snapshot.
    pub fn last(&self) -> Option<&CameraPose> {
        self.last.as_ref()
    }
}

/// Sent once per frame for each camera whose pose changed materially.
#[derive(Debug, Clone, Copy, Event)]
pub struct PoseChanged {
    /// The camera entity.
    pub camera: Entity,
    /// The new pose.
    pub pose: CameraPose,
}
