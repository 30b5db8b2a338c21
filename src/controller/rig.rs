//! The camera rig: the world-space position and orientation the controller drives.

use bevy_math::{DMat3, DQuat, DVec3};
use bevy_reflect::prelude::*;
use bevy_transform::prelude::*;

use super::motion::EPSILON;

/// Position, up hint and orientation of the camera the controller owns.
///
/// The orientation follows Bevy's convention: the camera looks along its local `-Z`, with local
/// `+Y` as screen up.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct CameraRig {
    /// Eye position in world space.
    pub position: DVec3,
    /// The up hint used when orienting the camera. Not necessarily orthogonal to the view.
    pub up: DVec3,
    /// The last computed orientation.
    pub orientation: DQuat,
}

impl Default for CameraRig {
    fn default() -> Self {
        let mut rig = Self {
            position: DVec3::splat(-1.0),
            up: DVec3::Y,
            orientation: DQuat::IDENTITY,
        };
        rig.look_at(DVec3::ZERO);
        rig
    }
}

impl CameraRig {
    /// The direction the camera is looking.
    pub fn forward(&self) -> DVec3 {
        self.orientation * DVec3::NEG_Z
    }

    /// Screen up in world space.
    pub fn screen_up(&self) -> DVec3 {
        self.orientation * DVec3::Y
    }

    /// Orient the rig toward `target`, keeping `up` as close to screen up as possible.
    ///
    /// If the target coincides with the eye the orientation is left unchanged. If the view
    /// direction is parallel to the up hint the previous orientation is turned onto the new
    /// direction along the shortest arc.
    pub fn look_at(&mut self, target: DVec3) {
        let to_target = target - self.position;
        if !to_target.is_finite() || to_target.length_squared() < EPSILON * EPSILON {
            return;
        }
        let forward = to_target.normalize();
        let right = forward.cross(self.up);
        if !right.is_finite() || right.length_squared() < EPSILON * EPSILON {
            let turn = DQuat::from_rotation_arc(self.forward(), forward);
            self.orientation = (turn * self.orientation).normalize();
            return;
        }
        let right = right.normalize();
        let up = right.cross(forward);
        self.orientation = DQuat::from_mat3(&DMat3::from_cols(right, up, -forward)).normalize();
    }

    /// Write the rig into a Bevy [`Transform`], keeping its scale.
    pub fn to_transform(&self, scale: bevy_math::Vec3) -> Transform {
        Transform {
            translation: self.position.as_vec3(),
            rotation: self.orientation.as_quat(),
            scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn look_at_matches_transform_looking_at() {
        let mut rig = CameraRig {
            position: DVec3::new(3.0, 2.0, 5.0),
            up: DVec3::Y,
            orientation: DQuat::IDENTITY,
        };
        rig.look_at(DVec3::ZERO);
        let expected = Transform::from_xyz(3.0, 2.0, 5.0)
            .looking_at(bevy_math::Vec3::ZERO, bevy_math::Vec3::Y);
        let forward = rig.forward();
        let expected_forward = (*expected.forward()).as_dvec3();
        assert_abs_diff_eq!(forward.x, expected_forward.x, epsilon = 1e-6);
        assert_abs_diff_eq!(forward.y, expected_forward.y, epsilon = 1e-6);
        assert_abs_diff_eq!(forward.z, expected_forward.z, epsilon = 1e-6);
        assert!(rig.screen_up().dot(DVec3::Y) > 0.0);
    }

    #[test]
    fn degenerate_look_at_keeps_orientation() {
        let mut rig = CameraRig::default();
        let before = rig.orientation;
        rig.look_at(rig.position);
        assert_eq!(rig.orientation, before);
    }

    #[test]
    fn looking_along_up_turns_previous_orientation() {
        let mut rig = CameraRig {
            position: DVec3::new(0.0, 0.0, 5.0),
            up: DVec3::Y,
            orientation: DQuat::IDENTITY,
        };
        rig.look_at(DVec3::ZERO);
        rig.position = DVec3::new(0.0, 5.0, 0.0);
        rig.look_at(DVec3::ZERO);
        let forward = rig.forward();
        assert_abs_diff_eq!(forward.y, -1.0, epsilon = 1e-9);
        assert!(rig.orientation.is_finite());
    }
}
