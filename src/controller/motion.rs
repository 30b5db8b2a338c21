//! The per-frame pose math: rotate, zoom, pan, roll and the roll-drift repair.
//!
//! Everything here is a pure function of vectors in `f64`. The orbit vector is always
//! `target - position`, pointing from the eye to the target.

use std::f64::consts::{PI, TAU};

use bevy_math::{DQuat, DVec2, DVec3};
use bevy_reflect::prelude::*;

/// Guard used for every normalization and near-equality test.
pub const EPSILON: f64 = 1e-6;
/// With roll locked, the drift repair only runs when `1 - |dot(eye, up)|` is below this.
pub const ROLL_DANGER_ZONE: f64 = 0.1;
/// Sideways rotation beyond which a frame's twist about up is undone.
pub const MAX_SIDEWAYS_ANGLE: f64 = 0.1 * PI;
/// Closest the eye direction may come to `up` or `-up` when walking.
pub const POLE_MARGIN: f64 = 0.00156;

/// How pointer drags on the rotate channel turn the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum RotationPolicy {
    /// Classic trackball: the drag direction defines the rotation axis and the up vector turns
    /// with the orbit, so the horizon may tilt.
    #[default]
    Free,
    /// Roll locked: horizontal drags yaw around `up`, vertical drags pitch, and the pitch stops
    /// short of the poles. The up vector never changes.
    LockedWalk,
}

impl RotationPolicy {
    /// Is the up vector protected from rolling?
    pub fn is_roll_locked(self) -> bool {
        matches!(self, RotationPolicy::LockedWalk)
    }
}

/// `normalize_or_zero` with the controller's epsilon instead of exact zero.
pub fn normalize_or_zero(v: DVec3) -> DVec3 {
    let len = v.length();
    if len.is_finite() && len > EPSILON {
        v / len
    } else {
        DVec3::ZERO
    }
}

/// The side vector of the view, `normalize(up x direction)`.
pub fn sideways(up: DVec3, direction: DVec3) -> DVec3 {
    normalize_or_zero(up.cross(direction))
}

/// Trackball rotation. Turns `orbit` and `up` about the axis perpendicular to the drag.
///
/// Returns `false` if nothing moved.
pub fn rotate_free(orbit: &mut DVec3, up: &mut DVec3, delta: DVec2, speed: f64) -> bool {
    let angle = delta.length() * speed;
    if angle.abs() < EPSILON || !angle.is_finite() {
        return false;
    }
    let direction = normalize_or_zero(*orbit);
    let up_unit = normalize_or_zero(*up);
    let moved = up_unit * delta.y + sideways(up_unit, direction) * delta.x;
    let axis = normalize_or_zero(moved.cross(direction));
    if axis == DVec3::ZERO {
        return false;
    }
    let rotation = DQuat::from_axis_angle(axis, angle);
    *orbit = rotation * *orbit;
    *up = normalize_or_zero(rotation * up_unit);
    true
}

/// Yaw around `up`, then pitch around the view's side vector, stopping [`POLE_MARGIN`] short of
/// either pole. Only the orbit moves.
///
/// Returns `false` if nothing moved.
pub fn rotate_locked(orbit: &mut DVec3, up: DVec3, delta: DVec2, speed: f64) -> bool {
    let up = normalize_or_zero(up);
    if up == DVec3::ZERO || delta.length_squared() == 0.0 {
        return false;
    }
    let mut moved = false;

    let yaw = -delta.x * speed;
    if yaw.abs() >= EPSILON && yaw.is_finite() {
        *orbit = DQuat::from_axis_angle(up, yaw) * *orbit;
        moved = true;
    }

    let direction = normalize_or_zero(*orbit);
    let side = sideways(up, direction);
    if side == DVec3::ZERO {
        return moved;
    }
    let desired = delta.y * speed;
    // Positive pitch tilts the view toward -up.
    let pitch = if desired >= 0.0 {
        desired.min((direction.angle_between(-up) - POLE_MARGIN).max(0.0))
    } else {
        desired.max(-(direction.angle_between(up) - POLE_MARGIN).max(0.0))
    };
    if pitch.abs() >= EPSILON && pitch.is_finite() {
        *orbit = DQuat::from_axis_angle(side, pitch) * *orbit;
        moved = true;
    }
    moved
}

/// The zoom factor for a drag of `delta_y`, or `None` if the frame should not zoom.
pub fn zoom_factor(delta_y: f64, speed: f64) -> Option<f64> {
    let factor = 1.0 + delta_y * speed;
    (factor.is_finite() && (factor - 1.0).abs() >= EPSILON && factor > 0.0).then_some(factor)
}

/// The offset to apply to the target for a pan drag of `change`, in screen fractions.
///
/// The drag is scaled by the orbit distance so the target moves at a constant screen speed.
/// Returns `None` when there is no drag or the view basis is degenerate.
pub fn pan_offset(orbit: DVec3, up: DVec3, change: DVec2, speed: f64) -> Option<DVec3> {
    if change.length_squared() == 0.0 {
        return None;
    }
    let change = change * orbit.length() * speed;
    let true_up = normalize_or_zero(up.reject_from(orbit));
    let right = normalize_or_zero(orbit.cross(true_up));
    if true_up == DVec3::ZERO || right == DVec3::ZERO || !change.is_finite() {
        return None;
    }
    Some(right * -change.x + true_up * change.y)
}

/// The signed roll angle swept between two circle-mapped points, wrapped to `(-PI, PI]`.
pub fn roll_angle(previous: DVec2, current: DVec2) -> f64 {
    let delta = previous.y.atan2(previous.x) - current.y.atan2(current.x);
    if delta > PI {
        delta - TAU
    } else if delta <= -PI {
        delta + TAU
    } else {
        delta
    }
}

/// Rotate `up` about the view direction.
pub fn roll_up(up: DVec3, direction: DVec3, angle: f64) -> DVec3 {
    let direction = normalize_or_zero(direction);
    if direction == DVec3::ZERO || angle == 0.0 || !angle.is_finite() {
        return up;
    }
    normalize_or_zero(DQuat::from_axis_angle(direction, angle) * up)
}

/// Is the view close enough to a pole that a locked roll may drift?
pub fn in_roll_danger_zone(direction: DVec3, up: DVec3) -> bool {
    1.0 - direction.dot(normalize_or_zero(up)).abs() < ROLL_DANGER_ZONE
}

/// Split a frame's orientation change into its twist about `up`, and the angle of the remaining
/// sideways rotation.
///
/// Returns `None` when the twist cannot be extracted.
pub fn twist_about(delta: DQuat, up: DVec3) -> Option<(DQuat, f64)> {
    let up = normalize_or_zero(up);
    if up == DVec3::ZERO || !delta.is_finite() {
        return None;
    }
    let projected = up * delta.xyz().dot(up);
    let twist = DQuat::from_xyzw(projected.x, projected.y, projected.z, delta.w);
    let len = twist.length();
    if len < EPSILON {
        return None;
    }
    let twist = twist / len;
    let sideways = 2.0 * delta.normalize().dot(twist).abs().clamp(-1.0, 1.0).acos();
    Some((twist, sideways))
}

/// The roll-drift repair for locked roll. Given the orientation before and after the frame,
/// returns the rotation to apply to the orbit, if the frame rotated too far sideways.
pub fn roll_drift_correction(old: DQuat, new: DQuat, up: DVec3) -> Option<DQuat> {
    let delta = new * old.inverse();
    let (twist, sideways) = twist_about(delta, up)?;
    (sideways > MAX_SIDEWAYS_ANGLE).then(|| twist.inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_vec_eq(a: DVec3, b: DVec3, epsilon: f64) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = epsilon);
        assert_abs_diff_eq!(a.y, b.y, epsilon = epsilon);
        assert_abs_diff_eq!(a.z, b.z, epsilon = epsilon);
    }

    #[test]
    fn free_rotate_yaws_about_up() {
        // Eye at (0, 0, 5) looking at the origin.
        let mut orbit = DVec3::new(0.0, 0.0, -5.0);
        let mut up = DVec3::Y;
        assert!(rotate_free(&mut orbit, &mut up, DVec2::new(0.5, 0.0), 1.0));
        let eye = DVec3::ZERO - orbit;
        assert_vec_eq(eye, DVec3::new(-2.397, 0.0, 4.388), 1e-3);
        assert_abs_diff_eq!(orbit.length(), 5.0, epsilon = 1e-9);
        assert_vec_eq(up, DVec3::Y, 1e-9);
    }

    #[test]
    fn free_rotate_vertical_drag_tilts_up() {
        let mut orbit = DVec3::new(0.0, 0.0, -5.0);
        let mut up = DVec3::Y;
        rotate_free(&mut orbit, &mut up, DVec2::new(0.0, 0.3), 1.0);
        assert_abs_diff_eq!(up.length(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(up.dot(normalize_or_zero(orbit)), 0.0, epsilon = 1e-9);
        assert!(up.z.abs() > 0.1);
    }

    #[test]
    fn zero_drag_does_not_rotate() {
        let mut orbit = DVec3::new(0.0, 0.0, -5.0);
        let mut up = DVec3::Y;
        assert!(!rotate_free(&mut orbit, &mut up, DVec2::ZERO, 1.0));
        assert!(!rotate_locked(&mut orbit, up, DVec2::ZERO, 1.0));
    }

    #[test]
    fn locked_yaw_agrees_with_free_rotate() {
        let mut free = DVec3::new(0.0, 0.0, -5.0);
        let mut up = DVec3::Y;
        rotate_free(&mut free, &mut up, DVec2::new(0.5, 0.0), 1.0);

        let mut locked = DVec3::new(0.0, 0.0, -5.0);
        rotate_locked(&mut locked, DVec3::Y, DVec2::new(0.5, 0.0), 1.0);
        assert_vec_eq(free, locked, 1e-9);
    }

    #[test]
    fn locked_pitch_stops_short_of_poles() {
        let mut orbit = DVec3::new(0.0, 0.0, -5.0);
        rotate_locked(&mut orbit, DVec3::Y, DVec2::new(0.0, 10.0), 1.0);
        let direction = orbit.normalize();
        assert_abs_diff_eq!(direction.angle_between(DVec3::NEG_Y), POLE_MARGIN, epsilon = 1e-9);

        let mut orbit = DVec3::new(0.0, 0.0, -5.0);
        rotate_locked(&mut orbit, DVec3::Y, DVec2::new(0.0, -10.0), 1.0);
        let direction = orbit.normalize();
        assert_abs_diff_eq!(direction.angle_between(DVec3::Y), POLE_MARGIN, epsilon = 1e-9);
        assert_abs_diff_eq!(orbit.length(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn locked_pitch_at_pole_only_moves_away() {
        let mut orbit = DVec3::new(0.0, 0.0, -5.0);
        rotate_locked(&mut orbit, DVec3::Y, DVec2::new(0.0, 10.0), 1.0);
        let at_pole = orbit;
        rotate_locked(&mut orbit, DVec3::Y, DVec2::new(0.0, 1.0), 1.0);
        assert_vec_eq(orbit, at_pole, 1e-9);
        rotate_locked(&mut orbit, DVec3::Y, DVec2::new(0.0, -0.5), 1.0);
        assert!(orbit.normalize().angle_between(DVec3::NEG_Y) > 0.4);
    }

    #[test]
    fn zoom_factor_matches_drag() {
        let factor = zoom_factor(0.5, 1.2).unwrap();
        assert_abs_diff_eq!(factor, 1.6);
        assert_abs_diff_eq!(10.0 / factor, 6.25);
        assert_eq!(zoom_factor(0.0, 1.2), None);
        assert_eq!(zoom_factor(-1.0, 1.2), None);
    }

    #[test]
    fn pan_moves_target_in_view_plane() {
        let orbit = DVec3::new(0.0, 0.0, -10.0);
        let offset = pan_offset(orbit, DVec3::Y, DVec2::new(0.1, 0.0), 0.3).unwrap();
        // Dragging right moves the target left, so the scene follows the pointer.
        assert_vec_eq(offset, DVec3::new(-0.3, 0.0, 0.0), 1e-9);
        assert_abs_diff_eq!(offset.dot(orbit), 0.0);

        let offset = pan_offset(orbit, DVec3::Y, DVec2::new(0.0, 0.1), 0.3).unwrap();
        assert_vec_eq(offset, DVec3::new(0.0, 0.3, 0.0), 1e-9);
        assert_eq!(pan_offset(orbit, DVec3::Y, DVec2::ZERO, 0.3), None);
    }

    #[test]
    fn pan_uses_up_rejected_from_orbit() {
        let orbit = DVec3::new(0.0, -5.0, -5.0);
        let offset = pan_offset(orbit, DVec3::Y, DVec2::new(0.0, 0.2), 1.0).unwrap();
        assert_abs_diff_eq!(offset.dot(orbit), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn roll_angle_wraps() {
        let a = roll_angle(DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0));
        assert_abs_diff_eq!(a, -PI / 2.0);
        let b = roll_angle(DVec2::new(-1.0, 0.01), DVec2::new(-1.0, -0.01));
        assert!(b.abs() < 0.1);
    }

    #[test]
    fn roll_keeps_up_perpendicular_to_view() {
        let up = roll_up(DVec3::Y, DVec3::NEG_Z, PI / 2.0);
        assert_vec_eq(up, DVec3::X, 1e-9);
        assert_eq!(roll_up(DVec3::Y, DVec3::NEG_Z, 0.0), DVec3::Y);
    }

    #[test]
    fn pure_twist_has_no_sideways_angle() {
        let delta = DQuat::from_axis_angle(DVec3::Y, 0.7);
        let (twist, sideways) = twist_about(delta, DVec3::Y).unwrap();
        assert_abs_diff_eq!(sideways, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(twist.dot(delta).abs(), 1.0, epsilon = 1e-9);
        assert_eq!(roll_drift_correction(DQuat::IDENTITY, delta, DVec3::Y), None);
    }

    #[test]
    fn large_sideways_rotation_undoes_twist() {
        let twist = DQuat::from_axis_angle(DVec3::Y, 0.3);
        let swing = DQuat::from_axis_angle(DVec3::X, 0.5);
        let new = swing * twist;
        let correction = roll_drift_correction(DQuat::IDENTITY, new, DVec3::Y).unwrap();
        let undone = correction * twist;
        assert_abs_diff_eq!(undone.dot(DQuat::IDENTITY).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn danger_zone_is_near_the_poles() {
        assert!(in_roll_danger_zone(DVec3::new(0.0, -0.99, 0.14).normalize(), DVec3::Y));
        assert!(!in_roll_danger_zone(DVec3::NEG_Z, DVec3::Y));
    }
}
