//! The primary [`Component`] of the controller, [`TrackballCam`].

use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_math::{DVec3, Vec3};
use bevy_reflect::prelude::*;
use bevy_render::prelude::*;
use bevy_transform::prelude::*;

use super::{
    command::{CameraCommand, CommandError},
    gesture::{GestureAccumulators, GestureChannel, ViewportRect},
    inputs::{
        ActiveGesture, InputAggregator, InputEvent, InputSource, KeyBindings, Listeners,
        Propagation,
    },
    motion::{self, normalize_or_zero, RotationPolicy, EPSILON},
    pose::{CameraPose, ChangeNotifier, PoseChanged},
    projections::{FrustumExtent, ProjectionMode, ProjectionSettings},
    rig::CameraRig,
    zoom::DistanceLimits,
};

/// Tracks all state of a camera's controller, including its inputs, pose, and settings.
///
/// See the documentation on the contained fields and types to learn more about each setting.
///
/// # Moving the Camera
///
/// The [`TrackballCamInputPlugin`](crate::input::TrackballCamInputPlugin) feeds Bevy's mouse,
/// wheel, keyboard and window events into every attached camera. To drive the camera from any
/// other source:
///
/// 1. Call [`TrackballCam::attach`] once.
/// 2. Forward raw events with [`TrackballCam::handle_input`], honoring the returned
///    [`Propagation`].
/// 3. Call [`TrackballCam::check_inputs`] once per frame, or let
///    [`TrackballCam::update_camera_positions`] do it.
///
/// Programmatic changes go through [`TrackballCam::apply_command`].
#[derive(Debug, Clone, Reflect, Component)]
pub struct TrackballCam {
    /// A disabled controller ignores input and freezes the pose.
    pub enabled: bool,
    /// Which gesture channels may move the camera.
    pub enabled_motion: EnabledMotion,
    /// How rotate gestures turn the camera. [`RotationPolicy::LockedWalk`] locks roll.
    pub rotation: RotationPolicy,
    /// Input sensitivity of the camera.
    pub sensitivity: Sensitivity,
    /// Bounds on the eye to target distance.
    pub distance_limits: DistanceLimits,
    /// Keys that force a gesture channel while held.
    pub key_bindings: KeyBindings,
    /// Ask the host to suppress default handling of pointer and wheel events.
    pub prevent_default: bool,
    /// Attach to the input adapter automatically when the component is added.
    pub auto_attach: bool,
    /// Perspective or orthographic projection settings.
    pub projection: ProjectionSettings,
    rig: CameraRig,
    target: DVec3,
    gestures: GestureAccumulators,
    input: InputAggregator,
    viewport: ViewportRect,
    frustum: Option<FrustumExtent>,
    notifier: ChangeNotifier,
    #[reflect(ignore)]
    synced_projection: Option<(ProjectionSettings, Option<FrustumExtent>, ViewportRect)>,
}

impl Default for TrackballCam {
    fn default() -> Self {
        Self::looking_at(DVec3::splat(-1.0), DVec3::ZERO, DVec3::Y)
    }
}

impl TrackballCam {
    /// Create a controller with the eye at `position`, orbiting and looking at `target`.
    pub fn looking_at(position: DVec3, target: DVec3, up: DVec3) -> Self {
        let mut rig = CameraRig {
            position,
            up: normalize_or_zero(up),
            orientation: Default::default(),
        };
        if rig.up == DVec3::ZERO {
            rig.up = DVec3::Y;
        }
        rig.look_at(target);
        let mut controller = Self {
            enabled: true,
            enabled_motion: Default::default(),
            rotation: Default::default(),
            sensitivity: Default::default(),
            distance_limits: Default::default(),
            key_bindings: Default::default(),
            prevent_default: true,
            auto_attach: true,
            projection: Default::default(),
            rig,
            target,
            gestures: Default::default(),
            input: Default::default(),
            viewport: Default::default(),
            frustum: None,
            notifier: Default::default(),
            synced_projection: None,
        };
        controller.update_frustum();
        controller
    }

    /// Set the rotation policy.
    pub fn with_rotation(self, rotation: RotationPolicy) -> Self {
        Self { rotation, ..self }
    }

    /// Set the input sensitivity.
    pub fn with_sensitivity(self, sensitivity: Sensitivity) -> Self {
        Self {
            sensitivity,
            ..self
        }
    }

    /// Set the distance limits.
    pub fn with_distance_limits(self, distance_limits: DistanceLimits) -> Self {
        Self {
            distance_limits,
            ..self
        }
    }

    /// Set which motions are enabled.
    pub fn with_enabled_motion(self, enabled_motion: EnabledMotion) -> Self {
        Self {
            enabled_motion,
            ..self
        }
    }

    /// Set the key bindings.
    pub fn with_key_bindings(self, key_bindings: KeyBindings) -> Self {
        Self {
            key_bindings,
            ..self
        }
    }

    /// Set the projection settings.
    pub fn with_projection(mut self, projection: ProjectionSettings) -> Self {
        self.projection = projection;
        self.update_frustum();
        self
    }

    /// Set the viewport used to normalize pointer positions.
    pub fn with_viewport(mut self, viewport: ViewportRect) -> Self {
        self.set_viewport(viewport);
        self
    }

    /// Don't attach to the input adapter automatically.
    pub fn without_auto_attach(self) -> Self {
        Self {
            auto_attach: false,
            ..self
        }
    }

    /// Register input listeners for `source`. Configuration is untouched.
    pub fn attach(&mut self, source: InputSource) {
        debug!("Attaching trackball camera to {source:?}");
        self.input.attach(source);
    }

    /// Remove every input listener and forget any gesture in progress.
    pub fn detach(&mut self) {
        if self.input.source().is_some() {
            debug!("Detaching trackball camera");
        }
        self.input.detach();
    }

    /// Is the controller currently listening for input?
    pub fn is_attached(&self) -> bool {
        self.input.source().is_some()
    }

    /// Where the controller receives input from, if attached.
    pub fn input_source(&self) -> Option<InputSource> {
        self.input.source()
    }

    /// The current listener registrations.
    pub fn listeners(&self) -> &Listeners {
        self.input.listeners()
    }

    /// Which channels pointer motion currently drives.
    pub fn active_gesture(&self) -> ActiveGesture {
        self.input.active()
    }

    /// The gesture accumulators, with any input not yet consumed by a frame.
    pub fn gestures(&self) -> &GestureAccumulators {
        &self.gestures
    }

    /// Feed a raw input event to the controller.
    pub fn handle_input(&mut self, event: &InputEvent) -> Propagation {
        if !self.enabled {
            return Propagation::Ignored;
        }
        let motion = self.enabled_motion;
        let roll_locked = self.rotation.is_roll_locked();
        let handled = self.input.handle(
            event,
            &self.key_bindings,
            |channel| motion.allows(channel, roll_locked),
            &self.viewport,
            &mut self.gestures,
        );
        if !handled {
            return Propagation::Ignored;
        }
        match event {
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => Propagation::Handled,
            InputEvent::PointerUp { .. } => Propagation::Suppress,
            _ if self.prevent_default => Propagation::Suppress,
            _ => Propagation::Handled,
        }
    }

    /// Advance one frame: consume pending gestures, clamp, repair roll drift, recompute the
    /// frustum, and return the new pose if it changed materially since the last notification.
    pub fn check_inputs(&mut self) -> Option<CameraPose> {
        if !self.enabled {
            return None;
        }
        let old_orientation = self.rig.orientation;
        let roll_locked = self.rotation.is_roll_locked();
        let speed = self.sensitivity;
        let motion = self.enabled_motion;

        let mut orbit = self.target - self.rig.position;
        if !orbit.is_finite() || orbit.length_squared() < EPSILON * EPSILON {
            debug!("Eye and target coincide, recovering the orbit from the camera orientation");
            orbit = self.rig.forward() * self.distance_limits.min.max(EPSILON);
        }
        let direction = orbit.normalize();

        let mut up = normalize_or_zero(self.rig.up);
        if up == DVec3::ZERO || 1.0 - direction.dot(up).abs() < EPSILON {
            up = self.rig.screen_up();
        }
        let frame_up = up;

        if motion.rotate {
            let delta = self.gestures.rotate.delta();
            match self.rotation {
                RotationPolicy::Free => {
                    motion::rotate_free(&mut orbit, &mut up, delta, speed.rotate);
                }
                RotationPolicy::LockedWalk => {
                    motion::rotate_locked(&mut orbit, up, delta, speed.rotate);
                }
            }
            self.gestures.rotate.advance();
        }

        if motion.zoom {
            if let Some(factor) = motion::zoom_factor(self.gestures.zoom.delta().y, speed.zoom) {
                if self.projection.zooms_frustum() {
                    self.projection.ortho_zoom /= factor;
                } else {
                    // Clamped before the orbit can collapse onto the target.
                    let heading = orbit.try_normalize().unwrap_or(direction);
                    orbit = heading * self.distance_limits.clamp(orbit.length() / factor);
                }
            }
            self.gestures.zoom.advance();
        }

        if motion.pan {
            let change = self.gestures.pan.delta();
            if let Some(offset) = motion::pan_offset(orbit, up, change, speed.pan) {
                self.target += offset;
            }
            self.gestures.pan.advance();
        }

        if motion.roll && !roll_locked {
            let angle = motion::roll_angle(self.gestures.roll.previous, self.gestures.roll.current);
            if angle != 0.0 {
                up = motion::roll_up(up, orbit, angle * speed.roll);
            }
            self.gestures.roll.advance();
        }

        if motion.zoom || motion.pan {
            self.distance_limits
                .clamp_orbit(&mut orbit, &mut self.gestures.zoom);
        }

        if roll_locked {
            up = frame_up;
        }
        self.rig.position = self.target - orbit;
        self.rig.up = up;
        self.rig.look_at(self.target);

        if roll_locked && motion::in_roll_danger_zone(direction, up) {
            if let Some(correction) =
                motion::roll_drift_correction(old_orientation, self.rig.orientation, up)
            {
                orbit = correction * orbit;
                self.rig.position = self.target - orbit;
                self.rig.look_at(self.target);
            }
        }

        let up = normalize_or_zero(self.rig.up);
        self.rig.up = if up == DVec3::ZERO {
            self.rig.screen_up()
        } else {
            up
        };

        self.update_frustum();
        self.notifier.observe(self.pose())
    }

    /// Roll the camera by `radians` about the view axis, measured from `up`.
    pub fn set_roll(&mut self, radians: f64, up: DVec3) -> Result<(), CommandError> {
        CameraCommand::Roll {
            radians,
            up: Some(up),
        }
        .validate()?;
        let backward = normalize_or_zero(self.rig.position - self.target);
        if backward == DVec3::ZERO {
            return Err(CommandError::DegenerateOrbit);
        }
        let up = up.normalize();
        self.rig.up = motion::roll_up(up, backward, radians);
        self.rig.look_at(self.target);
        Ok(())
    }

    /// Recompute the frustum extent from the current distance, settings and viewport.
    pub fn update_frustum(&mut self) {
        self.frustum = self.projection.extent(self.distance(), &self.viewport);
    }

    /// Update the screen rectangle used to normalize pointer positions.
    pub fn set_viewport(&mut self, viewport: ViewportRect) {
        if !viewport.is_valid() {
            warn!("Ignoring degenerate viewport {viewport:?}");
            return;
        }
        self.viewport = viewport;
        self.update_frustum();
    }

    /// The screen rectangle used to normalize pointer positions.
    pub fn viewport(&self) -> ViewportRect {
        self.viewport
    }

    /// The current view volume extent, if it could be computed.
    pub fn frustum(&self) -> Option<FrustumExtent> {
        self.frustum
    }

    /// Eye position.
    pub fn position(&self) -> DVec3 {
        self.rig.position
    }

    /// The point the camera orbits.
    pub fn target(&self) -> DVec3 {
        self.target
    }

    /// Unit up vector.
    pub fn up(&self) -> DVec3 {
        self.rig.up
    }

    /// The camera rig driven by the controller.
    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    /// Distance between the eye and the target.
    pub fn distance(&self) -> f64 {
        (self.target - self.rig.position).length()
    }

    /// Is roll locked?
    pub fn roll_locked(&self) -> bool {
        self.rotation.is_roll_locked()
    }

    /// Lock or unlock roll.
    pub fn set_roll_locked(&mut self, locked: bool) {
        self.rotation = if locked {
            RotationPolicy::LockedWalk
        } else {
            RotationPolicy::Free
        };
    }

    /// A snapshot of the current pose.
    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.rig.position,
            target: self.target,
            up: self.rig.up,
            projection_mode: self.projection.mode,
            fov: self.projection.fov,
            frustum_height: self.frustum.map_or(0.0, |f| f.bounds().height()),
            roll_locked: self.roll_locked(),
        }
    }

    /// The last pose announced through [`PoseChanged`].
    pub fn last_notified_pose(&self) -> Option<&CameraPose> {
        self.notifier.last()
    }

    /// Validate and apply a command.
    ///
    /// The pose is clamped and announced by the next [`TrackballCam::check_inputs`], so any
    /// number of commands in one frame produce at most one notification.
    pub fn apply_command(&mut self, command: CameraCommand) -> Result<(), CommandError> {
        command.validate()?;
        match command {
            CameraCommand::OrthographicFrustumHeight(height) => {
                let direction = normalize_or_zero(self.target - self.rig.position);
                if direction == DVec3::ZERO {
                    return Err(CommandError::DegenerateOrbit);
                }
                let distance = self
                    .projection
                    .distance_for_height(height, &self.viewport)
                    .ok_or(CommandError::DegenerateViewport)?;
                self.rig.position = self.target - direction * distance;
                self.projection.frustum_height = None;
                self.projection.ortho_zoom = 1.0;
                self.projection.mode = ProjectionMode::Orthographic;
            }
            CameraCommand::Orthographic => self.projection.mode = ProjectionMode::Orthographic,
            CameraCommand::Perspective => self.projection.mode = ProjectionMode::Perspective,
            CameraCommand::PerspectiveFov(fov) => {
                self.projection.fov = fov;
                self.projection.mode = ProjectionMode::Perspective;
            }
            CameraCommand::Position(position) => self.rig.position = position,
            CameraCommand::Target(target) => self.target = target,
            CameraCommand::Roll { radians, up } => self.set_roll(radians, up.unwrap_or(DVec3::Y))?,
            CameraCommand::RollLock(locked) => self.set_roll_locked(locked),
        }
        self.update_frustum();
        Ok(())
    }

    /// Have the projection settings, frustum or viewport changed since the last
    /// [`TrackballCam::sync_projection`]?
    pub fn projection_needs_sync(&self) -> bool {
        self.synced_projection != Some((self.projection, self.frustum, self.viewport))
    }

    /// Write the projection settings and frustum into a Bevy [`Projection`].
    pub fn sync_projection(&mut self, projection: &mut Projection) -> bool {
        let key = (self.projection, self.frustum, self.viewport);
        let applied = self.projection.apply(self.frustum, &self.viewport, projection);
        if applied {
            self.synced_projection = Some(key);
        }
        applied
    }

    /// Force the next [`TrackballCam::sync_projection`] to write the projection.
    pub fn invalidate_projection(&mut self) {
        self.synced_projection = None;
    }

    /// Update transforms and projections for all cameras. Called once per frame.
    pub fn update_camera_positions(
        mut cameras: Query<(
            Entity,
            &mut TrackballCam,
            Mut<Transform>,
            Option<Mut<Projection>>,
        )>,
        mut changed: EventWriter<PoseChanged>,
    ) {
        for (camera, mut controller, mut transform, projection) in cameras.iter_mut() {
            let notified = controller.check_inputs();

            let scale: Vec3 = transform.scale;
            transform.set_if_neq(controller.rig.to_transform(scale));

            if let Some(mut projection) = projection {
                if projection.is_added() {
                    controller.invalidate_projection();
                }
                if controller.projection_needs_sync() {
                    controller.sync_projection(&mut projection);
                }
            }

            if let Some(pose) = notified {
                changed.write(PoseChanged { camera, pose });
            }
        }
    }
}

/// The sensitivity of the camera controller to inputs.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Sensitivity {
    /// Radians of rotation per unit of circle-mapped drag.
    pub rotate: f64,
    /// Zoom factor per unit of screen-fraction drag.
    pub zoom: f64,
    /// Pan distance per unit of screen-fraction drag, relative to the orbit distance.
    pub pan: f64,
    /// Multiplier on the swept roll angle.
    pub roll: f64,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            rotate: 1.0,
            zoom: 1.2,
            pan: 0.3,
            roll: 1.0,
        }
    }
}

/// Controls which gesture channels are allowed to move the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct EnabledMotion {
    /// Should rotate be enabled?
    pub rotate: bool,
    /// Should zoom be enabled?
    pub zoom: bool,
    /// Should pan be enabled?
    pub pan: bool,
    /// Should roll be enabled? Roll is also disabled while roll is locked.
    pub roll: bool,
}

impl Default for EnabledMotion {
    fn default() -> Self {
        Self {
            rotate: true,
            zoom: true,
            pan: true,
            roll: true,
        }
    }
}

impl EnabledMotion {
    /// May `channel` be driven?
    pub fn allows(&self, channel: GestureChannel, roll_locked: bool) -> bool {
        match channel {
            GestureChannel::Rotate => self.rotate,
            GestureChannel::Zoom => self.zoom,
            GestureChannel::Pan => self.pan,
            GestureChannel::Roll => self.roll && !roll_locked,
        }
    }
}
