//! Projection settings and the frustum sync between the controller and Bevy's [`Projection`].

use bevy_log::prelude::*;
use bevy_reflect::prelude::*;
use bevy_render::{
    camera::ScalingMode,
    prelude::{OrthographicProjection, PerspectiveProjection, Projection},
};

use super::{gesture::ViewportRect, motion::EPSILON};

/// Which projection the camera renders with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum ProjectionMode {
    /// Objects shrink with distance. The field of view sets the frustum.
    #[default]
    Perspective,
    /// Parallel projection. The frustum size is fixed or derived from the orbit distance.
    Orthographic,
}

/// Which axis the field of view, and the derived frustum extent, is measured along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub enum FovMode {
    /// The horizontal extent is fixed; the vertical one follows the aspect ratio.
    #[default]
    HorizontalFixed,
    /// The vertical extent is fixed; the horizontal one follows the aspect ratio.
    VerticalFixed,
}

/// Settings used to compute the camera's [`Projection`].
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ProjectionSettings {
    /// Perspective or orthographic.
    pub mode: ProjectionMode,
    /// Field of view in radians, measured along the axis given by `fov_mode`.
    pub fov: f64,
    /// Which axis `fov` is measured along.
    pub fov_mode: FovMode,
    /// A fixed orthographic frustum height in world units. When `None`, the orthographic frustum
    /// is derived from the orbit distance and `fov` so switching modes keeps the framing.
    pub frustum_height: Option<f64>,
    /// Orthographic zoom multiplier applied to `frustum_height`. Zooming divides it.
    pub ortho_zoom: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Perspective,
            fov: 30f64.to_radians(),
            fov_mode: FovMode::HorizontalFixed,
            frustum_height: None,
            ortho_zoom: 1.0,
        }
    }
}

/// World-space size of the view volume.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct FrustumExtent {
    /// Horizontal extent in world units.
    pub width: f64,
    /// Vertical extent in world units.
    pub height: f64,
}

impl FrustumExtent {
    /// Symmetric orthographic bounds around the view axis.
    pub fn bounds(&self) -> OrthoBounds {
        OrthoBounds {
            left: -self.width / 2.0,
            right: self.width / 2.0,
            top: self.height / 2.0,
            bottom: -self.height / 2.0,
        }
    }
}

/// Orthographic frustum bounds in view space.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct OrthoBounds {
    /// Left plane, negative.
    pub left: f64,
    /// Right plane, positive.
    pub right: f64,
    /// Top plane, positive.
    pub top: f64,
    /// Bottom plane, negative.
    pub bottom: f64,
}

impl OrthoBounds {
    /// `top - bottom`.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

impl ProjectionSettings {
    /// Use an orthographic projection.
    pub fn orthographic(self) -> Self {
        Self {
            mode: ProjectionMode::Orthographic,
            ..self
        }
    }

    /// Set the field of view, in radians.
    pub fn with_fov(self, fov: f64) -> Self {
        Self { fov, ..self }
    }

    /// Measure the field of view along the given axis.
    pub fn with_fov_mode(self, fov_mode: FovMode) -> Self {
        Self { fov_mode, ..self }
    }

    /// Fix the orthographic frustum height.
    pub fn with_frustum_height(self, frustum_height: f64) -> Self {
        Self {
            frustum_height: Some(frustum_height),
            ortho_zoom: 1.0,
            ..self
        }
    }

    /// Is zoom applied to the orthographic multiplier rather than to the orbit distance?
    pub fn zooms_frustum(&self) -> bool {
        self.mode == ProjectionMode::Orthographic && self.frustum_height.is_some()
    }

    /// The view volume extent for an eye `distance` away from the target.
    ///
    /// A configured frustum height is always the vertical extent. Otherwise the extent at the
    /// target is derived from `fov`, along the axis chosen by `fov_mode`. Returns `None` for a
    /// degenerate result.
    pub fn extent(&self, distance: f64, viewport: &ViewportRect) -> Option<FrustumExtent> {
        let extent = match self.frustum_height {
            Some(height) => {
                let height = height * self.ortho_zoom;
                FrustumExtent {
                    width: height * viewport.width_over_height(),
                    height,
                }
            }
            None => {
                let fixed = 2.0 * distance * (self.fov / 2.0).tan();
                match self.fov_mode {
                    FovMode::HorizontalFixed => FrustumExtent {
                        width: fixed,
                        height: fixed * viewport.height_over_width(),
                    },
                    FovMode::VerticalFixed => FrustumExtent {
                        width: fixed * viewport.width_over_height(),
                        height: fixed,
                    },
                }
            }
        };
        (extent.width.is_finite()
            && extent.height.is_finite()
            && extent.width > EPSILON
            && extent.height > EPSILON)
            .then_some(extent)
    }

    /// The eye distance at which the derived frustum is `height` tall.
    pub fn distance_for_height(&self, height: f64, viewport: &ViewportRect) -> Option<f64> {
        let fixed = match self.fov_mode {
            FovMode::HorizontalFixed => height * viewport.width_over_height(),
            FovMode::VerticalFixed => height,
        };
        let distance = (fixed / 2.0) / (self.fov / 2.0).tan();
        (distance.is_finite() && distance > EPSILON).then_some(distance)
    }

    /// The vertical field of view Bevy expects, in radians.
    pub fn vertical_fov(&self, viewport: &ViewportRect) -> f64 {
        match self.fov_mode {
            FovMode::VerticalFixed => self.fov,
            FovMode::HorizontalFixed => {
                2.0 * ((self.fov / 2.0).tan() * viewport.height_over_width()).atan()
            }
        }
    }

    /// Write these settings into a Bevy [`Projection`], switching its variant if needed.
    ///
    /// Returns `false` if the projection could not be updated.
    pub fn apply(
        &self,
        extent: Option<FrustumExtent>,
        viewport: &ViewportRect,
        projection: &mut Projection,
    ) -> bool {
        match (self.mode, &mut *projection) {
            (_, Projection::Custom(_)) => {
                warn_once!("Custom projections are not driven by the trackball camera.");
                false
            }
            (ProjectionMode::Perspective, Projection::Perspective(perspective)) => {
                perspective.fov = self.vertical_fov(viewport) as f32;
                perspective.aspect_ratio = viewport.width_over_height() as f32;
                true
            }
            (ProjectionMode::Perspective, Projection::Orthographic(_)) => {
                *projection = Projection::Perspective(PerspectiveProjection {
                    fov: self.vertical_fov(viewport) as f32,
                    aspect_ratio: viewport.width_over_height() as f32,
                    ..Default::default()
                });
                true
            }
            (ProjectionMode::Orthographic, Projection::Orthographic(ortho)) => {
                let Some(extent) = extent else {
                    return false;
                };
                ortho.scaling_mode = ScalingMode::Fixed {
                    width: extent.width as f32,
                    height: extent.height as f32,
                };
                ortho.scale = 1.0;
                true
            }
            (ProjectionMode::Orthographic, Projection::Perspective(_)) => {
                let Some(extent) = extent else {
                    return false;
                };
                *projection = Projection::Orthographic(OrthographicProjection {
                    scaling_mode: ScalingMode::Fixed {
                        width: extent.width as f32,
                        height: extent.height as f32,
                    },
                    ..OrthographicProjection::default_3d()
                });
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn horizontal_fixed_extent_follows_aspect() {
        let settings = ProjectionSettings::default().with_fov(FRAC_PI_2);
        let viewport = ViewportRect::from_size(800.0, 400.0);
        let extent = settings.extent(5.0, &viewport).unwrap();
        assert_abs_diff_eq!(extent.width, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(extent.height, 5.0, epsilon = 1e-9);

        let bounds = extent.bounds();
        assert_abs_diff_eq!(bounds.left, -5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.top, 2.5, epsilon = 1e-9);
        assert_abs_diff_eq!(bounds.height(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn vertical_fixed_extent_follows_aspect() {
        let settings = ProjectionSettings::default()
            .with_fov(FRAC_PI_2)
            .with_fov_mode(FovMode::VerticalFixed);
        let viewport = ViewportRect::from_size(800.0, 400.0);
        let extent = settings.extent(5.0, &viewport).unwrap();
        assert_abs_diff_eq!(extent.width, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(extent.height, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn configured_height_is_vertical_and_zoomed() {
        let mut settings = ProjectionSettings::default()
            .orthographic()
            .with_frustum_height(4.0);
        settings.ortho_zoom = 0.5;
        let viewport = ViewportRect::from_size(800.0, 400.0);
        let extent = settings.extent(100.0, &viewport).unwrap();
        assert_abs_diff_eq!(extent.height, 2.0);
        assert_abs_diff_eq!(extent.width, 4.0);
        assert!(settings.zooms_frustum());
    }

    #[test]
    fn distance_for_height_inverts_extent() {
        let settings = ProjectionSettings::default();
        let viewport = ViewportRect::from_size(1280.0, 720.0);
        let distance = settings.distance_for_height(3.0, &viewport).unwrap();
        let extent = settings.extent(distance, &viewport).unwrap();
        assert_abs_diff_eq!(extent.height, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_distance_has_no_extent() {
        let settings = ProjectionSettings::default();
        assert_eq!(settings.extent(0.0, &ViewportRect::default()), None);
    }

    #[test]
    fn apply_switches_projection_variant() {
        let viewport = ViewportRect::from_size(800.0, 400.0);
        let settings = ProjectionSettings::default().orthographic();
        let extent = settings.extent(5.0, &viewport);
        let mut projection = Projection::Perspective(PerspectiveProjection::default());
        assert!(settings.apply(extent, &viewport, &mut projection));
        let Projection::Orthographic(ortho) = &projection else {
            panic!("expected an orthographic projection");
        };
        assert!(matches!(ortho.scaling_mode, ScalingMode::Fixed { .. }));

        let settings = ProjectionSettings::default().with_fov(FRAC_PI_2);
        assert!(settings.apply(None, &viewport, &mut projection));
        let Projection::Perspective(perspective) = &projection else {
            panic!("expected a perspective projection");
        };
        let expected = 2.0 * (0.5f64).atan();
        assert_abs_diff_eq!(perspective.fov as f64, expected, epsilon = 1e-6);
        assert_abs_diff_eq!(perspective.aspect_ratio, 2.0);
    }
}
