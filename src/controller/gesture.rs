//! Gesture channels, their accumulators, and the viewport used to normalize pointer positions.

use bevy_math::DVec2;
use bevy_reflect::prelude::*;

/// A logical input stream, independent of the physical button or key driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum GestureChannel {
    /// Orbit the camera around the target.
    Rotate,
    /// Move the camera toward or away from the target.
    Zoom,
    /// Translate the camera and target together.
    Pan,
    /// Rotate the up vector around the view axis.
    Roll,
}

impl GestureChannel {
    /// Which normalization scheme pointer positions on this channel use.
    pub fn mapping(self) -> ScreenMapping {
        match self {
            GestureChannel::Rotate | GestureChannel::Roll => ScreenMapping::Circle,
            GestureChannel::Zoom | GestureChannel::Pan => ScreenMapping::Fraction,
        }
    }
}

/// The two pixel-to-normalized mappings. They are not interchangeable: the rotation feel depends
/// on the exact circle mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ScreenMapping {
    /// `(0, 0)` at the top left corner, `(1, 1)` at the bottom right.
    Fraction,
    /// Origin at the center of the viewport, scaled by half the width, y pointing up.
    Circle,
}

/// The screen-space rectangle of the canvas, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ViewportRect {
    /// Distance from the page origin to the left edge.
    pub left: f64,
    /// Distance from the page origin to the top edge.
    pub top: f64,
    /// Width in logical pixels.
    pub width: f64,
    /// Height in logical pixels.
    pub height: f64,
}

impl Default for ViewportRect {
    fn default() -> Self {
        Self::from_size(1280.0, 720.0)
    }
}

impl ViewportRect {
    /// A viewport with its top left corner at the page origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    /// Returns `true` if the rectangle can be used to normalize coordinates.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Returns `true` if the page position lies inside the rectangle, edges included.
    pub fn contains(&self, page: DVec2) -> bool {
        self.is_valid()
            && page.x >= self.left
            && page.x <= self.left + self.width
            && page.y >= self.top
            && page.y <= self.top + self.height
    }

    /// Height over width, used by horizontally fixed frustums.
    pub fn height_over_width(&self) -> f64 {
        if self.is_valid() {
            self.height / self.width
        } else {
            1.0
        }
    }

    /// Width over height, used by vertically fixed frustums.
    pub fn width_over_height(&self) -> f64 {
        if self.is_valid() {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Screen-fraction mapping, used by zoom and pan.
    pub fn fraction(&self, page: DVec2) -> DVec2 {
        if !self.is_valid() {
            return DVec2::ZERO;
        }
        DVec2::new(
            (page.x - self.left) / self.width,
            (page.y - self.top) / self.height,
        )
    }

    /// Circle mapping, used by rotate and roll.
    pub fn circle(&self, page: DVec2) -> DVec2 {
        if !self.is_valid() {
            return DVec2::ZERO;
        }
        DVec2::new(
            (page.x - self.width * 0.5 - self.left) / (self.width * 0.5),
            (self.height + 2.0 * (self.top - page.y)) / self.width,
        )
    }

    /// Normalize a page position with the given mapping.
    pub fn normalize(&self, page: DVec2, mapping: ScreenMapping) -> DVec2 {
        match mapping {
            ScreenMapping::Fraction => self.fraction(page),
            ScreenMapping::Circle => self.circle(page),
        }
    }
}

/// Running state of a single channel.
///
/// Input handlers only ever write `current` (and the wheel nudges the zoom `previous`); the frame
/// update reads `current - previous` and then advances `previous`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct Accumulator {
    /// The point consumed by the last frame update.
    pub previous: DVec2,
    /// The latest sample.
    pub current: DVec2,
}

impl Accumulator {
    /// Start a gesture at `point` with a zero initial delta.
    pub fn seed(&mut self, point: DVec2) {
        self.previous = point;
        self.current = point;
    }

    /// The pending delta since the last frame.
    pub fn delta(&self) -> DVec2 {
        self.current - self.previous
    }

    /// Mark the pending delta as consumed.
    pub fn advance(&mut self) {
        self.previous = self.current;
    }
}

/// One accumulator per [`GestureChannel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct GestureAccumulators {
    /// Rotate channel, circle mapped.
    pub rotate: Accumulator,
    /// Zoom channel, screen-fraction mapped. Also receives wheel deltas.
    pub zoom: Accumulator,
    /// Pan channel, screen-fraction mapped.
    pub pan: Accumulator,
    /// Roll channel, circle mapped.
    pub roll: Accumulator,
}

impl GestureAccumulators {
    /// The accumulator backing `channel`.
    pub fn channel(&self, channel: GestureChannel) -> &Accumulator {
        match channel {
            GestureChannel::Rotate => &self.rotate,
            GestureChannel::Zoom => &self.zoom,
            GestureChannel::Pan => &self.pan,
            GestureChannel::Roll => &self.roll,
        }
    }

    /// Mutable access to the accumulator backing `channel`.
    pub fn channel_mut(&mut self, channel: GestureChannel) -> &mut Accumulator {
        match channel {
            GestureChannel::Rotate => &mut self.rotate,
            GestureChannel::Zoom => &mut self.zoom,
            GestureChannel::Pan => &mut self.pan,
            GestureChannel::Roll => &mut self.roll,
        }
    }
}
