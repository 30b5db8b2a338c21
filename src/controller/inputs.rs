//! The input aggregator: turns raw pointer, wheel and keyboard events into writes on the
//! [`GestureAccumulators`].
//!
//! Events are engine agnostic ([`InputEvent`]); the [`input`](crate::input) module translates
//! Bevy's window and input events into them. Listener registration is modelled explicitly with
//! [`Listeners`]: an event is only processed if a listener for its target and kind is currently
//! registered, mirroring a canvas that only listens for document-level pointer moves while a
//! gesture is in progress.

use bevy_ecs::entity::Entity;
use bevy_input::keyboard::KeyCode;
use bevy_math::DVec2;
use bevy_reflect::prelude::*;

use super::gesture::{GestureAccumulators, GestureChannel, ViewportRect};

/// Wheel delta scale for [`WheelDeltaMode::Page`].
pub const WHEEL_PAGE_SCALE: f64 = 0.025;
/// Wheel delta scale for [`WheelDeltaMode::Line`].
pub const WHEEL_LINE_SCALE: f64 = 0.01;
/// Wheel delta scale for [`WheelDeltaMode::Pixel`].
pub const WHEEL_PIXEL_SCALE: f64 = 0.00025;

/// The device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum PointerKind {
    /// A mouse.
    Mouse,
    /// A pen or stylus.
    Pen,
    /// A touch contact. Touch input is ignored by the controller.
    Touch,
}

/// The pointer button that changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum PointerButton {
    /// Usually the left mouse button.
    Primary,
    /// Usually the wheel button.
    Auxiliary,
    /// Usually the right mouse button.
    Secondary,
    /// Any other button, identified by index.
    Other(u16),
}

impl PointerButton {
    /// The channel a button starts when no keyboard override is held.
    pub fn channel(self) -> Option<GestureChannel> {
        match self {
            PointerButton::Primary => Some(GestureChannel::Rotate),
            PointerButton::Auxiliary => Some(GestureChannel::Zoom),
            PointerButton::Secondary => Some(GestureChannel::Pan),
            PointerButton::Other(_) => None,
        }
    }
}

/// Unit of a wheel delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum WheelDeltaMode {
    /// Delta in pixels.
    Pixel,
    /// Delta in lines.
    Line,
    /// Delta in pages.
    Page,
}

impl WheelDeltaMode {
    /// How much one unit of delta moves the zoom accumulator.
    pub fn scale(self) -> f64 {
        match self {
            WheelDeltaMode::Page => WHEEL_PAGE_SCALE,
            WheelDeltaMode::Line => WHEEL_LINE_SCALE,
            WheelDeltaMode::Pixel => WHEEL_PIXEL_SCALE,
        }
    }
}

/// A raw input event, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum InputEvent {
    /// A pointer button was pressed over the canvas.
    PointerDown {
        /// The device.
        pointer: PointerKind,
        /// The button pressed.
        button: PointerButton,
        /// Page position of the pointer.
        position: DVec2,
    },
    /// The pointer moved anywhere in the document.
    PointerMove {
        /// The device.
        pointer: PointerKind,
        /// Page position of the pointer.
        position: DVec2,
    },
    /// A pointer button was released anywhere in the document.
    PointerUp {
        /// The device.
        pointer: PointerKind,
        /// The button released.
        button: PointerButton,
        /// Page position of the pointer.
        position: DVec2,
    },
    /// The wheel was scrolled over the canvas. Positive `delta_y` scrolls down.
    Wheel {
        /// Vertical delta.
        delta_y: f64,
        /// Unit of `delta_y`.
        mode: WheelDeltaMode,
    },
    /// A key was pressed.
    KeyDown(KeyCode),
    /// A key was released.
    KeyUp(KeyCode),
    /// The context menu was requested over the canvas.
    ContextMenu,
}

impl InputEvent {
    /// The listener that has to be registered for this event to be processed.
    pub fn listener(&self) -> Listener {
        let (target, kind) = match self {
            InputEvent::PointerDown { .. } => (ListenerTarget::Canvas, ListenerKind::PointerDown),
            InputEvent::PointerMove { .. } => (ListenerTarget::Document, ListenerKind::PointerMove),
            InputEvent::PointerUp { .. } => (ListenerTarget::Document, ListenerKind::PointerUp),
            InputEvent::Wheel { .. } => (ListenerTarget::Canvas, ListenerKind::Wheel),
            InputEvent::KeyDown(_) => (ListenerTarget::Window, ListenerKind::KeyDown),
            InputEvent::KeyUp(_) => (ListenerTarget::Window, ListenerKind::KeyUp),
            InputEvent::ContextMenu => (ListenerTarget::Canvas, ListenerKind::ContextMenu),
        };
        Listener { target, kind }
    }
}

/// What the host should do with an event after the controller has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// The controller did not consume the event.
    Ignored,
    /// The controller consumed the event; default handling may proceed.
    Handled,
    /// The controller consumed the event and asks the host to suppress default handling (context
    /// menu, text selection, page scrolling) and stop propagation.
    Suppress,
}

/// Where a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ListenerTarget {
    /// The canvas the camera renders to.
    Canvas,
    /// The document owning the canvas. Receives pointer events outside the canvas.
    Document,
    /// The window, for keyboard events.
    Window,
}

/// The event type a listener handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ListenerKind {
    /// Context menu requests, suppressed over the canvas.
    ContextMenu,
    /// Button presses that start a gesture.
    PointerDown,
    /// Pointer motion while a gesture is in progress.
    PointerMove,
    /// Button releases that end a gesture.
    PointerUp,
    /// Wheel scrolls, fed to the zoom channel.
    Wheel,
    /// Key presses that may force a channel.
    KeyDown,
    /// Key releases that end a forced channel.
    KeyUp,
}

/// A single listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct Listener {
    /// Where the listener is registered.
    pub target: ListenerTarget,
    /// The event type.
    pub kind: ListenerKind,
}

impl Listener {
    const fn new(target: ListenerTarget, kind: ListenerKind) -> Self {
        Self { target, kind }
    }
}

const CANVAS_LISTENERS: [Listener; 3] = [
    Listener::new(ListenerTarget::Canvas, ListenerKind::ContextMenu),
    Listener::new(ListenerTarget::Canvas, ListenerKind::PointerDown),
    Listener::new(ListenerTarget::Canvas, ListenerKind::Wheel),
];
const WINDOW_LISTENERS: [Listener; 2] = [
    Listener::new(ListenerTarget::Window, ListenerKind::KeyDown),
    Listener::new(ListenerTarget::Window, ListenerKind::KeyUp),
];
const DRAG_LISTENERS: [Listener; 2] = [
    Listener::new(ListenerTarget::Document, ListenerKind::PointerMove),
    Listener::new(ListenerTarget::Document, ListenerKind::PointerUp),
];
const KEY_DOWN: Listener = Listener::new(ListenerTarget::Window, ListenerKind::KeyDown);

/// The set of listeners a controller currently owns.
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct Listeners(Vec<Listener>);

impl Listeners {
    /// Register a listener. Registering twice has no effect.
    pub fn register(&mut self, listener: Listener) {
        if !self.0.contains(&listener) {
            self.0.push(listener);
        }
    }

    /// Remove a listener if present.
    pub fn unregister(&mut self, listener: Listener) {
        self.0.retain(|l| *l != listener);
    }

    /// Is `listener` registered?
    pub fn contains(&self, listener: Listener) -> bool {
        self.0.contains(&listener)
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Iterate over the current registrations.
    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.0.iter()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a controller receives its input from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub struct InputSource {
    /// Only accept events from this window. `None` accepts events from any window.
    pub window: Option<Entity>,
}

impl InputSource {
    /// Accept events from every window.
    pub fn any() -> Self {
        Self { window: None }
    }

    /// Accept events from a single window.
    pub fn window(window: Entity) -> Self {
        Self {
            window: Some(window),
        }
    }

    /// Should an event coming from `window` reach this controller?
    pub fn accepts(&self, window: Entity) -> bool {
        self.window.map_or(true, |w| w == window)
    }
}

/// Maps keys to the channel they force while held.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct KeyBindings {
    /// Each key and the channel it overrides.
    pub bindings: Vec<(KeyCode, GestureChannel)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                (KeyCode::KeyA, GestureChannel::Rotate),
                (KeyCode::KeyS, GestureChannel::Zoom),
                (KeyCode::ShiftLeft, GestureChannel::Pan),
                (KeyCode::ShiftRight, GestureChannel::Pan),
                (KeyCode::ControlLeft, GestureChannel::Roll),
                (KeyCode::ControlRight, GestureChannel::Roll),
            ],
        }
    }
}

impl KeyBindings {
    /// No keyboard overrides at all.
    pub fn none() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Bind `key` to `channel`, replacing any previous binding of that key.
    pub fn bind(&mut self, key: KeyCode, channel: GestureChannel) {
        self.bindings.retain(|(k, _)| *k != key);
        self.bindings.push((key, channel));
    }

    /// The channel bound to `key`, if any.
    pub fn channel_for(&self, key: KeyCode) -> Option<GestureChannel> {
        self.bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, channel)| *channel)
    }
}

/// Which channels are currently being driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
pub struct ActiveGesture {
    /// Channel selected by the pointer button that is held down.
    pub button: Option<GestureChannel>,
    /// Channel forced by a held key. Takes precedence over `button`.
    pub key: Option<GestureChannel>,
}

impl ActiveGesture {
    /// The channel pointer motion currently drives.
    pub fn channel(&self) -> Option<GestureChannel> {
        self.key.or(self.button)
    }
}

/// Listener registrations and gesture selection state of one controller.
#[derive(Debug, Clone, Default, PartialEq, Reflect)]
pub struct InputAggregator {
    active: ActiveGesture,
    listeners: Listeners,
    source: Option<InputSource>,
    last_pointer: Option<DVec2>,
}

impl InputAggregator {
    /// Register the canvas and window listeners.
    pub fn attach(&mut self, source: InputSource) {
        self.listeners.clear();
        for listener in CANVAS_LISTENERS.into_iter().chain(WINDOW_LISTENERS) {
            self.listeners.register(listener);
        }
        self.active = ActiveGesture::default();
        self.last_pointer = None;
        self.source = Some(source);
    }

    /// Remove every listener and forget any gesture in progress.
    pub fn detach(&mut self) {
        self.listeners.clear();
        self.active = ActiveGesture::default();
        self.last_pointer = None;
        self.source = None;
    }

    /// The source passed to the last [`attach`](Self::attach), if still attached.
    pub fn source(&self) -> Option<InputSource> {
        self.source
    }

    /// The current listener registrations.
    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Which channels are currently driven.
    pub fn active(&self) -> ActiveGesture {
        self.active
    }

    /// Is a pointer button currently held down on the canvas?
    pub fn is_dragging(&self) -> bool {
        self.listeners.contains(DRAG_LISTENERS[0])
    }

    /// Process one event. Returns `true` if the event was consumed.
    ///
    /// `channel_enabled` reports whether a channel may currently be driven, taking the motion
    /// toggles and roll lock into account.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        bindings: &KeyBindings,
        channel_enabled: impl Fn(GestureChannel) -> bool,
        viewport: &ViewportRect,
        gestures: &mut GestureAccumulators,
    ) -> bool {
        if !self.listeners.contains(event.listener()) {
            return false;
        }
        match *event {
            InputEvent::PointerDown {
                pointer,
                button,
                position,
            } => {
                if pointer == PointerKind::Touch {
                    return false;
                }
                if self.active.button.is_none() {
                    self.active.button = button.channel();
                }
                self.last_pointer = Some(position);
                if let Some(channel) = self.active.channel().filter(|c| channel_enabled(*c)) {
                    let point = viewport.normalize(position, channel.mapping());
                    gestures.channel_mut(channel).seed(point);
                }
                for listener in DRAG_LISTENERS {
                    self.listeners.register(listener);
                }
                true
            }
            InputEvent::PointerMove { pointer, position } => {
                if pointer == PointerKind::Touch {
                    return false;
                }
                self.last_pointer = Some(position);
                if let Some(channel) = self.active.channel().filter(|c| channel_enabled(*c)) {
                    gestures.channel_mut(channel).current =
                        viewport.normalize(position, channel.mapping());
                }
                true
            }
            InputEvent::PointerUp { pointer, .. } => {
                if pointer == PointerKind::Touch {
                    return false;
                }
                self.active.button = None;
                self.last_pointer = None;
                for listener in DRAG_LISTENERS {
                    self.listeners.unregister(listener);
                }
                true
            }
            InputEvent::Wheel { delta_y, mode } => {
                if !channel_enabled(GestureChannel::Zoom) || !delta_y.is_finite() {
                    return false;
                }
                gestures.zoom.previous.y -= delta_y * mode.scale();
                true
            }
            InputEvent::KeyDown(key) => {
                // Disarmed until the next key up, so auto-repeat does not re-select channels.
                self.listeners.unregister(KEY_DOWN);
                if self.active.key.is_some() {
                    return true;
                }
                if let Some(channel) = bindings.channel_for(key).filter(|c| channel_enabled(*c)) {
                    self.active.key = Some(channel);
                    self.reseed_active(viewport, gestures);
                }
                true
            }
            InputEvent::KeyUp(_) => {
                let had_override = self.active.key.take().is_some();
                self.listeners.register(KEY_DOWN);
                if had_override {
                    if let Some(channel) = self.active.channel().filter(|c| channel_enabled(*c)) {
                        if let Some(position) = self.last_pointer {
                            gestures
                                .channel_mut(channel)
                                .seed(viewport.normalize(position, channel.mapping()));
                        }
                    }
                }
                true
            }
            InputEvent::ContextMenu => true,
        }
    }

    /// Switching channels mid-drag starts the new channel at the last pointer position instead of
    /// wherever it was left.
    fn reseed_active(&mut self, viewport: &ViewportRect, gestures: &mut GestureAccumulators) {
        let (Some(channel), Some(position)) = (self.active.channel(), self.last_pointer) else {
            return;
        };
        if self.is_dragging() {
            gestures
                .channel_mut(channel)
                .seed(viewport.normalize(position, channel.mapping()));
        }
    }
}
