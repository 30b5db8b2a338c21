//! A `bevy_trackball_cam` extension that forwards [`PoseChanged`] events to registered handlers,
//! each throttled to its own minimum interval.
//!
//! This is how a remote controller observes the view: register a handler that serializes the
//! pose and sends it over the wire, with an interval matching what the link can carry.

use std::{fmt, sync::Arc, time::Duration};

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_time::prelude::*;
use thiserror::Error;

use crate::controller::{
    component::TrackballCam,
    pose::{CameraPose, PoseChanged},
};

/// See the [module](self) docs.
pub struct PoseSubscriptionPlugin;

impl Plugin for PoseSubscriptionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Time>()
            .init_resource::<PoseSubscriptions>()
            .add_event::<PoseChanged>()
            .add_systems(First, PoseSubscriptions::tick_clock)
            .add_systems(
                PostUpdate,
                PoseSubscriptions::dispatch.after(TrackballCam::update_camera_positions),
            );
    }
}

/// Identifies a handler registered with [`PoseSubscriptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Returned when removing a handler that is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no pose handler registered as {0:?}")]
pub struct UnknownSubscription(pub SubscriptionId);

/// A pose handler. Receives the camera entity and its new pose.
pub type PoseHandler = Arc<dyn Fn(Entity, &CameraPose) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    interval: Duration,
    last_dispatched: Duration,
    handler: PoseHandler,
}

impl Subscriber {
    /// Strictly more than `interval` must have passed. A zero interval is never throttled.
    fn is_due(&self, now: Duration) -> bool {
        self.interval.is_zero() || now.saturating_sub(self.last_dispatched) > self.interval
    }
}

/// Handlers notified when a camera pose changes.
#[derive(Resource, Default)]
pub struct PoseSubscriptions {
    now: Duration,
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for PoseSubscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.subscribers
                    .iter()
                    .map(|s| (s.id, s.interval, s.last_dispatched, "<function>")),
            )
            .finish()
    }
}

impl PoseSubscriptions {
    /// Register a handler called on every pose change.
    pub fn add<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: Fn(Entity, &CameraPose) + Send + Sync + 'static,
    {
        self.add_with_interval(handler, Duration::ZERO)
    }

    /// Register a handler called at most once per `interval`. The interval starts at
    /// registration, and changes that arrive while the handler is throttled are dropped.
    pub fn add_with_interval<F>(&mut self, handler: F, interval: Duration) -> SubscriptionId
    where
        F: Fn(Entity, &CameraPose) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            interval,
            last_dispatched: self.now,
            handler: Arc::new(handler),
        });
        id
    }

    /// Unregister a handler.
    pub fn remove(&mut self, id: SubscriptionId) -> Result<(), UnknownSubscription> {
        let count = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        if self.subscribers.len() == count {
            return Err(UnknownSubscription(id));
        }
        Ok(())
    }

    /// Unregister every handler.
    pub fn remove_all(&mut self) {
        self.subscribers.clear();
    }

    /// The number of registered handlers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Advance the clock that new registrations start their interval from.
    pub fn tick(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Forward one pose change, at time `now`, to every handler that is not throttled.
    pub fn notify(&mut self, now: Duration, camera: Entity, pose: &CameraPose) {
        self.tick(now);
        for subscriber in self.subscribers.iter_mut().filter(|s| s.is_due(now)) {
            subscriber.last_dispatched = now;
            (subscriber.handler)(camera, pose);
        }
    }

    fn tick_clock(mut subscriptions: ResMut<Self>, time: Res<Time>) {
        subscriptions.tick(time.elapsed());
    }

    fn dispatch(
        mut subscriptions: ResMut<Self>,
        mut events: EventReader<PoseChanged>,
        time: Res<Time>,
    ) {
        if subscriptions.is_empty() {
            events.clear();
            return;
        }
        let now = time.elapsed();
        for event in events.read() {
            subscriptions.notify(now, event.camera, &event.pose);
        }
    }
}
