//! Optional extensions to the base camera controller.

pub mod subscriptions;
