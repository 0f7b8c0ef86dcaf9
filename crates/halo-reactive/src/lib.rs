#![forbid(unsafe_code)]

//! Event primitives for halo.
//!
//! - [`Emitter`]: a named-event listener list with `on`/`off`/`trigger`.
//! - [`Subscription`]: RAII guard that removes its listener on drop.
//! - [`SubscriptionScope`]: owns a group of subscriptions.
//! - [`Cascade`]: forwards a child emitter's events to a parent under a
//!   qualified name (`event:key`).
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc`/`RefCell`). Dispatch is synchronous on
//! the caller's stack; listeners may re-enter the emitter that invoked them.
//! Cascade edges hold the parent weakly, so child-to-parent forwarding never
//! creates ownership cycles.

pub mod cascade;
pub mod emitter;
pub mod scope;

pub use cascade::Cascade;
pub use emitter::{Emitter, Event, ListenerId, Subscription, WeakEmitter};
pub use scope::SubscriptionScope;
