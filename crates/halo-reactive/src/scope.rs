#![forbid(unsafe_code)]

//! Lifecycle holder for groups of subscriptions.
//!
//! A [`SubscriptionScope`] owns a set of [`Subscription`] guards. Dropping or
//! clearing the scope releases all of them, cleanly disconnecting every
//! listener registered through it.
//!
//! # Invariants
//!
//! 1. Subscriptions are released in reverse registration order.
//! 2. After `clear()` or drop, no callback registered through this scope fires.
//! 3. A cleared scope is reusable.

use crate::emitter::{Emitter, Event, Subscription};

/// Collects subscriptions for a logical owner (a command, a sync pairing).
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Hold an externally created subscription.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `name` on `emitter` within this scope.
    pub fn subscribe<P: Clone + 'static>(
        &mut self,
        emitter: &Emitter<P>,
        name: impl Into<String>,
        callback: impl Fn(&Event<P>) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(emitter.subscribe(name, callback));
        self
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything now.
    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Default for SubscriptionScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn scope_holds_subscriptions() {
        let emitter = Emitter::new();
        let seen = Rc::new(Cell::new(0));

        let mut scope = SubscriptionScope::new();
        let s = Rc::clone(&seen);
        scope.subscribe(&emitter, "x", move |e: &Event<i32>| s.set(*e.payload()));
        assert_eq!(scope.len(), 1);

        emitter.trigger("x", 42);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn scope_drop_releases_subscriptions() {
        let emitter = Emitter::new();
        let seen = Rc::new(Cell::new(0));
        {
            let mut scope = SubscriptionScope::new();
            let s = Rc::clone(&seen);
            scope.subscribe(&emitter, "x", move |e: &Event<i32>| s.set(*e.payload()));
            emitter.trigger("x", 1);
        }
        emitter.trigger("x", 99);
        assert_eq!(seen.get(), 1, "callback should not fire after scope dropped");
    }

    #[test]
    fn scope_reusable_after_clear() {
        let emitter: Emitter<()> = Emitter::new();
        let mut scope = SubscriptionScope::new();

        let first = Rc::new(Cell::new(false));
        let f = Rc::clone(&first);
        scope.subscribe(&emitter, "x", move |_| f.set(true));
        scope.clear();
        assert!(scope.is_empty());

        let second = Rc::new(Cell::new(false));
        let s = Rc::clone(&second);
        scope.subscribe(&emitter, "x", move |_| s.set(true));

        emitter.trigger("x", ());
        assert!(!first.get());
        assert!(second.get());
    }

    #[test]
    fn scope_hold_external_subscription() {
        let emitter = Emitter::new();
        let seen = Rc::new(Cell::new(0));

        let mut scope = SubscriptionScope::new();
        let s = Rc::clone(&seen);
        scope.hold(emitter.subscribe("x", move |e: &Event<i32>| s.set(*e.payload())));

        emitter.trigger("x", 5);
        drop(scope);
        emitter.trigger("x", 99);
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn scope_debug_format() {
        let emitter: Emitter<()> = Emitter::new();
        let mut scope = SubscriptionScope::new();
        scope.subscribe(&emitter, "a", |_| {});
        scope.subscribe(&emitter, "b", |_| {});
        assert!(format!("{scope:?}").contains("subscriptions: 2"));
    }
}
