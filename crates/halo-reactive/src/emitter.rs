#![forbid(unsafe_code)]

//! Named-event emitter with RAII subscriptions.
//!
//! An [`Emitter<P>`] dispatches [`Event<P>`] values to listeners registered
//! either for one event name or for every event. Emitters are cheap handles
//! (`Rc` inside); clones share the same listener list.
//!
//! # Invariants
//!
//! 1. Listeners are invoked in registration order.
//! 2. Dispatch never holds an internal borrow while a listener runs, so a
//!    listener may register, remove, or trigger on the same emitter.
//! 3. A listener removed during a dispatch cycle may still be invoked for
//!    that cycle, never for a later one.
//! 4. After the local listeners ran, the event is forwarded through every
//!    live [`Cascade`](crate::cascade::Cascade) attached to the emitter.
//!
//! # Failure Modes
//!
//! - `off()` with an unknown id returns `false` (no panic).
//! - Triggering on an emitter whose cascade parents were dropped silently
//!   skips and prunes those cascades.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::cascade::Cascade;

/// A named event carrying a payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Event<P> {
    name: String,
    payload: P,
}

impl<P> Event<P> {
    /// Create an event.
    pub fn new(name: impl Into<String>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The event name (e.g. `"change:title"`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Consume the event, returning its payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

impl<P: Clone> Event<P> {
    /// Copy of this event under another name, same payload.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: self.payload.clone(),
        }
    }
}

/// Handle identifying one registered listener on one emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

type Callback<P> = Rc<dyn Fn(&Event<P>)>;

#[derive(Clone)]
enum Filter {
    Named(String),
    All,
}

impl Filter {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Named(n) => n == name,
            Self::All => true,
        }
    }
}

struct Listener<P> {
    id: ListenerId,
    filter: Filter,
    callback: Callback<P>,
}

pub(crate) struct EmitterInner<P> {
    listeners: RefCell<Vec<Listener<P>>>,
    pub(crate) cascades: RefCell<Vec<Cascade<P>>>,
    next_id: Cell<u64>,
}

/// Shared handle to a listener list.
pub struct Emitter<P> {
    pub(crate) inner: Rc<EmitterInner<P>>,
}

impl<P> Clone for Emitter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for Emitter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.inner.listeners.borrow().len())
            .field("cascades", &self.inner.cascades.borrow().len())
            .finish()
    }
}

impl<P: Clone + 'static> Default for Emitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone + 'static> Emitter<P> {
    /// Create an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                listeners: RefCell::new(Vec::new()),
                cascades: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    fn register(&self, filter: Filter, callback: Callback<P>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            filter,
            callback,
        });
        id
    }

    /// Listen for events named exactly `name`.
    pub fn on(&self, name: impl Into<String>, f: impl Fn(&Event<P>) + 'static) -> ListenerId {
        self.register(Filter::Named(name.into()), Rc::new(f))
    }

    /// Listen for every event.
    pub fn on_all(&self, f: impl Fn(&Event<P>) + 'static) -> ListenerId {
        self.register(Filter::All, Rc::new(f))
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Like [`on`](Self::on) but the listener lives as long as the returned guard.
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        f: impl Fn(&Event<P>) + 'static,
    ) -> Subscription {
        let id = self.on(name, f);
        Subscription::for_listener(self, id)
    }

    /// Like [`on_all`](Self::on_all) but guarded.
    pub fn subscribe_all(&self, f: impl Fn(&Event<P>) + 'static) -> Subscription {
        let id = self.on_all(f);
        Subscription::for_listener(self, id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Build and dispatch an event.
    pub fn trigger(&self, name: impl Into<String>, payload: P) {
        self.emit(&Event::new(name, payload));
    }

    /// Dispatch an event to local listeners, then through cascades.
    pub fn emit(&self, event: &Event<P>) {
        #[cfg(feature = "tracing")]
        tracing::trace!(event = event.name(), "emit");

        let callbacks: Vec<Callback<P>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.filter.matches(event.name()))
            .map(|l| Rc::clone(&l.callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }

        let cascades: Vec<Cascade<P>> = self.inner.cascades.borrow().clone();
        let mut dead = false;
        for cascade in &cascades {
            dead |= !cascade.forward(event);
        }
        if dead {
            self.inner.cascades.borrow_mut().retain(Cascade::is_live);
        }
    }

    /// Non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakEmitter<P> {
        WeakEmitter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same emitter.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Non-owning emitter handle.
pub struct WeakEmitter<P> {
    pub(crate) inner: Weak<EmitterInner<P>>,
}

impl<P> Clone for WeakEmitter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for WeakEmitter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEmitter")
            .field("live", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<P> WeakEmitter<P> {
    /// Upgrade to a strong handle if the emitter is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Emitter<P>> {
        self.inner.upgrade().map(|inner| Emitter { inner })
    }

    pub(crate) fn points_to(&self, emitter: &Emitter<P>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&emitter.inner))
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard that removes its listener when dropped.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn for_listener<P: Clone + 'static>(emitter: &Emitter<P>, id: ListenerId) -> Self {
        let weak = emitter.downgrade();
        Self {
            release: Some(Box::new(move || {
                if let Some(emitter) = weak.upgrade() {
                    emitter.off(id);
                }
            })),
        }
    }

    /// Keep the listener registered for the emitter's whole lifetime.
    pub fn forget(mut self) {
        self.release = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&Event<u32>) + Clone) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |e: &Event<u32>| {
            sink.borrow_mut().push(format!("{}={}", e.name(), e.payload()))
        })
    }

    #[test]
    fn named_listener_only_sees_its_event() {
        let emitter = Emitter::new();
        let (log, f) = recorder();
        emitter.on("change", f);

        emitter.trigger("change", 1);
        emitter.trigger("other", 2);

        assert_eq!(*log.borrow(), vec!["change=1"]);
    }

    #[test]
    fn catch_all_listener_sees_everything() {
        let emitter = Emitter::new();
        let (log, f) = recorder();
        emitter.on_all(f);

        emitter.trigger("a", 1);
        emitter.trigger("b", 2);

        assert_eq!(*log.borrow(), vec!["a=1", "b=2"]);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let emitter = Emitter::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let o = Rc::clone(&order);
            emitter.on("x", move |_: &Event<()>| o.borrow_mut().push(i));
        }
        emitter.trigger("x", ());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn off_removes_listener() {
        let emitter = Emitter::new();
        let (log, f) = recorder();
        let id = emitter.on("x", f);

        assert!(emitter.off(id));
        assert!(!emitter.off(id), "second removal is a no-op");
        emitter.trigger("x", 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subscription_drop_unsubscribes() {
        let emitter = Emitter::new();
        let (log, f) = recorder();
        {
            let _sub = emitter.subscribe("x", f);
            emitter.trigger("x", 1);
        }
        emitter.trigger("x", 2);
        assert_eq!(*log.borrow(), vec!["x=1"]);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn forgotten_subscription_stays() {
        let emitter = Emitter::new();
        let (log, f) = recorder();
        emitter.subscribe("x", f).forget();
        emitter.trigger("x", 3);
        assert_eq!(*log.borrow(), vec!["x=3"]);
    }

    #[test]
    fn subscription_outliving_emitter_is_harmless() {
        let sub = {
            let emitter: Emitter<u32> = Emitter::new();
            emitter.subscribe("x", |_| {})
        };
        drop(sub);
    }

    #[test]
    fn listener_may_trigger_reentrantly() {
        let emitter: Emitter<u32> = Emitter::new();
        let (log, f) = recorder();
        emitter.on("inner", f);
        let e = emitter.clone();
        emitter.on("outer", move |ev| e.trigger("inner", ev.payload() + 1));

        emitter.trigger("outer", 1);
        assert_eq!(*log.borrow(), vec!["inner=2"]);
    }

    #[test]
    fn listener_may_register_during_dispatch() {
        let emitter: Emitter<u32> = Emitter::new();
        let e = emitter.clone();
        emitter.on("x", move |_| {
            e.on("x", |_| {});
        });
        emitter.trigger("x", 0);
        assert_eq!(emitter.listener_count(), 2);
    }

    #[test]
    fn weak_handle_upgrades_while_alive() {
        let emitter: Emitter<u32> = Emitter::new();
        let weak = emitter.downgrade();
        assert!(weak.upgrade().is_some_and(|e| e.ptr_eq(&emitter)));
        drop(emitter);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn renamed_keeps_payload() {
        let ev = Event::new("change", 5u8);
        let r = ev.renamed("change:title");
        assert_eq!(r.name(), "change:title");
        assert_eq!(*r.payload(), 5);
    }
}
