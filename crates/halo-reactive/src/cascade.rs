#![forbid(unsafe_code)]

//! Event cascades: re-emitting a child's events on a parent.
//!
//! A [`Cascade`] is attached to a child [`Emitter`] and holds a non-owning
//! reference to a parent emitter plus an optional key. Every event `E` the
//! child emits reaches the child's own listeners first, then is re-emitted on
//! the parent as `E:<key>` (or as `E` when the cascade has no key). Since the
//! parent's emit runs its own cascades, a `change:value` raised three levels
//! down surfaces on the root as `change:value:foo:bar`.
//!
//! # Invariants
//!
//! 1. Attaching the same `(parent, key)` pair twice is a no-op, so an event
//!    is never cascaded twice through one edge.
//! 2. Cascades never keep the parent alive.
//! 3. Observers on the child are unaffected by attaching or detaching.

use std::fmt;

use crate::emitter::{Emitter, Event, WeakEmitter};

/// One child-to-parent forwarding edge.
pub struct Cascade<P> {
    parent: WeakEmitter<P>,
    key: Option<String>,
}

impl<P> Clone for Cascade<P> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            key: self.key.clone(),
        }
    }
}

impl<P> fmt::Debug for Cascade<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cascade")
            .field("key", &self.key)
            .field("parent", &self.parent)
            .finish()
    }
}

impl<P: Clone + 'static> Cascade<P> {
    /// Name the parent sees for a child event.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        match &self.key {
            Some(key) => format!("{name}:{key}"),
            None => name.to_owned(),
        }
    }

    pub(crate) fn forward(&self, event: &Event<P>) -> bool {
        match self.parent.upgrade() {
            Some(parent) => {
                parent.emit(&event.renamed(self.qualify(event.name())));
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.parent.upgrade().is_some()
    }

    fn targets(&self, parent: &Emitter<P>, key: Option<&str>) -> bool {
        self.key.as_deref() == key && self.parent.points_to(parent)
    }
}

impl<P: Clone + 'static> Emitter<P> {
    /// Forward every event of `self` to `parent`, suffixed with `:<key>`.
    ///
    /// Returns `false` when the same edge is already attached.
    pub fn cascade_to(&self, parent: &Self, key: Option<&str>) -> bool {
        let mut cascades = self.inner.cascades.borrow_mut();
        if cascades.iter().any(|c| c.targets(parent, key)) {
            return false;
        }
        cascades.push(Cascade {
            parent: parent.downgrade(),
            key: key.map(str::to_owned),
        });
        true
    }

    /// Remove a forwarding edge. Returns `false` if it was not attached.
    pub fn detach_cascade(&self, parent: &Self, key: Option<&str>) -> bool {
        let mut cascades = self.inner.cascades.borrow_mut();
        let before = cascades.len();
        cascades.retain(|c| !c.targets(parent, key));
        cascades.len() != before
    }

    /// Number of attached forwarding edges, live or not.
    #[must_use]
    pub fn cascade_count(&self) -> usize {
        self.inner.cascades.borrow().len()
    }
}
