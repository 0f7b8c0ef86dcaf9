#![forbid(unsafe_code)]

//! Ordered, reactive list of models.
//!
//! Every member is built from the collection's prototype config and
//! cascades its events to the collection unchanged, so a member's
//! `change:name` is seen on the collection as `change:name` and on the
//! owning model as `change:name:<key>`.
//!
//! # Invariants
//!
//! 1. Members are only added through the prototype config.
//! 2. A removed member no longer forwards events to the collection.
//! 3. `reset` builds every new member before touching the current ones;
//!    a failed build leaves the collection unchanged.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use halo_reactive::{Emitter, ListenerId, Subscription};
use serde_json::Value as Json;

use crate::attrs::SetOptions;
use crate::config::ModelConfig;
use crate::error::Result;
use crate::event::{self, EventData, ModelEvent};
use crate::model::{Cid, Model, WeakModel};
use crate::value::Value;

struct CollectionInner {
    cid: Cid,
    prototype: Rc<ModelConfig>,
    models: RefCell<Vec<Model>>,
    emitter: Emitter<EventData>,
    parent: RefCell<WeakModel>,
}

/// Shared handle to a model list.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

impl Collection {
    #[must_use]
    pub fn new(prototype: Rc<ModelConfig>) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                cid: Cid::next(),
                prototype,
                models: RefCell::new(Vec::new()),
                emitter: Emitter::new(),
                parent: RefCell::new(WeakModel::default()),
            }),
        }
    }

    /// Build a collection from object documents, silently.
    pub fn from_documents(docs: Vec<Json>, prototype: Rc<ModelConfig>) -> Result<Self> {
        let collection = Self::new(prototype);
        let models = collection.build(docs)?;
        for model in &models {
            collection.adopt(model);
        }
        *collection.inner.models.borrow_mut() = models;
        Ok(collection)
    }

    fn build(&self, docs: Vec<Json>) -> Result<Vec<Model>> {
        docs.into_iter()
            .map(|doc| Model::with_config(doc, Rc::clone(&self.inner.prototype)))
            .collect()
    }

    fn adopt(&self, model: &Model) {
        model.emitter().cascade_to(&self.inner.emitter, None);
    }

    fn release(&self, model: &Model) {
        model.emitter().detach_cascade(&self.inner.emitter, None);
    }

    #[must_use]
    pub fn cid(&self) -> Cid {
        self.inner.cid
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn prototype(&self) -> &Rc<ModelConfig> {
        &self.inner.prototype
    }

    /// The model holding this collection as an attribute.
    #[must_use]
    pub fn parent(&self) -> Option<Model> {
        self.inner.parent.borrow().upgrade()
    }

    pub(crate) fn set_parent(&self, parent: &Model) {
        *self.inner.parent.borrow_mut() = parent.downgrade();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.models.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.models.borrow().is_empty()
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<Model> {
        self.inner.models.borrow().get(index).cloned()
    }

    /// Snapshot of the members.
    #[must_use]
    pub fn models(&self) -> Vec<Model> {
        self.inner.models.borrow().clone()
    }

    #[must_use]
    pub fn index_of(&self, model: &Model) -> Option<usize> {
        self.inner.models.borrow().iter().position(|m| m.ptr_eq(model))
    }

    /// Append a member built from `doc`.
    pub fn add(&self, doc: Json, options: SetOptions) -> Result<Model> {
        let model = Model::with_config(doc, Rc::clone(&self.inner.prototype))?;
        self.add_model(model.clone(), options);
        Ok(model)
    }

    /// Append an existing model. Already-held models are not added twice.
    pub fn add_model(&self, model: Model, options: SetOptions) {
        if self.index_of(&model).is_some() {
            return;
        }
        self.adopt(&model);
        self.inner.models.borrow_mut().push(model.clone());
        if !options.silent {
            self.trigger(event::ADD, EventData::new(Some(Value::Model(model)), options));
        }
    }

    /// Remove a member. `false` when it was not held.
    pub fn remove(&self, model: &Model, options: SetOptions) -> bool {
        let Some(index) = self.index_of(model) else {
            return false;
        };
        let removed = self.inner.models.borrow_mut().remove(index);
        self.release(&removed);
        if !options.silent {
            self.trigger(event::REMOVE, EventData::new(Some(Value::Model(removed)), options));
        }
        true
    }

    /// Drop every member past `len`, emitting `remove` for each.
    pub fn truncate(&self, len: usize, options: SetOptions) -> Vec<Model> {
        let removed: Vec<Model> = {
            let mut models = self.inner.models.borrow_mut();
            if len >= models.len() {
                return Vec::new();
            }
            models.split_off(len)
        };
        for model in &removed {
            self.release(model);
            if !options.silent {
                self.trigger(
                    event::REMOVE,
                    EventData::new(Some(Value::Model(model.clone())), options),
                );
            }
        }
        removed
    }

    /// Replace all members at once and emit a single `reset`.
    pub fn reset(&self, docs: Vec<Json>, options: SetOptions) -> Result<()> {
        let fresh = self.build(docs)?;
        for model in &fresh {
            self.adopt(model);
        }
        let stale = std::mem::replace(&mut *self.inner.models.borrow_mut(), fresh);
        for model in &stale {
            self.release(model);
        }
        if !options.silent {
            self.trigger(
                event::RESET,
                EventData::new(Some(Value::Collection(self.clone())), options),
            );
        }
        Ok(())
    }

    /// Serialized members.
    #[must_use]
    pub fn to_json(&self) -> Json {
        Json::Array(self.models().iter().map(Model::to_json).collect())
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter<EventData> {
        &self.inner.emitter
    }

    pub fn on(&self, name: impl Into<String>, f: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.inner.emitter.on(name, f)
    }

    pub fn on_all(&self, f: impl Fn(&ModelEvent) + 'static) -> ListenerId {
        self.inner.emitter.on_all(f)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.emitter.off(id)
    }

    pub fn subscribe(
        &self,
        name: impl Into<String>,
        f: impl Fn(&ModelEvent) + 'static,
    ) -> Subscription {
        self.inner.emitter.subscribe(name, f)
    }

    pub fn trigger(&self, name: impl Into<String>, data: EventData) {
        self.inner.emitter.trigger(name, data);
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("cid", &self.inner.cid.to_string())
            .field("len", &self.len())
            .finish()
    }
}
