//! Sync-commands mode: two-way binding between top-level attributes and
//! command properties that held the same value at (re)initialization.
//!
//! Pairs are computed once per construction or `reinit` and live in the
//! model's sync scope until the next `reinit` releases them. Each pair
//! shares a re-entrancy guard so a write bounced back from the other side
//! is dropped instead of looping.

use std::cell::Cell;
use std::rc::Rc;

use halo_reactive::SubscriptionScope;
use tracing::{debug, warn};

use crate::attrs::SetOptions;
use crate::event;
use crate::model::Model;
use crate::value::Value;

/// Pair every `(attribute, command, property)` whose values are equal now.
pub(crate) fn pair(model: &Model) {
    let released = std::mem::take(&mut model.state_mut().sync);
    drop(released);

    let mut scope = SubscriptionScope::new();
    let attributes = model.attributes();
    for command in model.commands() {
        let properties = command.properties();
        for (key, value) in &attributes {
            if value.is_nested() || properties.attribute(key).as_ref() != Some(value) {
                continue;
            }
            debug!(attribute = %key, command = command.id(), "sync pair");
            bind(&mut scope, model, properties, key);
        }
    }
    model.state_mut().sync = scope;
}

fn bind(scope: &mut SubscriptionScope, parent: &Model, properties: &Model, key: &str) {
    let guard = Rc::new(Cell::new(false));
    let options = SetOptions::default().with_ignore_dot_notation(true);

    let target = properties.downgrade();
    let busy = Rc::clone(&guard);
    let prop = key.to_owned();
    scope.subscribe(parent.emitter(), event::change(key), move |e| {
        relay(&busy, target.upgrade(), &prop, e.payload().value.as_ref(), options);
    });

    let target = parent.downgrade();
    let busy = guard;
    let attr = key.to_owned();
    scope.subscribe(properties.emitter(), event::change(key), move |e| {
        relay(&busy, target.upgrade(), &attr, e.payload().value.as_ref(), options);
    });
}

fn relay(
    busy: &Cell<bool>,
    target: Option<Model>,
    key: &str,
    value: Option<&Value>,
    options: SetOptions,
) {
    if busy.get() {
        return;
    }
    let Some(target) = target else {
        return;
    };
    let value = value.map_or_else(Value::null, Value::detached);
    busy.set(true);
    let result = target.set_with(key, value, options);
    busy.set(false);
    if let Err(err) = result {
        warn!(%err, key, "sync relay rejected");
    }
}
