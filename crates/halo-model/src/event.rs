//! Event payloads and the names the model layer emits.
//!
//! | Name                       | Raised when                                     |
//! |----------------------------|-------------------------------------------------|
//! | `change:<attr>`            | an attribute changed                            |
//! | `change`                   | once per outermost `set` with changes           |
//! | `add-rel:<rel>`            | a relation appeared during a merge              |
//! | `change-rel:<rel>`         | a relation's href set changed                   |
//! | `remove-rel:<rel>`         | a relation disappeared                          |
//! | `add-command:<id>`         | a command appeared                              |
//! | `remove-command:<id>`      | a command disappeared                           |
//! | `change:<prop>:<id>`       | a command property changed                      |
//! | `dirty:<id>` / `clean:<id>`| command dirty state transitions                 |
//! | `add` / `remove` / `reset` | collection membership changes                   |
//!
//! Nested entities re-emit each event on their parent suffixed with
//! `:<key>`, so names grow from the leaf outward.

use halo_reactive::Event;

use crate::attrs::SetOptions;
use crate::value::Value;

/// Payload carried by every model event.
#[derive(Debug, Clone, Default)]
pub struct EventData {
    /// The value the event is about, when there is one.
    pub value: Option<Value>,
    /// Options of the mutation that raised the event.
    pub options: SetOptions,
}

impl EventData {
    #[must_use]
    pub fn new(value: Option<Value>, options: SetOptions) -> Self {
        Self { value, options }
    }

    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Some(value),
            options: SetOptions::default(),
        }
    }
}

pub type ModelEvent = Event<EventData>;

pub const CHANGE: &str = "change";
pub const ADD: &str = "add";
pub const REMOVE: &str = "remove";
pub const RESET: &str = "reset";

#[must_use]
pub fn change(attr: &str) -> String {
    format!("change:{attr}")
}

/// The attribute named by a direct `change:<attr>` event. Cascaded names
/// such as `change:<attr>:<key>` yield `None`.
#[must_use]
pub fn changed_attribute(name: &str) -> Option<&str> {
    name.strip_prefix("change:")
        .filter(|attr| !attr.is_empty() && !attr.contains(':'))
}

#[must_use]
pub fn add_rel(rel: &str) -> String {
    format!("add-rel:{rel}")
}

#[must_use]
pub fn change_rel(rel: &str) -> String {
    format!("change-rel:{rel}")
}

#[must_use]
pub fn remove_rel(rel: &str) -> String {
    format!("remove-rel:{rel}")
}

#[must_use]
pub fn add_command(id: &str) -> String {
    format!("add-command:{id}")
}

#[must_use]
pub fn remove_command(id: &str) -> String {
    format!("remove-command:{id}")
}

#[must_use]
pub fn command_property(prop: &str, id: &str) -> String {
    format!("change:{prop}:{id}")
}

#[must_use]
pub fn dirty(id: &str) -> String {
    format!("dirty:{id}")
}

#[must_use]
pub fn clean(id: &str) -> String {
    format!("clean:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_attribute_matches_direct_changes_only() {
        assert_eq!(changed_attribute(&change("priority")), Some("priority"));
        assert_eq!(changed_attribute(CHANGE), None);
        assert_eq!(changed_attribute("change:"), None);
        assert_eq!(changed_attribute("change:name:sub"), None);
        assert_eq!(changed_attribute("dirty:create"), None);
    }
}
