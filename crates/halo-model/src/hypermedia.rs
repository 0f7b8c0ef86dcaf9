//! Hypermedia merge: split `_links`, `_embedded` and `_commands` out of a
//! document before its attributes reach `set`.
//!
//! Structural events (`add-rel:*`, `add-command:*`, ...) are queued while
//! the merge runs and returned to the caller, which fires them once the
//! whole document is committed. A missing `_links` or `_commands` section
//! leaves the current links or commands as they are.

use serde_json::{Map, Value as Json};
use tracing::{debug, debug_span};

use crate::command;
use crate::error::Result;
use crate::link::LinkTable;
use crate::model::Model;

pub(crate) const LINKS: &str = "_links";
pub(crate) const EMBEDDED: &str = "_embedded";
pub(crate) const COMMANDS: &str = "_commands";

pub(crate) struct Merged {
    pub(crate) attrs: Map<String, Json>,
    pub(crate) events: Vec<String>,
}

/// Queue of structural events raised by one merge.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    names: Vec<String>,
}

impl EventQueue {
    pub(crate) fn push(&mut self, name: String) {
        debug!(event = %name, "queued structural event");
        self.names.push(name);
    }
}

pub(crate) fn merge(model: &Model, mut doc: Map<String, Json>) -> Result<Merged> {
    let _span = debug_span!("hypermedia_merge", cid = %model.cid()).entered();
    let mut queue = EventQueue::default();

    if let Some(raw) = doc.remove(LINKS) {
        let fresh = LinkTable::parse(&raw, model.config().templates())?;
        let mut state = model.state_mut();
        for delta in state.links.diff(&fresh) {
            queue.push(delta.event_name());
        }
        state.links = fresh;
    }

    if let Some(Json::Object(embedded)) = doc.remove(EMBEDDED) {
        for (key, value) in embedded {
            doc.insert(key, value);
        }
    }

    if let Some(raw) = doc.remove(COMMANDS) {
        command::merge_commands(model, &raw, &mut queue)?;
    }

    Ok(Merged {
        attrs: doc,
        events: queue.names,
    })
}
