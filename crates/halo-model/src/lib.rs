#![forbid(unsafe_code)]

//! Reactive hypermedia models.
//!
//! A [`Model`] wraps one HAL-style resource: plain attributes, a link table
//! built from `_links`, resources hoisted from `_embedded`, and [`Command`]s
//! described by `_commands`. Nested objects become child models, arrays of
//! objects become [`Collection`]s, and every change is announced through
//! named events that bubble up to the root (`change:title:author:book`).
//!
//! ```
//! use halo_model::Model;
//! use serde_json::json;
//!
//! let book = Model::new(json!({
//!     "_links": {"self": {"href": "/books/1"}},
//!     "title": "Dune",
//!     "_embedded": {"author": {"name": "Herbert"}}
//! }))
//! .unwrap();
//!
//! assert_eq!(book.url().unwrap(), "/books/1");
//! assert_eq!(book.get("author.name").unwrap(), "Herbert");
//! ```
//!
//! # Modules
//!
//! - [`model`]: attribute store, set cycle, hypermedia surface
//! - [`link`]: link table, curies, relation resolution
//! - [`collection`]: reactive member lists
//! - [`command`]: command entities, clean/dirty tracking, push/pull
//! - [`config`]: per-variant configuration and prototypes
//! - [`path`]: dot/bracket attribute paths

pub mod attrs;
pub mod collection;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
mod hypermedia;
mod json;
pub mod link;
pub mod model;
pub mod path;
mod reconcile;
mod sync;
pub mod value;

pub use attrs::{Attrs, SetOptions};
pub use collection::Collection;
pub use command::Command;
pub use config::{ModelConfig, ModelSettings, ParseHook, Validator};
pub use error::{HypermediaError, ModelError, Result};
pub use event::{EventData, ModelEvent};
pub use link::{Link, LinkDelta, LinkEntry, LinkTable, Rel};
pub use model::{Cid, Model, WeakModel};
pub use path::{Path, Segment};
pub use value::Value;

pub use halo_reactive::{ListenerId, Subscription, SubscriptionScope};
pub use halo_uri::{Rfc6570, TemplateFactory, UriTemplate};
