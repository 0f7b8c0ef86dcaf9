#![forbid(unsafe_code)]

//! halo: reactive hypermedia models.
//!
//! Re-exports the member crates and a [`prelude`] for the common surface.
//!
//! ```
//! use halo::prelude::*;
//! use serde_json::json;
//!
//! let list = Model::new(json!({
//!     "_links": {"self": {"href": "/tasks"}},
//!     "_commands": {"create": {"method": "POST", "properties": {"title": ""}}}
//! }))
//! .unwrap();
//!
//! let create = list.command("create").unwrap();
//! create.properties().set("title", "write docs").unwrap();
//! assert!(!create.is_clean());
//! create.clean().unwrap();
//! assert_eq!(create.properties().get("title").unwrap(), "");
//! ```

pub use halo_model as model;
pub use halo_reactive as reactive;
pub use halo_uri as uri;

pub use halo_model::{
    Attrs, Collection, Command, HypermediaError, Model, ModelConfig, ModelError, ModelSettings,
    Rel, SetOptions, Value,
};

/// Common imports.
pub mod prelude {
    pub use halo_model::{
        Attrs, Collection, Command, EventData, HypermediaError, Model, ModelConfig, ModelError,
        ModelEvent, ModelSettings, Rel, SetOptions, Value,
    };
    pub use halo_reactive::{Emitter, Subscription, SubscriptionScope};
    pub use halo_uri::{Rfc6570, TemplateFactory, UriTemplate};
}
