#![forbid(unsafe_code)]

//! URI template capability for halo.
//!
//! Link tables consume templates through two small traits so the expansion
//! engine is replaceable:
//!
//! - [`UriTemplate`]: a parsed template that expands against parameters.
//! - [`TemplateFactory`]: turns template text into a [`UriTemplate`].
//!
//! [`Rfc6570`] is the default factory, backed by [`Template`].
//!
//! # Example
//!
//! ```
//! use halo_uri::{Rfc6570, TemplateFactory};
//!
//! let t = Rfc6570.parse("/services/thing/{id}");
//! assert_eq!(t.expand(&[("id", "lol")]), "/services/thing/lol");
//! ```

pub mod template;

use std::fmt;
use std::rc::Rc;

pub use template::{Operator, Template};

/// A template that can be expanded with `(name, value)` parameters.
pub trait UriTemplate: fmt::Debug {
    /// The template text it was parsed from.
    fn source(&self) -> &str;

    /// Expand the template. Parameters not referenced are ignored.
    fn expand(&self, params: &[(&str, &str)]) -> String;
}

/// Builds [`UriTemplate`]s from template text.
pub trait TemplateFactory: fmt::Debug {
    /// Parse `source`. Implementations should not fail; malformed templates
    /// expand to something best-effort.
    fn parse(&self, source: &str) -> Rc<dyn UriTemplate>;
}

impl UriTemplate for Template {
    fn source(&self) -> &str {
        Template::source(self)
    }

    fn expand(&self, params: &[(&str, &str)]) -> String {
        Template::expand(self, params)
    }
}

/// Default factory producing RFC 6570 [`Template`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc6570;

impl TemplateFactory for Rfc6570 {
    fn parse(&self, source: &str) -> Rc<dyn UriTemplate> {
        Rc::new(Template::parse(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_builds_expandable_templates() {
        let t = Rfc6570.parse("/services/rels/{rel}");
        assert_eq!(t.source(), "/services/rels/{rel}");
        assert_eq!(t.expand(&[("rel", "thing")]), "/services/rels/thing");
    }

    #[test]
    fn templates_are_shareable() {
        let t = Rfc6570.parse("/a/{b}");
        let other = Rc::clone(&t);
        assert_eq!(other.expand(&[("b", "c")]), "/a/c");
    }
}
