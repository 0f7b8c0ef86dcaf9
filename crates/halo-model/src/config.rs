//! Per-variant model configuration.
//!
//! A [`ModelConfig`] describes one entity variant: the defaults applied at
//! construction, a `parse` hook, a validator, sync-commands mode, the URI
//! template factory, and prototypes for nested keys. Children promoted under
//! a key with no registered prototype get the base config, which keeps only
//! the template factory.
//!
//! [`ModelSettings`] is the serde-loadable subset (flags and defaults) for
//! callers that keep configuration in JSON.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use halo_uri::{Rfc6570, TemplateFactory};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::attrs::Attrs;
use crate::model::Model;

/// Rejects a pending `set` with a message.
pub type Validator = Rc<dyn Fn(&Model, &Attrs) -> Result<(), String>>;

/// Rewrites a construction document after hypermedia sections are removed.
pub type ParseHook = Rc<dyn Fn(Map<String, Json>) -> Map<String, Json>>;

#[derive(Clone)]
pub struct ModelConfig {
    prototypes: AHashMap<String, Rc<ModelConfig>>,
    defaults: Map<String, Json>,
    sync_commands: bool,
    validator: Option<Validator>,
    parse: Option<ParseHook>,
    templates: Rc<dyn TemplateFactory>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            prototypes: AHashMap::new(),
            defaults: Map::new(),
            sync_commands: false,
            validator: None,
            parse: None,
            templates: Rc::new(Rfc6570),
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prototypes: Vec<_> = self.prototypes.keys().collect();
        prototypes.sort();
        f.debug_struct("ModelConfig")
            .field("prototypes", &prototypes)
            .field("defaults", &self.defaults)
            .field("sync_commands", &self.sync_commands)
            .field("validator", &self.validator.is_some())
            .field("parse", &self.parse.is_some())
            .field("templates", &self.templates)
            .finish()
    }
}

impl ModelConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for children promoted under `key`.
    #[must_use]
    pub fn with_prototype(mut self, key: impl Into<String>, config: Rc<ModelConfig>) -> Self {
        self.prototypes.insert(key.into(), config);
        self
    }

    /// Values filled in for keys missing from the construction document.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Map<String, Json>) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn with_sync_commands(mut self, enabled: bool) -> Self {
        self.sync_commands = enabled;
        self
    }

    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Model, &Attrs) -> Result<(), String> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    #[must_use]
    pub fn with_parse(
        mut self,
        parse: impl Fn(Map<String, Json>) -> Map<String, Json> + 'static,
    ) -> Self {
        self.parse = Some(Rc::new(parse));
        self
    }

    /// Swap the URI template implementation.
    #[must_use]
    pub fn with_templates(mut self, templates: Rc<dyn TemplateFactory>) -> Self {
        self.templates = templates;
        self
    }

    #[must_use]
    pub fn prototype(&self, key: &str) -> Option<&Rc<ModelConfig>> {
        self.prototypes.get(key)
    }

    #[must_use]
    pub fn defaults(&self) -> &Map<String, Json> {
        &self.defaults
    }

    #[must_use]
    pub fn sync_commands(&self) -> bool {
        self.sync_commands
    }

    #[must_use]
    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    #[must_use]
    pub fn parse_hook(&self) -> Option<&ParseHook> {
        self.parse.as_ref()
    }

    #[must_use]
    pub fn templates(&self) -> &dyn TemplateFactory {
        self.templates.as_ref()
    }

    /// Config for a child promoted under `key`.
    pub(crate) fn child_config(&self, key: &str) -> Rc<ModelConfig> {
        self.prototypes
            .get(key)
            .cloned()
            .unwrap_or_else(|| Rc::new(self.base()))
    }

    /// Plain config sharing only the template factory.
    pub(crate) fn base(&self) -> ModelConfig {
        ModelConfig {
            templates: Rc::clone(&self.templates),
            ..ModelConfig::default()
        }
    }
}

/// Serializable configuration subset.
///
/// ```
/// use halo_model::{ModelConfig, ModelSettings};
///
/// let settings: ModelSettings =
///     serde_json::from_str(r#"{"syncCommands": true, "defaults": {"page": 1}}"#).unwrap();
/// let config = ModelConfig::from(settings);
/// assert!(config.sync_commands());
/// assert_eq!(config.defaults()["page"], 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSettings {
    pub sync_commands: bool,
    pub defaults: Map<String, Json>,
}

impl From<ModelSettings> for ModelConfig {
    fn from(settings: ModelSettings) -> Self {
        ModelConfig::new()
            .with_sync_commands(settings.sync_commands)
            .with_defaults(settings.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_child_key_gets_base_config() {
        let config = ModelConfig::new()
            .with_sync_commands(true)
            .with_validator(|_, _| Ok(()));
        let child = config.child_config("anything");
        assert!(!child.sync_commands());
        assert!(child.validator().is_none());
    }

    #[test]
    fn registered_prototype_is_shared() {
        let proto = Rc::new(ModelConfig::new().with_sync_commands(true));
        let config = ModelConfig::new().with_prototype("nested", Rc::clone(&proto));
        assert!(Rc::ptr_eq(&config.child_config("nested"), &proto));
    }

    #[test]
    fn settings_default_when_fields_missing() {
        let settings: ModelSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ModelSettings::default());
    }

    #[test]
    fn debug_lists_prototype_keys() {
        let config = ModelConfig::new()
            .with_prototype("b", Rc::default())
            .with_prototype("a", Rc::default());
        let text = format!("{config:?}");
        assert!(text.contains(r#"prototypes: ["a", "b"]"#));
    }
}
