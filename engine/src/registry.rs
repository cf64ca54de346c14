//! Handler registry.
//!
//! Handlers are tried from highest to lowest priority; the first whose
//! `can_handle` accepts a field wins. The sorted order and the per-type
//! lookup cache are rebuilt lazily after every registration.

use crate::{
    error::{Error, Result},
    handler::{
        AssetHandler, BlockGroupHandler, DefaultHandler, FieldHandler, LinkHandler,
        OptionsHandler, RelationHandler, SeoHandler,
    },
    host::{ContentHost, SEO_INTEGRATION},
    Field,
};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct RegistryState {
    /// Registration order
    handlers: Vec<Arc<dyn FieldHandler>>,
    /// Descending priority, ties in registration order
    sorted: Option<Vec<Arc<dyn FieldHandler>>>,
    /// Field type key -> resolved handler
    by_type: HashMap<String, Arc<dyn FieldHandler>>,
    /// Bumped on every registration
    generation: u64,
}

impl RegistryState {
    fn invalidate(&mut self) {
        self.sorted = None;
        self.by_type.clear();
        self.generation += 1;
    }

    fn sorted(&mut self) -> &[Arc<dyn FieldHandler>] {
        let handlers = &self.handlers;
        self.sorted.get_or_insert_with(|| {
            let mut sorted = handlers.clone();
            // sort_by_key is stable, so equal priorities keep registration order
            sorted.sort_by_key(|h| Reverse(h.priority()));
            sorted
        })
    }
}

/// Priority-ordered lookup of field handlers.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    state: Mutex<RegistryState>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers.
    ///
    /// Specialized handlers first, then the SEO handler when the integration
    /// is enabled, then the catch-all default handler last.
    pub fn with_defaults(seo_enabled: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let registry = Self::new();
            {
                let mut state = registry.lock();
                state.handlers.push(Arc::new(OptionsHandler::new()));
                state.handlers.push(Arc::new(RelationHandler::new()));
                state.handlers.push(Arc::new(AssetHandler::new()));
                state.handlers.push(Arc::new(LinkHandler::new()));
                state
                    .handlers
                    .push(Arc::new(BlockGroupHandler::new(weak.clone())));
                if seo_enabled {
                    state.handlers.push(Arc::new(SeoHandler::new()));
                }
                state.handlers.push(Arc::new(DefaultHandler::new()));
            }
            registry
        })
    }

    /// Registry with the built-in handlers, asking the host about optional integrations.
    pub fn bootstrap<H: ContentHost + ?Sized>(host: &H) -> Arc<Self> {
        let seo_enabled = host.integration_enabled(SEO_INTEGRATION);
        tracing::debug!(seo_enabled, "building handler registry");
        Self::with_defaults(seo_enabled)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register one handler.
    ///
    /// Rejects handlers with an empty name or a name already registered.
    pub fn register<H: FieldHandler + 'static>(&self, handler: H) -> Result<()> {
        self.register_multiple(vec![Arc::new(handler)])
    }

    /// Register several handlers; none are added if any is rejected.
    pub fn register_multiple(&self, handlers: Vec<Arc<dyn FieldHandler>>) -> Result<()> {
        let mut state = self.lock();

        let mut names: Vec<&str> = state.handlers.iter().map(|h| h.name()).collect();
        for handler in &handlers {
            let name = handler.name();
            if name.trim().is_empty() {
                return Err(Error::InvalidHandler("handler name must not be empty".into()));
            }
            if names.contains(&name) {
                return Err(Error::InvalidHandler(format!(
                    "handler '{name}' is already registered"
                )));
            }
            names.push(name);
        }

        state.handlers.extend(handlers);
        state.invalidate();
        Ok(())
    }

    /// Resolve the handler for a field, caching by the field's type.
    ///
    /// The lock is released while handlers are asked, so `can_handle` may call
    /// back into the registry.
    pub fn get_handler(&self, field: &Field) -> Result<Arc<dyn FieldHandler>> {
        let key = field.kind.type_key();

        let (candidates, generation) = {
            let mut state = self.lock();
            if let Some(handler) = state.by_type.get(key) {
                return Ok(Arc::clone(handler));
            }
            (state.sorted().to_vec(), state.generation)
        };

        let handler = candidates
            .into_iter()
            .find(|h| h.can_handle(field))
            .ok_or_else(|| Error::NoHandlerFound {
                handle: field.handle.clone(),
                field_type: key.to_string(),
            })?;

        // A registration in the meantime makes the answer stale for the cache
        let mut state = self.lock();
        if state.generation == generation {
            state
                .by_type
                .entry(key.to_string())
                .or_insert_with(|| Arc::clone(&handler));
        }
        Ok(handler)
    }

    /// All handlers in lookup order.
    pub fn handlers(&self) -> Vec<Arc<dyn FieldHandler>> {
        self.lock().sorted().to_vec()
    }

    /// Find a handler by identity rather than by field.
    pub fn handler_named(&self, name: &str) -> Option<Arc<dyn FieldHandler>> {
        self.lock()
            .sorted()
            .iter()
            .find(|h| h.name() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        handler::{Exported, ImportContext},
        FieldKind, FieldValue,
    };
    use serde_json::Value;

    /// Test handler claiming every plain text field.
    struct ShoutHandler {
        name: &'static str,
        priority: i32,
    }

    impl FieldHandler for ShoutHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn can_handle(&self, field: &Field) -> bool {
            field.kind == FieldKind::PlainText
        }

        fn export(&self, _field: &Field, value: &FieldValue) -> Result<Exported> {
            let text = value.to_plain_json().as_str().unwrap_or_default().to_uppercase();
            Ok(Exported::Value(Value::String(text)))
        }

        fn import(&self, _f: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
            Ok(FieldValue::from_json(value))
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    /// Test handler that consults the registry from `can_handle`.
    struct DelegatingHandler {
        registry: std::sync::Weak<HandlerRegistry>,
    }

    impl FieldHandler for DelegatingHandler {
        fn name(&self) -> &'static str {
            "delegating"
        }

        fn can_handle(&self, field: &Field) -> bool {
            field.kind == FieldKind::PlainText
                && self
                    .registry
                    .upgrade()
                    .is_some_and(|r| r.handler_named(DefaultHandler::NAME).is_some())
        }

        fn export(&self, _field: &Field, value: &FieldValue) -> Result<Exported> {
            Ok(Exported::Value(value.to_plain_json()))
        }

        fn import(&self, _f: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
            Ok(FieldValue::from_json(value))
        }

        fn priority(&self) -> i32 {
            10
        }
    }

    fn text_field() -> Field {
        Field::optional("summary", FieldKind::PlainText)
    }

    #[test]
    fn defaults_resolve_by_family() {
        let registry = HandlerRegistry::with_defaults(false);

        let cases = [
            (FieldKind::Dropdown, OptionsHandler::NAME),
            (FieldKind::Entries, RelationHandler::NAME),
            (FieldKind::Assets, AssetHandler::NAME),
            (FieldKind::Link, LinkHandler::NAME),
            (FieldKind::Matrix, BlockGroupHandler::NAME),
            (FieldKind::Number, DefaultHandler::NAME),
            (
                FieldKind::Custom(crate::field::SEO_FIELD_SIGNATURE.into()),
                DefaultHandler::NAME,
            ),
        ];
        for (kind, expected) in cases {
            let field = Field::optional("f", kind);
            assert_eq!(registry.get_handler(&field).unwrap().name(), expected);
        }
    }

    #[test]
    fn seo_handler_only_when_enabled() {
        let field = Field::optional("seo", FieldKind::Custom(crate::field::SEO_FIELD_SIGNATURE.into()));

        let with_seo = HandlerRegistry::with_defaults(true);
        assert_eq!(with_seo.get_handler(&field).unwrap().name(), SeoHandler::NAME);
        assert!(with_seo.handler_named(SeoHandler::NAME).is_some());

        let without = HandlerRegistry::with_defaults(false);
        assert!(without.handler_named(SeoHandler::NAME).is_none());
    }

    #[test]
    fn default_handler_sorts_last() {
        let registry = HandlerRegistry::with_defaults(true);
        let handlers = registry.handlers();
        assert_eq!(handlers.last().unwrap().name(), DefaultHandler::NAME);
        assert_eq!(handlers.first().unwrap().name(), BlockGroupHandler::NAME);

        let priorities: Vec<i32> = handlers.iter().map(|h| h.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by_key(|p| Reverse(*p));
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn registration_invalidates_cache() {
        let registry = HandlerRegistry::with_defaults(false);
        assert_eq!(
            registry.get_handler(&text_field()).unwrap().name(),
            DefaultHandler::NAME
        );

        registry
            .register(ShoutHandler {
                name: "shout",
                priority: 10,
            })
            .unwrap();
        assert_eq!(registry.get_handler(&text_field()).unwrap().name(), "shout");
    }

    #[test]
    fn equal_priority_keeps_registration_order() {
        let registry = HandlerRegistry::new();
        registry
            .register(ShoutHandler {
                name: "first",
                priority: 0,
            })
            .unwrap();
        registry
            .register(ShoutHandler {
                name: "second",
                priority: 0,
            })
            .unwrap();
        registry.register(DefaultHandler::new()).unwrap();

        assert_eq!(registry.get_handler(&text_field()).unwrap().name(), "first");
        let names: Vec<&str> = registry.handlers().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["first", "second", DefaultHandler::NAME]);
    }

    #[test]
    fn rejects_invalid_handlers() {
        let registry = HandlerRegistry::with_defaults(false);
        let before = registry.len();

        let duplicate = registry.register(DefaultHandler::new());
        assert!(matches!(duplicate, Err(Error::InvalidHandler(_))));
        assert_eq!(duplicate.unwrap_err().kind(), ErrorKind::InvalidHandler);

        let unnamed = registry.register(ShoutHandler {
            name: " ",
            priority: 1,
        });
        assert!(matches!(unnamed, Err(Error::InvalidHandler(_))));

        let batch = registry.register_multiple(vec![
            Arc::new(ShoutHandler {
                name: "ok",
                priority: 1,
            }),
            Arc::new(ShoutHandler {
                name: "ok",
                priority: 1,
            }),
        ]);
        assert!(batch.is_err());
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn can_handle_may_consult_the_registry() {
        let registry = HandlerRegistry::with_defaults(false);
        registry
            .register(DelegatingHandler {
                registry: Arc::downgrade(&registry),
            })
            .unwrap();

        assert_eq!(registry.get_handler(&text_field()).unwrap().name(), "delegating");
        // Second lookup is served from the cache
        assert_eq!(registry.get_handler(&text_field()).unwrap().name(), "delegating");
    }

    #[test]
    fn no_handler_without_catch_all() {
        let registry = HandlerRegistry::new();
        let result = registry.get_handler(&text_field());
        assert!(matches!(result, Err(Error::NoHandlerFound { .. })));
    }

    #[test]
    fn native_serialization_follows_priority() {
        let registry = HandlerRegistry::with_defaults(true);
        for handler in registry.handlers() {
            let expected = handler.name() == DefaultHandler::NAME;
            assert_eq!(handler.use_native_serialization(), expected, "{}", handler.name());
        }
    }
}
