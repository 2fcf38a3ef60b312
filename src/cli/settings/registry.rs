//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::boolean::{markdown_handler, syntax_handler, typing_animation_handler};
use super::handlers::{BackendUrlHandler, ListenHandler, RequestTimeoutHandler, ThemeHandler};
use super::SettingHandler;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `nakshatra set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        // Register handlers in display order
        registry.register(Box::new(BackendUrlHandler));
        registry.register(Box::new(ListenHandler));
        registry.register(Box::new(RequestTimeoutHandler));
        registry.register(Box::new(ThemeHandler));
        registry.register(Box::new(markdown_handler()));
        registry.register(Box::new(syntax_handler()));
        registry.register(Box::new(typing_animation_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key. Underscored spellings (`backend_url`, as written
    /// in the config file) are accepted too.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        let normalized = key.trim().replace('_', "-");
        self.handlers.get(normalized.as_str()).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
