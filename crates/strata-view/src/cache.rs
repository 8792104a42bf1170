/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Built-template cache.
//!
//! Keys are the raw path strings render calls were made with, so the same
//! file reached through two different spellings occupies two entries.
//! Unbounded, no expiry; `clear` is the only invalidation. Concurrent
//! renders of an uncached view may build it twice, which is harmless:
//! builds are idempotent and the last writer wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::template::Template;

#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    entries: Arc<RwLock<HashMap<String, Arc<Template>>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Template>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, template: Arc<Template>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.into(), template);
    }

    /// Drop every cached template.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
