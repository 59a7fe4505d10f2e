//! Insertion-ordered, duplicate-free list of module names.

use std::collections::HashSet;

/// Module names in first-seen order with each name kept once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name, returning `false` when it was already present.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.order.push(name.to_string());
        true
    }

    /// Merge preset modules with extra modules: preset entries first, then any
    /// extra entry not already present.
    pub fn merge<'a>(
        preset: impl IntoIterator<Item = &'a str>,
        extra: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut set = Self::new();
        for name in preset.into_iter().chain(extra) {
            set.insert(name);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
