//! Render cache
//!
//! Bounded least-recently-used store of full-resolution fields, keyed by
//! the page that owns the model and the rendered size. It only holds
//! expanded copies: models and reference redirects live in the collection,
//! so an eviction never changes which model a page resolves to.

use folio_core::FPix;
use std::collections::VecDeque;
use std::sync::Arc;

/// Full-resolution fields of one model at one page size
#[derive(Debug, Clone)]
pub(crate) struct FullFields {
    pub vertical: Arc<FPix>,
    /// Horizontal field with the slope field added, if built
    pub horizontal: Option<Arc<FPix>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CacheKey {
    pub page: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub(crate) struct FieldCache {
    capacity: usize,
    /// Least recently used first
    entries: VecDeque<(CacheKey, FullFields)>,
}

impl FieldCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up an entry and mark it most recently used
    pub fn get(&mut self, key: &CacheKey) -> Option<FullFields> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(pos)?;
        let fields = entry.1.clone();
        self.entries.push_back(entry);
        Some(fields)
    }

    /// Insert an entry, evicting the least recently used beyond capacity
    pub fn insert(&mut self, key: CacheKey, fields: FullFields) {
        if self.capacity == 0 {
            return;
        }
        self.entries.retain(|(k, _)| *k != key);
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, fields));
    }

    /// Drop every entry built from the model of `page`
    pub fn invalidate_page(&mut self, page: u32) {
        self.entries.retain(|(k, _)| k.page != page);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn pages(&self) -> Vec<u32> {
        self.entries.iter().map(|(k, _)| k.page).collect()
    }
}
