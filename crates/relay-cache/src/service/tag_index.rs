//! Tag index owned by the cache service
//!
//! The backend has no notion of tags; this index maps tag -> keys (and
//! key -> tags, so overwrites purge stale memberships). It lives only
//! in service memory: after a process restart backend entries may still
//! be live while the index is empty, which is an accepted limitation
//! documented for in-process deployments.

use dashmap::DashMap;
use std::collections::HashSet;

/// Bidirectional tag <-> key index
///
/// Invariant: a key appears under tag T iff the envelope most recently
/// written for that key carried T. Both maps are updated in the same
/// operation, so the index never points at a stale entry for longer
/// than the duration of one call.
#[derive(Debug, Default)]
pub struct TagIndex {
    by_tag: DashMap<String, HashSet<String>>,
    by_key: DashMap<String, HashSet<String>>,
}

impl TagIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tags of a freshly written key, replacing any
    /// memberships from a previous envelope
    pub fn record(&self, key: &str, tags: &[String]) {
        self.forget(key);

        if tags.is_empty() {
            return;
        }
        for tag in tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.by_key
            .insert(key.to_string(), tags.iter().cloned().collect());
    }

    /// Drop a key from every tag bucket it belonged to
    pub fn forget(&self, key: &str) {
        if let Some((_, tags)) = self.by_key.remove(key) {
            for tag in tags {
                if let Some(mut keys) = self.by_tag.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        drop(keys);
                        self.by_tag.remove_if(&tag, |_, keys| keys.is_empty());
                    }
                }
            }
        }
    }

    /// All keys currently carrying a tag
    pub fn keys_with(&self, tag: &str) -> Vec<String> {
        self.by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a whole tag bucket, returning the keys it held
    pub fn take_tag(&self, tag: &str) -> Vec<String> {
        match self.by_tag.remove(tag) {
            Some((_, keys)) => keys.into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Drop every tag and key
    pub fn clear(&self) {
        self.by_tag.clear();
        self.by_key.clear();
    }

    /// Number of distinct tags currently indexed
    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }
}
