//! Player cache
//!
//! Owns every live [`PlayerHandle`]. Two maps: the source index (at most
//! one handle per source key) and the handle arena. Evicting a source only
//! removes it from the index; the handle itself lives on in the arena until
//! the last cell holding it lets go.

use super::handle::PlayerHandle;
use reel_common::events::HandleId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PlayerCache {
    by_source: HashMap<String, HandleId>,
    handles: HashMap<HandleId, PlayerHandle>,
}

impl PlayerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle currently cached for a source key
    pub fn lookup(&self, key: &str) -> Option<HandleId> {
        self.by_source.get(key).copied()
    }

    /// Add a handle and index it under its source key
    ///
    /// Any previous handle indexed under the same key is detached from the
    /// index (it stays alive while held).
    pub fn insert(&mut self, handle: PlayerHandle) -> HandleId {
        let id = handle.id();
        self.by_source.insert(handle.source().key().to_string(), id);
        self.handles.insert(id, handle);
        id
    }

    pub fn get(&self, id: HandleId) -> Option<&PlayerHandle> {
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, id: HandleId) -> Option<&mut PlayerHandle> {
        self.handles.get_mut(&id)
    }

    /// Drop the source index entry for `key` if it points at `id`
    ///
    /// Returns true when an entry was removed.
    pub fn evict(&mut self, key: &str, id: HandleId) -> bool {
        if self.by_source.get(key) == Some(&id) {
            self.by_source.remove(key);
            true
        } else {
            false
        }
    }

    /// Take a handle out of the arena and the index
    pub fn remove(&mut self, id: HandleId) -> Option<PlayerHandle> {
        let handle = self.handles.remove(&id)?;
        self.evict(handle.source().key(), id);
        Some(handle)
    }

    /// Whether `id` is still reachable through the source index
    pub fn is_cached(&self, id: HandleId) -> bool {
        self.handles
            .get(&id)
            .map(|h| self.by_source.get(h.source().key()) == Some(&id))
            .unwrap_or(false)
    }

    /// Number of source index entries
    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Number of live handles, cached or detached
    pub fn live_count(&self) -> usize {
        self.handles.len()
    }

    pub fn ids(&self) -> Vec<HandleId> {
        self.handles.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerHandle> {
        self.handles.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerHandle> {
        self.handles.values_mut()
    }

    /// Empty both maps, handing back every live handle
    pub fn drain(&mut self) -> Vec<PlayerHandle> {
        self.by_source.clear();
        self.handles.drain().map(|(_, h)| h).collect()
    }
}
