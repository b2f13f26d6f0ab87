//! Fixed-size memo of classification results.
//!
//! Entries are appended at the cursor and the oldest slot is overwritten once
//! the ring is full. Re-recording a handle does not remove its earlier entry,
//! so a stale duplicate can shadow a newer one until it is overwritten. That is
//! acceptable because classification is idempotent for a live window.

use crate::win32::WindowHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub hwnd: WindowHandle,
    pub is_target: bool,
}

#[derive(Debug, Clone)]
pub struct IdentityCache {
    slots: Vec<Option<CacheEntry>>,
    cursor: usize,
}

impl IdentityCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// First recorded verdict for `hwnd` in slot order, or `None` on a miss.
    pub fn lookup(&self, hwnd: WindowHandle) -> Option<bool> {
        self.slots
            .iter()
            .flatten()
            .find(|entry| entry.hwnd == hwnd)
            .map(|entry| entry.is_target)
    }

    pub fn record(&mut self, hwnd: WindowHandle, is_target: bool) {
        let cursor = self.cursor;
        if let Some(slot) = self.slots.get_mut(cursor) {
            *slot = Some(CacheEntry { hwnd, is_target });
        }
        self.cursor = (cursor + 1) % self.slots.len();
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
