use std::collections::HashMap;

use crate::win32::{WindowHandle, WindowProc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Added,
    AlreadyTracked,
    /// The configured limit of simultaneously subclassed windows is reached.
    Full,
}

/// Original window procedures of the windows whose messages are filtered.
#[derive(Debug, Clone)]
pub struct SubclassTable {
    limit: usize,
    originals: HashMap<WindowHandle, WindowProc>,
}

impl SubclassTable {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            originals: HashMap::new(),
        }
    }

    pub fn reserve(&mut self, hwnd: WindowHandle, original: WindowProc) -> Reservation {
        if self.originals.contains_key(&hwnd) {
            return Reservation::AlreadyTracked;
        }
        if self.originals.len() >= self.limit {
            return Reservation::Full;
        }
        self.originals.insert(hwnd, original);
        Reservation::Added
    }

    pub fn original(&self, hwnd: WindowHandle) -> Option<WindowProc> {
        self.originals.get(&hwnd).copied()
    }

    /// Swap the procedure messages are forwarded to, returning the old one.
    pub fn replace_original(&mut self, hwnd: WindowHandle, original: WindowProc) -> Option<WindowProc> {
        self.originals
            .get_mut(&hwnd)
            .map(|slot| std::mem::replace(slot, original))
    }

    pub fn remove(&mut self, hwnd: WindowHandle) -> Option<WindowProc> {
        self.originals.remove(&hwnd)
    }

    pub fn drain(&mut self) -> Vec<(WindowHandle, WindowProc)> {
        self.originals.drain().collect()
    }

    pub fn contains(&self, hwnd: WindowHandle) -> bool {
        self.originals.contains_key(&hwnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot_rejects_a_second_window() {
        let mut table = SubclassTable::new(1);
        assert_eq!(table.reserve(WindowHandle(1), WindowProc(10)), Reservation::Added);
        assert_eq!(table.reserve(WindowHandle(1), WindowProc(11)), Reservation::AlreadyTracked);
        assert_eq!(table.reserve(WindowHandle(2), WindowProc(20)), Reservation::Full);
        assert_eq!(table.original(WindowHandle(1)), Some(WindowProc(10)));
    }

    #[test]
    fn replace_returns_previous_original() {
        let mut table = SubclassTable::new(2);
        table.reserve(WindowHandle(1), WindowProc(10));
        assert_eq!(
            table.replace_original(WindowHandle(1), WindowProc(12)),
            Some(WindowProc(10))
        );
        assert_eq!(table.replace_original(WindowHandle(3), WindowProc(1)), None);
        assert_eq!(table.remove(WindowHandle(1)), Some(WindowProc(12)));
        assert!(!table.contains(WindowHandle(1)));
    }
}
