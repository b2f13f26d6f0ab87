use tracing::{debug, warn};

use super::Suppressor;
use crate::hooks::EntryPoint;
use crate::subclass::Reservation;
use crate::win32::*;

impl Suppressor {
    /// Replace the window procedure of a target so its messages pass through
    /// [`Suppressor::window_proc`] first. Returns whether a new subclass was
    /// installed.
    pub fn subclass(&self, hwnd: WindowHandle) -> bool {
        if !self.api.is_window(hwnd) {
            return false;
        }
        let filter = self.api.filter_proc();
        let current = WindowProc(self.api.window_long(hwnd, GWLP_WNDPROC) as usize);
        if current == filter {
            return false;
        }

        match self.lock().subclasses.reserve(hwnd, current) {
            Reservation::Added => {}
            Reservation::AlreadyTracked => return false,
            Reservation::Full => {
                warn!(%hwnd, "another Magnifier window is already subclassed; skipping");
                return false;
            }
        }

        let previous = self.original(EntryPoint::SetWindowLongPtr, 0, |api| {
            api.set_window_long(hwnd, GWLP_WNDPROC, filter.0 as isize)
        });
        if previous == 0 {
            self.lock().subclasses.remove(hwnd);
            warn!(%hwnd, "failed to subclass Magnifier window");
            return false;
        }
        if previous as usize != current.0 {
            self.lock()
                .subclasses
                .replace_original(hwnd, WindowProc(previous as usize));
        }
        debug!(%hwnd, original = previous, "subclassed Magnifier window");
        true
    }

    /// Put back the original procedure if the filter is still installed.
    fn restore_proc(&self, hwnd: WindowHandle, original: WindowProc) {
        if !self.api.is_window(hwnd) {
            return;
        }
        let current = WindowProc(self.api.window_long(hwnd, GWLP_WNDPROC) as usize);
        if current != self.api.filter_proc() {
            debug!(%hwnd, "window procedure replaced by someone else; leaving it");
            return;
        }
        self.original(EntryPoint::SetWindowLongPtr, 0, |api| {
            api.set_window_long(hwnd, GWLP_WNDPROC, original.0 as isize)
        });
        debug!(%hwnd, "restored window procedure");
    }

    pub(super) fn restore_all_subclasses(&self) {
        let subclassed = self.lock().subclasses.drain();
        for (hwnd, original) in subclassed {
            self.restore_proc(hwnd, original);
        }
    }

    /// Called by the window watcher when a window is created or shown.
    pub fn observe_window(&self, hwnd: WindowHandle) {
        if !self.is_ready() || !self.is_target(hwnd) {
            return;
        }
        self.subclass(hwnd);
        if self.api.is_window_visible(hwnd) {
            self.stats.record_message();
            debug!(%hwnd, "observed visible Magnifier window; hiding");
            self.original(EntryPoint::ShowWindow, false, |api| api.show_window(hwnd, SW_HIDE));
        }
    }

    /// Message filter of subclassed windows.
    ///
    /// # Safety
    ///
    /// For `WM_WINDOWPOSCHANGING`, `lparam` must be null or point to a valid,
    /// writable [`WindowPos`], as the system guarantees for that message.
    pub unsafe fn window_proc(&self, hwnd: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize {
        let original = self.lock().subclasses.original(hwnd);

        if msg == WM_NCDESTROY {
            let removed = self.lock().subclasses.remove(hwnd);
            if let Some(original) = removed {
                self.restore_proc(hwnd, original);
            }
            return self.forward_message(original, hwnd, msg, wparam, lparam);
        }

        if self.is_ready() {
            if let Some(result) = self.filter_message(hwnd, msg, wparam, lparam) {
                self.stats.record_message();
                return result;
            }
        }
        self.forward_message(original, hwnd, msg, wparam, lparam)
    }

    /// `Some(result)` swallows the message; `None` forwards it.
    unsafe fn filter_message(&self, hwnd: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> Option<isize> {
        match msg {
            WM_SHOWWINDOW if wparam != 0 => {
                debug!(%hwnd, "swallowed WM_SHOWWINDOW");
                Some(0)
            }
            WM_WINDOWPOSCHANGING => {
                if let Some(pos) = (lparam as *mut WindowPos).as_mut() {
                    if pos.flags & SWP_SHOWWINDOW != 0 {
                        pos.flags = (pos.flags & !SWP_SHOWWINDOW) | SWP_HIDEWINDOW | SWP_NOACTIVATE;
                        debug!(%hwnd, flags = pos.flags, "rewrote WM_WINDOWPOSCHANGING");
                    }
                }
                None
            }
            WM_WINDOWPOSCHANGED => {
                if self.api.is_window_visible(hwnd) {
                    debug!(%hwnd, "window became visible; forcing hide");
                    self.original(EntryPoint::ShowWindow, false, |api| api.show_window(hwnd, SW_HIDE));
                }
                None
            }
            WM_ACTIVATE if loword(wparam) != WA_INACTIVE => {
                debug!(%hwnd, "swallowed WM_ACTIVATE");
                Some(0)
            }
            WM_NCACTIVATE if wparam != 0 => {
                debug!(%hwnd, "swallowed WM_NCACTIVATE");
                Some(0)
            }
            WM_PAINT => {
                self.api.validate(hwnd);
                Some(0)
            }
            WM_ERASEBKGND => Some(1),
            WM_SETFOCUS => {
                self.api.set_focus(WindowHandle::NULL);
                debug!(%hwnd, "dropped focus");
                Some(0)
            }
            WM_MOUSEACTIVATE => Some(MA_NOACTIVATE),
            WM_SYSCOMMAND if matches!(sys_command(wparam), SC_RESTORE | SC_MAXIMIZE) => {
                debug!(%hwnd, command = sys_command(wparam), "swallowed WM_SYSCOMMAND");
                Some(0)
            }
            _ => None,
        }
    }

    fn forward_message(&self, original: Option<WindowProc>, hwnd: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize {
        match original.filter(|proc_| proc_.0 != 0) {
            Some(proc_) => self.api.call_window_proc(proc_, hwnd, msg, wparam, lparam),
            None => self.api.def_window_proc(hwnd, msg, wparam, lparam),
        }
    }
}
