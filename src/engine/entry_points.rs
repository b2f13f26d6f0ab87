use tracing::debug;

use super::Suppressor;
use crate::api::{CreateWindowArgs, LayeredUpdate, PosRequest};
use crate::hooks::EntryPoint;
use crate::win32::*;

fn hidden_style(style: u32) -> u32 {
    style & !WS_VISIBLE
}

fn tool_ex_style(ex_style: u32) -> u32 {
    (ex_style & !WS_EX_APPWINDOW) | WS_EX_TOOLWINDOW
}

impl Suppressor {
    /// Target windows are created hidden, as tool windows, parented to the
    /// host window, with their styles enforced again after creation.
    pub fn create_window(&self, mut args: CreateWindowArgs) -> WindowHandle {
        let entry = EntryPoint::CreateWindowEx;
        if !self.is_ready() {
            return self.original(entry, WindowHandle::NULL, |api| api.create_window(&args));
        }

        let is_target = self
            .classifier
            .matches_request(&args.class, args.title.as_deref());
        if is_target {
            args.style = hidden_style(args.style);
            args.ex_style = tool_ex_style(args.ex_style);
            self.stats.record(entry);
            debug!(class = ?args.class, title = ?args.title, "intercepting Magnifier window creation");
        }

        let hwnd = self.original(entry, WindowHandle::NULL, |api| api.create_window(&args));
        if is_target && !hwnd.is_null() {
            self.confine(hwnd);
        }
        hwnd
    }

    fn confine(&self, hwnd: WindowHandle) {
        debug!(%hwnd, "Magnifier window created; applying restrictions");
        self.lock().cache.record(hwnd, true);

        let host = self.lock().host_window;
        if let Some(host) = host.filter(|host| self.api.is_window(*host)) {
            self.api.set_parent(hwnd, host);
        }

        self.original(EntryPoint::ShowWindow, false, |api| api.show_window(hwnd, SW_HIDE));

        let style = self.api.window_long(hwnd, GWL_STYLE) as u32;
        self.original(EntryPoint::SetWindowLongPtr, 0, |api| {
            api.set_window_long(hwnd, GWL_STYLE, hidden_style(style) as isize)
        });
        let ex_style = self.api.window_long(hwnd, GWL_EXSTYLE) as u32;
        self.original(EntryPoint::SetWindowLongPtr, 0, |api| {
            api.set_window_long(hwnd, GWL_EXSTYLE, tool_ex_style(ex_style) as isize)
        });

        self.subclass(hwnd);
    }

    /// Show requests on a target report success without doing anything; hide
    /// requests go through.
    pub fn show_window(&self, hwnd: WindowHandle, cmd: i32) -> bool {
        if self.is_ready() && cmd != SW_HIDE && self.is_target(hwnd) {
            self.stats.record(EntryPoint::ShowWindow);
            debug!(%hwnd, cmd, "blocked ShowWindow");
            return true;
        }
        self.original(EntryPoint::ShowWindow, false, |api| api.show_window(hwnd, cmd))
    }

    pub fn set_window_pos(&self, hwnd: WindowHandle, mut pos: PosRequest) -> bool {
        if self.is_ready() && self.is_target(hwnd) {
            let requested = pos.flags;
            pos.flags = (pos.flags & !SWP_SHOWWINDOW) | SWP_HIDEWINDOW;
            if requested != pos.flags {
                self.stats.record(EntryPoint::SetWindowPos);
                debug!(%hwnd, requested, flags = pos.flags, "modified SetWindowPos flags");
            }
        }
        self.original(EntryPoint::SetWindowPos, false, |api| api.set_window_pos(hwnd, &pos))
    }

    pub fn set_window_long(&self, hwnd: WindowHandle, index: i32, mut value: isize) -> isize {
        let entry = EntryPoint::SetWindowLongPtr;
        if self.is_ready() && self.is_target(hwnd) {
            let requested = value;
            match index {
                GWL_STYLE => value = hidden_style(value as u32) as isize,
                GWL_EXSTYLE => value = tool_ex_style(value as u32) as isize,
                GWLP_WNDPROC if value != 0 => {
                    // Keep the filter in front; the new procedure becomes the
                    // forwarding target instead.
                    let replaced = self
                        .lock()
                        .subclasses
                        .replace_original(hwnd, WindowProc(value as usize));
                    if let Some(previous) = replaced {
                        self.stats.record(entry);
                        debug!(%hwnd, new_proc = value, "rechained window procedure behind filter");
                        return previous.0 as isize;
                    }
                }
                _ => {}
            }
            if requested != value {
                self.stats.record(entry);
                debug!(%hwnd, index, requested, value, "adjusted window style");
            }
        }
        self.original(entry, 0, |api| api.set_window_long(hwnd, index, value))
    }

    pub fn update_layered_window(&self, hwnd: WindowHandle, update: LayeredUpdate) -> bool {
        if self.is_ready() && self.is_target(hwnd) {
            self.stats.record(EntryPoint::UpdateLayeredWindow);
            debug!(%hwnd, "blocked UpdateLayeredWindow");
            return true;
        }
        self.original(EntryPoint::UpdateLayeredWindow, false, |api| {
            api.update_layered_window(hwnd, &update)
        })
    }

    pub fn set_layered_window_attributes(&self, hwnd: WindowHandle, key: u32, alpha: u8, flags: u32) -> bool {
        if self.is_ready() && self.is_target(hwnd) {
            self.stats.record(EntryPoint::SetLayeredWindowAttributes);
            debug!(%hwnd, alpha, flags, "blocked SetLayeredWindowAttributes");
            return true;
        }
        self.original(EntryPoint::SetLayeredWindowAttributes, false, |api| {
            api.set_layered_window_attributes(hwnd, key, alpha, flags)
        })
    }

    pub fn animate_window(&self, hwnd: WindowHandle, time: u32, flags: u32) -> bool {
        if self.is_ready() && flags & AW_HIDE == 0 && self.is_target(hwnd) {
            self.stats.record(EntryPoint::AnimateWindow);
            debug!(%hwnd, flags, "blocked AnimateWindow");
            return true;
        }
        self.original(EntryPoint::AnimateWindow, false, |api| api.animate_window(hwnd, time, flags))
    }

    pub fn bring_window_to_top(&self, hwnd: WindowHandle) -> bool {
        if self.is_ready() && self.is_target(hwnd) {
            self.stats.record(EntryPoint::BringWindowToTop);
            debug!(%hwnd, "blocked BringWindowToTop");
            return true;
        }
        self.original(EntryPoint::BringWindowToTop, false, |api| api.bring_window_to_top(hwnd))
    }

    pub fn set_foreground_window(&self, hwnd: WindowHandle) -> bool {
        if self.is_ready() && self.is_target(hwnd) {
            self.stats.record(EntryPoint::SetForegroundWindow);
            debug!(%hwnd, "blocked SetForegroundWindow");
            return true;
        }
        self.original(EntryPoint::SetForegroundWindow, false, |api| api.set_foreground_window(hwnd))
    }

    /// The region still changes, it just never triggers a repaint.
    pub fn set_window_rgn(&self, hwnd: WindowHandle, region: isize, mut redraw: bool) -> i32 {
        if self.is_ready() && redraw && self.is_target(hwnd) {
            redraw = false;
            self.stats.record(EntryPoint::SetWindowRgn);
            debug!(%hwnd, region, "suppressed SetWindowRgn redraw");
        }
        self.original(EntryPoint::SetWindowRgn, 0, |api| api.set_window_rgn(hwnd, region, redraw))
    }

    pub fn dwm_set_window_attribute(&self, hwnd: WindowHandle, attribute: u32, value: usize, size: u32) -> i32 {
        let guarded = matches!(attribute, DWMWA_CLOAK | DWMWA_NCRENDERING_POLICY);
        if self.is_ready() && guarded && self.is_target(hwnd) {
            self.stats.record(EntryPoint::DwmSetWindowAttribute);
            debug!(%hwnd, attribute, "blocked DwmSetWindowAttribute");
            return S_OK;
        }
        self.original(EntryPoint::DwmSetWindowAttribute, E_FAIL, |api| {
            api.dwm_set_window_attribute(hwnd, attribute, value, size)
        })
    }
}
