//! The operating system as the engine sees it.
//!
//! Every entry point method on [`WindowApi`] calls the *original*
//! implementation, never the intercepted one, so the engine can forward a call
//! or enforce its own hide without re-entering itself.

use crate::win32::{WindowHandle, WindowProc};

/// Class argument of a window creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRef {
    /// Registered class atom passed as `MAKEINTATOM`.
    Atom(u16),
    Name(String),
}

impl ClassRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            ClassRef::Atom(_) => None,
            ClassRef::Name(name) => Some(name),
        }
    }
}

impl From<&str> for ClassRef {
    fn from(name: &str) -> Self {
        ClassRef::Name(name.to_string())
    }
}

/// Arguments of `CreateWindowExW`. Fields the engine never inspects are carried
/// as raw pointer-sized values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWindowArgs {
    pub ex_style: u32,
    pub class: ClassRef,
    pub title: Option<String>,
    pub style: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub parent: WindowHandle,
    pub menu: isize,
    pub instance: isize,
    pub param: isize,
}

impl CreateWindowArgs {
    pub fn new(class: impl Into<ClassRef>) -> Self {
        Self {
            ex_style: 0,
            class: class.into(),
            title: None,
            style: 0,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            parent: WindowHandle::NULL,
            menu: 0,
            instance: 0,
            param: 0,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn style(mut self, style: u32) -> Self {
        self.style = style;
        self
    }

    pub fn ex_style(mut self, ex_style: u32) -> Self {
        self.ex_style = ex_style;
        self
    }
}

/// Arguments of `SetWindowPos` after the window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PosRequest {
    pub insert_after: WindowHandle,
    pub x: i32,
    pub y: i32,
    pub cx: i32,
    pub cy: i32,
    pub flags: u32,
}

impl PosRequest {
    pub fn flags(flags: u32) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }
}

/// Arguments of `UpdateLayeredWindow` after the window handle, passed through
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayeredUpdate {
    pub hdc_dst: isize,
    pub pt_dst: usize,
    pub size: usize,
    pub hdc_src: isize,
    pub pt_src: usize,
    pub key: u32,
    pub blend: usize,
    pub flags: u32,
}

pub trait WindowApi: Send + Sync {
    fn create_window(&self, args: &CreateWindowArgs) -> WindowHandle;
    fn show_window(&self, hwnd: WindowHandle, cmd: i32) -> bool;
    fn set_window_pos(&self, hwnd: WindowHandle, pos: &PosRequest) -> bool;
    /// Returns the previous value, `0` on failure.
    fn set_window_long(&self, hwnd: WindowHandle, index: i32, value: isize) -> isize;
    fn update_layered_window(&self, hwnd: WindowHandle, update: &LayeredUpdate) -> bool;
    fn set_layered_window_attributes(&self, hwnd: WindowHandle, key: u32, alpha: u8, flags: u32) -> bool;
    fn animate_window(&self, hwnd: WindowHandle, time: u32, flags: u32) -> bool;
    fn bring_window_to_top(&self, hwnd: WindowHandle) -> bool;
    fn set_foreground_window(&self, hwnd: WindowHandle) -> bool;
    fn set_window_rgn(&self, hwnd: WindowHandle, region: isize, redraw: bool) -> i32;
    /// Returns an `HRESULT`.
    fn dwm_set_window_attribute(&self, hwnd: WindowHandle, attribute: u32, value: usize, size: u32) -> i32;

    /// Posts the show command to the owning thread instead of waiting for it.
    fn show_window_async(&self, hwnd: WindowHandle, cmd: i32) -> bool;
    fn is_window(&self, hwnd: WindowHandle) -> bool;
    fn is_window_visible(&self, hwnd: WindowHandle) -> bool;
    fn class_name(&self, hwnd: WindowHandle) -> Option<String>;
    /// Title text read without sending messages to the owning thread.
    fn window_text(&self, hwnd: WindowHandle) -> Option<String>;
    fn window_long(&self, hwnd: WindowHandle, index: i32) -> isize;
    /// Returns the previous parent.
    fn set_parent(&self, child: WindowHandle, parent: WindowHandle) -> WindowHandle;
    fn set_focus(&self, hwnd: WindowHandle) -> WindowHandle;
    /// Marks the whole client area as painted.
    fn validate(&self, hwnd: WindowHandle) -> bool;
    fn call_window_proc(&self, proc_: WindowProc, hwnd: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize;
    fn def_window_proc(&self, hwnd: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize;
    /// Address of the procedure that routes messages into the engine.
    fn filter_proc(&self) -> WindowProc;
    /// Creates the hidden window used as parent of last resort.
    fn create_host_window(&self) -> Option<WindowHandle>;
    fn destroy_window(&self, hwnd: WindowHandle) -> bool;
    /// Top-level windows owned by the current process.
    fn process_windows(&self) -> Vec<WindowHandle>;
}
