//! Portable window handles and the Win32 numbers the suppression policy works
//! with.
//!
//! The engine never touches the `windows` crate directly so it can run against
//! an in-memory desktop on any host. Values mirror `winuser.h` / `dwmapi.h`.

use std::fmt;

/// Opaque identifier of a window. The engine never owns the window behind it;
/// liveness has to be re-checked before use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Address of a window procedure as stored under `GWLP_WNDPROC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowProc(pub usize);

/// Mirror of `WINDOWPOS`, handed to `WM_WINDOWPOSCHANGING` through `lParam`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowPos {
    pub hwnd: isize,
    pub hwnd_insert_after: isize,
    pub x: i32,
    pub y: i32,
    pub cx: i32,
    pub cy: i32,
    pub flags: u32,
}

// Window styles.
pub const WS_VISIBLE: u32 = 0x1000_0000;
pub const WS_EX_TOOLWINDOW: u32 = 0x0000_0080;
pub const WS_EX_APPWINDOW: u32 = 0x0004_0000;

// GetWindowLongPtr / SetWindowLongPtr indices.
pub const GWLP_WNDPROC: i32 = -4;
pub const GWL_STYLE: i32 = -16;
pub const GWL_EXSTYLE: i32 = -20;

pub const SW_HIDE: i32 = 0;
pub const SW_SHOW: i32 = 5;
pub const SW_SHOWNOACTIVATE: i32 = 4;

// SetWindowPos flags.
pub const SWP_NOACTIVATE: u32 = 0x0010;
pub const SWP_SHOWWINDOW: u32 = 0x0040;
pub const SWP_HIDEWINDOW: u32 = 0x0080;

pub const AW_HIDE: u32 = 0x0001_0000;

// DwmSetWindowAttribute attributes.
pub const DWMWA_NCRENDERING_POLICY: u32 = 2;
pub const DWMWA_CLOAK: u32 = 13;

pub const S_OK: i32 = 0;
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

// Messages.
pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_SETFOCUS: u32 = 0x0007;
pub const WM_PAINT: u32 = 0x000F;
pub const WM_ERASEBKGND: u32 = 0x0014;
pub const WM_SHOWWINDOW: u32 = 0x0018;
pub const WM_MOUSEACTIVATE: u32 = 0x0021;
pub const WM_WINDOWPOSCHANGING: u32 = 0x0046;
pub const WM_WINDOWPOSCHANGED: u32 = 0x0047;
pub const WM_NCDESTROY: u32 = 0x0082;
pub const WM_NCACTIVATE: u32 = 0x0086;
pub const WM_SYSCOMMAND: u32 = 0x0112;

pub const WA_INACTIVE: usize = 0;
pub const MA_NOACTIVATE: isize = 3;
pub const SC_MAXIMIZE: usize = 0xF030;
pub const SC_RESTORE: usize = 0xF120;

/// Low word of a `WPARAM`.
pub fn loword(value: usize) -> usize {
    value & 0xFFFF
}

/// `WM_SYSCOMMAND` reserves the low four bits for the system.
pub fn sys_command(wparam: usize) -> usize {
    wparam & 0xFFF0
}
