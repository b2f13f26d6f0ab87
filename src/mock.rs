//! In-memory stand-ins for the desktop and the host runtime, used by the tests
//! and benches to drive the engine without Windows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{ClassRef, CreateWindowArgs, LayeredUpdate, PosRequest, WindowApi};
use crate::hooks::{EntryPoint, HookError, HookHost, ObserverToken};
use crate::win32::*;

/// Procedure address the fake reports for the engine's filter.
pub const FILTER_PROC: WindowProc = WindowProc(0xF117);
/// Procedure every fake window starts with.
pub const NATIVE_PROC: WindowProc = WindowProc(0xA11CE);
/// Result returned by [`WindowApi::call_window_proc`] on the fake.
pub const FORWARDED: isize = 0x0F0;
/// Result returned by [`WindowApi::def_window_proc`] on the fake.
pub const DEFAULTED: isize = 0x0DEF;

pub const HOST_CLASS: &str = "MagnifierHeadlessHost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeWindow {
    pub class: String,
    pub title: Option<String>,
    pub style: u32,
    pub ex_style: u32,
    pub parent: WindowHandle,
    pub proc_: WindowProc,
    pub alive: bool,
}

impl FakeWindow {
    pub fn visible(&self) -> bool {
        self.style & WS_VISIBLE != 0
    }
}

/// Calls made through [`WindowApi`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { hwnd: WindowHandle, style: u32, ex_style: u32 },
    Show { hwnd: WindowHandle, cmd: i32 },
    ShowAsync { hwnd: WindowHandle, cmd: i32 },
    SetPos { hwnd: WindowHandle, flags: u32 },
    SetLong { hwnd: WindowHandle, index: i32, value: isize },
    UpdateLayered { hwnd: WindowHandle },
    LayeredAttributes { hwnd: WindowHandle, alpha: u8 },
    Animate { hwnd: WindowHandle, flags: u32 },
    BringToTop { hwnd: WindowHandle },
    Foreground { hwnd: WindowHandle },
    Region { hwnd: WindowHandle, redraw: bool },
    Dwm { hwnd: WindowHandle, attribute: u32 },
    SetParent { child: WindowHandle, parent: WindowHandle },
    SetFocus { hwnd: WindowHandle },
    Validate { hwnd: WindowHandle },
    CallProc { proc_: WindowProc, msg: u32 },
    DefProc { msg: u32 },
    Destroy { hwnd: WindowHandle },
}

#[derive(Default)]
struct Desktop {
    windows: HashMap<WindowHandle, FakeWindow>,
    next: isize,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeDesktop {
    desktop: Mutex<Desktop>,
    fail_host_window: AtomicBool,
    fail_class_queries: AtomicBool,
}

impl FakeDesktop {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn desktop(&self) -> MutexGuard<'_, Desktop> {
        self.desktop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a window directly, as if created before any interception existed.
    pub fn spawn(&self, class: &str, title: Option<&str>, style: u32, ex_style: u32) -> WindowHandle {
        let mut desktop = self.desktop();
        desktop.next += 0x10;
        let hwnd = WindowHandle(0x1_0000 + desktop.next);
        desktop.windows.insert(
            hwnd,
            FakeWindow {
                class: class.to_string(),
                title: title.map(str::to_string),
                style,
                ex_style,
                parent: WindowHandle::NULL,
                proc_: NATIVE_PROC,
                alive: true,
            },
        );
        hwnd
    }

    /// Destroy a window behind the engine's back.
    pub fn kill(&self, hwnd: WindowHandle) {
        if let Some(window) = self.desktop().windows.get_mut(&hwnd) {
            window.alive = false;
        }
    }

    pub fn set_title(&self, hwnd: WindowHandle, title: Option<&str>) {
        if let Some(window) = self.desktop().windows.get_mut(&hwnd) {
            window.title = title.map(str::to_string);
        }
    }

    pub fn window(&self, hwnd: WindowHandle) -> Option<FakeWindow> {
        self.desktop().windows.get(&hwnd).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.desktop().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.desktop().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.desktop().calls.iter().filter(|call| pred(call)).count()
    }

    pub fn fail_host_window(&self, fail: bool) {
        self.fail_host_window.store(fail, Ordering::SeqCst);
    }

    pub fn fail_class_queries(&self, fail: bool) {
        self.fail_class_queries.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.desktop().calls.push(call);
    }

    fn with_window<T>(&self, hwnd: WindowHandle, f: impl FnOnce(&mut FakeWindow) -> T) -> Option<T> {
        self.desktop()
            .windows
            .get_mut(&hwnd)
            .filter(|window| window.alive)
            .map(f)
    }

    fn set_visible(&self, hwnd: WindowHandle, visible: bool) -> Option<bool> {
        self.with_window(hwnd, |window| {
            let was = window.visible();
            if visible {
                window.style |= WS_VISIBLE;
            } else {
                window.style &= !WS_VISIBLE;
            }
            was
        })
    }
}

impl WindowApi for FakeDesktop {
    fn create_window(&self, args: &CreateWindowArgs) -> WindowHandle {
        let class = match &args.class {
            ClassRef::Atom(atom) => format!("#{atom}"),
            ClassRef::Name(name) => name.clone(),
        };
        let hwnd = self.spawn(&class, args.title.as_deref(), args.style, args.ex_style);
        self.with_window(hwnd, |window| window.parent = args.parent);
        self.record(Call::Create {
            hwnd,
            style: args.style,
            ex_style: args.ex_style,
        });
        hwnd
    }

    fn show_window(&self, hwnd: WindowHandle, cmd: i32) -> bool {
        self.record(Call::Show { hwnd, cmd });
        self.set_visible(hwnd, cmd != SW_HIDE).unwrap_or(false)
    }

    fn set_window_pos(&self, hwnd: WindowHandle, pos: &PosRequest) -> bool {
        self.record(Call::SetPos { hwnd, flags: pos.flags });
        let result = if pos.flags & SWP_HIDEWINDOW != 0 {
            self.set_visible(hwnd, false)
        } else if pos.flags & SWP_SHOWWINDOW != 0 {
            self.set_visible(hwnd, true)
        } else {
            self.with_window(hwnd, |_| true)
        };
        result.is_some()
    }

    fn set_window_long(&self, hwnd: WindowHandle, index: i32, value: isize) -> isize {
        self.record(Call::SetLong { hwnd, index, value });
        self.with_window(hwnd, |window| match index {
            GWL_STYLE => std::mem::replace(&mut window.style, value as u32) as isize,
            GWL_EXSTYLE => std::mem::replace(&mut window.ex_style, value as u32) as isize,
            GWLP_WNDPROC => std::mem::replace(&mut window.proc_, WindowProc(value as usize)).0 as isize,
            _ => 0,
        })
        .unwrap_or(0)
    }

    fn update_layered_window(&self, hwnd: WindowHandle, _update: &LayeredUpdate) -> bool {
        self.record(Call::UpdateLayered { hwnd });
        self.is_window(hwnd)
    }

    fn set_layered_window_attributes(&self, hwnd: WindowHandle, _key: u32, alpha: u8, _flags: u32) -> bool {
        self.record(Call::LayeredAttributes { hwnd, alpha });
        self.is_window(hwnd)
    }

    fn animate_window(&self, hwnd: WindowHandle, _time: u32, flags: u32) -> bool {
        self.record(Call::Animate { hwnd, flags });
        self.set_visible(hwnd, flags & AW_HIDE == 0).is_some()
    }

    fn bring_window_to_top(&self, hwnd: WindowHandle) -> bool {
        self.record(Call::BringToTop { hwnd });
        self.is_window(hwnd)
    }

    fn set_foreground_window(&self, hwnd: WindowHandle) -> bool {
        self.record(Call::Foreground { hwnd });
        self.is_window(hwnd)
    }

    fn set_window_rgn(&self, hwnd: WindowHandle, _region: isize, redraw: bool) -> i32 {
        self.record(Call::Region { hwnd, redraw });
        i32::from(self.is_window(hwnd))
    }

    fn dwm_set_window_attribute(&self, hwnd: WindowHandle, attribute: u32, _value: usize, _size: u32) -> i32 {
        self.record(Call::Dwm { hwnd, attribute });
        if self.is_window(hwnd) {
            S_OK
        } else {
            E_FAIL
        }
    }

    fn is_window(&self, hwnd: WindowHandle) -> bool {
        self.with_window(hwnd, |_| ()).is_some()
    }

    fn show_window_async(&self, hwnd: WindowHandle, cmd: i32) -> bool {
        self.record(Call::ShowAsync { hwnd, cmd });
        self.set_visible(hwnd, cmd != SW_HIDE).is_some()
    }

    fn is_window_visible(&self, hwnd: WindowHandle) -> bool {
        self.with_window(hwnd, |window| window.visible()).unwrap_or(false)
    }

    fn class_name(&self, hwnd: WindowHandle) -> Option<String> {
        if self.fail_class_queries.load(Ordering::SeqCst) {
            return None;
        }
        self.with_window(hwnd, |window| window.class.clone())
    }

    fn window_text(&self, hwnd: WindowHandle) -> Option<String> {
        self.with_window(hwnd, |window| window.title.clone()).flatten()
    }

    fn window_long(&self, hwnd: WindowHandle, index: i32) -> isize {
        self.with_window(hwnd, |window| match index {
            GWL_STYLE => window.style as isize,
            GWL_EXSTYLE => window.ex_style as isize,
            GWLP_WNDPROC => window.proc_.0 as isize,
            _ => 0,
        })
        .unwrap_or(0)
    }

    fn set_parent(&self, child: WindowHandle, parent: WindowHandle) -> WindowHandle {
        self.record(Call::SetParent { child, parent });
        self.with_window(child, |window| std::mem::replace(&mut window.parent, parent))
            .unwrap_or(WindowHandle::NULL)
    }

    fn set_focus(&self, hwnd: WindowHandle) -> WindowHandle {
        self.record(Call::SetFocus { hwnd });
        WindowHandle::NULL
    }

    fn validate(&self, hwnd: WindowHandle) -> bool {
        self.record(Call::Validate { hwnd });
        true
    }

    fn call_window_proc(&self, proc_: WindowProc, _hwnd: WindowHandle, msg: u32, _wparam: usize, _lparam: isize) -> isize {
        self.record(Call::CallProc { proc_, msg });
        FORWARDED
    }

    fn def_window_proc(&self, _hwnd: WindowHandle, msg: u32, _wparam: usize, _lparam: isize) -> isize {
        self.record(Call::DefProc { msg });
        DEFAULTED
    }

    fn filter_proc(&self) -> WindowProc {
        FILTER_PROC
    }

    fn create_host_window(&self) -> Option<WindowHandle> {
        if self.fail_host_window.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.spawn(HOST_CLASS, Some("Magnifier Headless Host"), 0, 0))
    }

    fn destroy_window(&self, hwnd: WindowHandle) -> bool {
        self.record(Call::Destroy { hwnd });
        self.with_window(hwnd, |window| window.alive = false).is_some()
    }

    fn process_windows(&self) -> Vec<WindowHandle> {
        let mut windows: Vec<_> = self
            .desktop()
            .windows
            .iter()
            .filter(|(_, window)| window.alive)
            .map(|(hwnd, _)| *hwnd)
            .collect();
        windows.sort_by_key(|hwnd| hwnd.0);
        windows
    }
}

#[derive(Default)]
struct MockHookState {
    bound: Mutex<HashSet<EntryPoint>>,
    failing: Mutex<HashSet<EntryPoint>>,
    watcher: Mutex<Option<ObserverToken>>,
    watcher_fails: AtomicBool,
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    next_token: AtomicUsize,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Host runtime double. Installed entry points stay bound after uninstall,
/// the way a detour keeps its trampoline alive.
#[derive(Clone)]
pub struct MockHookHost {
    state: Arc<MockHookState>,
}

impl MockHookHost {
    pub fn new() -> (Arc<Self>, MockHookHandle) {
        let state = Arc::new(MockHookState::default());
        (
            Arc::new(Self {
                state: Arc::clone(&state),
            }),
            MockHookHandle { state },
        )
    }
}

impl HookHost for MockHookHost {
    fn install(&self, entry: EntryPoint) -> Result<(), HookError> {
        if guard(&self.state.failing).contains(&entry) {
            return Err(HookError::Install {
                entry,
                reason: "refused by test".into(),
            });
        }
        self.state.install_count.fetch_add(1, Ordering::SeqCst);
        guard(&self.state.bound).insert(entry);
        Ok(())
    }

    fn uninstall(&self, _entry: EntryPoint) {
        self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
    }

    fn is_bound(&self, entry: EntryPoint) -> bool {
        guard(&self.state.bound).contains(&entry)
    }

    fn watch_window_procs(&self) -> Result<ObserverToken, HookError> {
        if self.state.watcher_fails.load(Ordering::SeqCst) {
            return Err(HookError::Watcher("refused by test".into()));
        }
        let token = ObserverToken(self.state.next_token.fetch_add(1, Ordering::SeqCst) as u64 + 1);
        *guard(&self.state.watcher) = Some(token);
        Ok(token)
    }

    fn unwatch_window_procs(&self, token: ObserverToken) {
        let mut watcher = guard(&self.state.watcher);
        if *watcher == Some(token) {
            *watcher = None;
        }
    }
}

pub struct MockHookHandle {
    state: Arc<MockHookState>,
}

impl MockHookHandle {
    /// Make installation of `entry` fail.
    pub fn fail(&self, entry: EntryPoint) {
        guard(&self.state.failing).insert(entry);
    }

    pub fn fail_watcher(&self) {
        self.state.watcher_fails.store(true, Ordering::SeqCst);
    }

    /// Mark `entry` as bound without going through activation.
    pub fn bind(&self, entry: EntryPoint) {
        guard(&self.state.bound).insert(entry);
    }

    pub fn bind_all(&self) {
        EntryPoint::ALL.iter().for_each(|entry| self.bind(*entry));
    }

    pub fn is_bound(&self, entry: EntryPoint) -> bool {
        guard(&self.state.bound).contains(&entry)
    }

    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    pub fn watching(&self) -> bool {
        guard(&self.state.watcher).is_some()
    }
}
