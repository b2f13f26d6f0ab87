//! Win32 backing for the engine.
//!
//! Entry points are redirected with `retour` detours whose trampolines are
//! published in [`TRAMPOLINES`] before the detour is enabled, so a detour body
//! can always reach the original. Detours are disabled on teardown but never
//! dropped; a thread still running on a trampoline keeps valid code under it.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;
use retour::RawDetour;
use tracing::{error, info, warn};
use windows::core::{w, HSTRING, PCSTR, PCWSTR};
use windows::Win32::Foundation::{
    GetLastError, BOOL, ERROR_CLASS_ALREADY_EXISTS, HINSTANCE, HMODULE, HWND, LPARAM, LRESULT, WPARAM,
};
use windows::Win32::Graphics::Gdi::ValidateRect;
use windows::Win32::System::LibraryLoader::{GetModuleHandleExW, GetModuleHandleW, GetProcAddress, LoadLibraryW};
use windows::Win32::System::Threading::GetCurrentProcessId;
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
use windows::Win32::UI::Input::KeyboardAndMouse::SetFocus;
use windows::Win32::UI::WindowsAndMessaging::{
    CallWindowProcW, CreateWindowExW, DefWindowProcW, DestroyWindow, EnumWindows, GetClassNameW,
    GetWindowLongPtrW, GetWindowThreadProcessId, InternalGetWindowText, IsWindow, IsWindowVisible,
    RegisterClassW, SetParent, ShowWindowAsync, HMENU, SHOW_WINDOW_CMD, HWND_MESSAGE, WINDOW_EX_STYLE, WINDOW_LONG_PTR_INDEX, WINDOW_STYLE,
    WNDCLASSW,
};

use crate::api::{ClassRef, CreateWindowArgs, LayeredUpdate, PosRequest, WindowApi};
use crate::config::Config;
use crate::engine::Suppressor;
use crate::hooks::{EntryPoint, HookError, HookHost, ObserverToken};
use crate::logging;
use crate::win32::{WindowHandle, WindowProc};

type CreateWindowExWFn = unsafe extern "system" fn(
    u32,
    *const u16,
    *const u16,
    u32,
    i32,
    i32,
    i32,
    i32,
    isize,
    isize,
    isize,
    *const c_void,
) -> isize;
type ShowWindowFn = unsafe extern "system" fn(isize, i32) -> i32;
type SetWindowPosFn = unsafe extern "system" fn(isize, isize, i32, i32, i32, i32, u32) -> i32;
type SetWindowLongPtrWFn = unsafe extern "system" fn(isize, i32, isize) -> isize;
type UpdateLayeredWindowFn = unsafe extern "system" fn(
    isize,
    isize,
    *const c_void,
    *const c_void,
    isize,
    *const c_void,
    u32,
    *const c_void,
    u32,
) -> i32;
type SetLayeredWindowAttributesFn = unsafe extern "system" fn(isize, u32, u8, u32) -> i32;
type AnimateWindowFn = unsafe extern "system" fn(isize, u32, u32) -> i32;
type WindowOnlyFn = unsafe extern "system" fn(isize) -> i32;
type SetWindowRgnFn = unsafe extern "system" fn(isize, isize, i32) -> i32;
type DwmSetWindowAttributeFn = unsafe extern "system" fn(isize, u32, *const c_void, u32) -> i32;

const HOST_CLASS: PCWSTR = w!("MagnifierHeadlessHost");

const EVENT_OBJECT_CREATE: u32 = 0x8000;
const EVENT_OBJECT_SHOW: u32 = 0x8002;
const WINEVENT_INCONTEXT: u32 = 0x0004;
const OBJID_WINDOW: i32 = 0;
const CHILDID_SELF: i32 = 0;
const GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT: u32 = 0x0002;
const GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS: u32 = 0x0004;

static TRAMPOLINES: [AtomicUsize; EntryPoint::COUNT] = [const { AtomicUsize::new(0) }; EntryPoint::COUNT];
static DETOURS: Lazy<Mutex<HashMap<EntryPoint, RawDetour>>> = Lazy::new(Default::default);
static ENGINE: RwLock<Option<Arc<Suppressor>>> = RwLock::new(None);

fn engine() -> Option<Arc<Suppressor>> {
    ENGINE.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn trampoline<F: Copy>(entry: EntryPoint) -> Option<F> {
    let address = TRAMPOLINES[entry.index()].load(Ordering::Acquire);
    if address == 0 {
        return None;
    }
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
    // SAFETY: the slot for `entry` only ever holds a trampoline with the
    // signature `F` that the caller names for that entry point.
    Some(unsafe { std::mem::transmute_copy::<usize, F>(&address) })
}

fn original<F: Copy, T>(entry: EntryPoint, fallback: T, call: impl FnOnce(F) -> T) -> T {
    trampoline::<F>(entry).map_or(fallback, call)
}

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn handle(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

unsafe fn read_wide(ptr: *const u16) -> String {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
}

/// `MAKEINTATOM` values live in the low word with a zero high part.
unsafe fn class_ref(ptr: *const u16) -> ClassRef {
    if (ptr as usize) >> 16 == 0 {
        ClassRef::Atom(ptr as usize as u16)
    } else {
        ClassRef::Name(read_wide(ptr))
    }
}

unsafe extern "system" fn create_window_ex_detour(
    ex_style: u32,
    class: *const u16,
    title: *const u16,
    style: u32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    parent: isize,
    menu: isize,
    instance: isize,
    param: *const c_void,
) -> isize {
    let forward = || {
        original(EntryPoint::CreateWindowEx, 0, |f: CreateWindowExWFn| {
            f(ex_style, class, title, style, x, y, width, height, parent, menu, instance, param)
        })
    };
    let Some(engine) = engine().filter(|engine| engine.is_ready()) else {
        return forward();
    };
    let class = class_ref(class);
    let title = (!title.is_null()).then(|| read_wide(title));
    if !engine.matches_request(&class, title.as_deref()) {
        return forward();
    }
    let args = CreateWindowArgs {
        ex_style,
        class,
        title,
        style,
        x,
        y,
        width,
        height,
        parent: WindowHandle(parent),
        menu,
        instance,
        param: param as isize,
    };
    engine.create_window(args).0
}

unsafe extern "system" fn show_window_detour(hwnd: isize, cmd: i32) -> i32 {
    match engine() {
        Some(engine) => engine.show_window(WindowHandle(hwnd), cmd) as i32,
        None => original(EntryPoint::ShowWindow, 0, |f: ShowWindowFn| f(hwnd, cmd)),
    }
}

unsafe extern "system" fn set_window_pos_detour(
    hwnd: isize,
    insert_after: isize,
    x: i32,
    y: i32,
    cx: i32,
    cy: i32,
    flags: u32,
) -> i32 {
    match engine() {
        Some(engine) => {
            let pos = PosRequest {
                insert_after: WindowHandle(insert_after),
                x,
                y,
                cx,
                cy,
                flags,
            };
            engine.set_window_pos(WindowHandle(hwnd), pos) as i32
        }
        None => original(EntryPoint::SetWindowPos, 0, |f: SetWindowPosFn| {
            f(hwnd, insert_after, x, y, cx, cy, flags)
        }),
    }
}

unsafe extern "system" fn set_window_long_ptr_detour(hwnd: isize, index: i32, value: isize) -> isize {
    match engine() {
        Some(engine) => engine.set_window_long(WindowHandle(hwnd), index, value),
        None => original(EntryPoint::SetWindowLongPtr, 0, |f: SetWindowLongPtrWFn| f(hwnd, index, value)),
    }
}

unsafe extern "system" fn update_layered_window_detour(
    hwnd: isize,
    hdc_dst: isize,
    pt_dst: *const c_void,
    size: *const c_void,
    hdc_src: isize,
    pt_src: *const c_void,
    key: u32,
    blend: *const c_void,
    flags: u32,
) -> i32 {
    let update = LayeredUpdate {
        hdc_dst,
        pt_dst: pt_dst as usize,
        size: size as usize,
        hdc_src,
        pt_src: pt_src as usize,
        key,
        blend: blend as usize,
        flags,
    };
    match engine() {
        Some(engine) => engine.update_layered_window(WindowHandle(hwnd), update) as i32,
        None => forward_layered_update(hwnd, &update) as i32,
    }
}

fn forward_layered_update(hwnd: isize, update: &LayeredUpdate) -> bool {
    original(EntryPoint::UpdateLayeredWindow, false, |f: UpdateLayeredWindowFn| {
        let result = unsafe {
            f(
                hwnd,
                update.hdc_dst,
                update.pt_dst as *const c_void,
                update.size as *const c_void,
                update.hdc_src,
                update.pt_src as *const c_void,
                update.key,
                update.blend as *const c_void,
                update.flags,
            )
        };
        result != 0
    })
}

unsafe extern "system" fn set_layered_window_attributes_detour(hwnd: isize, key: u32, alpha: u8, flags: u32) -> i32 {
    match engine() {
        Some(engine) => engine.set_layered_window_attributes(WindowHandle(hwnd), key, alpha, flags) as i32,
        None => original(EntryPoint::SetLayeredWindowAttributes, 0, |f: SetLayeredWindowAttributesFn| {
            f(hwnd, key, alpha, flags)
        }),
    }
}

unsafe extern "system" fn animate_window_detour(hwnd: isize, time: u32, flags: u32) -> i32 {
    match engine() {
        Some(engine) => engine.animate_window(WindowHandle(hwnd), time, flags) as i32,
        None => original(EntryPoint::AnimateWindow, 0, |f: AnimateWindowFn| f(hwnd, time, flags)),
    }
}

unsafe extern "system" fn bring_window_to_top_detour(hwnd: isize) -> i32 {
    match engine() {
        Some(engine) => engine.bring_window_to_top(WindowHandle(hwnd)) as i32,
        None => original(EntryPoint::BringWindowToTop, 0, |f: WindowOnlyFn| f(hwnd)),
    }
}

unsafe extern "system" fn set_foreground_window_detour(hwnd: isize) -> i32 {
    match engine() {
        Some(engine) => engine.set_foreground_window(WindowHandle(hwnd)) as i32,
        None => original(EntryPoint::SetForegroundWindow, 0, |f: WindowOnlyFn| f(hwnd)),
    }
}

unsafe extern "system" fn set_window_rgn_detour(hwnd: isize, region: isize, redraw: i32) -> i32 {
    match engine() {
        Some(engine) => engine.set_window_rgn(WindowHandle(hwnd), region, redraw != 0),
        None => original(EntryPoint::SetWindowRgn, 0, |f: SetWindowRgnFn| f(hwnd, region, redraw)),
    }
}

unsafe extern "system" fn dwm_set_window_attribute_detour(
    hwnd: isize,
    attribute: u32,
    value: *const c_void,
    size: u32,
) -> i32 {
    match engine() {
        Some(engine) => engine.dwm_set_window_attribute(WindowHandle(hwnd), attribute, value as usize, size),
        None => original(EntryPoint::DwmSetWindowAttribute, crate::win32::E_FAIL, |f: DwmSetWindowAttributeFn| {
            f(hwnd, attribute, value, size)
        }),
    }
}

fn detour_for(entry: EntryPoint) -> *const () {
    match entry {
        EntryPoint::CreateWindowEx => create_window_ex_detour as CreateWindowExWFn as *const (),
        EntryPoint::ShowWindow => show_window_detour as ShowWindowFn as *const (),
        EntryPoint::SetWindowPos => set_window_pos_detour as SetWindowPosFn as *const (),
        EntryPoint::SetWindowLongPtr => set_window_long_ptr_detour as SetWindowLongPtrWFn as *const (),
        EntryPoint::UpdateLayeredWindow => update_layered_window_detour as UpdateLayeredWindowFn as *const (),
        EntryPoint::SetLayeredWindowAttributes => {
            set_layered_window_attributes_detour as SetLayeredWindowAttributesFn as *const ()
        }
        EntryPoint::AnimateWindow => animate_window_detour as AnimateWindowFn as *const (),
        EntryPoint::BringWindowToTop => bring_window_to_top_detour as WindowOnlyFn as *const (),
        EntryPoint::SetForegroundWindow => set_foreground_window_detour as WindowOnlyFn as *const (),
        EntryPoint::SetWindowRgn => set_window_rgn_detour as SetWindowRgnFn as *const (),
        EntryPoint::DwmSetWindowAttribute => {
            dwm_set_window_attribute_detour as DwmSetWindowAttributeFn as *const ()
        }
    }
}

fn resolve(entry: EntryPoint) -> Result<*const (), HookError> {
    let module_name = HSTRING::from(entry.module());
    let module = unsafe { GetModuleHandleW(PCWSTR(module_name.as_ptr())) }
        .or_else(|_| unsafe { LoadLibraryW(PCWSTR(module_name.as_ptr())) })
        .map_err(|_| HookError::Unresolved(entry))?;
    let symbol = format!("{}\0", entry.symbol());
    let address = unsafe { GetProcAddress(module, PCSTR(symbol.as_ptr())) }.ok_or(HookError::Unresolved(entry))?;
    Ok(address as *const ())
}

fn install_error(entry: EntryPoint, err: retour::Error) -> HookError {
    HookError::Install {
        entry,
        reason: err.to_string(),
    }
}

/// Subclass procedure installed on target windows.
unsafe extern "system" fn filter_window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match engine() {
        Some(engine) => LRESULT(engine.window_proc(handle(hwnd), msg, wparam.0, lparam.0)),
        None => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe extern "system" fn host_window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    _event: u32,
    hwnd: HWND,
    id_object: i32,
    id_child: i32,
    _thread: u32,
    _time: u32,
) {
    if id_object != OBJID_WINDOW || id_child != CHILDID_SELF || hwnd.0.is_null() {
        return;
    }
    if let Some(engine) = engine() {
        engine.observe_window(handle(hwnd));
    }
}

unsafe extern "system" fn collect_process_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    let mut pid = 0u32;
    GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32));
    if pid == GetCurrentProcessId() {
        found.push(handle(hwnd));
    }
    BOOL(1)
}

/// Module containing this code, needed for in-context event hooks.
fn own_module() -> Option<HMODULE> {
    let mut module = HMODULE::default();
    let address = win_event_proc as usize as *const u16;
    unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            PCWSTR(address),
            &mut module,
        )
    }
    .ok()
    .map(|()| module)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Platform;

impl WindowApi for Win32Platform {
    fn create_window(&self, args: &CreateWindowArgs) -> WindowHandle {
        let class_name;
        let class = match &args.class {
            ClassRef::Atom(atom) => *atom as usize as *const u16,
            ClassRef::Name(name) => {
                class_name = HSTRING::from(name.as_str());
                class_name.as_ptr()
            }
        };
        let title_text = args.title.as_deref().map(HSTRING::from);
        let title = title_text.as_ref().map_or(std::ptr::null(), |text| text.as_ptr());
        let created = original(EntryPoint::CreateWindowEx, 0, |f: CreateWindowExWFn| unsafe {
            f(
                args.ex_style,
                class,
                title,
                args.style,
                args.x,
                args.y,
                args.width,
                args.height,
                args.parent.0,
                args.menu,
                args.instance,
                args.param as *const c_void,
            )
        });
        WindowHandle(created)
    }

    fn show_window(&self, hwnd: WindowHandle, cmd: i32) -> bool {
        original(EntryPoint::ShowWindow, false, |f: ShowWindowFn| unsafe { f(hwnd.0, cmd) } != 0)
    }

    fn set_window_pos(&self, hwnd: WindowHandle, pos: &PosRequest) -> bool {
        original(EntryPoint::SetWindowPos, false, |f: SetWindowPosFn| {
            unsafe { f(hwnd.0, pos.insert_after.0, pos.x, pos.y, pos.cx, pos.cy, pos.flags) } != 0
        })
    }

    fn set_window_long(&self, hwnd: WindowHandle, index: i32, value: isize) -> isize {
        original(EntryPoint::SetWindowLongPtr, 0, |f: SetWindowLongPtrWFn| unsafe {
            f(hwnd.0, index, value)
        })
    }

    fn update_layered_window(&self, hwnd: WindowHandle, update: &LayeredUpdate) -> bool {
        forward_layered_update(hwnd.0, update)
    }

    fn set_layered_window_attributes(&self, hwnd: WindowHandle, key: u32, alpha: u8, flags: u32) -> bool {
        original(EntryPoint::SetLayeredWindowAttributes, false, |f: SetLayeredWindowAttributesFn| {
            unsafe { f(hwnd.0, key, alpha, flags) } != 0
        })
    }

    fn animate_window(&self, hwnd: WindowHandle, time: u32, flags: u32) -> bool {
        original(EntryPoint::AnimateWindow, false, |f: AnimateWindowFn| unsafe { f(hwnd.0, time, flags) } != 0)
    }

    fn bring_window_to_top(&self, hwnd: WindowHandle) -> bool {
        original(EntryPoint::BringWindowToTop, false, |f: WindowOnlyFn| unsafe { f(hwnd.0) } != 0)
    }

    fn set_foreground_window(&self, hwnd: WindowHandle) -> bool {
        original(EntryPoint::SetForegroundWindow, false, |f: WindowOnlyFn| unsafe { f(hwnd.0) } != 0)
    }

    fn set_window_rgn(&self, hwnd: WindowHandle, region: isize, redraw: bool) -> i32 {
        original(EntryPoint::SetWindowRgn, 0, |f: SetWindowRgnFn| unsafe {
            f(hwnd.0, region, i32::from(redraw))
        })
    }

    fn dwm_set_window_attribute(&self, hwnd: WindowHandle, attribute: u32, value: usize, size: u32) -> i32 {
        original(EntryPoint::DwmSetWindowAttribute, crate::win32::E_FAIL, |f: DwmSetWindowAttributeFn| unsafe {
            f(hwnd.0, attribute, value as *const c_void, size)
        })
    }

    fn show_window_async(&self, handle: WindowHandle, cmd: i32) -> bool {
        unsafe { ShowWindowAsync(hwnd(handle), SHOW_WINDOW_CMD(cmd)) }.as_bool()
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        !handle.is_null() && unsafe { IsWindow(hwnd(handle)) }.as_bool()
    }

    fn is_window_visible(&self, handle: WindowHandle) -> bool {
        unsafe { IsWindowVisible(hwnd(handle)) }.as_bool()
    }

    fn class_name(&self, handle: WindowHandle) -> Option<String> {
        let mut buf = [0u16; 256];
        let len = unsafe { GetClassNameW(hwnd(handle), &mut buf) };
        (len > 0).then(|| String::from_utf16_lossy(&buf[..(len as usize).min(buf.len())]))
    }

    fn window_text(&self, handle: WindowHandle) -> Option<String> {
        let mut buf = [0u16; 256];
        let len = unsafe { InternalGetWindowText(hwnd(handle), &mut buf) };
        (len > 0).then(|| String::from_utf16_lossy(&buf[..(len as usize).min(buf.len())]))
    }

    fn window_long(&self, handle: WindowHandle, index: i32) -> isize {
        unsafe { GetWindowLongPtrW(hwnd(handle), WINDOW_LONG_PTR_INDEX(index)) }
    }

    fn set_parent(&self, child: WindowHandle, parent: WindowHandle) -> WindowHandle {
        unsafe { SetParent(hwnd(child), hwnd(parent)) }
            .map(handle)
            .unwrap_or_default()
    }

    fn set_focus(&self, handle: WindowHandle) -> WindowHandle {
        unsafe { SetFocus(hwnd(handle)) }.map(self::handle).unwrap_or_default()
    }

    fn validate(&self, handle: WindowHandle) -> bool {
        unsafe { ValidateRect(hwnd(handle), None) }.as_bool()
    }

    fn call_window_proc(&self, proc_: WindowProc, handle: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize {
        if proc_.0 == 0 {
            return self.def_window_proc(handle, msg, wparam, lparam);
        }
        // SAFETY: `proc_` is a non-null value read from GWLP_WNDPROC of a live
        // window.
        let proc_: unsafe extern "system" fn(HWND, u32, WPARAM, LPARAM) -> LRESULT =
            unsafe { std::mem::transmute::<usize, _>(proc_.0) };
        unsafe { CallWindowProcW(Some(proc_), hwnd(handle), msg, WPARAM(wparam), LPARAM(lparam)) }.0
    }

    fn def_window_proc(&self, handle: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize {
        unsafe { DefWindowProcW(hwnd(handle), msg, WPARAM(wparam), LPARAM(lparam)) }.0
    }

    fn filter_proc(&self) -> WindowProc {
        WindowProc(filter_window_proc as usize)
    }

    fn create_host_window(&self) -> Option<WindowHandle> {
        let module = match unsafe { GetModuleHandleW(PCWSTR::null()) } {
            Ok(module) => module,
            Err(err) => {
                error!(%err, "failed to get module handle");
                return None;
            }
        };
        let instance = HINSTANCE(module.0);
        let class = WNDCLASSW {
            lpfnWndProc: Some(host_window_proc),
            hInstance: instance,
            lpszClassName: HOST_CLASS,
            ..Default::default()
        };
        if unsafe { RegisterClassW(&class) } == 0 {
            let err = unsafe { GetLastError() };
            if err != ERROR_CLASS_ALREADY_EXISTS {
                error!(code = err.0, "failed to register host window class");
                return None;
            }
        }
        let created = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                HOST_CLASS,
                w!("Magnifier Headless Host"),
                WINDOW_STYLE(0),
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                HMENU::default(),
                instance,
                None,
            )
        };
        match created {
            Ok(host) if !host.0.is_null() => Some(handle(host)),
            Ok(_) => None,
            Err(err) => {
                error!(%err, "failed to create host window");
                None
            }
        }
    }

    fn destroy_window(&self, handle: WindowHandle) -> bool {
        unsafe { DestroyWindow(hwnd(handle)) }.is_ok()
    }

    fn process_windows(&self) -> Vec<WindowHandle> {
        let mut found: Vec<WindowHandle> = Vec::new();
        let _ = unsafe {
            EnumWindows(
                Some(collect_process_window),
                LPARAM(&mut found as *mut Vec<WindowHandle> as isize),
            )
        };
        found
    }
}

impl HookHost for Win32Platform {
    fn install(&self, entry: EntryPoint) -> Result<(), HookError> {
        let mut detours = DETOURS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(detour) = detours.get(&entry) {
            if !detour.is_enabled() {
                unsafe { detour.enable() }.map_err(|err| install_error(entry, err))?;
            }
            return Ok(());
        }

        let target = resolve(entry)?;
        let detour = unsafe { RawDetour::new(target, detour_for(entry)) }.map_err(|err| install_error(entry, err))?;
        let slot = &TRAMPOLINES[entry.index()];
        slot.store(detour.trampoline() as *const () as usize, Ordering::Release);
        if let Err(err) = unsafe { detour.enable() } {
            slot.store(0, Ordering::Release);
            return Err(install_error(entry, err));
        }
        detours.insert(entry, detour);
        Ok(())
    }

    fn uninstall(&self, entry: EntryPoint) {
        let detours = DETOURS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(detour) = detours.get(&entry).filter(|detour| detour.is_enabled()) {
            if let Err(err) = unsafe { detour.disable() } {
                warn!(%entry, %err, "failed to disable hook");
            }
        }
    }

    fn is_bound(&self, entry: EntryPoint) -> bool {
        TRAMPOLINES[entry.index()].load(Ordering::Acquire) != 0
    }

    fn watch_window_procs(&self) -> Result<ObserverToken, HookError> {
        let module = own_module().ok_or_else(|| HookError::Watcher("module of the watcher not found".into()))?;
        let hook = unsafe {
            SetWinEventHook(
                EVENT_OBJECT_CREATE,
                EVENT_OBJECT_SHOW,
                module,
                Some(win_event_proc),
                GetCurrentProcessId(),
                0,
                WINEVENT_INCONTEXT,
            )
        };
        if hook.is_invalid() {
            return Err(HookError::Watcher(windows::core::Error::from_win32().to_string()));
        }
        Ok(ObserverToken(hook.0 as usize as u64))
    }

    fn unwatch_window_procs(&self, token: ObserverToken) {
        let hook = HWINEVENTHOOK(token.0 as usize as _);
        if !unsafe { UnhookWinEvent(hook) }.as_bool() {
            warn!("failed to remove window watcher");
        }
    }
}

fn activate(config: Config) -> anyhow::Result<()> {
    if engine().is_some() {
        return Ok(());
    }
    let platform = Arc::new(Win32Platform);
    let suppressor = Arc::new(Suppressor::new(config, platform.clone(), platform));
    *ENGINE.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&suppressor));
    if let Err(err) = suppressor.activate() {
        *ENGINE.write().unwrap_or_else(PoisonError::into_inner) = None;
        return Err(err);
    }
    Ok(())
}

/// Called by the host runtime when the module is loaded into `magnify.exe`.
#[no_mangle]
pub extern "system" fn magnifier_headless_activate() -> BOOL {
    let result = std::panic::catch_unwind(|| {
        let config = Config::from_env();
        logging::init(config.debug_logging, config.log_file.clone());
        activate(config)
    });
    match result {
        Ok(Ok(())) => BOOL(1),
        Ok(Err(err)) => {
            error!("activation failed: {err:#}");
            BOOL(0)
        }
        Err(_) => BOOL(0),
    }
}

/// Called by the host runtime before the module is unloaded.
#[no_mangle]
pub extern "system" fn magnifier_headless_deactivate() {
    let _ = std::panic::catch_unwind(|| {
        // Stay reachable while tearing down so in-flight messages still find
        // their original procedures.
        if let Some(engine) = engine() {
            engine.deactivate();
        }
        *ENGINE.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("deactivated");
    });
}
