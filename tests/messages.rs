use std::sync::Arc;

use magnifier_headless::api::{CreateWindowArgs, WindowApi};
use magnifier_headless::mock::{Call, FakeDesktop, MockHookHost, DEFAULTED, FILTER_PROC, FORWARDED, NATIVE_PROC};
use magnifier_headless::win32::*;
use magnifier_headless::{Config, Suppressor};

fn ready(config: Config) -> (Arc<FakeDesktop>, Arc<Suppressor>) {
    let desktop = FakeDesktop::new();
    let (host, _hooks) = MockHookHost::new();
    let engine = Arc::new(Suppressor::new(config, desktop.clone(), host));
    engine.activate().unwrap();
    (desktop, engine)
}

fn subclassed(desktop: &FakeDesktop, engine: &Suppressor) -> WindowHandle {
    let hwnd = engine.create_window(CreateWindowArgs::new("MagUIClass").title("Magnifier"));
    assert!(engine.is_subclassed(hwnd));
    desktop.clear_calls();
    hwnd
}

fn send(engine: &Suppressor, hwnd: WindowHandle, msg: u32, wparam: usize, lparam: isize) -> isize {
    unsafe { engine.window_proc(hwnd, msg, wparam, lparam) }
}

fn forwarded(desktop: &FakeDesktop) -> usize {
    desktop.count(|call| matches!(call, Call::CallProc { .. }))
}

#[test]
fn show_messages_are_swallowed() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, WM_SHOWWINDOW, 1, 0), 0);
    assert_eq!(forwarded(&desktop), 0);

    assert_eq!(send(&engine, hwnd, WM_SHOWWINDOW, 0, 0), FORWARDED);
    assert!(desktop.calls().contains(&Call::CallProc {
        proc_: NATIVE_PROC,
        msg: WM_SHOWWINDOW,
    }));
}

#[test]
fn position_changes_are_rewritten_in_place() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);
    let mut pos = WindowPos {
        hwnd: hwnd.0,
        flags: SWP_SHOWWINDOW,
        ..WindowPos::default()
    };

    let result = send(&engine, hwnd, WM_WINDOWPOSCHANGING, 0, &mut pos as *mut WindowPos as isize);

    assert_eq!(result, FORWARDED);
    assert_eq!(pos.flags & SWP_SHOWWINDOW, 0);
    assert_ne!(pos.flags & SWP_HIDEWINDOW, 0);
    assert_ne!(pos.flags & SWP_NOACTIVATE, 0);
}

#[test]
fn position_changes_without_show_are_left_alone() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);
    let mut pos = WindowPos {
        flags: 0x0001,
        ..WindowPos::default()
    };

    send(&engine, hwnd, WM_WINDOWPOSCHANGING, 0, &mut pos as *mut WindowPos as isize);
    send(&engine, hwnd, WM_WINDOWPOSCHANGING, 0, 0);

    assert_eq!(pos.flags, 0x0001);
    assert_eq!(forwarded(&desktop), 2);
}

#[test]
fn visible_after_position_change_forces_one_hide() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);
    desktop.show_window(hwnd, SW_SHOW);
    desktop.clear_calls();

    assert_eq!(send(&engine, hwnd, WM_WINDOWPOSCHANGED, 0, 0), FORWARDED);
    assert_eq!(send(&engine, hwnd, WM_WINDOWPOSCHANGED, 0, 0), FORWARDED);

    assert!(!desktop.window(hwnd).unwrap().visible());
    assert_eq!(desktop.count(|call| *call == Call::Show { hwnd, cmd: SW_HIDE }), 1);
}

#[test]
fn activation_is_refused() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, WM_ACTIVATE, 1, 0), 0);
    assert_eq!(send(&engine, hwnd, WM_ACTIVATE, 0x0001_0002, 0), 0);
    assert_eq!(send(&engine, hwnd, WM_NCACTIVATE, 1, 0), 0);
    assert_eq!(send(&engine, hwnd, WM_MOUSEACTIVATE, 0, 0), MA_NOACTIVATE);
    assert_eq!(forwarded(&desktop), 0);

    // Deactivation still reaches the window.
    assert_eq!(send(&engine, hwnd, WM_ACTIVATE, WA_INACTIVE, 0), FORWARDED);
    assert_eq!(send(&engine, hwnd, WM_NCACTIVATE, 0, 0), FORWARDED);
}

#[test]
fn painting_is_validated_and_skipped() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, WM_PAINT, 0, 0), 0);
    assert_eq!(send(&engine, hwnd, WM_ERASEBKGND, 0, 0), 1);

    assert!(desktop.calls().contains(&Call::Validate { hwnd }));
    assert_eq!(forwarded(&desktop), 0);
}

#[test]
fn focus_is_dropped() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, WM_SETFOCUS, 0, 0), 0);

    assert!(desktop.calls().contains(&Call::SetFocus {
        hwnd: WindowHandle::NULL
    }));
}

#[test]
fn restore_and_maximize_are_swallowed() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, WM_SYSCOMMAND, SC_RESTORE, 0), 0);
    assert_eq!(send(&engine, hwnd, WM_SYSCOMMAND, SC_MAXIMIZE | 0x2, 0), 0);
    assert_eq!(forwarded(&desktop), 0);

    // SC_MINIMIZE
    assert_eq!(send(&engine, hwnd, WM_SYSCOMMAND, 0xF020, 0), FORWARDED);
}

#[test]
fn other_messages_reach_the_original_procedure() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, 0x0400, 0, 0), FORWARDED);
    assert_eq!(engine.stats().messages(), 0);
}

#[test]
fn destruction_restores_the_procedure() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    assert_eq!(send(&engine, hwnd, WM_NCDESTROY, 0, 0), FORWARDED);

    assert!(!engine.is_subclassed(hwnd));
    assert_eq!(desktop.window(hwnd).unwrap().proc_, NATIVE_PROC);
    assert!(desktop.calls().contains(&Call::CallProc {
        proc_: NATIVE_PROC,
        msg: WM_NCDESTROY,
    }));
}

#[test]
fn freed_slot_can_be_reused() {
    let (desktop, engine) = ready(Config::default());
    let first = subclassed(&desktop, &engine);
    let second = engine.create_window(CreateWindowArgs::new("MagUIClass").title("Magnifier"));
    assert!(!engine.is_subclassed(second));

    send(&engine, first, WM_NCDESTROY, 0, 0);

    assert!(engine.subclass(second));
    assert_eq!(desktop.window(second).unwrap().proc_, FILTER_PROC);
}

#[test]
fn resubclassing_keeps_filter_in_front() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);
    let other_proc = WindowProc(0xBEEF);

    let previous = engine.set_window_long(hwnd, GWLP_WNDPROC, other_proc.0 as isize);

    assert_eq!(previous, NATIVE_PROC.0 as isize);
    assert_eq!(desktop.window(hwnd).unwrap().proc_, FILTER_PROC);
    assert_eq!(send(&engine, hwnd, 0x0400, 0, 0), FORWARDED);
    assert!(desktop.calls().contains(&Call::CallProc {
        proc_: other_proc,
        msg: 0x0400,
    }));

    engine.deactivate();
    assert_eq!(desktop.window(hwnd).unwrap().proc_, other_proc);
}

#[test]
fn clearing_the_procedure_is_not_rechained() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);

    let previous = engine.set_window_long(hwnd, GWLP_WNDPROC, 0);

    assert_eq!(previous, FILTER_PROC.0 as isize);
    assert!(desktop.calls().contains(&Call::SetLong {
        hwnd,
        index: GWLP_WNDPROC,
        value: 0,
    }));
    assert_eq!(send(&engine, hwnd, 0x0400, 0, 0), FORWARDED);
    assert!(desktop.calls().contains(&Call::CallProc {
        proc_: NATIVE_PROC,
        msg: 0x0400,
    }));
    assert_eq!(
        desktop.count(|call| matches!(call, Call::CallProc { proc_, .. } if proc_.0 == 0)),
        0
    );
}

#[test]
fn subclass_limit_is_configurable() {
    let (desktop, engine) = ready(Config::default());
    let first = engine.create_window(CreateWindowArgs::new("MagUIClass").title("Magnifier"));
    let second = engine.create_window(CreateWindowArgs::new("ScreenMagnifierUIWnd"));
    assert!(engine.is_subclassed(first));
    assert!(!engine.is_subclassed(second));
    assert_eq!(desktop.window(second).unwrap().proc_, NATIVE_PROC);

    let config = Config {
        max_subclassed_windows: 4,
        ..Config::default()
    };
    let (_desktop, engine) = ready(config);
    let first = engine.create_window(CreateWindowArgs::new("MagUIClass").title("Magnifier"));
    let second = engine.create_window(CreateWindowArgs::new("ScreenMagnifierUIWnd"));
    assert!(engine.is_subclassed(first));
    assert!(engine.is_subclassed(second));
}

#[test]
fn closed_gate_forwards_everything() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = subclassed(&desktop, &engine);
    engine.deactivate();
    desktop.clear_calls();

    assert_eq!(send(&engine, hwnd, WM_SHOWWINDOW, 1, 0), DEFAULTED);
    assert_eq!(send(&engine, hwnd, WM_ACTIVATE, 1, 0), DEFAULTED);
}

#[test]
fn watcher_subclasses_and_hides_visible_targets() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = desktop.spawn("ApplicationFrameWindow", Some("Magnifier"), WS_VISIBLE, 0);
    let other = desktop.spawn("ApplicationFrameWindow", Some("Settings"), WS_VISIBLE, 0);

    engine.observe_window(hwnd);
    engine.observe_window(other);

    assert!(engine.is_subclassed(hwnd));
    assert!(!desktop.window(hwnd).unwrap().visible());
    assert!(!engine.is_subclassed(other));
    assert!(desktop.window(other).unwrap().visible());
}

#[test]
fn watcher_ignores_dead_windows() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = desktop.spawn("MagUIClass", Some("Magnifier"), WS_VISIBLE, 0);
    desktop.kill(hwnd);

    engine.observe_window(hwnd);

    assert!(!engine.is_subclassed(hwnd));
}
