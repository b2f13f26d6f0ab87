use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use magnifier_headless::config::SweepConfig;
use magnifier_headless::mock::{Call, FakeDesktop, MockHookHost};
use magnifier_headless::sweeper::Sweeper;
use magnifier_headless::win32::*;
use magnifier_headless::{Config, Suppressor};

fn engine(sweep: Option<SweepConfig>) -> (Arc<FakeDesktop>, Arc<Suppressor>) {
    let desktop = FakeDesktop::new();
    let (host, _hooks) = MockHookHost::new();
    let config = Config {
        sweep,
        ..Config::default()
    };
    let engine = Arc::new(Suppressor::new(config, desktop.clone(), host));
    (desktop, engine)
}

#[test]
fn sweep_hides_visible_targets_only() {
    let (desktop, engine) = engine(None);
    engine.activate().unwrap();
    let target = desktop.spawn("MagUIClass", Some("Magnifier"), WS_VISIBLE, 0);
    let hidden = desktop.spawn("ScreenMagnifierUIWnd", None, 0, 0);
    let other = desktop.spawn("Notepad", None, WS_VISIBLE, 0);

    assert_eq!(engine.sweep(), 1);
    assert_eq!(engine.sweep(), 0);

    assert!(!desktop.window(target).unwrap().visible());
    assert!(!desktop.window(hidden).unwrap().visible());
    assert!(desktop.window(other).unwrap().visible());
}

#[test]
fn sweep_posts_hides_instead_of_waiting_on_the_owner() {
    let (desktop, engine) = engine(None);
    engine.activate().unwrap();
    let target = desktop.spawn("MagUIClass", Some("Magnifier"), WS_VISIBLE, 0);
    desktop.clear_calls();

    engine.sweep();

    assert!(desktop.calls().contains(&Call::ShowAsync {
        hwnd: target,
        cmd: SW_HIDE,
    }));
    assert_eq!(desktop.count(|call| matches!(call, Call::Show { .. })), 0);
}

#[test]
fn sweep_does_nothing_before_activation() {
    let (desktop, engine) = engine(None);
    let target = desktop.spawn("MagUIClass", Some("Magnifier"), WS_VISIBLE, 0);

    assert_eq!(engine.sweep(), 0);
    assert!(desktop.window(target).unwrap().visible());
}

#[test]
fn background_sweep_catches_windows_shown_behind_the_hooks() {
    let sweep = SweepConfig {
        interval_ms: 5,
        max_passes: 200,
    };
    let (desktop, engine) = engine(Some(sweep));
    engine.activate().unwrap();
    let target = desktop.spawn("MagUIClass", Some("Magnifier"), WS_VISIBLE, 0);

    let deadline = Instant::now() + Duration::from_secs(2);
    while desktop.window(target).unwrap().visible() && Instant::now() < deadline {
        sleep(Duration::from_millis(5));
    }

    assert!(!desktop.window(target).unwrap().visible());
    engine.deactivate();
}

#[test]
fn sweeper_stops_after_its_pass_limit() {
    let (_desktop, engine) = engine(None);
    engine.activate().unwrap();
    let sweep = SweepConfig {
        interval_ms: 1,
        max_passes: 3,
    };

    let sweeper = Sweeper::start(Arc::downgrade(&engine), sweep);
    sleep(Duration::from_millis(100));

    assert_eq!(sweeper.stop(), 3);
}

#[test]
fn sweeper_ends_when_the_gate_closes() {
    let (_desktop, engine) = engine(None);
    let sweep = SweepConfig {
        interval_ms: 1,
        max_passes: 1000,
    };

    let sweeper = Sweeper::start(Arc::downgrade(&engine), sweep);
    sleep(Duration::from_millis(50));

    assert_eq!(sweeper.stop(), 0);
}

#[test]
fn deactivation_cancels_a_long_sweep() {
    let sweep = SweepConfig {
        interval_ms: 10_000,
        max_passes: 1000,
    };
    let (_desktop, engine) = engine(Some(sweep));
    engine.activate().unwrap();

    let started = Instant::now();
    engine.deactivate();

    assert!(started.elapsed() < Duration::from_secs(5));
}
