use std::sync::Arc;

use magnifier_headless::api::CreateWindowArgs;
use magnifier_headless::config::TitleMatch;
use magnifier_headless::mock::{FakeDesktop, MockHookHost};
use magnifier_headless::win32::*;
use magnifier_headless::{Config, Suppressor};

fn ready(config: Config) -> (Arc<FakeDesktop>, Arc<Suppressor>) {
    let desktop = FakeDesktop::new();
    let (host, _hooks) = MockHookHost::new();
    let engine = Arc::new(Suppressor::new(config, desktop.clone(), host));
    engine.activate().unwrap();
    (desktop, engine)
}

#[test]
fn magnifier_classes_are_targets() {
    let (desktop, engine) = ready(Config::default());

    let ui = desktop.spawn("MagUIClass", None, 0, 0);
    let screen = desktop.spawn("ScreenMagnifierUIWnd", Some("anything"), 0, 0);
    let notepad = desktop.spawn("Notepad", Some("Untitled"), 0, 0);

    assert!(engine.is_target(ui));
    assert!(engine.is_target(screen));
    assert!(!engine.is_target(notepad));
}

#[test]
fn frames_need_a_magnifier_title() {
    let config = Config {
        match_titles: false,
        ..Config::default()
    };
    let (desktop, engine) = ready(config);

    let magnifier = desktop.spawn("ApplicationFrameWindow", Some("Magnifier"), 0, 0);
    let turkish = desktop.spawn("ApplicationFrameWindow", Some("Büyüteç"), 0, 0);
    let settings = desktop.spawn("ApplicationFrameWindow", Some("Settings"), 0, 0);
    let untitled = desktop.spawn("ApplicationFrameWindow", None, 0, 0);
    let titled = desktop.spawn("Notepad", Some("Magnifier"), 0, 0);

    assert!(engine.is_target(magnifier));
    assert!(engine.is_target(turkish));
    assert!(!engine.is_target(settings));
    assert!(!engine.is_target(untitled));
    assert!(!engine.is_target(titled));
}

#[test]
fn substring_titles_are_opt_in() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = desktop.spawn("Notepad", Some("Magnifier - 200%"), 0, 0);
    assert!(!engine.is_target(hwnd));

    let config = Config {
        title_match: TitleMatch::Substring,
        ..Config::default()
    };
    let (desktop, engine) = ready(config);
    let hwnd = desktop.spawn("Notepad", Some("Magnifier - 200%"), 0, 0);
    assert!(engine.is_target(hwnd));
}

#[test]
fn invalid_handles_are_never_targets() {
    let (desktop, engine) = ready(Config::default());

    assert!(!engine.is_target(WindowHandle::NULL));
    assert!(!engine.is_target(WindowHandle(0xDEAD)));

    let hwnd = desktop.spawn("MagUIClass", Some("Magnifier"), 0, 0);
    assert!(engine.is_target(hwnd));
    desktop.kill(hwnd);
    assert!(!engine.is_target(hwnd));
}

#[test]
fn failed_class_query_is_not_a_target() {
    let (desktop, engine) = ready(Config::default());
    desktop.fail_class_queries(true);

    let hwnd = desktop.spawn("MagUIClass", Some("Magnifier"), 0, 0);

    assert!(!engine.is_target(hwnd));
    assert!(engine.show_window(hwnd, SW_SHOW));
    assert!(desktop.window(hwnd).unwrap().visible());
}

#[test]
fn failed_query_is_retried_on_next_call() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = desktop.spawn("MagUIClass", Some("Magnifier"), 0, 0);

    desktop.fail_class_queries(true);
    assert!(!engine.is_target(hwnd));

    desktop.fail_class_queries(false);
    assert!(engine.is_target(hwnd));
    assert!(engine.show_window(hwnd, SW_SHOW));
    assert!(!desktop.window(hwnd).unwrap().visible());
}

#[test]
fn untitled_frames_are_rechecked_once_titled() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = desktop.spawn("ApplicationFrameWindow", None, 0, 0);
    assert!(!engine.is_target(hwnd));

    desktop.set_title(hwnd, Some("Magnifier"));

    assert!(engine.is_target(hwnd));
}

#[test]
fn verdicts_are_cached() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = desktop.spawn("MagUIClass", Some("Magnifier"), 0, 0);
    assert!(engine.is_target(hwnd));

    desktop.fail_class_queries(true);

    assert!(engine.is_target(hwnd));
}

#[test]
fn cache_forgets_old_handles() {
    let (desktop, engine) = ready(Config::default());
    let first = desktop.spawn("MagUIClass", Some("Magnifier"), 0, 0);
    assert!(engine.is_target(first));
    for _ in 0..engine.config().cache_capacity() {
        let other = desktop.spawn("Notepad", Some("Untitled"), 0, 0);
        engine.is_target(other);
    }

    desktop.fail_class_queries(true);

    assert!(!engine.is_target(first));
}

#[test]
fn created_targets_are_cached_without_a_query() {
    let (desktop, engine) = ready(Config::default());
    let hwnd = engine.create_window(CreateWindowArgs::new("MagUIClass"));

    desktop.fail_class_queries(true);

    assert!(engine.is_target(hwnd));
}

#[test]
fn atom_classes_fall_back_to_title() {
    let (desktop, engine) = ready(Config::default());

    let hidden = engine.create_window(
        CreateWindowArgs::new(magnifier_headless::api::ClassRef::Atom(0xC123))
            .title("Magnifier")
            .style(WS_VISIBLE),
    );
    let shown = engine.create_window(CreateWindowArgs::new(magnifier_headless::api::ClassRef::Atom(0xC124)).style(WS_VISIBLE));

    assert!(!desktop.window(hidden).unwrap().visible());
    assert!(desktop.window(shown).unwrap().visible());
}
