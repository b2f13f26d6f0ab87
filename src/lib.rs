//! Keeps the Windows Magnifier's own window hidden while magnification keeps
//! running, by intercepting the window-management calls it makes from inside
//! its process.

pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod hooks;
pub mod logging;
pub mod mock;
pub mod subclass;
pub mod sweeper;
pub mod win32;

#[cfg(windows)]
pub mod platform;

pub use config::Config;
pub use engine::{Phase, SuppressionStats, Suppressor};
pub use hooks::{EntryPoint, HookError, HookHost};
