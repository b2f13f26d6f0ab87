use std::fmt;

/// OS entry points the engine intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    CreateWindowEx,
    ShowWindow,
    SetWindowPos,
    SetWindowLongPtr,
    UpdateLayeredWindow,
    SetLayeredWindowAttributes,
    AnimateWindow,
    BringWindowToTop,
    SetForegroundWindow,
    SetWindowRgn,
    DwmSetWindowAttribute,
}

impl EntryPoint {
    pub const COUNT: usize = 11;

    pub const ALL: [EntryPoint; Self::COUNT] = [
        EntryPoint::CreateWindowEx,
        EntryPoint::ShowWindow,
        EntryPoint::SetWindowPos,
        EntryPoint::SetWindowLongPtr,
        EntryPoint::UpdateLayeredWindow,
        EntryPoint::SetLayeredWindowAttributes,
        EntryPoint::AnimateWindow,
        EntryPoint::BringWindowToTop,
        EntryPoint::SetForegroundWindow,
        EntryPoint::SetWindowRgn,
        EntryPoint::DwmSetWindowAttribute,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Exported symbol name.
    pub fn symbol(self) -> &'static str {
        match self {
            EntryPoint::CreateWindowEx => "CreateWindowExW",
            EntryPoint::ShowWindow => "ShowWindow",
            EntryPoint::SetWindowPos => "SetWindowPos",
            EntryPoint::SetWindowLongPtr => "SetWindowLongPtrW",
            EntryPoint::UpdateLayeredWindow => "UpdateLayeredWindow",
            EntryPoint::SetLayeredWindowAttributes => "SetLayeredWindowAttributes",
            EntryPoint::AnimateWindow => "AnimateWindow",
            EntryPoint::BringWindowToTop => "BringWindowToTop",
            EntryPoint::SetForegroundWindow => "SetForegroundWindow",
            EntryPoint::SetWindowRgn => "SetWindowRgn",
            EntryPoint::DwmSetWindowAttribute => "DwmSetWindowAttribute",
        }
    }

    pub fn module(self) -> &'static str {
        match self {
            EntryPoint::DwmSetWindowAttribute => "dwmapi.dll",
            _ => "user32.dll",
        }
    }

    /// Activation aborts when a mandatory hook cannot be installed.
    pub fn is_mandatory(self) -> bool {
        !matches!(self, EntryPoint::DwmSetWindowAttribute)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Registration handle of the window watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverToken(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The entry point could not be located in its module.
    Unresolved(EntryPoint),
    Install { entry: EntryPoint, reason: String },
    Watcher(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Unresolved(entry) => {
                write!(f, "{} not found in {}", entry.symbol(), entry.module())
            }
            HookError::Install { entry, reason } => {
                write!(f, "failed to hook {}: {}", entry, reason)
            }
            HookError::Watcher(reason) => write!(f, "failed to watch windows: {}", reason),
        }
    }
}

impl std::error::Error for HookError {}

/// Process-wide code interception as provided by the host runtime.
pub trait HookHost: Send + Sync {
    /// Route `entry` to the engine and capture the previous implementation.
    fn install(&self, entry: EntryPoint) -> Result<(), HookError>;
    fn uninstall(&self, entry: EntryPoint);
    /// Whether the previous implementation of `entry` has been captured.
    fn is_bound(&self, entry: EntryPoint) -> bool;
    /// Start reporting window creation and show events to the engine.
    fn watch_window_procs(&self) -> Result<ObserverToken, HookError>;
    fn unwatch_window_procs(&self, token: ObserverToken);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_all() {
        for (i, entry) in EntryPoint::ALL.iter().enumerate() {
            assert_eq!(entry.index(), i);
        }
    }

    #[test]
    fn only_the_compositor_hook_is_optional() {
        let optional: Vec<_> = EntryPoint::ALL
            .iter()
            .filter(|entry| !entry.is_mandatory())
            .collect();
        assert_eq!(optional, vec![&EntryPoint::DwmSetWindowAttribute]);
        assert_eq!(EntryPoint::DwmSetWindowAttribute.module(), "dwmapi.dll");
    }

    #[test]
    fn errors_name_the_symbol() {
        let err = HookError::Install {
            entry: EntryPoint::SetWindowLongPtr,
            reason: "busy".into(),
        };
        assert_eq!(err.to_string(), "failed to hook SetWindowLongPtrW: busy");
    }
}
