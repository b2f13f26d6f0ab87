use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the JSON file read on activation.
pub const CONFIG_ENV: &str = "MAGNIFIER_HEADLESS_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleMatch {
    /// The window title must equal one of the markers.
    #[default]
    Exact,
    /// The window title only has to contain one of the markers.
    Substring,
}

/// Settings for the optional background sweep that re-hides target windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub interval_ms: u64,
    /// Upper bound on passes; the sweep never runs unbounded.
    pub max_passes: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            max_passes: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window classes owned by the Magnifier UI.
    pub target_classes: Vec<String>,
    /// Generic container classes that only count as a target when their title
    /// matches as well.
    pub frame_classes: Vec<String>,
    /// Localised Magnifier window titles.
    pub title_markers: Vec<String>,
    /// Identify windows of any class by title.
    pub match_titles: bool,
    pub title_match: TitleMatch,
    /// Number of handles remembered by the identity cache.
    pub cache_capacity: usize,
    /// How many target windows may have their procedure replaced at once.
    pub max_subclassed_windows: usize,
    /// Install the window creation/show watcher that drives subclassing.
    pub watch_window_procs: bool,
    /// Intercept `DwmSetWindowAttribute`.
    pub hook_compositor: bool,
    pub debug_logging: bool,
    pub log_file: Option<PathBuf>,
    pub sweep: Option<SweepConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_classes: vec!["MagUIClass".into(), "ScreenMagnifierUIWnd".into()],
            frame_classes: vec!["ApplicationFrameWindow".into()],
            title_markers: vec!["Magnifier".into(), "Büyüteç".into()],
            match_titles: true,
            title_match: TitleMatch::Exact,
            cache_capacity: 8,
            max_subclassed_windows: 1,
            watch_window_procs: true,
            hook_compositor: true,
            debug_logging: false,
            log_file: None,
            sweep: None,
        }
    }
}

impl Config {
    /// Load settings from `path`. A missing or empty file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Settings from the file named by [`CONFIG_ENV`], falling back to the
    /// defaults when the variable is unset or the file is unreadable.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(?err, path = ?path, "invalid configuration; using defaults");
                Self::default()
            }
        }
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity.max(1)
    }
}
