use crate::api::{ClassRef, WindowApi};
use crate::config::{Config, TitleMatch};
use crate::win32::WindowHandle;

/// Decides whether a window belongs to the Magnifier UI.
///
/// Matching is exact on class names. Titles are compared against the
/// configured locale markers, either for equality or containment.
#[derive(Debug, Clone)]
pub struct Classifier {
    target_classes: Vec<String>,
    frame_classes: Vec<String>,
    title_markers: Vec<String>,
    match_titles: bool,
    title_match: TitleMatch,
}

impl Classifier {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_classes: config.target_classes.clone(),
            frame_classes: config.frame_classes.clone(),
            title_markers: config.title_markers.clone(),
            match_titles: config.match_titles,
            title_match: config.title_match,
        }
    }

    /// Classify a live window. `None` means no verdict could be reached
    /// (invalid handle, failed class or title query); callers treat it as
    /// "not a target" for this call only.
    pub fn classify(&self, api: &dyn WindowApi, hwnd: WindowHandle) -> Option<bool> {
        if hwnd.is_null() || !api.is_window(hwnd) {
            return None;
        }
        let class = api.class_name(hwnd)?;
        if self.is_target_class(&class) {
            return Some(true);
        }
        if !self.needs_title(&class) {
            return Some(false);
        }
        let title = api.window_text(hwnd)?;
        Some(self.matches(Some(&class), Some(&title)))
    }

    /// Classify a creation request before the window exists.
    pub fn matches_request(&self, class: &ClassRef, title: Option<&str>) -> bool {
        self.matches(class.name(), title)
    }

    pub fn matches(&self, class: Option<&str>, title: Option<&str>) -> bool {
        match class {
            Some(class) if self.is_target_class(class) => true,
            Some(class) if self.is_frame_class(class) => self.title_matches(title),
            _ => self.match_titles && self.title_matches(title),
        }
    }

    fn needs_title(&self, class: &str) -> bool {
        self.match_titles || self.is_frame_class(class)
    }

    fn is_target_class(&self, class: &str) -> bool {
        self.target_classes.iter().any(|c| c == class)
    }

    fn is_frame_class(&self, class: &str) -> bool {
        self.frame_classes.iter().any(|c| c == class)
    }

    fn title_matches(&self, title: Option<&str>) -> bool {
        let Some(title) = title else {
            return false;
        };
        self.title_markers.iter().any(|marker| match self.title_match {
            TitleMatch::Exact => title == marker,
            TitleMatch::Substring => !marker.is_empty() && title.contains(marker.as_str()),
        })
    }
}
