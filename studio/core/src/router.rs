//! View Router
//!
//! Pure mapping from the stored [`View`] to the screen a surface should
//! render. Surfaces call [`route`] after every store change; nothing here has
//! side effects.

use serde::{Deserialize, Serialize};

use crate::model::View;
use crate::store::WorkflowState;

/// Screens a surface can render
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    /// Landing page with the three entry points
    Home,
    /// Template gallery with category filter
    TemplateGallery,
    /// Topic research form
    TopicInput,
    /// Manual content form
    ManualInput,
    /// Spec preview and image generation
    Editor,
}

impl Screen {
    /// Heading shown by surfaces
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::TemplateGallery => "Template Gallery",
            Self::TopicInput => "Topic Research",
            Self::ManualInput => "Manual Creation",
            Self::Editor => "Infographic Editor",
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Screen for a view
#[must_use]
pub fn route(view: View) -> Screen {
    match view {
        View::Home => Screen::Home,
        View::Templates => Screen::TemplateGallery,
        View::Topic => Screen::TopicInput,
        View::Manual => Screen::ManualInput,
        View::Editor => Screen::Editor,
    }
}

/// Screen for a view name; unknown names fall back to Home
#[must_use]
pub fn route_name(name: &str) -> Screen {
    View::parse(name).map_or(Screen::Home, route)
}

/// Screen implied by a whole state
#[must_use]
pub fn route_state(state: &WorkflowState) -> Screen {
    route(state.view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_view_has_a_screen() {
        assert_eq!(route(View::Home), Screen::Home);
        assert_eq!(route(View::Templates), Screen::TemplateGallery);
        assert_eq!(route(View::Topic), Screen::TopicInput);
        assert_eq!(route(View::Manual), Screen::ManualInput);
        assert_eq!(route(View::Editor), Screen::Editor);
    }

    #[test]
    fn test_unknown_names_fall_back_to_home() {
        assert_eq!(route_name("editor"), Screen::Editor);
        assert_eq!(route_name("settings"), Screen::Home);
        assert_eq!(route_name(""), Screen::Home);
    }

    #[test]
    fn test_route_state_follows_view() {
        let mut state = WorkflowState::default();
        assert_eq!(route_state(&state), Screen::Home);
        state.view = View::Templates;
        assert_eq!(route_state(&state), Screen::TemplateGallery);
    }
}
