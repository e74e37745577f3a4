//! Workflow Domain Types
//!
//! The content entities that flow through the studio pipeline: the active
//! view, templates, research bundles, manual input and the generated spec.
//! Page and image artifacts live in [`crate::registry`].
//!
//! Field names on the wire follow the generation service's JSON, so the
//! serde attributes here are part of the service contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Screen identifier stored in the state store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Landing screen
    #[default]
    Home,
    /// Template gallery
    Templates,
    /// Topic research entry
    Topic,
    /// Manual content entry
    Manual,
    /// Spec editor and image generation
    Editor,
}

impl View {
    /// Every view, in navigation order
    pub const ALL: [View; 5] = [
        View::Home,
        View::Templates,
        View::Topic,
        View::Manual,
        View::Editor,
    ];

    /// Parse a view name; unknown names yield `None`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "home" => Some(Self::Home),
            "templates" => Some(Self::Templates),
            "topic" => Some(Self::Topic),
            "manual" => Some(Self::Manual),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }

    /// Lowercase name, as used on the wire
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Templates => "templates",
            Self::Topic => "topic",
            Self::Manual => "manual",
            Self::Editor => "editor",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which content source the user chose
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Research a topic online
    Topic,
    /// Type the content by hand
    Manual,
}

impl InputMode {
    /// The view that hosts this input mode
    #[must_use]
    pub fn view(self) -> View {
        match self {
            Self::Topic => View::Topic,
            Self::Manual => View::Manual,
        }
    }
}

/// A visual style descriptor offered by the service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Stable identifier sent with plan requests
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Gallery category (e.g. "Tech", "Business")
    #[serde(default)]
    pub category: String,
    /// Theme key used by the service when prompting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Preview image path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Research artifact produced by the research call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBundle {
    /// Topic that was researched
    pub topic: String,
    /// When the research was captured
    pub captured_at: DateTime<Utc>,
    /// Raw research text
    pub research_data: String,
}

/// Manual section identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u32);

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user-authored section of manual input
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualSection {
    /// Section identifier
    pub id: SectionId,
    /// Section heading
    pub title: String,
    /// Section body
    pub content: String,
}

/// Partial update for a manual section; `None` fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionUpdate {
    /// New heading
    pub title: Option<String>,
    /// New body
    pub content: Option<String>,
}

/// Hand-written content, the alternative to a research bundle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManualInput {
    /// Document title
    pub title: String,
    /// Main body text
    pub body: String,
    /// Ordered extra sections
    pub sections: Vec<ManualSection>,
    last_section_id: u32,
}

impl ManualInput {
    /// Whether both title and body are filled in
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.title.trim().is_empty() && !self.body.trim().is_empty()
    }

    /// Append an empty section and return its id
    ///
    /// Ids come from a per-input counter and are never reused after removal.
    pub fn add_section(&mut self) -> SectionId {
        self.last_section_id += 1;
        let id = SectionId(self.last_section_id);
        self.sections.push(ManualSection {
            id,
            title: String::new(),
            content: String::new(),
        });
        id
    }

    /// Remove a section; unknown ids are ignored
    pub fn remove_section(&mut self, id: SectionId) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.id != id);
        self.sections.len() != before
    }

    /// Merge fields into a section; unknown ids are ignored
    pub fn update_section(&mut self, id: SectionId, update: SectionUpdate) -> bool {
        let Some(section) = self.sections.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if let Some(title) = update.title {
            section.title = title;
        }
        if let Some(content) = update.content {
            section.content = content;
        }
        true
    }
}

/// One section of a generated spec
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSection {
    /// Section heading
    pub title: String,
    /// Section text
    #[serde(default)]
    pub body: String,
    /// Suggested icon concept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_idea: Option<String>,
}

/// Color guidance attached to a spec
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    /// Main colors as hex strings
    #[serde(default)]
    pub primary_colors: Vec<String>,
    /// Accent colors as hex strings
    #[serde(default)]
    pub accent_colors: Vec<String>,
    /// Free-form background description
    #[serde(default)]
    pub background_style: String,
}

/// Structured content description produced by plan generation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Infographic title
    #[serde(rename = "projectTitle", default)]
    pub title: String,
    /// One sentence summary
    #[serde(default)]
    pub one_liner: String,
    /// Ordered content sections
    #[serde(default)]
    pub sections: Vec<SpecSection>,
    /// Color guidance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Palette>,
    /// Prompt used for image generation
    #[serde(default)]
    pub image_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_view_parse_and_display() {
        for view in View::ALL {
            assert_eq!(View::parse(view.as_str()), Some(view));
        }
        assert_eq!(View::parse(" Editor "), Some(View::Editor));
        assert_eq!(View::parse("settings"), None);
        assert_eq!(View::default(), View::Home);
    }

    #[test]
    fn test_spec_decodes_service_json() {
        let raw = r##"{
            "projectTitle": "History of AI",
            "oneLiner": "From Turing to transformers",
            "sections": [
                {"title": "Origins", "body": "1950s", "iconIdea": "gears"},
                {"title": "Today"}
            ],
            "palette": {"primaryColors": ["#112233"], "accentColors": [], "backgroundStyle": "paper"},
            "imagePrompt": "a timeline poster"
        }"##;

        let spec: Spec = serde_json::from_str(raw).unwrap();
        assert_eq!(spec.title, "History of AI");
        assert_eq!(spec.sections.len(), 2);
        assert_eq!(spec.sections[0].icon_idea.as_deref(), Some("gears"));
        assert_eq!(spec.sections[1].body, "");
        assert_eq!(spec.palette.unwrap().primary_colors, vec!["#112233"]);
        assert_eq!(spec.image_prompt, "a timeline poster");
    }

    #[test]
    fn test_manual_sections_never_reuse_ids() {
        let mut input = ManualInput::default();
        let a = input.add_section();
        let b = input.add_section();
        assert!(input.remove_section(b));
        let c = input.add_section();

        assert_eq!(a, SectionId(1));
        assert_eq!(c, SectionId(3));
        assert!(!input.remove_section(SectionId(99)));
    }

    #[test]
    fn test_manual_section_update_merges_fields() {
        let mut input = ManualInput::default();
        let id = input.add_section();
        input.update_section(
            id,
            SectionUpdate {
                title: Some("Intro".to_string()),
                content: None,
            },
        );
        input.update_section(
            id,
            SectionUpdate {
                title: None,
                content: Some("Hello".to_string()),
            },
        );

        assert_eq!(input.sections[0].title, "Intro");
        assert_eq!(input.sections[0].content, "Hello");
        assert!(!input.update_section(SectionId(42), SectionUpdate::default()));
    }

    #[test]
    fn test_manual_has_content_requires_title_and_body() {
        let mut input = ManualInput::default();
        assert!(!input.has_content());
        input.title = "Title".to_string();
        assert!(!input.has_content());
        input.body = "Body".to_string();
        assert!(input.has_content());
    }
}
