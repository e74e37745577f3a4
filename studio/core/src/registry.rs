//! Pages and Images Registry
//!
//! The document side of the workflow: an ordered list of pages and an
//! append-only list of generated images.
//!
//! # Identifiers
//!
//! Page ids are assigned as `max(previous ids, 0) + 1`. The registry keeps a
//! high-water mark, so removing the newest page never hands its id out again.
//! Image ids come from a separate monotonic counter owned by the image list,
//! which keeps rapid successive generations collision-free.

use serde::{Deserialize, Serialize};

/// Page identifier (always ≥ 1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl PageId {
    /// The id of the page every fresh document starts with
    pub const FIRST: PageId = PageId(1);
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generated image identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "img_{}", self.0)
    }
}

/// A document page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier
    pub id: PageId,
    /// Page title
    pub title: String,
    /// Page body
    pub content: String,
    /// Image shown on this page
    pub image_id: Option<ImageId>,
}

impl Page {
    /// Empty page titled after its id
    #[must_use]
    pub fn blank(id: PageId) -> Self {
        Self {
            id,
            title: format!("Page {id}"),
            content: String::new(),
            image_id: None,
        }
    }
}

/// Partial page update; `None` fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageUpdate {
    /// New title
    pub title: Option<String>,
    /// New body
    pub content: Option<String>,
    /// New image reference (`Some(None)` detaches the image)
    pub image_id: Option<Option<ImageId>>,
}

impl PageUpdate {
    /// Update only the title
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Update only the content
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Attach an image
    #[must_use]
    pub fn image(image_id: ImageId) -> Self {
        Self {
            image_id: Some(Some(image_id)),
            ..Default::default()
        }
    }
}

/// Ordered pages plus the current-page cursor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRegistry {
    pages: Vec<Page>,
    current: PageId,
    high_water: u32,
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self {
            pages: vec![Page::blank(PageId::FIRST)],
            current: PageId::FIRST,
            high_water: PageId::FIRST.0,
        }
    }
}

impl PageRegistry {
    /// Pages in display order
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether every page was removed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Id of the page being edited
    #[must_use]
    pub fn current_id(&self) -> PageId {
        self.current
    }

    /// The page being edited, if it exists
    #[must_use]
    pub fn current(&self) -> Option<&Page> {
        self.get(self.current)
    }

    /// Look up a page
    #[must_use]
    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Id the next `add` will use
    #[must_use]
    pub fn next_id(&self) -> PageId {
        let max_present = self.pages.iter().map(|p| p.id.0).max().unwrap_or(0);
        PageId(max_present.max(self.high_water) + 1)
    }

    /// Append a blank page and make it current
    pub fn add(&mut self) -> PageId {
        let id = self.next_id();
        self.high_water = id.0;
        self.pages.push(Page::blank(id));
        self.current = id;
        id
    }

    /// Remove a page
    ///
    /// The cursor stays put while its page survives. Otherwise it moves to
    /// the first remaining page, or to [`PageId::FIRST`] when none remain.
    pub fn remove(&mut self, id: PageId) -> bool {
        let before = self.pages.len();
        self.pages.retain(|p| p.id != id);
        let removed = self.pages.len() != before;

        if self.get(self.current).is_none() {
            self.current = self.pages.first().map_or(PageId::FIRST, |p| p.id);
        }
        removed
    }

    /// Merge fields into one page; unknown ids are a no-op
    pub fn update(&mut self, id: PageId, update: PageUpdate) -> bool {
        let Some(page) = self.pages.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        if let Some(title) = update.title {
            page.title = title;
        }
        if let Some(content) = update.content {
            page.content = content;
        }
        if let Some(image_id) = update.image_id {
            page.image_id = image_id;
        }
        true
    }

    /// Move the cursor; no existence check, matching the view's own selection
    pub fn set_current(&mut self, id: PageId) {
        self.current = id;
    }
}

/// A generated image artifact
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image identifier
    pub id: ImageId,
    /// Storage path on the service side
    pub path: String,
    /// File name for download
    pub filename: String,
    /// Page this image belongs to
    pub page: PageId,
}

/// Append-only image list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageRegistry {
    images: Vec<Image>,
    last_id: u64,
}

impl ImageRegistry {
    /// Images in generation order
    #[must_use]
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// Number of images
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether nothing was generated yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Look up an image
    #[must_use]
    pub fn get(&self, id: ImageId) -> Option<&Image> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Most recent image
    #[must_use]
    pub fn latest(&self) -> Option<&Image> {
        self.images.last()
    }

    /// Register a new image under a fresh id
    pub fn register(
        &mut self,
        path: impl Into<String>,
        filename: impl Into<String>,
        page: PageId,
    ) -> Image {
        self.last_id += 1;
        let image = Image {
            id: ImageId(self.last_id),
            path: path.into(),
            filename: filename.into(),
            page,
        };
        self.add(image.clone());
        image
    }

    /// Append an image built elsewhere
    ///
    /// The id counter is bumped past the appended id so later registrations
    /// stay unique.
    pub fn add(&mut self, image: Image) {
        self.last_id = self.last_id.max(image.id.0);
        self.images.push(image);
    }
}
