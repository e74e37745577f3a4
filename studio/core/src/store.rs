//! State Store
//!
//! The single source of truth for a studio session. [`StateStore`] is a
//! cheaply cloneable handle over one lock-protected [`WorkflowState`]; every
//! surface and the workflow orchestrator share the same handle.
//!
//! # Atomicity
//!
//! Each public operation takes the write lock exactly once, so readers never
//! observe a half-applied mutation. In particular `loading == true` and
//! `error != None` are never visible together.
//!
//! # Change Feed
//!
//! After every commit the store bumps a revision counter published on a
//! `tokio::sync::watch` channel. Surfaces call [`StateStore::subscribe`] and
//! re-render (via [`crate::router`]) whenever the revision moves.
//!
//! # Credential
//!
//! The credential is mirrored in the state for guard checks but persisted by
//! the [`CredentialStore`] owned by the handle. [`StateStore::reset`] leaves
//! it untouched.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::credentials::CredentialStore;
use crate::model::{
    InputMode, ManualInput, ResearchBundle, SectionId, SectionUpdate, Spec, Template, View,
};
use crate::registry::{Image, ImageRegistry, PageId, PageRegistry, PageUpdate};

/// Busy indicator shown while a remote call is in flight
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadingState {
    /// Whether a pipeline holds the loading flag
    pub active: bool,
    /// Progress text for the surface
    pub message: String,
}

/// Every workflow entity
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkflowState {
    /// API credential (empty when unset)
    pub credential: String,
    /// Active screen
    pub view: View,
    /// Chosen content source
    pub input_mode: Option<InputMode>,
    /// Last submitted research topic
    pub topic: String,
    /// Research result
    pub bundle: Option<ResearchBundle>,
    /// Hand-written content
    pub manual: ManualInput,
    /// Selected template
    pub template: Option<Template>,
    /// Generated spec
    pub spec: Option<Spec>,
    /// Generated images
    pub images: ImageRegistry,
    /// Image shown in the editor
    pub current_image_index: usize,
    /// Document pages
    pub pages: PageRegistry,
    /// Branding logo location
    pub logo_url: Option<String>,
    /// Busy indicator
    pub loading: LoadingState,
    /// Dismissible error message
    pub error: Option<String>,
}

impl WorkflowState {
    /// Initial state carrying an existing credential
    #[must_use]
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            ..Default::default()
        }
    }

    /// Whether a credential is available for remote calls
    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }

    /// Loading and error are never both set
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !(self.loading.active && self.error.is_some())
    }
}

struct Shared {
    state: RwLock<WorkflowState>,
    credentials: Mutex<CredentialStore>,
    changes: watch::Sender<u64>,
}

/// Shared handle to the workflow state
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Shared>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(CredentialStore::in_memory(""))
    }
}

impl StateStore {
    /// Create a store seeded with the persisted credential
    #[must_use]
    pub fn new(credentials: CredentialStore) -> Self {
        let state = WorkflowState::with_credential(credentials.get());
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Shared {
                state: RwLock::new(state),
                credentials: Mutex::new(credentials),
                changes,
            }),
        }
    }

    /// Apply one atomic mutation and notify subscribers
    fn commit<R>(&self, op: &'static str, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        let result = {
            let mut state = self.inner.state.write();
            let result = f(&mut state);
            debug_assert!(state.is_consistent(), "{op} left loading and error both set");
            result
        };
        self.inner.changes.send_modify(|rev| *rev += 1);
        tracing::trace!(op, revision = self.revision(), "state committed");
        result
    }

    /// Run a closure against the current state
    pub fn read<R>(&self, f: impl FnOnce(&WorkflowState) -> R) -> R {
        f(&*self.inner.state.read())
    }

    /// Consistent copy of the whole state
    #[must_use]
    pub fn snapshot(&self) -> WorkflowState {
        self.inner.state.read().clone()
    }

    /// Change feed; the value is the revision counter
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Number of commits so far
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.inner.changes.borrow()
    }

    // ------------------------------------------------------------------
    // Credential
    // ------------------------------------------------------------------

    /// Current credential (empty when unset)
    #[must_use]
    pub fn credential(&self) -> String {
        self.read(|s| s.credential.clone())
    }

    /// Whether a credential is available
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.read(WorkflowState::has_credential)
    }

    /// Store and persist the credential
    ///
    /// Never fails: a persistence error is logged and the in-memory value
    /// still changes.
    pub fn set_credential(&self, value: impl Into<String>) {
        let value = value.into();
        // Held through the commit so the file and the state change in the same order
        let mut credentials = self.inner.credentials.lock();
        if let Err(e) = credentials.set(value.clone()) {
            tracing::warn!(error = %e, "failed to persist credential");
        }
        self.commit("set_credential", |s| s.credential = value);
    }

    /// Retry a credential write that failed earlier
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the write still fails.
    pub fn flush_credential(&self) -> Result<(), crate::credentials::CredentialError> {
        self.inner.credentials.lock().flush()
    }

    // ------------------------------------------------------------------
    // Navigation and input
    // ------------------------------------------------------------------

    /// Active screen
    #[must_use]
    pub fn view(&self) -> View {
        self.read(|s| s.view)
    }

    /// Navigate to a screen
    pub fn set_view(&self, view: View) {
        self.commit("set_view", |s| s.view = view);
    }

    /// Choose a content source and navigate to its screen
    pub fn set_input_mode(&self, mode: InputMode) {
        self.commit("set_input_mode", |s| {
            s.input_mode = Some(mode);
            s.view = mode.view();
        });
    }

    /// Record the research topic
    pub fn set_topic(&self, topic: impl Into<String>) {
        let topic = topic.into();
        self.commit("set_topic", |s| s.topic = topic);
    }

    /// Replace the research bundle
    pub fn set_bundle(&self, bundle: Option<ResearchBundle>) {
        self.commit("set_bundle", |s| s.bundle = bundle);
    }

    /// Select (or deselect) a template
    pub fn select_template(&self, template: Option<Template>) {
        self.commit("select_template", |s| s.template = template);
    }

    /// Replace the spec
    pub fn set_spec(&self, spec: Option<Spec>) {
        self.commit("set_spec", |s| s.spec = spec);
    }

    /// Set the branding logo
    pub fn set_logo_url(&self, url: Option<String>) {
        self.commit("set_logo_url", |s| s.logo_url = url);
    }

    /// Set the manual title
    pub fn set_manual_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.commit("set_manual_title", |s| s.manual.title = title);
    }

    /// Set the manual body
    pub fn set_manual_body(&self, body: impl Into<String>) {
        let body = body.into();
        self.commit("set_manual_body", |s| s.manual.body = body);
    }

    /// Append an empty manual section
    pub fn add_section(&self) -> SectionId {
        self.commit("add_section", |s| s.manual.add_section())
    }

    /// Remove a manual section
    pub fn remove_section(&self, id: SectionId) -> bool {
        self.commit("remove_section", |s| s.manual.remove_section(id))
    }

    /// Merge fields into a manual section
    pub fn update_section(&self, id: SectionId, update: SectionUpdate) -> bool {
        self.commit("update_section", |s| s.manual.update_section(id, update))
    }

    // ------------------------------------------------------------------
    // Loading and errors
    // ------------------------------------------------------------------

    /// Current busy indicator
    #[must_use]
    pub fn loading(&self) -> LoadingState {
        self.read(|s| s.loading.clone())
    }

    /// Current error
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    /// Set the busy indicator; always clears the error
    pub fn set_loading(&self, active: bool, message: impl Into<String>) {
        let message = message.into();
        self.commit("set_loading", |s| {
            s.loading = LoadingState { active, message };
            s.error = None;
        });
    }

    /// Show an error; always drops the busy indicator
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.commit("set_error", |s| {
            s.error = Some(message);
            s.loading.active = false;
        });
    }

    /// Dismiss the error
    pub fn clear_error(&self) {
        self.commit("clear_error", |s| s.error = None);
    }

    /// Take the loading flag unless someone already holds it
    ///
    /// Check and set happen under one lock, so two racing pipelines can never
    /// both start. Returns `false` (without any change) when busy.
    pub fn try_begin_loading(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        let started = {
            let mut state = self.inner.state.write();
            if state.loading.active {
                false
            } else {
                state.loading = LoadingState {
                    active: true,
                    message,
                };
                state.error = None;
                true
            }
        };
        if started {
            self.inner.changes.send_modify(|rev| *rev += 1);
        }
        started
    }

    /// Release the loading flag, keeping any error committed meanwhile
    pub fn end_loading(&self) {
        self.commit("end_loading", |s| s.loading = LoadingState::default());
    }

    /// Show an error and navigate in the same commit
    pub fn fail_and_navigate(&self, message: impl Into<String>, view: View) {
        let message = message.into();
        self.commit("fail_and_navigate", |s| {
            s.error = Some(message);
            s.loading.active = false;
            s.view = view;
        });
    }

    /// Store a validation error unless a pipeline holds the loading flag
    ///
    /// Check and write happen under one lock, so a rejection can never drop
    /// another pipeline's loading flag. Returns `false` (without any change)
    /// when busy.
    pub fn reject_if_idle(&self, message: impl Into<String>, redirect: Option<View>) -> bool {
        let message = message.into();
        let rejected = {
            let mut state = self.inner.state.write();
            if state.loading.active {
                false
            } else {
                state.error = Some(message);
                if let Some(view) = redirect {
                    state.view = view;
                }
                true
            }
        };
        if rejected {
            self.inner.changes.send_modify(|rev| *rev += 1);
        }
        rejected
    }

    /// Store a research result and clear any error
    pub fn commit_bundle(&self, bundle: ResearchBundle) {
        self.commit("commit_bundle", |s| {
            s.bundle = Some(bundle);
            s.error = None;
        });
    }

    /// Store a generated spec and open the editor
    pub fn commit_spec(&self, spec: Spec) {
        self.commit("commit_spec", |s| {
            s.spec = Some(spec);
            s.view = View::Editor;
        });
    }

    // ------------------------------------------------------------------
    // Pages and images
    // ------------------------------------------------------------------

    /// Append a blank page and make it current
    pub fn add_page(&self) -> PageId {
        self.commit("add_page", |s| s.pages.add())
    }

    /// Remove a page, moving the cursor if needed
    pub fn remove_page(&self, id: PageId) -> bool {
        self.commit("remove_page", |s| s.pages.remove(id))
    }

    /// Merge fields into a page; unknown ids are a no-op
    pub fn update_page(&self, id: PageId, update: PageUpdate) -> bool {
        self.commit("update_page", |s| s.pages.update(id, update))
    }

    /// Move the page cursor
    pub fn set_current_page(&self, id: PageId) {
        self.commit("set_current_page", |s| s.pages.set_current(id));
    }

    /// Append an image
    pub fn add_image(&self, image: Image) {
        self.commit("add_image", |s| s.images.add(image));
    }

    /// Register a generated image under a fresh id
    pub fn register_image(
        &self,
        path: impl Into<String>,
        filename: impl Into<String>,
        page: PageId,
    ) -> Image {
        let (path, filename) = (path.into(), filename.into());
        self.commit("register_image", |s| s.images.register(path, filename, page))
    }

    /// Select the image shown in the editor
    pub fn set_current_image_index(&self, index: usize) {
        self.commit("set_current_image_index", |s| s.current_image_index = index);
    }

    // ------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------

    /// Restore every field except the credential
    pub fn reset(&self) {
        self.commit("reset", |s| {
            let credential = std::mem::take(&mut s.credential);
            *s = WorkflowState::with_credential(credential);
        });
        tracing::debug!("workflow reset");
    }
}
