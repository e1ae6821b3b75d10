use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiError, EditorApi};
use crate::editing::autosave::Autosave;
use crate::editing::document::{Document, EditMode};
use crate::editing::field::{Field, FieldError, FieldType, MoveDirection};
use crate::editing::registry::PartialRegistry;
use crate::editing::surface::Surface;
use crate::models::DocumentPayload;
use crate::utility::{Config, ListenerId, Listeners};

pub const DEFAULT_BASE: &str = "/_grow/editor";
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u64 = 8080;

/// Options every editor starts from before caller overrides are applied.
pub fn default_options() -> Map<String, Value> {
    let mut options = Map::new();
    options.insert("base".to_string(), json!(DEFAULT_BASE));
    options.insert("autosave".to_string(), json!(false));
    options.insert(
        "autosave_interval".to_string(),
        json!(DEFAULT_AUTOSAVE_INTERVAL_MS),
    );
    options.insert("host".to_string(), json!(DEFAULT_HOST));
    options.insert("port".to_string(), json!(DEFAULT_PORT));
    options
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("Failed to load {pod_path}: {source}")]
    FetchFailed {
        pod_path: String,
        #[source]
        source: Arc<ApiError>,
    },
    #[error("Failed to save {pod_path}: {source}")]
    SaveFailed {
        pod_path: String,
        #[source]
        source: Arc<ApiError>,
    },
    #[error("Failed to load partials: {0}")]
    PartialsFailed(#[source] Arc<ApiError>),
    #[error("No document loaded")]
    NoDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Loading,
    ShowingFields,
    ShowingSource,
    Saving,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Loaded { pod_path: String },
    Saved { pod_path: String },
    ModeChanged(EditMode),
    AutosaveChanged(bool),
    Failed(String),
}

impl EditorEvent {
    /// Name listeners subscribe under.
    pub fn name(&self) -> &'static str {
        match self {
            EditorEvent::Loaded { .. } => "load",
            EditorEvent::Saved { .. } => "save",
            EditorEvent::ModeChanged(_) => "mode",
            EditorEvent::AutosaveChanged(_) => "autosave",
            EditorEvent::Failed(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Load,
    Save { force: bool },
}

/// Keeps one document in sync between its fields and the server.
///
/// All server round trips take `&mut self`, so a save can never overlap a
/// load or another save.
pub struct Editor<S: Surface> {
    config: Config,
    api: Arc<dyn EditorApi>,
    partials: PartialRegistry,
    surface: S,
    listeners: Listeners<EditorEvent>,
    document: Option<Document>,
    pod_path: String,
    mode: EditMode,
    state: EditorState,
    autosave: Autosave,
    location: Option<String>,
    preview_url: Option<String>,
    last_failure: Option<Operation>,
}

impl<S: Surface> Editor<S> {
    pub fn new(api: Arc<dyn EditorApi>, surface: S, options: Map<String, Value>) -> Self {
        let config = Config::with_defaults(default_options(), options);
        let interval = config.get_u64("autosave_interval", DEFAULT_AUTOSAVE_INTERVAL_MS);
        let mut autosave = Autosave::new(Duration::from_millis(interval));
        if config.get_bool("autosave", false) {
            autosave.start();
        }

        Self {
            partials: PartialRegistry::new(Arc::clone(&api)),
            config,
            api,
            surface,
            listeners: Listeners::new(),
            document: None,
            pod_path: String::new(),
            mode: EditMode::Fields,
            state: EditorState::Loading,
            autosave,
            location: None,
            preview_url: None,
            last_failure: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn pod_path(&self) -> &str {
        &self.pod_path
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn is_editing_source(&self) -> bool {
        self.mode == EditMode::Source
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Whether the last load or save failed and can be retried.
    pub fn has_failure(&self) -> bool {
        self.last_failure.is_some()
    }

    pub fn on(&mut self, name: &str, callback: impl FnMut(&EditorEvent) + 'static) -> ListenerId {
        self.listeners.on(name, callback)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.listeners.off(id)
    }

    fn emit(&mut self, event: EditorEvent) {
        self.listeners.trigger(event.name(), &event);
    }

    fn showing_state(&self) -> EditorState {
        match self.mode {
            EditMode::Fields => EditorState::ShowingFields,
            EditMode::Source => EditorState::ShowingSource,
        }
    }

    /// Fetch `pod_path` and rebuild every field for the current mode.
    pub async fn load(&mut self, pod_path: &str) -> Result<(), EditorError> {
        self.pod_path = pod_path.to_string();
        self.state = EditorState::Loading;
        self.surface.clear_error();
        log::info!("Loading {pod_path}");

        let payload = match self.api.get_document(pod_path).await {
            Ok(payload) => payload,
            Err(source) => {
                let error = EditorError::FetchFailed {
                    pod_path: pod_path.to_string(),
                    source: Arc::new(source),
                };
                return Err(self.fail(Operation::Load, error));
            }
        };

        let catalog = if needs_partials(&payload) {
            match self.partials.partials().await {
                Ok(catalog) => Some(catalog),
                Err(source) => {
                    // Fields still load; the partials list waits for a later load.
                    self.report(&EditorError::PartialsFailed(source));
                    None
                }
            }
        } else {
            self.partials.peek()
        };

        let document = match Document::from_payload(&payload, catalog.as_ref()) {
            Ok(document) => document,
            Err(err) => return Err(self.fail(Operation::Load, err.into())),
        };

        self.show(document);
        self.last_failure = None;
        self.emit(EditorEvent::Loaded {
            pod_path: payload.pod_path,
        });
        Ok(())
    }

    /// Load the current pod path again.
    pub async fn reload(&mut self) -> Result<(), EditorError> {
        let pod_path = self.pod_path.clone();
        self.load(&pod_path).await
    }

    fn show(&mut self, mut document: Document) {
        self.update_location(document.pod_path());

        self.surface.clear_fields();
        for (index, field) in document.fields_for_mut(self.mode).iter_mut().enumerate() {
            self.surface.attach_field(index, field);
            field.setup();
        }
        log::debug!(
            "Showing {} field(s) of {}",
            document.fields_for(self.mode).len(),
            document.pod_path()
        );

        self.document = Some(document);
        self.refresh_preview();
        self.state = self.showing_state();
    }

    fn update_location(&mut self, pod_path: &str) {
        let location = format!("{}{}", self.config.get_str("base", DEFAULT_BASE), pod_path);
        if self.location.as_deref() != Some(location.as_str()) {
            self.surface.push_history(&location);
            self.location = Some(location);
        }
    }

    fn refresh_preview(&mut self) {
        let Some(serving_path) = self.document.as_ref().and_then(Document::serving_path) else {
            log::debug!("Nothing to preview for {}", self.pod_path);
            return;
        };
        let url = format!(
            "http://{}:{}{}",
            self.config.get_str("host", DEFAULT_HOST),
            self.config.get_u64("port", DEFAULT_PORT),
            serving_path
        );

        if self.preview_url.as_deref() == Some(url.as_str()) {
            self.surface.reload_preview();
        } else {
            self.surface.navigate_preview(&url);
            self.preview_url = Some(url);
        }
    }

    /// Submit the current mode's projection. Without `force`, a clean
    /// document is left alone. Returns whether anything was submitted.
    pub async fn save(&mut self, force: bool) -> Result<bool, EditorError> {
        let Some(document) = &self.document else {
            return if force {
                Err(EditorError::NoDocument)
            } else {
                Ok(false)
            };
        };
        if !force && document.is_clean(self.mode) {
            log::trace!("Nothing to save");
            return Ok(false);
        }

        let pod_path = document.pod_path().to_string();
        let locale = document.locale().map(str::to_string);
        let body = match self.mode {
            EditMode::Fields => Submission::Fields(document.front_matter_value()),
            EditMode::Source => Submission::Source(document.source_value()),
        };

        log::info!("Saving {pod_path}");
        self.state = EditorState::Saving;
        self.surface.set_saving(true);
        let response = match &body {
            Submission::Fields(front_matter) => {
                self.api
                    .save_document_fields(&pod_path, front_matter, locale.as_deref())
                    .await
            }
            Submission::Source(raw) => self.api.save_document_source(&pod_path, raw).await,
        };
        self.surface.set_saving(false);

        let payload = match response {
            Ok(payload) => payload,
            Err(source) => {
                let error = EditorError::SaveFailed {
                    pod_path,
                    source: Arc::new(source),
                };
                return Err(self.fail(Operation::Save { force }, error));
            }
        };

        if let Err(err) = self.apply_saved(&payload) {
            return Err(self.fail(Operation::Save { force }, err.into()));
        }
        self.state = self.showing_state();
        self.last_failure = None;
        self.surface.clear_error();
        self.emit(EditorEvent::Saved {
            pod_path: payload.pod_path,
        });
        Ok(true)
    }

    fn apply_saved(&mut self, payload: &DocumentPayload) -> Result<(), FieldError> {
        if let Some(document) = &mut self.document {
            document.update_from_payload(payload)?;
        }
        self.update_location(&payload.pod_path);
        self.refresh_preview();
        Ok(())
    }

    /// Record a failure so `retry` can repeat it, and surface it.
    fn fail(&mut self, operation: Operation, error: EditorError) -> EditorError {
        self.state = if self.document.is_some() {
            self.showing_state()
        } else {
            EditorState::Failed
        };
        self.last_failure = Some(operation);
        self.report(&error);
        error
    }

    fn report(&mut self, error: &EditorError) {
        log::error!("{error}");
        self.surface.show_error(error);
        self.emit(EditorEvent::Failed(error.to_string()));
    }

    /// Repeat the last failed load or save. Returns false when nothing
    /// failed.
    pub async fn retry(&mut self) -> Result<bool, EditorError> {
        match self.last_failure.take() {
            Some(Operation::Load) => {
                log::info!("Retrying load of {}", self.pod_path);
                self.reload().await?;
                Ok(true)
            }
            Some(Operation::Save { force }) => {
                log::info!("Retrying save of {}", self.pod_path);
                self.save(force).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switch between structured and raw editing. Both projections are
    /// fetched fresh, so unsaved edits in the old mode are dropped.
    ///
    /// If the fetch fails while a document is showing, the editor stays in
    /// the old mode so state and surface keep matching what is displayed.
    pub async fn set_editing_source(&mut self, source: bool) -> Result<(), EditorError> {
        let mode = if source {
            EditMode::Source
        } else {
            EditMode::Fields
        };
        if mode == self.mode {
            return Ok(());
        }

        let previous = self.mode;
        self.mode = mode;
        if let Err(err) = self.reload().await {
            if self.document.is_some() {
                log::warn!("Staying in {previous:?} mode");
                self.mode = previous;
                self.state = self.showing_state();
            }
            return Err(err);
        }
        self.emit(EditorEvent::ModeChanged(mode));
        Ok(())
    }

    pub async fn toggle_source(&mut self) -> Result<(), EditorError> {
        self.set_editing_source(!self.is_editing_source()).await
    }

    pub fn is_autosaving(&self) -> bool {
        self.autosave.is_running()
    }

    pub fn start_autosave(&mut self) {
        self.autosave.start();
        self.emit(EditorEvent::AutosaveChanged(true));
    }

    pub fn stop_autosave(&mut self) {
        self.autosave.stop();
        self.emit(EditorEvent::AutosaveChanged(false));
    }

    pub fn set_autosave(&mut self, enabled: bool) {
        if enabled {
            self.start_autosave();
        } else {
            self.stop_autosave();
        }
    }

    /// Resolves on the next autosave tick; pending forever while autosave
    /// is off.
    pub async fn wait_autosave(&mut self) {
        self.autosave.tick().await;
    }

    /// Wait for the next tick, then save if anything changed.
    pub async fn autosave_tick(&mut self) -> Result<bool, EditorError> {
        self.autosave.tick().await;
        self.save(false).await
    }

    pub fn field(&self, path: &[usize]) -> Option<&Field> {
        self.document.as_ref()?.field_at(self.mode, path)
    }

    fn field_mut(&mut self, path: &[usize]) -> Option<&mut Field> {
        let mode = self.mode;
        self.document.as_mut()?.field_at_mut(mode, path)
    }

    pub fn focus(&mut self, path: &[usize]) -> bool {
        self.field_mut(path).map(Field::focus).is_some()
    }

    pub fn blur(&mut self, path: &[usize]) -> bool {
        self.field_mut(path).map(Field::blur).is_some()
    }

    pub fn set_text(&mut self, path: &[usize], text: &str) -> bool {
        self.field_mut(path)
            .is_some_and(|field| field.set_text(text))
    }

    /// Move the partial at `path` one step within its list.
    pub fn move_partial(&mut self, path: &[usize], direction: MoveDirection) -> bool {
        let Some((&index, parent)) = path.split_last() else {
            return false;
        };
        let moved = self
            .field_mut(parent)
            .is_some_and(|list| list.field_type() == FieldType::Partials && list.move_item(index, direction));
        if moved {
            let to = match direction {
                MoveDirection::Up => index - 1,
                MoveDirection::Down => index + 1,
            };
            self.surface.move_child(parent, index, to);
        }
        moved
    }

    /// Remove the list item or partial at `path`.
    pub fn remove_item(&mut self, path: &[usize]) -> Option<Field> {
        let (&index, parent) = path.split_last()?;
        let removed = self.field_mut(parent)?.remove_item(index)?;
        self.surface.remove_child(parent, index);
        Some(removed)
    }

    /// Append a text item to the list at `path`.
    pub fn push_list_item(&mut self, path: &[usize], text: &str) -> Option<usize> {
        let list = self.field_mut(path)?;
        let index = list.push_item(text)?;
        let item = list.children().get(index)?.clone();
        self.surface.attach_child(path, index, &item);
        Some(index)
    }

    /// Append an empty instance of partial `key` to the partials list at
    /// `path`.
    pub fn add_partial(&mut self, path: &[usize], key: &str) -> Result<Option<usize>, EditorError> {
        let Some(list) = self.field_mut(path) else {
            return Ok(None);
        };
        let Some(index) = list.add_partial(key)? else {
            return Ok(None);
        };
        if let Some(item) = list.children().get(index).cloned() {
            self.surface.attach_child(path, index, &item);
        }
        Ok(Some(index))
    }
}

impl<S: Surface> std::fmt::Debug for Editor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("pod_path", &self.pod_path)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("autosave", &self.autosave.is_running())
            .finish_non_exhaustive()
    }
}

enum Submission {
    Fields(Value),
    Source(String),
}

fn needs_partials(payload: &DocumentPayload) -> bool {
    payload
        .field_meta()
        .iter()
        .any(|meta| meta.field_type == FieldType::Partials.as_str())
}
