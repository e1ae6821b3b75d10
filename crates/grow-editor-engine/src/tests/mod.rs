//! Shared fakes for unit tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::{ApiError, EditorApi};
use crate::editing::{EditorError, Field, Surface};
use crate::models::{DocumentPayload, PartialsPayload};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetDocument(String),
    GetPartials,
    SaveFields {
        pod_path: String,
        front_matter: Value,
        locale: Option<String>,
    },
    SaveSource {
        pod_path: String,
        raw_front_matter: String,
    },
}

/// In-memory server. Saves merge into the stored document and echo it back.
#[derive(Debug)]
pub struct ScriptedApi {
    document: Mutex<DocumentPayload>,
    partials: PartialsPayload,
    calls: Mutex<Vec<ApiCall>>,
    fail_documents: AtomicUsize,
    fail_partials: AtomicUsize,
    stall_partials: AtomicUsize,
    fail_saves: AtomicUsize,
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl ScriptedApi {
    pub fn new(document: DocumentPayload, partials: PartialsPayload) -> Self {
        Self {
            document: Mutex::new(document),
            partials,
            calls: Mutex::new(Vec::new()),
            fail_documents: AtomicUsize::new(0),
            fail_partials: AtomicUsize::new(0),
            stall_partials: AtomicUsize::new(0),
            fail_saves: AtomicUsize::new(0),
        }
    }

    /// A page with a serving path and a description.
    pub fn basic_page() -> Self {
        let document = serde_json::from_value(json!({
            "pod_path": "/content/pages/home.yaml",
            "editor": {"fields": [
                {"type": "text", "key": "$path", "label": "Serving Path"},
                {"type": "textarea", "key": "meta.description", "label": "Description"},
            ]},
            "front_matter": {"$path": "/", "meta": {"description": "x"}},
            "raw_front_matter": "$path: /\nmeta:\n  description: x\n",
            "serving_paths": {"en": "/"},
            "default_locale": "en",
        }))
        .unwrap();
        Self::new(document, Self::catalog())
    }

    /// The basic page plus a partials list holding a hero and a quote.
    pub fn home_page() -> Self {
        let api = Self::basic_page();
        api.update_document(|document| {
            document.editor.get_or_insert_default().fields.push(
                serde_json::from_value(
                    json!({"type": "partials", "key": "partials", "label": "Partials"}),
                )
                .unwrap(),
            );
            document.front_matter["partials"] = json!([
                {"partial": "hero", "title": "Hi"},
                {"partial": "quote", "quote": "Q"},
            ]);
        });
        api
    }

    fn catalog() -> PartialsPayload {
        serde_json::from_value(json!({"partials": {
            "hero": {"label": "Hero", "editor": {"fields": [
                {"type": "text", "key": "title", "label": "Title"},
            ]}},
            "quote": {"label": "Quote", "editor": {"fields": [
                {"type": "textarea", "key": "quote", "label": "Quote"},
            ]}},
        }}))
        .unwrap()
    }

    pub fn update_document(&self, update: impl FnOnce(&mut DocumentPayload)) {
        update(&mut self.document.lock().unwrap());
    }

    /// Serve the document at `path` in its default locale from now on.
    pub fn serve_at(&self, path: &str) {
        self.update_document(|document| {
            let locale = document.default_locale.clone();
            document.serving_paths.insert(locale, path.to_string());
        });
    }

    pub fn fail_next_documents(&self, count: usize) {
        self.fail_documents.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_partials(&self, count: usize) {
        self.fail_partials.store(count, Ordering::SeqCst);
    }

    /// The next `count` catalog requests never answer.
    pub fn stall_next_partials(&self, count: usize) {
        self.stall_partials.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_saves(&self, count: usize) {
        self.fail_saves.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<ApiCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    pub fn count(&self, matches: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| matches(call)).count()
    }

    pub fn saves(&self) -> usize {
        self.count(|call| {
            matches!(
                call,
                ApiCall::SaveFields { .. } | ApiCall::SaveSource { .. }
            )
        })
    }

    pub fn last_saved_front_matter(&self) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                ApiCall::SaveFields { front_matter, .. } => Some(front_matter.clone()),
                _ => None,
            })
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn snapshot(&self) -> DocumentPayload {
        self.document.lock().unwrap().clone()
    }
}

#[async_trait]
impl EditorApi for ScriptedApi {
    async fn get_document(&self, pod_path: &str) -> Result<DocumentPayload, ApiError> {
        self.record(ApiCall::GetDocument(pod_path.to_string()));
        tokio::task::yield_now().await;
        if take_failure(&self.fail_documents) {
            return Err(ApiError::Other("document unavailable".to_string()));
        }
        Ok(self.snapshot())
    }

    async fn get_partials(&self) -> Result<PartialsPayload, ApiError> {
        self.record(ApiCall::GetPartials);
        tokio::task::yield_now().await;
        if take_failure(&self.stall_partials) {
            std::future::pending::<()>().await;
        }
        if take_failure(&self.fail_partials) {
            return Err(ApiError::Other("partials unavailable".to_string()));
        }
        Ok(self.partials.clone())
    }

    async fn save_document_fields(
        &self,
        pod_path: &str,
        front_matter: &Value,
        locale: Option<&str>,
    ) -> Result<DocumentPayload, ApiError> {
        self.record(ApiCall::SaveFields {
            pod_path: pod_path.to_string(),
            front_matter: front_matter.clone(),
            locale: locale.map(str::to_string),
        });
        tokio::task::yield_now().await;
        if take_failure(&self.fail_saves) {
            return Err(ApiError::Other("save rejected".to_string()));
        }
        self.update_document(|document| {
            if let (Value::Object(stored), Value::Object(submitted)) =
                (&mut document.front_matter, front_matter)
            {
                stored.extend(submitted.clone());
            }
            document.raw_front_matter = serde_json::to_string_pretty(&document.front_matter).ok();
        });
        Ok(self.snapshot())
    }

    async fn save_document_source(
        &self,
        pod_path: &str,
        raw_front_matter: &str,
    ) -> Result<DocumentPayload, ApiError> {
        self.record(ApiCall::SaveSource {
            pod_path: pod_path.to_string(),
            raw_front_matter: raw_front_matter.to_string(),
        });
        tokio::task::yield_now().await;
        if take_failure(&self.fail_saves) {
            return Err(ApiError::Other("save rejected".to_string()));
        }
        self.update_document(|document| {
            document.raw_front_matter = Some(raw_front_matter.to_string());
            if let Ok(parsed) = serde_json::from_str(raw_front_matter) {
                document.front_matter = parsed;
            }
        });
        Ok(self.snapshot())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    ClearFields,
    AttachField(usize, String),
    NavigatePreview(String),
    ReloadPreview,
    PushHistory(String),
    Saving(bool),
    Error(String),
    ClearError,
    MoveChild(Vec<usize>, usize, usize),
    RemoveChild(Vec<usize>, usize),
    AttachChild(Vec<usize>, usize),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn count(&self, matches: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }
}

impl Surface for RecordingSurface {
    fn clear_fields(&mut self) {
        self.calls.push(SurfaceCall::ClearFields);
    }

    fn attach_field(&mut self, index: usize, field: &Field) {
        self.calls
            .push(SurfaceCall::AttachField(index, field.key().to_string()));
    }

    fn navigate_preview(&mut self, url: &str) {
        self.calls.push(SurfaceCall::NavigatePreview(url.to_string()));
    }

    fn reload_preview(&mut self) {
        self.calls.push(SurfaceCall::ReloadPreview);
    }

    fn push_history(&mut self, path: &str) {
        self.calls.push(SurfaceCall::PushHistory(path.to_string()));
    }

    fn set_saving(&mut self, saving: bool) {
        self.calls.push(SurfaceCall::Saving(saving));
    }

    fn show_error(&mut self, error: &EditorError) {
        self.calls.push(SurfaceCall::Error(error.to_string()));
    }

    fn clear_error(&mut self) {
        self.calls.push(SurfaceCall::ClearError);
    }

    fn move_child(&mut self, parent: &[usize], from: usize, to: usize) {
        self.calls
            .push(SurfaceCall::MoveChild(parent.to_vec(), from, to));
    }

    fn remove_child(&mut self, parent: &[usize], index: usize) {
        self.calls
            .push(SurfaceCall::RemoveChild(parent.to_vec(), index));
    }

    fn attach_child(&mut self, parent: &[usize], index: usize, _field: &Field) {
        self.calls
            .push(SurfaceCall::AttachChild(parent.to_vec(), index));
    }
}
