use grow_editor_engine::{EditorError, Field, Surface};

/// Terminal state the editor writes into. Fields themselves are drawn
/// straight from the document every frame.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    pub fields: Vec<String>,
    pub preview_url: Option<String>,
    pub preview_reloads: usize,
    pub location: Option<String>,
    pub saving: bool,
    pub error: Option<String>,
}

impl Surface for TerminalSurface {
    fn clear_fields(&mut self) {
        self.fields.clear();
    }

    fn attach_field(&mut self, _index: usize, field: &Field) {
        self.fields
            .push(field.label().unwrap_or(field.key()).to_string());
    }

    fn navigate_preview(&mut self, url: &str) {
        log::info!("Preview at {url}");
        self.preview_url = Some(url.to_string());
        self.preview_reloads = 0;
    }

    fn reload_preview(&mut self) {
        self.preview_reloads += 1;
    }

    fn push_history(&mut self, path: &str) {
        self.location = Some(path.to_string());
    }

    fn set_saving(&mut self, saving: bool) {
        self.saving = saving;
    }

    fn show_error(&mut self, error: &EditorError) {
        self.error = Some(error.to_string());
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}
