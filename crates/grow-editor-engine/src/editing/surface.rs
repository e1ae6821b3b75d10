use crate::editing::editor::EditorError;
use crate::editing::field::Field;

/// Where the editor renders: a field area, a preview pane and the
/// location/history bar.
///
/// Paths passed to the child hooks are field paths of the container whose
/// children changed. Surfaces that redraw from the field tree on every frame
/// can leave those hooks at their defaults.
pub trait Surface {
    /// Drop every rendered field.
    fn clear_fields(&mut self);

    /// Render a top-level field at `index`.
    fn attach_field(&mut self, index: usize, field: &Field);

    /// Point the preview at a new URL.
    fn navigate_preview(&mut self, url: &str);

    /// Reload the preview in place.
    fn reload_preview(&mut self);

    fn push_history(&mut self, path: &str);

    fn set_saving(&mut self, _saving: bool) {}

    fn show_error(&mut self, _error: &EditorError) {}

    fn clear_error(&mut self) {}

    fn move_child(&mut self, _parent: &[usize], _from: usize, _to: usize) {}

    fn remove_child(&mut self, _parent: &[usize], _index: usize) {}

    fn attach_child(&mut self, _parent: &[usize], _index: usize, _field: &Field) {}
}
