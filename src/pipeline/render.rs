//! Boundary between the session and whatever draws it.

use crate::models::{Record, ViewMode};
use crate::pipeline::pagination::PageState;

/// One page of the filtered view, ready to draw.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub records: &'a [Record],
    pub mode: ViewMode,
    pub pagination: PageState,
}

/// Draws the session. Exactly one method is called per render pass.
pub trait Renderer {
    fn loading(&mut self);

    /// Unrecoverable load failure. No content or pagination is shown.
    fn error(&mut self, message: &str);

    fn page(&mut self, view: PageView<'_>);
}
