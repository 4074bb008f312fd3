use serde::Serialize;

/// A named location in an HTML template where generated content is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertionPoint {
    /// Logical identifier, used in logs and merge reports.
    pub id: &'static str,
    /// CSS selector locating the container whose children are replaced.
    pub selector: &'static str,
    /// Optional "no items" placeholder hidden once content is present.
    pub empty_state: Option<&'static str>,
}

impl InsertionPoint {
    pub const fn new(id: &'static str, selector: &'static str) -> Self {
        Self {
            id,
            selector,
            empty_state: None,
        }
    }

    pub const fn with_empty_state(mut self, selector: &'static str) -> Self {
        self.empty_state = Some(selector);
        self
    }
}

/// HTML generated for one insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub target: InsertionPoint,
    pub html: String,
}

impl RenderedFragment {
    pub fn new(target: InsertionPoint, html: impl Into<String>) -> Self {
        Self {
            target,
            html: html.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}
