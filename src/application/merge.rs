//! Injects rendered fragments into existing HTML templates.
//!
//! The merger streams the document through `lol_html`, so only the matched
//! targets (their children) and matched empty-state elements (their `style`)
//! change. Everything else is passed through byte for byte.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use lol_html::{RewriteStrSettings, Selector, element, html_content::ContentType, rewrite_str};
use thiserror::Error;
use tracing::{debug, info};

use super::render::RenderedFragment;
use super::repos::{DocumentStore, StoreError};

const HIDDEN_STYLE: &str = "display:none";

/// A fragment that could not be placed. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeSkip {
    #[error("no element matches `{selector}` for `{target}`")]
    TargetMissing {
        target: &'static str,
        selector: &'static str,
    },
    #[error("selector `{selector}` for `{target}` is not supported")]
    InvalidSelector {
        target: &'static str,
        selector: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to rewrite document: {message}")]
    Rewrite { message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub html: String,
    /// Identifiers of the insertion points that were filled.
    pub applied: Vec<&'static str>,
    pub skipped: Vec<MergeSkip>,
}

impl MergeOutcome {
    pub fn changed(&self, original: &str) -> bool {
        self.html != original
    }
}

/// Replace the children of every insertion-point target with its fragment.
///
/// Non-empty fragments also hide their empty-state elements. The result is
/// deterministic: merging the same fragments twice yields the same bytes.
pub fn merge(markup: &str, fragments: &[RenderedFragment]) -> Result<MergeOutcome, MergeError> {
    let hits = Rc::new(RefCell::new(vec![0usize; fragments.len()]));
    let mut skipped = Vec::new();
    let mut handlers = Vec::new();

    for (index, fragment) in fragments.iter().enumerate() {
        let target = fragment.target;
        if target.selector.parse::<Selector>().is_err() {
            skipped.push(MergeSkip::InvalidSelector {
                target: target.id,
                selector: target.selector,
            });
            continue;
        }

        let html = fragment.html.as_str();
        handlers.push(element!(target.selector, {
            let hits = Rc::clone(&hits);
            move |el| {
                el.set_inner_content(html, ContentType::Html);
                hits.borrow_mut()[index] += 1;
                Ok(())
            }
        }));

        if let Some(empty_state) = target.empty_state
            && !fragment.is_empty()
        {
            if empty_state.parse::<Selector>().is_err() {
                skipped.push(MergeSkip::InvalidSelector {
                    target: target.id,
                    selector: empty_state,
                });
                continue;
            }
            handlers.push(element!(empty_state, |el| {
                let style = hidden_style(el.get_attribute("style").as_deref());
                el.set_attribute("style", &style)?;
                Ok(())
            }));
        }
    }

    let html = rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| MergeError::Rewrite {
        message: err.to_string(),
    })?;

    let hits = hits.borrow();
    let mut applied = Vec::new();
    for (fragment, count) in fragments.iter().zip(hits.iter()) {
        let target = fragment.target;
        if *count > 0 {
            applied.push(target.id);
        } else if !skipped.iter().any(|skip| skip_target(skip) == target.id) {
            debug!(
                target = "sitesync::application::merge",
                insertion_point = target.id,
                selector = target.selector,
                "Template target missing, skipping fragment"
            );
            skipped.push(MergeSkip::TargetMissing {
                target: target.id,
                selector: target.selector,
            });
        }
    }

    Ok(MergeOutcome {
        html,
        applied,
        skipped,
    })
}

fn skip_target(skip: &MergeSkip) -> &'static str {
    match skip {
        MergeSkip::TargetMissing { target, .. } | MergeSkip::InvalidSelector { target, .. } => {
            target
        }
    }
}

/// Merges fragments into documents held by a [`DocumentStore`].
#[derive(Clone)]
pub struct TemplateMerger {
    store: Arc<dyn DocumentStore>,
}

impl TemplateMerger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Read `name`, merge the fragments, and write the whole document back.
    /// The document is only rewritten when the merge changed it.
    pub async fn merge_document(
        &self,
        name: &str,
        fragments: &[RenderedFragment],
    ) -> Result<MergeOutcome, MergeError> {
        self.merge_document_with(name, fragments, Ok).await
    }

    /// Like [`merge_document`](Self::merge_document), but passes the merged
    /// markup through `finish` before the single write.
    pub async fn merge_document_with<F>(
        &self,
        name: &str,
        fragments: &[RenderedFragment],
        finish: F,
    ) -> Result<MergeOutcome, MergeError>
    where
        F: FnOnce(String) -> Result<String, MergeError>,
    {
        let original = self.store.read(name).await?;
        let mut outcome = merge(&original, fragments)?;
        outcome.html = finish(outcome.html)?;

        if outcome.changed(&original) {
            self.store.write(name, &outcome.html).await?;
            info!(
                target = "sitesync::application::merge",
                document = name,
                applied = outcome.applied.len(),
                skipped = outcome.skipped.len(),
                "Document updated"
            );
        } else {
            debug!(
                target = "sitesync::application::merge",
                document = name,
                "Document unchanged"
            );
        }

        Ok(outcome)
    }
}

/// `style` with any `display` declaration replaced by `display:none`; the
/// other declarations keep their order.
fn hidden_style(existing: Option<&str>) -> String {
    let mut declarations: Vec<&str> = existing
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|declaration| {
            let property = declaration.split(':').next().unwrap_or_default().trim();
            !declaration.is_empty() && !property.eq_ignore_ascii_case("display")
        })
        .collect();
    declarations.push(HIDDEN_STYLE);
    declarations.join(";")
}
