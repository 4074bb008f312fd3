//! Slug helpers for naming per-record artifacts on disk.
//!
//! CMS slugs are free text typed by editors, so they are normalised through
//! the `slug` crate before they become file names. Within one build an
//! [`ArtifactSlugger`] hands out suffixed slugs (`gutters`, `gutters-2`) so two
//! records never overwrite each other's artifact.

use std::collections::HashSet;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Produce a slug that does not collide according to the supplied predicate.
///
/// The helper retries by suffixing a monotonic counter (`-2`, `-3`, …).
pub fn generate_unique_slug<F>(input: &str, mut is_unique: F) -> Result<String, SlugError>
where
    F: FnMut(&str) -> bool,
{
    let base = derive_slug(input)?;

    if is_unique(&base) {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate) {
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted { base })
}

/// Hands out unique, filesystem-safe slugs for one artifact directory.
#[derive(Debug, Default)]
pub struct ArtifactSlugger {
    taken: HashSet<String>,
}

impl ArtifactSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for a record, falling back to its id when the preferred slug
    /// cannot be represented.
    pub fn slug_for(&mut self, preferred: &str, id: &str) -> Result<String, SlugError> {
        let source = match derive_slug(preferred) {
            Ok(_) => preferred,
            Err(_) => id,
        };

        let taken = &mut self.taken;
        generate_unique_slug(source, |candidate| taken.insert(candidate.to_string()))
    }

    /// Claim the raw record id when no slug could be derived, suffixing it
    /// if an earlier record already holds that name.
    pub fn fallback(&mut self, id: &str) -> String {
        let mut candidate = id.to_string();
        let mut attempt = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{id}-{attempt}");
            attempt += 1;
        }
        candidate
    }
}
