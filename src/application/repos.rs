//! Traits describing the external collaborators of the pipeline: the remote
//! content source and the document storage the site is published to.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("content source unavailable: {message}")]
    Unavailable { message: String },
    #[error("content source rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("content source returned malformed data: {message}")]
    Malformed { message: String },
}

impl SourceError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: err.to_string(),
        }
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySort {
    pub property: String,
    pub direction: SortDirection,
}

impl QuerySort {
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    CheckboxEquals { property: String, value: bool },
}

impl QueryFilter {
    pub fn checked(property: impl Into<String>) -> Self {
        Self::CheckboxEquals {
            property: property.into(),
            value: true,
        }
    }
}

/// Declarative query against one database of the content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub database_id: String,
    pub filter: Option<QueryFilter>,
    pub sorts: Vec<QuerySort>,
}

impl QuerySpec {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            filter: None,
            sorts: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: QuerySort) -> Self {
        self.sorts.push(sort);
        self
    }
}

/// One record as returned by the content source, before mapping.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RawRecord {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Value written to a single record property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Email(Option<String>),
    Phone(Option<String>),
    Select(String),
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a query, returning every matching record across all result pages.
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<RawRecord>, SourceError>;

    /// Child blocks of a record, as raw block objects.
    async fn block_children(&self, record_id: &str) -> Result<Vec<Value>, SourceError>;

    /// Create a record in a database, returning the new record id.
    async fn create_record(
        &self,
        database_id: &str,
        properties: PropertyMap,
    ) -> Result<String, SourceError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document `{name}` not found")]
    NotFound { name: String },
    #[error("document name `{name}` is not allowed")]
    InvalidName { name: String },
    #[error("failed to persist `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Whole-document storage for the published site.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, name: &str) -> Result<String, StoreError>;

    /// Replace the document, creating parent directories as needed.
    async fn write(&self, name: &str, contents: &str) -> Result<(), StoreError>;
}
