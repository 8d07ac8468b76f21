//! The remote data client: everything the app knows about the backend.
//!
//! Controllers only ever talk to a [`Backend`]. [`ManifestClient`] speaks the
//! real REST API; [`MemoryBackend`] keeps the same schema contract in process.

use async_trait::async_trait;
use ff::basic_models::{EntityId, ImageForUpload, Photo, SignupForUpload, User};
use ff::Entity;
use serde::{Deserialize, Serialize};

use crate::errors::BackendResult;

pub mod manifest;
pub mod memory;

pub use manifest::ManifestClient;
pub use memory::MemoryBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: &'static str,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Case-insensitive substring match on a text field.
    Contains { field: &'static str, value: String },
    Equals {
        field: &'static str,
        value: serde_json::Value,
    },
}

/// Options for listing a collection. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub include: Vec<&'static str>,
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, relation: &'static str) -> Self {
        self.include.push(relation);
        self
    }

    pub fn contains(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Contains {
            field,
            value: value.into(),
        });
        self
    }

    pub fn equals(mut self, field: &'static str, value: impl Into<serde_json::Value>) -> Self {
        self.filters.push(Filter::Equals {
            field,
            value: value.into(),
        });
        self
    }

    pub fn sort(mut self, field: &'static str, direction: Direction) -> Self {
        self.sort = Some(Sort { field, direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One page of a listed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<E> {
    pub data: Vec<E>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub current_page: Option<usize>,
    #[serde(default)]
    pub last_page: Option<usize>,
}

impl<E> Page<E> {
    pub fn new(data: Vec<E>) -> Self {
        let total = data.len();
        Self {
            data,
            total: Some(total),
            current_page: Some(1),
            last_page: Some(1),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange credentials for a session. The session is kept by the backend handle.
    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<()>;

    /// The user owning the current session, or `NotFound` when there is none.
    async fn current_session(&self) -> BackendResult<User>;

    async fn signup(&self, signup: &SignupForUpload) -> BackendResult<User>;

    async fn end_session(&self) -> BackendResult<()>;

    async fn list<E: Entity>(&self, query: &Query) -> BackendResult<Page<E>>;

    async fn create<E, A>(&self, attributes: &A) -> BackendResult<E>
    where
        E: Entity,
        A: Serialize + Sync;

    async fn update<E, A>(&self, id: EntityId, attributes: &A) -> BackendResult<E>
    where
        E: Entity,
        A: Serialize + Sync;

    async fn delete_by_id<E: Entity>(&self, id: EntityId) -> BackendResult<()>;

    /// Store an image for `property` of entity `E`, returning its rendered sizes.
    async fn upload_image<E: Entity>(
        &self,
        property: &str,
        image: &ImageForUpload,
    ) -> BackendResult<Photo>;

    async fn health(&self) -> BackendResult<()>;
}
