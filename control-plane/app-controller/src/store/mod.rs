//! Access to the objects the controller reads and writes.
//!
//! The reconcile logic only talks to [`ResourceStore`]; [`KubeStore`] backs it
//! with the API server and [`MemoryStore`] keeps everything in process.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;

use crate::crd::{Application, ApplicationStatus, GroupKind};
use crate::selector::Selector;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict writing {0}")]
    Conflict(String),
    #[error("kind {0} is not served by the cluster")]
    UnknownKind(GroupKind),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("kube error: {0}")]
    Kube(#[source] kube::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Map API status codes onto the variants callers branch on.
    pub(crate) fn from_kube(what: impl Into<String>, e: kube::Error) -> Self {
        match &e {
            kube::Error::Api(resp) if resp.code == 404 => {
                StoreError::NotFound(what.into())
            }
            kube::Error::Api(resp) if resp.code == 409 => {
                StoreError::Conflict(what.into())
            }
            _ => StoreError::Kube(e),
        }
    }
}

/// Result of listing one component kind.
#[derive(Clone, Debug)]
pub struct ListedComponents {
    /// Resolved group/version/kind/plural of the listed kind.
    pub resource: ApiResource,
    pub items: Vec<DynamicObject>,
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_application(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<Application>, StoreError>;

    async fn update_application_status(
        &self,
        ns: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), StoreError>;

    async fn list_components(
        &self,
        gk: &GroupKind,
        ns: &str,
        selector: &Selector,
    ) -> Result<ListedComponents, StoreError>;

    async fn get_component(
        &self,
        gk: &GroupKind,
        ns: &str,
        name: &str,
    ) -> Result<DynamicObject, StoreError>;

    /// Optimistic-concurrency write; a stale `resourceVersion` yields
    /// [`StoreError::Conflict`].
    async fn update_component(
        &self,
        gk: &GroupKind,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, StoreError>;
}
