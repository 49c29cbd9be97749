use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::core::{DynamicObject, TypeMeta};
use kube::discovery::{self, ApiResource};
use kube::{Client, ResourceExt};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ListedComponents, ResourceStore, StoreError};
use crate::crd::{Application, ApplicationStatus, GroupKind};
use crate::selector::Selector;

/// Store backed by the Kubernetes API server.
///
/// Component kinds are resolved through API discovery on first use and the
/// resolved [`ApiResource`] is cached for the lifetime of the store.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    resources: Arc<RwLock<HashMap<GroupKind, ApiResource>>>,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn resolve(&self, gk: &GroupKind) -> Result<ApiResource, StoreError> {
        if let Some(ar) = self.resources.read().await.get(gk) {
            return Ok(ar.clone());
        }
        let group = match discovery::group(&self.client, &gk.group).await {
            Ok(g) => g,
            Err(kube::Error::Discovery(e)) => {
                debug!(error = %e, group = %gk.group, "api group not served");
                return Err(StoreError::UnknownKind(gk.clone()));
            }
            Err(e) => return Err(StoreError::Kube(e)),
        };
        let (ar, _caps) = group
            .recommended_kind(&gk.kind)
            .ok_or_else(|| StoreError::UnknownKind(gk.clone()))?;
        debug!(kind = %gk, api_version = %ar.api_version, plural = %ar.plural, "resolved component kind");
        self.resources.write().await.insert(gk.clone(), ar.clone());
        Ok(ar)
    }

    fn dyn_api(&self, ns: &str, ar: &ApiResource) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), ns, ar)
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_application(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<Application>, StoreError> {
        let api: Api<Application> = Api::namespaced(self.client.clone(), ns);
        api.get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(format!("Application {ns}/{name}"), e))
    }

    async fn update_application_status(
        &self,
        ns: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), StoreError> {
        let api: Api<Application> = Api::namespaced(self.client.clone(), ns);
        let patch = json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(format!("Application {ns}/{name}"), e))?;
        Ok(())
    }

    async fn list_components(
        &self,
        gk: &GroupKind,
        ns: &str,
        selector: &Selector,
    ) -> Result<ListedComponents, StoreError> {
        let resource = self.resolve(gk).await?;
        let Some(query) = selector.label_query() else {
            return Ok(ListedComponents {
                resource,
                items: Vec::new(),
            });
        };
        let mut lp = ListParams::default();
        if !query.selects_all() {
            lp = lp.labels_from(query);
        }
        let list = self
            .dyn_api(ns, &resource)
            .list(&lp)
            .await
            .map_err(|e| StoreError::from_kube(format!("{gk} in {ns}"), e))?;
        Ok(ListedComponents {
            resource,
            items: list.items,
        })
    }

    async fn get_component(
        &self,
        gk: &GroupKind,
        ns: &str,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        let resource = self.resolve(gk).await?;
        self.dyn_api(ns, &resource)
            .get_opt(name)
            .await
            .map_err(|e| StoreError::from_kube(format!("{gk} {ns}/{name}"), e))?
            .ok_or_else(|| StoreError::NotFound(format!("{gk} {ns}/{name}")))
    }

    async fn update_component(
        &self,
        gk: &GroupKind,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let resource = self.resolve(gk).await?;
        let ns = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        // list responses leave apiVersion/kind empty on items
        let mut obj = obj.clone();
        obj.types = Some(TypeMeta {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
        });
        self.dyn_api(&ns, &resource)
            .replace(&name, &PostParams::default(), &obj)
            .await
            .map_err(|e| StoreError::from_kube(format!("{gk} {ns}/{name}"), e))
    }
}
