use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use kube::core::{DynamicObject, GroupVersionKind, TypeMeta};
use kube::discovery::ApiResource;
use kube::ResourceExt;
use tokio::sync::RwLock;

use super::{ListedComponents, ResourceStore, StoreError};
use crate::crd::{Application, ApplicationStatus, GroupKind};
use crate::selector::Selector;

type ObjectKey = (String, String);

#[derive(Clone, Copy, Debug)]
enum WriteFault {
    /// The write loses an optimistic-concurrency race.
    Conflict,
    /// The object is deleted just before the write lands.
    Vanish,
}

#[derive(Default)]
struct Inner {
    kinds: HashMap<GroupKind, ApiResource>,
    applications: BTreeMap<ObjectKey, Application>,
    objects: HashMap<GroupKind, BTreeMap<ObjectKey, DynamicObject>>,
    failing: HashSet<GroupKind>,
    write_faults: HashMap<GroupKind, WriteFault>,
    vanishing_applications: HashSet<ObjectKey>,
    next_version: u64,
    component_writes: usize,
    status_writes: usize,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn resource(&self, gk: &GroupKind) -> Result<ApiResource, StoreError> {
        if self.failing.contains(gk) {
            return Err(StoreError::Unavailable(format!("{gk} is failing")));
        }
        self.kinds
            .get(gk)
            .cloned()
            .ok_or_else(|| StoreError::UnknownKind(gk.clone()))
    }
}

/// In-process [`ResourceStore`] with the write semantics of the API server:
/// `resourceVersion` is bumped on every write and checked on update, new
/// objects get a uid, and lists come back ordered by name.
///
/// The standard workload, core and policy kinds are served out of the box;
/// further kinds are added with [`MemoryStore::register_kind`].
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        for (group, version, kind, plural) in [
            ("apps", "v1", "Deployment", "deployments"),
            ("apps", "v1", "StatefulSet", "statefulsets"),
            ("apps", "v1", "ReplicaSet", "replicasets"),
            ("apps", "v1", "DaemonSet", "daemonsets"),
            ("batch", "v1", "Job", "jobs"),
            ("", "v1", "Service", "services"),
            ("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims"),
            ("", "v1", "Pod", "pods"),
            ("policy", "v1", "PodDisruptionBudget", "poddisruptionbudgets"),
        ] {
            let gvk = GroupVersionKind::gvk(group, version, kind);
            inner.kinds.insert(
                GroupKind::new(group, kind),
                ApiResource::from_gvk_with_plural(&gvk, plural),
            );
        }
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    pub async fn register_kind(&self, gk: GroupKind, resource: ApiResource) {
        self.inner.write().await.kinds.insert(gk, resource);
    }

    /// Every subsequent component operation on `gk` fails with
    /// [`StoreError::Unavailable`].
    pub async fn fail_kind(&self, gk: GroupKind) {
        self.inner.write().await.failing.insert(gk);
    }

    /// Every subsequent `update_component` on `gk` fails with
    /// [`StoreError::Conflict`]; reads keep working.
    pub async fn conflict_on_update(&self, gk: GroupKind) {
        self.inner.write().await.write_faults.insert(gk, WriteFault::Conflict);
    }

    /// Every subsequent `update_component` on `gk` finds the object deleted
    /// and fails with [`StoreError::NotFound`].
    pub async fn vanish_on_update(&self, gk: GroupKind) {
        self.inner.write().await.write_faults.insert(gk, WriteFault::Vanish);
    }

    /// The next status write for `ns/name` finds the Application deleted.
    pub async fn vanish_before_status_write(&self, ns: &str, name: &str) {
        self.inner
            .write()
            .await
            .vanishing_applications
            .insert((ns.to_string(), name.to_string()));
    }

    pub async fn resource(&self, gk: &GroupKind) -> Option<ApiResource> {
        self.inner.read().await.kinds.get(gk).cloned()
    }

    /// Stores (or overwrites) an Application, filling in uid, generation
    /// and resourceVersion when missing.
    pub async fn insert_application(&self, mut app: Application) -> Application {
        let mut inner = self.inner.write().await;
        let version = inner.bump();
        let meta = &mut app.metadata;
        meta.namespace.get_or_insert_with(|| "default".to_string());
        meta.uid.get_or_insert_with(|| format!("app-uid-{version}"));
        meta.generation.get_or_insert(1);
        meta.resource_version = Some(version.to_string());
        let key = (app.namespace().unwrap_or_default(), app.name_any());
        inner.applications.insert(key, app.clone());
        app
    }

    pub async fn delete_application(&self, ns: &str, name: &str) {
        self.inner
            .write()
            .await
            .applications
            .remove(&(ns.to_string(), name.to_string()));
    }

    pub async fn application(&self, ns: &str, name: &str) -> Option<Application> {
        self.inner
            .read()
            .await
            .applications
            .get(&(ns.to_string(), name.to_string()))
            .cloned()
    }

    /// Stores a component object under a registered kind.
    pub async fn insert_component(
        &self,
        gk: &GroupKind,
        mut obj: DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let mut inner = self.inner.write().await;
        let resource = inner
            .kinds
            .get(gk)
            .cloned()
            .ok_or_else(|| StoreError::UnknownKind(gk.clone()))?;
        let version = inner.bump();
        obj.types = Some(TypeMeta {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
        });
        obj.metadata.namespace.get_or_insert_with(|| "default".to_string());
        obj.metadata.uid.get_or_insert_with(|| format!("uid-{version}"));
        obj.metadata.resource_version = Some(version.to_string());
        let key = (obj.namespace().unwrap_or_default(), obj.name_any());
        inner
            .objects
            .entry(gk.clone())
            .or_default()
            .insert(key, obj.clone());
        Ok(obj)
    }

    pub async fn component(
        &self,
        gk: &GroupKind,
        ns: &str,
        name: &str,
    ) -> Option<DynamicObject> {
        self.inner
            .read()
            .await
            .objects
            .get(gk)
            .and_then(|m| m.get(&(ns.to_string(), name.to_string())))
            .cloned()
    }

    /// Number of successful `update_component` calls.
    pub async fn component_writes(&self) -> usize {
        self.inner.read().await.component_writes
    }

    /// Number of successful `update_application_status` calls.
    pub async fn status_writes(&self) -> usize {
        self.inner.read().await.status_writes
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_application(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self.application(ns, name).await)
    }

    async fn update_application_status(
        &self,
        ns: &str,
        name: &str,
        status: &ApplicationStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let key = (ns.to_string(), name.to_string());
        if inner.vanishing_applications.remove(&key) {
            inner.applications.remove(&key);
        }
        let version = inner.bump();
        let app = inner
            .applications
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("Application {ns}/{name}")))?;
        app.status = Some(status.clone());
        app.metadata.resource_version = Some(version.to_string());
        inner.status_writes += 1;
        Ok(())
    }

    async fn list_components(
        &self,
        gk: &GroupKind,
        ns: &str,
        selector: &Selector,
    ) -> Result<ListedComponents, StoreError> {
        let inner = self.inner.read().await;
        let resource = inner.resource(gk)?;
        let items = inner
            .objects
            .get(gk)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|((obj_ns, _), obj)| obj_ns == ns && selector.matches(obj.labels()))
                    .map(|(_, obj)| obj.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(ListedComponents { resource, items })
    }

    async fn get_component(
        &self,
        gk: &GroupKind,
        ns: &str,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        let inner = self.inner.read().await;
        inner.resource(gk)?;
        inner
            .objects
            .get(gk)
            .and_then(|m| m.get(&(ns.to_string(), name.to_string())))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{gk} {ns}/{name}")))
    }

    async fn update_component(
        &self,
        gk: &GroupKind,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let mut inner = self.inner.write().await;
        inner.resource(gk)?;
        let ns = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let what = format!("{gk} {ns}/{name}");
        let fault = inner.write_faults.get(gk).copied();
        match fault {
            Some(WriteFault::Conflict) => return Err(StoreError::Conflict(what)),
            Some(WriteFault::Vanish) => {
                if let Some(m) = inner.objects.get_mut(gk) {
                    m.remove(&(ns, name));
                }
                return Err(StoreError::NotFound(what));
            }
            None => {}
        }
        let version = inner.next_version + 1;
        let stored = inner
            .objects
            .get_mut(gk)
            .and_then(|m| m.get_mut(&(ns.clone(), name.clone())))
            .ok_or_else(|| StoreError::NotFound(what.clone()))?;
        if obj.metadata.resource_version.is_some()
            && obj.metadata.resource_version != stored.metadata.resource_version
        {
            return Err(StoreError::Conflict(what));
        }
        let mut updated = obj.clone();
        updated.types = stored.types.clone();
        updated.metadata.uid = stored.metadata.uid.clone();
        updated.metadata.resource_version = Some(version.to_string());
        *stored = updated.clone();
        inner.next_version = version;
        inner.component_writes += 1;
        Ok(updated)
    }
}
