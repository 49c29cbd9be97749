#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use app_controller::clock::FixedClock;
use app_controller::config::ControllerConfig;
use app_controller::controller::ControllerContext;
use app_controller::crd::{Application, ApplicationSpec, GroupKind, LabelSelector};
use app_controller::store::MemoryStore;
use chrono::{DateTime, TimeZone, Utc};
use k8s_openapi::NamespaceResourceScope;
use kube::Client;
use kube::api::Api;
use kube::core::DynamicObject;
use serde_json::{Value, json};

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub const NS1: &str = "default";
pub const NS2: &str = "default2";

pub fn label_set1() -> BTreeMap<String, String> {
    BTreeMap::from([("foo".to_string(), "bar".to_string())])
}

pub fn label_set2() -> BTreeMap<String, String> {
    BTreeMap::from([("baz".to_string(), "qux".to_string())])
}

pub fn statefulset() -> GroupKind {
    GroupKind::new("apps", "StatefulSet")
}
pub fn deployment() -> GroupKind {
    GroupKind::new("apps", "Deployment")
}
pub fn replicaset() -> GroupKind {
    GroupKind::new("apps", "ReplicaSet")
}
pub fn daemonset() -> GroupKind {
    GroupKind::new("apps", "DaemonSet")
}
pub fn job() -> GroupKind {
    GroupKind::new("batch", "Job")
}
pub fn service() -> GroupKind {
    GroupKind::new("", "Service")
}
pub fn pvc() -> GroupKind {
    GroupKind::new("", "PersistentVolumeClaim")
}
pub fn pod() -> GroupKind {
    GroupKind::new("", "Pod")
}
pub fn pdb() -> GroupKind {
    GroupKind::new("policy", "PodDisruptionBudget")
}

pub fn all_kinds() -> Vec<GroupKind> {
    vec![
        statefulset(),
        deployment(),
        replicaset(),
        daemonset(),
        job(),
        service(),
        pvc(),
        pod(),
        pdb(),
    ]
}

/// Object body that the built-in predicate for `gk` classifies as Ready.
pub fn healthy_body(gk: &GroupKind) -> Value {
    match gk.kind.as_str() {
        "StatefulSet" => json!({
            "spec": {"replicas": 1},
            "status": {"replicas": 1, "readyReplicas": 1, "currentReplicas": 1}
        }),
        "Deployment" => json!({
            "spec": {"replicas": 1},
            "status": {"updatedReplicas": 1, "readyReplicas": 1, "availableReplicas": 1}
        }),
        "ReplicaSet" => json!({
            "spec": {"replicas": 1},
            "status": {"readyReplicas": 1, "availableReplicas": 1}
        }),
        "DaemonSet" => json!({
            "status": {
                "desiredNumberScheduled": 1,
                "currentNumberScheduled": 1,
                "updatedNumberScheduled": 1,
                "numberAvailable": 1,
                "numberReady": 1
            }
        }),
        "Job" => json!({"spec": {"completions": 1}, "status": {"succeeded": 1}}),
        "Service" => json!({"spec": {"type": "ClusterIP"}}),
        "PersistentVolumeClaim" => json!({"status": {"phase": "Bound"}}),
        "Pod" => json!({
            "status": {"phase": "Running", "conditions": [{"type": "Ready", "status": "True"}]}
        }),
        "PodDisruptionBudget" => json!({"status": {"currentHealthy": 1, "desiredHealthy": 1}}),
        _ => json!({}),
    }
}

/// A Deployment that never became available.
pub fn broken_deployment_body() -> Value {
    json!({
        "spec": {"replicas": 2},
        "status": {"updatedReplicas": 2, "readyReplicas": 0, "availableReplicas": 0}
    })
}

pub async fn put(
    store: &MemoryStore,
    gk: &GroupKind,
    ns: &str,
    name: &str,
    labels: &BTreeMap<String, String>,
    body: Value,
) -> DynamicObject {
    let resource = store.resource(gk).await.expect("kind registered");
    let mut obj = DynamicObject::new(name, &resource).within(ns).data(body);
    obj.metadata.labels = Some(labels.clone());
    store.insert_component(gk, obj).await.expect("insert component")
}

/// Creates one healthy object per kind in `kinds`, named after the kind.
pub async fn put_healthy(
    store: &MemoryStore,
    kinds: &[GroupKind],
    ns: &str,
    labels: &BTreeMap<String, String>,
) {
    for gk in kinds {
        let name = format!("{}-{}", gk.kind.to_lowercase(), ns);
        put(store, gk, ns, &name, labels, healthy_body(gk)).await;
    }
}

pub fn application(
    ns: &str,
    name: &str,
    kinds: Vec<GroupKind>,
    selector: Option<LabelSelector>,
    add_owner_ref: bool,
) -> Application {
    let mut app = Application::new(
        name,
        ApplicationSpec {
            component_kinds: kinds,
            selector,
            add_owner_ref,
            ..Default::default()
        },
    );
    app.metadata.namespace = Some(ns.to_string());
    app
}

pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn context_at(store: &MemoryStore, now: DateTime<Utc>) -> ControllerContext {
    ControllerContext::new(Arc::new(store.clone()), ControllerConfig::default())
        .with_clock(Arc::new(FixedClock(now)))
}

// Minimal cleanup guard to remove created k8s object by name
pub struct K8sCleanupGuard<T>
where
    T: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + serde::de::DeserializeOwned
        + std::fmt::Debug
        + Send
        + 'static,
{
    ns: String,
    name: String,
    client: Client,
    _marker: std::marker::PhantomData<T>,
}

impl<T> K8sCleanupGuard<T>
where
    T: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + serde::de::DeserializeOwned
        + std::fmt::Debug
        + Send
        + 'static,
{
    pub fn new(ns: &str, name: &str, client: Client) -> Self {
        Self {
            ns: ns.to_string(),
            name: name.to_string(),
            client,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Drop for K8sCleanupGuard<T>
where
    T: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + serde::de::DeserializeOwned
        + std::fmt::Debug
        + Send
        + 'static,
{
    fn drop(&mut self) {
        let ns = self.ns.clone();
        let name = self.name.clone();
        let client = self.client.clone();
        let _ = tokio::spawn(async move {
            let api: Api<T> = Api::namespaced(client, &ns);
            let _ = api.delete(&name, &Default::default()).await;
        });
    }
}
