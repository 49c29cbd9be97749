use kube::core::DynamicObject;
use serde_json::Value;

use super::ReadinessRegistry;
use crate::crd::{ComponentStatus, GroupKind};

pub fn register_all(registry: &mut ReadinessRegistry) {
    registry
        .register(GroupKind::new("apps", "StatefulSet"), statefulset_status)
        .register(GroupKind::new("apps", "Deployment"), deployment_status)
        .register(GroupKind::new("apps", "ReplicaSet"), replicaset_status)
        .register(GroupKind::new("apps", "DaemonSet"), daemonset_status)
        .register(GroupKind::new("batch", "Job"), job_status)
        .register(GroupKind::new("", "Pod"), pod_status)
        .register(GroupKind::new("", "PersistentVolumeClaim"), pvc_status)
        .register(GroupKind::new("", "Service"), service_status)
        .register(GroupKind::new("policy", "PodDisruptionBudget"), pdb_status);
}

fn int_at(obj: &DynamicObject, pointer: &str) -> Option<i64> {
    obj.data.pointer(pointer).and_then(Value::as_i64)
}

fn str_at<'a>(obj: &'a DynamicObject, pointer: &str) -> Option<&'a str> {
    obj.data.pointer(pointer).and_then(Value::as_str)
}

fn condition_true(obj: &DynamicObject, type_: &str) -> bool {
    obj.data
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|c| {
            c.get("type").and_then(Value::as_str) == Some(type_)
                && c.get("status").and_then(Value::as_str) == Some("True")
        })
}

/// Controller has seen the latest spec.
fn generation_observed(obj: &DynamicObject) -> bool {
    let generation = obj.metadata.generation.unwrap_or(0);
    int_at(obj, "/status/observedGeneration").unwrap_or(0) >= generation
}

fn ready_if(cond: bool) -> ComponentStatus {
    if cond {
        ComponentStatus::Ready
    } else {
        ComponentStatus::InProgress
    }
}

pub fn statefulset_status(obj: &DynamicObject) -> ComponentStatus {
    let replicas = int_at(obj, "/spec/replicas").unwrap_or(1);
    let ready = int_at(obj, "/status/readyReplicas").unwrap_or(0);
    let current = int_at(obj, "/status/currentReplicas").unwrap_or(0);
    ready_if(ready == replicas && current == replicas)
}

pub fn pdb_status(obj: &DynamicObject) -> ComponentStatus {
    let current = int_at(obj, "/status/currentHealthy").unwrap_or(0);
    let desired = int_at(obj, "/status/desiredHealthy").unwrap_or(0);
    ready_if(current >= desired)
}

pub fn deployment_status(obj: &DynamicObject) -> ComponentStatus {
    let replicas = int_at(obj, "/spec/replicas").unwrap_or(1);
    ready_if(
        generation_observed(obj)
            && ["updatedReplicas", "readyReplicas", "availableReplicas"]
                .iter()
                .all(|f| int_at(obj, &format!("/status/{f}")).unwrap_or(0) >= replicas),
    )
}

pub fn replicaset_status(obj: &DynamicObject) -> ComponentStatus {
    let replicas = int_at(obj, "/spec/replicas").unwrap_or(1);
    let ready = int_at(obj, "/status/readyReplicas").unwrap_or(0);
    let available = int_at(obj, "/status/availableReplicas").unwrap_or(0);
    ready_if(ready >= replicas && available >= replicas)
}

pub fn daemonset_status(obj: &DynamicObject) -> ComponentStatus {
    let desired = int_at(obj, "/status/desiredNumberScheduled").unwrap_or(0);
    ready_if(
        generation_observed(obj)
            && [
                "currentNumberScheduled",
                "updatedNumberScheduled",
                "numberAvailable",
                "numberReady",
            ]
            .iter()
            .all(|f| int_at(obj, &format!("/status/{f}")).unwrap_or(0) >= desired),
    )
}

pub fn job_status(obj: &DynamicObject) -> ComponentStatus {
    let completions = int_at(obj, "/spec/completions").unwrap_or(1);
    let succeeded = int_at(obj, "/status/succeeded").unwrap_or(0);
    ready_if(succeeded >= completions || condition_true(obj, "Complete"))
}

pub fn pod_status(obj: &DynamicObject) -> ComponentStatus {
    match str_at(obj, "/status/phase") {
        Some("Succeeded") => ComponentStatus::Ready,
        Some("Running") => ready_if(condition_true(obj, "Ready")),
        _ => ComponentStatus::InProgress,
    }
}

pub fn pvc_status(obj: &DynamicObject) -> ComponentStatus {
    ready_if(str_at(obj, "/status/phase") == Some("Bound"))
}

pub fn service_status(obj: &DynamicObject) -> ComponentStatus {
    if str_at(obj, "/spec/type") != Some("LoadBalancer") {
        return ComponentStatus::Ready;
    }
    let ingress = obj
        .data
        .pointer("/status/loadBalancer/ingress")
        .and_then(Value::as_array)
        .is_some_and(|i| !i.is_empty());
    ready_if(ingress)
}
