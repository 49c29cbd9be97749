#[cfg(test)]
mod tests {
    use super::super::builtin::*;
    use crate::crd::ComponentStatus::{self, InProgress, Ready};
    use kube::core::{DynamicObject, GroupVersionKind};
    use kube::discovery::ApiResource;
    use serde_json::{Value, json};

    fn obj(kind: &str, data: Value) -> DynamicObject {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", kind));
        DynamicObject::new("x", &ar).within("default").data(data)
    }

    fn check(f: fn(&DynamicObject) -> ComponentStatus, data: Value, want: ComponentStatus) {
        assert_eq!(f(&obj("X", data.clone())), want, "{data}");
    }

    #[test]
    fn statefulset_needs_ready_and_current_equal_to_replicas() {
        check(
            statefulset_status,
            json!({"spec": {"replicas": 3}, "status": {"readyReplicas": 3, "currentReplicas": 3}}),
            Ready,
        );
        check(
            statefulset_status,
            json!({"spec": {"replicas": 3}, "status": {"readyReplicas": 2, "currentReplicas": 3}}),
            InProgress,
        );
        check(
            statefulset_status,
            json!({"spec": {"replicas": 3}, "status": {"readyReplicas": 3, "currentReplicas": 2}}),
            InProgress,
        );
        // replicas defaults to 1
        check(
            statefulset_status,
            json!({"spec": {}, "status": {"readyReplicas": 1, "currentReplicas": 1}}),
            Ready,
        );
        check(statefulset_status, json!({"spec": {}}), InProgress);
        check(statefulset_status, json!({"spec": {"replicas": 0}}), Ready);
    }

    #[test]
    fn pdb_compares_current_to_desired() {
        check(
            pdb_status,
            json!({"status": {"currentHealthy": 2, "desiredHealthy": 2}}),
            Ready,
        );
        check(
            pdb_status,
            json!({"status": {"currentHealthy": 3, "desiredHealthy": 2}}),
            Ready,
        );
        check(
            pdb_status,
            json!({"status": {"currentHealthy": 1, "desiredHealthy": 2}}),
            InProgress,
        );
    }

    #[test]
    fn deployment_waits_for_rollout() {
        let mut ready = obj(
            "Deployment",
            json!({
                "spec": {"replicas": 2},
                "status": {
                    "observedGeneration": 4,
                    "updatedReplicas": 2,
                    "readyReplicas": 2,
                    "availableReplicas": 2
                }
            }),
        );
        ready.metadata.generation = Some(4);
        assert_eq!(deployment_status(&ready), Ready);

        ready.metadata.generation = Some(5);
        assert_eq!(deployment_status(&ready), InProgress, "stale observedGeneration");

        check(
            deployment_status,
            json!({"spec": {"replicas": 2}, "status": {"updatedReplicas": 2, "readyReplicas": 1, "availableReplicas": 2}}),
            InProgress,
        );
        check(deployment_status, json!({"spec": {}}), InProgress);
    }

    #[test]
    fn replicaset_and_daemonset() {
        check(
            replicaset_status,
            json!({"spec": {"replicas": 1}, "status": {"readyReplicas": 1, "availableReplicas": 1}}),
            Ready,
        );
        check(
            replicaset_status,
            json!({"spec": {"replicas": 2}, "status": {"readyReplicas": 2, "availableReplicas": 1}}),
            InProgress,
        );
        let ds = |n: i64| {
            json!({"status": {
                "desiredNumberScheduled": 3,
                "currentNumberScheduled": 3,
                "updatedNumberScheduled": 3,
                "numberAvailable": n,
                "numberReady": 3
            }})
        };
        check(daemonset_status, ds(3), Ready);
        check(daemonset_status, ds(2), InProgress);
    }

    #[test]
    fn job_completion() {
        check(job_status, json!({"spec": {"completions": 2}, "status": {"succeeded": 2}}), Ready);
        check(job_status, json!({"spec": {"completions": 2}, "status": {"succeeded": 1}}), InProgress);
        check(
            job_status,
            json!({"spec": {}, "status": {"conditions": [{"type": "Complete", "status": "True"}]}}),
            Ready,
        );
        check(job_status, json!({"spec": {}}), InProgress);
    }

    #[test]
    fn pod_pvc_and_service() {
        check(pod_status, json!({"status": {"phase": "Succeeded"}}), Ready);
        check(
            pod_status,
            json!({"status": {"phase": "Running", "conditions": [{"type": "Ready", "status": "True"}]}}),
            Ready,
        );
        check(
            pod_status,
            json!({"status": {"phase": "Running", "conditions": [{"type": "Ready", "status": "False"}]}}),
            InProgress,
        );
        check(pod_status, json!({"status": {"phase": "Pending"}}), InProgress);

        check(pvc_status, json!({"status": {"phase": "Bound"}}), Ready);
        check(pvc_status, json!({"status": {"phase": "Pending"}}), InProgress);

        check(service_status, json!({"spec": {"type": "ClusterIP"}}), Ready);
        check(service_status, json!({"spec": {}}), Ready);
        check(service_status, json!({"spec": {"type": "LoadBalancer"}}), InProgress);
        check(
            service_status,
            json!({"spec": {"type": "LoadBalancer"}, "status": {"loadBalancer": {"ingress": [{"ip": "10.0.0.1"}]}}}),
            Ready,
        );
    }
}
