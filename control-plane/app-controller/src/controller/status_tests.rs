#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use kube::core::{DynamicObject, GroupVersionKind};
    use kube::discovery::ApiResource;
    use serde_json::json;

    use super::super::conditions::*;
    use super::super::discovery::ComponentRecord;
    use super::super::readiness::ReadinessRegistry;
    use super::super::status::{StatusInput, compute_status};
    use crate::crd::{
        ApplicationStatus, ComponentStatus, ConditionStatus, ConditionType, GroupKind,
    };

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn member(group: &str, kind: &str, plural: &str, name: &str, data: serde_json::Value) -> ComponentRecord {
        let ar = ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(group, "v1", kind), plural);
        ComponentRecord {
            group_kind: GroupKind::new(group, kind),
            object: DynamicObject::new(name, &ar).within("default").data(data),
            resource: ar,
        }
    }

    fn ready_sts(name: &str) -> ComponentRecord {
        member(
            "apps",
            "StatefulSet",
            "statefulsets",
            name,
            json!({"spec": {"replicas": 1}, "status": {"readyReplicas": 1, "currentReplicas": 1}}),
        )
    }

    fn pending_sts(name: &str) -> ComponentRecord {
        member(
            "apps",
            "StatefulSet",
            "statefulsets",
            name,
            json!({"spec": {"replicas": 2}, "status": {"readyReplicas": 0, "currentReplicas": 0}}),
        )
    }

    fn service(name: &str) -> ComponentRecord {
        member("", "Service", "services", name, json!({"spec": {"type": "ClusterIP"}}))
    }

    fn run(
        registry: &ReadinessRegistry,
        members: &[ComponentRecord],
        prior: Option<&ApplicationStatus>,
        err: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApplicationStatus {
        compute_status(StatusInput {
            registry,
            members,
            prior,
            observed_error: err,
            generation: Some(3),
            now,
        })
    }

    #[test]
    fn no_members_is_ready_and_settled() {
        let reg = ReadinessRegistry::default();
        let s = run(&reg, &[], None, None, at(0));
        assert!(s.components.is_empty());
        assert_eq!(s.components_ready.as_deref(), Some("0/0"));
        assert!(s.is_ready());
        assert!(s.is_condition_true(ConditionType::Settled));
        assert!(s.get_condition(ConditionType::Error).is_none());
        assert_eq!(s.observed_generation, Some(3));
    }

    #[test]
    fn projection_preserves_order_and_identity() {
        let reg = ReadinessRegistry::default();
        let members = vec![ready_sts("db"), service("web"), pending_sts("cache")];
        let s = run(&reg, &members, None, None, at(0));

        let names: Vec<_> = s.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["db", "web", "cache"]);
        assert_eq!(s.components[0].group, "apps/v1");
        assert_eq!(s.components[0].kind, "StatefulSet");
        assert_eq!(
            s.components[0].link,
            "/apis/apps/v1/namespaces/default/statefulsets/db"
        );
        assert_eq!(s.components[1].group, "v1");
        assert_eq!(s.components[2].status, ComponentStatus::InProgress);

        assert_eq!(s.components_ready.as_deref(), Some("2/3"));
        let ready = s.get_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason.as_deref(), Some(REASON_COMPONENTS_NOT_READY));
        assert_eq!(ready.message.as_deref(), Some("1 components not ready"));
        let settled = s.get_condition(ConditionType::Settled).unwrap();
        assert_eq!(settled.reason.as_deref(), Some(REASON_COMPONENTS_IN_PROGRESS));
    }

    #[test]
    fn components_are_rebuilt_not_accumulated() {
        let reg = ReadinessRegistry::default();
        let first = run(&reg, &[ready_sts("a"), service("b")], None, None, at(0));
        let second = run(&reg, &[service("b")], Some(&first), None, at(10));
        assert_eq!(second.components.len(), 1);
        assert_eq!(second.components_ready.as_deref(), Some("1/1"));
    }

    #[test]
    fn ready_flip_keeps_history() {
        let reg = ReadinessRegistry::default();
        let s0 = run(&reg, &[pending_sts("db")], None, None, at(0));
        let s1 = run(&reg, &[pending_sts("db")], Some(&s0), None, at(10));
        assert_eq!(s1, s0, "no change on identical input");

        let s2 = run(&reg, &[ready_sts("db")], Some(&s1), None, at(20));
        let ready = s2.get_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.reason.as_deref(), Some(REASON_COMPONENTS_READY));
        assert_eq!(ready.last_transition_time, Some(at(20).to_rfc3339()));
    }

    #[test]
    fn error_is_recorded_and_then_left_alone() {
        let reg = ReadinessRegistry::default();
        let s0 = run(&reg, &[service("web")], None, Some("listing Widget.example.com: boom"), at(0));
        let err = s0.get_condition(ConditionType::Error).unwrap();
        assert_eq!(err.status, ConditionStatus::True);
        assert_eq!(err.reason.as_deref(), Some(REASON_ERROR_SEEN));
        assert_eq!(err.message.as_deref(), Some("listing Widget.example.com: boom"));

        let s1 = run(&reg, &[service("web")], Some(&s0), None, at(10));
        assert_eq!(
            s1.get_condition(ConditionType::Error),
            s0.get_condition(ConditionType::Error)
        );
    }

    #[test]
    fn disabled_is_settled_but_not_ready() {
        let reg = ReadinessRegistry::default().with(
            GroupKind::new("", "Service"),
            |_: &DynamicObject| ComponentStatus::Disabled,
        );
        let s = run(&reg, &[service("web")], None, None, at(0));
        assert_eq!(s.components[0].status, ComponentStatus::Disabled);
        assert_eq!(s.components_ready.as_deref(), Some("0/1"));
        assert!(!s.is_ready());
        assert!(s.is_condition_true(ConditionType::Settled));
    }
}
