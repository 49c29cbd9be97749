use chrono::{DateTime, Utc};

use super::conditions::{
    REASON_COMPONENTS_IN_PROGRESS, REASON_COMPONENTS_NOT_READY, REASON_COMPONENTS_READY,
    REASON_COMPONENTS_SETTLED, REASON_ERROR_SEEN,
};
use super::discovery::ComponentRecord;
use super::readiness::ReadinessRegistry;
use crate::crd::{ApplicationStatus, ComponentStatus, ObjectStatus};

pub struct StatusInput<'a> {
    pub registry: &'a ReadinessRegistry,
    /// Members in discovery order.
    pub members: &'a [ComponentRecord],
    /// Status currently stored on the Application.
    pub prior: Option<&'a ApplicationStatus>,
    /// Discovery/ownership failure of this run, if any.
    pub observed_error: Option<&'a str>,
    pub generation: Option<i64>,
    pub now: DateTime<Utc>,
}

pub fn project(registry: &ReadinessRegistry, member: &ComponentRecord) -> ObjectStatus {
    ObjectStatus {
        group: member.group_version().to_string(),
        kind: member.resource.kind.clone(),
        name: member.name(),
        link: member.link(),
        status: registry.status_of(&member.group_kind, &member.object),
    }
}

/// Builds the next Application status from the live members. The component
/// list is rebuilt from scratch; conditions carry over from `prior` so their
/// transition times survive.
pub fn compute_status(input: StatusInput<'_>) -> ApplicationStatus {
    let mut status = input.prior.cloned().unwrap_or_default();
    status.components = input
        .members
        .iter()
        .map(|m| project(input.registry, m))
        .collect();

    let total = status.components.len();
    let ready = status
        .components
        .iter()
        .filter(|c| c.status == ComponentStatus::Ready)
        .count();
    let in_progress = status
        .components
        .iter()
        .filter(|c| c.status == ComponentStatus::InProgress)
        .count();
    status.components_ready = Some(format!("{ready}/{total}"));

    if ready == total {
        status.ready(REASON_COMPONENTS_READY, "all components ready", input.now);
    } else {
        status.not_ready(
            REASON_COMPONENTS_NOT_READY,
            &format!("{} components not ready", total - ready),
            input.now,
        );
    }

    if in_progress == 0 {
        status.settled(REASON_COMPONENTS_SETTLED, "all components settled", input.now);
    } else {
        status.not_settled(
            REASON_COMPONENTS_IN_PROGRESS,
            &format!("{in_progress} components in progress"),
            input.now,
        );
    }

    if let Some(err) = input.observed_error {
        status.set_error(REASON_ERROR_SEEN, err, input.now);
    }

    status.observed_generation = input.generation;
    status
}
