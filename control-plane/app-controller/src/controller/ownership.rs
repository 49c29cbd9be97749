use futures_util::future::join_all;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use super::discovery::ComponentRecord;
use crate::crd::application::{API_VERSION, KIND};
use crate::crd::Application;
use crate::store::{ResourceStore, StoreError};

#[derive(thiserror::Error, Debug)]
#[error("{failed} component(s) failed owner reference update, first: {first}")]
pub struct OwnershipError {
    pub failed: usize,
    #[source]
    pub first: StoreError,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OwnershipReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Members deleted between discovery and the write.
    pub missing: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Added,
    Updated,
    Unchanged,
    Missing,
}

/// Owner reference pointing at `app`, or `None` when the Application has no
/// uid yet (never persisted).
pub fn owner_ref_for(app: &Application) -> Option<OwnerReference> {
    Some(OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: app.name_any(),
        uid: app.uid()?,
        controller: None,
        block_owner_deletion: None,
    })
}

/// Same logical owner, regardless of uid.
fn same_owner(a: &OwnerReference, b: &OwnerReference) -> bool {
    a.api_version == b.api_version && a.kind == b.kind && a.name == b.name
}

fn identical(a: &OwnerReference, b: &OwnerReference) -> bool {
    same_owner(a, b)
        && a.uid == b.uid
        && a.controller == b.controller
        && a.block_owner_deletion == b.block_owner_deletion
}

/// Rewrites `refs` so it carries exactly one reference to `owner`'s
/// Application. Returns `None` if nothing had to change.
fn apply_owner(refs: &mut Vec<OwnerReference>, owner: &OwnerReference) -> Option<Outcome> {
    let matching: Vec<usize> = refs
        .iter()
        .enumerate()
        .filter(|(_, r)| same_owner(r, owner))
        .map(|(i, _)| i)
        .collect();
    match matching.as_slice() {
        [] => {
            refs.push(owner.clone());
            Some(Outcome::Added)
        }
        [only] if identical(&refs[*only], owner) => None,
        [first, ..] => {
            let first = *first;
            refs[first] = owner.clone();
            let mut idx = 0;
            refs.retain(|r| {
                let keep = idx == first || !same_owner(r, owner);
                idx += 1;
                keep
            });
            Some(Outcome::Updated)
        }
    }
}

async fn ensure_owner(
    store: &dyn ResourceStore,
    owner: &OwnerReference,
    member: &ComponentRecord,
) -> Result<Outcome, StoreError> {
    let ns = member.namespace().unwrap_or_default();
    let name = member.name();
    let mut live = match store.get_component(&member.group_kind, &ns, &name).await {
        Ok(obj) => obj,
        Err(e) if e.is_not_found() => return Ok(Outcome::Missing),
        Err(e) => return Err(e),
    };
    let refs = live.metadata.owner_references.get_or_insert_with(Vec::new);
    let Some(outcome) = apply_owner(refs, owner) else {
        return Ok(Outcome::Unchanged);
    };
    match store.update_component(&member.group_kind, &live).await {
        Ok(_) => {
            debug!(kind = %member.group_kind, %ns, %name, ?outcome, "owner reference written");
            Ok(outcome)
        }
        Err(e) if e.is_not_found() => Ok(Outcome::Missing),
        Err(e) => Err(e),
    }
}

/// Makes every member carry `owner`. All members are attempted even when
/// some fail; the first failure is returned with the failure count.
#[instrument(skip_all, fields(owner = %owner.name, members = members.len()))]
pub async fn reconcile_ownership(
    store: &dyn ResourceStore,
    owner: &OwnerReference,
    members: &[ComponentRecord],
) -> Result<OwnershipReport, OwnershipError> {
    let results = join_all(members.iter().map(|m| ensure_owner(store, owner, m))).await;

    let mut report = OwnershipReport::default();
    let mut failed = 0;
    let mut first = None;
    for (member, res) in members.iter().zip(results) {
        match res {
            Ok(Outcome::Added) => report.added += 1,
            Ok(Outcome::Updated) => report.updated += 1,
            Ok(Outcome::Unchanged) => report.unchanged += 1,
            Ok(Outcome::Missing) => report.missing += 1,
            Err(e) => {
                warn!(kind = %member.group_kind, name = %member.name(), error = %e, "owner reference update failed");
                failed += 1;
                first.get_or_insert(e);
            }
        }
    }
    if report.added + report.updated > 0 {
        info!(added = report.added, updated = report.updated, "owner references reconciled");
    }
    match first {
        Some(first) => Err(OwnershipError { failed, first }),
        None => Ok(report),
    }
}
