use tracing::{debug, info, instrument};

use super::discovery::discover;
use super::ownership::{owner_ref_for, reconcile_ownership};
use super::status::{StatusInput, compute_status};
use super::{ControllerContext, ReconcileErr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Status is up to date; `changed` tells whether it had to be written.
    Synced { changed: bool },
    /// The Application no longer exists or is being deleted.
    Gone,
}

/// One pass over an Application: discover its components, attach owner
/// references when requested, recompute the status and persist it if it
/// changed.
///
/// Discovery and ownership failures do not stop the pass; they end up in the
/// Error condition and are returned as [`ReconcileErr::Components`] after the
/// status has been written, so the caller retries with backoff.
#[instrument(skip_all, fields(ns = %ns, name = %name))]
pub async fn reconcile_application(
    ctx: &ControllerContext,
    ns: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileErr> {
    let Some(app) = ctx.store.get_application(ns, name).await? else {
        debug!("application not found");
        return Ok(ReconcileOutcome::Gone);
    };
    if app.metadata.deletion_timestamp.is_some() {
        debug!("application is being deleted");
        return Ok(ReconcileOutcome::Gone);
    }

    let discovery = discover(
        ctx.store.as_ref(),
        ns,
        app.spec.selector.as_ref(),
        &app.spec.component_kinds,
    )
    .await;
    let mut errors: Vec<String> = discovery.errors.iter().map(|e| e.to_string()).collect();

    if app.spec.add_owner_ref {
        let owner = owner_ref_for(&app).ok_or_else(|| {
            ReconcileErr::Internal(format!("Application {ns}/{name} has no uid"))
        })?;
        match reconcile_ownership(ctx.store.as_ref(), &owner, &discovery.members).await {
            Ok(report) => debug!(?report, "ownership reconciled"),
            Err(e) => errors.push(e.to_string()),
        }
    }

    let observed_error = (!errors.is_empty()).then(|| errors.join("; "));
    let now = ctx.clock.now();
    let prior = app.status.as_ref();
    let mut next = compute_status(StatusInput {
        registry: &ctx.registry,
        members: &discovery.members,
        prior,
        observed_error: observed_error.as_deref(),
        generation: app.metadata.generation,
        now,
    });
    if observed_error.is_none() && ctx.cfg.clear_error_on_success {
        next.clear_error(now);
    }

    let changed = prior != Some(&next);
    if changed {
        match ctx.store.update_application_status(ns, name, &next).await {
            Ok(()) => info!(
                components = next.components.len(),
                ready = next.components_ready.as_deref().unwrap_or_default(),
                "status updated"
            ),
            Err(e) if e.is_not_found() => return Ok(ReconcileOutcome::Gone),
            Err(e) => return Err(e.into()),
        }
    }

    match observed_error {
        Some(msg) => Err(ReconcileErr::Components(msg)),
        None => Ok(ReconcileOutcome::Synced { changed }),
    }
}
