pub mod conditions;
pub mod discovery;
pub mod group_kind;
pub mod ownership;
pub mod readiness;
pub mod reconcile;
pub mod status;

#[cfg(test)]
mod status_tests;

use std::sync::Arc;

use futures_util::StreamExt;
use kube::{
    Client, ResourceExt,
    api::Api,
    core::DynamicObject,
    runtime::{
        Controller,
        controller::{self, Action},
        reflector::ObjectRef,
        watcher,
    },
};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::ControllerConfig;
use crate::crd::Application;
use crate::store::{KubeStore, ResourceStore, StoreError};
use readiness::ReadinessRegistry;
pub use reconcile::{ReconcileOutcome, reconcile_application};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("component errors: {0}")]
    Components(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub struct ControllerContext {
    pub store: Arc<dyn ResourceStore>,
    pub registry: ReadinessRegistry,
    pub clock: Arc<dyn Clock>,
    pub cfg: ControllerConfig,
    /// Consecutive failures per `ns/name`, cleared on success.
    failures: scc::HashMap<String, u32>,
}

impl ControllerContext {
    pub fn new(store: Arc<dyn ResourceStore>, cfg: ControllerConfig) -> Self {
        Self {
            store,
            registry: ReadinessRegistry::default(),
            clock: Arc::new(SystemClock),
            cfg,
            failures: scc::HashMap::new(),
        }
    }

    pub fn with_registry(mut self, registry: ReadinessRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bumps and returns the failure count for `key`.
    pub fn record_failure(&self, key: &str) -> u32 {
        *self
            .failures
            .entry(key.to_string())
            .and_modify(|n| *n += 1)
            .or_insert(1)
            .get()
    }

    pub fn reset_failures(&self, key: &str) {
        let _ = self.failures.remove(key);
    }

    pub fn failures(&self, key: &str) -> u32 {
        self.failures.read(key, |_, n| *n).unwrap_or(0)
    }
}

fn key_for(ns: Option<&str>, name: &str) -> String {
    format!("{}/{}", ns.unwrap_or("default"), name)
}

fn object_key(app: &Application) -> String {
    key_for(app.metadata.namespace.as_deref(), &app.name_any())
}

/// Drops the backoff entry of an object that left the watch cache while a
/// retry was pending; `reconcile` never runs for it again.
fn forget_object(ctx: &ControllerContext, obj_ref: &ObjectRef<DynamicObject>) {
    ctx.reset_failures(&key_for(obj_ref.namespace.as_deref(), &obj_ref.name));
}

pub async fn run_controller(client: Client, cfg: ControllerConfig) -> anyhow::Result<()> {
    let api: Api<Application> = match cfg.watch_namespace() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    info!(
        namespace = cfg.watch_namespace().unwrap_or("*"),
        concurrency = cfg.concurrency,
        "starting application controller"
    );
    let concurrency = cfg.concurrency;
    let ctx = Arc::new(ControllerContext::new(
        Arc::new(KubeStore::new(client)),
        cfg,
    ));
    let state = ctx.clone();

    Controller::new(api, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| {
            let state = state.clone();
            async move {
                match res {
                    Ok((obj_ref, action)) => {
                        debug!(object = %obj_ref, "reconciled: requeue={:?}", action)
                    }
                    Err(controller::Error::ObjectNotFound(obj_ref)) => {
                        debug!(object = %obj_ref, "object gone, dropping backoff state");
                        forget_object(&state, &obj_ref);
                    }
                    Err(e) => error!(error = ?e, "reconcile error"),
                }
            }
        })
        .await;

    info!("application controller stopped");
    Ok(())
}

async fn reconcile(
    obj: Arc<Application>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();
    let outcome = reconcile_application(&ctx, &ns, &name).await?;
    ctx.reset_failures(&object_key(&obj));
    Ok(match outcome {
        ReconcileOutcome::Synced { .. } => Action::requeue(ctx.cfg.sync_period()),
        ReconcileOutcome::Gone => Action::await_change(),
    })
}

fn error_policy(
    obj: Arc<Application>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = object_key(&obj);
    let failures = ctx.record_failure(&key);
    let delay = ctx.cfg.backoff.delay(failures);
    warn!(%key, failures, ?delay, error = %error, "reconcile failed, backing off");
    Action::requeue(delay)
}
