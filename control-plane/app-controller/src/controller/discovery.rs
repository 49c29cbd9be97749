use futures_util::future::join_all;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use kube::{Resource, ResourceExt};
use tracing::{debug, instrument, warn};

use super::group_kind::normalize_all;
use crate::crd::{GroupKind, LabelSelector};
use crate::selector::{Selector, SelectorError};
use crate::store::{ResourceStore, StoreError};

/// A live member of an Application, as found by [`discover`].
#[derive(Clone, Debug)]
pub struct ComponentRecord {
    pub group_kind: GroupKind,
    pub resource: ApiResource,
    pub object: DynamicObject,
}

impl ComponentRecord {
    pub fn name(&self) -> String {
        self.object.name_any()
    }

    pub fn namespace(&self) -> Option<String> {
        self.object.namespace()
    }

    pub fn uid(&self) -> Option<String> {
        self.object.uid()
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.object.owner_references()
    }

    /// `apps/v1`, `v1`, ...
    pub fn group_version(&self) -> &str {
        &self.resource.api_version
    }

    /// API path of the object, e.g. `/apis/apps/v1/namespaces/ns/deployments/web`.
    pub fn link(&self) -> String {
        let ns = self.namespace();
        format!(
            "{}/{}",
            DynamicObject::url_path(&self.resource, ns.as_deref()),
            self.name()
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("listing {group_kind}: {source}")]
    List {
        group_kind: GroupKind,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub members: Vec<ComponentRecord>,
    pub errors: Vec<DiscoveryError>,
}

/// Lists the objects of every descriptor kind in `ns` that match `selector`.
///
/// Descriptors are normalized and de-duplicated first. Lists run
/// concurrently; members come back in descriptor order, then store order.
/// A failing kind contributes an error and no members.
#[instrument(skip_all, fields(ns = %ns, kinds = descriptors.len()))]
pub async fn discover(
    store: &dyn ResourceStore,
    ns: &str,
    selector: Option<&LabelSelector>,
    descriptors: &[GroupKind],
) -> Discovery {
    let selector = match Selector::from_label_selector(selector) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "rejecting component selector");
            return Discovery {
                members: Vec::new(),
                errors: vec![e.into()],
            };
        }
    };
    if selector.selects_nothing() {
        debug!("no selector, nothing to discover");
        return Discovery::default();
    }

    let kinds = normalize_all(descriptors);
    let selector = &selector;
    let results = join_all(kinds.into_iter().map(|gk| async move {
        let res = store.list_components(&gk, ns, selector).await;
        (gk, res)
    }))
    .await;

    let mut out = Discovery::default();
    for (gk, res) in results {
        match res {
            Ok(listed) => {
                debug!(kind = %gk, count = listed.items.len(), "listed components");
                out.members.extend(listed.items.into_iter().map(|object| ComponentRecord {
                    group_kind: gk.clone(),
                    resource: listed.resource.clone(),
                    object,
                }));
            }
            Err(source) => {
                warn!(kind = %gk, error = %source, "listing components failed");
                out.errors.push(DiscoveryError::List {
                    group_kind: gk,
                    source,
                });
            }
        }
    }
    out
}
