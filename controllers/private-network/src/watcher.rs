//! Kubernetes resource watchers.
//!
//! PrivateNetworks are driven by a `kube_runtime::Controller` that also watches
//! the NetworkInterfaces they own. Nodes are watched separately: when a node
//! joins or leaves the cluster every PrivateNetwork is reconciled again, since
//! no PrivateNetwork references nodes directly.

use crate::error::ControllerError;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::store::ObjectStoreTrait;
use crds::{NetworkInterface, PrivateNetwork};
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, ResourceExt};
use kube_runtime::watcher::{self, Event};
use kube_runtime::{
    Controller, WatchStreamExt,
    controller::{Action, Config as ControllerConfig},
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

async fn reconcile(pn: Arc<PrivateNetwork>, ctx: Arc<Reconciler>) -> Result<Action, ControllerError> {
    let name = pn.name_any();
    debug!("Reconciling PrivateNetwork {}", name);

    let outcome = ctx.reconcile_private_network(&name).await?;
    ctx.backoff().reset(&name);
    match outcome {
        ReconcileOutcome::Done => {
            ctx.metrics().record_reconcile("success");
            Ok(Action::await_change())
        }
        ReconcileOutcome::RequeueAfter(delay) => {
            ctx.metrics().record_reconcile("requeue");
            Ok(Action::requeue(delay))
        }
    }
}

fn error_policy(pn: Arc<PrivateNetwork>, error: &ControllerError, ctx: Arc<Reconciler>) -> Action {
    let name = pn.name_any();
    let (delay, count) = ctx.backoff().record_error(&name);
    ctx.metrics().record_reconcile("error");
    error!(
        "Reconciliation failed for PrivateNetwork {} (attempt {}), retrying in {:?}: {}",
        name, count, delay, error
    );
    Action::requeue(delay)
}

/// Run the PrivateNetwork controller until its stream ends.
///
/// Every `()` received on `resync` reconciles all known PrivateNetworks.
pub async fn watch_private_networks(
    private_networks: Api<PrivateNetwork>,
    network_interfaces: Api<NetworkInterface>,
    reconciler: Arc<Reconciler>,
    resync: UnboundedReceiver<()>,
    concurrency: u16,
) -> Result<(), ControllerError> {
    info!("Starting PrivateNetwork watcher");

    // Debounce batches the status writes a pass makes into one follow-up event
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(concurrency);

    Controller::new(private_networks, watcher::Config::default())
        .owns(network_interfaces, watcher::Config::default())
        .reconcile_all_on(resync)
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled PrivateNetwork {}", obj.name),
                Err(e) => warn!("PrivateNetwork controller error: {}", e),
            }
        })
        .await;

    Err(ControllerError::Watch("PrivateNetwork controller stopped".to_string()))
}

/// Node membership change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeChange {
    Created(String),
    Deleted(String),
}

/// Tracks which nodes exist, turning watch events into membership changes.
///
/// Updates to a node that is already known are not changes; a relist only
/// reports the nodes that appeared or disappeared since the previous listing.
#[derive(Debug, Default)]
pub struct NodeMembership {
    known: BTreeSet<String>,
    relisting: Option<BTreeSet<String>>,
}

impl NodeMembership {
    pub fn observe(&mut self, event: &Event<Node>) -> Vec<NodeChange> {
        match event {
            Event::Init => {
                self.relisting = Some(BTreeSet::new());
                Vec::new()
            }
            Event::InitApply(node) => {
                self.relisting
                    .get_or_insert_with(BTreeSet::new)
                    .insert(node.name_any());
                Vec::new()
            }
            Event::InitDone => {
                let listed = self.relisting.take().unwrap_or_default();
                let mut changes: Vec<NodeChange> = listed
                    .difference(&self.known)
                    .cloned()
                    .map(NodeChange::Created)
                    .collect();
                changes.extend(self.known.difference(&listed).cloned().map(NodeChange::Deleted));
                self.known = listed;
                changes
            }
            Event::Apply(node) => {
                let name = node.name_any();
                if self.known.insert(name.clone()) {
                    vec![NodeChange::Created(name)]
                } else {
                    Vec::new()
                }
            }
            Event::Delete(node) => {
                let name = node.name_any();
                if self.known.remove(&name) {
                    vec![NodeChange::Deleted(name)]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// Request a single reconciliation of every PrivateNetwork for a batch of node changes.
///
/// Returns the number of PrivateNetworks affected. A listing failure is logged
/// and swallowed; the periodic requeue of each network catches up.
pub async fn fan_out(store: &dyn ObjectStoreTrait, changes: &[NodeChange], resync: &UnboundedSender<()>) -> usize {
    if changes.is_empty() {
        return 0;
    }
    debug!("Node changes: {:?}", changes);

    let networks = match store.list_private_networks().await {
        Ok(networks) => networks,
        Err(e) => {
            warn!("Failed to list PrivateNetworks after {} node change(s): {}", changes.len(), e);
            return 0;
        }
    };
    if networks.is_empty() {
        return 0;
    }

    info!(
        "{} node change(s), reconciling {} PrivateNetwork(s)",
        changes.len(),
        networks.len()
    );
    if resync.unbounded_send(()).is_err() {
        warn!("PrivateNetwork controller is not running, dropping resync");
        return 0;
    }
    networks.len()
}

/// Watch nodes and trigger a resync of all PrivateNetworks on membership changes
pub async fn watch_nodes(
    nodes: Api<Node>,
    reconciler: Arc<Reconciler>,
    resync: UnboundedSender<()>,
) -> Result<(), ControllerError> {
    info!("Starting Node watcher");

    let mut membership = NodeMembership::default();
    let mut events = watcher::watcher(nodes, watcher::Config::default()).default_backoff().boxed();

    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                let changes = membership.observe(&event);
                fan_out(reconciler.store(), &changes, &resync).await;
            }
            Err(e) => warn!("Node watch error: {}", e),
        }
    }

    Err(ControllerError::Watch("Node watch stream ended".to_string()))
}
