//! Finalizer tags and helpers
//!
//! Two finalizers gate the removal of objects owned by this operator:
//!
//! - [`FINALIZER`] is the generic tag. The private network controller owns it
//!   on `PrivateNetwork` objects. On `NetworkInterface` objects it is owned by
//!   the per-node interface agent, which clears it once the interface has been
//!   torn down on the host. The private network controller never removes it
//!   from a `NetworkInterface`.
//! - [`IP_FINALIZER`] only appears on `NetworkInterface` objects and is owned by
//!   the private network controller. It is cleared after the address has been
//!   released and the cloud NIC detached, which lets the API server finish
//!   deleting the object.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;

/// Generic finalizer
pub const FINALIZER: &str = "scaleway.com/finalizer";

/// Address finalizer, set on NetworkInterface objects only
pub const IP_FINALIZER: &str = "scaleway.com/finalizer-ip";

/// Returns true if `finalizer` is present on the object metadata
pub fn has_finalizer(meta: &ObjectMeta, finalizer: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|list| list.iter().any(|f| f == finalizer))
}

/// Adds `finalizer` to the metadata. Returns true if the list changed.
pub fn add_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    if has_finalizer(meta, finalizer) {
        return false;
    }
    meta.finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    true
}

/// Removes `finalizer` from the metadata. Returns true if the list changed.
pub fn remove_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    let Some(list) = meta.finalizers.as_mut() else {
        return false;
    };
    let before = list.len();
    list.retain(|f| f != finalizer);
    before != list.len()
}

/// Returns true once a delete request has been issued for the object
pub fn is_deleting(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some()
}

/// Finalizer helpers available on every resource kind
pub trait FinalizerExt: Resource {
    /// See [`is_deleting`]
    fn is_deleting(&self) -> bool {
        is_deleting(self.meta())
    }

    /// See [`has_finalizer`]
    fn has_finalizer(&self, finalizer: &str) -> bool {
        has_finalizer(self.meta(), finalizer)
    }
}

impl<K: Resource> FinalizerExt for K {}
