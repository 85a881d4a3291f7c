//! Local-first storefront core
//!
//! Everything between the gateway client and the view layer: a redb
//! backed local store (order cache, tombstones, stock mirror, cart),
//! the reconciler that merges remote and locally known orders into
//! one consistent list, and the ownership resolver that scopes order
//! visibility to an actor.

pub mod events;
pub mod ownership;
pub mod reconcile;
pub mod store;

pub use events::{EventHub, StoreEvent};
pub use ownership::{OwnerPolicy, is_owner, visible_to};
pub use reconcile::{ReconcileError, ReconcileResult, Reconciler, merge};
pub use store::{LocalStore, StoreError, StoreResult};
