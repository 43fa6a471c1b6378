//! Declared-state reconciliation
//!
//! Shared machinery behind every mutating module.
//!
//! # Architecture
//!
//! - [`params`] - Normalizes module parameters into a [`DesiredConfig`]
//! - [`identity`] - Resolves zero or one remote resource by ID or label
//! - [`reconciler`] - Diffs mutable fields and applies them in one update
//! - [`poller`] - Waits for a status under the run-wide [`TimeoutContext`]
//! - [`result`] - Action record and result document
//!
//! # Example
//!
//! ```ignore
//! let current = identity::resolve(&client, "/profile/sshkeys", &Identity::label("ci"), None)
//!     .await?
//!     .ok_or_else(|| Error::NotFound("ci".into()))?;
//! Reconciler::new(&client, "/profile/sshkeys/1", &["label"])
//!     .apply(&current, &desired, &mut result.actions)
//!     .await?;
//! ```

pub mod identity;
pub mod params;
pub mod poller;
pub mod reconciler;
pub mod result;

pub use identity::{find_in, id_of, path_segment, resolve, Identity};
pub use params::{filter_null_values, DesiredConfig};
pub use poller::{
    allow_timeout, poll_condition, poll_until, status_in, wait_for_status, TimeoutContext,
};
pub use reconciler::{compute_diff, values_match, FieldChange, Reconciler};
pub use result::{ActionRecord, ModuleResult};
