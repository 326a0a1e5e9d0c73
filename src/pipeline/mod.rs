//! Pipeline - the reconciliation passes that turn node descriptions into
//! live, laid-out elements.

mod context;
mod info;
mod reconciler;

pub use context::{Context, ContextDelegate, Reconciliation};
pub use info::ReconciliationInfo;
pub use reconciler::ChangeFlags;
