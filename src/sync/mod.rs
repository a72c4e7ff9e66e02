//! Cross-component selection sync
//!
//! - Hub: per-group ordered event streams with selection and filter handles
//! - Bus: the visibility state machine each widget runs over its tokens

mod bus;
mod hub;

pub use bus::{SelectionSyncBus, SyncState, Transition};
pub use hub::{FilterHandle, GroupHub, GroupSubscription, SelectionHandle, SyncEvent};
