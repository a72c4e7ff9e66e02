//! Annotation module
//!
//! Range annotations over token ids:
//! - Types: annotations, captured selections, dialog labels
//! - Store: per-widget annotation state with transactional capture
//! - Overlay: range coloring and selection capture

mod overlay;
mod store;
mod types;

pub use overlay::{
    AnnotationOverlay, CaptureOutcome, NoSelection, OverlayReport, SelectionEndpoint,
    TextSelection,
};
pub use store::{AnnotationStore, CaptureTicket};
pub use types::{
    Annotation, CapturedSelection, DialogLabel, SelectionDirection, DEFAULT_HIGHLIGHT_COLOR,
};
