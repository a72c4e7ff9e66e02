//! Error types for the Fulltext widget
//!
//! Only payload, markup and IO failures surface to the host. Unresolved
//! ids, empty selections and empty groups degrade in place and are
//! reported through the render/overlay/sync reports instead.

use thiserror::Error;

use crate::render::MarkupError;

/// Widget-wide result type
pub type Result<T> = std::result::Result<T, WidgetError>;

/// Widget error type
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
