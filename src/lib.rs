//! Fulltext
//!
//! Token-addressable text rendering with annotation overlay and
//! cross-component selection sync.
//!
//! # Modules
//!
//! - `registry`: id → token element mapping
//! - `render`: paragraph and flat-mode rendering into a container
//! - `annotations`: range coloring and dialog-backed selection capture
//! - `sync`: group hub and the visibility state machine
//! - `widget`: the host-facing component tying the above together

pub mod annotations;
pub mod config;
pub mod dialog;
pub mod error;
pub mod payload;
pub mod registry;
pub mod render;
pub mod sync;
pub mod widget;

pub use config::{CliConfig, RenderConfig, Settings};
pub use error::{Result, WidgetError};
pub use payload::RenderPayload;
pub use registry::{Token, TokenId, TokenRegistry};
pub use widget::{render_file, FulltextWidget};
