//! Core of an IDEF0 process diagram editor.
//!
//! Holds the process/resource port model and lays diagrams out around a
//! primary process, switching between landscape and portrait arrangements with
//! the viewport. [`Editor`] ties layout, change watching and connection refresh
//! into one session; [`wasm`] exposes it to the browser.

pub mod editor;
mod error;
pub mod layout;
pub mod model;
pub mod output;
pub mod refresh;
pub mod wasm;
pub mod watcher;

pub use editor::{Editor, EditorConfig};
pub use error::{Error, Result};
pub use layout::{LayoutConfig, LayoutMode, LayoutResult, Viewport, layout_pass};
pub use model::{Diagram, DiagramSnapshot};
