//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, sidebar, content pane and overlays
//! - `input`: keyboard and mouse handling, activity signals
//! - `styles`: color palette and text styling

pub mod input;
pub mod render;
pub mod styles;
