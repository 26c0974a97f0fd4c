// src/ui/widgets/mod.rs
//! Widgets of the flowtune UI.

pub mod coverflow;
pub mod player_panel;
pub mod spectrum;
pub mod track_list;

// Re-export widget rendering functions
pub use coverflow::{coverflow_block, render_coverflow};
pub use player_panel::{PlayerStatus, render_player_panel};
pub use spectrum::SpectrumRenderer;
pub use track_list::render_track_list;
