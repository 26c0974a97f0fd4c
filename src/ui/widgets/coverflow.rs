// src/ui/widgets/coverflow.rs
//! The carousel frame, shown through the terminal's graphics protocol.

use ratatui::{
    Frame,
    layout::Rect,
    widgets::{Block, Borders},
};
use ratatui_image::{Image, protocol::Protocol};

/// Frame around the carousel; its inner area is what the scene is rendered for.
pub fn coverflow_block(albums: usize) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!("Albums ({albums})"))
}

/// Render the block and, once one has been encoded, the carousel image inside it.
pub fn render_coverflow(f: &mut Frame<'_>, area: Rect, albums: usize, frame: Option<&Protocol>) {
    let block = coverflow_block(albums);
    let inner = block.inner(area);
    f.render_widget(block, area);
    if let Some(proto) = frame {
        f.render_widget(Image::new(proto), inner);
    }
}
