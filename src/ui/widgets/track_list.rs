// src/ui/widgets/track_list.rs
//! Tracks of the centred album.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState},
};

/// Render `tracks`, marking the one playing (if it belongs to this album).
pub fn render_track_list(
    f: &mut Frame<'_>,
    area: Rect,
    album: &str,
    tracks: &[String],
    playing: Option<usize>,
    state: &mut ListState,
) {
    let items: Vec<ListItem> = tracks
        .iter()
        .enumerate()
        .map(|(i, title)| {
            if Some(i) == playing {
                ListItem::new(format!("▶ {:>2}. {title}", i + 1))
                    .style(Style::default().fg(Color::Green))
            } else {
                ListItem::new(format!("  {:>2}. {title}", i + 1))
            }
        })
        .collect();

    state.select(playing);
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!("1: {album}")))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));

    f.render_stateful_widget(list, area, state);
}
