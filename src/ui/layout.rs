// src/ui/layout.rs
//! Layout computation for the UI panels.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Visibility state for the optional sections.
#[derive(Debug, Clone, Copy)]
pub struct SectionVisibility {
    pub tracks: bool,
    pub player: bool,
    pub spectrum: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            tracks: true,
            player: true,
            spectrum: true,
        }
    }
}

impl SectionVisibility {
    /// Toggle a section by number (1-3).
    pub fn toggle(&mut self, section: usize) {
        match section {
            1 => self.tracks = !self.tracks,
            2 => self.player = !self.player,
            3 => self.spectrum = !self.spectrum,
            _ => {}
        }
    }
}

/// Computed layout areas for rendering.
#[derive(Debug, Clone, Copy)]
pub struct ComputedLayout {
    pub carousel: Rect,
    pub tracks: Option<Rect>,
    pub player: Option<Rect>,
    pub spectrum: Option<Rect>,
}

/// The carousel takes the top; the panel row beneath it holds the visible sections.
pub fn compute_layout(area: Rect, visibility: &SectionVisibility) -> ComputedLayout {
    let panel_row = visibility.tracks || visibility.player || visibility.spectrum;
    if !panel_row {
        return ComputedLayout {
            carousel: area,
            tracks: None,
            player: None,
            spectrum: None,
        };
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    // Column weights of the visible sections
    let mut weights = Vec::new();
    if visibility.tracks {
        weights.push(34u16);
    }
    if visibility.player {
        weights.push(33u16);
    }
    if visibility.spectrum {
        weights.push(33u16);
    }
    let sum: u16 = weights.iter().copied().sum();
    let constraints: Vec<Constraint> = weights
        .into_iter()
        .map(|w| Constraint::Percentage((u32::from(w) * 100 / u32::from(sum)) as u16))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(rows[1]);

    let mut next = columns.iter().copied();
    ComputedLayout {
        carousel: rows[0],
        tracks: visibility.tracks.then(|| next.next()).flatten(),
        player: visibility.player.then(|| next.next()).flatten(),
        spectrum: visibility.spectrum.then(|| next.next()).flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_sections_give_the_carousel_everything() {
        let area = Rect::new(0, 0, 120, 40);
        let visibility = SectionVisibility {
            tracks: false,
            player: false,
            spectrum: false,
        };
        let layout = compute_layout(area, &visibility);
        assert_eq!(layout.carousel, area);
        assert!(layout.tracks.is_none());
    }

    #[test]
    fn visible_sections_share_the_panel_row() {
        let mut visibility = SectionVisibility::default();
        visibility.toggle(2);
        let layout = compute_layout(Rect::new(0, 0, 120, 40), &visibility);
        let tracks = layout.tracks.unwrap();
        let spectrum = layout.spectrum.unwrap();
        assert!(layout.player.is_none());
        assert_eq!(tracks.y, spectrum.y);
        assert!(tracks.x < spectrum.x);
        assert!(layout.carousel.height > tracks.height);
    }
}
