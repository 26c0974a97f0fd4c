// src/ui/widgets/spectrum.rs
//! Spectrum bars drawn with block characters.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

/// Eighth-block characters from empty to full.
const EIGHTHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bar geometry for the spectrum panel.
pub struct SpectrumRenderer {
    /// Bar width in characters
    bar_width: usize,
    /// Gap between bars
    bar_gap: usize,
}

impl Default for SpectrumRenderer {
    fn default() -> Self {
        Self {
            bar_width: 2,
            bar_gap: 1,
        }
    }
}

impl SpectrumRenderer {
    /// Render `levels` (each in [0, 1]) as bars, lowest bin on the left.
    pub fn render(&self, f: &mut Frame<'_>, area: Rect, levels: &[f32], synthetic: bool) {
        let title = if synthetic {
            "3: Spectrum (idle)"
        } else {
            "3: Spectrum"
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        f.render_widget(block, area);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let lines = self.bar_lines(levels, inner.width as usize, inner.height as usize);
        let paragraph = Paragraph::new(lines.join("\n")).style(Style::default().fg(Color::Cyan));
        f.render_widget(paragraph, inner);
    }

    /// One string per terminal row, top row first.
    fn bar_lines(&self, levels: &[f32], width: usize, height: usize) -> Vec<String> {
        let spacing = self.bar_width + self.bar_gap;
        let bars = levels.len().min(width / spacing);
        // Resample so the whole spectrum fits even when the panel is narrow
        let sampled: Vec<f32> = (0..bars)
            .map(|i| {
                let from = i * levels.len() / bars.max(1);
                let to = ((i + 1) * levels.len() / bars.max(1)).max(from + 1);
                levels[from..to].iter().copied().fold(0.0, f32::max)
            })
            .collect();

        (0..height)
            .map(|row| {
                let row_from_bottom = height - row - 1;
                let mut line = String::with_capacity(width);
                for &level in &sampled {
                    let glyph = Self::glyph(level, row_from_bottom, height);
                    line.extend(std::iter::repeat_n(glyph, self.bar_width));
                    line.extend(std::iter::repeat_n(' ', self.bar_gap));
                }
                line
            })
            .collect()
    }

    /// Character for the cell `row_from_bottom` of a bar at `level`.
    fn glyph(level: f32, row_from_bottom: usize, height: usize) -> char {
        let eighths = (level.clamp(0.0, 1.0) * (height * 8) as f32).round() as usize;
        let filled = eighths.saturating_sub(row_from_bottom * 8).min(8);
        if filled == 0 && row_from_bottom == 0 {
            // keep a floor visible under silent bars
            EIGHTHS[1]
        } else {
            EIGHTHS[filled]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_bar_fills_every_row() {
        let lines = SpectrumRenderer::default().bar_lines(&[1.0], 3, 4);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with("██")));
    }

    #[test]
    fn half_bar_fills_the_bottom_half() {
        let lines = SpectrumRenderer::default().bar_lines(&[0.5], 3, 4);
        assert!(lines[0].starts_with("  "));
        assert!(lines[1].starts_with("  "));
        assert!(lines[2].starts_with("██"));
        assert!(lines[3].starts_with("██"));
    }

    #[test]
    fn silent_bars_keep_a_floor() {
        let lines = SpectrumRenderer::default().bar_lines(&[0.0, 0.0], 6, 2);
        assert_eq!(lines[1], "▁▁ ▁▁ ");
    }

    #[test]
    fn narrow_panels_resample() {
        let levels = vec![0.2; 32];
        let lines = SpectrumRenderer::default().bar_lines(&levels, 9, 1);
        assert_eq!(lines[0].chars().count(), 9);
    }
}
