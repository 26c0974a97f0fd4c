// src/ui/widgets/player_panel.rs
//! Now-playing panel: track details, transport controls and progress.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use crate::audio::TrackMetadata;

/// What the panel shows about the current track.
pub struct PlayerStatus<'a> {
    /// Title from the library, shown until the tags are loaded.
    pub title: Option<&'a str>,
    pub metadata: Option<&'a TrackMetadata>,
    pub elapsed_secs: u64,
    pub is_playing: bool,
    pub is_paused: bool,
}

fn clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Render the player panel.
pub fn render_player_panel(f: &mut Frame<'_>, area: Rect, status: &PlayerStatus<'_>) {
    f.render_widget(Block::default().borders(Borders::ALL).title("2: Player"), area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let mut lines: Vec<Line> = Vec::new();
    let title = status
        .metadata
        .and_then(|m| m.title.as_deref())
        .or(status.title);
    match title {
        Some(title) => lines.push(Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))),
        None => lines.push(Line::from("No track playing")),
    }
    if let Some(meta) = status.metadata {
        if let Some(artist) = &meta.artist {
            lines.push(Line::from(artist.clone()));
        }
        if let Some(album) = &meta.album {
            lines.push(Line::from(Span::styled(
                album.clone(),
                Style::default().fg(Color::Gray),
            )));
        }
        for (k, v) in meta.properties() {
            lines.push(Line::from(format!("{k}: {v}")));
        }
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner[0]);

    let play_pause = if !status.is_playing {
        Span::styled(" ⏵ ", Style::default().fg(Color::Gray))
    } else if status.is_paused {
        Span::styled(" ⏵ ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" ⏸ ", Style::default().fg(Color::Green))
    };
    let controls = Line::from(vec![
        Span::styled(" ⏮ ", Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(" ⏹ ", Style::default().fg(Color::Red)),
        Span::raw(" "),
        play_pause,
        Span::raw(" "),
        Span::styled(" ⏭ ", Style::default().fg(Color::Cyan)),
    ]);
    f.render_widget(Paragraph::new(controls).alignment(Alignment::Center), inner[1]);

    let duration = status.metadata.map_or(0, |m| m.duration_secs).max(1);
    let elapsed = status.elapsed_secs.min(duration);
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC))
            .ratio(elapsed as f64 / duration as f64)
            .label(format!("{} / {}", clock(elapsed), clock(duration))),
        inner[2],
    );
}
