// src/app/state.rs
//! Application state: the album library, the carousel, playback and the visualizer.

use std::{
    cell::RefCell,
    collections::HashMap,
    path::PathBuf,
    rc::Rc,
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::event::{KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use image::DynamicImage;
use ratatui::{Frame, layout::Rect, widgets::ListState};
use ratatui_image::{Resize, picker::Picker, protocol::Protocol};
use tracing::{debug, info, warn};

use crate::{
    audio::{MusicPlayer, TrackMetadata, VisualizerBridge, load_metadata},
    config::Config,
    flow::{Flow, ListModel, ModelIndex, StandardItem, StandardModel, geometry::PointF},
    fs::{
        Album,
        library::{ALBUM_COLUMN, PATH_COLUMN},
        spawn_scan,
    },
    ui::{
        keybindings::{Action, PAGE_STEP, key_to_action},
        layout::{SectionVisibility, compute_layout},
        widgets::{
            PlayerStatus, SpectrumRenderer, coverflow_block, render_coverflow,
            render_player_panel, render_track_list,
        },
    },
};

/// Two presses on the same cell within this window count as a double click.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);
/// Wheel delta reported for one scroll notch.
const WHEEL_NOTCH: f32 = 120.0;

/// A track queued from an opened album.
struct QueuedTrack {
    title: String,
    path: PathBuf,
}

/// Main application state.
pub struct App {
    /// Album rows with their tracks as children
    model: Rc<RefCell<StandardModel>>,
    flow: Flow,
    /// Albums streamed from the background scanner
    library_rx: Receiver<Album>,
    /// Model row of every album key seen so far
    album_rows: HashMap<(String, String), usize>,
    /// Albums opened from the carousel
    opened_rx: Receiver<ModelIndex>,

    /// Image picker for the carousel frame
    picker: Picker,
    /// Last encoded carousel frame
    frame: Option<Protocol>,
    /// Cell area the carousel was last rendered for
    frame_area: Rect,

    player: MusicPlayer,
    visualizer: VisualizerBridge,
    spectrum: SpectrumRenderer,
    queue: Vec<QueuedTrack>,
    queue_album: Option<ModelIndex>,
    current: Option<usize>,
    elapsed: Duration,

    /// Metadata channel sender (background loader -> UI)
    meta_tx: Sender<(PathBuf, TrackMetadata)>,
    meta_rx: Receiver<(PathBuf, TrackMetadata)>,
    metadata: Option<TrackMetadata>,

    visibility: SectionVisibility,
    track_state: ListState,
    last_press: Option<(Instant, u16, u16)>,
}

impl App {
    /// Create the application and start scanning `config.library_dir`.
    pub fn new(config: &Config) -> Result<Self> {
        // Fall back to a typical cell size if the terminal does not answer the query
        let picker = Picker::from_query_stdio().unwrap_or_else(|_| Picker::from_fontsize((8, 16)));

        let model = Rc::new(RefCell::new(StandardModel::new()));
        let mut flow = Flow::new(config.flow.clone());
        flow.bind_model(model.clone());
        let (opened_tx, opened_rx) = mpsc::channel();
        flow.on_opened(move |index| {
            let _ = opened_tx.send(index.clone());
        });

        let player = MusicPlayer::new(config.visualizer.tap_frames);
        let visualizer = VisualizerBridge::new(Some(Box::new(player.audio_tap())), &config.visualizer);
        let (meta_tx, meta_rx) = mpsc::channel();

        info!(library = %config.library_dir.display(), "scanning library");
        Ok(Self {
            model,
            flow,
            library_rx: spawn_scan(config.library_dir.clone()),
            album_rows: HashMap::new(),
            opened_rx,
            picker,
            frame: None,
            frame_area: Rect::default(),
            player,
            visualizer,
            spectrum: SpectrumRenderer::default(),
            queue: Vec::new(),
            queue_album: None,
            current: None,
            elapsed: Duration::ZERO,
            meta_tx,
            meta_rx,
            metadata: None,
            visibility: SectionVisibility::default(),
            track_state: ListState::default(),
            last_press: None,
        })
    }

    /// Advance everything by `dt`: new albums, the carousel clock, playback state, levels.
    pub fn tick(&mut self, dt: Duration) {
        self.add_scanned_albums();
        self.flow.tick(dt);
        while let Ok(index) = self.opened_rx.try_recv() {
            self.open_album(&index);
        }

        self.process_metadata();
        if self.player.take_finished() {
            self.advance_after_end();
        }
        if self.player.is_playing() && !self.player.is_paused() {
            self.elapsed += dt;
        }
        self.visualizer.poll_levels();
    }

    /// Move albums from the scanner into the model in one insertion. Parts of
    /// an album already shown are added to its row as extra tracks.
    fn add_scanned_albums(&mut self) {
        let base = self.model.borrow().row_count(&[]);
        let mut fresh: Vec<StandardItem> = Vec::new();
        while let Ok(album) = self.library_rx.try_recv() {
            let key = album.key();
            let title = album.title.clone();
            let item = album.into_item();
            match self.album_rows.get(&key).copied() {
                Some(row) if row >= base => fresh[row - base].children.extend(item.children),
                Some(row) => {
                    debug!(album = %title, tracks = item.children.len(), "more tracks for a known album");
                    self.model
                        .borrow_mut()
                        .insert_rows(&[row], usize::MAX, item.children);
                }
                None => {
                    self.album_rows.insert(key, base + fresh.len());
                    fresh.push(item);
                }
            }
        }
        if !fresh.is_empty() {
            debug!(albums = fresh.len(), "albums added");
            self.model.borrow_mut().insert_rows(&[], base, fresh);
        }
    }

    /// Handle a key event and return true if the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        match key_to_action(&key) {
            Action::Previous => self.step_back(1),
            Action::Next => self.step_forward(1),
            Action::PageBack => self.step_back(PAGE_STEP),
            Action::PageForward => self.step_forward(PAGE_STEP),
            Action::First => self.flow.scrub_to(0),
            Action::Last => self.flow.scrub_to(self.flow.item_count().saturating_sub(1)),
            Action::Open => self.flow.open_center(),
            Action::TogglePause => {
                if self.player.is_paused() {
                    self.player.resume();
                } else {
                    self.player.pause();
                }
            }
            Action::Stop => {
                self.player.stop();
                self.current = None;
                self.elapsed = Duration::ZERO;
            }
            Action::NextTrack => self.play_adjacent(1),
            Action::PreviousTrack => self.play_adjacent(-1),
            Action::ToggleSection(section) => self.visibility.toggle(section),
            Action::Quit => {
                self.player.stop();
                return true;
            }
            Action::None => {}
        }
        false
    }

    /// Forward mouse input over the carousel to the scene.
    pub fn on_mouse(&mut self, event: MouseEvent) {
        let Some(point) = self.scene_point(event.column, event.row) else {
            return;
        };
        let zoom = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                let repeated = self.last_press.is_some_and(|(at, col, row)| {
                    now.duration_since(at) <= DOUBLE_CLICK && col == event.column && row == event.row
                });
                if repeated {
                    self.last_press = None;
                    self.flow.double_click(point);
                } else {
                    self.last_press = Some((now, event.column, event.row));
                    self.flow.press(point);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.flow.release(point),
            MouseEventKind::ScrollUp => self.flow.wheel(WHEEL_NOTCH, zoom),
            MouseEventKind::ScrollDown => self.flow.wheel(-WHEEL_NOTCH, zoom),
            _ => {}
        }
    }

    /// Draw the application UI.
    pub fn draw(&mut self, f: &mut Frame<'_>) {
        let layout = compute_layout(f.area(), &self.visibility);
        let albums = self.flow.item_count();

        self.refresh_frame(coverflow_block(albums).inner(layout.carousel));
        render_coverflow(f, layout.carousel, albums, self.frame.as_ref());

        if let Some(area) = layout.tracks {
            let (album, tracks) = self.centred_tracks();
            let playing = match (&self.queue_album, self.flow.center_index()) {
                (Some(queued), Some(centred)) if queued == centred => self.current,
                _ => None,
            };
            render_track_list(f, area, &album, &tracks, playing, &mut self.track_state);
        }

        if let Some(area) = layout.player {
            let status = PlayerStatus {
                title: self
                    .current
                    .and_then(|i| self.queue.get(i))
                    .map(|t| t.title.as_str()),
                metadata: self.metadata.as_ref(),
                elapsed_secs: self.elapsed.as_secs(),
                is_playing: self.player.is_playing(),
                is_paused: self.player.is_paused(),
            };
            render_player_panel(f, area, &status);
        }

        if let Some(area) = layout.spectrum {
            self.spectrum.render(
                f,
                area,
                self.visualizer.levels(),
                self.visualizer.is_synthetic(),
            );
        }
    }

    /// Re-render and re-encode the carousel when the area or the scene changed.
    fn refresh_frame(&mut self, area: Rect) {
        if area.width == 0 || area.height == 0 {
            self.frame = None;
            return;
        }
        let resized = area != self.frame_area;
        if resized {
            let (cell_w, cell_h) = self.picker.font_size();
            self.flow.resize(
                u32::from(area.width) * u32::from(cell_w),
                u32::from(area.height) * u32::from(cell_h),
            );
            self.frame_area = area;
        }
        if !resized && self.frame.is_some() && !self.flow.needs_repaint() {
            return;
        }

        let image = DynamicImage::ImageRgba8(self.flow.render());
        let size = Rect::new(0, 0, area.width, area.height);
        match self.picker.new_protocol(image, size, Resize::Fit(None)) {
            Ok(proto) => self.frame = Some(proto),
            Err(err) => warn!("cannot encode carousel frame: {err:?}"),
        }
    }

    /// Scene coordinates of the centre of a terminal cell inside the carousel.
    fn scene_point(&self, column: u16, row: u16) -> Option<PointF> {
        let area = self.frame_area;
        let inside = column >= area.x
            && row >= area.y
            && column < area.x + area.width
            && row < area.y + area.height;
        if !inside {
            return None;
        }
        let (cell_w, cell_h) = self.picker.font_size();
        let (cell_w, cell_h) = (f32::from(cell_w), f32::from(cell_h));
        Some(PointF::new(
            f32::from(column - area.x) * cell_w + cell_w / 2.0,
            f32::from(row - area.y) * cell_h + cell_h / 2.0,
        ))
    }

    fn step_back(&mut self, rows: usize) {
        let value = self.flow.scrub_bar().value;
        self.flow.scrub_to(value.saturating_sub(rows));
    }

    fn step_forward(&mut self, rows: usize) {
        let value = self.flow.scrub_bar().value;
        self.flow.scrub_to(value + rows);
    }

    /// Title and track titles of the centred album.
    fn centred_tracks(&self) -> (String, Vec<String>) {
        let Some(index) = self.flow.center_index() else {
            return ("Tracks".to_string(), Vec::new());
        };
        let model = self.model.borrow();
        let album = model
            .display_text(&index.sibling(index.row(), ALBUM_COLUMN))
            .unwrap_or_default();
        let path = index.path();
        let tracks = (0..model.row_count(&path))
            .map(|i| model.display_text(&ModelIndex::new(&path, i, 0)).unwrap_or_default())
            .collect();
        (album, tracks)
    }

    /// Queue the tracks of the album at `index` and start the first one.
    fn open_album(&mut self, index: &ModelIndex) {
        let path = index.path();
        let queue: Vec<QueuedTrack> = {
            let model = self.model.borrow();
            (0..model.row_count(&path))
                .filter_map(|i| {
                    let title = model.display_text(&ModelIndex::new(&path, i, 0))?;
                    let file = model.display_text(&ModelIndex::new(&path, i, PATH_COLUMN))?;
                    Some(QueuedTrack {
                        title,
                        path: PathBuf::from(file),
                    })
                })
                .collect()
        };
        if queue.is_empty() {
            return;
        }
        info!(album = index.row(), tracks = queue.len(), "album opened");
        self.queue = queue;
        self.queue_album = Some(index.clone());
        self.play_track(0);
    }

    fn play_track(&mut self, position: usize) {
        let Some(track) = self.queue.get(position) else {
            return;
        };
        let path = track.path.clone();
        if let Err(err) = self.player.play(&path) {
            warn!("cannot start {}: {err:#}", path.display());
            return;
        }
        self.current = Some(position);
        self.elapsed = Duration::ZERO;
        self.metadata = None;

        // Load tags off the UI thread
        let tx = self.meta_tx.clone();
        thread::spawn(move || match load_metadata(&path) {
            Ok(meta) => {
                let _ = tx.send((path, meta));
            }
            Err(err) => debug!("{err:#}"),
        });
    }

    /// Play the next or previous queued track, wrapping around.
    fn play_adjacent(&mut self, direction: isize) {
        if self.queue.is_empty() {
            return;
        }
        let len = self.queue.len() as isize;
        let next = match self.current {
            Some(i) => (i as isize + direction).rem_euclid(len),
            None if direction > 0 => 0,
            None => len - 1,
        };
        self.play_track(next as usize);
    }

    fn advance_after_end(&mut self) {
        match self.current {
            Some(i) if i + 1 < self.queue.len() => self.play_track(i + 1),
            _ => {
                self.current = None;
                self.elapsed = Duration::ZERO;
            }
        }
    }

    /// Accept metadata that belongs to the track still playing.
    fn process_metadata(&mut self) {
        while let Ok((path, meta)) = self.meta_rx.try_recv() {
            let current = self.current.and_then(|i| self.queue.get(i));
            if current.is_some_and(|t| t.path == path) {
                self.metadata = Some(meta);
            }
        }
    }
}
