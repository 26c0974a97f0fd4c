// src/flow/mod.rs
//! Cover flow carousel: a perspective cascade of album covers bound to a list model.
//!
//! [`Flow`] owns the items (one per model row under the current root), lays
//! them out, animates the centred row and renders the whole scene into an
//! RGBA image. Everything runs on the caller's thread; the animation clock
//! advances only when the host calls [`Flow::tick`].

mod animation;
pub mod canvas;
pub mod geometry;
pub mod item;
pub mod model;
mod scene;

use std::{cell::RefCell, rc::Rc, sync::mpsc::Receiver};

use animation::{AnimTrack, TimeLine};
use geometry::PointF;

pub use canvas::Canvas;
pub use geometry::{Axis, RectF, Transform};
pub use item::FlowItem;
pub use model::{ListModel, ModelEvent, ModelIndex, StandardItem, StandardModel};

use crate::config::FlowConfig;

/// Shared handle to a bound model.
pub type SharedModel = Rc<RefCell<dyn ListModel>>;

type IndexListener = Box<dyn FnMut(&ModelIndex)>;

/// Text shown under the centred cover.
#[derive(Debug, Clone, Default)]
pub struct Caption {
    pub text: String,
    pub pos: PointF,
}

/// Horizontal range control that follows the centred row.
#[derive(Debug, Clone, Default)]
pub struct ScrubBar {
    pub min: usize,
    pub max: usize,
    pub value: usize,
    pub pos: PointF,
    pub width: f32,
    pub height: f32,
}

impl ScrubBar {
    pub fn set_range(&mut self, min: usize, max: usize) {
        self.min = min;
        self.max = max.max(min);
        self.value = self.value.clamp(self.min, self.max);
    }

    pub fn set_value(&mut self, value: usize) {
        self.value = value.clamp(self.min, self.max);
    }
}

/// The carousel widget state.
pub struct Flow {
    config: FlowConfig,
    model: Option<SharedModel>,
    events: Option<Receiver<ModelEvent>>,
    root: Vec<usize>,
    items: Vec<FlowItem>,

    /// Centred row; `None` iff there are no items.
    row: Option<usize>,
    /// Row the running hop moves to.
    next_row: Option<usize>,
    /// Row the user asked for and the controller has not reached yet.
    new_row: Option<usize>,
    saved_row: usize,
    center_index: Option<ModelIndex>,
    prev_center: Option<ModelIndex>,
    saved_center: Option<ModelIndex>,

    timeline: TimeLine,
    tracks: [Option<AnimTrack>; 2],
    has_z_update: bool,

    visible: bool,
    width: f32,
    height: f32,
    x: f32,
    y: f32,
    root_scale: f32,
    caption: Caption,
    scrub: ScrubBar,
    pressed: Option<usize>,
    needs_repaint: bool,

    center_changed: Vec<IndexListener>,
    opened: Vec<IndexListener>,
}

impl Flow {
    pub fn new(config: FlowConfig) -> Self {
        let (width, height) = config.viewport;
        let mut flow = Self {
            timeline: TimeLine::new(config.step_duration),
            scrub: ScrubBar {
                height: config.scrub_height,
                ..ScrubBar::default()
            },
            config,
            model: None,
            events: None,
            root: Vec::new(),
            items: Vec::new(),
            row: None,
            next_row: None,
            new_row: None,
            saved_row: 0,
            center_index: None,
            prev_center: None,
            saved_center: None,
            tracks: [None, None],
            has_z_update: false,
            visible: true,
            width: 0.0,
            height: 0.0,
            x: 0.0,
            y: 0.0,
            root_scale: 1.0,
            caption: Caption {
                text: "--".to_string(),
                pos: PointF::default(),
            },
            pressed: None,
            needs_repaint: true,
            center_changed: Vec::new(),
            opened: Vec::new(),
        };
        flow.resize(width, height);
        flow
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn items(&self) -> &[FlowItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Centred row, `None` while the carousel is empty.
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn center_index(&self) -> Option<&ModelIndex> {
        self.center_index.as_ref()
    }

    /// The centre before the most recent change.
    pub fn previous_center(&self) -> Option<&ModelIndex> {
        self.prev_center.as_ref()
    }

    /// The last non-zero centre, restored when the carousel is repopulated.
    pub fn saved_center(&self) -> Option<&ModelIndex> {
        self.saved_center.as_ref()
    }

    pub fn root_index(&self) -> &[usize] {
        &self.root
    }

    pub fn caption(&self) -> &Caption {
        &self.caption
    }

    pub fn scrub_bar(&self) -> &ScrubBar {
        &self.scrub
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_animating(&self) -> bool {
        self.timeline.is_running()
    }

    /// Viewport centre line the centred cover is placed on.
    pub fn center_x(&self) -> f32 {
        self.x
    }

    /// Top of every cover in scene coordinates.
    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn root_scale(&self) -> f32 {
        self.root_scale
    }

    /// True when something changed since the last [`Flow::render`].
    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    /// Called with the new centre once a transition settles or the centre is set directly.
    pub fn on_center_changed(&mut self, listener: impl FnMut(&ModelIndex) + 'static) {
        self.center_changed.push(Box::new(listener));
    }

    /// Called when the centred cover is activated twice.
    pub fn on_opened(&mut self, listener: impl FnMut(&ModelIndex) + 'static) {
        self.opened.push(Box::new(listener));
    }

    fn emit_center_changed(&mut self) {
        let Some(index) = self.center_index.clone() else {
            return;
        };
        for listener in &mut self.center_changed {
            listener(&index);
        }
    }

    fn emit_opened(&mut self, index: &ModelIndex) {
        for listener in &mut self.opened {
            listener(index);
        }
    }

    fn index_for_row(&self, row: usize) -> ModelIndex {
        ModelIndex::new(&self.root, row, 0)
    }

    fn clamp_row(&self, row: usize) -> usize {
        row.min(self.items.len().saturating_sub(1))
    }
}
