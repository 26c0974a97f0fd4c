// src/flow/scene.rs
//! Model binding, static layout, viewport geometry, pointer input and rendering.

use std::cmp::Reverse;

use embedded_graphics::mono_font::{MonoFont, ascii::FONT_10X20};
use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use super::{
    Flow, SharedModel,
    canvas::Canvas,
    geometry::{Axis, PointF, RectF, Transform},
    item::FlowItem,
    model::{ListModel, ModelEvent, ModelIndex},
};

const CAPTION_FONT: &MonoFont<'static> = &FONT_10X20;
const EMPTY_CAPTION: &str = "--";
const ZOOM_PER_WHEEL_UNIT: f32 = 0.001;

impl Flow {
    /// Bind `model`, dropping any previous binding, and rebuild from its top level.
    pub fn bind_model(&mut self, model: SharedModel) {
        self.clear();
        self.events = Some(model.borrow_mut().subscribe());
        self.model = Some(model);
        self.root.clear();
        self.saved_row = 0;
        self.saved_center = None;
        info!("model bound to carousel");
        self.reset();
    }

    pub fn model(&self) -> Option<&SharedModel> {
        self.model.as_ref()
    }

    /// Show the children of `root` instead of the current level.
    pub fn set_root_index(&mut self, root: &[usize]) {
        self.clear();
        self.root = root.to_vec();
        self.saved_row = 0;
        self.saved_center = None;
        info!(?root, "carousel root changed");
        self.reset();
    }

    /// Drop every item and rebuild one per row under the root.
    pub fn reset(&mut self) {
        self.clear();
        let count = self
            .model
            .as_ref()
            .map_or(0, |model| model.borrow().row_count(&self.root));
        if count > 0 {
            self.populate(0, count - 1);
            let saved = self.clamp_row(self.saved_row);
            self.scrub.set_value(saved);
        }
    }

    /// Remove all items and collapse the navigation state.
    pub fn clear(&mut self) {
        self.stop_animation();
        self.new_row = None;
        self.row = None;
        self.center_index = None;
        self.prev_center = None;
        self.pressed = None;
        self.items.clear();
        self.scrub.set_range(0, 0);
        self.scrub.set_value(0);
        self.update_caption();
    }

    /// Apply every change notification the bound model queued since the last call.
    ///
    /// The model has already reached its final state when the batch is read,
    /// so a reset anywhere in the batch supersedes every other event.
    pub fn process_model_events(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        let batch: Vec<ModelEvent> = events.try_iter().collect();
        if batch.is_empty() {
            return;
        }
        if batch
            .iter()
            .any(|e| matches!(e, ModelEvent::AboutToReset | ModelEvent::Reset))
        {
            debug!(events = batch.len(), "model reset, rebuilding carousel");
            self.reset();
            return;
        }

        for event in batch {
            match event {
                ModelEvent::RowsInserted { parent, start, end } => {
                    if parent == self.root {
                        self.rows_inserted(start, end);
                    } else {
                        self.track_root(&parent, start, end, true);
                    }
                }
                ModelEvent::RowsRemoved { parent, start, end } => {
                    if parent == self.root {
                        self.rows_removed(start, end);
                    } else if self.track_root(&parent, start, end, false) {
                        warn!(root = ?self.root, "carousel root was removed, showing top level");
                        self.set_root_index(&[]);
                        return;
                    }
                }
                ModelEvent::DataChanged {
                    top_left,
                    bottom_right,
                } => self.data_changed(&top_left, &bottom_right),
                ModelEvent::LayoutChanged => self.layout_changed(),
                ModelEvent::AboutToReset | ModelEvent::Reset => {}
            }
        }
    }

    /// Rows `start..=end` appeared under the root.
    pub fn rows_inserted(&mut self, start: usize, end: usize) {
        self.populate(start, end);
    }

    /// Insert one item per row of `start..=end` at the matching position.
    pub fn populate(&mut self, start: usize, end: usize) {
        if end < start {
            return;
        }
        self.stop_animation();
        self.new_row = None;

        let count = end - start + 1;
        let at = start.min(self.items.len());
        let fresh: Vec<FlowItem> = (0..count)
            .map(|_| FlowItem::new(&self.config, self.y))
            .collect();
        self.items.splice(at..at, fresh);
        self.scrub.set_range(0, self.items.len() - 1);

        // keep the centred cover in place when rows land in front of it
        let center = match self.row {
            None => self.saved_row,
            Some(row) if at <= row => row + count,
            Some(row) => row,
        };
        self.apply_center(center);
        self.layout_static();
    }

    /// Rows `start..=end` disappeared from under the root.
    pub fn rows_removed(&mut self, start: usize, end: usize) {
        if self.items.is_empty() || end < start || start >= self.items.len() {
            return;
        }
        // an in-flight hop may reference the items about to go
        self.stop_animation();
        self.new_row = None;

        let last = end.min(self.items.len() - 1);
        for i in (start..=last).rev() {
            self.items.remove(i);
        }
        let removed = last - start + 1;
        debug!(start, end = last, remaining = self.items.len(), "carousel rows removed");

        if self.items.is_empty() {
            self.clear();
            self.saved_row = 0;
            self.saved_center = None;
            return;
        }

        let row = self.row.unwrap_or(0);
        let center = if self.items.len() == 1 {
            0
        } else if (start..=last).contains(&row) {
            start.saturating_sub(1)
        } else if row > last {
            row - removed
        } else {
            row
        };
        self.scrub.set_range(0, self.items.len() - 1);
        self.apply_center(center);
        self.layout_static();
    }

    /// Mark the items of a changed range stale so they regenerate on the next paint.
    pub fn data_changed(&mut self, top_left: &ModelIndex, bottom_right: &ModelIndex) {
        if top_left.parent() != self.root.as_slice() || self.items.is_empty() {
            return;
        }
        let last = bottom_right.row().min(self.items.len() - 1);
        for item in self.items.iter_mut().take(last + 1).skip(top_left.row()) {
            item.mark_dirty();
        }
        if self
            .row
            .is_some_and(|row| (top_left.row()..=last).contains(&row))
        {
            self.update_caption();
        }
        self.needs_repaint = true;
    }

    /// Rows were reordered; every cached image may now belong to another row.
    pub fn layout_changed(&mut self) {
        for item in &mut self.items {
            item.mark_dirty();
        }
        self.update_caption();
        self.needs_repaint = true;
    }

    /// Centre `index` immediately, without animation.
    pub fn set_center_index(&mut self, index: &ModelIndex) {
        let index = index.primary();
        if index.parent() != self.root.as_slice() {
            return;
        }
        if self.items.is_empty() {
            self.saved_row = index.row();
            return;
        }
        self.stop_animation();
        self.new_row = None;
        self.apply_center(index.row());
        self.layout_static();
        self.emit_center_changed();
    }

    /// Record `row` (clamped) as the centre and refresh the caption and scrub bar.
    pub(super) fn apply_center(&mut self, row: usize) {
        if self.items.is_empty() {
            self.saved_row = row;
            return;
        }
        let row = self.clamp_row(row);
        let index = self.index_for_row(row);
        if row != 0 {
            self.saved_row = row;
            self.saved_center = Some(index.clone());
        } else if self.items.len() <= 1 {
            self.saved_row = 0;
        }
        self.prev_center = self.center_index.replace(index);
        self.row = Some(row);
        self.scrub.set_value(self.new_row.unwrap_or(row));
        self.update_caption();
    }

    /// Place the centred item flat in the middle and cascade the rest outwards.
    pub fn layout_static(&mut self) {
        let Some(row) = self.row else {
            return;
        };
        if row >= self.items.len() {
            return;
        }
        let count = self.items.len() as i32;
        let size = self.config.item_size;
        let angle = self.config.angle;
        let scale = self.config.side_scale;
        let space = self.config.spacing;
        let (x, y) = (self.x, self.y);

        let center = &mut self.items[row];
        center.set_z(count);
        center.set_pos(PointF::new(x - size / 2.0, y));
        center.reset_transform();

        let mut z = count - 1;
        let mut xpos = x + space;
        for item in &mut self.items[row + 1..] {
            item.set_pos(PointF::new(xpos, y));
            item.compute_transform(angle, Axis::Y, scale, scale);
            item.set_z(z);
            z -= 1;
            xpos += space;
        }

        let mut z = count - 1;
        let mut xpos = x - size - space;
        for item in self.items[..row].iter_mut().rev() {
            item.set_pos(PointF::new(xpos, y));
            item.compute_transform(-angle, Axis::Y, scale, scale);
            item.set_z(z);
            z -= 1;
            xpos -= space;
        }
        self.needs_repaint = true;
    }

    /// Recompute the viewport geometry and lay the items out again.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        let bottom = self.config.bottom_margin + self.config.scrub_height + self.config.caption_height;
        self.y = (self.height / 2.0 - self.config.item_size / 2.0) - bottom;
        self.x = self.width / 2.0;
        self.root_scale = (self.height / self.config.item_size * 0.8).min(1.0);

        self.scrub.width = self.width * 0.66;
        self.scrub.height = self.config.scrub_height;
        self.scrub.pos = PointF::new(
            (self.x - self.scrub.width / 2.0).round(),
            (self.height - (self.config.bottom_margin + self.config.scrub_height)).round(),
        );
        self.place_caption();

        let was_animating = self.is_animating();
        self.stop_animation();
        self.layout_static();
        if was_animating {
            self.continue_if();
        }
        self.needs_repaint = true;
    }

    /// Hidden carousels jump straight to requested rows.
    pub fn set_visible(&mut self, visible: bool) {
        let shown = visible && !self.visible;
        self.visible = visible;
        if shown {
            self.resize(self.width as u32, self.height as u32);
        }
    }

    /// Scale and origin applied to every item.
    pub fn root_transform(&self) -> Transform {
        let (cx, cy) = (self.width / 2.0, self.height / 2.0);
        Transform::IDENTITY
            .translate(cx, cy)
            .scale(self.root_scale, self.root_scale)
            .translate(-cx, -cy)
    }

    /// Topmost item whose silhouette covers `point`.
    pub fn item_at(&self, point: PointF) -> Option<usize> {
        let root = self.root_transform();
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by_key(|&i| Reverse(self.items[i].z()));
        order
            .into_iter()
            .find(|&i| self.items[i].contains(point, &root))
    }

    pub fn press(&mut self, point: PointF) {
        self.pressed = self.item_at(point);
    }

    /// Clicking a side cover brings it to the centre.
    pub fn release(&mut self, point: PointF) {
        let Some(pressed) = self.pressed.take() else {
            return;
        };
        if self.item_at(point) == Some(pressed) && Some(pressed) != self.row {
            self.scrub_to(pressed);
        }
    }

    pub fn double_click(&mut self, point: PointF) {
        let hit = self.item_at(point);
        if hit.is_some() && hit == self.row {
            self.open_center();
        }
    }

    /// Announce the centred row as opened.
    pub fn open_center(&mut self) {
        if let Some(index) = self.center_index.clone() {
            info!(row = index.row(), "carousel item opened");
            self.emit_opened(&index);
        }
    }

    /// Positive deltas step backwards. With `zoom` the scene scale changes instead.
    pub fn wheel(&mut self, delta: f32, zoom: bool) {
        if zoom {
            self.root_scale = (self.root_scale + delta * ZOOM_PER_WHEEL_UNIT).max(0.1);
            self.needs_repaint = true;
            return;
        }
        let value = self.scrub.value;
        let target = if delta > 0.0 {
            value.saturating_sub(1)
        } else {
            value + 1
        };
        self.scrub_to(target);
    }

    /// Move the scrub bar; the carousel follows with an animated request.
    pub fn scrub_to(&mut self, value: usize) {
        if self.items.is_empty() {
            return;
        }
        let value = value.clamp(self.scrub.min, self.scrub.max);
        self.scrub.set_value(value);
        self.request_center(value);
    }

    /// Compose the scene: background, covers in z order, vignette, caption, scrub bar.
    pub fn render(&mut self) -> RgbaImage {
        let (w, h) = (self.width.max(1.0) as u32, self.height.max(1.0) as u32);
        let mut canvas = Canvas::new(w, h);
        let [r, g, b] = self.config.background;
        canvas.fill(Rgba([r, g, b, 255]));

        let root = self.root_transform();
        let model = self.model.clone();
        let guard = model.as_ref().map(|m| m.borrow());
        let source: Option<&dyn ListModel> = guard.as_deref();

        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by_key(|&i| self.items[i].z());
        for i in order {
            let index = ModelIndex::new(&self.root, i, 0);
            let pos = self.items[i].pos();
            let to_device = root * Transform::translation(pos.x, pos.y);
            self.items[i].paint(source, &index, &mut canvas, &to_device);
        }
        drop(guard);

        canvas.radial_shade(PointF::new(w as f32 / 2.0, h as f32 * 0.75), w as f32 / 2.0);
        self.paint_caption(&mut canvas);
        self.paint_scrub_bar(&mut canvas);

        self.needs_repaint = false;
        canvas.into_image()
    }

    fn update_caption(&mut self) {
        self.caption.text = match (&self.model, &self.center_index) {
            (Some(model), Some(index)) => model.borrow().display_text(index).unwrap_or_default(),
            _ => EMPTY_CAPTION.to_string(),
        };
        self.place_caption();
        self.needs_repaint = true;
    }

    fn place_caption(&mut self) {
        let width = self.caption_width();
        self.caption.pos = PointF::new(
            (self.x - width / 2.0).max(0.0),
            self.height
                - (self.config.bottom_margin + self.config.scrub_height + self.config.caption_height),
        );
    }

    fn caption_width(&self) -> f32 {
        let glyph = CAPTION_FONT.character_size.width + CAPTION_FONT.character_spacing;
        (self.caption.text.chars().count() as u32 * glyph) as f32
    }

    fn paint_caption(&self, canvas: &mut Canvas) {
        if self.caption.text.is_empty() {
            return;
        }
        let bounds = RectF::new(
            self.caption.pos.x,
            self.caption.pos.y,
            self.caption_width().max(1.0),
            self.config.caption_height,
        );
        canvas.draw_text_box(&self.caption.text, bounds.translated(1.0, 1.0), CAPTION_FONT, [0, 0, 0]);
        canvas.draw_text_box(&self.caption.text, bounds, CAPTION_FONT, [255, 255, 255]);
    }

    fn paint_scrub_bar(&self, canvas: &mut Canvas) {
        let bar = &self.scrub;
        let groove = RectF::new(bar.pos.x, bar.pos.y, bar.width, bar.height);
        canvas.fill_rect(groove, Rgba([24, 28, 40, 192]));

        let span = (bar.max - bar.min + 1) as f32;
        let slider_width = (bar.width / span).max(16.0).min(bar.width);
        let travel = bar.width - slider_width;
        let offset = if bar.max > bar.min {
            travel * (bar.value - bar.min) as f32 / (bar.max - bar.min) as f32
        } else {
            0.0
        };
        let slider = RectF::new(
            groove.x + offset + 1.0,
            groove.y + 1.0,
            slider_width - 2.0,
            groove.height - 2.0,
        );
        canvas.fill_rect(slider, Rgba([222, 222, 230, 128]));
    }

    /// Keep the root path on the same node when rows change above it.
    /// Returns true when the root itself was removed.
    fn track_root(&mut self, parent: &[usize], start: usize, end: usize, inserted: bool) -> bool {
        let depth = parent.len();
        if self.root.len() <= depth || self.root[..depth] != *parent {
            return false;
        }
        let count = end - start + 1;
        let node = &mut self.root[depth];
        if inserted {
            if start <= *node {
                *node += count;
            }
        } else if *node > end {
            *node -= count;
        } else if *node >= start {
            return true;
        }
        false
    }
}
