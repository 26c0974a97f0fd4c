// src/flow/animation.rs
//! Timed hops between neighbouring rows.
//!
//! A request for a distant row is served as a chain of single-row hops; each
//! hop runs on the [`TimeLine`] and is split evenly across the remaining
//! distance so long trips do not take proportionally longer. Trips beyond
//! the fast-jump threshold snap whole multiples of it in one layout pass
//! and animate only the remainder.

use std::time::Duration;

use tracing::debug;

use super::{
    Flow,
    geometry::{Axis, PointF},
};

const MIN_STEP: Duration = Duration::from_millis(1);

/// Clock driving a single 0..=1 transition.
#[derive(Debug, Clone)]
pub(super) struct TimeLine {
    duration: Duration,
    elapsed: Duration,
    running: bool,
}

impl TimeLine {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: duration.max(MIN_STEP),
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration.max(MIN_STEP);
    }

    pub fn start(&mut self) {
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance by `dt`. Yields the progress while running; reaching 1 stops the clock.
    pub fn advance(&mut self, dt: Duration) -> Option<f32> {
        if !self.running {
            return None;
        }
        self.elapsed += dt;
        let t = (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
        if t >= 1.0 {
            self.running = false;
        }
        Some(t)
    }
}

/// Straight-line movement of one item during a hop.
#[derive(Debug, Clone, Copy)]
pub(super) struct AnimTrack {
    item: usize,
    from: PointF,
    to: PointF,
}

impl Flow {
    /// Bring `target` (clamped) to the centre, animating when visible.
    pub fn request_center(&mut self, target: usize) {
        let Some(row) = self.row else {
            return;
        };
        let target = self.clamp_row(target);

        if !self.visible {
            let index = self.index_for_row(target);
            self.set_center_index(&index);
            return;
        }

        self.new_row = Some(target);
        if target == row && !self.is_animating() {
            self.new_row = None;
            return;
        }

        let threshold = self.config.fast_jump_threshold;
        let distance = target.abs_diff(row);
        if threshold > 0 && distance > threshold {
            // whole threshold-sized jumps, leaving 1..=threshold rows to animate
            let jump = (distance - 1) / threshold * threshold;
            let landing = if target > row { row + jump } else { row - jump };
            debug!(from = row, to = landing, target, "fast jump");
            self.stop_animation();
            self.apply_center(landing);
            self.layout_static();
            self.new_row = Some(target);
            self.next_row = Some(if target > landing { landing + 1 } else { landing - 1 });
            self.prepare_animation();
            return;
        }

        // the running hop picks the new target up when it settles
        if self.is_animating() {
            return;
        }
        self.next_row = Some(if target > row { row + 1 } else { row - 1 });
        self.prepare_animation();
    }

    /// Advance the carousel clock by `dt`, applying queued model changes first.
    pub fn tick(&mut self, dt: Duration) {
        self.process_model_events();
        if let Some(t) = self.timeline.advance(dt) {
            self.anim_step(t);
        }
    }

    /// Abort the running hop, leaving any pending target in place.
    pub(super) fn stop_animation(&mut self) {
        if self.timeline.is_running() {
            debug!(row = ?self.row, next = ?self.next_row, "hop interrupted");
        }
        self.timeline.stop();
        self.tracks = [None, None];
        self.next_row = None;
        self.has_z_update = false;
    }

    /// Resume towards the pending target, if any.
    pub(super) fn continue_if(&mut self) {
        if let Some(target) = self.new_row.take() {
            self.request_center(target);
        }
    }

    fn prepare_animation(&mut self) {
        let (Some(row), Some(next), Some(target)) = (self.row, self.next_row, self.new_row) else {
            return;
        };
        if row >= self.items.len() || next >= self.items.len() {
            self.next_row = None;
            return;
        }
        for item in &mut self.items {
            item.save_x();
        }

        let size = self.config.item_size;
        let space = self.config.spacing;
        let center = PointF::new(self.x - size / 2.0, self.y);
        // the outgoing cover takes the first slot on the side it leaves towards
        let side = if next > row {
            PointF::new(self.x - size - space, self.y)
        } else {
            PointF::new(self.x + space, self.y)
        };
        self.tracks = [
            Some(AnimTrack {
                item: row,
                from: self.items[row].pos(),
                to: side,
            }),
            Some(AnimTrack {
                item: next,
                from: self.items[next].pos(),
                to: center,
            }),
        ];
        self.has_z_update = false;

        let distance = row.abs_diff(target).max(1) as u32;
        self.timeline.set_duration(self.config.step_duration / distance);
        self.timeline.start();
    }

    fn anim_step(&mut self, t: f32) {
        let (Some(row), Some(next)) = (self.row, self.next_row) else {
            return;
        };
        let len = self.items.len();
        if row >= len || next >= len {
            self.stop_animation();
            return;
        }

        let angle = self.config.angle;
        let scale = self.config.side_scale;
        let factor = scale + t * (1.0 - scale);
        let shift = self.config.spacing * t;
        let forward = next > row;
        let rotated = angle * t;

        let out_angle = if forward { -rotated } else { rotated };
        self.items[row].compute_transform(out_angle, Axis::Y, scale / factor, scale / factor);
        let in_angle = if forward { angle - rotated } else { rotated - angle };
        self.items[next].compute_transform(in_angle, Axis::Y, factor, factor);

        for track in self.tracks.iter().flatten() {
            self.items[track.item].set_pos(track.from.lerp(track.to, t));
        }

        let update_z = !self.has_z_update;
        let count = len as i32;
        for (i, item) in self.items.iter_mut().enumerate() {
            if i != row && i != next {
                let x = if forward {
                    item.saved_x() - shift
                } else {
                    item.saved_x() + shift
                };
                item.set_x(x);
            }
            if update_z {
                item.set_z(count - i.abs_diff(next) as i32);
            }
        }
        self.has_z_update = true;
        self.needs_repaint = true;

        if t >= 1.0 {
            self.finish_hop(next);
        }
    }

    fn finish_hop(&mut self, next: usize) {
        self.stop_animation();
        self.apply_center(next);
        self.layout_static();
        if self.new_row == Some(next) {
            self.new_row = None;
            self.emit_center_changed();
        } else {
            self.continue_if();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        config::FlowConfig,
        flow::model::{ModelIndex, StandardItem, StandardModel},
    };

    const FRAME: Duration = Duration::from_millis(16);

    fn flow_with(count: usize) -> (Flow, Rc<RefCell<StandardModel>>) {
        let rows = (0..count)
            .map(|i| StandardItem::new([format!("Album {i}")]))
            .collect();
        let model = Rc::new(RefCell::new(StandardModel::from_rows(rows)));
        let mut flow = Flow::new(FlowConfig::default());
        flow.bind_model(model.clone());
        (flow, model)
    }

    fn settle(flow: &mut Flow) -> usize {
        let mut frames = 0;
        while flow.is_animating() {
            flow.tick(FRAME);
            frames += 1;
            assert!(frames < 10_000, "animation never settled");
        }
        frames
    }

    #[test]
    fn timeline_stops_at_one() {
        let mut timeline = TimeLine::new(Duration::from_millis(40));
        assert_eq!(timeline.advance(FRAME), None);
        timeline.start();
        assert_eq!(timeline.advance(Duration::from_millis(20)), Some(0.5));
        assert_eq!(timeline.advance(Duration::from_millis(30)), Some(1.0));
        assert!(!timeline.is_running());
    }

    #[test]
    fn zero_duration_is_floored() {
        let mut timeline = TimeLine::new(Duration::ZERO);
        timeline.start();
        assert_eq!(timeline.advance(Duration::from_millis(1)), Some(1.0));
    }

    #[test]
    fn single_hop_takes_step_duration() {
        let (mut flow, _model) = flow_with(5);
        flow.request_center(1);
        assert!(flow.is_animating());
        let frames = settle(&mut flow);
        // 250 ms at 16 ms per frame
        assert_eq!(frames, 16);
        assert_eq!(flow.row(), Some(1));
    }

    #[test]
    fn request_for_current_row_is_ignored() {
        let (mut flow, _model) = flow_with(3);
        flow.request_center(0);
        assert!(!flow.is_animating());
    }

    #[test]
    fn mid_hop_z_follows_incoming_item() {
        let (mut flow, _model) = flow_with(5);
        flow.request_center(1);
        flow.tick(FRAME);
        let z: Vec<i32> = flow.items().iter().map(|i| i.z()).collect();
        assert_eq!(z, vec![4, 5, 4, 3, 2]);
    }

    #[test]
    fn tracks_move_outgoing_and_incoming_items() {
        let (mut flow, _model) = flow_with(3);
        let cx = flow.center_x();
        flow.request_center(1);
        flow.tick(Duration::from_millis(125));
        let outgoing = flow.items()[0].pos().x;
        let incoming = flow.items()[1].pos().x;
        assert!(outgoing < cx - 129.0 && outgoing > cx - 258.0 - 48.0);
        assert!(incoming < cx + 48.0 && incoming > cx - 129.0);
    }

    #[test]
    fn retarget_during_hop_continues_after_commit() {
        let (mut flow, _model) = flow_with(6);
        let centred = Rc::new(RefCell::new(Vec::new()));
        let sink = centred.clone();
        flow.on_center_changed(move |index| sink.borrow_mut().push(index.row()));

        flow.request_center(1);
        flow.tick(FRAME);
        flow.request_center(3);
        settle(&mut flow);

        assert_eq!(flow.row(), Some(3));
        assert_eq!(*centred.borrow(), vec![3]);
    }

    #[test]
    fn backward_hop_mirrors_forward() {
        let (mut flow, _model) = flow_with(4);
        flow.set_center_index(&ModelIndex::new(&[], 2, 0));
        flow.request_center(0);
        settle(&mut flow);
        assert_eq!(flow.row(), Some(0));
        assert!(flow.items()[0].transform().is_identity());
        assert_eq!(flow.items()[1].rotation(), 66.0);
    }

    #[test]
    fn hidden_carousel_jumps_without_animation() {
        let (mut flow, _model) = flow_with(8);
        flow.set_visible(false);
        flow.request_center(6);
        assert!(!flow.is_animating());
        assert_eq!(flow.row(), Some(6));
    }

    #[test]
    fn removal_during_hop_cancels_it() {
        let (mut flow, model) = flow_with(5);
        flow.request_center(3);
        flow.tick(FRAME);
        model.borrow_mut().remove_rows(&[], 4, 1);
        flow.tick(FRAME);
        assert!(!flow.is_animating());
        assert_eq!(flow.row(), Some(0));
        assert_eq!(flow.item_count(), 4);
    }

    #[test]
    fn resize_mid_hop_resumes_towards_target() {
        let (mut flow, _model) = flow_with(5);
        flow.request_center(2);
        flow.tick(FRAME);
        flow.resize(640, 400);
        assert!(flow.is_animating());
        settle(&mut flow);
        assert_eq!(flow.row(), Some(2));
    }

    #[test]
    fn z_order_holds_for_the_whole_hop() {
        let (mut flow, _model) = flow_with(5);
        flow.request_center(1);
        flow.tick(FRAME);
        let first: Vec<i32> = flow.items().iter().map(|i| i.z()).collect();
        for _ in 0..10 {
            flow.tick(FRAME);
            assert!(flow.is_animating());
            let z: Vec<i32> = flow.items().iter().map(|i| i.z()).collect();
            assert_eq!(z, first);
        }
    }

    #[test]
    fn fast_jump_across_large_library_lands_in_one_pass() {
        let (mut flow, _model) = flow_with(2000);
        flow.request_center(1999);

        assert_eq!(flow.row(), Some(1990));
        assert!(flow.is_animating());
        // the landing row is already laid out statically
        let cx = flow.center_x();
        assert_eq!(flow.items()[1990].pos().x, cx - 129.0);
        assert_eq!(flow.items()[1989].pos().x, cx - 258.0 - 48.0);
        assert_eq!(flow.items()[1991].pos().x, cx + 48.0);
        assert_eq!(flow.items()[0].z(), 10);

        settle(&mut flow);
        assert_eq!(flow.row(), Some(1999));
    }

    #[test]
    fn backward_fast_jump_keeps_remainder_within_threshold() {
        let (mut flow, _model) = flow_with(40);
        flow.set_center_index(&ModelIndex::new(&[], 39, 0));
        flow.request_center(3);
        assert_eq!(flow.row(), Some(9));
        assert!(flow.is_animating());
        settle(&mut flow);
        assert_eq!(flow.row(), Some(3));
    }
}
