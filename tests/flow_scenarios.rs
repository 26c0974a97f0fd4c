//! End-to-end carousel behaviour driven through the public API.

use std::{cell::RefCell, rc::Rc, time::Duration};

use flowtune::{
    config::FlowConfig,
    flow::{Flow, ListModel, ModelIndex, StandardItem, StandardModel},
};

const FRAME: Duration = Duration::from_millis(16);

fn library(titles: &[&str]) -> Rc<RefCell<StandardModel>> {
    let rows = titles
        .iter()
        .map(|t| StandardItem::new([*t, "Various"]))
        .collect();
    Rc::new(RefCell::new(StandardModel::from_rows(rows)))
}

fn numbered(count: usize) -> Rc<RefCell<StandardModel>> {
    let rows = (0..count)
        .map(|i| StandardItem::new([format!("Album {i}")]))
        .collect();
    Rc::new(RefCell::new(StandardModel::from_rows(rows)))
}

fn bind(model: &Rc<RefCell<StandardModel>>) -> Flow {
    let mut flow = Flow::new(FlowConfig::default());
    flow.bind_model(model.clone());
    flow
}

fn settle(flow: &mut Flow) {
    let mut frames = 0;
    while flow.is_animating() {
        flow.tick(FRAME);
        frames += 1;
        assert!(frames < 20_000, "animation never settled");
    }
}

fn record_centres(flow: &mut Flow) -> Rc<RefCell<Vec<usize>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    flow.on_center_changed(move |index| sink.borrow_mut().push(index.row()));
    seen
}

#[test]
fn requesting_the_last_of_three_albums() {
    let model = library(&["A", "B", "C"]);
    let mut flow = bind(&model);
    assert_eq!(flow.item_count(), 3);
    assert_eq!(flow.row(), Some(0));

    let seen = record_centres(&mut flow);
    flow.request_center(2);
    settle(&mut flow);

    assert_eq!(flow.row(), Some(2));
    assert_eq!(*seen.borrow(), vec![2]);
    assert_eq!(flow.caption().text, "C");
}

#[test]
fn removing_the_centred_album_moves_left() {
    let model = library(&["A", "B", "C"]);
    let mut flow = bind(&model);
    flow.set_center_index(&ModelIndex::new(&[], 1, 0));

    model.borrow_mut().remove_rows(&[], 1, 1);
    flow.tick(FRAME);

    assert_eq!(flow.item_count(), 2);
    assert_eq!(flow.row(), Some(0));
    assert_eq!(flow.caption().text, "A");
    assert!(!flow.is_animating());
}

#[test]
fn long_requests_jump_before_animating() {
    let model = numbered(20);
    let mut flow = bind(&model);

    flow.request_center(15);
    assert_eq!(flow.row(), Some(10));
    assert!(flow.is_animating());

    settle(&mut flow);
    assert_eq!(flow.row(), Some(15));
    assert_eq!(flow.caption().text, "Album 15");
}

#[test]
fn item_count_tracks_the_model() {
    let model = numbered(4);
    let mut flow = bind(&model);

    model
        .borrow_mut()
        .insert_rows(&[], 2, vec![StandardItem::new(["x"]), StandardItem::new(["y"])]);
    flow.tick(FRAME);
    assert_eq!(flow.item_count(), model.borrow().row_count(&[]));

    model.borrow_mut().remove_rows(&[], 0, 3);
    flow.tick(FRAME);
    assert_eq!(flow.item_count(), 3);

    model.borrow_mut().reset((0..7).map(|i| StandardItem::new([format!("{i}")])).collect());
    flow.tick(FRAME);
    assert_eq!(flow.item_count(), 7);

    model.borrow_mut().remove_rows(&[], 0, 7);
    flow.tick(FRAME);
    assert_eq!(flow.item_count(), 0);
    assert_eq!(flow.row(), None);
}

#[test]
fn every_target_converges() {
    let model = numbered(30);
    let mut flow = bind(&model);
    for target in [29, 3, 17, 0, 100, 12] {
        flow.request_center(target);
        settle(&mut flow);
        let row = flow.row().unwrap();
        assert_eq!(row, target.min(29));
        assert!(row < flow.item_count());
    }
}

#[test]
fn static_layout_z_falls_off_from_the_centre() {
    let model = numbered(9);
    let mut flow = bind(&model);
    flow.set_center_index(&ModelIndex::new(&[], 4, 0));

    let z: Vec<i32> = flow.items().iter().map(|item| item.z()).collect();
    for i in 0..4 {
        assert!(z[i] < z[i + 1], "{z:?}");
    }
    for i in 4..8 {
        assert!(z[i] > z[i + 1], "{z:?}");
    }
}

#[test]
fn covers_without_artwork_still_render() {
    let model = library(&["No Art", "Also None"]);
    let mut flow = bind(&model);
    flow.resize(320, 200);
    let frame = flow.render();
    assert_eq!(frame.dimensions(), (320, 200));
    assert!(flow.items().iter().all(|item| item.front().is_some()));
}
