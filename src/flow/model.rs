// src/flow/model.rs
//! List model contract consumed by the carousel, plus an in-memory implementation.
//!
//! Models never call into their views. Mutations are announced as
//! [`ModelEvent`]s on channels handed out by [`ListModel::subscribe`]; the
//! view drains its channel from the UI loop, which keeps the model free to
//! be borrowed mutably by whoever owns it.

use std::sync::mpsc::{self, Receiver, Sender};

use image::DynamicImage;

/// Location of a cell: the row path of its parent, its row and its column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    parent: Vec<usize>,
    row: usize,
    column: usize,
}

impl ModelIndex {
    pub fn new(parent: &[usize], row: usize, column: usize) -> Self {
        Self {
            parent: parent.to_vec(),
            row,
            column,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Row path of the parent; empty for top-level rows.
    pub fn parent(&self) -> &[usize] {
        &self.parent
    }

    pub fn sibling(&self, row: usize, column: usize) -> ModelIndex {
        ModelIndex {
            parent: self.parent.clone(),
            row,
            column,
        }
    }

    /// The same row in the primary column.
    pub fn primary(&self) -> ModelIndex {
        self.sibling(self.row, 0)
    }

    /// Row path addressing this index's children.
    pub fn path(&self) -> Vec<usize> {
        let mut path = self.parent.clone();
        path.push(self.row);
        path
    }
}

/// Change notification published by a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// Rows `start..=end` were inserted under `parent`.
    RowsInserted {
        parent: Vec<usize>,
        start: usize,
        end: usize,
    },
    /// Rows `start..=end` were removed from under `parent`.
    RowsRemoved {
        parent: Vec<usize>,
        start: usize,
        end: usize,
    },
    DataChanged {
        top_left: ModelIndex,
        bottom_right: ModelIndex,
    },
    AboutToReset,
    Reset,
    /// Rows were reordered without insertion or removal.
    LayoutChanged,
}

/// Typed access to a hierarchical list of media items.
pub trait ListModel {
    fn row_count(&self, parent: &[usize]) -> usize;

    /// Display text of a cell; column 0 is the title, column 1 the subtitle.
    fn display_text(&self, index: &ModelIndex) -> Option<String>;

    /// Cover image of a row, if one is available.
    fn decoration(&self, index: &ModelIndex) -> Option<DynamicImage>;

    /// Register for change notifications. Dropping the receiver unsubscribes.
    fn subscribe(&mut self) -> Receiver<ModelEvent>;
}

/// One row of a [`StandardModel`].
#[derive(Debug, Clone, Default)]
pub struct StandardItem {
    pub columns: Vec<String>,
    pub decoration: Option<DynamicImage>,
    pub children: Vec<StandardItem>,
}

impl StandardItem {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            decoration: None,
            children: Vec::new(),
        }
    }

    pub fn with_decoration(mut self, image: DynamicImage) -> Self {
        self.decoration = Some(image);
        self
    }

    pub fn with_children(mut self, children: Vec<StandardItem>) -> Self {
        self.children = children;
        self
    }
}

/// In-memory tree model.
#[derive(Default)]
pub struct StandardModel {
    rows: Vec<StandardItem>,
    subscribers: Vec<Sender<ModelEvent>>,
}

impl StandardModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<StandardItem>) -> Self {
        Self {
            rows,
            subscribers: Vec::new(),
        }
    }

    pub fn item(&self, index: &ModelIndex) -> Option<&StandardItem> {
        self.children(index.parent())?.get(index.row())
    }

    /// Insert `items` under `parent` starting at `row` (clamped to the row count).
    pub fn insert_rows(&mut self, parent: &[usize], row: usize, items: Vec<StandardItem>) {
        if items.is_empty() {
            return;
        }
        let count = items.len();
        let Some(children) = self.children_mut(parent) else {
            return;
        };
        let start = row.min(children.len());
        children.splice(start..start, items);
        self.notify(ModelEvent::RowsInserted {
            parent: parent.to_vec(),
            start,
            end: start + count - 1,
        });
    }

    pub fn append_row(&mut self, parent: &[usize], item: StandardItem) {
        let row = self.row_count(parent);
        self.insert_rows(parent, row, vec![item]);
    }

    /// Remove `count` rows under `parent` starting at `row`.
    pub fn remove_rows(&mut self, parent: &[usize], row: usize, count: usize) {
        let Some(children) = self.children_mut(parent) else {
            return;
        };
        if count == 0 || row >= children.len() {
            return;
        }
        let end = (row + count).min(children.len());
        children.drain(row..end);
        self.notify(ModelEvent::RowsRemoved {
            parent: parent.to_vec(),
            start: row,
            end: end - 1,
        });
    }

    pub fn set_text(&mut self, index: &ModelIndex, text: impl Into<String>) {
        let Some(item) = self.item_mut(index) else {
            return;
        };
        let column = index.column();
        if item.columns.len() <= column {
            item.columns.resize(column + 1, String::new());
        }
        item.columns[column] = text.into();
        self.notify(ModelEvent::DataChanged {
            top_left: index.clone(),
            bottom_right: index.clone(),
        });
    }

    pub fn set_decoration(&mut self, index: &ModelIndex, image: Option<DynamicImage>) {
        let Some(item) = self.item_mut(index) else {
            return;
        };
        item.decoration = image;
        self.notify(ModelEvent::DataChanged {
            top_left: index.primary(),
            bottom_right: index.primary(),
        });
    }

    /// Replace every row.
    pub fn reset(&mut self, rows: Vec<StandardItem>) {
        self.notify(ModelEvent::AboutToReset);
        self.rows = rows;
        self.notify(ModelEvent::Reset);
    }

    /// Stable sort of the rows under `parent`.
    pub fn sort_by<F>(&mut self, parent: &[usize], mut compare: F)
    where
        F: FnMut(&StandardItem, &StandardItem) -> std::cmp::Ordering,
    {
        let Some(children) = self.children_mut(parent) else {
            return;
        };
        children.sort_by(|a, b| compare(a, b));
        self.notify(ModelEvent::LayoutChanged);
    }

    fn children(&self, path: &[usize]) -> Option<&Vec<StandardItem>> {
        let mut level = &self.rows;
        for &row in path {
            level = &level.get(row)?.children;
        }
        Some(level)
    }

    fn children_mut(&mut self, path: &[usize]) -> Option<&mut Vec<StandardItem>> {
        let mut level = &mut self.rows;
        for &row in path {
            level = &mut level.get_mut(row)?.children;
        }
        Some(level)
    }

    fn item_mut(&mut self, index: &ModelIndex) -> Option<&mut StandardItem> {
        self.children_mut(index.parent())?.get_mut(index.row())
    }

    fn notify(&mut self, event: ModelEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl ListModel for StandardModel {
    fn row_count(&self, parent: &[usize]) -> usize {
        self.children(parent).map_or(0, Vec::len)
    }

    fn display_text(&self, index: &ModelIndex) -> Option<String> {
        self.item(index)?.columns.get(index.column()).cloned()
    }

    fn decoration(&self, index: &ModelIndex) -> Option<DynamicImage> {
        self.item(&index.primary())?.decoration.clone()
    }

    fn subscribe(&mut self) -> Receiver<ModelEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(title: &str) -> StandardItem {
        StandardItem::new([title, "Artist"])
    }

    #[test]
    fn insert_and_remove_publish_ranges() {
        let mut model = StandardModel::new();
        let events = model.subscribe();

        model.insert_rows(&[], 0, vec![album("A"), album("B"), album("C")]);
        model.remove_rows(&[], 1, 5);

        assert_eq!(
            events.try_recv().unwrap(),
            ModelEvent::RowsInserted {
                parent: vec![],
                start: 0,
                end: 2
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            ModelEvent::RowsRemoved {
                parent: vec![],
                start: 1,
                end: 2
            }
        );
        assert_eq!(model.row_count(&[]), 1);
    }

    #[test]
    fn children_are_addressed_by_path() {
        let mut model = StandardModel::from_rows(vec![
            album("A").with_children(vec![StandardItem::new(["Track 1"])]),
        ]);
        assert_eq!(model.row_count(&[0]), 1);
        assert_eq!(
            model.display_text(&ModelIndex::new(&[0], 0, 0)).as_deref(),
            Some("Track 1")
        );
        assert_eq!(model.row_count(&[3]), 0);

        model.append_row(&[0], StandardItem::new(["Track 2"]));
        assert_eq!(model.row_count(&[0]), 2);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut model = StandardModel::new();
        drop(model.subscribe());
        model.append_row(&[], album("A"));
        assert!(model.subscribers.is_empty());
    }

    #[test]
    fn set_text_grows_columns() {
        let mut model = StandardModel::from_rows(vec![StandardItem::new(["A"])]);
        let index = ModelIndex::new(&[], 0, 2);
        model.set_text(&index, "2004");
        assert_eq!(model.display_text(&index).as_deref(), Some("2004"));
    }
}
