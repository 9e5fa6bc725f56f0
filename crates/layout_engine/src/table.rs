//! Flattened layout tables
//!
//! An owning container does not walk its subtree on every resize. Instead
//! it flattens, once per relayout, every component its session positions
//! into a [`LayoutTable`]: a list of `(offset_index, node)` entries plus a
//! parallel offset table. Offset slot 0 is the owner itself and always
//! means "no translation"; slot `i + 1` belongs to entry `i`. Children of a
//! shared container point at that container's slot, so after solving (in
//! the owner's absolute frame) their positions can be made relative to the
//! container they actually live in.
//!
//! The table is built breadth first, which guarantees that a container's
//! entry precedes the entries of its transferred children. The geometry
//! update relies on that ordering when it fills the offset table in a
//! single forward sweep.

use crate::{Result, Scene};
use scene_model::NodeId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    /// Slot in the offset table holding this entry's parent origin
    pub offset_index: usize,
    pub node: NodeId,
}

/// Entries positioned by one solver session, with their offset slots
#[derive(Debug, Clone, Default)]
pub struct LayoutTable {
    pub(crate) offsets: Vec<(f64, f64)>,
    pub(crate) entries: Vec<LayoutEntry>,
}

impl LayoutTable {
    /// An empty table holding only the owner's zero offset
    pub fn new() -> Self {
        Self {
            offsets: vec![(0.0, 0.0)],
            entries: Vec::new(),
        }
    }

    /// Append an entry and return its running index (its offset slot)
    pub(crate) fn push(&mut self, offset_index: usize, node: NodeId) -> usize {
        self.entries.push(LayoutEntry { offset_index, node });
        self.offsets.push((0.0, 0.0));
        self.offsets.len() - 1
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    /// Offsets recorded by the last geometry update
    pub fn offsets(&self) -> &[(f64, f64)] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| e.node == node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.node)
    }
}

impl Scene {
    /// Flatten everything `owner`'s session must position.
    ///
    /// Every constraints container met on the way is asked to transfer
    /// its layout to `owner`; only the children of those that accept are
    /// visited. Containers that decline appear as a single opaque entry.
    pub(crate) fn build_layout_table(&mut self, owner: NodeId) -> Result<LayoutTable> {
        let mut table = LayoutTable::new();
        let mut queue: VecDeque<(usize, NodeId)> =
            self.get(owner)?.children().map(|child| (0, child)).collect();

        while let Some((offset_index, node)) = queue.pop_front() {
            let running_index = table.push(offset_index, node);
            if self.get(node)?.is_constraints_container()
                && self.transfer_layout_ownership(node, owner)?
            {
                queue.extend(self.get(node)?.children().map(|child| (running_index, child)));
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Ownership};

    #[test]
    fn test_new_table_has_sentinel() {
        let table = LayoutTable::new();
        assert_eq!(table.offsets(), &[(0.0, 0.0)]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_push_returns_running_index() {
        let mut table = LayoutTable::new();
        let a = NodeId::new();
        let b = NodeId::new();
        assert_eq!(table.push(0, a), 1);
        assert_eq!(table.push(1, b), 2);
        assert_eq!(table.offsets().len(), table.len() + 1);
        assert!(table.contains(b));
    }

    #[test]
    fn test_breadth_first_with_transfer() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container().with_id("root"));
        let a = scene.insert(Component::leaf().with_id("a"));
        let shared = scene.insert(
            Component::constraints_container()
                .with_id("shared")
                .with_share_layout(true),
        );
        let b = scene.insert(Component::leaf().with_id("b"));
        let inner = scene.insert(Component::leaf().with_id("inner"));
        scene.add(shared, inner).unwrap();
        scene.add_all(root, &[shared, a, b]).unwrap();

        let table = scene.build_layout_table(root).unwrap();
        let nodes: Vec<NodeId> = table.nodes().collect();
        assert_eq!(nodes, vec![shared, a, b, inner]);
        // inner is offset by shared's slot (entry 0 -> slot 1)
        assert_eq!(table.entries()[3].offset_index, 1);
        assert!(table.entries()[..3].iter().all(|e| e.offset_index == 0));
        assert_eq!(
            scene.get(shared).unwrap().layout().unwrap().ownership(),
            Ownership::Transferred { owner: root }
        );
    }

    #[test]
    fn test_declining_container_is_opaque() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let solo = scene.insert(Component::constraints_container());
        let hidden = scene.insert(Component::leaf());
        scene.add(solo, hidden).unwrap();
        scene.add(root, solo).unwrap();

        let table = scene.build_layout_table(root).unwrap();
        assert_eq!(table.nodes().collect::<Vec<_>>(), vec![solo]);
        assert!(scene.get(solo).unwrap().layout().unwrap().owns_layout());
    }

    #[test]
    fn test_plain_container_children_not_visited() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let plain = scene.insert(Component::container());
        let leaf = scene.insert(Component::leaf());
        scene.add(plain, leaf).unwrap();
        scene.add(root, plain).unwrap();

        let table = scene.build_layout_table(root).unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.contains(leaf));
    }

    #[test]
    fn test_nested_transfer_precedes_children() {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container());
        let outer = scene.insert(Component::constraints_container().with_share_layout(true));
        let middle = scene.insert(Component::constraints_container().with_share_layout(true));
        let leaf = scene.insert(Component::leaf());
        scene.add(middle, leaf).unwrap();
        scene.add(outer, middle).unwrap();
        scene.add(root, outer).unwrap();

        let table = scene.build_layout_table(root).unwrap();
        assert_eq!(table.nodes().collect::<Vec<_>>(), vec![outer, middle, leaf]);
        for (i, entry) in table.entries().iter().enumerate() {
            assert!(entry.offset_index <= i);
        }
        assert_eq!(table.entries()[2].offset_index, 2);
    }
}
