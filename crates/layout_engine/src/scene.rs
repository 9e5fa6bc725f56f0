//! The component arena
//!
//! A [`Scene`] owns every [`Component`], keyed by [`NodeId`]. Parents refer
//! to children (and children to their parent) by id only, so ownership
//! transfer between layout sessions never needs shared pointers.
//!
//! Structural edits (adding, removing, destroying) and changes to layout
//! inputs invalidate the affected sessions; the work is redone lazily on
//! the next [`Scene::relayout`].

use crate::component::{Component, ContainerLayout, LayoutConstraints};
use crate::config::LayoutConfig;
use crate::namespace::Anchor;
use crate::{LayoutError, Result};
use cassowary::{Expression, Variable};
use scene_model::{BoxChange, NodeId, Padding, SizePolicies};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Attributes read back from the solver for every positioned component
const PRIMARY_ATTRIBUTES: [&str; 4] = ["left", "bottom", "layout_width", "layout_height"];

#[derive(Debug, Default)]
pub struct Scene {
    pub(crate) nodes: HashMap<NodeId, Component>,
    pub(crate) config: LayoutConfig,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Take ownership of a detached component
    pub fn insert(&mut self, component: Component) -> NodeId {
        let node = component.node();
        self.nodes.insert(node, component);
        node
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn component(&self, node: NodeId) -> Option<&Component> {
        self.nodes.get(&node)
    }

    pub(crate) fn get(&self, node: NodeId) -> Result<&Component> {
        self.nodes.get(&node).ok_or(LayoutError::NodeNotFound(node))
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Result<&mut Component> {
        self.nodes
            .get_mut(&node)
            .ok_or(LayoutError::NodeNotFound(node))
    }

    pub(crate) fn layout(&self, node: NodeId) -> Result<&ContainerLayout> {
        let component = self.get(node)?;
        component
            .layout()
            .ok_or_else(|| LayoutError::NotAContainer(component.id().to_string()))
    }

    pub(crate) fn layout_mut(&mut self, node: NodeId) -> Result<&mut ContainerLayout> {
        let component = self.get_mut(node)?;
        let id = component.id().to_string();
        component.layout_mut().ok_or(LayoutError::NotAContainer(id))
    }

    /// Child of `container` with the given id
    pub fn find(&self, container: NodeId, id: &str) -> Option<NodeId> {
        self.nodes.get(&container).and_then(|c| c.child(id))
    }

    pub fn position(&self, node: NodeId) -> Result<[f64; 2]> {
        Ok(self.get(node)?.position())
    }

    pub fn bounds(&self, node: NodeId) -> Result<[f64; 2]> {
        Ok(self.get(node)?.bounds())
    }

    pub fn add(&mut self, container: NodeId, child: NodeId) -> Result<()> {
        self.add_all(container, &[child])
    }

    /// Add several children at once; nothing is added if any is rejected
    pub fn add_all(&mut self, container: NodeId, children: &[NodeId]) -> Result<()> {
        let parent = self.get(container)?;
        if !parent.is_container() {
            return Err(LayoutError::NotAContainer(parent.id().to_string()));
        }

        let mut incoming = HashSet::new();
        for &child in children {
            let component = self.get(child)?;
            if component.parent().is_some() {
                return Err(LayoutError::AlreadyParented(component.id().to_string()));
            }
            if self.is_ancestor_or_self(child, container) {
                return Err(LayoutError::CyclicHierarchy {
                    container: parent.id().to_string(),
                    child: component.id().to_string(),
                });
            }
            let id = component.id();
            if id == parent.id() || parent.child(id).is_some() || !incoming.insert(id) {
                return Err(LayoutError::DuplicateId {
                    container: parent.id().to_string(),
                    id: id.to_string(),
                });
            }
        }

        for &child in children {
            let component = self.get_mut(child)?;
            component.parent = Some(container);
            let id = component.id().to_string();
            self.get_mut(container)?.children.insert(id, child);
        }
        for &child in children {
            self.sync_ownership(child)?;
        }
        self.invalidate(container)?;

        debug!(
            container = %self.get(container)?.id(),
            added = children.len(),
            "Added children"
        );
        Ok(())
    }

    /// Detach the child with `id` and hand it back
    pub fn remove(&mut self, container: NodeId, id: &str) -> Result<NodeId> {
        let parent = self.get_mut(container)?;
        if !parent.is_container() {
            return Err(LayoutError::NotAContainer(parent.id().to_string()));
        }
        let Some(child) = parent.children.shift_remove(id) else {
            return Err(LayoutError::UnknownChild {
                container: parent.id().to_string(),
                id: id.to_string(),
            });
        };
        // The owning session still lists the child until it is rebuilt
        self.invalidate(container)?;
        self.get_mut(child)?.parent = None;
        self.sync_ownership(child)?;

        debug!(container = %self.get(container)?.id(), child = %id, "Removed child");
        Ok(child)
    }

    /// Detach `node` and drop it together with its whole subtree
    pub fn destroy(&mut self, node: NodeId) -> Result<()> {
        let component = self.get(node)?;
        if let Some(parent) = component.parent() {
            let id = component.id().to_string();
            self.remove(parent, &id)?;
        }

        let mut queue = VecDeque::from([node]);
        let mut dropped = 0;
        while let Some(next) = queue.pop_front() {
            if let Some(component) = self.nodes.remove(&next) {
                queue.extend(component.children());
                dropped += 1;
            }
        }
        debug!(node = %node, dropped, "Destroyed subtree");
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(next) = current {
            if next == candidate {
                return true;
            }
            current = self.nodes.get(&next).and_then(|c| c.parent());
        }
        false
    }

    pub fn set_position(&mut self, node: NodeId, x: f64, y: f64) -> Result<()> {
        self.get_mut(node)?.geometry.set_position(x, y);
        Ok(())
    }

    /// Resize `node`; a constraints container refreshes its layout
    pub fn set_bounds(&mut self, node: NodeId, width: f64, height: f64) -> Result<()> {
        let component = self.get_mut(node)?;
        let changed = component.geometry.set_bounds(width, height);
        if changed == Some(BoxChange::Bounds) && component.is_constraints_container() {
            self.refresh(node)?;
        }
        Ok(())
    }

    pub fn set_layout_size_hint(&mut self, node: NodeId, hint: Option<(f64, f64)>) -> Result<()> {
        let component = self.get_mut(node)?;
        if component.layout_size_hint == hint {
            return Ok(());
        }
        component.layout_size_hint = hint;
        self.size_preferences_changed(node)
    }

    pub fn set_policies(&mut self, node: NodeId, policies: SizePolicies) -> Result<()> {
        let component = self.get_mut(node)?;
        if component.policies == policies {
            return Ok(());
        }
        component.policies = policies;
        self.size_preferences_changed(node)
    }

    pub fn set_layout_constraints(
        &mut self,
        container: NodeId,
        constraints: impl Into<LayoutConstraints>,
    ) -> Result<()> {
        self.layout_mut(container)?.layout_constraints = constraints.into();
        self.invalidate(container)
    }

    pub fn set_padding(&mut self, container: NodeId, padding: Padding) -> Result<()> {
        let layout = self.layout_mut(container)?;
        if layout.padding == padding {
            return Ok(());
        }
        layout.padding = padding;
        self.invalidate(container)
    }

    pub fn set_share_layout(&mut self, container: NodeId, share: bool) -> Result<()> {
        if self.layout(container)?.share_layout == share {
            return Ok(());
        }
        // Reach the current owner before the ownership state changes
        self.invalidate(container)?;
        self.layout_mut(container)?.share_layout = share;
        self.sync_ownership(container)?;
        self.invalidate(container)?;
        if let Some(parent) = self.get(container)?.parent() {
            if self.get(parent)?.is_constraints_container() {
                self.invalidate(parent)?;
            }
        }
        Ok(())
    }

    /// An expression for a named attribute of `node`
    pub fn anchor(&self, node: NodeId, anchor: Anchor) -> Result<Expression> {
        let component = self.get(node)?;
        if anchor.is_contents() && !component.is_constraints_container() {
            return Err(LayoutError::NotAContainer(component.id().to_string()));
        }
        Ok(component.namespace.anchor(anchor))
    }

    /// The solver variable behind an attribute of `node`
    pub fn variable(&self, node: NodeId, name: &str) -> Result<Variable> {
        Ok(self.get(node)?.namespace.variable(name))
    }

    /// Bind an attribute of `node` to an expression.
    ///
    /// `left`, `bottom`, `layout_width` and `layout_height` are the values
    /// written back after solving and cannot be rebound.
    pub fn define_symbol(&mut self, node: NodeId, name: &str, expr: Expression) -> Result<()> {
        let component = self.get(node)?;
        if PRIMARY_ATTRIBUTES.contains(&name) {
            return Err(LayoutError::ReservedAttribute {
                component: component.id().to_string(),
                name: name.to_string(),
            });
        }
        component.namespace.define(name, expr);
        if self.get(node)?.is_constraints_container() {
            self.invalidate(node)?;
        }
        if let Some(owner) = self.layout_owner_of(node)? {
            self.invalidate(owner)?;
        }
        Ok(())
    }

    /// `"<namespace>|<owner id>|<attribute>"` for a known variable
    pub fn variable_label(&self, var: Variable) -> Option<String> {
        self.nodes
            .values()
            .find_map(|component| component.namespace.label_of(var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_root() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let root = scene.insert(Component::constraints_container().with_id("root"));
        (scene, root)
    }

    #[test]
    fn test_add_and_find() {
        let (mut scene, root) = scene_with_root();
        let a = scene.insert(Component::leaf().with_id("a"));
        scene.add(root, a).unwrap();
        assert_eq!(scene.find(root, "a"), Some(a));
        assert_eq!(scene.get(a).unwrap().parent(), Some(root));
        assert!(scene.layout(root).unwrap().is_dirty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (mut scene, root) = scene_with_root();
        let a = scene.insert(Component::leaf().with_id("a"));
        let twin = scene.insert(Component::leaf().with_id("a"));
        scene.add(root, a).unwrap();
        let err = scene.add(root, twin).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateId { .. }));
        assert_eq!(scene.get(root).unwrap().children().count(), 1);
        assert_eq!(scene.get(twin).unwrap().parent(), None);
    }

    #[test]
    fn test_child_cannot_share_container_id() {
        let (mut scene, root) = scene_with_root();
        let twin = scene.insert(Component::leaf().with_id("root"));
        let err = scene.add(root, twin).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::DuplicateId { ref container, ref id } if container == "root" && id == "root"
        ));
        assert_eq!(scene.get(root).unwrap().children().count(), 0);
        assert_eq!(scene.get(twin).unwrap().parent(), None);
    }

    #[test]
    fn test_primary_attributes_cannot_be_rebound() {
        let mut scene = Scene::new();
        let leaf = scene.insert(Component::leaf().with_id("a"));
        let right = scene.anchor(leaf, Anchor::Right).unwrap();
        for name in PRIMARY_ATTRIBUTES {
            assert!(matches!(
                scene.define_symbol(leaf, name, right.clone()),
                Err(LayoutError::ReservedAttribute { .. })
            ));
            assert!(!scene.get(leaf).unwrap().namespace().is_symbol(name));
        }
        let left = scene.anchor(leaf, Anchor::Left).unwrap();
        scene.define_symbol(leaf, "baseline", left + 4.0).unwrap();
        assert!(scene.get(leaf).unwrap().namespace().is_symbol("baseline"));
    }

    #[test]
    fn test_add_all_is_atomic() {
        let (mut scene, root) = scene_with_root();
        let a = scene.insert(Component::leaf().with_id("a"));
        let b = scene.insert(Component::leaf().with_id("b"));
        let a2 = scene.insert(Component::leaf().with_id("a"));
        let err = scene.add_all(root, &[a, b, a2]).unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateId { ref id, .. } if id == "a"));
        assert_eq!(scene.get(root).unwrap().children().count(), 0);
        assert_eq!(scene.get(a).unwrap().parent(), None);
    }

    #[test]
    fn test_leaf_cannot_have_children() {
        let mut scene = Scene::new();
        let leaf = scene.insert(Component::leaf());
        let other = scene.insert(Component::leaf());
        assert!(matches!(
            scene.add(leaf, other),
            Err(LayoutError::NotAContainer(_))
        ));
    }

    #[test]
    fn test_already_parented() {
        let (mut scene, root) = scene_with_root();
        let other = scene.insert(Component::container());
        let a = scene.insert(Component::leaf());
        scene.add(root, a).unwrap();
        assert!(matches!(
            scene.add(other, a),
            Err(LayoutError::AlreadyParented(_))
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut scene, root) = scene_with_root();
        let inner = scene.insert(Component::container());
        scene.add(root, inner).unwrap();
        let err = scene.add(inner, root).unwrap_err();
        assert!(matches!(err, LayoutError::CyclicHierarchy { .. }));
        assert!(matches!(
            scene.add(root, root),
            Err(LayoutError::CyclicHierarchy { .. })
        ));
    }

    #[test]
    fn test_remove_returns_child() {
        let (mut scene, root) = scene_with_root();
        let a = scene.insert(Component::leaf().with_id("a"));
        scene.add(root, a).unwrap();
        assert_eq!(scene.remove(root, "a").unwrap(), a);
        assert_eq!(scene.get(a).unwrap().parent(), None);
        assert!(matches!(
            scene.remove(root, "a"),
            Err(LayoutError::UnknownChild { .. })
        ));
    }

    #[test]
    fn test_destroy_drops_subtree() {
        let (mut scene, root) = scene_with_root();
        let inner = scene.insert(Component::constraints_container());
        let leaf = scene.insert(Component::leaf());
        scene.add(inner, leaf).unwrap();
        scene.add(root, inner).unwrap();
        scene.destroy(inner).unwrap();
        assert_eq!(scene.len(), 1);
        assert!(scene.component(leaf).is_none());
        assert_eq!(scene.get(root).unwrap().children().count(), 0);
    }

    #[test]
    fn test_contents_anchor_requires_container() {
        let mut scene = Scene::new();
        let leaf = scene.insert(Component::leaf());
        assert!(scene.anchor(leaf, Anchor::Left).is_ok());
        assert!(scene.anchor(leaf, Anchor::ContentsLeft).is_err());
    }

    #[test]
    fn test_variable_label() {
        let mut scene = Scene::new();
        let leaf = scene.insert(Component::leaf().with_id("a"));
        let var = scene.variable(leaf, "left").unwrap();
        assert_eq!(
            scene.variable_label(var).as_deref(),
            Some("Component|a|left")
        );
        assert_eq!(scene.variable_label(Variable::new()), None);
    }
}
