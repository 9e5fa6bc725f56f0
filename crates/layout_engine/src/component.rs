//! Scene components
//!
//! A [`Component`] is a positioned box with layout preferences. Containers
//! additionally own an ordered, id-keyed set of children; constraints
//! containers also carry the state of their layout session.

use crate::helpers::LayoutItem;
use crate::namespace::ConstraintsNamespace;
use crate::solver::LayoutManager;
use crate::table::LayoutTable;
use crate::Scene;
use indexmap::IndexMap;
use scene_model::{CoordinateBox, NodeId, Padding, SizePolicies};
use std::rc::Rc;

/// A function from the declaring container to its layout items
pub type ConstraintsFn = Rc<dyn Fn(&Scene, NodeId) -> Vec<LayoutItem>>;

/// The layout intent of a constraints container
#[derive(Clone)]
pub enum LayoutConstraints {
    Items(Vec<LayoutItem>),
    /// Re-evaluated on every constraint generation
    Computed(ConstraintsFn),
}

impl LayoutConstraints {
    pub fn computed(f: impl Fn(&Scene, NodeId) -> Vec<LayoutItem> + 'static) -> Self {
        LayoutConstraints::Computed(Rc::new(f))
    }

    pub(crate) fn evaluate(&self, scene: &Scene, container: NodeId) -> Vec<LayoutItem> {
        match self {
            LayoutConstraints::Items(items) => items.clone(),
            LayoutConstraints::Computed(f) => f(scene, container),
        }
    }
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        LayoutConstraints::Items(Vec::new())
    }
}

impl From<Vec<LayoutItem>> for LayoutConstraints {
    fn from(items: Vec<LayoutItem>) -> Self {
        LayoutConstraints::Items(items)
    }
}

impl std::fmt::Debug for LayoutConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutConstraints::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
            LayoutConstraints::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// Who runs the solver for a constraints container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Solves its own children
    Unshared,
    /// Will hand its layout to its parent on the parent's next pass
    TransferPending,
    /// Solved inside `owner`'s session
    Transferred { owner: NodeId },
}

/// Layout state of a constraints container
#[derive(Debug)]
pub struct ContainerLayout {
    pub(crate) share_layout: bool,
    pub(crate) padding: Padding,
    pub(crate) layout_constraints: LayoutConstraints,
    pub(crate) ownership: Ownership,
    pub(crate) manager: Option<LayoutManager>,
    pub(crate) table: LayoutTable,
    pub(crate) dirty: bool,
    /// A new session whose geometry has not been written yet
    pub(crate) needs_refresh: bool,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self {
            share_layout: false,
            padding: Padding::default(),
            layout_constraints: LayoutConstraints::default(),
            ownership: Ownership::Unshared,
            manager: None,
            table: LayoutTable::default(),
            dirty: true,
            needs_refresh: false,
        }
    }
}

impl ContainerLayout {
    pub fn share_layout(&self) -> bool {
        self.share_layout
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn owns_layout(&self) -> bool {
        self.ownership == Ownership::Unshared
    }

    pub fn has_manager(&self) -> bool {
        self.manager.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn table(&self) -> &LayoutTable {
        &self.table
    }

    /// Drop the session and the cached tables
    pub(crate) fn invalidate(&mut self) {
        self.manager = None;
        self.table = LayoutTable::default();
        self.dirty = true;
        self.needs_refresh = false;
    }
}

#[derive(Debug)]
pub enum ComponentKind {
    Leaf,
    /// A container that does not lay out its children
    Container,
    ConstraintsContainer(Box<ContainerLayout>),
}

/// A node of the scene
#[derive(Debug)]
pub struct Component {
    pub(crate) node: NodeId,
    pub(crate) id: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) geometry: CoordinateBox,
    pub(crate) layout_size_hint: Option<(f64, f64)>,
    pub(crate) policies: SizePolicies,
    pub(crate) children: IndexMap<String, NodeId>,
    pub(crate) namespace: ConstraintsNamespace,
    pub(crate) kind: ComponentKind,
}

impl Component {
    fn with_kind(kind: ComponentKind) -> Self {
        let node = NodeId::new();
        let id = node.short();
        let namespace = namespace_for(&kind, &id);
        Self {
            node,
            id,
            parent: None,
            geometry: CoordinateBox::default(),
            layout_size_hint: None,
            policies: SizePolicies::default(),
            children: IndexMap::new(),
            namespace,
            kind,
        }
    }

    pub fn leaf() -> Self {
        Self::with_kind(ComponentKind::Leaf)
    }

    pub fn container() -> Self {
        Self::with_kind(ComponentKind::Container)
    }

    pub fn constraints_container() -> Self {
        Self::with_kind(ComponentKind::ConstraintsContainer(Box::default()))
    }

    /// Set the sibling-unique id (generated from the node id otherwise)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self.namespace = namespace_for(&self.kind, &self.id);
        self
    }

    pub fn with_bounds(mut self, width: f64, height: f64) -> Self {
        self.geometry.set_bounds(width, height);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.geometry.set_position(x, y);
        self
    }

    pub fn with_size_hint(mut self, width: f64, height: f64) -> Self {
        self.layout_size_hint = Some((width, height));
        self
    }

    pub fn with_policies(mut self, policies: SizePolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Has no effect unless this is a constraints container
    pub fn with_share_layout(mut self, share: bool) -> Self {
        if let Some(layout) = self.layout_mut() {
            layout.share_layout = share;
        }
        self
    }

    /// Has no effect unless this is a constraints container
    pub fn with_padding(mut self, padding: Padding) -> Self {
        if let Some(layout) = self.layout_mut() {
            layout.padding = padding;
        }
        self
    }

    /// Has no effect unless this is a constraints container
    pub fn with_layout_constraints(mut self, constraints: impl Into<LayoutConstraints>) -> Self {
        if let Some(layout) = self.layout_mut() {
            layout.layout_constraints = constraints.into();
        }
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn geometry(&self) -> &CoordinateBox {
        &self.geometry
    }

    pub fn position(&self) -> [f64; 2] {
        self.geometry.position
    }

    pub fn bounds(&self) -> [f64; 2] {
        self.geometry.bounds
    }

    pub fn layout_size_hint(&self) -> Option<(f64, f64)> {
        self.layout_size_hint
    }

    pub fn policies(&self) -> SizePolicies {
        self.policies
    }

    pub fn namespace(&self) -> &ConstraintsNamespace {
        &self.namespace
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn is_container(&self) -> bool {
        !matches!(self.kind, ComponentKind::Leaf)
    }

    pub fn is_constraints_container(&self) -> bool {
        matches!(self.kind, ComponentKind::ConstraintsContainer(_))
    }

    /// Children in insertion order
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    pub fn child(&self, id: &str) -> Option<NodeId> {
        self.children.get(id).copied()
    }

    pub fn layout(&self) -> Option<&ContainerLayout> {
        match &self.kind {
            ComponentKind::ConstraintsContainer(layout) => Some(&**layout),
            _ => None,
        }
    }

    pub(crate) fn layout_mut(&mut self) -> Option<&mut ContainerLayout> {
        match &mut self.kind {
            ComponentKind::ConstraintsContainer(layout) => Some(&mut **layout),
            _ => None,
        }
    }
}

fn namespace_for(kind: &ComponentKind, id: &str) -> ConstraintsNamespace {
    match kind {
        ComponentKind::Leaf => ConstraintsNamespace::for_component("Component", id),
        ComponentKind::Container => ConstraintsNamespace::for_component("Container", id),
        ComponentKind::ConstraintsContainer(_) => {
            ConstraintsNamespace::for_container("ConstraintsContainer", id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_follows_node() {
        let c = Component::leaf();
        assert_eq!(c.id(), c.node().short());
    }

    #[test]
    fn test_with_id_relabels_namespace() {
        let c = Component::leaf().with_id("legend");
        let var = c.namespace().variable("left");
        assert_eq!(c.namespace().label_of(var).as_deref(), Some("Component|legend|left"));
    }

    #[test]
    fn test_container_layout_defaults() {
        let c = Component::constraints_container();
        let layout = c.layout().unwrap();
        assert!(!layout.share_layout());
        assert!(layout.owns_layout());
        assert!(layout.is_dirty());
        assert!(!layout.has_manager());
        assert!(c.is_container() && c.is_constraints_container());
    }

    #[test]
    fn test_share_layout_ignored_on_leaf() {
        let c = Component::leaf().with_share_layout(true);
        assert!(c.layout().is_none());
        assert!(!c.is_container());
        assert!(Component::container().is_container());
    }

    #[test]
    fn test_builders() {
        let c = Component::leaf()
            .with_bounds(10.0, 20.0)
            .with_position(1.0, 2.0)
            .with_size_hint(5.0, 6.0);
        assert_eq!(c.bounds(), [10.0, 20.0]);
        assert_eq!(c.position(), [1.0, 2.0]);
        assert_eq!(c.layout_size_hint(), Some((5.0, 6.0)));
    }
}
